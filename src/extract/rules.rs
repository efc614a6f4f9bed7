//! Per-site extraction rules
//!
//! Each rule inspects a `PageView` and either yields a valid code or `None`.

use super::{ListingCode, PageView};
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use std::sync::LazyLock;

static RE_PUBLISHER_HOUSE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"publisher_house_id\s*[=:]\s*["']([\w-]+)["']"#).unwrap()
});
static RE_REF_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Ref:\s*([\w-]+)").unwrap());
static RE_REF_DO_IMOVEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bref(?:\.|:)?\s*do\s+im[óo]vel\s*:?\s*([\w-]+)").unwrap()
});
static RE_REFERENCIA_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)refer[êe]ncia\s*:").unwrap());
static RE_REFERENCIA_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)refer[êe]ncia\s*:\s*([\w-]+)").unwrap());
static RE_CODE_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:c[óo]digo|code)\s*:\s*([\w-]+)").unwrap());
static RE_GENERIC_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bID[:.\s]*(\d+)|(?i:\bc[óo]digo|\bcode|\bref)[:.\s]*(\d+)").unwrap()
});

/// Path segment that marks listing photo links
const MEDIA_SEGMENT: &str = "/fotos/";

/// Ends the code component that follows `MEDIA_SEGMENT`
const MEDIA_CODE_END: char = '/';

/// Elements whose text is not user-visible
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Captures the first valid code from any of the regex's capture groups
fn capture_code(re: &Regex, haystack: &str) -> Option<ListingCode> {
    re.captures_iter(haystack).find_map(|caps| {
        caps.iter()
            .skip(1)
            .flatten()
            .find_map(|m| ListingCode::parse(m.as_str()))
    })
}

fn element_text(element: &ElementRef<'_>) -> String {
    let mut text = String::new();
    push_visible_text(*element, &mut text);
    text
}

/// Appends the user-visible text under `element`
///
/// Element boundaries become spaces so a code never runs into the text of
/// the next element. Comments are dropped without a separator, so a label
/// split by an empty comment (`Ref:<!-- -->AP12`) still reads as one string.
fn push_visible_text(element: ElementRef<'_>, text: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(t) => text.push_str(t),
            Node::Element(e) if HIDDEN_ELEMENTS.contains(&e.name()) => {}
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    text.push(' ');
                    push_visible_text(child, text);
                    text.push(' ');
                }
            }
            _ => {}
        }
    }
}

/// User-visible text of the whole document
fn visible_text(document: &Html) -> String {
    element_text(&document.root_element())
}

/// imovelweb: `publisher_house_id = "CODE"` in an inline script
pub fn publisher_house_id(page: &PageView<'_>) -> Option<ListingCode> {
    capture_code(&RE_PUBLISHER_HOUSE_ID, page.raw)
}

/// chavesnamao: `Ref: CODE` inside an HTML comment
pub fn comment_ref(page: &PageView<'_>) -> Option<ListingCode> {
    page.document.tree.values().find_map(|node| match node {
        Node::Comment(comment) => capture_code(&RE_REF_LABEL, comment),
        _ => None,
    })
}

/// chavesnamao: `Ref. do imóvel: CODE` in the page text
pub fn ref_do_imovel(page: &PageView<'_>) -> Option<ListingCode> {
    capture_code(&RE_REF_DO_IMOVEL, &visible_text(&page.document))
}

/// chavesnamao: `Ref: CODE` in the page text, possibly split by an empty comment
pub fn inline_ref(page: &PageView<'_>) -> Option<ListingCode> {
    capture_code(&RE_REF_LABEL, &visible_text(&page.document))
}

/// buscacuritiba: `<p>Referência: <strong>CODE</strong></p>`
///
/// The nested emphasis element is authoritative; the text after the label
/// is used when the paragraph has no emphasis.
pub fn reference_paragraph(page: &PageView<'_>) -> Option<ListingCode> {
    let paragraph_selector = Selector::parse("p").ok()?;
    let emphasis_selector = Selector::parse("strong, b, em").ok()?;

    for paragraph in page.document.select(&paragraph_selector) {
        let text = element_text(&paragraph);
        if !RE_REFERENCIA_LABEL.is_match(&text) {
            continue;
        }

        let emphasized = paragraph
            .select(&emphasis_selector)
            .find_map(|el| ListingCode::parse(&element_text(&el)));

        if let Some(code) = emphasized.or_else(|| capture_code(&RE_REFERENCIA_CODE, &text)) {
            return Some(code);
        }
    }

    None
}

/// huburbana: `<span>CÓDIGO: CODE</span>`
pub fn code_span(page: &PageView<'_>) -> Option<ListingCode> {
    let selector = Selector::parse("span").ok()?;

    page.document
        .select(&selector)
        .find_map(|span| capture_code(&RE_CODE_LABEL, &element_text(&span)))
}

/// imovelpratico: photo links shaped like `.../fotos/CODE/1.jpg`
pub fn media_link(page: &PageView<'_>) -> Option<ListingCode> {
    let selector = Selector::parse("a[href]").ok()?;

    page.document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .find_map(code_from_media_href)
}

fn code_from_media_href(href: &str) -> Option<ListingCode> {
    let start = href.find(MEDIA_SEGMENT)? + MEDIA_SEGMENT.len();
    let rest = &href[start..];
    let end = rest.find(MEDIA_CODE_END)?;
    ListingCode::parse(&rest[..end])
}

/// Any site: `ID 123`, `Código: 123`, `ref.123` in the page text
pub fn generic_label_text(page: &PageView<'_>) -> Option<ListingCode> {
    capture_code(&RE_GENERIC_LABEL, &visible_text(&page.document))
}

/// Any site: the same label pattern over the raw markup
pub fn generic_label_raw(page: &PageView<'_>) -> Option<ListingCode> {
    capture_code(&RE_GENERIC_LABEL, page.raw)
}
