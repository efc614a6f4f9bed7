//! Listing code extraction
//!
//! This module turns rendered HTML (or a forwarded chat message) into the
//! listing code a source site assigned to the ad:
//! - One ordered rule list per `SourceSite`, selected once per page
//! - Message extraction for input that never went through a browser
//!
//! Absence is a normal outcome: every extractor returns `Option`, never an
//! error.

mod message;
mod rules;

pub use message::extract_from_message;

use crate::site::SourceSite;
use scraper::Html;
use std::fmt;

/// A site-assigned listing identifier, e.g. `AP0237-C41`
///
/// Guaranteed non-empty, made of letters, digits, hyphens and underscores,
/// with at least one letter or digit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListingCode(String);

impl ListingCode {
    /// Validates a candidate code
    ///
    /// Surrounding whitespace is trimmed; anything outside the code alphabet
    /// rejects the candidate.
    ///
    /// # Examples
    ///
    /// ```
    /// use listing_resolver::ListingCode;
    ///
    /// assert_eq!(ListingCode::parse(" AP0237-C41 ").unwrap().as_str(), "AP0237-C41");
    /// assert!(ListingCode::parse("").is_none());
    /// assert!(ListingCode::parse("two words").is_none());
    /// ```
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let valid_chars = trimmed
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_');
        let has_alnum = trimmed.chars().any(char::is_alphanumeric);

        if trimmed.is_empty() || !valid_chars || !has_alnum {
            return None;
        }

        Some(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ListingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ListingCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Rendered HTML prepared for rule evaluation
///
/// The document is parsed once and shared by every rule of a site.
pub struct PageView<'a> {
    pub raw: &'a str,
    pub document: Html,
}

impl<'a> PageView<'a> {
    pub fn new(raw: &'a str) -> Self {
        Self {
            raw,
            document: Html::parse_document(raw),
        }
    }
}

/// A single extraction strategy
pub struct ExtractionRule {
    /// Short name used in debug logs
    pub name: &'static str,
    pub apply: fn(&PageView<'_>) -> Option<ListingCode>,
}

const IMOVELWEB_RULES: &[ExtractionRule] = &[ExtractionRule {
    name: "publisher-house-id",
    apply: rules::publisher_house_id,
}];

const CHAVESNAMAO_RULES: &[ExtractionRule] = &[
    ExtractionRule {
        name: "comment-ref",
        apply: rules::comment_ref,
    },
    ExtractionRule {
        name: "ref-do-imovel",
        apply: rules::ref_do_imovel,
    },
    ExtractionRule {
        name: "inline-ref",
        apply: rules::inline_ref,
    },
];

const BUSCACURITIBA_RULES: &[ExtractionRule] = &[ExtractionRule {
    name: "reference-paragraph",
    apply: rules::reference_paragraph,
}];

const HUBURBANA_RULES: &[ExtractionRule] = &[ExtractionRule {
    name: "code-span",
    apply: rules::code_span,
}];

const IMOVELPRATICO_RULES: &[ExtractionRule] = &[ExtractionRule {
    name: "media-link",
    apply: rules::media_link,
}];

const GENERIC_RULES: &[ExtractionRule] = &[
    ExtractionRule {
        name: "generic-label-text",
        apply: rules::generic_label_text,
    },
    ExtractionRule {
        name: "generic-label-raw",
        apply: rules::generic_label_raw,
    },
];

/// Returns the ordered rule list for a site (first success wins)
pub fn rules_for(site: SourceSite) -> &'static [ExtractionRule] {
    match site {
        SourceSite::ImovelWeb => IMOVELWEB_RULES,
        SourceSite::ChavesNaMao => CHAVESNAMAO_RULES,
        SourceSite::BuscaCuritiba => BUSCACURITIBA_RULES,
        SourceSite::HubUrbana => HUBURBANA_RULES,
        SourceSite::ImovelPratico => IMOVELPRATICO_RULES,
        SourceSite::Unknown => GENERIC_RULES,
    }
}

/// Extracts the listing code from rendered HTML
///
/// # Arguments
///
/// * `html` - The rendered page
/// * `site` - The classified source site, selecting the rule list
///
/// # Returns
///
/// * `Some(ListingCode)` - The result of the first rule that matched
/// * `None` - No rule matched
///
/// # Example
///
/// ```
/// use listing_resolver::extract::extract_from_html;
/// use listing_resolver::site::SourceSite;
///
/// let html = r#"<script>var publisher_house_id = "AB1234-Z9";</script>"#;
/// let code = extract_from_html(html, SourceSite::ImovelWeb).unwrap();
/// assert_eq!(code.as_str(), "AB1234-Z9");
/// ```
pub fn extract_from_html(html: &str, site: SourceSite) -> Option<ListingCode> {
    let page = PageView::new(html);

    for rule in rules_for(site) {
        if let Some(code) = (rule.apply)(&page) {
            tracing::debug!("Rule '{}' matched code {} for {}", rule.name, code, site);
            return Some(code);
        }
        tracing::trace!("Rule '{}' found nothing for {}", rule.name, site);
    }

    None
}
