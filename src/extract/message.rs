use super::ListingCode;
use crate::site::strip_urls;
use regex::Regex;
use std::sync::LazyLock;

static RE_MESSAGE_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:refer[êe]ncia|reference|ref\.?|c[óo]digo)\s*:\s*([\w-]+)").unwrap()
});
static RE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[[:alnum:]]+(?:-[[:alnum:]]+)*\b").unwrap());

/// Extracts a listing code from a free-form message
///
/// An explicit label (`Referência:`, `Reference:`, `Ref:`, `Código:`) wins.
/// Otherwise the first word-bounded token that mixes letters and digits is
/// taken, which skips plain words and plain numbers such as prices or
/// phone numbers. Links are ignored so slugs inside them are never mistaken
/// for codes.
///
/// # Examples
///
/// ```
/// use listing_resolver::extract::extract_from_message;
///
/// let code = extract_from_message("Referência: AP0237-C41").unwrap();
/// assert_eq!(code.as_str(), "AP0237-C41");
/// assert!(extract_from_message("no reference here").is_none());
/// ```
pub fn extract_from_message(text: &str) -> Option<ListingCode> {
    let text = strip_urls(text);

    let labelled = RE_MESSAGE_LABEL
        .captures_iter(&text)
        .find_map(|caps| caps.get(1).and_then(|m| ListingCode::parse(m.as_str())));
    if labelled.is_some() {
        return labelled;
    }

    RE_TOKEN
        .find_iter(&text)
        .map(|m| m.as_str())
        .filter(|token| mixes_letters_and_digits(token))
        .find_map(ListingCode::parse)
}

fn mixes_letters_and_digits(token: &str) -> bool {
    token.chars().any(|c| c.is_ascii_alphabetic()) && token.chars().any(|c| c.is_ascii_digit())
}
