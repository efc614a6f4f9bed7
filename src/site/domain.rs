use crate::{UrlError, UrlResult};
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

static RE_EMBEDDED_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)https?://[^\s<>"'`]+"#).unwrap());

/// Characters that end a sentence rather than a URL
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '}', '*', '_'];

/// Parses an absolute http(s) URL
///
/// # Arguments
///
/// * `input` - The candidate URL (surrounding whitespace is ignored)
///
/// # Returns
///
/// * `Ok(Url)` - A URL with an http or https scheme and a host
/// * `Err(UrlError)` - Anything else
pub fn parse_http_url(input: &str) -> UrlResult<Url> {
    let trimmed = input.trim();
    let url = Url::parse(trimmed).map_err(|e| UrlError::Parse {
        input: trimmed.to_string(),
        reason: e.to_string(),
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost(trimmed.to_string()));
    }

    Ok(url)
}

/// Extracts the registrable host from a URL
///
/// The host is lowercased and a leading `www.` is dropped, so
/// `https://WWW.Example.com/x` yields `example.com`.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use listing_resolver::site::extract_host;
///
/// let url = Url::parse("https://www.imovelweb.com.br/propriedades/x").unwrap();
/// assert_eq!(extract_host(&url), Some("imovelweb.com.br".to_string()));
/// ```
pub fn extract_host(url: &Url) -> Option<String> {
    url.host_str().map(|h| {
        let host = h.to_lowercase();
        match host.strip_prefix("www.") {
            Some(rest) => rest.to_string(),
            None => host,
        }
    })
}

/// Finds the first http(s) URL in free text
///
/// Accepts either a bare URL or a chat message that mentions one. Trailing
/// sentence punctuation is not considered part of the link.
pub fn find_url(text: &str) -> UrlResult<Url> {
    if let Ok(url) = parse_http_url(text) {
        return Ok(url);
    }

    RE_EMBEDDED_URL
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(TRAILING_PUNCTUATION))
        .find_map(|candidate| parse_http_url(candidate).ok())
        .ok_or_else(|| UrlError::NotFound(text.trim().chars().take(80).collect()))
}

/// Removes every http(s) URL from free text
pub fn strip_urls(text: &str) -> String {
    RE_EMBEDDED_URL.replace_all(text, " ").into_owned()
}
