//! Contact lookup over the feed XML
//!
//! The feed is a list of `Listing` elements, each carrying a `ListingID` and
//! an optional `ContactInfo` block:
//!
//! ```xml
//! <Listings>
//!   <Listing>
//!     <ListingID>AB1234-Z9</ListingID>
//!     <ContactInfo>
//!       <Name>Jane Realty</Name>
//!       <Email>jane@example.com</Email>
//!       <Telephone>+55 41 3333-0000</Telephone>
//!     </ContactInfo>
//!   </Listing>
//! </Listings>
//! ```
//!
//! Only the element structure matters; namespaces and unrelated elements are
//! ignored.

use super::{ContactRecord, FeedDocument};
use crate::{ResolverError, Result};
use quick_xml::events::Event;
use quick_xml::Reader;

/// Contact fields collected for the `Listing` being read
#[derive(Debug, Default)]
struct ListingFields {
    id: Option<String>,
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
}

impl ListingFields {
    fn into_record(self) -> ContactRecord {
        ContactRecord::new(self.name, self.email, self.phone)
    }
}

/// Which contact field a text node under `ContactInfo` belongs to
fn contact_slot<'a>(fields: &'a mut ListingFields, element: &str) -> Option<&'a mut Option<String>> {
    match element {
        "Name" => Some(&mut fields.name),
        "Email" => Some(&mut fields.email),
        "Telephone" | "Phone" => Some(&mut fields.phone),
        _ => None,
    }
}

/// Finds the contact record for `code` in the feed
///
/// The `ListingID` text is compared after trimming, case-sensitively. The
/// whole document is read even after a match so that a truncated or
/// otherwise broken feed is reported rather than half-trusted.
///
/// # Returns
///
/// * `Ok(ContactRecord)` - Contact of the first matching listing
/// * `Err(ResolverError::ListingNotFound)` - No listing carries the code
/// * `Err(ResolverError::MalformedFeed)` - The document is not well-formed XML
pub fn lookup(code: &str, document: &FeedDocument) -> Result<ContactRecord> {
    let wanted = code.trim();
    let mut reader = Reader::from_str(&document.body);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut stack: Vec<String> = Vec::new();
    let mut seen_root = false;
    let mut current: Option<ListingFields> = None;
    let mut found: Option<ContactRecord> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if stack.is_empty() && seen_root {
                    return Err(malformed("multiple root elements"));
                }
                seen_root = true;
                if name == "Listing" {
                    current = Some(ListingFields::default());
                }
                stack.push(name);
            }
            Ok(Event::Empty(_)) => {
                if stack.is_empty() {
                    if seen_root {
                        return Err(malformed("multiple root elements"));
                    }
                    seen_root = true;
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if stack.pop().as_deref() != Some(name.as_str()) {
                    return Err(malformed(&format!("unexpected closing tag </{}>", name)));
                }
                if name == "Listing" {
                    if let Some(fields) = current.take() {
                        if found.is_none() && fields.id.as_deref() == Some(wanted) {
                            found = Some(fields.into_record());
                        }
                    }
                }
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| malformed(&err.to_string()))?
                    .to_string();
                record_text(&stack, current.as_mut(), text);
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e).to_string();
                record_text(&stack, current.as_mut(), text);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(malformed(&format!(
                    "XML parse error at position {}: {}",
                    reader.error_position(),
                    e
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(malformed(&format!("unclosed element <{}>", stack.join("/"))));
    }
    if !seen_root {
        return Err(malformed("no root element"));
    }

    found.ok_or_else(|| ResolverError::ListingNotFound {
        code: wanted.to_string(),
    })
}

/// Stores a text node if it is a `ListingID` or a contact field of the
/// listing being read
fn record_text(stack: &[String], fields: Option<&mut ListingFields>, text: String) {
    let Some(fields) = fields else {
        return;
    };
    let text = text.trim();
    if text.is_empty() {
        return;
    }

    match stack {
        [.., parent, element] if parent == "Listing" && element == "ListingID" => {
            fields.id = Some(text.to_string());
        }
        [.., parent, element] if parent == "ContactInfo" => {
            if let Some(slot) = contact_slot(fields, element) {
                slot.get_or_insert_with(String::new).push_str(text);
            }
        }
        _ => {}
    }
}

fn malformed(reason: &str) -> ResolverError {
    ResolverError::MalformedFeed(reason.to_string())
}
