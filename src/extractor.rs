use scraper::{Html, Selector};

use crate::message::HeaderMap;

pub const LIST_UNSUBSCRIBE_HEADER: &str = "list-unsubscribe";

const HTTP_PREFIX: &str = "http://";
const HTTPS_PREFIX: &str = "https://";
const MAILTO_PREFIX: &str = "mailto:";
const UNSUBSCRIBE: &str = "unsubscribe";

fn is_web_link(value: &str) -> bool {
    let lower = value.to_lowercase();
    lower.starts_with(HTTPS_PREFIX) || lower.starts_with(HTTP_PREFIX)
}

fn is_mailto(value: &str) -> bool {
    value.to_lowercase().starts_with(MAILTO_PREFIX)
}

/// Content of one `List-Unsubscribe` item: what sits between the first `<`
/// and the following `>`, or the whole segment when it is not bracketed.
fn segment_target(segment: &str) -> &str {
    let trimmed = segment.trim();
    if let Some(open) = trimmed.find('<') {
        let rest = &trimmed[open + 1..];
        if let Some(close) = rest.find('>') {
            return rest[..close].trim();
        }
    }
    trimmed
}

/// Picks a target from a `List-Unsubscribe` value (RFC 2369). Any http(s)
/// item wins over every `mailto:` item, whatever their order.
pub fn from_list_unsubscribe(value: &str) -> Option<String> {
    let mut first_mailto = None;

    for segment in value.split(',') {
        let target = segment_target(segment);
        if target.is_empty() {
            continue;
        }
        if is_web_link(target) {
            return Some(target.to_string());
        }
        if first_mailto.is_none() && is_mailto(target) {
            first_mailto = Some(target);
        }
    }

    first_mailto.map(str::to_string)
}

/// First anchor whose text or href mentions "unsubscribe" and whose href uses
/// http, https or mailto.
pub fn from_html_body(html: &str) -> Option<String> {
    if html.trim().is_empty() {
        return None;
    }

    let document = Html::parse_document(html);
    let anchors = Selector::parse("a").ok()?;

    for anchor in document.select(&anchors) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let text = anchor.text().collect::<String>().trim().to_lowercase();
        if !text.contains(UNSUBSCRIBE) && !href.to_lowercase().contains(UNSUBSCRIBE) {
            continue;
        }

        let href = href.trim();
        if is_web_link(href) || is_mailto(href) {
            return Some(href.to_string());
        }
    }

    None
}

/// Unsubscribe target for a message: the header first, the HTML body only
/// when the header gives nothing usable.
pub fn extract(headers: &HeaderMap, html: Option<&str>) -> Option<String> {
    headers
        .get(LIST_UNSUBSCRIBE_HEADER)
        .and_then(from_list_unsubscribe)
        .or_else(|| html.and_then(from_html_body))
}
