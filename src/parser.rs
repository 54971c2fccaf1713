use chrono::{DateTime, Utc};
use mailparse::{DispositionType, MailAddr, MailHeader, MailHeaderMap, ParsedMail};
use tracing::debug;

use crate::error::DecodeError;
use crate::message::{HeaderMap, ParsedMessage};

/// Decodes a raw RFC 5322 message into the fields the scanner looks at.
///
/// Only an unparseable message is an error. A body part whose transfer
/// encoding cannot be decoded is reported as absent.
pub fn decode(raw: &[u8]) -> Result<ParsedMessage, DecodeError> {
    let mail = mailparse::parse_mail(raw)?;
    if mail.headers.is_empty() {
        return Err(DecodeError::NoHeaders);
    }

    let headers: HeaderMap = mail
        .headers
        .iter()
        .map(|header| (header.get_key(), header.get_value()))
        .fold(HeaderMap::new(), |mut acc, (name, value)| {
            acc.insert(&name, value);
            acc
        });

    let from = mail.headers.get_first_header("From").and_then(sender_address);
    let date = mail
        .headers
        .get_first_value("Date")
        .and_then(|value| mailparse::dateparse(&value).ok())
        .and_then(|timestamp| DateTime::<Utc>::from_timestamp(timestamp, 0));

    let html = find_body(&mail, "text/html");
    let text = find_body(&mail, "text/plain");

    Ok(ParsedMessage {
        headers,
        from,
        date,
        html,
        text,
    })
}

fn sender_address(header: &MailHeader) -> Option<String> {
    let addresses = mailparse::addrparse_header(header).ok()?;
    addresses.iter().find_map(|address| match address {
        MailAddr::Single(info) => Some(info.addr.clone()),
        MailAddr::Group(group) => group.addrs.first().map(|info| info.addr.clone()),
    })
}

/// Depth-first search for the first inline part of the given MIME type that
/// decodes cleanly.
fn find_body(part: &ParsedMail, mimetype: &str) -> Option<String> {
    if !part.subparts.is_empty() {
        return part
            .subparts
            .iter()
            .find_map(|subpart| find_body(subpart, mimetype));
    }

    let inline = !matches!(
        part.get_content_disposition().disposition,
        DispositionType::Attachment
    );
    if !inline || !part.ctype.mimetype.eq_ignore_ascii_case(mimetype) {
        return None;
    }

    match part.get_body() {
        Ok(body) => Some(body),
        Err(e) => {
            debug!(
                action = "decode_body",
                component = "message_parser",
                mimetype,
                error = %e,
                "Ignoring body part that could not be decoded"
            );
            None
        }
    }
}
