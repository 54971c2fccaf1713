use tracing::warn;

use crate::extractor;
use crate::message::{CandidateResult, RawMessage, UNKNOWN_SENDER};
use crate::parser;

/// Turns one fetched message into a candidate, or nothing.
///
/// Decode failures are logged with the message UID and swallowed so that a
/// single malformed message cannot abort a scan.
pub fn process(message: &RawMessage) -> Option<CandidateResult> {
    let parsed = match parser::decode(&message.source) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(
                action = "decode",
                component = "message_processor",
                uid = message.uid,
                seq = message.seq,
                error = %e,
                "Skipping message that could not be parsed"
            );
            return None;
        }
    };

    let target = extractor::extract(&parsed.headers, parsed.html.as_deref())?;
    Some(CandidateResult {
        sender: parsed.from.unwrap_or_else(|| UNKNOWN_SENDER.to_string()),
        target,
        observed_at: parsed.date,
    })
}
