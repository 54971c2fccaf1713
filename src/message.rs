use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Sender recorded when a message has no usable `From` address.
pub const UNKNOWN_SENDER: &str = "(unknown)";

/// One message as delivered by the mailbox, before decoding.
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub uid: u32,
    pub seq: u32,
    pub source: Vec<u8>,
}

/// Header names folded to lowercase, values kept in the order they appeared.
#[derive(Debug, Clone, Default)]
pub struct HeaderMap {
    values: HashMap<String, Vec<String>>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.values
            .entry(name.to_lowercase())
            .or_default()
            .push(value.into());
    }

    /// First value for `name`, matched case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    pub(crate) fn get_all(&self, name: &str) -> &[String] {
        self.values
            .get(&name.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for HeaderMap {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut headers = HeaderMap::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParsedMessage {
    pub headers: HeaderMap,
    pub from: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub html: Option<String>,
    /// Not read by extraction.
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateResult {
    pub sender: String,
    pub target: String,
    pub observed_at: Option<DateTime<Utc>>,
}
