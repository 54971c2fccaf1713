pub mod aggregate;
pub mod args;
pub mod config;
pub mod error;
pub mod extractor;
pub mod imap_source;
pub mod message;
pub mod parser;
pub mod pipeline;
pub mod processor;
pub mod progress;
pub mod report;
pub mod source;
pub mod utils;

pub use aggregate::{Aggregate, AggregateEntry};
pub use args::Args;
pub use config::ScanConfig;
pub use error::{DecodeError, ScanError};
pub use imap_source::ImapSource;
pub use message::{CandidateResult, HeaderMap, ParsedMessage, RawMessage, UNKNOWN_SENDER};
pub use pipeline::{run, RunSummary, ScanState};
pub use progress::{LogProgress, ProgressSink, ProgressStyle, TerminalProgress};
pub use source::{ConnectionGuard, MailConnection, MailSource, MessageListing};
