use chrono::NaiveDate;
use native_tls::{TlsConnector, TlsStream};
use std::collections::VecDeque;
use std::fmt;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::{ScanConfig, REDACTED};
use crate::error::ScanError;
use crate::message::RawMessage;
use crate::source::{MailConnection, MailSource, MessageListing};

pub type ImapSession = imap::Session<TlsStream<TcpStream>>;

/// IMAP over TLS with password login.
#[derive(Clone)]
pub struct ImapSource {
    host: String,
    port: u16,
    username: String,
    password: String,
    timeout: Duration,
    fetch_chunk: usize,
}

impl ImapSource {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            username: config.username.clone(),
            password: config.password.clone(),
            timeout: config.timeout,
            fetch_chunk: config.batch_size.max(1),
        }
    }

    fn connect_error(&self, reason: impl ToString) -> ScanError {
        ScanError::Connect {
            host: self.host.clone(),
            port: self.port,
            reason: reason.to_string(),
        }
    }

    fn open_stream(&self) -> Result<TlsStream<TcpStream>, ScanError> {
        let addr = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| self.connect_error(e))?
            .next()
            .ok_or_else(|| self.connect_error("host did not resolve"))?;

        let tcp = TcpStream::connect_timeout(&addr, self.timeout)
            .map_err(|e| self.connect_error(e))?;
        tcp.set_read_timeout(Some(self.timeout))
            .map_err(|e| self.connect_error(e))?;
        tcp.set_write_timeout(Some(self.timeout))
            .map_err(|e| self.connect_error(e))?;

        let tls = TlsConnector::new().map_err(|e| self.connect_error(e))?;
        tls.connect(&self.host, tcp)
            .map_err(|e| self.connect_error(e))
    }
}

impl fmt::Debug for ImapSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImapSource")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &REDACTED)
            .field("timeout", &self.timeout)
            .field("fetch_chunk", &self.fetch_chunk)
            .finish()
    }
}

impl MailSource for ImapSource {
    type Connection = ImapConnection;

    fn connect(&self) -> Result<ImapConnection, ScanError> {
        let start_time = Instant::now();
        info!(action = "start", component = "imap_connect", host = %self.host, port = self.port, "Connecting to IMAP server");

        let mut client = imap::Client::new(self.open_stream()?);
        client
            .read_greeting()
            .map_err(|e| self.connect_error(e))?;

        let session = client
            .login(&self.username, &self.password)
            .map_err(|(e, _client)| match e {
                imap::Error::No(reason) | imap::Error::Bad(reason) => ScanError::Auth(reason),
                other => self.connect_error(other),
            })?;

        info!(
            action = "complete",
            component = "imap_connect",
            duration_ms = start_time.elapsed().as_millis(),
            "Logged in"
        );

        Ok(ImapConnection {
            session,
            fetch_chunk: self.fetch_chunk,
            logged_out: false,
        })
    }
}

pub struct ImapConnection {
    session: ImapSession,
    fetch_chunk: usize,
    logged_out: bool,
}

impl MailConnection for ImapConnection {
    fn list_since(
        &mut self,
        mailbox: &str,
        cutoff: NaiveDate,
    ) -> Result<MessageListing<'_>, ScanError> {
        self.session
            .examine(mailbox)
            .map_err(|e| ScanError::Stream(format!("cannot open {mailbox}: {e}")))?;

        let query = since_query(cutoff);
        let mut uids: Vec<u32> = self
            .session
            .uid_search(&query)
            .map_err(|e| ScanError::Stream(format!("search failed: {e}")))?
            .into_iter()
            .collect();
        uids.sort_unstable();

        info!(action = "search", component = "imap_listing", mailbox = mailbox, query = %query, message_count = uids.len(), "Found messages in window");

        if uids.is_empty() {
            return Ok(MessageListing::empty());
        }

        Ok(MessageListing {
            total: uids.len(),
            messages: Box::new(ImapMessages {
                session: &mut self.session,
                chunks: uid_chunks(&uids, self.fetch_chunk).into(),
                buffered: VecDeque::new(),
                failed: false,
            }),
        })
    }

    fn release(&mut self) -> Result<(), ScanError> {
        if self.logged_out {
            return Ok(());
        }
        self.logged_out = true;
        debug!(action = "logout", component = "imap_connect", "Logging out");
        self.session
            .logout()
            .map_err(|e| ScanError::Stream(format!("logout failed: {e}")))
    }
}

/// Fetches one UID chunk at a time as the consumer advances.
struct ImapMessages<'a> {
    session: &'a mut ImapSession,
    chunks: VecDeque<String>,
    buffered: VecDeque<RawMessage>,
    failed: bool,
}

impl Iterator for ImapMessages<'_> {
    type Item = Result<RawMessage, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(message) = self.buffered.pop_front() {
                return Some(Ok(message));
            }
            if self.failed {
                return None;
            }
            let uid_set = self.chunks.pop_front()?;

            let fetches = match self.session.uid_fetch(&uid_set, "BODY.PEEK[]") {
                Ok(fetches) => fetches,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(ScanError::Stream(format!("fetch failed: {e}"))));
                }
            };

            let mut chunk: Vec<RawMessage> = fetches
                .iter()
                .map(|fetch| RawMessage {
                    uid: fetch.uid.unwrap_or_default(),
                    seq: fetch.message,
                    source: fetch.body().map(<[u8]>::to_vec).unwrap_or_default(),
                })
                .collect();
            chunk.sort_by_key(|message| message.uid);
            debug!(action = "fetch", component = "imap_listing", uid_set = %uid_set, fetched = chunk.len(), "Fetched chunk");
            self.buffered.extend(chunk);
        }
    }
}

/// `SINCE` search key; IMAP dates carry no time, so the cutoff is midnight.
fn since_query(cutoff: NaiveDate) -> String {
    format!("SINCE {}", cutoff.format("%d-%b-%Y"))
}

fn uid_chunks(uids: &[u32], size: usize) -> Vec<String> {
    uids.chunks(size.max(1))
        .map(|chunk| {
            chunk
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn since_query_uses_imap_date_format() {
        let cutoff = NaiveDate::from_ymd_opt(2026, 7, 8).unwrap();
        assert_eq!(since_query(cutoff), "SINCE 08-Jul-2026");
    }

    #[test]
    fn uids_are_split_into_fetch_chunks() {
        let uids = [3, 4, 9, 12, 15];
        assert_eq!(uid_chunks(&uids, 2), ["3,4", "9,12", "15"]);
        assert_eq!(uid_chunks(&uids, 40), ["3,4,9,12,15"]);
        assert!(uid_chunks(&[], 40).is_empty());
    }

    #[test]
    fn debug_output_hides_password() {
        let config = ScanConfig::new("imap.example.com", "me@example.com", "hunter2-secret");
        let shown = format!("{:?}", ImapSource::new(&config));

        assert!(!shown.contains("hunter2-secret"));
        assert!(shown.contains("imap.example.com"));
    }
}
