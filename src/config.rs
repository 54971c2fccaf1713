use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 993;
pub const DEFAULT_MAILBOX: &str = "INBOX";
pub const DEFAULT_OUTPUT_FILE: &str = "output/unsubs.txt";
pub const DEFAULT_MONTHS: u32 = 3;
pub const DEFAULT_BATCH_SIZE: usize = 40;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const KNOWN_IMAP_HOSTS: &[(&str, &str)] = &[
    ("gmail.com", "imap.gmail.com"),
    ("googlemail.com", "imap.gmail.com"),
    ("outlook.com", "outlook.office365.com"),
    ("hotmail.com", "outlook.office365.com"),
    ("live.com", "outlook.office365.com"),
    ("yahoo.com", "imap.mail.yahoo.com"),
    ("icloud.com", "imap.mail.me.com"),
    ("me.com", "imap.mail.me.com"),
    ("mac.com", "imap.mail.me.com"),
    ("aol.com", "imap.aol.com"),
];

/// Stands in for secrets in `Debug` output.
pub(crate) const REDACTED: &str = "<redacted>";

/// Everything one scan needs.
#[derive(Clone)]
pub struct ScanConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub mailbox: String,
    pub output: PathBuf,
    pub months: u32,
    pub batch_size: usize,
    pub workers: usize,
    pub timeout: Duration,
}

impl ScanConfig {
    /// Defaults for everything but the account.
    pub fn new(host: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            username: username.into(),
            password: password.into(),
            mailbox: DEFAULT_MAILBOX.to_string(),
            output: PathBuf::from(DEFAULT_OUTPUT_FILE),
            months: DEFAULT_MONTHS,
            batch_size: DEFAULT_BATCH_SIZE,
            workers: default_workers(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl fmt::Debug for ScanConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &REDACTED)
            .field("mailbox", &self.mailbox)
            .field("output", &self.output)
            .field("months", &self.months)
            .field("batch_size", &self.batch_size)
            .field("workers", &self.workers)
            .field("timeout", &self.timeout)
            .finish()
    }
}

pub fn default_workers() -> usize {
    std::cmp::min(num_cpus::get(), 8)
}

/// IMAP host for an email address: a well-known provider's server, otherwise
/// `imap.<domain>`.
pub fn imap_host_for(email: &str) -> Option<String> {
    let (_, domain) = email.trim().rsplit_once('@')?;
    let domain = domain.to_lowercase();
    if domain.is_empty() {
        return None;
    }

    let host = KNOWN_IMAP_HOSTS
        .iter()
        .find(|(known, _)| *known == domain)
        .map(|(_, host)| host.to_string())
        .unwrap_or_else(|| format!("imap.{domain}"));
    Some(host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_providers_map_to_their_servers() {
        assert_eq!(imap_host_for("me@Gmail.com").as_deref(), Some("imap.gmail.com"));
        assert_eq!(imap_host_for(" x@hotmail.com ").as_deref(), Some("outlook.office365.com"));
        assert_eq!(imap_host_for("x@mac.com").as_deref(), Some("imap.mail.me.com"));
    }

    #[test]
    fn other_domains_get_imap_prefix() {
        assert_eq!(imap_host_for("ops@fastmail.com").as_deref(), Some("imap.fastmail.com"));
    }

    #[test]
    fn no_domain_no_host() {
        assert_eq!(imap_host_for("not-an-address"), None);
        assert_eq!(imap_host_for("trailing@"), None);
    }

    #[test]
    fn defaults() {
        let config = ScanConfig::new("imap.example.com", "me@example.com", "secret");
        assert_eq!(config.port, 993);
        assert_eq!(config.mailbox, "INBOX");
        assert_eq!(config.output, PathBuf::from("output/unsubs.txt"));
        assert_eq!(config.months, 3);
        assert_eq!(config.batch_size, 40);
        assert!(config.workers >= 1 && config.workers <= 8);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn debug_output_hides_password() {
        let config = ScanConfig::new("imap.example.com", "me@example.com", "hunter2-secret");
        let shown = format!("{config:?}");

        assert!(!shown.contains("hunter2-secret"));
        assert!(shown.contains("password: \"<redacted>\""));
        assert!(shown.contains("me@example.com"));
    }
}
