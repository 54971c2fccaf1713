use anyhow::Result;
use clap::Parser;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{
    self, ScanConfig, DEFAULT_BATCH_SIZE, DEFAULT_MAILBOX, DEFAULT_MONTHS, DEFAULT_OUTPUT_FILE,
    DEFAULT_PORT, DEFAULT_TIMEOUT_SECS, REDACTED,
};

#[derive(Parser)]
#[command(
    name = "unsubscan",
    about = "Scan a mailbox for unsubscribe links and keep the most recent one per sender",
    version,
    long_about = None
)]
pub struct Args {
    /// Email address used to log in
    #[arg(short, long, env = "UNSUBSCAN_USER")]
    pub user: String,

    /// Account password or app password
    #[arg(long, env = "UNSUBSCAN_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// IMAP host (derived from the email domain when omitted)
    #[arg(long, env = "UNSUBSCAN_HOST")]
    pub host: Option<String>,

    /// IMAP port (TLS)
    #[arg(long, env = "UNSUBSCAN_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Mailbox to scan
    #[arg(short, long, env = "UNSUBSCAN_MAILBOX", default_value = DEFAULT_MAILBOX)]
    pub mailbox: String,

    /// File the report is written to
    #[arg(short, long, env = "UNSUBSCAN_OUTPUT", default_value = DEFAULT_OUTPUT_FILE)]
    pub output: PathBuf,

    /// Only scan messages from the last N months
    #[arg(long, env = "UNSUBSCAN_MONTHS", default_value_t = DEFAULT_MONTHS)]
    pub months: u32,

    /// Messages processed together before merging
    #[arg(short, long, env = "UNSUBSCAN_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Number of worker threads
    #[arg(short, long, env = "UNSUBSCAN_WORKERS")]
    pub workers: Option<usize>,

    /// Connection timeout in seconds
    #[arg(long, env = "UNSUBSCAN_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args")
            .field("user", &self.user)
            .field("password", &REDACTED)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("mailbox", &self.mailbox)
            .field("output", &self.output)
            .field("months", &self.months)
            .field("batch_size", &self.batch_size)
            .field("workers", &self.workers)
            .field("timeout", &self.timeout)
            .field("verbose", &self.verbose)
            .finish()
    }
}

impl Args {
    pub fn scan_config(&self) -> Result<ScanConfig> {
        let host = match &self.host {
            Some(host) => host.trim().to_string(),
            None => match config::imap_host_for(&self.user) {
                Some(host) => host,
                None => anyhow::bail!(
                    "Cannot derive an IMAP host from '{}'; pass --host",
                    self.user
                ),
            },
        };

        Ok(ScanConfig {
            host,
            port: self.port,
            username: self.user.trim().to_string(),
            password: self.password.clone(),
            mailbox: self.mailbox.clone(),
            output: self.output.clone(),
            months: self.months,
            batch_size: self.batch_size,
            workers: self.workers.unwrap_or_else(config::default_workers),
            timeout: Duration::from_secs(self.timeout),
        })
    }
}
