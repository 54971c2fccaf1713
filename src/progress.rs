use std::io::Write;
use tracing::info;

pub const PROGRESS_BAR_WIDTH: usize = 24;

const CLEAR_TO_END: &str = "\x1b[K";
const PAD: &str = "  ";

/// Receives scan progress. Batches report in order, so `processed` never
/// decreases between calls.
pub trait ProgressSink {
    fn scan_started(&mut self, _total: usize) {}

    fn batch_completed(&mut self, processed: usize, total: usize);

    fn scan_finished(&mut self, _processed: usize) {}
}

/// Progress as structured log events.
#[derive(Debug, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn scan_started(&mut self, total: usize) {
        info!(action = "start", component = "scan_progress", total, "Scanning messages");
    }

    fn batch_completed(&mut self, processed: usize, total: usize) {
        info!(action = "batch", component = "scan_progress", processed, total, "Batch merged");
    }

    fn scan_finished(&mut self, processed: usize) {
        info!(action = "complete", component = "scan_progress", processed, "Scan finished");
    }
}

/// How scan progress is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStyle {
    Bar,
    Log,
}

impl ProgressStyle {
    /// A bar only when stderr is a terminal and no info-level log lines
    /// would be interleaved with it.
    pub fn choose(stderr_is_terminal: bool, verbose: bool) -> Self {
        if stderr_is_terminal && !verbose {
            ProgressStyle::Bar
        } else {
            ProgressStyle::Log
        }
    }

    pub fn sink(self) -> Box<dyn ProgressSink> {
        match self {
            ProgressStyle::Bar => Box::new(TerminalProgress::new()),
            ProgressStyle::Log => Box::new(LogProgress),
        }
    }
}

/// Single-line progress bar redrawn on stderr.
#[derive(Debug, Default)]
pub struct TerminalProgress {
    drawn: bool,
}

impl TerminalProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressSink for TerminalProgress {
    fn batch_completed(&mut self, processed: usize, total: usize) {
        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "\r{PAD}{}{CLEAR_TO_END}", render_bar(processed, total, PROGRESS_BAR_WIDTH));
        let _ = stderr.flush();
        self.drawn = true;
    }

    fn scan_finished(&mut self, _processed: usize) {
        if self.drawn {
            eprintln!();
        }
    }
}

/// `[=====>      ]  count/total`
pub fn render_bar(count: usize, total: usize, width: usize) -> String {
    let filled = if total == 0 {
        0
    } else {
        let ratio = count as f64 / total as f64;
        ((ratio * width as f64).round() as usize).min(width)
    };
    let head = if filled < width { ">" } else { "" };
    let rest = width.saturating_sub(filled + head.len());

    format!(
        "[{}{}{}]  {}/{}",
        "=".repeat(filled),
        head,
        " ".repeat(rest),
        count,
        total
    )
}
