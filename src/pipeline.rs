use chrono::Local;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::aggregate::Aggregate;
use crate::config::ScanConfig;
use crate::error::ScanError;
use crate::message::{CandidateResult, RawMessage};
use crate::processor;
use crate::progress::ProgressSink;
use crate::report;
use crate::source::{cutoff_date, ConnectionGuard, MailConnection, MailSource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub message_count: usize,
    pub distinct_sender_count: usize,
    pub output_path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Connecting,
    Scanning,
    DrainingFinalBatch,
    Writing,
    Done,
    Failed,
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanState::Connecting => "connecting",
            ScanState::Scanning => "scanning",
            ScanState::DrainingFinalBatch => "draining-final-batch",
            ScanState::Writing => "writing",
            ScanState::Done => "done",
            ScanState::Failed => "failed",
        };
        f.write_str(name)
    }
}

fn enter(state: ScanState) {
    debug!(action = "transition", component = "scan", state = %state, "Scan state changed");
}

struct ScanOutcome {
    aggregate: Aggregate,
    processed: usize,
}

/// Scans the configured mailbox and writes the unsubscribe report.
///
/// The output file holds a placeholder while the scan runs, the report on
/// success, and a failure marker if the scan breaks after connecting. The
/// connection is released exactly once on every path that acquired it.
pub fn run<S: MailSource>(
    source: &S,
    config: &ScanConfig,
    progress: &mut dyn ProgressSink,
) -> Result<RunSummary, ScanError> {
    let total_start_time = Instant::now();
    let output_path = resolve_output_path(&config.output);
    info!(action = "start", component = "scan", mailbox = %config.mailbox, months = config.months, output = ?output_path, "Starting unsubscribe scan");

    report::write_placeholder(&output_path)?;

    enter(ScanState::Connecting);
    let connection = source.connect().inspect_err(|e| {
        enter(ScanState::Failed);
        error!(action = "connect", component = "scan", error = %e, "Could not connect");
    })?;
    let mut connection = ConnectionGuard::new(connection);

    let result = scan_and_write(&mut *connection, config, &output_path, progress);
    let released = connection.release();

    match result {
        Ok(outcome) => {
            if let Err(e) = released {
                warn!(action = "release", component = "scan", error = %e, "Connection release failed after a successful scan");
            }
            enter(ScanState::Done);

            let summary = RunSummary {
                message_count: outcome.processed,
                distinct_sender_count: outcome.aggregate.len(),
                output_path,
            };
            info!(
                action = "complete",
                component = "scan",
                message_count = summary.message_count,
                distinct_sender_count = summary.distinct_sender_count,
                duration_ms = total_start_time.elapsed().as_millis(),
                "Scan completed successfully"
            );
            Ok(summary)
        }
        Err(e) => {
            enter(ScanState::Failed);
            error!(action = "scan", component = "scan", error = %e, "Scan failed");
            if let Err(write_err) = report::write_failure(&output_path, &e) {
                warn!(action = "write_failure", component = "scan", error = %write_err, "Could not write failure marker");
            }
            Err(e)
        }
    }
}

fn scan_and_write<C: MailConnection>(
    connection: &mut C,
    config: &ScanConfig,
    output_path: &Path,
    progress: &mut dyn ProgressSink,
) -> Result<ScanOutcome, ScanError> {
    let pool = ThreadPoolBuilder::new()
        .num_threads(config.workers.max(1))
        .build()?;

    enter(ScanState::Scanning);
    let outcome = scan(connection, config, &pool, progress)?;

    enter(ScanState::Writing);
    report::write_report(output_path, &outcome.aggregate)?;
    info!(action = "write", component = "scan", path = ?output_path, entries = outcome.aggregate.len(), "Report written");

    Ok(outcome)
}

fn scan<C: MailConnection>(
    connection: &mut C,
    config: &ScanConfig,
    pool: &ThreadPool,
    progress: &mut dyn ProgressSink,
) -> Result<ScanOutcome, ScanError> {
    let cutoff = cutoff_date(Local::now().date_naive(), config.months);
    let listing = connection.list_since(&config.mailbox, cutoff)?;
    let total = listing.total;
    info!(action = "list", component = "scan", cutoff = %cutoff, total, "Listed messages in window");

    let mut aggregate = Aggregate::new();
    let mut processed = 0;
    progress.scan_started(total);

    if total > 0 {
        let batch_size = config.batch_size.max(1);
        let mut batch: Vec<RawMessage> = Vec::with_capacity(batch_size);

        for message in listing.messages {
            batch.push(message?);
            if batch.len() < batch_size {
                continue;
            }
            processed += batch.len();
            aggregate.merge(process_batch(pool, &batch));
            batch.clear();
            progress.batch_completed(processed, total.max(processed));
        }

        enter(ScanState::DrainingFinalBatch);
        if !batch.is_empty() {
            processed += batch.len();
            aggregate.merge(process_batch(pool, &batch));
            progress.batch_completed(processed, total.max(processed));
        }
    }

    progress.scan_finished(processed);
    Ok(ScanOutcome {
        aggregate,
        processed,
    })
}

/// Processes a batch in parallel; results come back in batch order.
pub fn process_batch(pool: &ThreadPool, batch: &[RawMessage]) -> Vec<Option<CandidateResult>> {
    let start_time = Instant::now();
    let results: Vec<Option<CandidateResult>> =
        pool.install(|| batch.par_iter().map(processor::process).collect());

    debug!(
        action = "batch",
        component = "message_processor",
        batch_size = batch.len(),
        candidates = results.iter().flatten().count(),
        duration_ms = start_time.elapsed().as_millis(),
        "Batch processed"
    );
    results
}

fn resolve_output_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
