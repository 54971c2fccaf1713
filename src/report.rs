use std::fs;
use std::path::Path;

use crate::aggregate::Aggregate;
use crate::error::ScanError;

pub const SCANNING_PLACEHOLDER: &str = "(Scanning… results will appear here.)";
pub const FAILED_PLACEHOLDER: &str = "(Scan failed)";

const UNKNOWN_DATE: &str = "unknown";

/// One `[YYYY-MM-DD/sender]: target` line per sender, newest first. Undated
/// entries go last; ties keep first-seen order.
pub fn render(aggregate: &Aggregate) -> String {
    let mut entries: Vec<_> = aggregate.iter().collect();
    entries.sort_by(|(_, a), (_, b)| b.observed_at.cmp(&a.observed_at));

    let lines: Vec<String> = entries
        .into_iter()
        .map(|(sender, entry)| {
            let date = entry
                .observed_at
                .map(|at| at.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| UNKNOWN_DATE.to_string());
            format!("[{date}/{sender}]: {}", entry.target)
        })
        .collect();

    lines.join("\n") + "\n"
}

pub fn write_placeholder(path: &Path) -> Result<(), ScanError> {
    write_output(path, &format!("{SCANNING_PLACEHOLDER}\n"))
}

pub fn write_report(path: &Path, aggregate: &Aggregate) -> Result<(), ScanError> {
    write_output(path, &render(aggregate))
}

/// Replaces whatever the file held with a failure marker, never a partial
/// report.
pub fn write_failure(path: &Path, error: &ScanError) -> Result<(), ScanError> {
    write_output(path, &format!("{FAILED_PLACEHOLDER}\n\nError: {error}\n"))
}

fn write_output(path: &Path, content: &str) -> Result<(), ScanError> {
    let to_write_error = |source: std::io::Error| ScanError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(to_write_error)?;
    }
    fs::write(path, content).map_err(to_write_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::CandidateResult;
    use chrono::{TimeZone, Utc};

    fn candidate(sender: &str, target: &str, day: Option<u32>) -> Option<CandidateResult> {
        Some(CandidateResult {
            sender: sender.to_string(),
            target: target.to_string(),
            observed_at: day.map(|d| Utc.with_ymd_and_hms(2026, 9, d, 9, 0, 0).unwrap()),
        })
    }

    #[test]
    fn newest_first_undated_last() {
        let mut aggregate = Aggregate::new();
        aggregate.merge([
            candidate("old@x.com", "https://x.com/old", Some(1)),
            candidate("nodate@x.com", "mailto:stop@x.com", None),
            candidate("new@x.com", "https://x.com/new", Some(20)),
            candidate("(unknown)", "https://u.com/u", Some(10)),
        ]);

        assert_eq!(
            render(&aggregate),
            "[2026-09-20/new@x.com]: https://x.com/new\n\
             [2026-09-10/(unknown)]: https://u.com/u\n\
             [2026-09-01/old@x.com]: https://x.com/old\n\
             [unknown/nodate@x.com]: mailto:stop@x.com\n"
        );
    }

    #[test]
    fn equal_dates_keep_insertion_order() {
        let mut aggregate = Aggregate::new();
        aggregate.merge([
            candidate("b@x.com", "https://x.com/b", Some(5)),
            candidate("a@x.com", "https://x.com/a", Some(5)),
            candidate("d@x.com", "https://x.com/d", None),
            candidate("c@x.com", "https://x.com/c", None),
        ]);

        let rendered = render(&aggregate);
        let senders: Vec<&str> = rendered
            .lines()
            .map(|line| line.split(']').next().unwrap())
            .collect();
        assert_eq!(
            senders,
            ["[2026-09-05/b@x.com", "[2026-09-05/a@x.com", "[unknown/d@x.com", "[unknown/c@x.com"]
        );
    }

    #[test]
    fn empty_aggregate_renders_no_records() {
        assert_eq!(render(&Aggregate::new()), "\n");
    }

    #[test]
    fn failure_marker_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/unsubs.txt");

        write_placeholder(&path).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "(Scanning… results will appear here.)\n"
        );

        write_failure(&path, &ScanError::Stream("connection reset".into())).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "(Scan failed)\n\nError: mailbox stream failed: connection reset\n"
        );
    }

    #[test]
    fn unwritable_path_is_a_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();

        let err = write_placeholder(&blocker.join("unsubs.txt")).unwrap_err();
        assert!(matches!(err, ScanError::Write { .. }));
    }
}
