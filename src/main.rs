use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;
use tracing::error;

use unsubscan::utils::{pluralize, setup_logging, validate_args};
use unsubscan::{run, Args, ImapSource, ProgressStyle, RunSummary, ScanError};

const PAD: &str = "  ";

fn print_summary(summary: &RunSummary) {
    eprintln!();
    eprintln!("{PAD}----------------------------------------");
    eprintln!(
        "{PAD}Done. {} saved to:",
        pluralize(summary.distinct_sender_count, "unsubscribe link")
    );
    eprintln!("{PAD}{}", summary.output_path.display());
    eprintln!("{PAD}(from {} scanned)", pluralize(summary.message_count, "message"));
    eprintln!();
}

fn failure_message(e: &ScanError) -> String {
    if e.is_bad_credentials() {
        "Invalid credentials. Check your email and password.".to_string()
    } else if e.is_connect_failure() {
        "Connection failed. Check host and port.".to_string()
    } else {
        e.to_string()
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose);
    validate_args(&args)?;

    let config = args.scan_config()?;
    let source = ImapSource::new(&config);

    eprintln!("{PAD}Connecting to {}:{}…", config.host, config.port);
    eprintln!("{PAD}Scanning {} (last {})…", config.mailbox, pluralize(config.months as usize, "month"));

    let mut progress = ProgressStyle::choose(std::io::stderr().is_terminal(), args.verbose).sink();
    match run(&source, &config, progress.as_mut()) {
        Ok(summary) => {
            print_summary(&summary);
            Ok(())
        }
        Err(e) => {
            error!(action = "run", component = "main", error = %e, "Scan failed");
            eprintln!();
            eprintln!("{PAD}{}", failure_message(&e));
            eprintln!();
            std::process::exit(1);
        }
    }
}
