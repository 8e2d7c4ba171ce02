//! Mockdir State Inspector
//!
//! Reads a state directory without modifying it and reports the request
//! counter, registered patterns, alias targets and unreadable response files.
//!
//! Usage:
//!   mockdir-inspect <STATE_DIR> [--json] [--request N | --last]
//!
//! Exits with status 1 when an alias points at a missing or corrupt response.

use anyhow::Context;
use clap::Parser;
use mockdir::inspect::{inspect, InspectionReport, TargetState};
use mockdir::StateDir;
use std::path::PathBuf;

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Mockdir State Inspector - check a mock server's state directory
#[derive(Parser, Debug)]
#[command(name = "mockdir-inspect")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// State directory to inspect
    state_dir: PathBuf,

    /// Emit the report as JSON
    #[arg(long)]
    json: bool,

    /// Print the journal entry of the N-th request (1-based)
    #[arg(short, long, conflicts_with = "last")]
    request: Option<u64>,

    /// Print the most recent journal entry
    #[arg(long)]
    last: bool,
}

fn describe(target: &TargetState) -> String {
    match target {
        TargetState::Ok(kind) => format!("{GREEN}ok{RESET} ({kind})"),
        TargetState::Missing => format!("{RED}missing{RESET}"),
        TargetState::Corrupt(reason) => format!("{RED}corrupt{RESET}: {reason}"),
    }
}

fn print_report(report: &InspectionReport) {
    println!("{BOLD}{CYAN}Mockdir State{RESET}");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Requests handled: {}", report.request_count);
    println!("Journal entries:  {}", report.journal_entries);
    println!("Response files:   {}", report.response_files);
    println!();

    println!("{BOLD}Patterns{RESET} ({})", report.patterns.len());
    for p in &report.patterns {
        match (&p.reference, &p.target) {
            (Some(reference), Some(target)) => {
                println!("   {} -> {} {}", p.pattern, reference, describe(target))
            }
            _ => println!("   {} {YELLOW}(no alias){RESET}", p.pattern),
        }
    }
    println!();

    println!("{BOLD}Aliases{RESET} ({})", report.aliases.len());
    for a in &report.aliases {
        println!("   {} -> {} {}", a.file, a.reference, describe(&a.target));
    }

    if !report.corrupt_responses.is_empty() {
        println!();
        println!("{BOLD}{RED}Corrupt responses{RESET}");
        for (name, reason) in &report.corrupt_responses {
            println!("   {name}: {reason}");
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let dir = StateDir::open(&args.state_dir)
        .with_context(|| format!("Cannot open {}", args.state_dir.display()))?;

    if args.last || args.request.is_some() {
        let journal = dir.journal();
        let entry = match args.request {
            Some(n) => journal.get(n)?,
            None => journal.last()?,
        };
        match entry {
            Some(record) => println!("{}", record.to_json_pretty()?),
            None => {
                eprintln!("{YELLOW}No such journal entry{RESET}");
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let report = inspect(&dir)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if !report.is_healthy() {
        std::process::exit(1);
    }
    Ok(())
}
