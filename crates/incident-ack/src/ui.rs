//! Console output for incident-ack.
//!
//! Everything the operator reads goes to stdout; diagnostics go through
//! `tracing` to stderr.

#![allow(clippy::disallowed_macros)]

use std::io::{self, Write};

use chrono::{DateTime, Utc};
use colored::Colorize;
use tracing::debug;

use crate::config::Settings;
use crate::error::Error;
use crate::models::{AlertSummary, BatchResult, Incident};
use crate::mutator::BatchProgress;

const RULE_WIDTH: usize = 70;
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Incidents shown individually before the prompt.
pub const SAMPLE_LIMIT: usize = 10;

/// Print the run header.
pub fn print_banner(settings: &Settings, started: DateTime<Utc>) {
    print_section(&format!("Coralogix Incident {}", settings.action.title()));
    println!("  {:<10} {}", "Region:".bright_black(), settings.region);
    println!("  {:<10} {}", "Endpoint:".bright_black(), settings.endpoint);
    println!("  {:<10} {}", "Action:".bright_black(), settings.action);
    let window = settings
        .window_hours
        .map_or_else(|| "all time".to_string(), |h| format!("last {h}h"));
    println!(
        "  {:<10} {} ({window}, batches of {})",
        "Mode:".bright_black(),
        settings.mode,
        settings.batch_size
    );
    if let Some(assignee) = &settings.assign_to {
        println!("  {:<10} {assignee}", "Assign to:".bright_black());
    }
    println!(
        "  {:<10} {}",
        "Started:".bright_black(),
        started.format(TIME_FORMAT)
    );
    println!();
}

/// Print a section header.
pub fn print_section(title: &str) {
    println!();
    println!("{}", "═".repeat(RULE_WIDTH).bright_black());
    println!("{}", title.cyan().bold());
    println!("{}", "═".repeat(RULE_WIDTH).bright_black());
    println!();
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message.green());
}

/// Print a warning message.
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message.yellow());
}

/// Print an info message.
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Print a question without a trailing newline.
pub fn print_prompt(question: &str) {
    if let Err(e) = write_prompt(&mut io::stdout(), question) {
        debug!(error = %e, "Failed to write prompt");
    }
}

fn write_prompt<W: Write>(out: &mut W, question: &str) -> io::Result<()> {
    write!(out, "{} {} ", "?".yellow().bold(), question.bold())?;
    out.flush()
}

/// Print a fatal error and, when known, how to fix it.
pub fn print_error(error: &Error) {
    eprintln!("{} {}", "✗".red().bold(), error.to_string().red());
    if let Some(hint) = error.remediation() {
        eprintln!("  {} {hint}", "→".cyan());
    }
}

/// Numbered group listing with a grand total, uncoloured.
#[must_use]
pub fn render_summary(summary: &AlertSummary) -> String {
    let mut out = String::new();
    let name_width = summary
        .groups
        .iter()
        .map(|g| g.alert_name.chars().count())
        .max()
        .unwrap_or(0)
        .clamp(10, 48);

    for (index, group) in summary.groups.iter().enumerate() {
        let latest = group
            .latest
            .map_or_else(|| "unknown".to_string(), |t| t.format(TIME_FORMAT).to_string());
        let noun = if group.count() == 1 { "incident" } else { "incidents" };
        out.push_str(&format!(
            "{:>3}. {:<name_width$}  [{}]  {} {noun}  (latest: {latest})\n",
            index + 1,
            group.alert_name,
            group.severity,
            group.count(),
        ));
    }
    out.push_str(&format!(
        "\nTotal: {} incidents across {} alerts\n",
        summary.total(),
        summary.len()
    ));
    out
}

/// First `limit` incidents with id, creation time and status.
#[must_use]
pub fn render_incidents(incidents: &[Incident], limit: usize) -> String {
    let mut out = String::new();
    for incident in incidents.iter().take(limit) {
        let created = incident
            .created_at
            .map_or_else(|| "unknown".to_string(), |t| t.format(TIME_FORMAT).to_string());
        out.push_str(&format!(
            "  - {}  {created}  {}  {}\n",
            incident.id, incident.status, incident.alert_name
        ));
    }
    if incidents.len() > limit {
        out.push_str(&format!("  ... and {} more\n", incidents.len() - limit));
    }
    out
}

/// Print a sample of the selected incidents.
pub fn print_incidents(incidents: &[Incident]) {
    println!(
        "{}",
        format!(
            "First {} of {} incidents:",
            incidents.len().min(SAMPLE_LIMIT),
            incidents.len()
        )
        .bright_black()
    );
    print!("{}", render_incidents(incidents, SAMPLE_LIMIT));
    println!();
}

/// Print the selected incidents grouped by alert.
pub fn print_summary(summary: &AlertSummary) {
    print_section("Incidents by alert");
    print!("{}", render_summary(summary));
    println!();
}

/// One line per finished batch.
pub fn print_batch_progress(progress: &BatchProgress) {
    let tag = format!("[Batch {}/{}]", progress.number, progress.batches).bright_black();
    match (&progress.error, progress.failed) {
        (Some(error), _) => println!(
            "{tag} {} {} incidents failed: {}",
            "✗".red().bold(),
            progress.size,
            error.red()
        ),
        (None, 0) => println!(
            "{tag} {} {} incidents",
            "✓".green().bold(),
            progress.succeeded
        ),
        (None, failed) => println!(
            "{tag} {} {} succeeded, {} rejected",
            "⚠".yellow().bold(),
            progress.succeeded,
            failed
        ),
    }
}

/// Plain-text result block.
#[must_use]
pub fn render_result(result: &BatchResult, completed: DateTime<Utc>) -> String {
    format!(
        "Succeeded: {}\nFailed:    {}\nTotal:     {}\nCompleted: {}\n",
        result.succeeded,
        result.failed,
        result.total,
        completed.format(TIME_FORMAT)
    )
}

/// Print the closing summary block.
pub fn print_final_summary(settings: &Settings, result: &BatchResult, completed: DateTime<Utc>) {
    print_section("SUMMARY");
    print!("{}", render_result(result, completed));
    println!();
    if result.has_failures() {
        print_warning(&format!(
            "{} of {} incidents could not be {}",
            result.failed,
            result.total,
            settings.action.past()
        ));
    } else {
        print_success(&format!(
            "All {} incidents {}",
            result.total,
            settings.action.past()
        ));
    }
}

/// Nothing matched the filters.
pub fn print_nothing_to_do(settings: &Settings) {
    print_success(&format!(
        "Found 0 incidents to {}. Nothing to do.",
        settings.action.verb()
    ));
}

/// The operator declined.
pub fn print_cancelled() {
    println!("{}", "Operation cancelled. No action taken.".yellow());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlertGroup, Severity};
    use chrono::TimeZone;

    fn group(name: &str, severity: Severity, count: usize) -> AlertGroup {
        AlertGroup {
            alert_name: name.to_string(),
            severity,
            latest: Some(Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).unwrap()),
            incident_ids: (0..count).map(|i| format!("{name}-{i}")).collect(),
        }
    }

    #[test]
    fn test_render_summary_numbers_groups_and_totals() {
        let summary = AlertSummary {
            groups: vec![
                group("High CPU", Severity::Critical, 3),
                group("Disk full", Severity::Warning, 1),
            ],
        };
        let text = render_summary(&summary);
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[0].trim_start().starts_with("1. High CPU"));
        assert!(lines[0].contains("3 incidents"));
        assert!(lines[0].contains("2026-10-16 09:30:00 UTC"));
        assert!(lines[1].trim_start().starts_with("2. Disk full"));
        assert!(lines[1].contains("1 incident "));
        assert!(text.contains("Total: 4 incidents across 2 alerts"));
    }

    #[test]
    fn test_render_summary_unknown_latest() {
        let mut g = group("Unknown", Severity::Unknown, 2);
        g.latest = None;
        let text = render_summary(&AlertSummary { groups: vec![g] });
        assert!(text.contains("latest: unknown"));
    }

    #[test]
    fn test_render_incidents_shows_ids_and_truncates() {
        use crate::models::{IncidentState, IncidentStatus};

        let incidents: Vec<Incident> = (1..=12)
            .map(|i| Incident {
                id: format!("inc-{i}"),
                alert_name: "High CPU".to_string(),
                state: IncidentState::Triggered,
                status: IncidentStatus::Triggered,
                severity: Severity::Error,
                created_at: (i == 1).then(|| Utc.with_ymd_and_hms(2026, 10, 16, 8, 0, 0).unwrap()),
            })
            .collect();

        let text = render_incidents(&incidents, SAMPLE_LIMIT);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), SAMPLE_LIMIT + 1);
        assert!(lines[0].contains("inc-1 "));
        assert!(lines[0].contains("2026-10-16 08:00:00 UTC"));
        assert!(lines[0].contains("TRIGGERED"));
        assert!(lines[1].contains("unknown"));
        assert!(!text.contains("inc-11"));
        assert!(text.ends_with("... and 2 more\n"));
    }

    struct UnflushableWriter(Vec<u8>);

    impl Write for UnflushableWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdout closed"))
        }
    }

    #[test]
    fn test_write_prompt_surfaces_flush_errors() {
        let mut ok = Vec::new();
        write_prompt(&mut ok, "Proceed? (yes/no)").unwrap();
        assert!(String::from_utf8(ok).unwrap().contains("Proceed? (yes/no)"));

        let mut broken = UnflushableWriter(Vec::new());
        let err = write_prompt(&mut broken, "Proceed?").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert!(!broken.0.is_empty());
    }

    #[test]
    fn test_render_result_has_counts() {
        let result = BatchResult {
            succeeded: 6,
            failed: 4,
            total: 10,
        };
        let when = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let text = render_result(&result, when);
        assert!(text.contains("Succeeded: 6"));
        assert!(text.contains("Failed:    4"));
        assert!(text.contains("Total:     10"));
        assert!(text.contains("2026-01-02 03:04:05 UTC"));
    }
}
