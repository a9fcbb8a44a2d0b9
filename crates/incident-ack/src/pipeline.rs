//! One complete run: list, group, show, confirm, mutate, summarize.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::Settings;
use crate::confirm::Confirmer;
use crate::error::Error;
use crate::models::{AlertSummary, BatchResult};
use crate::mutator::BatchMutator;
use crate::selector::{group_by_alert, IncidentFilter, IncidentSelector};
use crate::transport::Transport;
use crate::ui;

/// How a run ended when nothing fatal happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The filters matched no incidents.
    NoIncidents,
    /// `--dry-run`: listed and stopped.
    Previewed(AlertSummary),
    /// The operator said no.
    Declined(AlertSummary),
    Completed(BatchResult),
    /// Mutation stopped on a fatal error; unsent ids count as failed.
    Aborted { result: BatchResult, reason: String },
}

impl RunOutcome {
    /// Process exit status for this outcome.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Completed(result) if result.has_failures() => 1,
            Self::Aborted { .. } => 1,
            _ => 0,
        }
    }
}

/// Drive a single run against `transport`.
///
/// Listing errors abort before anything is shown. The confirmer is asked
/// only when there is something to mutate.
pub async fn run<T, C>(
    settings: &Settings,
    transport: &T,
    confirmer: &mut C,
    now: DateTime<Utc>,
) -> Result<RunOutcome, Error>
where
    T: Transport + ?Sized,
    C: Confirmer + ?Sized,
{
    let filter = IncidentFilter::from_settings(settings, now);
    let incidents = IncidentSelector::new(transport).list(&filter).await?;
    let summary = group_by_alert(&incidents);

    if summary.is_empty() {
        ui::print_nothing_to_do(settings);
        return Ok(RunOutcome::NoIncidents);
    }

    ui::print_summary(&summary);
    ui::print_incidents(&incidents);

    if settings.dry_run {
        ui::print_info("Dry run: no incidents were changed.");
        return Ok(RunOutcome::Previewed(summary));
    }

    if !confirmer.confirm(&summary, settings.action)? {
        info!(action = %settings.action, "Operator declined");
        ui::print_cancelled();
        return Ok(RunOutcome::Declined(summary));
    }

    let ids = summary.incident_ids();
    ui::print_section(&format!(
        "{} {} incidents",
        settings.action.progressive(),
        ids.len()
    ));

    let report = BatchMutator::new(transport, settings.batch_size)
        .mutate(
            settings.action,
            &ids,
            settings.assign_to.as_deref(),
            ui::print_batch_progress,
        )
        .await;

    ui::print_final_summary(settings, &report.result, Utc::now());
    match report.aborted {
        Some(error) => {
            ui::print_error(&error);
            Ok(RunOutcome::Aborted {
                result: report.result,
                reason: error.to_string(),
            })
        }
        None => Ok(RunOutcome::Completed(report.result)),
    }
}
