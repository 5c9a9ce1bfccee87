//! Care mode and bulk reschedule commands for CLI.

use chrono::Utc;
use clap::Subcommand;
use aitas_core::care_mode::{bulk_reschedule, CareModeState};
use aitas_core::storage::Database;
use aitas_core::task::RescheduleReason;

#[derive(Subcommand)]
pub enum CareAction {
    /// Show the current care-mode state
    Status,
    /// Move every incomplete task due today to tomorrow.
    /// Reasons rest and struggling also enter care mode.
    Reschedule {
        /// Reason: schedule_change, rest, struggling
        reason: String,
    },
    /// Leave care mode explicitly
    Exit,
}

pub fn run(action: CareAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut db = Database::open()?;
    let now = Utc::now();

    match action {
        CareAction::Status => {
            let state = CareModeState::load(&mut db, now)?;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
        CareAction::Reschedule { reason } => {
            let reason = RescheduleReason::parse(&reason).ok_or(format!(
                "unknown reason: {reason} (use schedule_change, rest, or struggling)"
            ))?;
            let outcome = bulk_reschedule(&mut db, reason, now)?;
            println!("Rescheduled {} task(s) to tomorrow", outcome.task_ids.len());
            println!("{}", serde_json::to_string_pretty(&outcome.care_mode)?);
        }
        CareAction::Exit => {
            let state = CareModeState::exit(&mut db)?;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
    }
    Ok(())
}
