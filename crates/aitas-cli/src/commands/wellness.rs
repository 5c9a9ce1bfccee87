//! Wellness score commands for CLI.

use chrono::Utc;
use clap::Subcommand;
use aitas_core::care_mode::record_self_report;
use aitas_core::pipeline::wellness_snapshot;
use aitas_core::scoring::SelfReport;
use aitas_core::storage::Database;

#[derive(Subcommand)]
pub enum WellnessAction {
    /// Show the current wellness score and breakdown
    Show {
        /// Consecutive perfect days
        #[arg(long, default_value = "0")]
        streak: u32,
        /// A soft streak is being kept alive by partial completion
        #[arg(long)]
        soft_streak: bool,
        /// A streak was recently broken
        #[arg(long)]
        streak_broken: bool,
    },
    /// Record today's self-report: good, normal, tough
    Report {
        /// Condition
        condition: String,
    },
}

pub fn run(action: WellnessAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut db = Database::open()?;
    let now = Utc::now();

    match action {
        WellnessAction::Show {
            streak,
            soft_streak,
            streak_broken,
        } => {
            let score = wellness_snapshot(&mut db, now, streak, soft_streak, streak_broken)?;
            println!("{}", serde_json::to_string_pretty(&score)?);
        }
        WellnessAction::Report { condition } => {
            let report = SelfReport::parse(&condition)
                .ok_or(format!("unknown condition: {condition} (use good, normal, or tough)"))?;
            let care = record_self_report(&mut db, report, now)?;
            println!("Self-report recorded: {}", report.as_str());
            if !care.active {
                println!("Care mode: inactive");
            } else {
                println!("{}", serde_json::to_string_pretty(&care)?);
            }
        }
    }
    Ok(())
}
