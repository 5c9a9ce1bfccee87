//! Pipeline commands for CLI.

use std::sync::{Arc, Mutex};

use clap::Subcommand;
use aitas_core::pipeline::Pipeline;
use aitas_core::storage::Database;

#[derive(Subcommand)]
pub enum PipelineAction {
    /// Run the classification and review pipeline for one task
    Run {
        /// Task ID
        id: String,
    },
    /// Re-run every task still pending classification
    Replay,
    /// List task IDs still pending classification
    Pending,
    /// Reset a failed task to pending so replay picks it up
    Reset {
        /// Task ID
        id: String,
    },
}

pub fn run(action: PipelineAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Arc::new(Mutex::new(Database::open()?));
    let pipeline = Pipeline::new(db.clone());
    let runtime = tokio::runtime::Runtime::new()?;

    match action {
        PipelineAction::Run { id } => {
            runtime.block_on(pipeline.run(&id))?;
            let task = db
                .lock()
                .unwrap()
                .get_task(&id)?
                .ok_or(format!("Task not found: {id}"))?;
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        PipelineAction::Replay => {
            let summary = runtime.block_on(pipeline.replay())?;
            println!(
                "Replayed {} pending task(s), {} failed",
                summary.total, summary.failed
            );
        }
        PipelineAction::Pending => {
            let ids = db.lock().unwrap().pending_task_ids()?;
            println!("{}", serde_json::to_string_pretty(&ids)?);
        }
        PipelineAction::Reset { id } => {
            if pipeline.reset_to_pending(&id)? {
                println!("Task reset to pending: {id}");
            } else {
                println!("Task is not failed, nothing to reset: {id}");
            }
        }
    }
    Ok(())
}
