//! Long-term goal commands for CLI.

use chrono::NaiveDate;
use clap::Subcommand;
use aitas_core::storage::Database;
use aitas_core::task::SuperGoal;
use uuid::Uuid;

#[derive(Subcommand)]
pub enum GoalAction {
    /// Create a long-term goal tasks can link to
    Add {
        /// Goal title
        title: String,
        /// Goal description
        #[arg(long)]
        description: Option<String>,
        /// Target date (YYYY-MM-DD)
        #[arg(long)]
        target: Option<NaiveDate>,
    },
    /// Get goal details
    Get {
        /// Goal ID
        id: String,
    },
}

pub fn run(action: GoalAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        GoalAction::Add {
            title,
            description,
            target,
        } => {
            let goal = SuperGoal {
                id: Uuid::new_v4().to_string(),
                title,
                description,
                target_date: target,
            };
            db.insert_super_goal(&goal)?;
            println!("Goal created: {}", goal.id);
            println!("{}", serde_json::to_string_pretty(&goal)?);
        }
        GoalAction::Get { id } => match db.get_super_goal(&id)? {
            Some(goal) => println!("{}", serde_json::to_string_pretty(&goal)?),
            None => println!("Goal not found: {id}"),
        },
    }
    Ok(())
}
