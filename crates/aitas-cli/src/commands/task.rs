//! Task management commands for CLI.

use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use aitas_core::scoring::{rank_tasks_with_skips, FocusView};
use aitas_core::storage::Database;
use aitas_core::task::{Priority, PortfolioType, RecurringPattern, Task, TaskType};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task
    Add {
        /// Task title
        title: String,
        /// Task description
        #[arg(long)]
        description: Option<String>,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<NaiveDate>,
        /// Priority: high, medium, low (default: medium)
        #[arg(long, default_value = "medium")]
        priority: String,
        /// Task type: routine, normal, urgent (default: normal)
        #[arg(long = "type", default_value = "normal")]
        task_type: String,
        /// Portfolio: drive, maintenance, recharge (default: maintenance)
        #[arg(long, default_value = "maintenance")]
        portfolio: String,
        /// Recurring pattern: daily, weekly, monthly
        #[arg(long)]
        recurring: Option<String>,
        /// Long-term goal ID to link
        #[arg(long)]
        goal: Option<String>,
    },
    /// List all tasks
    List,
    /// Get task details
    Get {
        /// Task ID
        id: String,
    },
    /// Show the ranked focus view for today
    Score {
        /// Task IDs skipped for now (demoted to the end)
        #[arg(long)]
        skip: Vec<String>,
    },
    /// Mark a task completed
    Complete {
        /// Task ID
        id: String,
    },
    /// Reopen a completed task
    Reopen {
        /// Task ID
        id: String,
    },
    /// Delete a task
    Delete {
        /// Task ID
        id: String,
    },
}

pub fn run(action: TaskAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut db = Database::open()?;

    match action {
        TaskAction::Add {
            title,
            description,
            due,
            priority,
            task_type,
            portfolio,
            recurring,
            goal,
        } => {
            let mut task = Task::new(title);
            task.description = description;
            task.due_date = due;
            task.priority = Priority::parse(&priority);
            task.task_type = TaskType::parse(&task_type);
            task.portfolio = PortfolioType::parse(&portfolio);
            if let Some(pattern) = recurring {
                let pattern = RecurringPattern::parse(&pattern)
                    .ok_or(format!("unknown recurring pattern: {pattern}"))?;
                task.recurring_pattern = Some(pattern);
                task.is_recurring = true;
            }
            task.super_goal_id = goal;

            db.insert_task(&task)?;
            println!("Task created: {}", task.id);
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskAction::List => {
            let tasks = db.all_tasks()?;
            println!("{}", serde_json::to_string_pretty(&tasks)?);
        }
        TaskAction::Get { id } => match db.get_task(&id)? {
            Some(task) => println!("{}", serde_json::to_string_pretty(&task)?),
            None => println!("Task not found: {id}"),
        },
        TaskAction::Score { skip } => {
            let tasks = db.all_tasks()?;
            let categories = db.all_categories()?;
            let today = Utc::now().date_naive();
            let ranked = rank_tasks_with_skips(&tasks, &categories, today, &skip);
            let view = FocusView::from_ranked(ranked);
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        TaskAction::Complete { id } => {
            db.set_task_completed(&id, true, Utc::now())?;
            println!("Task completed: {id}");
        }
        TaskAction::Reopen { id } => {
            db.set_task_completed(&id, false, Utc::now())?;
            println!("Task reopened: {id}");
        }
        TaskAction::Delete { id } => {
            db.delete_task(&id)?;
            println!("Task deleted: {id}");
        }
    }
    Ok(())
}
