//! Task data model.
//!
//! A task carries two kinds of state: what the user edits directly
//! (title, due date, priority, completion) and what the classification
//! pipeline writes back (category assignment, sanctuary flag, cached
//! review, classification status). Pipeline writes are field-level and
//! additive, so readers may observe a task mid-enrichment.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::review::ReviewResult;

/// Display priority of a task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    pub fn parse(s: &str) -> Priority {
        match s {
            "high" => Priority::High,
            "low" => Priority::Low,
            _ => Priority::Medium,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

/// Completion-rate bucket used by the wellness calculator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    /// Recurring habit-style tasks (weight 0.6)
    Routine,
    /// Everyday tasks (weight 0.3)
    Normal,
    /// Deadline-driven tasks (weight 0.1)
    Urgent,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Routine => "routine",
            TaskType::Normal => "normal",
            TaskType::Urgent => "urgent",
        }
    }

    pub fn parse(s: &str) -> TaskType {
        match s {
            "routine" => TaskType::Routine,
            "urgent" => TaskType::Urgent,
            _ => TaskType::Normal,
        }
    }
}

impl Default for TaskType {
    fn default() -> Self {
        TaskType::Normal
    }
}

/// Coarse life-role classification of a task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PortfolioType {
    /// Pushes a long-term goal forward
    Drive,
    /// Keeps daily life running
    Maintenance,
    /// Restorative; always treated as sanctuary
    Recharge,
}

impl PortfolioType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortfolioType::Drive => "drive",
            PortfolioType::Maintenance => "maintenance",
            PortfolioType::Recharge => "recharge",
        }
    }

    pub fn parse(s: &str) -> PortfolioType {
        match s {
            "drive" => PortfolioType::Drive,
            "recharge" => PortfolioType::Recharge,
            _ => PortfolioType::Maintenance,
        }
    }
}

impl Default for PortfolioType {
    fn default() -> Self {
        PortfolioType::Maintenance
    }
}

/// Per-task pipeline state, persisted so replay can re-derive work
/// remaining purely from storage.
///
/// Transitions: `Pending` -> `Completed` (category assignment persisted)
/// or `Pending` -> `Failed` (stage error). `Failed` is terminal unless
/// the user explicitly resets the task to `Pending`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationStatus {
    Pending,
    Completed,
    Failed,
}

impl ClassificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationStatus::Pending => "pending",
            ClassificationStatus::Completed => "completed",
            ClassificationStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> ClassificationStatus {
        match s {
            "completed" => ClassificationStatus::Completed,
            "failed" => ClassificationStatus::Failed,
            _ => ClassificationStatus::Pending,
        }
    }
}

impl Default for ClassificationStatus {
    fn default() -> Self {
        ClassificationStatus::Pending
    }
}

/// Recurrence descriptor for repeating tasks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecurringPattern {
    Daily,
    Weekly,
    Monthly,
}

impl RecurringPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurringPattern::Daily => "daily",
            RecurringPattern::Weekly => "weekly",
            RecurringPattern::Monthly => "monthly",
        }
    }

    pub fn parse(s: &str) -> Option<RecurringPattern> {
        match s {
            "daily" => Some(RecurringPattern::Daily),
            "weekly" => Some(RecurringPattern::Weekly),
            "monthly" => Some(RecurringPattern::Monthly),
            _ => None,
        }
    }
}

/// User-declared reason attached to a bulk reschedule.
///
/// `Rest` and `Struggling` additionally activate care mode;
/// `ScheduleChange` never does.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RescheduleReason {
    ScheduleChange,
    Rest,
    Struggling,
}

impl RescheduleReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RescheduleReason::ScheduleChange => "schedule_change",
            RescheduleReason::Rest => "rest",
            RescheduleReason::Struggling => "struggling",
        }
    }

    pub fn parse(s: &str) -> Option<RescheduleReason> {
        match s {
            "schedule_change" => Some(RescheduleReason::ScheduleChange),
            "rest" => Some(RescheduleReason::Rest),
            "struggling" => Some(RescheduleReason::Struggling),
            _ => None,
        }
    }
}

/// A subtask under a task. Deleted together with its parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubTask {
    pub id: String,
    pub title: String,
    pub completed: bool,
}

/// A long-term goal a task may be linked to; the link feeds the review
/// prompt so necessity is judged against the goal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuperGoal {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub target_date: Option<NaiveDate>,
}

/// A personal task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// Task title
    pub title: String,
    /// Optional description
    pub description: Option<String>,
    /// Whether the task is completed
    pub completed: bool,
    /// Completion timestamp; set if and only if `completed` is true
    pub completed_at: Option<DateTime<Utc>>,
    /// Optional due date
    pub due_date: Option<NaiveDate>,
    /// Due date before the first reschedule, preserved for history
    pub original_due_date: Option<NaiveDate>,
    /// Display priority
    pub priority: Priority,
    /// Wellness bucket
    pub task_type: TaskType,
    /// Whether this task recurs
    pub is_recurring: bool,
    /// Recurrence descriptor when `is_recurring`
    pub recurring_pattern: Option<RecurringPattern>,
    /// Portfolio classification
    pub portfolio: PortfolioType,
    /// Protected from critical review
    pub is_sanctuary: bool,
    /// Assigned category, written by the pipeline or the user
    pub category_id: Option<String>,
    /// Whether the category was assigned via the fallback path
    pub via_fallback: bool,
    /// Pipeline state for this task
    pub classification_status: ClassificationStatus,
    /// Cached review result, written by the pipeline
    pub review: Option<ReviewResult>,
    /// Optional link to a long-term goal
    pub super_goal_id: Option<String>,
    /// Number of times this task was rescheduled; only ever increases
    pub reschedule_count: u32,
    /// Subtasks
    pub sub_tasks: Vec<SubTask>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Create a new incomplete task with default values.
    pub fn new(title: impl Into<String>) -> Self {
        Task {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            description: None,
            completed: false,
            completed_at: None,
            due_date: None,
            original_due_date: None,
            priority: Priority::Medium,
            task_type: TaskType::Normal,
            is_recurring: false,
            recurring_pattern: None,
            portfolio: PortfolioType::Maintenance,
            is_sanctuary: false,
            category_id: None,
            via_fallback: false,
            classification_status: ClassificationStatus::Pending,
            review: None,
            super_goal_id: None,
            reschedule_count: 0,
            sub_tasks: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Mark the task completed, stamping `completed_at`.
    pub fn complete(&mut self, now: DateTime<Utc>) {
        self.completed = true;
        self.completed_at = Some(now);
    }

    /// Reopen a completed task, clearing `completed_at`.
    pub fn reopen(&mut self) {
        self.completed = false;
        self.completed_at = None;
    }
}
