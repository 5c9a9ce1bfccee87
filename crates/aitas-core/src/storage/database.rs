//! SQLite-backed durable store.
//!
//! Provides persistent storage for:
//! - Tasks and subtasks (subtasks cascade on task delete)
//! - Categories
//! - The append-only suggestion log
//! - Reschedule history
//! - A key-value settings table
//!
//! All pipeline writes go through this boundary. Writes are per-record
//! and field-level; the pipeline relies on that for partial-failure
//! recovery (a failed stage never corrupts an earlier stage's write).

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::category::{Category, ScalingWeight};
use crate::error::DatabaseError;
use crate::review::ReviewResult;
use crate::suggestion::PendingSuggestion;
use crate::task::{
    ClassificationStatus, PortfolioType, Priority, RecurringPattern, SubTask, SuperGoal, Task,
    TaskType,
};

use super::data_dir;

/// Completion counts for one task-type bucket over a trailing window.
#[derive(Debug, Clone)]
pub struct TypeCompletionStats {
    pub task_type: TaskType,
    pub total: u32,
    pub completed: u32,
}

/// Completion counts for one day.
#[derive(Debug, Clone)]
pub struct DailyCompletionRate {
    pub day: NaiveDate,
    pub total: u32,
    pub completed: u32,
}

/// SQLite database for tasks, categories, and the pipeline's logs.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `~/.config/aitas/aitas.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, DatabaseError> {
        let path = data_dir()
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?
            .join("aitas.db");
        Self::open_at(&path)
    }

    /// Open (or create) the database at an explicit path.
    pub fn open_at(path: &std::path::Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests and dev tooling).
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory().map_err(DatabaseError::from)?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(
                "PRAGMA foreign_keys = ON;

                CREATE TABLE IF NOT EXISTS tasks (
                    id                    TEXT PRIMARY KEY NOT NULL,
                    title                 TEXT NOT NULL,
                    description           TEXT,
                    completed             INTEGER NOT NULL DEFAULT 0,
                    completed_at          TEXT,
                    due_date              TEXT,
                    original_due_date     TEXT,
                    priority              TEXT NOT NULL DEFAULT 'medium',
                    task_type             TEXT NOT NULL DEFAULT 'normal',
                    is_recurring          INTEGER NOT NULL DEFAULT 0,
                    recurring_pattern     TEXT,
                    portfolio             TEXT NOT NULL DEFAULT 'maintenance',
                    is_sanctuary          INTEGER NOT NULL DEFAULT 0,
                    category_id           TEXT,
                    via_fallback          INTEGER NOT NULL DEFAULT 0,
                    classification_status TEXT NOT NULL DEFAULT 'pending',
                    review_json           TEXT,
                    super_goal_id         TEXT,
                    reschedule_count      INTEGER NOT NULL DEFAULT 0,
                    created_at            TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS sub_tasks (
                    id        TEXT PRIMARY KEY NOT NULL,
                    task_id   TEXT NOT NULL,
                    title     TEXT NOT NULL,
                    completed INTEGER NOT NULL DEFAULT 0,
                    FOREIGN KEY (task_id) REFERENCES tasks(id) ON DELETE CASCADE
                );

                CREATE TABLE IF NOT EXISTS categories (
                    id             TEXT PRIMARY KEY NOT NULL,
                    name           TEXT NOT NULL,
                    icon           TEXT NOT NULL DEFAULT 'folder-outline',
                    color          TEXT NOT NULL DEFAULT '#9CA3AF',
                    sort_order     INTEGER NOT NULL DEFAULT 0,
                    is_default     INTEGER NOT NULL DEFAULT 0,
                    scaling_weight TEXT NOT NULL DEFAULT 'normal',
                    parent_id      TEXT
                );

                CREATE TABLE IF NOT EXISTS pending_suggestions (
                    id                 TEXT PRIMARY KEY NOT NULL,
                    suggested_name     TEXT NOT NULL,
                    task_id            TEXT NOT NULL,
                    parent_category_id TEXT,
                    reason             TEXT NOT NULL DEFAULT '',
                    created_at         TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS reschedule_history (
                    id         TEXT PRIMARY KEY NOT NULL,
                    reason     TEXT NOT NULL,
                    task_ids   TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS super_goals (
                    id          TEXT PRIMARY KEY NOT NULL,
                    title       TEXT NOT NULL,
                    description TEXT,
                    target_date TEXT
                );

                CREATE TABLE IF NOT EXISTS settings (
                    key   TEXT PRIMARY KEY NOT NULL,
                    value TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_tasks_due_date ON tasks(due_date);
                CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(classification_status);
                CREATE INDEX IF NOT EXISTS idx_suggestions_name ON pending_suggestions(suggested_name, created_at);",
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(())
    }

    // -----------------------------------------------------------------
    // Tasks
    // -----------------------------------------------------------------

    /// Insert a task together with its subtasks in one transaction.
    pub fn insert_task(&mut self, task: &Task) -> Result<(), DatabaseError> {
        let tx = self.conn.transaction().map_err(DatabaseError::from)?;
        tx.execute(
            "INSERT INTO tasks (id, title, description, completed, completed_at, due_date,
                original_due_date, priority, task_type, is_recurring, recurring_pattern,
                portfolio, is_sanctuary, category_id, via_fallback, classification_status,
                review_json, super_goal_id, reschedule_count, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)",
            params![
                task.id,
                task.title,
                task.description,
                task.completed as i32,
                task.completed_at.map(|t| t.to_rfc3339()),
                task.due_date.map(|d| d.to_string()),
                task.original_due_date.map(|d| d.to_string()),
                task.priority.as_str(),
                task.task_type.as_str(),
                task.is_recurring as i32,
                task.recurring_pattern.map(|p| p.as_str()),
                task.portfolio.as_str(),
                task.is_sanctuary as i32,
                task.category_id,
                task.via_fallback as i32,
                task.classification_status.as_str(),
                task.review
                    .as_ref()
                    .and_then(|r| serde_json::to_string(r).ok()),
                task.super_goal_id,
                task.reschedule_count,
                task.created_at.to_rfc3339(),
            ],
        )?;
        for sub in &task.sub_tasks {
            tx.execute(
                "INSERT INTO sub_tasks (id, task_id, title, completed) VALUES (?1, ?2, ?3, ?4)",
                params![sub.id, task.id, sub.title, sub.completed as i32],
            )?;
        }
        tx.commit().map_err(DatabaseError::from)?;
        Ok(())
    }

    /// Load a single task by id, with its subtasks.
    pub fn get_task(&self, task_id: &str) -> Result<Option<Task>, DatabaseError> {
        let mut stmt = self.conn.prepare("SELECT * FROM tasks WHERE id = ?1")?;
        let task = stmt
            .query_row(params![task_id], Self::map_task_row)
            .optional()?;
        match task {
            Some(mut task) => {
                task.sub_tasks = self.sub_tasks_for(&task.id)?;
                Ok(Some(task))
            }
            None => Ok(None),
        }
    }

    /// Load every task in insertion order (oldest first), with subtasks.
    pub fn all_tasks(&self) -> Result<Vec<Task>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM tasks ORDER BY created_at ASC, id ASC")?;
        let rows = stmt.query_map([], Self::map_task_row)?;
        let mut tasks = Vec::new();
        for row in rows {
            let mut task = row?;
            task.sub_tasks = self.sub_tasks_for(&task.id)?;
            tasks.push(task);
        }
        Ok(tasks)
    }

    fn sub_tasks_for(&self, task_id: &str) -> Result<Vec<SubTask>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, title, completed FROM sub_tasks WHERE task_id = ?1")?;
        let rows = stmt.query_map(params![task_id], |row| {
            Ok(SubTask {
                id: row.get(0)?,
                title: row.get(1)?,
                completed: row.get::<_, i32>(2)? == 1,
            })
        })?;
        let mut subs = Vec::new();
        for row in rows {
            subs.push(row?);
        }
        Ok(subs)
    }

    fn map_task_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
        let due_date: Option<String> = row.get("due_date")?;
        let original_due_date: Option<String> = row.get("original_due_date")?;
        let completed_at: Option<String> = row.get("completed_at")?;
        let created_at: String = row.get("created_at")?;
        let priority: String = row.get("priority")?;
        let task_type: String = row.get("task_type")?;
        let recurring_pattern: Option<String> = row.get("recurring_pattern")?;
        let portfolio: String = row.get("portfolio")?;
        let status: String = row.get("classification_status")?;
        let review_json: Option<String> = row.get("review_json")?;
        Ok(Task {
            id: row.get("id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            completed: row.get::<_, i32>("completed")? == 1,
            completed_at: completed_at
                .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                .map(|t| t.with_timezone(&Utc)),
            due_date: due_date.and_then(|s| s.parse().ok()),
            original_due_date: original_due_date.and_then(|s| s.parse().ok()),
            priority: Priority::parse(&priority),
            task_type: TaskType::parse(&task_type),
            is_recurring: row.get::<_, i32>("is_recurring")? == 1,
            recurring_pattern: recurring_pattern.and_then(|s| RecurringPattern::parse(&s)),
            portfolio: PortfolioType::parse(&portfolio),
            is_sanctuary: row.get::<_, i32>("is_sanctuary")? == 1,
            category_id: row.get("category_id")?,
            via_fallback: row.get::<_, i32>("via_fallback")? == 1,
            classification_status: ClassificationStatus::parse(&status),
            review: review_json.and_then(|s| serde_json::from_str(&s).ok()),
            super_goal_id: row.get("super_goal_id")?,
            reschedule_count: row.get("reschedule_count")?,
            sub_tasks: Vec::new(),
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }

    /// Set the completion flag, stamping or clearing `completed_at`.
    pub fn set_task_completed(
        &self,
        task_id: &str,
        completed: bool,
        now: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        self.conn.execute(
            "UPDATE tasks SET completed = ?1, completed_at = ?2 WHERE id = ?3",
            params![
                completed as i32,
                completed.then(|| now.to_rfc3339()),
                task_id
            ],
        )?;
        Ok(())
    }

    /// Delete a task; subtasks cascade.
    pub fn delete_task(&self, task_id: &str) -> Result<(), DatabaseError> {
        self.conn
            .execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;
        Ok(())
    }

    /// Persist a category assignment and mark classification completed.
    pub fn assign_category(
        &self,
        task_id: &str,
        category_id: &str,
        via_fallback: bool,
    ) -> Result<(), DatabaseError> {
        self.conn.execute(
            "UPDATE tasks SET category_id = ?1, via_fallback = ?2,
                classification_status = 'completed' WHERE id = ?3",
            params![category_id, via_fallback as i32, task_id],
        )?;
        Ok(())
    }

    /// Persist the sanctuary flag.
    pub fn set_task_sanctuary(&self, task_id: &str, sanctuary: bool) -> Result<(), DatabaseError> {
        self.conn.execute(
            "UPDATE tasks SET is_sanctuary = ?1 WHERE id = ?2",
            params![sanctuary as i32, task_id],
        )?;
        Ok(())
    }

    /// Persist the classification status.
    pub fn set_classification_status(
        &self,
        task_id: &str,
        status: ClassificationStatus,
    ) -> Result<(), DatabaseError> {
        self.conn.execute(
            "UPDATE tasks SET classification_status = ?1 WHERE id = ?2",
            params![status.as_str(), task_id],
        )?;
        Ok(())
    }

    /// Cache a review result on the task.
    pub fn store_review(&self, task_id: &str, review: &ReviewResult) -> Result<(), DatabaseError> {
        let json = serde_json::to_string(review)
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        self.conn.execute(
            "UPDATE tasks SET review_json = ?1 WHERE id = ?2",
            params![json, task_id],
        )?;
        Ok(())
    }

    /// Ids of every task still awaiting classification, oldest first.
    pub fn pending_task_ids(&self) -> Result<Vec<String>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id FROM tasks WHERE classification_status = 'pending'
             ORDER BY created_at ASC, id ASC",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    /// Incomplete tasks due exactly on `date`.
    pub fn incomplete_tasks_due_on(&self, date: NaiveDate) -> Result<Vec<Task>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM tasks WHERE completed = 0 AND due_date = ?1
             ORDER BY created_at ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![date.to_string()], Self::map_task_row)?;
        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?);
        }
        Ok(tasks)
    }

    /// Move the given tasks to a new due date in one transaction.
    ///
    /// Increments each task's reschedule counter and preserves the
    /// original due date on the first move.
    pub fn bulk_reschedule(
        &mut self,
        task_ids: &[String],
        new_due: NaiveDate,
    ) -> Result<(), DatabaseError> {
        let tx = self.conn.transaction().map_err(DatabaseError::from)?;
        for id in task_ids {
            tx.execute(
                "UPDATE tasks SET
                    original_due_date = COALESCE(original_due_date, due_date),
                    due_date = ?1,
                    reschedule_count = reschedule_count + 1
                 WHERE id = ?2",
                params![new_due.to_string(), id],
            )?;
        }
        tx.commit().map_err(DatabaseError::from)?;
        Ok(())
    }

    /// Append a reschedule-history entry listing every affected task id.
    pub fn insert_reschedule_record(
        &self,
        reason: &str,
        task_ids: &[String],
        now: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let ids_json = serde_json::to_string(task_ids)
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        self.conn.execute(
            "INSERT INTO reschedule_history (id, reason, task_ids, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                uuid::Uuid::new_v4().to_string(),
                reason,
                ids_json,
                now.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    /// Number of tasks due exactly today (for review prompt context).
    pub fn task_count_due_on(&self, date: NaiveDate) -> Result<u32, DatabaseError> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM tasks WHERE due_date = ?1",
            params![date.to_string()],
            |row| row.get::<_, u32>(0),
        )?;
        Ok(count)
    }

    // -----------------------------------------------------------------
    // Categories
    // -----------------------------------------------------------------

    pub fn insert_category(&self, category: &Category) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO categories
                (id, name, icon, color, sort_order, is_default, scaling_weight, parent_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                category.id,
                category.name,
                category.icon,
                category.color,
                category.sort_order,
                category.is_default as i32,
                category.scaling_weight.as_str(),
                category.parent_id,
            ],
        )?;
        Ok(())
    }

    pub fn all_categories(&self) -> Result<Vec<Category>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM categories ORDER BY sort_order ASC, name ASC")?;
        let rows = stmt.query_map([], |row| {
            let scaling: String = row.get("scaling_weight")?;
            Ok(Category {
                id: row.get("id")?,
                name: row.get("name")?,
                icon: row.get("icon")?,
                color: row.get("color")?,
                sort_order: row.get("sort_order")?,
                is_default: row.get::<_, i32>("is_default")? == 1,
                scaling_weight: ScalingWeight::parse(&scaling),
                parent_id: row.get("parent_id")?,
            })
        })?;
        let mut categories = Vec::new();
        for row in rows {
            categories.push(row?);
        }
        Ok(categories)
    }

    // -----------------------------------------------------------------
    // Suggestion log
    // -----------------------------------------------------------------

    /// Append to the suggestion log. The log is append-only; entries are
    /// consumed only for threshold counting.
    pub fn insert_suggestion(&self, suggestion: &PendingSuggestion) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO pending_suggestions
                (id, suggested_name, task_id, parent_category_id, reason, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                suggestion.id,
                suggestion.suggested_name,
                suggestion.task_id,
                suggestion.parent_category_id,
                suggestion.reason,
                suggestion.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// How many times `name` was suggested in the trailing `days` days.
    pub fn count_recent_suggestions_by_name(
        &self,
        name: &str,
        days: i64,
        now: DateTime<Utc>,
    ) -> Result<u32, DatabaseError> {
        let since = (now - Duration::days(days)).to_rfc3339();
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM pending_suggestions
             WHERE suggested_name = ?1 AND created_at >= ?2",
            params![name, since],
            |row| row.get::<_, u32>(0),
        )?;
        Ok(count)
    }

    /// How many tasks were routed into `category_id` by the fallback path.
    pub fn count_fallback_tasks_in_category(
        &self,
        category_id: &str,
    ) -> Result<u32, DatabaseError> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM tasks WHERE category_id = ?1 AND via_fallback = 1",
            params![category_id],
            |row| row.get::<_, u32>(0),
        )?;
        Ok(count)
    }

    // -----------------------------------------------------------------
    // Wellness queries
    // -----------------------------------------------------------------

    /// Completion counts per task-type bucket over the trailing window.
    pub fn completion_stats_by_type(
        &self,
        days: i64,
        today: NaiveDate,
    ) -> Result<Vec<TypeCompletionStats>, DatabaseError> {
        let since = (today - Duration::days(days)).to_string();
        let mut stmt = self.conn.prepare(
            "SELECT task_type, COUNT(*) AS total,
                    SUM(CASE WHEN completed = 1 THEN 1 ELSE 0 END) AS done
             FROM tasks
             WHERE due_date >= ?1 OR (due_date IS NULL AND substr(created_at, 1, 10) >= ?1)
             GROUP BY task_type",
        )?;
        let rows = stmt.query_map(params![since], |row| {
            let task_type: String = row.get(0)?;
            Ok(TypeCompletionStats {
                task_type: TaskType::parse(&task_type),
                total: row.get(1)?,
                completed: row.get(2)?,
            })
        })?;
        let mut stats = Vec::new();
        for row in rows {
            stats.push(row?);
        }
        Ok(stats)
    }

    /// Per-day completion counts over the trailing window, oldest first.
    /// Tasks without a due date are bucketed by creation day.
    pub fn daily_completion_rates(
        &self,
        days: i64,
        today: NaiveDate,
    ) -> Result<Vec<DailyCompletionRate>, DatabaseError> {
        let since = (today - Duration::days(days)).to_string();
        let mut stmt = self.conn.prepare(
            "SELECT COALESCE(due_date, substr(created_at, 1, 10)) AS day,
                    COUNT(*) AS total,
                    SUM(CASE WHEN completed = 1 THEN 1 ELSE 0 END) AS done
             FROM tasks
             WHERE due_date >= ?1 OR (due_date IS NULL AND substr(created_at, 1, 10) >= ?1)
             GROUP BY day
             ORDER BY day ASC",
        )?;
        let rows = stmt.query_map(params![since], |row| {
            let day: String = row.get(0)?;
            Ok((day, row.get::<_, u32>(1)?, row.get::<_, u32>(2)?))
        })?;
        let mut rates = Vec::new();
        for row in rows {
            let (day, total, completed) = row?;
            if let Ok(day) = day.parse() {
                rates.push(DailyCompletionRate {
                    day,
                    total,
                    completed,
                });
            }
        }
        Ok(rates)
    }

    // -----------------------------------------------------------------
    // Super goals
    // -----------------------------------------------------------------

    pub fn insert_super_goal(&self, goal: &SuperGoal) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO super_goals (id, title, description, target_date)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                goal.id,
                goal.title,
                goal.description,
                goal.target_date.map(|d| d.to_string()),
            ],
        )?;
        Ok(())
    }

    pub fn get_super_goal(&self, goal_id: &str) -> Result<Option<SuperGoal>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, title, description, target_date FROM super_goals WHERE id = ?1")?;
        let goal = stmt
            .query_row(params![goal_id], |row| {
                let target: Option<String> = row.get(3)?;
                Ok(SuperGoal {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    description: row.get(2)?,
                    target_date: target.and_then(|s| s.parse().ok()),
                })
            })
            .optional()?;
        Ok(goal)
    }

    // -----------------------------------------------------------------
    // Settings (key-value)
    // -----------------------------------------------------------------

    /// Get a value from the settings table.
    pub fn setting_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM settings WHERE key = ?1")?;
        let value = stmt
            .query_row(params![key], |row| row.get::<_, String>(0))
            .optional()?;
        Ok(value)
    }

    /// Set a value in the settings table.
    pub fn setting_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Write several settings as one atomic group. `None` deletes a key.
    pub fn setting_set_group(
        &mut self,
        entries: &[(&str, Option<String>)],
    ) -> Result<(), DatabaseError> {
        let tx = self.conn.transaction().map_err(DatabaseError::from)?;
        for (key, value) in entries {
            match value {
                Some(value) => {
                    tx.execute(
                        "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
                        params![key, value],
                    )?;
                }
                None => {
                    tx.execute("DELETE FROM settings WHERE key = ?1", params![key])?;
                }
            }
        }
        tx.commit().map_err(DatabaseError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_load_round_trip() {
        let mut db = Database::open_memory().unwrap();
        let mut task = Task::new("Write draft");
        task.due_date = Some("2026-08-23".parse().unwrap());
        task.priority = Priority::High;
        task.sub_tasks.push(SubTask {
            id: uuid::Uuid::new_v4().to_string(),
            title: "Outline".to_string(),
            completed: false,
        });
        db.insert_task(&task).unwrap();

        let loaded = db.get_task(&task.id).unwrap().unwrap();
        assert_eq!(loaded.title, "Write draft");
        assert_eq!(loaded.priority, Priority::High);
        assert_eq!(loaded.sub_tasks.len(), 1);
        assert_eq!(loaded.classification_status, ClassificationStatus::Pending);
    }

    #[test]
    fn delete_cascades_to_subtasks() {
        let mut db = Database::open_memory().unwrap();
        let mut task = Task::new("Parent");
        task.sub_tasks.push(SubTask {
            id: "sub-1".to_string(),
            title: "Child".to_string(),
            completed: false,
        });
        db.insert_task(&task).unwrap();
        db.delete_task(&task.id).unwrap();

        let count: u32 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM sub_tasks", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn bulk_reschedule_preserves_original_due_date() {
        let mut db = Database::open_memory().unwrap();
        let mut task = Task::new("Due today");
        task.due_date = Some("2026-08-23".parse().unwrap());
        db.insert_task(&task).unwrap();

        let tomorrow: NaiveDate = "2026-08-24".parse().unwrap();
        db.bulk_reschedule(&[task.id.clone()], tomorrow).unwrap();
        db.bulk_reschedule(&[task.id.clone()], "2026-08-25".parse().unwrap())
            .unwrap();

        let loaded = db.get_task(&task.id).unwrap().unwrap();
        assert_eq!(loaded.due_date, Some("2026-08-25".parse().unwrap()));
        assert_eq!(
            loaded.original_due_date,
            Some("2026-08-23".parse().unwrap())
        );
        assert_eq!(loaded.reschedule_count, 2);
    }

    #[test]
    fn pending_ids_exclude_completed_and_failed() {
        let mut db = Database::open_memory().unwrap();
        let a = Task::new("a");
        let b = Task::new("b");
        let c = Task::new("c");
        db.insert_task(&a).unwrap();
        db.insert_task(&b).unwrap();
        db.insert_task(&c).unwrap();
        db.set_classification_status(&b.id, ClassificationStatus::Completed)
            .unwrap();
        db.set_classification_status(&c.id, ClassificationStatus::Failed)
            .unwrap();

        let pending = db.pending_task_ids().unwrap();
        assert_eq!(pending, vec![a.id]);
    }

    #[test]
    fn settings_group_is_atomic_and_supports_delete() {
        let mut db = Database::open_memory().unwrap();
        db.setting_set_group(&[
            ("care_mode_active", Some("true".to_string())),
            ("care_mode_reason", Some("rest".to_string())),
        ])
        .unwrap();
        assert_eq!(
            db.setting_get("care_mode_reason").unwrap().as_deref(),
            Some("rest")
        );

        db.setting_set_group(&[
            ("care_mode_active", Some("false".to_string())),
            ("care_mode_reason", None),
        ])
        .unwrap();
        assert!(db.setting_get("care_mode_reason").unwrap().is_none());
    }

    #[test]
    fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aitas.db");

        let task = Task::new("Persisted");
        {
            let mut db = Database::open_at(&path).unwrap();
            db.insert_task(&task).unwrap();
            db.setting_set("personality", "maji").unwrap();
        }

        let db = Database::open_at(&path).unwrap();
        assert!(db.get_task(&task.id).unwrap().is_some());
        assert_eq!(
            db.setting_get("personality").unwrap().as_deref(),
            Some("maji")
        );
    }
}
