//! Suggestion log and category-review thresholds.
//!
//! When inference proposes a subcategory that does not exist yet, the
//! proposal is not acted on immediately. It is appended to a suggestion
//! log and two thresholds decide when to raise a review flag for the
//! user: the same name suggested repeatedly within a trailing window, or
//! a default category absorbing too many fallback tasks. The flag is a
//! single pending marker the UI surfaces; this crate only raises it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::storage::Database;

/// Same name suggested this many times within the window.
pub const FREQUENCY_THRESHOLD: u32 = 3;
/// Trailing window for the frequency rule, in days.
pub const FREQUENCY_WINDOW_DAYS: i64 = 7;
/// Fallback-routed tasks in one category before the overflow rule fires.
pub const FALLBACK_OVERFLOW_THRESHOLD: u32 = 5;

const PENDING_REVIEW_KEY: &str = "pending_category_review";

/// One append-only entry in the suggestion log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingSuggestion {
    pub id: String,
    /// Proposed subcategory name
    pub suggested_name: String,
    /// Task that triggered the proposal
    pub task_id: String,
    /// Proposed parent category, if the model named one
    pub parent_category_id: Option<String>,
    /// Free-form reason from the model
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl PendingSuggestion {
    pub fn new(
        suggested_name: &str,
        task_id: &str,
        parent_category_id: Option<String>,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Self {
        PendingSuggestion {
            id: Uuid::new_v4().to_string(),
            suggested_name: suggested_name.to_string(),
            task_id: task_id.to_string(),
            parent_category_id,
            reason: reason.to_string(),
            created_at: now,
        }
    }
}

/// Which rule fired.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdTrigger {
    /// Same name suggested repeatedly within the window
    Frequency,
    /// Default category absorbing too many fallback tasks
    FallbackOverflow,
}

/// The pending review flag persisted under a settings key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingCategoryReview {
    pub suggested_name: String,
    pub trigger: ThresholdTrigger,
    /// Count that crossed the threshold
    pub count: u32,
    pub raised_at: DateTime<Utc>,
}

impl PendingCategoryReview {
    /// Read the current flag, if raised.
    pub fn load(db: &Database) -> Result<Option<PendingCategoryReview>> {
        match db.setting_get(PENDING_REVIEW_KEY)? {
            Some(json) => Ok(serde_json::from_str(&json).ok()),
            None => Ok(None),
        }
    }

    /// Dismiss the flag.
    pub fn clear(db: &mut Database) -> Result<()> {
        db.setting_set_group(&[(PENDING_REVIEW_KEY, None)])?;
        Ok(())
    }

    fn raise(&self, db: &Database) -> Result<()> {
        let json = serde_json::to_string(self)?;
        db.setting_set(PENDING_REVIEW_KEY, &json)?;
        Ok(())
    }
}

/// Record a new-subcategory proposal and evaluate both thresholds.
///
/// The frequency rule is checked first; only when it does not fire is
/// the fallback-overflow rule consulted. A firing rule overwrites any
/// previously raised flag. Returns the flag that was raised, if any.
pub fn record_and_check(
    db: &Database,
    suggestion: &PendingSuggestion,
    fallback_category_id: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Option<PendingCategoryReview>> {
    db.insert_suggestion(suggestion)?;

    let recent =
        db.count_recent_suggestions_by_name(&suggestion.suggested_name, FREQUENCY_WINDOW_DAYS, now)?;
    if recent >= FREQUENCY_THRESHOLD {
        let flag = PendingCategoryReview {
            suggested_name: suggestion.suggested_name.clone(),
            trigger: ThresholdTrigger::Frequency,
            count: recent,
            raised_at: now,
        };
        flag.raise(db)?;
        tracing::info!(name = %suggestion.suggested_name, count = recent, "category review raised (frequency)");
        return Ok(Some(flag));
    }

    if let Some(category_id) = fallback_category_id {
        let fallback_count = db.count_fallback_tasks_in_category(category_id)?;
        if fallback_count >= FALLBACK_OVERFLOW_THRESHOLD {
            let flag = PendingCategoryReview {
                suggested_name: suggestion.suggested_name.clone(),
                trigger: ThresholdTrigger::FallbackOverflow,
                count: fallback_count,
                raised_at: now,
            };
            flag.raise(db)?;
            tracing::info!(name = %suggestion.suggested_name, count = fallback_count, "category review raised (fallback overflow)");
            return Ok(Some(flag));
        }
    }

    Ok(None)
}
