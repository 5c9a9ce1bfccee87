//! Care-mode state machine.
//!
//! Care mode is a temporary, time-boxed leniency state. It is entered
//! when the user reschedules their day because they need rest (1 day) or
//! are struggling (3 days), and left either explicitly, by reporting
//! `good` while active, or lazily at load time once the expiry passes.
//! There is no background timer; expiry is checked whenever the state is
//! loaded.
//!
//! The persisted triple (active flag, reason, expiry) is written as one
//! atomic settings group.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::scoring::SelfReport;
use crate::storage::Database;
use crate::task::RescheduleReason;

const KEY_ACTIVE: &str = "care_mode_active";
const KEY_REASON: &str = "care_mode_reason";
const KEY_EXPIRES: &str = "care_mode_expires_at";

/// Persisted care-mode state.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CareModeState {
    pub active: bool,
    pub reason: Option<RescheduleReason>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CareModeState {
    fn inactive() -> Self {
        CareModeState::default()
    }

    /// Load the persisted state, expiring it lazily if the deadline has
    /// passed.
    pub fn load(db: &mut Database, now: DateTime<Utc>) -> Result<CareModeState> {
        let active = db
            .setting_get(KEY_ACTIVE)?
            .map(|v| v == "true")
            .unwrap_or(false);
        if !active {
            return Ok(CareModeState::inactive());
        }

        let reason = db
            .setting_get(KEY_REASON)?
            .and_then(|v| RescheduleReason::parse(&v));
        let expires_at = db
            .setting_get(KEY_EXPIRES)?
            .and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
            .map(|t| t.with_timezone(&Utc));

        match expires_at {
            Some(expiry) if expiry > now => Ok(CareModeState {
                active: true,
                reason,
                expires_at,
            }),
            _ => {
                // Expired (or corrupt expiry): clear it on the spot.
                tracing::info!("care mode expired, deactivating");
                Self::write_inactive(db)?;
                Ok(CareModeState::inactive())
            }
        }
    }

    /// Enter care mode for the given reschedule reason.
    ///
    /// `Rest` activates for 1 day, `Struggling` for 3 days, and
    /// `ScheduleChange` is explicitly excluded and leaves the state
    /// untouched. Returns the state after the transition.
    pub fn enter(
        db: &mut Database,
        reason: RescheduleReason,
        now: DateTime<Utc>,
    ) -> Result<CareModeState> {
        let days = match reason {
            RescheduleReason::Rest => 1,
            RescheduleReason::Struggling => 3,
            RescheduleReason::ScheduleChange => return Self::load(db, now),
        };
        let expires_at = now + Duration::days(days);
        db.setting_set_group(&[
            (KEY_ACTIVE, Some("true".to_string())),
            (KEY_REASON, Some(reason.as_str().to_string())),
            (KEY_EXPIRES, Some(expires_at.to_rfc3339())),
        ])?;
        tracing::info!(reason = reason.as_str(), %expires_at, "care mode entered");
        Ok(CareModeState {
            active: true,
            reason: Some(reason),
            expires_at: Some(expires_at),
        })
    }

    /// Explicitly leave care mode.
    pub fn exit(db: &mut Database) -> Result<CareModeState> {
        Self::write_inactive(db)?;
        Ok(CareModeState::inactive())
    }

    fn write_inactive(db: &mut Database) -> Result<()> {
        db.setting_set_group(&[
            (KEY_ACTIVE, Some("false".to_string())),
            (KEY_REASON, None),
            (KEY_EXPIRES, None),
        ])?;
        Ok(())
    }
}

/// Persist today's self-report. Reporting `good` while care mode is
/// active exits care mode.
pub fn record_self_report(
    db: &mut Database,
    report: SelfReport,
    now: DateTime<Utc>,
) -> Result<CareModeState> {
    db.setting_set("self_report", report.as_str())?;
    db.setting_set("self_report_date", &now.date_naive().to_string())?;

    let state = CareModeState::load(db, now)?;
    if state.active && report == SelfReport::Good {
        return CareModeState::exit(db);
    }
    Ok(state)
}

/// Outcome of a bulk reschedule.
#[derive(Debug, Clone)]
pub struct RescheduleOutcome {
    /// Every task id that was moved
    pub task_ids: Vec<String>,
    /// Care-mode state after the reason's side effect was applied
    pub care_mode: CareModeState,
}

/// Move every incomplete task due today to tomorrow.
///
/// This happens for all three reasons: each affected task's due date
/// moves forward one day, its reschedule counter increments, and one
/// history entry records the affected ids and the reason. Entering care
/// mode is a side effect of `Rest` and `Struggling` only.
pub fn bulk_reschedule(
    db: &mut Database,
    reason: RescheduleReason,
    now: DateTime<Utc>,
) -> Result<RescheduleOutcome> {
    let today = now.date_naive();
    let tomorrow = today + Duration::days(1);

    let due_today = db.incomplete_tasks_due_on(today)?;
    let task_ids: Vec<String> = due_today.iter().map(|t| t.id.clone()).collect();

    if !task_ids.is_empty() {
        db.bulk_reschedule(&task_ids, tomorrow)?;
    }
    db.insert_reschedule_record(reason.as_str(), &task_ids, now)?;

    let care_mode = CareModeState::enter(db, reason, now)?;
    Ok(RescheduleOutcome {
        task_ids,
        care_mode,
    })
}
