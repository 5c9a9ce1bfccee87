//! Wellness score calculator.
//!
//! Aggregates the trailing 7 days of completion history, a daily
//! self-report, and streak state into a single 0-100 health score. The
//! weighting between the three measurements is dynamic: with little
//! history the self-report dominates, and the quantitative measurements
//! take over as data accumulates.
//!
//! The calculation is pure. Callers query the database for the two
//! history inputs and pass them in; streak inputs are supplied by the
//! caller as-is.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::storage::{DailyCompletionRate, TypeCompletionStats};
use crate::task::TaskType;

/// Trailing window for completion history, in days.
pub const HISTORY_WINDOW_DAYS: i64 = 7;

/// Today's self-reported condition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SelfReport {
    Good,
    Normal,
    Tough,
}

impl SelfReport {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelfReport::Good => "good",
            SelfReport::Normal => "normal",
            SelfReport::Tough => "tough",
        }
    }

    pub fn parse(s: &str) -> Option<SelfReport> {
        match s {
            "good" => Some(SelfReport::Good),
            "normal" => Some(SelfReport::Normal),
            "tough" => Some(SelfReport::Tough),
            _ => None,
        }
    }

    /// Score contribution: +20 good, 0 normal, -20 tough.
    fn score(&self) -> f64 {
        match self {
            SelfReport::Good => 20.0,
            SelfReport::Normal => 0.0,
            SelfReport::Tough => -20.0,
        }
    }
}

/// Bucketed wellness label, with operator guidance for the review
/// pipeline's prompt construction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScoreLabel {
    CareNeeded,
    SlowStart,
    OnTrack,
    Excellent,
}

impl ScoreLabel {
    fn from_score(score: u32) -> ScoreLabel {
        match score {
            0..=25 => ScoreLabel::CareNeeded,
            26..=50 => ScoreLabel::SlowStart,
            51..=75 => ScoreLabel::OnTrack,
            _ => ScoreLabel::Excellent,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreLabel::CareNeeded => "care_needed",
            ScoreLabel::SlowStart => "slow_start",
            ScoreLabel::OnTrack => "on_track",
            ScoreLabel::Excellent => "excellent",
        }
    }

    /// Guidance text embedded into review prompts so suggestions match
    /// the user's current state.
    pub fn guidance(&self) -> &'static str {
        match self {
            ScoreLabel::CareNeeded => {
                "The user is stalled. Suggest 5-10 minute baby steps, recommend \
                 reducing the task count, and lead with encouragement."
            }
            ScoreLabel::SlowStart => {
                "The user is recovering. Center suggestions on small 15-30 minute \
                 tasks and recommend at most 3 tasks per day."
            }
            ScoreLabel::OnTrack => {
                "The user is on track. Give standard subtask decomposition and \
                 balanced suggestions."
            }
            ScoreLabel::Excellent => {
                "The user is at their best. Suggest stretch goals and \
                 milestone-style next steps."
            }
        }
    }
}

/// Inputs for the wellness calculation.
#[derive(Debug, Clone)]
pub struct WellnessInput {
    /// Completion counts per task-type bucket (trailing 7 days)
    pub type_stats: Vec<TypeCompletionStats>,
    /// Per-day completion counts (trailing 7 days, oldest first)
    pub daily_rates: Vec<DailyCompletionRate>,
    /// Today's self-report, with the date it was recorded
    pub self_report: Option<(SelfReport, NaiveDate)>,
    /// Reference date; only a self-report from this date counts
    pub today: NaiveDate,
    /// Whether care mode is active (caps the composite at 50)
    pub care_mode_active: bool,
    /// Consecutive perfect days, supplied by the caller
    pub perfect_streak: u32,
    /// Soft streak (kept alive by partial completion), supplied by the caller
    pub soft_streak_active: bool,
    /// A streak was recently broken, supplied by the caller
    pub streak_broken: bool,
}

/// Component values before weighting, for explainability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WellnessBreakdown {
    /// Weighted completion rate, 0-100
    pub quantitative: i32,
    /// Trend, -100 to 100
    pub trend: i32,
    /// Self-report contribution, -20 to 20
    pub self_report: i32,
    /// Streak bonus, -5 to 15
    pub streak_bonus: i32,
    /// Days of history backing the quantitative and trend components
    pub data_available_days: usize,
}

/// The composite wellness score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WellnessScore {
    pub score: u32,
    pub label: ScoreLabel,
    pub breakdown: WellnessBreakdown,
}

fn type_weight(task_type: TaskType) -> f64 {
    match task_type {
        TaskType::Routine => 0.6,
        TaskType::Normal => 0.3,
        TaskType::Urgent => 0.1,
    }
}

/// Weighted completion rate across task-type buckets. 50 with no data.
fn quantitative_score(stats: &[TypeCompletionStats]) -> f64 {
    if stats.is_empty() {
        return 50.0;
    }
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for row in stats {
        let weight = type_weight(row.task_type);
        let rate = if row.total > 0 {
            f64::from(row.completed) / f64::from(row.total) * 100.0
        } else {
            50.0
        };
        weighted_sum += rate * weight;
        weight_total += weight;
    }
    if weight_total > 0.0 {
        (weighted_sum / weight_total).clamp(0.0, 100.0)
    } else {
        50.0
    }
}

/// 3-day vs 7-day moving average of the daily completion rate, scaled so
/// a 30-point swing maps to +-100. 0 with fewer than 2 days of data.
fn trend_score(daily: &[DailyCompletionRate]) -> f64 {
    if daily.len() < 2 {
        return 0.0;
    }
    let rates: Vec<f64> = daily
        .iter()
        .map(|d| {
            if d.total > 0 {
                f64::from(d.completed) / f64::from(d.total) * 100.0
            } else {
                0.0
            }
        })
        .collect();

    let avg7 = rates.iter().sum::<f64>() / rates.len() as f64;
    let last3 = &rates[rates.len().saturating_sub(3)..];
    let avg3 = last3.iter().sum::<f64>() / last3.len() as f64;

    ((avg3 - avg7) * (100.0 / 30.0)).clamp(-100.0, 100.0)
}

fn streak_bonus(perfect_streak: u32, soft_streak_active: bool, streak_broken: bool) -> f64 {
    if perfect_streak >= 7 {
        15.0
    } else if perfect_streak >= 3 {
        10.0
    } else if perfect_streak >= 1 {
        5.0
    } else if soft_streak_active {
        5.0
    } else if streak_broken {
        -5.0
    } else {
        0.0
    }
}

/// Dynamic weights (quantitative, trend, self-report) by days of data.
fn weights_for(data_days: usize) -> (f64, f64, f64) {
    if data_days < 3 {
        (0.2, 0.1, 0.7)
    } else if data_days < 5 {
        (0.35, 0.25, 0.4)
    } else {
        (0.5, 0.3, 0.2)
    }
}

fn composite(
    quant: f64,
    trend: f64,
    self_score: f64,
    streak: f64,
    data_days: usize,
    care_mode_active: bool,
) -> u32 {
    let (w_quant, w_trend, w_self) = weights_for(data_days);

    // Trend spans -100..100; shift to 0..100 before weighting. The
    // self-report rides on a neutral base of 50.
    let trend_normalized = (trend + 100.0) / 2.0;
    let mut value =
        quant * w_quant + trend_normalized * w_trend + (50.0 + self_score) * w_self + streak;

    if care_mode_active {
        value = value.min(50.0);
    }

    value.round().clamp(0.0, 100.0) as u32
}

/// Calculate the wellness score from pre-queried history.
pub fn calculate_score(input: &WellnessInput) -> WellnessScore {
    let quant = quantitative_score(&input.type_stats);
    let trend = trend_score(&input.daily_rates);
    let data_days = input.daily_rates.len();

    let self_score = match input.self_report {
        Some((report, date)) if date == input.today => report.score(),
        _ => 0.0,
    };

    let streak = streak_bonus(
        input.perfect_streak,
        input.soft_streak_active,
        input.streak_broken,
    );

    let score = composite(
        quant,
        trend,
        self_score,
        streak,
        data_days,
        input.care_mode_active,
    );

    WellnessScore {
        score,
        label: ScoreLabel::from_score(score),
        breakdown: WellnessBreakdown {
            quantitative: quant.round() as i32,
            trend: trend.round() as i32,
            self_report: self_score as i32,
            streak_bonus: streak as i32,
            data_available_days: data_days,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn stats(task_type: TaskType, total: u32, completed: u32) -> TypeCompletionStats {
        TypeCompletionStats {
            task_type,
            total,
            completed,
        }
    }

    fn rate(day_str: &str, total: u32, completed: u32) -> DailyCompletionRate {
        DailyCompletionRate {
            day: day(day_str),
            total,
            completed,
        }
    }

    fn empty_input() -> WellnessInput {
        WellnessInput {
            type_stats: Vec::new(),
            daily_rates: Vec::new(),
            self_report: None,
            today: day("2026-08-23"),
            care_mode_active: false,
            perfect_streak: 0,
            soft_streak_active: false,
            streak_broken: false,
        }
    }

    #[test]
    fn no_data_defaults_to_neutral() {
        let result = calculate_score(&empty_input());
        // quant 50 * 0.2 + trend 50 * 0.1 + self 50 * 0.7 = 50
        assert_eq!(result.score, 50);
        assert_eq!(result.label, ScoreLabel::SlowStart);
        assert_eq!(result.breakdown.data_available_days, 0);
    }

    #[test]
    fn self_report_dominates_for_new_users() {
        let mut input = empty_input();
        input.self_report = Some((SelfReport::Good, day("2026-08-23")));
        let good = calculate_score(&input);

        input.self_report = Some((SelfReport::Tough, day("2026-08-23")));
        let tough = calculate_score(&input);

        // 0.7 weight on (50 +- 20): 14-point swing each way
        assert_eq!(good.score, 64);
        assert_eq!(tough.score, 36);
    }

    #[test]
    fn stale_self_report_is_ignored() {
        let mut input = empty_input();
        input.self_report = Some((SelfReport::Good, day("2026-08-20")));
        let result = calculate_score(&input);
        assert_eq!(result.breakdown.self_report, 0);
        assert_eq!(result.score, 50);
    }

    #[test]
    fn quantitative_uses_type_weights() {
        // Routine perfect, urgent all missed: 0.6*100 + 0.1*0 over 0.7
        let q = quantitative_score(&[
            stats(TaskType::Routine, 5, 5),
            stats(TaskType::Urgent, 4, 0),
        ]);
        assert!((q - 85.714).abs() < 0.01);
    }

    #[test]
    fn trend_needs_two_days() {
        assert_eq!(trend_score(&[rate("2026-08-22", 4, 4)]), 0.0);
    }

    #[test]
    fn improving_week_has_positive_trend() {
        let daily = vec![
            rate("2026-08-17", 4, 0),
            rate("2026-08-18", 4, 0),
            rate("2026-08-19", 4, 1),
            rate("2026-08-20", 4, 2),
            rate("2026-08-21", 4, 3),
            rate("2026-08-22", 4, 4),
            rate("2026-08-23", 4, 4),
        ];
        assert!(trend_score(&daily) > 0.0);
    }

    #[test]
    fn trend_is_clamped() {
        let daily = vec![
            rate("2026-08-17", 4, 0),
            rate("2026-08-18", 4, 0),
            rate("2026-08-19", 4, 0),
            rate("2026-08-20", 4, 0),
            rate("2026-08-21", 4, 4),
            rate("2026-08-22", 4, 4),
            rate("2026-08-23", 4, 4),
        ];
        assert_eq!(trend_score(&daily), 100.0);
    }

    #[test]
    fn care_mode_caps_at_fifty() {
        let mut input = empty_input();
        input.type_stats = vec![stats(TaskType::Routine, 10, 10)];
        input.daily_rates = (17..=23)
            .map(|d| rate(&format!("2026-08-{d}"), 3, 3))
            .collect();
        input.self_report = Some((SelfReport::Good, day("2026-08-23")));
        input.perfect_streak = 7;

        let without = calculate_score(&input);
        assert!(without.score > 50);

        input.care_mode_active = true;
        let with = calculate_score(&input);
        assert_eq!(with.score, 50);
    }

    #[test]
    fn streak_bonus_table() {
        assert_eq!(streak_bonus(8, false, false), 15.0);
        assert_eq!(streak_bonus(3, false, false), 10.0);
        assert_eq!(streak_bonus(1, false, false), 5.0);
        assert_eq!(streak_bonus(0, true, false), 5.0);
        assert_eq!(streak_bonus(0, false, true), -5.0);
        assert_eq!(streak_bonus(0, false, false), 0.0);
    }

    #[test]
    fn label_buckets() {
        assert_eq!(ScoreLabel::from_score(0), ScoreLabel::CareNeeded);
        assert_eq!(ScoreLabel::from_score(25), ScoreLabel::CareNeeded);
        assert_eq!(ScoreLabel::from_score(26), ScoreLabel::SlowStart);
        assert_eq!(ScoreLabel::from_score(50), ScoreLabel::SlowStart);
        assert_eq!(ScoreLabel::from_score(51), ScoreLabel::OnTrack);
        assert_eq!(ScoreLabel::from_score(75), ScoreLabel::OnTrack);
        assert_eq!(ScoreLabel::from_score(76), ScoreLabel::Excellent);
        assert_eq!(ScoreLabel::from_score(100), ScoreLabel::Excellent);
    }

    proptest! {
        // Holding self-report and streak fixed with >=5 days of data,
        // the composite never decreases when quantitative or trend
        // improves.
        #[test]
        fn composite_monotone_in_quant_and_trend(
            q1 in 0.0f64..=100.0,
            q2 in 0.0f64..=100.0,
            t1 in -100.0f64..=100.0,
            t2 in -100.0f64..=100.0,
        ) {
            let (q_lo, q_hi) = if q1 <= q2 { (q1, q2) } else { (q2, q1) };
            let (t_lo, t_hi) = if t1 <= t2 { (t1, t2) } else { (t2, t1) };
            let lo = composite(q_lo, t_lo, 0.0, 0.0, 5, false);
            let hi = composite(q_hi, t_hi, 0.0, 0.0, 5, false);
            prop_assert!(lo <= hi);
        }

        #[test]
        fn care_mode_never_exceeds_fifty(
            q in 0.0f64..=100.0,
            t in -100.0f64..=100.0,
            s in -20.0f64..=20.0,
            streak in -5.0f64..=15.0,
            days in 0usize..=7,
        ) {
            prop_assert!(composite(q, t, s, streak, days, true) <= 50);
        }
    }
}
