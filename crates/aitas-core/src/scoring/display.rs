//! Display scoring engine.
//!
//! Pure ranking math for the "what should I do now" view. Scores depend
//! only on priority, the category's scaling weight, due-date proximity,
//! and the reference date passed in by the caller; no I/O and no clock
//! reads, so identical inputs on the same day give identical output.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::task::{Priority, Task};

/// How many tasks follow the focus task in the preview list.
const UP_NEXT_LEN: usize = 4;

/// A task paired with its display score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredTask {
    pub task: Task,
    pub score: i32,
}

/// The focus task plus a short preview of what comes after it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FocusView {
    /// Highest-scored eligible task, if any task is eligible
    pub focus: Option<ScoredTask>,
    /// Up to four runners-up, in rank order
    pub up_next: Vec<ScoredTask>,
}

/// Calculate the display score for a task.
///
/// Base 50, plus priority (+30 high / +15 medium), category scaling
/// weight (+20 strict / +10 normal), and due-date proximity (+20 due
/// today or earlier, +10 due tomorrow).
pub fn display_score(task: &Task, category: Option<&Category>, today: NaiveDate) -> i32 {
    let mut score = 50;

    score += match task.priority {
        Priority::High => 30,
        Priority::Medium => 15,
        Priority::Low => 0,
    };

    if let Some(category) = category {
        score += match category.scaling_weight {
            crate::category::ScalingWeight::Strict => 20,
            crate::category::ScalingWeight::Normal => 10,
            crate::category::ScalingWeight::Relaxed => 0,
        };
    }

    if let Some(due) = task.due_date {
        if due <= today {
            score += 20;
        } else if due == today + Duration::days(1) {
            score += 10;
        }
    }

    score
}

/// Whether a task is eligible for the focus view: incomplete and either
/// due today-or-earlier or without a due date.
fn is_eligible(task: &Task, today: NaiveDate) -> bool {
    if task.completed {
        return false;
    }
    match task.due_date {
        None => true,
        Some(due) => due <= today,
    }
}

/// Rank the eligible tasks descending by display score.
///
/// `tasks` must be in insertion order; the sort is stable, so ties keep
/// that order.
pub fn rank_tasks(tasks: &[Task], categories: &[Category], today: NaiveDate) -> Vec<ScoredTask> {
    let by_id: HashMap<&str, &Category> =
        categories.iter().map(|c| (c.id.as_str(), c)).collect();

    let mut scored: Vec<ScoredTask> = tasks
        .iter()
        .filter(|t| is_eligible(t, today))
        .map(|t| {
            let category = t
                .category_id
                .as_deref()
                .and_then(|id| by_id.get(id).copied());
            ScoredTask {
                score: display_score(t, category, today),
                task: t.clone(),
            }
        })
        .collect();

    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored
}

/// Rank tasks, demoting skipped ids to the end of the ordering.
///
/// Skips are view-local and ephemeral; they reorder without touching
/// any score. Relative order within the skipped group is preserved.
pub fn rank_tasks_with_skips(
    tasks: &[Task],
    categories: &[Category],
    today: NaiveDate,
    skipped_ids: &[String],
) -> Vec<ScoredTask> {
    let ranked = rank_tasks(tasks, categories, today);
    let (kept, skipped): (Vec<_>, Vec<_>) = ranked
        .into_iter()
        .partition(|s| !skipped_ids.contains(&s.task.id));
    kept.into_iter().chain(skipped).collect()
}

impl FocusView {
    /// Build the focus view from a ranked list.
    pub fn from_ranked(mut ranked: Vec<ScoredTask>) -> Self {
        if ranked.is_empty() {
            return FocusView::default();
        }
        let rest = ranked.split_off(1);
        FocusView {
            focus: ranked.into_iter().next(),
            up_next: rest.into_iter().take(UP_NEXT_LEN).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::ScalingWeight;

    fn today() -> NaiveDate {
        "2026-08-23".parse().unwrap()
    }

    fn make_task(title: &str, priority: Priority, due: Option<&str>) -> Task {
        let mut task = Task::new(title);
        task.priority = priority;
        task.due_date = due.map(|d| d.parse().unwrap());
        task
    }

    #[test]
    fn score_components_add_up() {
        let mut task = make_task("t", Priority::High, Some("2026-08-23"));
        let category = Category::new("Work").with_scaling(ScalingWeight::Strict);
        task.category_id = Some(category.id.clone());

        // 50 base + 30 high + 20 strict + 20 due today
        assert_eq!(display_score(&task, Some(&category), today()), 120);
    }

    #[test]
    fn overdue_counts_as_due_today() {
        let task = make_task("t", Priority::Low, Some("2026-08-01"));
        assert_eq!(display_score(&task, None, today()), 70);
    }

    #[test]
    fn due_tomorrow_adds_ten() {
        let task = make_task("t", Priority::Low, Some("2026-08-24"));
        assert_eq!(display_score(&task, None, today()), 60);
    }

    #[test]
    fn due_later_adds_nothing() {
        let task = make_task("t", Priority::Low, Some("2026-09-01"));
        assert_eq!(display_score(&task, None, today()), 50);
    }

    #[test]
    fn ranking_filters_completed_and_future_tasks() {
        let mut done = make_task("done", Priority::High, Some("2026-08-23"));
        done.complete(chrono::Utc::now());
        let future = make_task("future", Priority::High, Some("2026-09-01"));
        let no_due = make_task("no due", Priority::Low, None);
        let due_today = make_task("due today", Priority::Low, Some("2026-08-23"));

        let ranked = rank_tasks(
            &[done, future, no_due.clone(), due_today.clone()],
            &[],
            today(),
        );
        let titles: Vec<&str> = ranked.iter().map(|s| s.task.title.as_str()).collect();
        assert_eq!(titles, vec!["due today", "no due"]);
    }

    #[test]
    fn focus_is_highest_scored_and_ties_keep_insertion_order() {
        let first = make_task("first", Priority::Medium, None);
        let second = make_task("second", Priority::Medium, None);
        let top = make_task("top", Priority::High, Some("2026-08-23"));

        let ranked = rank_tasks(&[first, second, top], &[], today());
        let view = FocusView::from_ranked(ranked);
        assert_eq!(view.focus.as_ref().unwrap().task.title, "top");
        assert_eq!(view.up_next[0].task.title, "first");
        assert_eq!(view.up_next[1].task.title, "second");
    }

    #[test]
    fn up_next_holds_at_most_four() {
        let tasks: Vec<Task> = (0..8)
            .map(|i| make_task(&format!("t{i}"), Priority::Low, None))
            .collect();
        let view = FocusView::from_ranked(rank_tasks(&tasks, &[], today()));
        assert!(view.focus.is_some());
        assert_eq!(view.up_next.len(), 4);
    }

    #[test]
    fn skip_demotes_without_changing_score() {
        let a = make_task("a", Priority::High, None);
        let b = make_task("b", Priority::Low, None);
        let skip_id = a.id.clone();

        let ranked = rank_tasks_with_skips(&[a, b], &[], today(), &[skip_id]);
        assert_eq!(ranked[0].task.title, "b");
        assert_eq!(ranked[1].task.title, "a");
        assert_eq!(ranked[1].score, 80); // unchanged
    }

    #[test]
    fn empty_set_yields_empty_view() {
        let view = FocusView::from_ranked(rank_tasks(&[], &[], today()));
        assert!(view.focus.is_none());
        assert!(view.up_next.is_empty());
    }
}
