//! Classification and review pipeline.
//!
//! Every new task flows through four stages: sanctuary detection,
//! category inference, suggestion thresholds, and the weighted review.
//! Each stage persists its outcome as soon as it is known, so a crash or
//! restart loses at most the stage in flight. The persisted
//! classification status is the source of truth for what still needs
//! work: startup replay re-runs only tasks still `pending`, and a
//! `failed` task stays failed until the user resets it.
//!
//! The database handle is shared behind a mutex; guards are scoped so
//! they are never held across an await.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::care_mode::CareModeState;
use crate::category::Category;
use crate::error::{CoreError, PipelineError, Result};
use crate::provider::{CallKind, ProviderChain, ProviderConfig};
use crate::review::classify::{infer_category, InferenceDecision};
use crate::review::{execute_review, is_sanctuary, Personality, ReviewContext, ReviewWeights};
use crate::scoring::wellness::HISTORY_WINDOW_DAYS;
use crate::scoring::{calculate_score, WellnessInput, WellnessScore};
use crate::storage::{Database, SettingsStore};
use crate::suggestion::{record_and_check, PendingSuggestion};
use crate::task::{ClassificationStatus, SuperGoal, Task};

/// Pause between tasks during startup replay.
pub const REPLAY_PAUSE: Duration = Duration::from_millis(500);

/// Compute the current wellness score from storage.
///
/// Streak state lives with the caller (the UI tracks it across days), so
/// it is passed in rather than derived here.
pub fn wellness_snapshot(
    db: &mut Database,
    now: DateTime<Utc>,
    perfect_streak: u32,
    soft_streak_active: bool,
    streak_broken: bool,
) -> Result<WellnessScore> {
    let today = now.date_naive();
    let type_stats = db.completion_stats_by_type(HISTORY_WINDOW_DAYS, today)?;
    let daily_rates = db.daily_completion_rates(HISTORY_WINDOW_DAYS, today)?;
    let care_mode_active = CareModeState::load(db, now)?.active;
    let self_report = SettingsStore::new(db).self_report()?;

    Ok(calculate_score(&WellnessInput {
        type_stats,
        daily_rates,
        self_report,
        today,
        care_mode_active,
        perfect_streak,
        soft_streak_active,
        streak_broken,
    }))
}

/// What one replay pass did.
#[derive(Debug, Clone, Copy)]
pub struct ReplaySummary {
    /// Tasks that were still pending when replay started
    pub total: usize,
    /// How many of them ended up failed
    pub failed: usize,
}

struct ChainOverride {
    classify: ProviderChain,
    review: ProviderChain,
}

/// Context snapshot taken under the lock before any backend call.
struct RunContext {
    task: Task,
    categories: Vec<Category>,
    keywords: Vec<String>,
    personality: Personality,
    weights: ReviewWeights,
    config: ProviderConfig,
    care_mode_active: bool,
    wellness: WellnessScore,
    today_task_count: u32,
    super_goal: Option<SuperGoal>,
}

/// The task intelligence pipeline.
pub struct Pipeline {
    db: Arc<Mutex<Database>>,
    chains: Option<ChainOverride>,
}

impl Pipeline {
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Pipeline { db, chains: None }
    }

    /// Use explicit provider chains instead of building them from the
    /// stored connection settings.
    pub fn with_chains(
        db: Arc<Mutex<Database>>,
        classify: ProviderChain,
        review: ProviderChain,
    ) -> Self {
        Pipeline {
            db,
            chains: Some(ChainOverride { classify, review }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run the full stage sequence for one task.
    ///
    /// Already-classified tasks are a no-op, so calling this twice for
    /// the same task is safe. On a stage error the task is marked
    /// `failed` and later stages are skipped; whatever earlier stages
    /// persisted stays persisted.
    pub async fn run(&self, task_id: &str) -> Result<()> {
        let result = self.run_stages(task_id).await;
        if let Err(e) = &result {
            if !matches!(e, CoreError::Pipeline(PipelineError::TaskGone(_))) {
                tracing::warn!(task_id, error = %e, "pipeline run failed");
                if let Err(mark) = self
                    .lock()
                    .set_classification_status(task_id, ClassificationStatus::Failed)
                {
                    tracing::error!(task_id, error = %mark, "could not mark task failed");
                }
            }
        }
        result
    }

    async fn run_stages(&self, task_id: &str) -> Result<()> {
        let now = Utc::now();
        let Some(mut ctx) = self.gather_context(task_id, now)? else {
            return Ok(());
        };

        // Stage 1: sanctuary detection, persisted before any backend call.
        if is_sanctuary(&ctx.task, &ctx.keywords) && !ctx.task.is_sanctuary {
            self.lock()
                .set_task_sanctuary(task_id, true)
                .map_err(|e| stage_error("sanctuary", e.into()))?;
        }
        let sanctuary = is_sanctuary(&ctx.task, &ctx.keywords);
        ctx.task.is_sanctuary = sanctuary;

        // Stage 2: category inference.
        let classify_chain = self.chain_for(&ctx.config, CallKind::Classify);
        let decision = infer_category(
            classify_chain.as_ref(),
            &ctx.task.title,
            ctx.task.description.as_deref(),
            &ctx.categories,
        )
        .await
        .ok_or(PipelineError::NoCategories)?;

        let (category_id, via_fallback) = decision.assignment();
        let category_id = category_id.to_string();
        self.lock()
            .assign_category(task_id, &category_id, via_fallback)
            .map_err(|e| stage_error("classify", e.into()))?;
        ctx.task.category_id = Some(category_id.clone());

        // Stage 3: suggestion log and thresholds.
        if let InferenceDecision::NewSubcategory {
            name,
            parent_id,
            reason,
            fallback_id,
        } = &decision
        {
            let suggestion =
                PendingSuggestion::new(name, task_id, parent_id.clone(), reason, now);
            record_and_check(&self.lock(), &suggestion, Some(fallback_id), now)
                .map_err(|e| stage_error("suggest", e))?;
        }

        // Stage 4: weighted review.
        let review_chain = self.chain_for(&ctx.config, CallKind::Review);
        let review_ctx = ReviewContext {
            task: &ctx.task,
            category_name: crate::review::category_name_for(&ctx.task, &ctx.categories),
            super_goal: ctx.super_goal.as_ref(),
            today_task_count: ctx.today_task_count,
            care_mode_active: ctx.care_mode_active,
            personality: ctx.personality,
            wellness_label: Some(ctx.wellness.label),
        };
        let review = execute_review(review_chain.as_ref(), &review_ctx, &ctx.weights, now).await;
        self.lock()
            .store_review(task_id, &review)
            .map_err(|e| stage_error("review", e.into()))?;

        tracing::info!(
            task_id,
            category_id,
            via_fallback,
            sanctuary,
            overall = review.overall_score,
            "pipeline run completed"
        );
        Ok(())
    }

    /// Snapshot everything the stages need. `None` means the task is
    /// already classified and the run is a no-op.
    fn gather_context(&self, task_id: &str, now: DateTime<Utc>) -> Result<Option<RunContext>> {
        let mut db = self.lock();

        let task = db
            .get_task(task_id)?
            .ok_or_else(|| PipelineError::TaskGone(task_id.to_string()))?;
        if task.classification_status == ClassificationStatus::Completed {
            tracing::debug!(task_id, "already classified, skipping");
            return Ok(None);
        }

        let categories = db.all_categories()?;
        if categories.is_empty() {
            return Err(PipelineError::NoCategories.into());
        }

        let care_mode_active = CareModeState::load(&mut db, now)?.active;
        let wellness = wellness_snapshot(&mut db, now, 0, false, false)?;
        let today_task_count = db.task_count_due_on(now.date_naive())?;
        let super_goal = match &task.super_goal_id {
            Some(goal_id) => db.get_super_goal(goal_id)?,
            None => None,
        };

        let settings = SettingsStore::new(&mut db);
        let keywords = settings.sanctuary_keywords()?;
        let personality = settings.personality()?;
        let weights = settings.review_weights()?;
        let config = settings.provider_config()?;

        Ok(Some(RunContext {
            task,
            categories,
            keywords,
            personality,
            weights,
            config,
            care_mode_active,
            wellness,
            today_task_count,
            super_goal,
        }))
    }

    fn chain_for(&self, config: &ProviderConfig, kind: CallKind) -> ChainRef<'_> {
        match &self.chains {
            Some(chains) => ChainRef::Borrowed(match kind {
                CallKind::Classify => &chains.classify,
                CallKind::Review => &chains.review,
            }),
            None => ChainRef::Owned(ProviderChain::for_call(config, kind)),
        }
    }

    /// Re-run every task still pending, oldest first, with a fixed pause
    /// between tasks so startup is not a thundering herd of backend
    /// calls. Failures are recorded per task and do not stop the pass.
    pub async fn replay(&self) -> Result<ReplaySummary> {
        let ids = self.lock().pending_task_ids()?;
        let total = ids.len();
        if total > 0 {
            tracing::info!(total, "replaying unclassified tasks");
        }

        let mut failed = 0;
        for (index, id) in ids.iter().enumerate() {
            if self.run(id).await.is_err() {
                failed += 1;
            }
            if index + 1 < total {
                tokio::time::sleep(REPLAY_PAUSE).await;
            }
        }
        Ok(ReplaySummary { total, failed })
    }

    /// Put a failed task back into the replay set. Returns whether the
    /// task was actually reset (only `failed` tasks are).
    pub fn reset_to_pending(&self, task_id: &str) -> Result<bool> {
        let db = self.lock();
        let task = db
            .get_task(task_id)?
            .ok_or_else(|| PipelineError::TaskGone(task_id.to_string()))?;
        if task.classification_status != ClassificationStatus::Failed {
            return Ok(false);
        }
        db.set_classification_status(task_id, ClassificationStatus::Pending)?;
        Ok(true)
    }
}

enum ChainRef<'a> {
    Borrowed(&'a ProviderChain),
    Owned(ProviderChain),
}

impl ChainRef<'_> {
    fn as_ref(&self) -> &ProviderChain {
        match self {
            ChainRef::Borrowed(chain) => chain,
            ChainRef::Owned(chain) => chain,
        }
    }
}

fn stage_error(stage: &'static str, source: CoreError) -> CoreError {
    CoreError::Pipeline(PipelineError::StageFailed {
        stage,
        source: Box::new(source),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::provider::CompletionProvider;
    use crate::task::PortfolioType;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CannedProvider {
        response: Result<String, ()>,
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl CompletionProvider for CannedProvider {
        fn name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.response {
                Ok(text) => Ok(text.clone()),
                Err(()) => Err(ProviderError::RequestFailed {
                    provider: "canned".to_string(),
                    message: "down".to_string(),
                }),
            }
        }
    }

    fn chain(response: Result<&str, ()>, calls: Arc<AtomicU32>) -> ProviderChain {
        ProviderChain::from_providers(vec![(
            Box::new(CannedProvider {
                response: response.map(|s| s.to_string()),
                calls,
            }),
            Duration::from_secs(1),
        )])
    }

    const REVIEW_JSON: &str = r#"{
        "necessity": { "score": 80, "summary": "s" },
        "feasibility": { "score": 60, "summary": "s" },
        "decomposition": { "score": 40, "summary": "s" },
        "efficiency": { "score": 100, "summary": "s" }
    }"#;

    struct Fixture {
        db: Arc<Mutex<Database>>,
        work_id: String,
        misc_id: String,
    }

    fn fixture() -> Fixture {
        let mut db = Database::open_memory().unwrap();
        let work = Category::new("Work");
        let misc = Category::new("Misc").as_default();
        let (work_id, misc_id) = (work.id.clone(), misc.id.clone());
        db.insert_category(&work).unwrap();
        db.insert_category(&misc).unwrap();
        Fixture {
            db: Arc::new(Mutex::new(db)),
            work_id,
            misc_id,
        }
    }

    fn insert_task(db: &Arc<Mutex<Database>>, title: &str) -> Task {
        let task = Task::new(title);
        db.lock().unwrap().insert_task(&task).unwrap();
        task
    }

    #[tokio::test]
    async fn full_run_assigns_category_and_stores_review() {
        let f = fixture();
        let task = insert_task(&f.db, "Prepare slides");

        let classify_json = format!(r#"{{"action": "existing", "categoryId": "{}"}}"#, f.work_id);
        let pipeline = Pipeline::with_chains(
            f.db.clone(),
            chain(Ok(&classify_json), Arc::new(AtomicU32::new(0))),
            chain(Ok(REVIEW_JSON), Arc::new(AtomicU32::new(0))),
        );
        pipeline.run(&task.id).await.unwrap();

        let stored = f.db.lock().unwrap().get_task(&task.id).unwrap().unwrap();
        assert_eq!(stored.category_id.as_deref(), Some(f.work_id.as_str()));
        assert!(!stored.via_fallback);
        assert_eq!(stored.classification_status, ClassificationStatus::Completed);
        let review = stored.review.unwrap();
        assert_eq!(review.overall_score, 70);
        assert!(!review.is_sanctuary);
    }

    #[tokio::test]
    async fn backend_outage_falls_back_and_stays_usable() {
        let f = fixture();
        let task = insert_task(&f.db, "Mystery errand");

        let pipeline = Pipeline::with_chains(
            f.db.clone(),
            chain(Err(()), Arc::new(AtomicU32::new(0))),
            chain(Err(()), Arc::new(AtomicU32::new(0))),
        );
        pipeline.run(&task.id).await.unwrap();

        let stored = f.db.lock().unwrap().get_task(&task.id).unwrap().unwrap();
        assert_eq!(stored.category_id.as_deref(), Some(f.misc_id.as_str()));
        assert!(stored.via_fallback);
        assert_eq!(stored.classification_status, ClassificationStatus::Completed);
        assert_eq!(stored.review.unwrap().overall_score, 50);
    }

    #[tokio::test]
    async fn recharge_task_skips_the_review_call() {
        let f = fixture();
        let mut task = Task::new("Evening walk");
        task.portfolio = PortfolioType::Recharge;
        f.db.lock().unwrap().insert_task(&task).unwrap();

        let classify_json = format!(r#"{{"action": "existing", "categoryId": "{}"}}"#, f.work_id);
        let review_calls = Arc::new(AtomicU32::new(0));
        let pipeline = Pipeline::with_chains(
            f.db.clone(),
            chain(Ok(&classify_json), Arc::new(AtomicU32::new(0))),
            chain(Ok(REVIEW_JSON), review_calls.clone()),
        );
        pipeline.run(&task.id).await.unwrap();

        assert_eq!(review_calls.load(Ordering::SeqCst), 0);
        let stored = f.db.lock().unwrap().get_task(&task.id).unwrap().unwrap();
        assert!(stored.is_sanctuary);
        let review = stored.review.unwrap();
        assert!(review.is_sanctuary);
        assert_eq!(review.overall_score, 100);
        assert!(review.sanctuary_message.is_some());
    }

    #[tokio::test]
    async fn new_subcategory_is_logged_and_task_goes_to_default() {
        let f = fixture();
        let task = insert_task(&f.db, "Repot the monstera");

        let classify_json = r#"{"action": "new_subcategory",
            "newSubcategory": {"name": "Plants", "reason": "no category fits"}}"#;
        let pipeline = Pipeline::with_chains(
            f.db.clone(),
            chain(Ok(classify_json), Arc::new(AtomicU32::new(0))),
            chain(Ok(REVIEW_JSON), Arc::new(AtomicU32::new(0))),
        );
        pipeline.run(&task.id).await.unwrap();

        let db = f.db.lock().unwrap();
        let stored = db.get_task(&task.id).unwrap().unwrap();
        assert_eq!(stored.category_id.as_deref(), Some(f.misc_id.as_str()));
        assert!(stored.via_fallback);
        assert_eq!(
            db.count_recent_suggestions_by_name("Plants", 7, Utc::now())
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn no_categories_marks_the_task_failed() {
        let db = Arc::new(Mutex::new(Database::open_memory().unwrap()));
        let task = insert_task(&db, "Orphan task");

        let pipeline = Pipeline::with_chains(
            db.clone(),
            chain(Ok("{}"), Arc::new(AtomicU32::new(0))),
            chain(Ok("{}"), Arc::new(AtomicU32::new(0))),
        );
        let err = pipeline.run(&task.id).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Pipeline(PipelineError::NoCategories)
        ));

        let stored = db.lock().unwrap().get_task(&task.id).unwrap().unwrap();
        assert_eq!(stored.classification_status, ClassificationStatus::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn replay_touches_only_pending_tasks() {
        let f = fixture();
        let pending_a = insert_task(&f.db, "first pending");
        let pending_b = insert_task(&f.db, "second pending");
        let done = insert_task(&f.db, "already classified");
        f.db.lock()
            .unwrap()
            .assign_category(&done.id, &f.work_id, false)
            .unwrap();

        let classify_calls = Arc::new(AtomicU32::new(0));
        let classify_json = format!(r#"{{"action": "existing", "categoryId": "{}"}}"#, f.work_id);
        let pipeline = Pipeline::with_chains(
            f.db.clone(),
            chain(Ok(&classify_json), classify_calls.clone()),
            chain(Ok(REVIEW_JSON), Arc::new(AtomicU32::new(0))),
        );

        let summary = pipeline.replay().await.unwrap();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.failed, 0);
        assert_eq!(classify_calls.load(Ordering::SeqCst), 2);

        let db = f.db.lock().unwrap();
        for id in [&pending_a.id, &pending_b.id] {
            let stored = db.get_task(id).unwrap().unwrap();
            assert_eq!(stored.classification_status, ClassificationStatus::Completed);
        }
        assert!(db.pending_task_ids().unwrap().is_empty());
    }

    #[tokio::test]
    async fn reset_to_pending_applies_only_to_failed_tasks() {
        let db = Arc::new(Mutex::new(Database::open_memory().unwrap()));
        let task = insert_task(&db, "flaky");

        let pipeline = Pipeline::with_chains(
            db.clone(),
            chain(Ok("{}"), Arc::new(AtomicU32::new(0))),
            chain(Ok("{}"), Arc::new(AtomicU32::new(0))),
        );
        // No categories: the run fails and the task is marked failed.
        pipeline.run(&task.id).await.unwrap_err();

        assert!(pipeline.reset_to_pending(&task.id).unwrap());
        assert_eq!(
            db.lock().unwrap().pending_task_ids().unwrap(),
            vec![task.id.clone()]
        );
        // Already pending now, so a second reset is a no-op.
        assert!(!pipeline.reset_to_pending(&task.id).unwrap());
    }

    #[tokio::test]
    async fn rerun_of_classified_task_is_a_no_op() {
        let f = fixture();
        let task = insert_task(&f.db, "stable");

        let classify_calls = Arc::new(AtomicU32::new(0));
        let classify_json = format!(r#"{{"action": "existing", "categoryId": "{}"}}"#, f.work_id);
        let pipeline = Pipeline::with_chains(
            f.db.clone(),
            chain(Ok(&classify_json), classify_calls.clone()),
            chain(Ok(REVIEW_JSON), Arc::new(AtomicU32::new(0))),
        );
        pipeline.run(&task.id).await.unwrap();
        pipeline.run(&task.id).await.unwrap();
        assert_eq!(classify_calls.load(Ordering::SeqCst), 1);
    }
}
