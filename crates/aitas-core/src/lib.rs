//! # Aitas Core Library
//!
//! This library provides the core logic for Aitas, an adaptive task
//! intelligence pipeline for a personal task manager. It implements a
//! CLI-first philosophy where all operations are available via a
//! standalone CLI binary, with any GUI being a thin layer over the same
//! core library.
//!
//! ## Architecture
//!
//! - **Scoring**: Pure functions for the display-score ranking of the
//!   task list and the composite wellness score
//! - **Pipeline**: The classification and review pipeline every new task
//!   flows through (sanctuary detection, category inference, suggestion
//!   thresholds, weighted review), with startup replay for tasks that
//!   never finished
//! - **Care mode**: A time-boxed leniency state entered through bulk
//!   rescheduling and left lazily on expiry
//! - **Providers**: Interchangeable reasoning backends (local Ollama,
//!   hosted Gemini) behind one completion trait
//! - **Storage**: SQLite persistence for tasks, categories, suggestions,
//!   history, and settings
//!
//! ## Key Components
//!
//! - [`Pipeline`]: Classification and review orchestration
//! - [`Database`]: Task and settings persistence
//! - [`CareModeState`]: The care-mode state machine
//! - [`CompletionProvider`]: Trait for reasoning backends

pub mod care_mode;
pub mod category;
pub mod error;
pub mod pipeline;
pub mod provider;
pub mod review;
pub mod scoring;
pub mod storage;
pub mod suggestion;
pub mod task;

pub use care_mode::{bulk_reschedule, record_self_report, CareModeState, RescheduleOutcome};
pub use category::{fallback_category, Category, ScalingWeight};
pub use error::{
    ConfigError, CoreError, DatabaseError, PipelineError, ProviderError, Result,
};
pub use pipeline::{wellness_snapshot, Pipeline, ReplaySummary};
pub use provider::{
    CallKind, CompletionProvider, ConnectionMode, ProviderChain, ProviderConfig,
};
pub use review::{
    execute_review, is_sanctuary, Personality, Perspective, ReviewContext, ReviewResult,
    ReviewWeights,
};
pub use scoring::{
    calculate_score, display_score, rank_tasks, rank_tasks_with_skips, FocusView, ScoreLabel,
    ScoredTask, SelfReport, WellnessInput, WellnessScore,
};
pub use storage::{Database, SettingsStore};
pub use suggestion::{PendingCategoryReview, PendingSuggestion, ThresholdTrigger};
pub use task::{
    ClassificationStatus, PortfolioType, Priority, RescheduleReason, SubTask, SuperGoal, Task,
    TaskType,
};
