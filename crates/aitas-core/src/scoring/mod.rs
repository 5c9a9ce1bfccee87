pub mod display;
pub mod wellness;

pub use display::{display_score, rank_tasks, rank_tasks_with_skips, FocusView, ScoredTask};
pub use wellness::{
    calculate_score, ScoreLabel, SelfReport, WellnessBreakdown, WellnessInput, WellnessScore,
};
