pub mod care;
pub mod category;
pub mod config;
pub mod goal;
pub mod pipeline;
pub mod task;
pub mod wellness;
