pub mod analytics;
pub mod tasks;
