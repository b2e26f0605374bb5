pub mod analytics;
pub mod store;
pub mod task;
