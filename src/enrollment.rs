pub mod grader;
pub mod progress;
pub mod store;
