pub mod aggregator;
pub mod projector;

pub use aggregator::{compute_statistics, StatisticsSnapshot};
pub use projector::{month_window, project_due_counts};
