pub mod interval;
pub mod selector;
pub mod session;

pub use interval::{base_interval_days, next_interval_days, next_review_at};
pub use selector::{select_for_review, DueSet, DueTier};
pub use session::{commit_rating, ReviewError, ReviewSession, SessionError, SessionPhase, SessionProgress};
