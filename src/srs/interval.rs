//! Interval calculator: maps a rating and the prior review count to the
//! number of days until the next review.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::config::{JITTER_MAX, JITTER_MIN};
use crate::domain::Difficulty;

/// Base interval in days, before jitter. Monotonic in rating strength and
/// in prior exposure; the first and second reviews are hand-tuned so a
/// fresh card never comes back the same day.
pub fn base_interval_days(rating: Difficulty, review_count: u32) -> u32 {
  let n = review_count;
  match rating {
    Difficulty::Again => (n / 2).max(1),
    Difficulty::Hard => {
      if n == 0 {
        2
      } else {
        (n * 3 / 2).max(2)
      }
    }
    Difficulty::Good => match n {
      0 => 4,
      1 => 7,
      _ => n * 7 / 2,
    },
    Difficulty::Easy => match n {
      0 => 7,
      1 => 14,
      _ => n * 5,
    },
  }
}

/// Jittered interval. The uniform multiplier keeps many cards rated on the
/// same day from all landing on the same future date.
pub fn next_interval_days(rating: Difficulty, review_count: u32, rng: &mut impl Rng) -> u32 {
  let base = base_interval_days(rating, review_count);
  let jitter: f64 = rng.random_range(JITTER_MIN..=JITTER_MAX);
  ((base as f64 * jitter).floor() as u32).max(1)
}

/// New `next_review` timestamp for a rating made at `now`.
pub fn next_review_at(
  rating: Difficulty,
  review_count: u32,
  now: DateTime<Utc>,
  rng: &mut impl Rng,
) -> DateTime<Utc> {
  now + Duration::days(next_interval_days(rating, review_count, rng) as i64)
}
