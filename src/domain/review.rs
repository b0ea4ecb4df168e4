use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Difficulty;

/// One completed rating. Events are append-only; a card's `review_count`
/// must equal the number of events referencing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewEvent {
  pub id: i64,
  pub card_id: i64,
  pub owner: String,
  pub difficulty: Difficulty,
  pub rated_at: DateTime<Utc>,
  /// Response latency in milliseconds. Recorded when the client sends it,
  /// not consumed by any aggregate yet.
  pub response_ms: Option<i64>,
}

impl ReviewEvent {
  pub fn new(card_id: i64, owner: String, difficulty: Difficulty, rated_at: DateTime<Utc>) -> Self {
    Self {
      id: 0,
      card_id,
      owner,
      difficulty,
      rated_at,
      response_ms: None,
    }
  }

  pub fn with_response_ms(mut self, response_ms: Option<i64>) -> Self {
    self.response_ms = response_ms;
    self
  }

  pub fn is_successful(&self) -> bool {
    self.difficulty.is_successful()
  }
}
