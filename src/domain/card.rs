use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rating given during review, ordered by implied retention strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
  Again,
  Hard,
  Good,
  Easy,
}

impl Difficulty {
  pub const ALL: [Difficulty; 4] = [Self::Again, Self::Hard, Self::Good, Self::Easy];

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "again" => Some(Self::Again),
      "hard" => Some(Self::Hard),
      "good" => Some(Self::Good),
      "easy" => Some(Self::Easy),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Again => "again",
      Self::Hard => "hard",
      Self::Good => "good",
      Self::Easy => "easy",
    }
  }

  /// A review counts as successful when the card was recalled without a lapse.
  pub fn is_successful(&self) -> bool {
    matches!(self, Self::Good | Self::Easy)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
  pub id: i64,
  pub deck_id: i64,
  pub front: String,
  pub back: String,
  pub tags: Vec<String>,
  /// Always set; a fresh card defaults to its creation time so it is
  /// immediately eligible for review.
  pub next_review: DateTime<Utc>,
  pub last_reviewed: Option<DateTime<Utc>>,
  pub review_count: i64,
  /// Last rating given, None for a never-reviewed card.
  pub difficulty: Option<Difficulty>,
  pub created_at: DateTime<Utc>,
}

impl Card {
  pub fn new(deck_id: i64, front: String, back: String, tags: Vec<String>, now: DateTime<Utc>) -> Self {
    Self {
      id: 0,
      deck_id,
      front,
      back,
      tags,
      next_review: now,
      last_reviewed: None,
      review_count: 0,
      difficulty: None,
      created_at: now,
    }
  }

  pub fn is_reviewed(&self) -> bool {
    self.last_reviewed.is_some()
  }

  /// The single mutation path for a completed rating. Keeps the invariant
  /// that `last_reviewed` is set exactly when `review_count > 0`.
  pub fn apply_review(&mut self, rating: Difficulty, next_review: DateTime<Utc>, now: DateTime<Utc>) {
    self.next_review = next_review;
    self.review_count += 1;
    self.difficulty = Some(rating);
    self.last_reviewed = Some(now);
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deck {
  pub id: i64,
  pub owner: String,
  pub name: String,
  pub description: String,
  /// Derived: number of member cards.
  pub card_count: i64,
  /// Derived: max over member cards' `last_reviewed`.
  pub last_reviewed: Option<DateTime<Utc>>,
}
