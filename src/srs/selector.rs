//! Due-set selection with a three-tier fallback policy.
//!
//! The first non-empty tier wins:
//! 1. cards whose `next_review` has passed (with a small forward buffer)
//! 2. cards never reviewed at all
//! 3. every card in the deck
//!
//! Tier 3 is a deliberate leniency policy: a deck stays reviewable even
//! when nothing is formally due. Only an empty deck yields an empty set.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::config::DUE_BUFFER_SECS;
use crate::domain::Card;

/// Which fallback tier produced the due-set. Lets the caller phrase the
/// session correctly ("due now" vs "nothing due, reviewing anyway").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DueTier {
  Due,
  NeverReviewed,
  WholeDeck,
}

#[derive(Debug, Clone)]
pub struct DueSet {
  pub tier: DueTier,
  pub cards: Vec<Card>,
}

impl DueSet {
  pub fn is_empty(&self) -> bool {
    self.cards.is_empty()
  }

  pub fn len(&self) -> usize {
    self.cards.len()
  }
}

/// Produce the ordered set of cards eligible for review at `now`.
pub fn select_for_review(cards: &[Card], now: DateTime<Utc>) -> DueSet {
  let cutoff = now + Duration::seconds(DUE_BUFFER_SECS);

  let mut due: Vec<Card> = cards
    .iter()
    .filter(|c| c.next_review <= cutoff)
    .cloned()
    .collect();
  if !due.is_empty() {
    due.sort_by_key(|c| c.next_review);
    return DueSet { tier: DueTier::Due, cards: due };
  }

  let mut fresh: Vec<Card> = cards.iter().filter(|c| !c.is_reviewed()).cloned().collect();
  if !fresh.is_empty() {
    fresh.sort_by_key(|c| c.created_at);
    return DueSet { tier: DueTier::NeverReviewed, cards: fresh };
  }

  let mut all: Vec<Card> = cards.to_vec();
  all.sort_by_key(|c| c.created_at);
  DueSet { tier: DueTier::WholeDeck, cards: all }
}
