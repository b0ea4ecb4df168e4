//! Review session state machine.
//!
//! One interactive pass over a due-set: `Presenting → Revealed → rate →
//! Presenting… → Completed`. The idle state is the absence of a session.
//! Each rating produces exactly one card mutation and one review event;
//! the cursor only advances once both are persisted, so a store failure
//! leaves the session retryable with no partial progress.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use thiserror::Error;

use crate::domain::{Card, Difficulty};
use crate::store::{DeckStore, StoreError};

use super::interval;
use super::selector::{DueSet, DueTier};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
  #[error("no cards available for review")]
  NoCardsAvailable,
  #[error("card has not been revealed")]
  NotRevealed,
  #[error("session is already completed")]
  Completed,
}

#[derive(Debug, Error)]
pub enum ReviewError {
  #[error(transparent)]
  Session(#[from] SessionError),
  #[error(transparent)]
  Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
  Presenting,
  Revealed,
  Completed,
}

/// A rating ready to be persisted: the mutated card plus the data for the
/// matching review event. Produced by [`ReviewSession::rate`], consumed by
/// [`commit_rating`].
#[derive(Debug, Clone)]
pub struct RatedCard {
  pub card: Card,
  pub difficulty: Difficulty,
  pub rated_at: DateTime<Utc>,
  pub response_ms: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionProgress {
  Next(Card),
  Completed { rated: usize },
}

#[derive(Debug, Clone)]
pub struct ReviewSession {
  tier: DueTier,
  cards: Vec<Card>,
  cursor: usize,
  phase: SessionPhase,
  rated: usize,
}

impl ReviewSession {
  /// Start a session over a due-set. An empty set is rejected before any
  /// state exists.
  pub fn start(due_set: DueSet) -> Result<Self, SessionError> {
    if due_set.is_empty() {
      return Err(SessionError::NoCardsAvailable);
    }
    Ok(Self {
      tier: due_set.tier,
      cards: due_set.cards,
      cursor: 0,
      phase: SessionPhase::Presenting,
      rated: 0,
    })
  }

  pub fn tier(&self) -> DueTier {
    self.tier
  }

  pub fn phase(&self) -> SessionPhase {
    self.phase
  }

  /// Cards not yet rated, including the one currently presented.
  pub fn remaining(&self) -> usize {
    self.cards.len() - self.cursor
  }

  pub fn rated(&self) -> usize {
    self.rated
  }

  pub fn current_card(&self) -> Option<&Card> {
    match self.phase {
      SessionPhase::Completed => None,
      _ => self.cards.get(self.cursor),
    }
  }

  /// Expose the back face. Idempotent: revealing an already revealed card
  /// is a no-op.
  pub fn reveal(&mut self) -> Result<&Card, SessionError> {
    match self.phase {
      SessionPhase::Completed => Err(SessionError::Completed),
      _ => {
        self.phase = SessionPhase::Revealed;
        Ok(&self.cards[self.cursor])
      }
    }
  }

  /// Compute the mutation for rating the current card. Legal only in the
  /// revealed phase, and does not advance the cursor: the caller persists
  /// the result first and then calls [`advance`](Self::advance).
  pub fn rate(
    &self,
    difficulty: Difficulty,
    response_ms: Option<i64>,
    now: DateTime<Utc>,
    rng: &mut impl Rng,
  ) -> Result<RatedCard, SessionError> {
    match self.phase {
      SessionPhase::Completed => Err(SessionError::Completed),
      SessionPhase::Presenting => Err(SessionError::NotRevealed),
      SessionPhase::Revealed => {
        let mut card = self.cards[self.cursor].clone();
        let next_review = interval::next_review_at(difficulty, card.review_count as u32, now, rng);
        card.apply_review(difficulty, next_review, now);
        Ok(RatedCard { card, difficulty, rated_at: now, response_ms })
      }
    }
  }

  /// Move past the current card after its rating has been persisted.
  pub fn advance(&mut self) -> SessionProgress {
    if self.phase == SessionPhase::Completed {
      return SessionProgress::Completed { rated: self.rated };
    }
    self.cursor += 1;
    self.rated += 1;
    if self.cursor >= self.cards.len() {
      self.phase = SessionPhase::Completed;
      SessionProgress::Completed { rated: self.rated }
    } else {
      self.phase = SessionPhase::Presenting;
      SessionProgress::Next(self.cards[self.cursor].clone())
    }
  }
}

/// Rate the current card and commit the result: one card mutation and one
/// appended review event, atomically via the store, then advance. On a
/// store failure the session stays revealed and nothing is written.
pub fn commit_rating(
  store: &dyn DeckStore,
  session: &mut ReviewSession,
  difficulty: Difficulty,
  response_ms: Option<i64>,
  now: DateTime<Utc>,
  rng: &mut impl Rng,
) -> Result<SessionProgress, ReviewError> {
  let rated = session.rate(difficulty, response_ms, now, rng)?;
  store.commit_review(&rated.card, rated.difficulty, rated.rated_at, rated.response_ms)?;
  Ok(session.advance())
}
