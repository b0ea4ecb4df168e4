//! Review session endpoints: start, reveal, rate.

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::domain::{Card, Difficulty};
use crate::srs::{commit_rating, select_for_review, DueTier, ReviewSession, SessionProgress};
use crate::state::AppState;
use crate::store::DeckStore;

use super::ApiError;

/// The front face only; the back stays hidden until reveal.
#[derive(Serialize)]
pub struct CardFace {
  pub id: i64,
  pub front: String,
}

impl CardFace {
  fn of(card: &Card) -> Self {
    Self { id: card.id, front: card.front.clone() }
  }
}

#[derive(Serialize)]
pub struct SessionStarted {
  pub session_id: u64,
  pub tier: DueTier,
  pub remaining: usize,
  pub card: CardFace,
}

#[derive(Serialize)]
pub struct RevealedCard {
  pub id: i64,
  pub front: String,
  pub back: String,
}

#[derive(Deserialize)]
pub struct RateRequest {
  pub difficulty: Difficulty,
  #[serde(default)]
  pub response_ms: Option<i64>,
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RateResponse {
  Next { card: CardFace, remaining: usize },
  Completed { rated: usize },
}

fn lock_sessions(state: &AppState) -> Result<std::sync::MutexGuard<'_, std::collections::HashMap<u64, ReviewSession>>, ApiError> {
  state
    .sessions
    .lock()
    .map_err(|_| ApiError::Unavailable("session table poisoned".to_string()))
}

pub async fn start_review(
  State(state): State<AppState>,
  Path(deck_id): Path<i64>,
) -> Result<Json<SessionStarted>, ApiError> {
  state.store.get_deck(deck_id)?;
  let cards = state.store.list_cards(deck_id)?;
  let due_set = select_for_review(&cards, Utc::now());
  let session = ReviewSession::start(due_set)?;

  let card = session
    .current_card()
    .map(CardFace::of)
    .ok_or_else(|| ApiError::Unavailable("session has no current card".to_string()))?;
  let started = SessionStarted {
    session_id: state.allocate_session_id(),
    tier: session.tier(),
    remaining: session.remaining(),
    card,
  };
  tracing::debug!(
    "started session {} on deck {} ({} cards, tier {:?})",
    started.session_id,
    deck_id,
    started.remaining,
    started.tier
  );
  lock_sessions(&state)?.insert(started.session_id, session);
  Ok(Json(started))
}

pub async fn reveal(
  State(state): State<AppState>,
  Path(session_id): Path<u64>,
) -> Result<Json<RevealedCard>, ApiError> {
  let mut sessions = lock_sessions(&state)?;
  let session = sessions
    .get_mut(&session_id)
    .ok_or_else(|| ApiError::NotFound(format!("session {}", session_id)))?;

  let card = session.reveal()?;
  Ok(Json(RevealedCard {
    id: card.id,
    front: card.front.clone(),
    back: card.back.clone(),
  }))
}

pub async fn rate(
  State(state): State<AppState>,
  Path(session_id): Path<u64>,
  Json(request): Json<RateRequest>,
) -> Result<Json<RateResponse>, ApiError> {
  let mut sessions = lock_sessions(&state)?;
  let session = sessions
    .get_mut(&session_id)
    .ok_or_else(|| ApiError::NotFound(format!("session {}", session_id)))?;

  let progress = commit_rating(
    state.store.as_ref(),
    session,
    request.difficulty,
    request.response_ms,
    Utc::now(),
    &mut rand::rng(),
  )?;

  match progress {
    SessionProgress::Next(card) => Ok(Json(RateResponse::Next {
      card: CardFace::of(&card),
      remaining: session.remaining(),
    })),
    SessionProgress::Completed { rated } => {
      sessions.remove(&session_id);
      tracing::debug!("session {} completed after {} ratings", session_id, rated);
      Ok(Json(RateResponse::Completed { rated }))
    }
  }
}
