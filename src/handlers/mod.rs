//! JSON HTTP surface driving the scheduler and the statistics engine.

mod decks;
mod review;
mod stats;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use thiserror::Error;
use tower_http::trace::TraceLayer;

use crate::srs::{ReviewError, SessionError};
use crate::state::AppState;
use crate::store::StoreError;

pub use decks::{create_card, create_deck, delete_deck, get_deck, list_cards, list_decks, update_card};
pub use review::{rate, reveal, start_review};
pub use stats::{calendar, get_stats};

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  NotFound(String),
  #[error("{0}")]
  Unavailable(String),
  #[error("{0}")]
  Invalid(String),
  #[error("{0}")]
  NoCards(String),
}

impl From<StoreError> for ApiError {
  fn from(e: StoreError) -> Self {
    match e {
      StoreError::NotFound(what) => Self::NotFound(what),
      StoreError::Transient(why) => Self::Unavailable(why),
    }
  }
}

impl From<SessionError> for ApiError {
  fn from(e: SessionError) -> Self {
    match e {
      SessionError::NoCardsAvailable => Self::NoCards(e.to_string()),
      _ => Self::Invalid(e.to_string()),
    }
  }
}

impl From<ReviewError> for ApiError {
  fn from(e: ReviewError) -> Self {
    match e {
      ReviewError::Session(e) => e.into(),
      ReviewError::Store(e) => e.into(),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match self {
      Self::NotFound(_) => StatusCode::NOT_FOUND,
      Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
      Self::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
      Self::NoCards(_) => StatusCode::CONFLICT,
    };
    let body = Json(serde_json::json!({ "error": self.to_string() }));
    (status, body).into_response()
  }
}

pub fn router(state: AppState) -> Router {
  Router::new()
    .route("/decks", get(list_decks).post(create_deck))
    .route("/decks/{id}", get(get_deck).delete(delete_deck))
    .route("/decks/{id}/cards", get(list_cards).post(create_card))
    .route("/cards/{id}", patch(update_card))
    .route("/decks/{id}/review", post(start_review))
    .route("/review/{session_id}/reveal", post(reveal))
    .route("/review/{session_id}/rate", post(rate))
    .route("/stats", get(get_stats))
    .route("/calendar/{year}/{month}", get(calendar))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
