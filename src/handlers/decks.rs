//! Deck and card CRUD endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::domain::{Card, Deck};
use crate::state::AppState;
use crate::store::DeckStore;

use super::ApiError;

#[derive(Deserialize)]
pub struct CreateDeckRequest {
  pub name: String,
  #[serde(default)]
  pub description: String,
}

#[derive(Deserialize)]
pub struct CreateCardRequest {
  pub front: String,
  pub back: String,
  #[serde(default)]
  pub tags: Vec<String>,
}

#[derive(Deserialize)]
pub struct UpdateCardRequest {
  pub front: Option<String>,
  pub back: Option<String>,
  pub tags: Option<Vec<String>>,
}

pub async fn list_decks(State(state): State<AppState>) -> Result<Json<Vec<Deck>>, ApiError> {
  Ok(Json(state.store.list_decks()?))
}

pub async fn get_deck(
  State(state): State<AppState>,
  Path(id): Path<i64>,
) -> Result<Json<Deck>, ApiError> {
  Ok(Json(state.store.get_deck(id)?))
}

pub async fn create_deck(
  State(state): State<AppState>,
  Json(request): Json<CreateDeckRequest>,
) -> Result<(StatusCode, Json<Deck>), ApiError> {
  let name = request.name.trim();
  if name.is_empty() {
    return Err(ApiError::Invalid("deck name must not be empty".to_string()));
  }
  let deck = state.store.create_deck(name, request.description.trim())?;
  tracing::info!("created deck {} ({})", deck.id, deck.name);
  Ok((StatusCode::CREATED, Json(deck)))
}

pub async fn delete_deck(
  State(state): State<AppState>,
  Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
  state.store.delete_deck(id)?;
  tracing::info!("deleted deck {} with its cards and events", id);
  Ok(StatusCode::NO_CONTENT)
}

pub async fn list_cards(
  State(state): State<AppState>,
  Path(deck_id): Path<i64>,
) -> Result<Json<Vec<Card>>, ApiError> {
  // Distinguish "unknown deck" from "deck with no cards"
  state.store.get_deck(deck_id)?;
  Ok(Json(state.store.list_cards(deck_id)?))
}

pub async fn create_card(
  State(state): State<AppState>,
  Path(deck_id): Path<i64>,
  Json(request): Json<CreateCardRequest>,
) -> Result<(StatusCode, Json<Card>), ApiError> {
  if request.front.trim().is_empty() {
    return Err(ApiError::Invalid("card front must not be empty".to_string()));
  }
  let card = state.store.create_card(
    deck_id,
    request.front.trim(),
    request.back.trim(),
    &request.tags,
    Utc::now(),
  )?;
  Ok((StatusCode::CREATED, Json(card)))
}

pub async fn update_card(
  State(state): State<AppState>,
  Path(id): Path<i64>,
  Json(request): Json<UpdateCardRequest>,
) -> Result<Json<Card>, ApiError> {
  let mut card = state.store.get_card(id)?;
  if let Some(front) = request.front {
    if front.trim().is_empty() {
      return Err(ApiError::Invalid("card front must not be empty".to_string()));
    }
    card.front = front.trim().to_string();
  }
  if let Some(back) = request.back {
    card.back = back.trim().to_string();
  }
  if let Some(tags) = request.tags {
    card.tags = tags;
  }
  Ok(Json(state.store.update_card(&card)?))
}
