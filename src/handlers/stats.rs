//! Statistics and planning endpoints.

use axum::extract::{Path, State};
use axum::Json;
use chrono::{Local, NaiveDate};
use std::collections::BTreeMap;

use crate::domain::Card;
use crate::state::AppState;
use crate::stats::{compute_statistics, month_window, project_due_counts, StatisticsSnapshot};
use crate::store::{DeckStore, LogOnError};

use super::ApiError;

/// Every card across all decks. A failing deck degrades to an empty list
/// rather than taking the whole analytics view down.
fn all_cards(state: &AppState) -> Result<Vec<Card>, ApiError> {
  let decks = state.store.list_decks()?;
  let mut cards = Vec::new();
  for deck in &decks {
    cards.extend(
      state
        .store
        .list_cards(deck.id)
        .log_warn_default(&format!("listing cards of deck {}", deck.id)),
    );
  }
  Ok(cards)
}

pub async fn get_stats(State(state): State<AppState>) -> Result<Json<StatisticsSnapshot>, ApiError> {
  let events = state.store.list_review_events()?;
  let decks = state.store.list_decks()?;
  let cards = all_cards(&state)?;
  Ok(Json(compute_statistics(&events, &cards, &decks, Local::now())))
}

pub async fn calendar(
  State(state): State<AppState>,
  Path((year, month)): Path<(i32, u32)>,
) -> Result<Json<BTreeMap<NaiveDate, u32>>, ApiError> {
  let (start, end) = month_window(year, month, &Local)
    .ok_or_else(|| ApiError::Invalid(format!("invalid month {}-{}", year, month)))?;
  let cards = all_cards(&state)?;
  Ok(Json(project_due_counts(&cards, start, end)))
}
