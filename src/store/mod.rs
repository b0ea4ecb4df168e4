//! Storage collaborator for decks, cards, and review events.
//!
//! The scheduler and statistics engine only see the [`DeckStore`] trait;
//! the SQLite implementation lives in [`sqlite`].

pub mod schema;
pub mod sqlite;

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{Card, Deck, Difficulty, ReviewEvent};

pub use sqlite::SqliteStore;

pub type DbPool = Arc<Mutex<Connection>>;

/// Failure taxonomy of the storage collaborator. `NotFound` covers a
/// missing row or a missing table (the one-time setup affordance);
/// everything else is `Transient` and worth retrying from the outside.
/// The store itself never retries.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("not found: {0}")]
  NotFound(String),
  #[error("storage unavailable: {0}")]
  Transient(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// The narrow storage surface the core consumes. Scoped to a single
/// owner; the implementation decides what "owner" means.
pub trait DeckStore {
  fn list_decks(&self) -> StoreResult<Vec<Deck>>;
  fn get_deck(&self, id: i64) -> StoreResult<Deck>;
  fn create_deck(&self, name: &str, description: &str) -> StoreResult<Deck>;
  /// Cascades to member cards and their review events.
  fn delete_deck(&self, id: i64) -> StoreResult<()>;

  fn list_cards(&self, deck_id: i64) -> StoreResult<Vec<Card>>;
  fn get_card(&self, id: i64) -> StoreResult<Card>;
  fn create_card(
    &self,
    deck_id: i64,
    front: &str,
    back: &str,
    tags: &[String],
    now: DateTime<Utc>,
  ) -> StoreResult<Card>;
  fn update_card(&self, card: &Card) -> StoreResult<Card>;

  fn append_review_event(
    &self,
    card_id: i64,
    difficulty: Difficulty,
    rated_at: DateTime<Utc>,
    response_ms: Option<i64>,
  ) -> StoreResult<ReviewEvent>;
  fn list_review_events(&self) -> StoreResult<Vec<ReviewEvent>>;

  /// Persist a rating as one unit: the card mutation and the appended
  /// event commit together or not at all.
  fn commit_review(
    &self,
    card: &Card,
    difficulty: Difficulty,
    rated_at: DateTime<Utc>,
    response_ms: Option<i64>,
  ) -> StoreResult<ReviewEvent>;
}

/// Extension trait for logging errors before discarding them
pub trait LogOnError<T> {
  /// Log the error at warn level and return None
  fn log_warn(self, context: &str) -> Option<T>;
  /// Log the error at warn level and return the default
  fn log_warn_default(self, context: &str) -> T
  where
    T: Default;
}

impl<T, E: std::fmt::Display> LogOnError<T> for std::result::Result<T, E> {
  fn log_warn(self, context: &str) -> Option<T> {
    match self {
      Ok(v) => Some(v),
      Err(e) => {
        tracing::warn!("{}: {}", context, e);
        None
      }
    }
  }

  fn log_warn_default(self, context: &str) -> T
  where
    T: Default,
  {
    match self {
      Ok(v) => v,
      Err(e) => {
        tracing::warn!("{}: {}", context, e);
        T::default()
      }
    }
  }
}

pub fn init_db(path: &Path) -> StoreResult<DbPool> {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).ok();
  }

  // Create backup before migrations if database exists
  if path.exists() {
    let backup_path = path.with_extension("db.backup");
    if let Err(e) = std::fs::copy(path, &backup_path) {
      tracing::warn!("Could not create database backup: {}", e);
    }
  }

  let conn = Connection::open(path).map_err(|e| StoreError::Transient(e.to_string()))?;
  conn
    .pragma_update(None, "foreign_keys", "ON")
    .map_err(|e| StoreError::Transient(e.to_string()))?;
  schema::run_migrations(&conn).map_err(|e| StoreError::Transient(e.to_string()))?;
  Ok(Arc::new(Mutex::new(conn)))
}
