//! Application configuration.
//!
//! File-based settings (database path) plus the tuning constants for the
//! scheduler and the statistics engine.

use serde::Deserialize;
use std::path::PathBuf;

// ==================== Database Configuration ====================

/// Configuration file structure for config.toml
#[derive(Debug, Deserialize)]
struct AppConfig {
  database: Option<DatabaseConfig>,
}

#[derive(Debug, Deserialize)]
struct DatabaseConfig {
  path: Option<String>,
}

/// Load database path with priority: config.toml > .env > default
pub fn load_database_path() -> PathBuf {
  // Load .env file if present
  let _ = dotenvy::dotenv();

  // Priority 1: config.toml
  if let Ok(contents) = std::fs::read_to_string("config.toml") {
    if let Ok(config) = toml::from_str::<AppConfig>(&contents) {
      if let Some(db) = config.database {
        if let Some(path) = db.path {
          tracing::info!("Using database from config.toml: {}", path);
          return PathBuf::from(path);
        }
      }
    }
  }

  // Priority 2: .env DATABASE_PATH
  if let Ok(path) = std::env::var("DATABASE_PATH") {
    tracing::info!("Using database from DATABASE_PATH env: {}", path);
    return PathBuf::from(path);
  }

  // Default
  let default = PathBuf::from("data/recall.db");
  tracing::info!("Using default database path: {}", default.display());
  default
}

// ==================== Server Configuration ====================

/// Server address to bind to
pub const SERVER_ADDR: &str = "0.0.0.0";

/// Server port
pub const SERVER_PORT: u16 = 3000;

/// Get the full server bind address
pub fn server_bind_addr() -> String {
  format!("{}:{}", SERVER_ADDR, SERVER_PORT)
}

/// The store is single-user; all decks and events belong to this owner
/// unless OWNER is set in the environment.
pub fn load_owner() -> String {
  std::env::var("OWNER").unwrap_or_else(|_| "local".to_string())
}

// ==================== Scheduler Configuration ====================

/// Forward buffer when deciding whether a card is due, tolerating clock
/// and latency skew between selection and review-time comparisons.
pub const DUE_BUFFER_SECS: i64 = 60;

/// Interval jitter bounds. A uniform multiplier in this range spreads
/// next-review dates so cards do not bunch on identical days.
pub const JITTER_MIN: f64 = 0.8;
pub const JITTER_MAX: f64 = 1.2;

// ==================== Statistics Configuration ====================

/// A card counts as mastered once it has at least this many reviews...
pub const MASTERY_MIN_REVIEWS: usize = 3;

/// ...of which at least this many were successful.
pub const MASTERY_MIN_SUCCESSES: usize = 2;

/// Length of the daily activity series.
pub const DAILY_ACTIVITY_DAYS: i64 = 7;

/// Below this many weekly buckets the performance series degrades to
/// daily buckets for finer granularity.
pub const MIN_WEEKLY_BUCKETS: usize = 3;
