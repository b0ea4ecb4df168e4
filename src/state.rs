//! Application state shared across handlers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::srs::ReviewSession;
use crate::store::SqliteStore;

/// In-flight review sessions, keyed by session id. Sessions live only in
/// this process; an abandoned session is simply dropped and any ratings
/// already committed stay committed.
pub type Sessions = Arc<Mutex<HashMap<u64, ReviewSession>>>;

#[derive(Clone)]
pub struct AppState {
  pub store: Arc<SqliteStore>,
  pub sessions: Sessions,
  next_session_id: Arc<AtomicU64>,
}

impl AppState {
  pub fn new(store: Arc<SqliteStore>) -> Self {
    Self {
      store,
      sessions: Arc::new(Mutex::new(HashMap::new())),
      next_session_id: Arc::new(AtomicU64::new(1)),
    }
  }

  pub fn allocate_session_id(&self) -> u64 {
    self.next_session_id.fetch_add(1, Ordering::Relaxed)
  }
}
