//! SQLite-backed implementation of the storage collaborator.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::{Card, Deck, Difficulty, ReviewEvent};

use super::{init_db, schema, DbPool, DeckStore, StoreError, StoreResult};

/// Single-owner store over one SQLite connection. The owner tag is burned
/// in at construction; every deck and event it writes carries it.
pub struct SqliteStore {
    pool: DbPool,
    owner: String,
}

impl SqliteStore {
    pub fn new(pool: DbPool, owner: impl Into<String>) -> Self {
        Self {
            pool,
            owner: owner.into(),
        }
    }

    pub fn open(path: &Path, owner: impl Into<String>) -> StoreResult<Self> {
        Ok(Self::new(init_db(path)?, owner))
    }

    pub fn open_in_memory(owner: impl Into<String>) -> StoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Transient(e.to_string()))?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(|e| StoreError::Transient(e.to_string()))?;
        schema::run_migrations(&conn).map_err(|e| StoreError::Transient(e.to_string()))?;
        Ok(Self::new(Arc::new(Mutex::new(conn)), owner))
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.pool.lock().map_err(|_: PoisonError<_>| {
            StoreError::Transient("database mutex poisoned".to_string())
        })
    }
}

/// A missing table is the "never set up" signal, surfaced as NotFound so
/// the caller can offer a setup flow instead of crashing.
fn map_sql_err(e: rusqlite::Error, what: &str) -> StoreError {
    match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound(what.to_string()),
        rusqlite::Error::SqliteFailure(_, Some(ref msg)) if msg.contains("no such table") => {
            StoreError::NotFound(format!("{}: {}", what, msg))
        }
        other => StoreError::Transient(other.to_string()),
    }
}

fn parse_ts(idx: usize, s: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn row_to_deck(row: &rusqlite::Row) -> rusqlite::Result<Deck> {
    let last_reviewed: Option<String> = row.get(5)?;
    Ok(Deck {
        id: row.get(0)?,
        owner: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        card_count: row.get(4)?,
        last_reviewed: last_reviewed.and_then(|s| {
            DateTime::parse_from_rfc3339(&s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        }),
    })
}

fn row_to_card(row: &rusqlite::Row) -> rusqlite::Result<Card> {
    let tags: String = row.get(4)?;
    let next_review: String = row.get(5)?;
    let last_reviewed: Option<String> = row.get(6)?;
    let difficulty: Option<String> = row.get(8)?;
    let created_at: String = row.get(9)?;

    Ok(Card {
        id: row.get(0)?,
        deck_id: row.get(1)?,
        front: row.get(2)?,
        back: row.get(3)?,
        tags: serde_json::from_str(&tags).unwrap_or_default(),
        next_review: parse_ts(5, next_review)?,
        last_reviewed: last_reviewed.and_then(|s| {
            DateTime::parse_from_rfc3339(&s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        }),
        review_count: row.get(7)?,
        difficulty: difficulty.as_deref().and_then(Difficulty::from_str),
        created_at: parse_ts(9, created_at)?,
    })
}

fn row_to_event(row: &rusqlite::Row) -> rusqlite::Result<ReviewEvent> {
    let difficulty: String = row.get(3)?;
    let rated_at: String = row.get(4)?;
    Ok(ReviewEvent {
        id: row.get(0)?,
        card_id: row.get(1)?,
        owner: row.get(2)?,
        // Unknown ratings in legacy rows degrade to Good rather than failing
        difficulty: Difficulty::from_str(&difficulty).unwrap_or(Difficulty::Good),
        rated_at: parse_ts(4, rated_at)?,
        response_ms: row.get(5)?,
    })
}

const DECK_COLUMNS: &str = r#"
    d.id, d.owner, d.name, d.description,
    (SELECT COUNT(*) FROM cards c WHERE c.deck_id = d.id),
    (SELECT MAX(c.last_reviewed) FROM cards c WHERE c.deck_id = d.id)
"#;

const CARD_COLUMNS: &str =
    "id, deck_id, front, back, tags, next_review, last_reviewed, review_count, difficulty, created_at";

fn insert_event(
    conn: &Connection,
    owner: &str,
    card_id: i64,
    difficulty: Difficulty,
    rated_at: DateTime<Utc>,
    response_ms: Option<i64>,
) -> rusqlite::Result<ReviewEvent> {
    conn.execute(
        r#"
        INSERT INTO review_events (card_id, owner, difficulty, rated_at, response_ms)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
        params![
            card_id,
            owner,
            difficulty.as_str(),
            rated_at.to_rfc3339(),
            response_ms
        ],
    )?;
    Ok(ReviewEvent {
        id: conn.last_insert_rowid(),
        card_id,
        owner: owner.to_string(),
        difficulty,
        rated_at,
        response_ms,
    })
}

fn write_card(conn: &Connection, card: &Card) -> rusqlite::Result<usize> {
    conn.execute(
        r#"
        UPDATE cards
        SET front = ?1, back = ?2, tags = ?3, next_review = ?4, last_reviewed = ?5,
            review_count = ?6, difficulty = ?7
        WHERE id = ?8
        "#,
        params![
            card.front,
            card.back,
            serde_json::to_string(&card.tags).unwrap_or_else(|_| "[]".to_string()),
            card.next_review.to_rfc3339(),
            card.last_reviewed.map(|t| t.to_rfc3339()),
            card.review_count,
            card.difficulty.map(|d| d.as_str()),
            card.id,
        ],
    )
}

impl DeckStore for SqliteStore {
    fn list_decks(&self) -> StoreResult<Vec<Deck>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM decks d ORDER BY d.name", DECK_COLUMNS);
        let mut stmt = conn.prepare(&sql).map_err(|e| map_sql_err(e, "decks"))?;
        let decks = stmt
            .query_map([], row_to_deck)
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(|e| map_sql_err(e, "decks"))?;
        Ok(decks)
    }

    fn get_deck(&self, id: i64) -> StoreResult<Deck> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM decks d WHERE d.id = ?1", DECK_COLUMNS);
        conn.query_row(&sql, params![id], row_to_deck)
            .map_err(|e| map_sql_err(e, &format!("deck {}", id)))
    }

    fn create_deck(&self, name: &str, description: &str) -> StoreResult<Deck> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO decks (owner, name, description) VALUES (?1, ?2, ?3)",
            params![self.owner, name, description],
        )
        .map_err(|e| map_sql_err(e, "decks"))?;
        Ok(Deck {
            id: conn.last_insert_rowid(),
            owner: self.owner.clone(),
            name: name.to_string(),
            description: description.to_string(),
            card_count: 0,
            last_reviewed: None,
        })
    }

    fn delete_deck(&self, id: i64) -> StoreResult<()> {
        let conn = self.conn()?;
        let deleted = conn
            .execute("DELETE FROM decks WHERE id = ?1", params![id])
            .map_err(|e| map_sql_err(e, "decks"))?;
        if deleted == 0 {
            return Err(StoreError::NotFound(format!("deck {}", id)));
        }
        Ok(())
    }

    fn list_cards(&self, deck_id: i64) -> StoreResult<Vec<Card>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM cards WHERE deck_id = ?1 ORDER BY created_at ASC, id ASC",
            CARD_COLUMNS
        );
        let mut stmt = conn.prepare(&sql).map_err(|e| map_sql_err(e, "cards"))?;
        let cards = stmt
            .query_map(params![deck_id], row_to_card)
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(|e| map_sql_err(e, "cards"))?;
        Ok(cards)
    }

    fn get_card(&self, id: i64) -> StoreResult<Card> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM cards WHERE id = ?1", CARD_COLUMNS);
        conn.query_row(&sql, params![id], row_to_card)
            .map_err(|e| map_sql_err(e, &format!("card {}", id)))
    }

    fn create_card(
        &self,
        deck_id: i64,
        front: &str,
        back: &str,
        tags: &[String],
        now: DateTime<Utc>,
    ) -> StoreResult<Card> {
        // Reject unknown decks up front so the FK error does not surface
        // as Transient.
        self.get_deck(deck_id)?;

        let mut card = Card::new(deck_id, front.to_string(), back.to_string(), tags.to_vec(), now);
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO cards (deck_id, front, back, tags, next_review, last_reviewed,
                               review_count, difficulty, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, NULL, 0, NULL, ?6)
            "#,
            params![
                card.deck_id,
                card.front,
                card.back,
                serde_json::to_string(&card.tags).unwrap_or_else(|_| "[]".to_string()),
                card.next_review.to_rfc3339(),
                card.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| map_sql_err(e, "cards"))?;
        card.id = conn.last_insert_rowid();
        Ok(card)
    }

    fn update_card(&self, card: &Card) -> StoreResult<Card> {
        let conn = self.conn()?;
        let updated = write_card(&conn, card).map_err(|e| map_sql_err(e, "cards"))?;
        if updated == 0 {
            return Err(StoreError::NotFound(format!("card {}", card.id)));
        }
        Ok(card.clone())
    }

    fn append_review_event(
        &self,
        card_id: i64,
        difficulty: Difficulty,
        rated_at: DateTime<Utc>,
        response_ms: Option<i64>,
    ) -> StoreResult<ReviewEvent> {
        let conn = self.conn()?;
        insert_event(&conn, &self.owner, card_id, difficulty, rated_at, response_ms)
            .map_err(|e| map_sql_err(e, "review_events"))
    }

    fn list_review_events(&self) -> StoreResult<Vec<ReviewEvent>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                r#"
                SELECT id, card_id, owner, difficulty, rated_at, response_ms
                FROM review_events
                ORDER BY rated_at ASC, id ASC
                "#,
            )
            .map_err(|e| map_sql_err(e, "review_events"))?;
        let events = stmt
            .query_map([], row_to_event)
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(|e| map_sql_err(e, "review_events"))?;
        Ok(events)
    }

    fn commit_review(
        &self,
        card: &Card,
        difficulty: Difficulty,
        rated_at: DateTime<Utc>,
        response_ms: Option<i64>,
    ) -> StoreResult<ReviewEvent> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| map_sql_err(e, "review_events"))?;

        let updated = write_card(&tx, card).map_err(|e| map_sql_err(e, "cards"))?;
        if updated == 0 {
            // Transaction dropped here, nothing written
            return Err(StoreError::NotFound(format!("card {}", card.id)));
        }
        let event = insert_event(&tx, &self.owner, card.id, difficulty, rated_at, response_ms)
            .map_err(|e| map_sql_err(e, "review_events"))?;

        tx.commit().map_err(|e| map_sql_err(e, "review_events"))?;
        Ok(event)
    }
}
