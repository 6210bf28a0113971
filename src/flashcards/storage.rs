//! SQLite storage for decks and flashcards
//!
//! Schema:
//! ```text
//! decks(id, name, description, created_at)
//! flashcards(id, deck_id → decks.id, person_name, person_role, front, back,
//!            image_filename UNIQUE, difficulty, review_count,
//!            last_reviewed, next_review, created_at)
//! ```
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC text so that SQL string
//! comparison matches chronological order.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;

use super::algorithm::calculate_next_review;
use super::models::*;

#[derive(Error, Debug)]
pub enum FlashcardStorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Deck not found: {0}")]
    DeckNotFound(i64),

    #[error("Card not found: {0}")]
    CardNotFound(i64),

    #[error("Database lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, FlashcardStorageError>;

const CARD_COLUMNS: &str = "id, deck_id, person_name, person_role, front, back, image_filename, \
                            difficulty, review_count, last_reviewed, next_review, created_at";

/// Storage manager for decks and cards
pub struct FlashcardStorage {
    conn: Mutex<Connection>,
}

impl FlashcardStorage {
    /// Open (or create) the database at `db_path`
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        Self::from_connection(conn)
    }

    /// Open an in-memory database (for tests)
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS decks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                description TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS flashcards (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                deck_id INTEGER NOT NULL REFERENCES decks(id),
                person_name TEXT NOT NULL,
                person_role TEXT NOT NULL,
                front TEXT,
                back TEXT,
                image_filename TEXT NOT NULL UNIQUE,
                difficulty INTEGER NOT NULL DEFAULT 3,
                review_count INTEGER NOT NULL DEFAULT 0,
                last_reviewed TEXT,
                next_review TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_flashcards_deck_id ON flashcards(deck_id);
            CREATE INDEX IF NOT EXISTS idx_flashcards_due ON flashcards(deck_id, next_review);
            "#,
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| FlashcardStorageError::LockPoisoned)
    }

    // ==================== Deck Operations ====================

    /// Create a new deck
    pub fn create_deck(&self, name: &str, description: Option<&str>) -> Result<Deck> {
        let conn = self.conn()?;
        let created_at = storage_now();

        conn.execute(
            "INSERT INTO decks (name, description, created_at) VALUES (?1, ?2, ?3)",
            params![name, description, format_timestamp(created_at)],
        )?;

        Ok(Deck {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            description: description.map(str::to_string),
            created_at,
            card_count: 0,
        })
    }

    /// List all decks with their card counts, oldest first
    pub fn list_decks(&self) -> Result<Vec<Deck>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT d.id, d.name, d.description, d.created_at,
                    (SELECT COUNT(*) FROM flashcards f WHERE f.deck_id = d.id)
             FROM decks d
             ORDER BY d.id",
        )?;

        let decks = stmt
            .query_map([], row_to_deck)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(decks)
    }

    /// Get a specific deck
    pub fn get_deck(&self, deck_id: i64) -> Result<Deck> {
        let conn = self.conn()?;
        find_deck(&conn, deck_id)?.ok_or(FlashcardStorageError::DeckNotFound(deck_id))
    }

    /// Delete a deck and all its cards
    ///
    /// Returns the image filenames of the removed cards.
    pub fn delete_deck(&self, deck_id: i64) -> Result<Vec<String>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        if find_deck(&tx, deck_id)?.is_none() {
            return Err(FlashcardStorageError::DeckNotFound(deck_id));
        }

        let filenames = {
            let mut stmt = tx.prepare("SELECT image_filename FROM flashcards WHERE deck_id = ?1")?;
            let rows = stmt.query_map([deck_id], |row| row.get::<_, String>(0))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        tx.execute("DELETE FROM flashcards WHERE deck_id = ?1", [deck_id])?;
        tx.execute("DELETE FROM decks WHERE id = ?1", [deck_id])?;
        tx.commit()?;

        Ok(filenames)
    }

    // ==================== Card Operations ====================

    /// Create a new card, due immediately
    pub fn create_card(&self, new_card: &NewFlashcard) -> Result<Flashcard> {
        let conn = self.conn()?;

        if find_deck(&conn, new_card.deck_id)?.is_none() {
            return Err(FlashcardStorageError::DeckNotFound(new_card.deck_id));
        }

        let now = storage_now();
        conn.execute(
            "INSERT INTO flashcards
                (deck_id, person_name, person_role, front, back, image_filename,
                 difficulty, review_count, last_reviewed, next_review, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, NULL, ?8, ?8)",
            params![
                new_card.deck_id,
                new_card.person_name,
                new_card.person_role,
                new_card.front,
                new_card.back,
                new_card.image_filename,
                DEFAULT_DIFFICULTY,
                format_timestamp(now),
            ],
        )?;

        Ok(Flashcard {
            id: conn.last_insert_rowid(),
            deck_id: new_card.deck_id,
            person_name: new_card.person_name.clone(),
            person_role: new_card.person_role.clone(),
            front: new_card.front.clone(),
            back: new_card.back.clone(),
            image_filename: new_card.image_filename.clone(),
            difficulty: DEFAULT_DIFFICULTY,
            review_count: 0,
            last_reviewed: None,
            next_review: now,
            created_at: now,
        })
    }

    /// Get a specific card
    pub fn get_card(&self, card_id: i64) -> Result<Flashcard> {
        let conn = self.conn()?;
        find_card(&conn, card_id)?.ok_or(FlashcardStorageError::CardNotFound(card_id))
    }

    /// List all cards in a deck
    pub fn list_cards(&self, deck_id: i64) -> Result<Vec<Flashcard>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM flashcards WHERE deck_id = ?1 ORDER BY id",
            CARD_COLUMNS
        ))?;

        let cards = stmt
            .query_map([deck_id], row_to_card)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(cards)
    }

    /// Delete a card, returning it so the caller can clean up its image
    pub fn delete_card(&self, card_id: i64) -> Result<Flashcard> {
        let conn = self.conn()?;
        let card = find_card(&conn, card_id)?.ok_or(FlashcardStorageError::CardNotFound(card_id))?;

        conn.execute("DELETE FROM flashcards WHERE id = ?1", [card_id])?;
        Ok(card)
    }

    // ==================== Review Operations ====================

    /// Cards in a deck that are due at `now`, oldest due date first
    pub fn due_cards(&self, deck_id: i64, now: DateTime<Utc>, limit: usize) -> Result<Vec<Flashcard>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM flashcards
             WHERE deck_id = ?1 AND next_review <= ?2
             ORDER BY next_review, id
             LIMIT ?3",
            CARD_COLUMNS
        ))?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let cards = stmt
            .query_map(params![deck_id, format_timestamp(now), limit], row_to_card)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(cards)
    }

    /// Record a review graded `difficulty` at `now` and reschedule the card
    pub fn update_review(&self, card_id: i64, difficulty: i32, now: DateTime<Utc>) -> Result<Flashcard> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let mut card = find_card(&tx, card_id)?.ok_or(FlashcardStorageError::CardNotFound(card_id))?;

        let now = now.trunc_subsecs(6);
        let result = calculate_next_review(difficulty, card.review_count, now);

        card.difficulty = difficulty;
        card.last_reviewed = Some(now);
        card.review_count += 1;
        card.next_review = result.next_review.trunc_subsecs(6);

        tx.execute(
            "UPDATE flashcards
             SET difficulty = ?1, last_reviewed = ?2, review_count = ?3, next_review = ?4
             WHERE id = ?5",
            params![
                card.difficulty,
                format_timestamp(now),
                card.review_count,
                format_timestamp(card.next_review),
                card_id,
            ],
        )?;
        tx.commit()?;

        Ok(card)
    }
}

/// Current time at the precision timestamps are stored with
fn storage_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_optional_timestamp(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(idx)? {
        None => Ok(None),
        Some(_) => parse_timestamp(row, idx).map(Some),
    }
}

fn row_to_deck(row: &Row) -> rusqlite::Result<Deck> {
    Ok(Deck {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: parse_timestamp(row, 3)?,
        card_count: row.get(4)?,
    })
}

fn row_to_card(row: &Row) -> rusqlite::Result<Flashcard> {
    Ok(Flashcard {
        id: row.get(0)?,
        deck_id: row.get(1)?,
        person_name: row.get(2)?,
        person_role: row.get(3)?,
        front: row.get(4)?,
        back: row.get(5)?,
        image_filename: row.get(6)?,
        difficulty: row.get(7)?,
        review_count: row.get(8)?,
        last_reviewed: parse_optional_timestamp(row, 9)?,
        next_review: parse_timestamp(row, 10)?,
        created_at: parse_timestamp(row, 11)?,
    })
}

fn find_deck(conn: &Connection, deck_id: i64) -> Result<Option<Deck>> {
    let deck = conn
        .query_row(
            "SELECT d.id, d.name, d.description, d.created_at,
                    (SELECT COUNT(*) FROM flashcards f WHERE f.deck_id = d.id)
             FROM decks d
             WHERE d.id = ?1",
            [deck_id],
            row_to_deck,
        )
        .optional()?;
    Ok(deck)
}

fn find_card(conn: &Connection, card_id: i64) -> Result<Option<Flashcard>> {
    let card = conn
        .query_row(
            &format!("SELECT {} FROM flashcards WHERE id = ?1", CARD_COLUMNS),
            [card_id],
            row_to_card,
        )
        .optional()?;
    Ok(card)
}
