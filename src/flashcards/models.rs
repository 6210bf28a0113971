//! Data models for the flashcard system

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Difficulty assigned to a card that has never been reviewed
pub const DEFAULT_DIFFICULTY: i32 = 3;

/// A named collection of person cards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Number of cards currently in the deck
    #[serde(default)]
    pub card_count: i64,
}

/// A flashcard pairing a person's photo with their name and role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    pub id: i64,
    pub deck_id: i64,
    pub person_name: String,
    pub person_role: String,
    pub front: Option<String>,
    pub back: Option<String>,
    /// Server-generated name of the stored photo
    pub image_filename: String,
    /// Last difficulty rating (1 = hardest, 5 = easiest)
    pub difficulty: i32,
    pub review_count: i64,
    pub last_reviewed: Option<DateTime<Utc>>,
    /// When the card is due for review
    pub next_review: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Flashcard {
    /// Check if the card is due for review at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review <= now
    }

    /// URL path the stored photo is served from
    pub fn image_url(&self) -> String {
        format!("/uploads/{}", self.image_filename)
    }
}

/// Fields needed to create a card
#[derive(Debug, Clone)]
pub struct NewFlashcard {
    pub deck_id: i64,
    pub person_name: String,
    pub person_role: String,
    pub image_filename: String,
    pub front: Option<String>,
    pub back: Option<String>,
}

/// Outcome of a bulk photo upload
#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkUploadReport {
    pub created: Vec<Flashcard>,
    pub created_count: usize,
    /// One message per file that could not be turned into a card
    pub errors: Vec<String>,
}

impl BulkUploadReport {
    pub fn record_card(&mut self, card: Flashcard) {
        self.created.push(card);
        self.created_count = self.created.len();
    }

    pub fn record_error(&mut self, message: String) {
        self.errors.push(message);
    }

    pub fn all_failed(&self) -> bool {
        self.created.is_empty()
    }

    pub fn summary(&self) -> String {
        if self.errors.is_empty() {
            format!("Created {} cards successfully.", self.created_count)
        } else {
            format!(
                "Created {} cards successfully. Errors: {}",
                self.created_count,
                self.errors.join("; ")
            )
        }
    }
}
