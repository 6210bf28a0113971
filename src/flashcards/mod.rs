//! Person flashcards with spaced repetition
//!
//! This module provides:
//! - Deck and card storage backed by SQLite
//! - The review interval scheduler
//! - Name and role extraction from photo filenames

pub mod algorithm;
pub mod filename;
pub mod models;
pub mod storage;

pub use filename::{parse_filename, FilenameParseError, ParsedName, DEFAULT_ROLE};
pub use models::*;
pub use storage::{FlashcardStorage, FlashcardStorageError};
