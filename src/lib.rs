//! Team photo flashcards: decks of people cards reviewed on a spaced
//! repetition schedule, served over HTTP.

pub mod auth;
pub mod config;
pub mod flashcards;
pub mod server;
pub mod uploads;
