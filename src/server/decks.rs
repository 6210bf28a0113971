//! Deck endpoints

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::flashcards::Deck;

use super::auth::Authenticated;
use super::cards::CardView;
use super::error::{ApiError, ApiResult};
use super::SharedState;

#[derive(Debug, Deserialize)]
pub struct CreateDeckRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl CreateDeckRequest {
    /// Trimmed name and description; the name must not be blank
    fn validate(self) -> ApiResult<(String, Option<String>)> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ApiError::validation("Deck name is required"));
        }
        let description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        Ok((name.to_string(), description))
    }
}

#[derive(Debug, Deserialize)]
pub struct StudyQuery {
    pub limit: Option<i64>,
}

pub async fn list_decks(
    _auth: Authenticated,
    State(state): State<SharedState>,
) -> ApiResult<Json<Vec<Deck>>> {
    Ok(Json(state.storage.list_decks()?))
}

pub async fn create_deck(
    _auth: Authenticated,
    State(state): State<SharedState>,
    body: Result<Json<CreateDeckRequest>, JsonRejection>,
) -> ApiResult<Json<Deck>> {
    let Json(req) = body.map_err(|e| ApiError::validation(e.body_text()))?;
    let (name, description) = req.validate()?;

    let deck = state.storage.create_deck(&name, description.as_deref())?;
    log::info!("Created deck {} ({:?})", deck.id, deck.name);
    Ok(Json(deck))
}

pub async fn list_cards(
    _auth: Authenticated,
    State(state): State<SharedState>,
    Path(deck_id): Path<i64>,
) -> ApiResult<Json<Vec<CardView>>> {
    let cards = state.storage.list_cards(deck_id)?;
    Ok(Json(cards.into_iter().map(CardView::from).collect()))
}

/// Cards due for review, capped at `limit`
pub async fn study(
    _auth: Authenticated,
    State(state): State<SharedState>,
    Path(deck_id): Path<i64>,
    query: Result<Query<StudyQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<CardView>>> {
    let Query(query) = query.map_err(|e| ApiError::validation(e.body_text()))?;
    let limit = match query.limit {
        None => state.config.default_study_limit,
        Some(n) if n >= 1 => usize::try_from(n).unwrap_or(usize::MAX),
        Some(_) => return Err(ApiError::validation("limit must be at least 1")),
    };

    let cards = state.storage.due_cards(deck_id, Utc::now(), limit)?;
    Ok(Json(cards.into_iter().map(CardView::from).collect()))
}

/// Delete a deck, its cards and their stored photos
pub async fn delete_deck(
    _auth: Authenticated,
    State(state): State<SharedState>,
    Path(deck_id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    let filenames = state.storage.delete_deck(deck_id)?;
    state.images.remove_all(&filenames).await;

    log::info!("Deleted deck {} with {} cards", deck_id, filenames.len());
    Ok(Json(serde_json::json!({ "message": "Deck deleted successfully" })))
}
