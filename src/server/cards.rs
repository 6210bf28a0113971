//! Card endpoints: photo uploads, reviews and deletion

use axum::extract::multipart::Field;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, State};
use axum::Json;
use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::flashcards::algorithm::format_interval;
use crate::flashcards::{parse_filename, BulkUploadReport, Flashcard, NewFlashcard};
use crate::uploads::ensure_image;

use super::auth::Authenticated;
use super::error::{ApiError, ApiResult};
use super::{AppState, SharedState};

/// A card as returned to clients, with the URL of its photo
#[derive(Debug, Serialize)]
pub struct CardView {
    #[serde(flatten)]
    pub card: Flashcard,
    pub image_url: String,
}

impl From<Flashcard> for CardView {
    fn from(card: Flashcard) -> Self {
        let image_url = card.image_url();
        Self { card, image_url }
    }
}

#[derive(Debug, Serialize)]
pub struct BulkUploadResponse {
    pub created: Vec<CardView>,
    pub created_count: usize,
    pub errors: Vec<String>,
}

impl From<BulkUploadReport> for BulkUploadResponse {
    fn from(report: BulkUploadReport) -> Self {
        Self {
            created: report.created.into_iter().map(CardView::from).collect(),
            created_count: report.created_count,
            errors: report.errors,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub difficulty: i32,
}

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub message: &'static str,
    pub card: CardView,
    /// Time until the card is due again, e.g. "2w"
    pub next_interval: String,
}

/// A file part of a multipart upload
struct UploadedFile {
    file_name: String,
    content_type: Option<String>,
    data: Bytes,
}

async fn read_file(field: Field<'_>) -> ApiResult<UploadedFile> {
    let file_name = field.file_name().unwrap_or_default().to_string();
    let content_type = field.content_type().map(str::to_string);
    let data = field.bytes().await?;
    Ok(UploadedFile {
        file_name,
        content_type,
        data,
    })
}

fn parse_deck_id(raw: Option<String>) -> ApiResult<i64> {
    let raw = raw.ok_or_else(|| ApiError::validation("deck_id is required"))?;
    raw.trim()
        .parse()
        .map_err(|_| ApiError::validation("deck_id must be an integer"))
}

fn required_text(value: Option<String>, field: &str) -> ApiResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::validation(format!("{} is required", field)))
}

fn optional_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[derive(Default)]
struct CardForm {
    deck_id: Option<String>,
    person_name: Option<String>,
    person_role: Option<String>,
    front: Option<String>,
    back: Option<String>,
    image: Option<UploadedFile>,
}

/// Create one card from a photo and explicit name/role fields
pub async fn create_card(
    _auth: Authenticated,
    State(state): State<SharedState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<CardView>> {
    let mut multipart = multipart.map_err(|e| ApiError::validation(e.body_text()))?;

    let mut form = CardForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("deck_id") => form.deck_id = Some(field.text().await?),
            Some("person_name") => form.person_name = Some(field.text().await?),
            Some("person_role") => form.person_role = Some(field.text().await?),
            Some("front") => form.front = Some(field.text().await?),
            Some("back") => form.back = Some(field.text().await?),
            Some("image") | Some("file") => form.image = Some(read_file(field).await?),
            _ => {}
        }
    }

    let deck_id = parse_deck_id(form.deck_id)?;
    let person_name = required_text(form.person_name, "person_name")?;
    let person_role = required_text(form.person_role, "person_role")?;
    let image = form
        .image
        .ok_or_else(|| ApiError::validation("image is required"))?;

    state.storage.get_deck(deck_id)?;
    ensure_image(&image.file_name, image.content_type.as_deref())?;

    let image_filename = state.images.save(&image.file_name, &image.data).await?;
    let new_card = NewFlashcard {
        deck_id,
        person_name,
        person_role,
        image_filename: image_filename.clone(),
        front: optional_text(form.front),
        back: optional_text(form.back),
    };

    match state.storage.create_card(&new_card) {
        Ok(card) => {
            log::info!("Created card {} in deck {}", card.id, deck_id);
            Ok(Json(card.into()))
        }
        Err(e) => {
            state.images.remove_all(&[image_filename]).await;
            Err(e.into())
        }
    }
}

/// Create one card per uploaded photo, naming each from its filename
///
/// Files that fail are reported alongside the created cards; the request
/// only fails when no card could be created.
pub async fn bulk_create(
    _auth: Authenticated,
    State(state): State<SharedState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<BulkUploadResponse>> {
    let mut multipart = multipart.map_err(|e| ApiError::validation(e.body_text()))?;

    let mut deck_id = None;
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("deck_id") => deck_id = Some(field.text().await?),
            Some("images") | Some("files") => files.push(read_file(field).await?),
            _ => {}
        }
    }

    let deck_id = parse_deck_id(deck_id)?;
    if files.is_empty() {
        return Err(ApiError::validation("No files uploaded"));
    }
    state.storage.get_deck(deck_id)?;

    let mut report = BulkUploadReport::default();
    for file in &files {
        match create_from_upload(&state, deck_id, file).await {
            Ok(card) => report.record_card(card),
            Err(message) => {
                log::warn!("Bulk upload into deck {}: {}", deck_id, message);
                report.record_error(message);
            }
        }
    }

    if report.all_failed() {
        return Err(ApiError::validation(report.summary()));
    }

    log::info!(
        "Bulk upload into deck {}: {} created, {} failed",
        deck_id,
        report.created_count,
        report.errors.len()
    );
    Ok(Json(report.into()))
}

async fn create_from_upload(
    state: &AppState,
    deck_id: i64,
    file: &UploadedFile,
) -> Result<Flashcard, String> {
    ensure_image(&file.file_name, file.content_type.as_deref()).map_err(|e| e.to_string())?;
    let parsed = parse_filename(&file.file_name).map_err(|e| e.to_string())?;

    let image_filename = state
        .images
        .save(&file.file_name, &file.data)
        .await
        .map_err(|e| format!("Error processing {}: {}", file.file_name, e))?;

    let new_card = NewFlashcard {
        deck_id,
        person_name: parsed.person_name,
        person_role: parsed.person_role,
        image_filename: image_filename.clone(),
        front: None,
        back: None,
    };

    match state.storage.create_card(&new_card) {
        Ok(card) => Ok(card),
        Err(e) => {
            state.images.remove_all(&[image_filename]).await;
            Err(format!("Error processing {}: {}", file.file_name, e))
        }
    }
}

/// Grade a card and schedule its next review
pub async fn review_card(
    _auth: Authenticated,
    State(state): State<SharedState>,
    Path(card_id): Path<i64>,
    body: Result<Json<ReviewRequest>, JsonRejection>,
) -> ApiResult<Json<ReviewResponse>> {
    let Json(req) = body.map_err(|e| ApiError::validation(e.body_text()))?;
    if !(1..=5).contains(&req.difficulty) {
        return Err(ApiError::validation("difficulty must be between 1 and 5"));
    }

    let card = state.storage.update_review(card_id, req.difficulty, Utc::now())?;
    let interval = card
        .last_reviewed
        .map(|at| (card.next_review - at).num_days())
        .unwrap_or_default();

    log::debug!(
        "Card {} reviewed at difficulty {}, next in {}",
        card_id,
        req.difficulty,
        format_interval(interval)
    );

    Ok(Json(ReviewResponse {
        message: "Card reviewed successfully",
        card: card.into(),
        next_interval: format_interval(interval),
    }))
}

/// Delete a card and its stored photo
pub async fn delete_card(
    _auth: Authenticated,
    State(state): State<SharedState>,
    Path(card_id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    let card = state.storage.delete_card(card_id)?;
    state.images.remove_all(&[card.image_filename]).await;

    log::info!("Deleted card {}", card_id);
    Ok(Json(serde_json::json!({ "message": "Card deleted successfully" })))
}
