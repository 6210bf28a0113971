//! HTTP interface for decks, cards and study sessions
//!
//! All deck and card routes require an `Authorization: Bearer <token>`
//! header obtained from `POST /login`. Stored photos are served under
//! `/uploads`, and unknown GET paths fall back to the frontend.

pub mod auth;
pub mod cards;
pub mod decks;
pub mod error;
pub mod frontend;

#[cfg(test)]
mod tests;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{delete, get, post};
use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};

use crate::auth::{CredentialVerifier, SessionStore, StaticCredentials};
use crate::config::ServerConfig;
use crate::flashcards::{FlashcardStorage, FlashcardStorageError};
use crate::uploads::{ImageStore, UploadError};

pub use error::{ApiError, ApiResult};

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Failed to open flashcard database: {0}")]
    Storage(#[from] FlashcardStorageError),

    #[error("Failed to prepare uploads directory: {0}")]
    Uploads(#[from] UploadError),
}

/// State shared across requests
pub struct AppState {
    pub storage: FlashcardStorage,
    pub images: ImageStore,
    /// Tokens issued by `/login`
    pub sessions: SessionStore,
    pub credentials: Box<dyn CredentialVerifier>,
    pub config: ServerConfig,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Open storage under the configured data directory
    pub fn open(config: ServerConfig) -> Result<Self, StartupError> {
        let storage = FlashcardStorage::open(&config.db_path())?;
        let images = ImageStore::new(config.uploads_dir());
        images.init()?;

        let credentials = StaticCredentials::new(config.username.clone(), config.password.clone());

        Ok(Self {
            storage,
            images,
            sessions: SessionStore::new(config.session_ttl()),
            credentials: Box::new(credentials),
            config,
        })
    }
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    if config.allows_any_origin() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// The configured frontend directory, if it holds an `index.html`
fn frontend_dir(config: &ServerConfig) -> Option<PathBuf> {
    let static_dir = config.static_dir.as_ref()?;
    if static_dir.join("index.html").is_file() {
        Some(static_dir.clone())
    } else {
        log::warn!("No index.html in {:?}; serving the status page", static_dir);
        None
    }
}

/// Build the application router
pub fn router(state: SharedState) -> Router {
    let mut app = Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/status", get(frontend::status))
        .route("/decks", get(decks::list_decks).post(decks::create_deck))
        .route("/decks/{id}", delete(decks::delete_deck))
        .route("/decks/{id}/cards", get(decks::list_cards))
        .route("/decks/{id}/study", get(decks::study))
        .route("/cards", post(cards::create_card))
        .route("/cards/bulk", post(cards::bulk_create))
        .route("/bulk-upload", post(cards::bulk_create))
        .route("/cards/{id}", delete(cards::delete_card))
        .route("/cards/{id}/review", post(cards::review_card))
        .route("/", get(frontend::index))
        .nest_service("/uploads", ServeDir::new(state.images.root()));

    app = match frontend_dir(&state.config) {
        // Built assets by path; client-side routes get index.html
        Some(static_dir) => app.fallback_service(
            ServeDir::new(&static_dir).fallback(ServeFile::new(static_dir.join("index.html"))),
        ),
        None => app.fallback(frontend::fallback),
    };

    app.layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(cors_layer(&state.config))
        .with_state(state)
}

/// Serve until `shutdown` resolves
pub async fn serve(
    state: SharedState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(&state.config.bind_address).await?;
    let addr = listener.local_addr()?;

    log::info!("Flashcard server started on http://{}", addr);
    log::info!("Storing data in {:?}", state.config.data_dir);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            shutdown.await;
            log::info!("Flashcard server shutting down");
        })
        .await
}
