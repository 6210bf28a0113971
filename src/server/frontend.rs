//! Status page and single-page frontend fallback

use axum::extract::State;
use axum::http::Method;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;

use super::error::ApiError;
use super::{AppState, SharedState};

const STATUS_MESSAGE: &str = "Flashcard API is running!";

const STATUS_PAGE: &str = r#"<!DOCTYPE html>
<html>
    <head><title>Flashcards</title></head>
    <body>
        <h1>Flashcard API is running!</h1>
        <p>Frontend not found. Set <code>static_dir</code> to serve it from here.</p>
    </body>
</html>
"#;

pub async fn status() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": STATUS_MESSAGE }))
}

pub async fn index(State(state): State<SharedState>) -> Response {
    serve_frontend(&state).await
}

/// Unknown GET paths belong to the frontend router; anything else is a 404
pub async fn fallback(State(state): State<SharedState>, method: Method) -> Response {
    if method == Method::GET || method == Method::HEAD {
        serve_frontend(&state).await
    } else {
        ApiError::NotFound("Not found".to_string()).into_response()
    }
}

async fn serve_frontend(state: &AppState) -> Response {
    if let Some(static_dir) = &state.config.static_dir {
        let index_path = static_dir.join("index.html");
        match tokio::fs::read_to_string(&index_path).await {
            Ok(html) => return Html(html).into_response(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to read {:?}: {}", index_path, e),
        }
    }

    Html(STATUS_PAGE).into_response()
}
