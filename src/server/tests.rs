use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use super::*;

const BOUNDARY: &str = "facedeck-test-boundary";

struct TestApp {
    app: Router,
    state: SharedState,
    _dir: TempDir,
}

impl TestApp {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            data_dir: dir.path().to_path_buf(),
            ..ServerConfig::default()
        };
        let state = Arc::new(AppState::open(config).unwrap());
        Self {
            app: router(Arc::clone(&state)),
            state,
            _dir: dir,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn login(&self) -> String {
        let (status, body) = self.send(login_request("dave", "india")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token_type"], "bearer");
        body["access_token"].as_str().unwrap().to_string()
    }

    async fn create_deck(&self, token: &str, name: &str) -> i64 {
        let request = authed(token, "POST", "/decks")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::json!({ "name": name }).to_string()))
            .unwrap();
        let (status, body) = self.send(request).await;
        assert_eq!(status, StatusCode::OK);
        body["id"].as_i64().unwrap()
    }

    async fn get(&self, token: &str, uri: &str) -> (StatusCode, Value) {
        self.send(authed(token, "GET", uri).body(Body::empty()).unwrap())
            .await
    }

    async fn review(&self, token: &str, card_id: i64, difficulty: i32) -> (StatusCode, Value) {
        let request = authed(token, "POST", &format!("/cards/{}/review", card_id))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                serde_json::json!({ "difficulty": difficulty }).to_string(),
            ))
            .unwrap();
        self.send(request).await
    }

    async fn bulk_upload(&self, token: &str, deck_id: i64, files: &[FilePart<'_>]) -> (StatusCode, Value) {
        let deck_id = deck_id.to_string();
        let body = multipart_body(&[("deck_id", deck_id.as_str())], "images", files);
        self.send(multipart_request(token, "/cards/bulk", body)).await
    }
}

struct FilePart<'a> {
    filename: &'a str,
    content_type: &'a str,
    data: &'a [u8],
}

fn image(filename: &str) -> FilePart<'_> {
    FilePart {
        filename,
        content_type: "image/jpeg",
        data: b"\xFF\xD8\xFF\xE0fake-jpeg",
    }
}

fn login_request(username: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("username={}&password={}", username, password)))
        .unwrap()
}

fn authed(token: &str, method: &str, uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
}

fn multipart_body(fields: &[(&str, &str)], file_field: &str, files: &[FilePart<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    for file in files {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, file_field, file.filename, file.content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(file.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn multipart_request(token: &str, uri: &str, body: Vec<u8>) -> Request<Body> {
    authed(token, "POST", uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_login_rejects_wrong_password() {
    let app = TestApp::new();

    let response = app
        .app
        .clone()
        .oneshot(login_request("dave", "wrong"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
        "Bearer"
    );
    assert!(app.state.sessions.is_empty());
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = TestApp::new();

    let (status, body) = app
        .send(Request::get("/decks").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["detail"].is_string());

    let (status, _) = app.get("made-up-token", "/decks").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = app.login().await;
    let (status, body) = app.get(&token, "/decks").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!([]));
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let app = TestApp::new();
    let token = app.login().await;

    let (status, _) = app
        .send(authed(&token, "POST", "/logout").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get(&token, "/decks").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_deck_requires_name() {
    let app = TestApp::new();
    let token = app.login().await;

    let request = authed(&token, "POST", "/decks")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"description": "no name"}"#))
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Deck name is required");
}

#[tokio::test]
async fn test_bulk_upload_reports_partial_success() {
    let app = TestApp::new();
    let token = app.login().await;
    let deck_id = app.create_deck(&token, "Engineering").await;

    let files = [
        image("John Doe - Software Engineer.jpg"),
        image("Jane_Smith_Marketing_Manager.png"),
        image("Bob_Wilson_Sales.jpg"),
        FilePart {
            filename: "notes.txt",
            content_type: "text/plain",
            data: b"not a photo",
        },
    ];
    let (status, body) = app.bulk_upload(&token, deck_id, &files).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["created_count"], 3);
    assert_eq!(body["created"].as_array().unwrap().len(), 3);
    assert_eq!(body["errors"], serde_json::json!(["File notes.txt is not an image"]));

    let (_, cards) = app.get(&token, &format!("/decks/{}/cards", deck_id)).await;
    let people: Vec<(String, String)> = cards
        .as_array()
        .unwrap()
        .iter()
        .map(|c| {
            (
                c["person_name"].as_str().unwrap().to_string(),
                c["person_role"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    assert_eq!(
        people,
        vec![
            ("John Doe".to_string(), "Software Engineer".to_string()),
            ("Jane Smith".to_string(), "Marketing Manager".to_string()),
            ("Bob Wilson".to_string(), "Sales".to_string()),
        ]
    );

    let (_, decks) = app.get(&token, "/decks").await;
    assert_eq!(decks[0]["card_count"], 3);
}

#[tokio::test]
async fn test_bulk_upload_fails_when_every_file_fails() {
    let app = TestApp::new();
    let token = app.login().await;
    let deck_id = app.create_deck(&token, "Engineering").await;

    let files = [
        image(".jpg"),
        FilePart {
            filename: "notes.txt",
            content_type: "text/plain",
            data: b"not a photo",
        },
    ];
    let (status, body) = app.bulk_upload(&token, deck_id, &files).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.starts_with("Created 0 cards successfully. Errors:"));
    assert!(detail.contains("Could not parse name from filename: .jpg"));
    assert!(detail.contains("File notes.txt is not an image"));
}

#[tokio::test]
async fn test_bulk_upload_to_missing_deck() {
    let app = TestApp::new();
    let token = app.login().await;

    let (status, body) = app.bulk_upload(&token, 99, &[image("Ada.png")]).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Deck not found");
}

#[tokio::test]
async fn test_create_single_card() {
    let app = TestApp::new();
    let token = app.login().await;
    let deck_id = app.create_deck(&token, "Board").await;
    let deck_field = deck_id.to_string();

    let body = multipart_body(
        &[
            ("deck_id", deck_field.as_str()),
            ("person_name", "Ada Lovelace"),
            ("person_role", "Analyst"),
            ("back", "Wrote the first program"),
        ],
        "image",
        &[image("whatever.PNG")],
    );
    let (status, card) = app.send(multipart_request(&token, "/cards", body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(card["person_name"], "Ada Lovelace");
    assert_eq!(card["person_role"], "Analyst");
    assert_eq!(card["back"], "Wrote the first program");
    assert!(card["front"].is_null());
    assert_eq!(card["difficulty"], 3);
    assert_eq!(card["review_count"], 0);

    let stored = card["image_filename"].as_str().unwrap();
    assert!(stored.ends_with(".png"));
    assert_ne!(stored, "whatever.PNG");
    assert_eq!(card["image_url"], format!("/uploads/{}", stored));

    // The stored photo is served back
    let response = app
        .app
        .clone()
        .oneshot(Request::get(format!("/uploads/{}", stored)).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"\xFF\xD8\xFF\xE0fake-jpeg");
}

#[tokio::test]
async fn test_create_card_rejects_non_image_and_missing_deck() {
    let app = TestApp::new();
    let token = app.login().await;
    let deck_id = app.create_deck(&token, "Board").await;
    let deck_field = deck_id.to_string();

    let text_file = FilePart {
        filename: "cv.pdf",
        content_type: "application/pdf",
        data: b"%PDF",
    };
    let body = multipart_body(
        &[
            ("deck_id", deck_field.as_str()),
            ("person_name", "Ada"),
            ("person_role", "Analyst"),
        ],
        "image",
        &[text_file],
    );
    let (status, _) = app.send(multipart_request(&token, "/cards", body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let body = multipart_body(
        &[("deck_id", "4242"), ("person_name", "Ada"), ("person_role", "Analyst")],
        "image",
        &[image("ada.png")],
    );
    let (status, _) = app.send(multipart_request(&token, "/cards", body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let body = multipart_body(
        &[("deck_id", deck_field.as_str()), ("person_role", "Analyst")],
        "image",
        &[image("ada.png")],
    );
    let (status, body) = app.send(multipart_request(&token, "/cards", body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "person_name is required");

    let (_, cards) = app.get(&token, &format!("/decks/{}/cards", deck_id)).await;
    assert_eq!(cards, serde_json::json!([]));
}

#[tokio::test]
async fn test_study_then_review_hides_card() {
    let app = TestApp::new();
    let token = app.login().await;
    let deck_id = app.create_deck(&token, "Engineering").await;
    app.bulk_upload(&token, deck_id, &[image("Grace Hopper - Admiral.jpg")])
        .await;

    let study_uri = format!("/decks/{}/study", deck_id);
    let (status, due) = app.get(&token, &study_uri).await;
    assert_eq!(status, StatusCode::OK);
    let due = due.as_array().unwrap();
    assert_eq!(due.len(), 1);
    let card_id = due[0]["id"].as_i64().unwrap();

    let (status, body) = app.review(&token, card_id, 5).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["card"]["difficulty"], 5);
    assert_eq!(body["card"]["review_count"], 1);
    assert_eq!(body["next_interval"], "2w");

    let (_, due) = app.get(&token, &study_uri).await;
    assert_eq!(due, serde_json::json!([]));

    let storage = &app.state.storage;
    let now = Utc::now();
    assert!(storage
        .due_cards(deck_id, now + Duration::days(13), 10)
        .unwrap()
        .is_empty());
    assert_eq!(
        storage
            .due_cards(deck_id, now + Duration::days(14), 10)
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_study_limit() {
    let app = TestApp::new();
    let token = app.login().await;
    let deck_id = app.create_deck(&token, "Engineering").await;
    let files = [image("Ada.png"), image("Grace.png"), image("Linus.png")];
    app.bulk_upload(&token, deck_id, &files).await;

    let (_, due) = app
        .get(&token, &format!("/decks/{}/study?limit=2", deck_id))
        .await;
    assert_eq!(due.as_array().unwrap().len(), 2);

    let (status, _) = app
        .get(&token, &format!("/decks/{}/study?limit=0", deck_id))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_review_validation() {
    let app = TestApp::new();
    let token = app.login().await;

    let (status, body) = app.review(&token, 12345, 3).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Card not found");

    let deck_id = app.create_deck(&token, "Engineering").await;
    let (_, report) = app.bulk_upload(&token, deck_id, &[image("Ada.png")]).await;
    let card_id = report["created"][0]["id"].as_i64().unwrap();

    let (status, _) = app.review(&token, card_id, 6).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.review(&token, card_id, 0).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_deck_removes_cards_and_photos() {
    let app = TestApp::new();
    let token = app.login().await;
    let deck_id = app.create_deck(&token, "Engineering").await;
    let (_, report) = app
        .bulk_upload(&token, deck_id, &[image("Ada.png"), image("Grace.png")])
        .await;
    let stored: Vec<String> = report["created"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["image_filename"].as_str().unwrap().to_string())
        .collect();
    for name in &stored {
        assert!(app.state.images.path_for(name).unwrap().exists());
    }

    let (status, _) = app
        .send(
            authed(&token, "DELETE", &format!("/decks/{}", deck_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    assert!(app.state.storage.list_cards(deck_id).unwrap().is_empty());
    for name in &stored {
        assert!(!app.state.images.path_for(name).unwrap().exists());
    }

    let (status, _) = app
        .send(
            authed(&token, "DELETE", &format!("/decks/{}", deck_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_card() {
    let app = TestApp::new();
    let token = app.login().await;
    let deck_id = app.create_deck(&token, "Engineering").await;
    let (_, report) = app.bulk_upload(&token, deck_id, &[image("Ada.png")]).await;
    let card_id = report["created"][0]["id"].as_i64().unwrap();

    let delete = || {
        authed(&token, "DELETE", &format!("/cards/{}", card_id))
            .body(Body::empty())
            .unwrap()
    };
    let (status, _) = app.send(delete()).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.send(delete()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, decks) = app.get(&token, "/decks").await;
    assert_eq!(decks[0]["card_count"], 0);
}

#[tokio::test]
async fn test_status_and_frontend_fallback() {
    let app = TestApp::new();

    let (status, body) = app
        .send(Request::get("/status").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Flashcard API is running!");

    for uri in ["/", "/study/deck/3"] {
        let response = app
            .app
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("Flashcard API is running!"));
    }
}

async fn body_bytes(app: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

#[tokio::test]
async fn test_frontend_served_from_static_dir() {
    let dir = tempfile::tempdir().unwrap();
    let static_dir = dir.path().join("static");
    std::fs::create_dir_all(static_dir.join("assets")).unwrap();
    std::fs::write(
        static_dir.join("index.html"),
        r#"<html><script src="/assets/app.js"></script></html>"#,
    )
    .unwrap();
    std::fs::write(static_dir.join("assets").join("app.js"), "console.log(1)").unwrap();

    let config = ServerConfig {
        data_dir: dir.path().join("data"),
        static_dir: Some(static_dir),
        ..ServerConfig::default()
    };
    let app = router(Arc::new(AppState::open(config).unwrap()));
    let index = br#"<html><script src="/assets/app.js"></script></html>"#.to_vec();

    let (status, body) = body_bytes(&app, "/assets/app.js").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"console.log(1)");

    // Client-side routes get the index
    for uri in ["/", "/study/42"] {
        let (status, body) = body_bytes(&app, uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, index);
    }

    // API routes still win over the frontend
    let (status, _) = body_bytes(&app, "/status").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = body_bytes(&app, "/decks").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_static_dir_without_index_serves_status_page() {
    let dir = tempfile::tempdir().unwrap();
    let static_dir = dir.path().join("static");
    std::fs::create_dir_all(&static_dir).unwrap();

    let config = ServerConfig {
        data_dir: dir.path().join("data"),
        static_dir: Some(static_dir),
        ..ServerConfig::default()
    };
    let app = router(Arc::new(AppState::open(config).unwrap()));

    let (status, body) = body_bytes(&app, "/study/42").await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8_lossy(&body).contains("Flashcard API is running!"));
}

#[tokio::test]
async fn test_bulk_upload_alias_accepts_files_field() {
    let app = TestApp::new();
    let token = app.login().await;
    let deck_id = app.create_deck(&token, "Sales").await;
    let deck_field = deck_id.to_string();

    let body = multipart_body(
        &[("deck_id", deck_field.as_str())],
        "files",
        &[image("Ada Lovelace - Analyst.png"), image("Grace_Hopper_Admiral.jpg")],
    );
    let (status, report) = app
        .send(multipart_request(&token, "/bulk-upload", body))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["created_count"], 2);
    assert_eq!(report["errors"], serde_json::json!([]));

    let cards = app.state.storage.list_cards(deck_id).unwrap();
    let names: Vec<&str> = cards.iter().map(|c| c.person_name.as_str()).collect();
    assert_eq!(names, vec!["Ada Lovelace", "Grace Hopper"]);
    assert_eq!(cards[1].person_role, "Admiral");
}
