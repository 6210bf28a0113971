//! Login, logout and the bearer-token extractor

use axum::extract::rejection::FormRejection;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::{Form, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::bearer_token;

use super::error::{ApiError, ApiResult};
use super::SharedState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

/// Proof that the request carried a live bearer token
pub struct Authenticated {
    pub token: String,
}

impl FromRequestParts<SharedState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;

        if !state.sessions.validate(token, Utc::now()) {
            return Err(ApiError::unauthorized("Could not validate credentials"));
        }

        Ok(Self {
            token: token.to_string(),
        })
    }
}

/// Exchange the account credentials for a bearer token
pub async fn login(
    State(state): State<SharedState>,
    form: Result<Form<LoginRequest>, FormRejection>,
) -> ApiResult<Json<TokenResponse>> {
    let Form(req) = form.map_err(|e| ApiError::validation(e.body_text()))?;

    if !state.credentials.verify(&req.username, &req.password) {
        log::info!("Rejected login for user {:?}", req.username);
        return Err(ApiError::unauthorized("Incorrect username or password"));
    }

    let access_token = state.sessions.issue(Utc::now())?;
    log::info!("User {:?} logged in", req.username);

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
    }))
}

/// Revoke the token used for this request
pub async fn logout(
    auth: Authenticated,
    State(state): State<SharedState>,
) -> Json<serde_json::Value> {
    state.sessions.revoke(&auth.token);
    Json(serde_json::json!({ "message": "Logged out" }))
}
