//! Opaque bearer tokens issued at login
//!
//! The store is created once at startup and shared with request handlers.
//! Tokens optionally expire after a fixed lifetime; expired entries are
//! dropped when they are next looked at or when a new token is issued.

use std::collections::HashMap;
use std::sync::RwLock;

use axum::http::{header, HeaderMap};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use thiserror::Error;

/// Length of generated tokens
const TOKEN_LENGTH: usize = 48;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session store lock poisoned")]
    LockPoisoned,
}

/// Active sessions keyed by token
pub struct SessionStore {
    /// token -> issued at
    tokens: RwLock<HashMap<String, DateTime<Utc>>>,
    ttl: Option<Duration>,
}

impl SessionStore {
    /// `ttl` of `None` keeps tokens valid until the process exits
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            tokens: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Issue a fresh token
    pub fn issue(&self, now: DateTime<Utc>) -> Result<String, SessionError> {
        let mut tokens = self.tokens.write().map_err(|_| SessionError::LockPoisoned)?;

        let token: String = rand::thread_rng()
            .sample_iter(&rand::distributions::Alphanumeric)
            .take(TOKEN_LENGTH)
            .map(char::from)
            .collect();

        let ttl = self.ttl;
        tokens.retain(|_, issued| !is_expired(*issued, ttl, now));
        tokens.insert(token.clone(), now);
        log::debug!("Issued session token ({} active)", tokens.len());

        Ok(token)
    }

    /// Check that `token` was issued and has not expired
    pub fn validate(&self, token: &str, now: DateTime<Utc>) -> bool {
        let issued = match self.tokens.read() {
            Ok(tokens) => tokens.get(token).copied(),
            Err(_) => return false,
        };

        match issued {
            None => false,
            Some(issued) if is_expired(issued, self.ttl, now) => {
                self.revoke(token);
                log::info!("Rejected expired session token");
                false
            }
            Some(_) => true,
        }
    }

    /// Forget a token; returns whether it was active
    pub fn revoke(&self, token: &str) -> bool {
        match self.tokens.write() {
            Ok(mut tokens) => tokens.remove(token).is_some(),
            Err(_) => false,
        }
    }

    /// Number of tokens currently held
    pub fn len(&self) -> usize {
        self.tokens.read().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn is_expired(issued: DateTime<Utc>, ttl: Option<Duration>, now: DateTime<Utc>) -> bool {
    match ttl {
        Some(ttl) => now - issued >= ttl,
        None => false,
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
