use std::sync::{Mutex, PoisonError};

use reqwest::blocking::Client;

use super::{ApiError, ApiResult, TokenResponse};

/// Bearer token shared by every request of a session.
///
/// Fetched lazily on first use and cached; `invalidate` forces the next call to fetch again.
/// The lock is held across the fetch so concurrent callers wait for one token instead of
/// each fetching their own.
#[derive(Debug)]
pub struct AuthSession {
    token_url: String,
    token: Mutex<Option<String>>,
}

impl AuthSession {
    pub fn new(token_url: impl Into<String>) -> Self {
        Self {
            token_url: token_url.into(),
            token: Mutex::new(None),
        }
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    pub fn cached(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn token(&self, client: &Client) -> ApiResult<String> {
        let mut slot = self.token.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = slot.as_ref() {
            return Ok(token.clone());
        }

        tracing::debug!(url = %self.token_url, "fetching session token");
        let response = client
            .get(&self.token_url)
            .send()
            .map_err(|source| ApiError::Transport {
                endpoint: self.token_url.clone(),
                source,
            })?;
        if !response.status().is_success() {
            return Err(ApiError::Status {
                endpoint: self.token_url.clone(),
                status: response.status().as_u16(),
            });
        }
        let body = response.bytes().map_err(|source| ApiError::Transport {
            endpoint: self.token_url.clone(),
            source,
        })?;
        let parsed: TokenResponse =
            serde_json::from_slice(&body).map_err(|err| ApiError::Malformed {
                endpoint: self.token_url.clone(),
                reason: err.to_string(),
            })?;
        let token = parsed
            .token
            .filter(|token| !token.is_empty())
            .ok_or(ApiError::MissingToken)?;

        *slot = Some(token.clone());
        Ok(token)
    }

    /// Drops the cached token if it is still the one the backend rejected. A token another
    /// request has already refreshed is kept.
    pub fn invalidate(&self, rejected: &str) {
        let mut slot = self.token.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_deref() == Some(rejected) {
            *slot = None;
            tracing::info!("session token invalidated");
        } else {
            tracing::debug!("rejected token already replaced");
        }
    }

    #[cfg(test)]
    pub(crate) fn with_token(token_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            token_url: token_url.into(),
            token: Mutex::new(Some(token.into())),
        }
    }
}
