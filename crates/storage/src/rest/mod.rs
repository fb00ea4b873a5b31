//! Adapters for the hosted backend's REST surface: password auth, two
//! per-user tables (`study_materials`, `user_state`), and an object store
//! with time-limited signed URLs.

mod auth;
mod materials;
mod objects;
mod state;

use std::env;
use std::sync::{Arc, Mutex};

use reqwest::{Client, RequestBuilder, Response};

use crate::repository::{AuthSession, StorageError};

/// Connection settings for the hosted backend.
#[derive(Clone, Debug)]
pub struct RestConfig {
    pub base_url: String,
    pub api_key: String,
    pub bucket: String,
}

impl RestConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            bucket: "app-files".into(),
        }
    }

    #[must_use]
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    /// Read connection settings from `STUDYUNIT_BACKEND_URL`,
    /// `STUDYUNIT_BACKEND_KEY`, and optionally `STUDYUNIT_BACKEND_BUCKET`.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("STUDYUNIT_BACKEND_URL").ok()?;
        let api_key = env::var("STUDYUNIT_BACKEND_KEY").ok()?;
        if base_url.trim().is_empty() || api_key.trim().is_empty() {
            return None;
        }
        let bucket =
            env::var("STUDYUNIT_BACKEND_BUCKET").unwrap_or_else(|_| "app-files".into());
        Some(Self {
            base_url,
            api_key,
            bucket,
        })
    }
}

pub(crate) struct BearerState {
    pub access_token: String,
    pub session: AuthSession,
}

/// Shared client for every hosted-backend contract.
///
/// One instance backs all four repository traits; the bearer token captured
/// at sign-in is reused by the table, object, and state adapters.
pub struct RestBackend {
    pub(crate) client: Client,
    pub(crate) config: RestConfig,
    pub(crate) bearer: Mutex<Option<BearerState>>,
}

impl RestBackend {
    #[must_use]
    pub fn new(config: RestConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            bearer: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn shared(config: RestConfig) -> Arc<Self> {
        Arc::new(Self::new(config))
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Snapshot the bearer token without holding the lock across an await.
    pub(crate) fn access_token(&self) -> Option<String> {
        self.bearer
            .lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|b| b.access_token.clone()))
    }

    pub(crate) fn session_snapshot(&self) -> Option<AuthSession> {
        self.bearer
            .lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|b| b.session.clone()))
    }

    pub(crate) fn store_bearer(&self, bearer: Option<BearerState>) {
        if let Ok(mut guard) = self.bearer.lock() {
            *guard = bearer;
        }
    }

    /// Attach the api key plus the strongest available authorization.
    pub(crate) fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self
            .access_token()
            .unwrap_or_else(|| self.config.api_key.clone());
        request
            .header("apikey", &self.config.api_key)
            .bearer_auth(token)
    }
}

/// Map a non-success response to a `StorageError`, reading the body for
/// the backend's message.
pub(crate) async fn reject(response: Response) -> StorageError {
    let status = response.status();
    match status.as_u16() {
        401 | 403 => StorageError::Unauthorized,
        404 => StorageError::NotFound,
        code => {
            let message = response.text().await.unwrap_or_default();
            StorageError::Backend {
                status: code,
                message,
            }
        }
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            StorageError::Serialization(err.to_string())
        } else {
            StorageError::Connection(err.to_string())
        }
    }
}
