use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use studyunit_core::model::{MaterialId, MaterialKind, StateDocument, StudyMaterial, UserId};

/// Errors surfaced by hosted-backend adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("unauthorized")]
    Unauthorized,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("backend rejected request with status {status}: {message}")]
    Backend { status: u16, message: String },
}

/// Persisted shape for a study material row.
///
/// Mirrors the domain `StudyMaterial` so adapters can serialize without
/// leaking storage concerns into the domain layer. The time-limited signed
/// URL is deliberately absent; it is re-derived on load.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialRecord {
    pub id: MaterialId,
    pub name: String,
    pub kind: MaterialKind,
    pub content: String,
    pub storage_path: Option<String>,
    pub original_transcript: Option<String>,
    pub summary: Option<String>,
    pub priority_topics: Vec<String>,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
}

impl MaterialRecord {
    #[must_use]
    pub fn from_material(material: &StudyMaterial) -> Self {
        Self {
            id: material.id(),
            name: material.name().to_owned(),
            kind: material.kind(),
            content: material.content().to_owned(),
            storage_path: material.storage_path().map(ToOwned::to_owned),
            original_transcript: material.original_transcript().map(ToOwned::to_owned),
            summary: material.summary().map(ToOwned::to_owned),
            priority_topics: material.priority_topics().to_vec(),
            processed: material.processed(),
            created_at: material.created_at(),
        }
    }

    /// Convert the record back into a domain `StudyMaterial`.
    #[must_use]
    pub fn into_material(self) -> StudyMaterial {
        StudyMaterial::from_persisted(
            self.id,
            self.name,
            self.kind,
            self.content,
            self.storage_path,
            self.original_transcript,
            self.summary,
            self.priority_topics,
            self.processed,
            self.created_at,
        )
    }
}

/// A time-limited read URL for a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUrl {
    pub path: String,
    pub url: String,
}

/// An authenticated identity, as issued by the hosted provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub user_id: UserId,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl AuthSession {
    /// Name to address the user by: display name, else the email local
    /// part, else a generic fallback.
    #[must_use]
    pub fn salutation(&self) -> String {
        if let Some(name) = &self.display_name {
            if !name.trim().is_empty() {
                return name.clone();
            }
        }
        if let Some(email) = &self.email {
            if let Some(local) = email.split('@').next() {
                if !local.is_empty() {
                    return local.to_owned();
                }
            }
        }
        "there".to_owned()
    }
}

/// Repository contract for the per-user material rows.
#[async_trait]
pub trait MaterialRepository: Send + Sync {
    /// Persist a new material row; the backend may assign the final id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be stored.
    async fn insert_material(
        &self,
        user: &UserId,
        record: &MaterialRecord,
    ) -> Result<MaterialId, StorageError>;

    /// All rows for a user, ordered by creation time descending.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on transport or decode failure.
    async fn list_materials(&self, user: &UserId) -> Result<Vec<MaterialRecord>, StorageError>;

    /// Delete a row by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the delete is rejected.
    async fn delete_material(&self, user: &UserId, id: MaterialId) -> Result<(), StorageError>;
}

/// Repository contract for the per-user metadata blob.
#[async_trait]
pub trait StateRepository: Send + Sync {
    /// Insert or replace the user's metadata document.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the upsert fails.
    async fn upsert_state(&self, user: &UserId, doc: &StateDocument) -> Result<(), StorageError>;

    /// Fetch the user's metadata document, if any was ever synced.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on transport or decode failure.
    async fn fetch_state(&self, user: &UserId) -> Result<Option<StateDocument>, StorageError>;
}

/// Contract for the object store holding uploaded files.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload raw bytes under a path.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the upload fails.
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError>;

    /// Remove the objects at the given paths.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the removal is rejected.
    async fn remove(&self, paths: &[String]) -> Result<(), StorageError>;

    /// Create time-limited read URLs for the given paths.
    ///
    /// Paths the backend cannot sign are omitted from the result.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on transport or decode failure.
    async fn signed_urls(
        &self,
        paths: &[String],
        ttl_secs: u32,
    ) -> Result<Vec<SignedUrl>, StorageError>;
}

/// Contract for the hosted identity provider.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Register a new account and open a session for it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if registration is rejected.
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, StorageError>;

    /// Open a session with existing credentials.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Unauthorized` on bad credentials.
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, StorageError>;

    /// Close the current session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the provider rejects the request.
    async fn sign_out(&self) -> Result<(), StorageError>;

    /// The currently open session, if any.
    async fn current_session(&self) -> Option<AuthSession>;
}

//
// ─── IN-MEMORY BACKEND ─────────────────────────────────────────────────────────
//

/// In-memory implementation of every backend contract, for tests and
/// prototyping.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    materials: Arc<Mutex<HashMap<UserId, Vec<MaterialRecord>>>>,
    states: Arc<Mutex<HashMap<UserId, StateDocument>>>,
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    accounts: Arc<Mutex<HashMap<String, (String, AuthSession)>>>,
    session: Arc<Mutex<Option<AuthSession>>>,
}

impl InMemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects currently held, for assertions in tests.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.lock().expect("object lock poisoned").len()
    }
}

fn lock_err<T>(err: std::sync::PoisonError<T>) -> StorageError {
    StorageError::Connection(err.to_string())
}

#[async_trait]
impl MaterialRepository for InMemoryBackend {
    async fn insert_material(
        &self,
        user: &UserId,
        record: &MaterialRecord,
    ) -> Result<MaterialId, StorageError> {
        let mut guard = self.materials.lock().map_err(lock_err)?;
        let rows = guard.entry(user.clone()).or_default();
        rows.push(record.clone());
        Ok(record.id)
    }

    async fn list_materials(&self, user: &UserId) -> Result<Vec<MaterialRecord>, StorageError> {
        let guard = self.materials.lock().map_err(lock_err)?;
        let mut rows = guard.get(user).cloned().unwrap_or_default();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn delete_material(&self, user: &UserId, id: MaterialId) -> Result<(), StorageError> {
        let mut guard = self.materials.lock().map_err(lock_err)?;
        let Some(rows) = guard.get_mut(user) else {
            return Err(StorageError::NotFound);
        };
        let before = rows.len();
        rows.retain(|r| r.id != id);
        if rows.len() == before {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl StateRepository for InMemoryBackend {
    async fn upsert_state(&self, user: &UserId, doc: &StateDocument) -> Result<(), StorageError> {
        let mut guard = self.states.lock().map_err(lock_err)?;
        guard.insert(user.clone(), doc.clone());
        Ok(())
    }

    async fn fetch_state(&self, user: &UserId) -> Result<Option<StateDocument>, StorageError> {
        let guard = self.states.lock().map_err(lock_err)?;
        Ok(guard.get(user).cloned())
    }
}

#[async_trait]
impl ObjectStore for InMemoryBackend {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), StorageError> {
        let mut guard = self.objects.lock().map_err(lock_err)?;
        guard.insert(path.to_owned(), bytes);
        Ok(())
    }

    async fn remove(&self, paths: &[String]) -> Result<(), StorageError> {
        let mut guard = self.objects.lock().map_err(lock_err)?;
        for path in paths {
            guard.remove(path);
        }
        Ok(())
    }

    async fn signed_urls(
        &self,
        paths: &[String],
        ttl_secs: u32,
    ) -> Result<Vec<SignedUrl>, StorageError> {
        let guard = self.objects.lock().map_err(lock_err)?;
        Ok(paths
            .iter()
            .filter(|p| guard.contains_key(*p))
            .map(|p| SignedUrl {
                path: p.clone(),
                url: format!("memory://{p}?expires={ttl_secs}"),
            })
            .collect())
    }
}

#[async_trait]
impl AuthProvider for InMemoryBackend {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, StorageError> {
        let mut accounts = self.accounts.lock().map_err(lock_err)?;
        if accounts.contains_key(email) {
            return Err(StorageError::Backend {
                status: 422,
                message: "user already registered".into(),
            });
        }
        let session = AuthSession {
            user_id: UserId::new(format!("user-{}", accounts.len() + 1)),
            email: Some(email.to_owned()),
            display_name: None,
        };
        accounts.insert(email.to_owned(), (password.to_owned(), session.clone()));
        *self.session.lock().map_err(lock_err)? = Some(session.clone());
        Ok(session)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, StorageError> {
        let accounts = self.accounts.lock().map_err(lock_err)?;
        match accounts.get(email) {
            Some((stored, session)) if stored == password => {
                *self.session.lock().map_err(lock_err)? = Some(session.clone());
                Ok(session.clone())
            }
            _ => Err(StorageError::Unauthorized),
        }
    }

    async fn sign_out(&self) -> Result<(), StorageError> {
        *self.session.lock().map_err(lock_err)? = None;
        Ok(())
    }

    async fn current_session(&self) -> Option<AuthSession> {
        self.session.lock().ok().and_then(|guard| guard.clone())
    }
}

//
// ─── STORAGE AGGREGATE ─────────────────────────────────────────────────────────
//

/// Aggregates every backend contract behind trait objects for easy swapping.
#[derive(Clone)]
pub struct Storage {
    pub materials: Arc<dyn MaterialRepository>,
    pub state: Arc<dyn StateRepository>,
    pub objects: Arc<dyn ObjectStore>,
    pub auth: Arc<dyn AuthProvider>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let backend = InMemoryBackend::new();
        Self::from_in_memory(backend)
    }

    /// Wrap an existing in-memory backend (so tests can keep a handle on it).
    #[must_use]
    pub fn from_in_memory(backend: InMemoryBackend) -> Self {
        let materials: Arc<dyn MaterialRepository> = Arc::new(backend.clone());
        let state: Arc<dyn StateRepository> = Arc::new(backend.clone());
        let objects: Arc<dyn ObjectStore> = Arc::new(backend.clone());
        let auth: Arc<dyn AuthProvider> = Arc::new(backend);
        Self {
            materials,
            state,
            objects,
            auth,
        }
    }

    /// Backend speaking the hosted REST API.
    #[must_use]
    pub fn rest(config: crate::rest::RestConfig) -> Self {
        let backend = Arc::new(crate::rest::RestBackend::new(config));
        let materials: Arc<dyn MaterialRepository> = backend.clone();
        let state: Arc<dyn StateRepository> = backend.clone();
        let objects: Arc<dyn ObjectStore> = backend.clone();
        let auth: Arc<dyn AuthProvider> = backend;
        Self {
            materials,
            state,
            objects,
            auth,
        }
    }
}
