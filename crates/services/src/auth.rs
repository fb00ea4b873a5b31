//! Account lifecycle and whole-state rehydration on sign-in.

use studyunit_core::Clock;
use studyunit_core::model::{AppState, UserId};
use studyunit_storage::{AuthSession, MaterialRecord, Storage};

use crate::error::AuthError;
use crate::materials::refresh_signed_urls;

pub struct AuthService {
    clock: Clock,
    storage: Storage,
}

impl AuthService {
    #[must_use]
    pub fn new(clock: Clock, storage: Storage) -> Self {
        Self { clock, storage }
    }

    /// Register a new account and open a session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` when the provider rejects the registration.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        Ok(self.storage.auth.sign_up(email, password).await?)
    }

    /// Open a session with existing credentials.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` on a bad email or password.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        Ok(self.storage.auth.sign_in(email, password).await?)
    }

    /// Close the session and hand back pristine local state. The provider
    /// call is best effort; local teardown happens regardless.
    pub async fn sign_out(&self) -> AppState {
        if let Err(err) = self.storage.auth.sign_out().await {
            tracing::warn!(%err, "sign-out rejected by provider");
        }
        AppState::initial(self.clock.now())
    }

    pub async fn current_session(&self) -> Option<AuthSession> {
        self.storage.auth.current_session().await
    }

    /// Rebuild local state from the remote store after sign-in: the material
    /// rows, the metadata document, and fresh signed URLs for image
    /// previews. Selection ids that no longer resolve are pruned.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` when either fetch fails; URL signing failures
    /// only cost the previews.
    pub async fn load_state(&self, user: &UserId) -> Result<AppState, AuthError> {
        let mut state = AppState::initial(self.clock.now());

        let records = self.storage.materials.list_materials(user).await?;
        state.materials = records
            .into_iter()
            .map(MaterialRecord::into_material)
            .collect();

        if let Some(doc) = self.storage.state.fetch_state(user).await? {
            state.apply_document(doc);
        }

        refresh_signed_urls(self.storage.objects.as_ref(), &mut state.materials).await;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studyunit_core::model::{MaterialId, MaterialKind, Tier};
    use studyunit_core::time::{fixed_clock, fixed_now};
    use studyunit_storage::repository::{
        InMemoryBackend, MaterialRepository, ObjectStore, StateRepository,
    };

    fn record(name: &str, kind: MaterialKind, path: Option<&str>) -> MaterialRecord {
        MaterialRecord {
            id: MaterialId::generate(),
            name: name.to_owned(),
            kind,
            content: "content".to_owned(),
            storage_path: path.map(ToOwned::to_owned),
            original_transcript: None,
            summary: None,
            priority_topics: Vec::new(),
            processed: false,
            created_at: fixed_now(),
        }
    }

    #[tokio::test]
    async fn bad_credentials_map_to_invalid_credentials() {
        let svc = AuthService::new(fixed_clock(), Storage::in_memory());
        svc.sign_up("ada@example.test", "pw").await.unwrap();
        let err = svc.sign_in("ada@example.test", "nope").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn load_state_merges_rows_document_and_signed_urls() {
        let backend = InMemoryBackend::new();
        let user = UserId::new("u1");

        let image = record("scan", MaterialKind::Image, Some("u1/materials/x/scan.jpg"));
        let image_id = image.id;
        backend.insert_material(&user, &image).await.unwrap();
        backend
            .upload("u1/materials/x/scan.jpg", vec![1], "image/jpeg")
            .await
            .unwrap();

        let mut snapshot = AppState::initial(fixed_now());
        snapshot.tier = Tier::Premium;
        snapshot.dark_mode = true;
        snapshot.selected_material_ids = vec![image_id, MaterialId::generate()];
        backend
            .upsert_state(&user, &snapshot.document())
            .await
            .unwrap();

        let svc = AuthService::new(fixed_clock(), Storage::from_in_memory(backend));
        let state = svc.load_state(&user).await.unwrap();

        assert_eq!(state.tier, Tier::Premium);
        assert!(state.dark_mode);
        // The stale selection id was pruned; the real one survived.
        assert_eq!(state.selected_material_ids, vec![image_id]);
        assert!(state.materials[0].signed_url().is_some());
    }

    #[tokio::test]
    async fn load_state_without_a_document_keeps_defaults() {
        let backend = InMemoryBackend::new();
        let user = UserId::new("u1");
        backend
            .insert_material(&user, &record("notes", MaterialKind::Text, None))
            .await
            .unwrap();

        let svc = AuthService::new(fixed_clock(), Storage::from_in_memory(backend));
        let state = svc.load_state(&user).await.unwrap();
        assert_eq!(state.materials.len(), 1);
        assert_eq!(state.tier, Tier::Free);
        assert!(state.selected_material_ids.is_empty());
    }
}
