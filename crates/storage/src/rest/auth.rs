use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use studyunit_core::model::UserId;

use super::{BearerState, RestBackend, reject};
use crate::repository::{AuthProvider, AuthSession, StorageError};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user: UserPayload,
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    id: String,
    email: Option<String>,
    #[serde(default)]
    user_metadata: UserMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct UserMetadata {
    full_name: Option<String>,
}

impl UserPayload {
    fn into_session(self) -> AuthSession {
        AuthSession {
            user_id: UserId::new(self.id),
            email: self.email,
            display_name: self.user_metadata.full_name,
        }
    }
}

#[async_trait]
impl AuthProvider for RestBackend {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, StorageError> {
        let response = self
            .authorize(self.client.post(self.endpoint("auth/v1/signup")))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(reject(response).await);
        }

        let token: TokenResponse = response.json().await?;
        let session = token.user.into_session();
        self.store_bearer(Some(BearerState {
            access_token: token.access_token,
            session: session.clone(),
        }));
        Ok(session)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, StorageError> {
        let response = self
            .authorize(
                self.client
                    .post(self.endpoint("auth/v1/token?grant_type=password")),
            )
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(reject(response).await);
        }

        let token: TokenResponse = response.json().await?;
        let session = token.user.into_session();
        self.store_bearer(Some(BearerState {
            access_token: token.access_token,
            session: session.clone(),
        }));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), StorageError> {
        // Best effort against the provider; the local bearer is always
        // dropped so the next call cannot reuse it.
        let response = self
            .authorize(self.client.post(self.endpoint("auth/v1/logout")))
            .send()
            .await;
        self.store_bearer(None);
        match response {
            Ok(response) if !response.status().is_success() => Err(reject(response).await),
            Ok(_) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn current_session(&self) -> Option<AuthSession> {
        self.session_snapshot()
    }
}
