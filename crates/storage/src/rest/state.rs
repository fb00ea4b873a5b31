use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use studyunit_core::model::{StateDocument, UserId};

use super::{RestBackend, reject};
use crate::repository::{StateRepository, StorageError};

const TABLE: &str = "rest/v1/user_state";

#[derive(Debug, Deserialize)]
struct StateRow {
    state_data: StateDocument,
}

#[async_trait]
impl StateRepository for RestBackend {
    async fn upsert_state(&self, user: &UserId, doc: &StateDocument) -> Result<(), StorageError> {
        let url = format!("{}?on_conflict=user_id", self.endpoint(TABLE));
        let body = json!({
            "user_id": user,
            "state_data": doc,
            "updated_at": Utc::now(),
        });
        let response = self
            .authorize(self.client.post(url))
            .header("Prefer", "resolution=merge-duplicates")
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(reject(response).await);
        }
        Ok(())
    }

    async fn fetch_state(&self, user: &UserId) -> Result<Option<StateDocument>, StorageError> {
        let url = format!(
            "{}?user_id=eq.{}&select=state_data",
            self.endpoint(TABLE),
            user
        );
        let response = self.authorize(self.client.get(url)).send().await?;
        if !response.status().is_success() {
            return Err(reject(response).await);
        }

        let mut rows: Vec<StateRow> = response.json().await?;
        Ok(rows.pop().map(|row| row.state_data))
    }
}
