use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use studyunit_core::model::{MaterialId, MaterialKind, UserId};

use super::{RestBackend, reject};
use crate::repository::{MaterialRecord, MaterialRepository, StorageError};

const TABLE: &str = "rest/v1/study_materials";

/// Row shape of the `study_materials` table.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct MaterialRow {
    pub id: MaterialId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: MaterialKind,
    pub content: String,
    pub storage_path: Option<String>,
    pub original_transcript: Option<String>,
    pub summary: Option<String>,
    pub high_priority_topics: Option<Vec<String>>,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
}

impl MaterialRow {
    pub(crate) fn from_record(user: &UserId, record: &MaterialRecord) -> Self {
        Self {
            id: record.id,
            user_id: Some(user.clone()),
            name: record.name.clone(),
            kind: record.kind,
            content: record.content.clone(),
            storage_path: record.storage_path.clone(),
            original_transcript: record.original_transcript.clone(),
            summary: record.summary.clone(),
            high_priority_topics: if record.priority_topics.is_empty() {
                None
            } else {
                Some(record.priority_topics.clone())
            },
            processed: record.processed,
            created_at: record.created_at,
        }
    }

    pub(crate) fn into_record(self) -> MaterialRecord {
        MaterialRecord {
            id: self.id,
            name: self.name,
            kind: self.kind,
            content: self.content,
            storage_path: self.storage_path,
            original_transcript: self.original_transcript,
            summary: self.summary,
            priority_topics: self.high_priority_topics.unwrap_or_default(),
            processed: self.processed,
            created_at: self.created_at,
        }
    }
}

#[async_trait]
impl MaterialRepository for RestBackend {
    async fn insert_material(
        &self,
        user: &UserId,
        record: &MaterialRecord,
    ) -> Result<MaterialId, StorageError> {
        let row = MaterialRow::from_record(user, record);
        let response = self
            .authorize(self.client.post(self.endpoint(TABLE)))
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(reject(response).await);
        }

        let mut rows: Vec<MaterialRow> = response.json().await?;
        let saved = rows.pop().ok_or(StorageError::NotFound)?;
        Ok(saved.id)
    }

    async fn list_materials(&self, user: &UserId) -> Result<Vec<MaterialRecord>, StorageError> {
        let url = format!(
            "{}?user_id=eq.{}&select=*&order=created_at.desc",
            self.endpoint(TABLE),
            user
        );
        let response = self.authorize(self.client.get(url)).send().await?;
        if !response.status().is_success() {
            return Err(reject(response).await);
        }

        let rows: Vec<MaterialRow> = response.json().await?;
        Ok(rows.into_iter().map(MaterialRow::into_record).collect())
    }

    async fn delete_material(&self, user: &UserId, id: MaterialId) -> Result<(), StorageError> {
        let url = format!(
            "{}?id=eq.{}&user_id=eq.{}",
            self.endpoint(TABLE),
            id,
            user
        );
        let response = self.authorize(self.client.delete(url)).send().await?;
        if !response.status().is_success() {
            return Err(reject(response).await);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studyunit_core::time::fixed_now;

    #[test]
    fn row_conversion_roundtrips() {
        let record = MaterialRecord {
            id: MaterialId::generate(),
            name: "Lecture 4".into(),
            kind: MaterialKind::Voice,
            content: "refined notes".into(),
            storage_path: None,
            original_transcript: Some("um so basically".into()),
            summary: Some("summary".into()),
            priority_topics: vec!["Enzymes".into()],
            processed: true,
            created_at: fixed_now(),
        };

        let row = MaterialRow::from_record(&UserId::new("u1"), &record);
        assert_eq!(row.user_id.as_ref().map(UserId::as_str), Some("u1"));
        let back = row.into_record();
        assert_eq!(back, record);
    }

    #[test]
    fn empty_topics_serialize_as_null() {
        let record = MaterialRecord {
            id: MaterialId::generate(),
            name: "n".into(),
            kind: MaterialKind::Text,
            content: "c".into(),
            storage_path: None,
            original_transcript: None,
            summary: None,
            priority_topics: Vec::new(),
            processed: false,
            created_at: fixed_now(),
        };
        let row = MaterialRow::from_record(&UserId::new("u1"), &record);
        let json = serde_json::to_value(&row).unwrap();
        assert!(json["high_priority_topics"].is_null());
        assert_eq!(json["type"], "text");
    }
}
