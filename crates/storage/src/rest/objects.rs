use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{RestBackend, reject};
use crate::repository::{ObjectStore, SignedUrl, StorageError};

#[derive(Debug, Deserialize)]
struct SignedUrlRow {
    path: Option<String>,
    #[serde(rename = "signedURL")]
    signed_url: Option<String>,
    error: Option<String>,
}

#[async_trait]
impl ObjectStore for RestBackend {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let url = self.endpoint(&format!("storage/v1/object/{}/{}", self.config.bucket, path));
        let response = self
            .authorize(self.client.post(url))
            .header("Content-Type", content_type)
            .body(bytes)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(reject(response).await);
        }
        Ok(())
    }

    async fn remove(&self, paths: &[String]) -> Result<(), StorageError> {
        let url = self.endpoint(&format!("storage/v1/object/{}", self.config.bucket));
        let response = self
            .authorize(self.client.delete(url))
            .json(&json!({ "prefixes": paths }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(reject(response).await);
        }
        Ok(())
    }

    async fn signed_urls(
        &self,
        paths: &[String],
        ttl_secs: u32,
    ) -> Result<Vec<SignedUrl>, StorageError> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.endpoint(&format!("storage/v1/object/sign/{}", self.config.bucket));
        let response = self
            .authorize(self.client.post(url))
            .json(&json!({ "paths": paths, "expiresIn": ttl_secs }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(reject(response).await);
        }

        let rows: Vec<SignedUrlRow> = response.json().await?;
        let base = self.endpoint("storage/v1");
        Ok(rows
            .into_iter()
            .filter_map(|row| match (row.path, row.signed_url, row.error) {
                (Some(path), Some(relative), None) => Some(SignedUrl {
                    url: format!("{}{}", base, relative),
                    path,
                }),
                (path, _, error) => {
                    tracing::warn!(?path, ?error, "object signing skipped a path");
                    None
                }
            })
            .collect())
    }
}
