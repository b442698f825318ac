//! Supabase Storage REST client.

use std::time::Duration;

use domain::services::{ArtifactStorage, StorageError};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;

use crate::config::StorageConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Writes artifacts to a Supabase Storage bucket using the service role key.
pub struct SupabaseStorage {
    client: Client,
    base_url: String,
    service_role_key: String,
    bucket: String,
}

#[derive(Debug, Deserialize)]
struct SignResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

impl SupabaseStorage {
    pub fn new(
        supabase_url: &str,
        service_role_key: &str,
        bucket: &str,
    ) -> Result<Self, StorageError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| StorageError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url: format!("{}/storage/v1", supabase_url.trim_end_matches('/')),
            service_role_key: service_role_key.to_string(),
            bucket: bucket.to_string(),
        })
    }

    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        Self::new(
            &config.supabase_url,
            &config.service_role_key,
            &config.bucket,
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.service_role_key)
            .header("apikey", &self.service_role_key)
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/object/{}/{}", self.base_url, self.bucket, path)
    }

    fn sign_url(&self, path: &str) -> String {
        format!("{}/object/sign/{}/{}", self.base_url, self.bucket, path)
    }

    /// The sign endpoint answers with a path relative to `/storage/v1`.
    fn absolute_signed_url(&self, signed: &str) -> String {
        if signed.starts_with("http://") || signed.starts_with("https://") {
            signed.to_string()
        } else {
            format!("{}/{}", self.base_url, signed.trim_start_matches('/'))
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StorageError> {
        self.authorized(request)
            .send()
            .await
            .map_err(|e| StorageError::Request(e.to_string()))
    }
}

async fn status_error(response: Response) -> StorageError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    StorageError::Status { status, message }
}

/// Supabase reports a missing bucket either as 404 or as 400 with a
/// `"statusCode":"404"` body.
fn is_missing_bucket(status: StatusCode, body: &str) -> bool {
    status == StatusCode::NOT_FOUND
        || (status == StatusCode::BAD_REQUEST && body.contains("404"))
        || body.contains("Bucket not found")
}

#[async_trait::async_trait]
impl ArtifactStorage for SupabaseStorage {
    async fn ensure_bucket(&self) -> Result<(), StorageError> {
        let response = self
            .send(
                self.client
                    .get(format!("{}/bucket/{}", self.base_url, self.bucket)),
            )
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        if !is_missing_bucket(status, &body) {
            return Err(StorageError::Status {
                status: status.as_u16(),
                message: body,
            });
        }

        tracing::info!(bucket = %self.bucket, "Creating export bucket");
        let response = self
            .send(
                self.client
                    .post(format!("{}/bucket", self.base_url))
                    .json(&json!({ "id": self.bucket, "name": self.bucket, "public": false })),
            )
            .await?;

        // Another instance may have created it concurrently.
        if response.status().is_success() || response.status() == StatusCode::CONFLICT {
            Ok(())
        } else {
            Err(status_error(response).await)
        }
    }

    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let response = self
            .send(
                self.client
                    .post(self.object_url(path))
                    .header(reqwest::header::CONTENT_TYPE, content_type)
                    .header("x-upsert", "true")
                    .body(bytes),
            )
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(status_error(response).await)
        }
    }

    async fn signed_url(&self, path: &str, ttl_secs: u64) -> Result<String, StorageError> {
        let response = self
            .send(
                self.client
                    .post(self.sign_url(path))
                    .json(&json!({ "expiresIn": ttl_secs })),
            )
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let signed: SignResponse = response
            .json()
            .await
            .map_err(|e| StorageError::Signing(e.to_string()))?;
        Ok(self.absolute_signed_url(&signed.signed_url))
    }
}
