use crate::{
    error::{MoodShotError, Result},
    models::ImageRole,
};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;
use serde::Deserialize;

/// Public file host that turns raw image bytes into a fetchable URL.
#[async_trait]
pub trait ImageHost: Send + Sync {
    async fn upload(&self, role: ImageRole, bytes: &[u8]) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct ImgbbResponse {
    #[serde(default)]
    success: bool,
    data: Option<ImgbbImage>,
}

#[derive(Debug, Deserialize)]
struct ImgbbImage {
    url: String,
}

#[derive(Clone)]
pub struct UploadClient {
    client: Client,
    api_base: String,
    api_key: String,
}

impl UploadClient {
    pub fn new(client: Client, api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into(),
            api_key: api_key.into(),
        }
    }

    fn upload_endpoint(&self) -> String {
        format!("{}/upload", self.api_base)
    }
}

#[async_trait]
impl ImageHost for UploadClient {
    async fn upload(&self, role: ImageRole, bytes: &[u8]) -> Result<String> {
        let failed = |cause: String| MoodShotError::UploadFailed { role, cause };
        let encoded = general_purpose::STANDARD.encode(bytes);

        log::debug!("Uploading {} reference ({} bytes)", role, bytes.len());

        let response = self
            .client
            .post(self.upload_endpoint())
            .form(&[
                ("key", self.api_key.as_str()),
                ("image", encoded.as_str()),
                ("name", role.as_str()),
            ])
            .send()
            .await
            .map_err(|e| failed(format!("imgbb request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("imgbb upload failed: {}", status.as_u16())));
        }

        let body: ImgbbResponse = response
            .json()
            .await
            .map_err(|e| failed(format!("imgbb returned invalid JSON: {}", e)))?;

        match body.data {
            Some(image) if body.success && !image.url.trim().is_empty() => {
                log::info!("Uploaded {} reference: {}", role, image.url);
                Ok(image.url)
            }
            _ => Err(failed("imgbb API returned error".into())),
        }
    }
}
