pub mod generation_client;
pub mod normalize;
pub mod upload_client;

use crate::{config::Config, error::Result};
use reqwest::Client;
use std::sync::Arc;

pub use generation_client::{GenerationClient, ImageGenerator};
pub use upload_client::{ImageHost, UploadClient};

/// The external collaborators one request needs, built from the current
/// configuration and a shared HTTP client.
#[derive(Clone)]
pub struct MoodShotClient {
    upload_client: Arc<dyn ImageHost>,
    generation_client: Arc<dyn ImageGenerator>,
}

impl MoodShotClient {
    pub fn from_config(config: &Config, http: Client) -> Result<Self> {
        let credentials = config.credentials()?;

        let generation = GenerationClient::new(
            http.clone(),
            config.replicate.api_base.clone(),
            credentials.generation,
        )
        .with_polling(config.replicate.poll_interval, config.replicate.poll_timeout);

        Ok(Self {
            upload_client: Arc::new(UploadClient::new(
                http,
                config.imgbb.api_base.clone(),
                credentials.upload,
            )),
            generation_client: Arc::new(generation),
        })
    }

    pub fn from_parts(
        upload_client: Arc<dyn ImageHost>,
        generation_client: Arc<dyn ImageGenerator>,
    ) -> Self {
        Self {
            upload_client,
            generation_client,
        }
    }

    pub fn upload(&self) -> &dyn ImageHost {
        self.upload_client.as_ref()
    }

    pub fn generation(&self) -> &dyn ImageGenerator {
        self.generation_client.as_ref()
    }
}
