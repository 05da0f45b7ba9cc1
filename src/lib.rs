//! Product mood-shot composition: three reference images in, up to eight
//! generated compositions out.

pub mod clients;
pub mod config;
pub mod error;
pub mod ingest;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod pipeline;
pub mod prompt;
#[cfg(feature = "server")]
pub mod server;

pub use clients::{GenerationClient, ImageGenerator, ImageHost, MoodShotClient, UploadClient};
pub use config::{Config, ImgbbConfig, ReplicateConfig};
pub use error::{MoodShotError, Result};
pub use models::*;
pub use orchestrator::generate_batch;
pub use prompt::{build_prompt, BuiltPrompt, Tier};
