use crate::models::ImageRole;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MoodShotError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Decode error ({role}): {cause}")]
    DecodeError { role: ImageRole, cause: String },
    #[error("Upload failed ({role}): {cause}")]
    UploadFailed { role: ImageRole, cause: String },
    #[error("Generation error: {0}")]
    GenerationError(String),
    #[error("All {requested} generation attempts failed")]
    TotalGenerationFailure { requested: usize },
    #[error("Request error: {0}")]
    RequestError(String),
    #[error("Response error: {0}")]
    ResponseError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl MoodShotError {
    /// Short machine-readable code placed in the failure envelope.
    pub fn code(&self) -> &'static str {
        match self {
            MoodShotError::ConfigError(_) => "configuration_error",
            MoodShotError::ValidationError(_) => "invalid_request",
            MoodShotError::DecodeError { .. } => "invalid_image",
            MoodShotError::UploadFailed { .. } => "upload_failed",
            MoodShotError::GenerationError(_) | MoodShotError::TotalGenerationFailure { .. } => {
                "generation_failed"
            }
            MoodShotError::RequestError(_)
            | MoodShotError::ResponseError(_)
            | MoodShotError::SerializationError(_) => "internal_error",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            MoodShotError::ValidationError(_) | MoodShotError::DecodeError { .. } => 400,
            _ => 500,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}

impl From<serde_json::Error> for MoodShotError {
    fn from(err: serde_json::Error) -> Self {
        MoodShotError::SerializationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MoodShotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            MoodShotError::ValidationError("bad".into()).status_code(),
            400
        );
        assert_eq!(MoodShotError::ConfigError("missing".into()).status_code(), 500);
        assert_eq!(
            MoodShotError::UploadFailed {
                role: ImageRole::Product,
                cause: "503".into()
            }
            .status_code(),
            500
        );
        assert_eq!(
            MoodShotError::TotalGenerationFailure { requested: 4 }.status_code(),
            500
        );
    }

    #[test]
    fn test_error_display() {
        let err = MoodShotError::UploadFailed {
            role: ImageRole::Background,
            cause: "imgbb upload failed: 400".into(),
        };
        assert_eq!(
            err.to_string(),
            "Upload failed (background): imgbb upload failed: 400"
        );
        assert_eq!(err.code(), "upload_failed");
    }
}
