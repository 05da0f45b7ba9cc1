use super::GenerationResult;
use crate::error::MoodShotError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessEnvelope {
    pub success: bool,
    pub images: Vec<String>,
    pub count: usize,
    pub model: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureEnvelope {
    pub success: bool,
    pub error: String,
    pub message: String,
}

/// Caller-facing body: either `success: true` with at least one image, or `success: false`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseEnvelope {
    Success(SuccessEnvelope),
    Failure(FailureEnvelope),
}

impl ResponseEnvelope {
    pub fn success(result: GenerationResult, model_label: &str) -> Self {
        let count = result.count();
        let message = if result.is_short() {
            format!(
                "Generated {} of {} requested images",
                count, result.requested
            )
        } else {
            format!("Generated {} images", count)
        };

        ResponseEnvelope::Success(SuccessEnvelope {
            success: true,
            images: result.images,
            count,
            model: model_label.to_string(),
            message,
        })
    }

    pub fn failure(err: &MoodShotError) -> Self {
        let message = match err {
            MoodShotError::TotalGenerationFailure { .. } => "Image generation failed".to_string(),
            other => other.to_string(),
        };
        ResponseEnvelope::Failure(FailureEnvelope {
            success: false,
            error: err.code().to_string(),
            message,
        })
    }

    pub fn method_not_allowed() -> Self {
        ResponseEnvelope::Failure(FailureEnvelope {
            success: false,
            error: "method_not_allowed".to_string(),
            message: "Only POST is supported".to_string(),
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ResponseEnvelope::Success(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImageRole;

    fn result(images: &[&str], requested: usize) -> GenerationResult {
        GenerationResult {
            images: images.iter().map(|s| s.to_string()).collect(),
            requested,
            rounds: 1,
            attempts: Vec::new(),
        }
    }

    #[test]
    fn test_success_passes_urls_through_in_order() {
        let envelope = ResponseEnvelope::success(result(&["http://x/b", "http://x/a"], 2), "Flux Dev");
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["images"][0], "http://x/b");
        assert_eq!(json["images"][1], "http://x/a");
        assert_eq!(json["count"], 2);
        assert_eq!(json["model"], "Flux Dev");
    }

    #[test]
    fn test_short_batch_reports_true_count() {
        let envelope = ResponseEnvelope::success(result(&["http://x/a"], 4), "Flux Dev");
        match envelope {
            ResponseEnvelope::Success(body) => {
                assert_eq!(body.count, 1);
                assert_eq!(body.message, "Generated 1 of 4 requested images");
            }
            ResponseEnvelope::Failure(_) => panic!("expected success"),
        }
    }

    #[test]
    fn test_failure_envelope() {
        let envelope = ResponseEnvelope::failure(&MoodShotError::TotalGenerationFailure { requested: 4 });
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "generation_failed");
        assert_eq!(json["message"], "Image generation failed");
        assert!(json.get("images").is_none());

        let upload = ResponseEnvelope::failure(&MoodShotError::UploadFailed {
            role: ImageRole::Product,
            cause: "imgbb upload failed: 500".into(),
        });
        assert!(!upload.is_success());
    }
}
