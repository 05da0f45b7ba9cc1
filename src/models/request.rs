use crate::error::{MoodShotError, Result};
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::fmt;

pub const DEFAULT_COUNT: usize = 4;
pub const MIN_COUNT: usize = 1;
pub const MAX_COUNT: usize = 8;
pub const DEFAULT_IMAGE_SIZE: &str = "2k";
pub const DEFAULT_MOOD_INTENSITY: u8 = 7;
pub const DEFAULT_PRODUCT_PRESERVATION: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageRole {
    Background,
    Product,
    Composition,
}

impl ImageRole {
    /// Wire order of `image_urls`.
    pub const ALL: [ImageRole; 3] = [
        ImageRole::Background,
        ImageRole::Product,
        ImageRole::Composition,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageRole::Background => "background",
            ImageRole::Product => "product",
            ImageRole::Composition => "composition",
        }
    }
}

impl fmt::Display for ImageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON body accepted by `POST /api/generate`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateBody {
    #[serde(default)]
    pub image_urls: Option<Vec<String>>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub image_size: Option<String>,
    /// Numeric fields accept any JSON number; see [`saturating_int`].
    #[serde(default)]
    pub count: Option<Number>,
    #[serde(default)]
    pub mood_intensity: Option<Number>,
    #[serde(default)]
    pub product_preservation: Option<Number>,
}

impl GenerateBody {
    pub fn into_request(self) -> Result<GenerationRequest> {
        let images = match self.image_urls {
            Some(images) if images.len() == ImageRole::ALL.len() => images,
            Some(images) => {
                return Err(MoodShotError::ValidationError(format!(
                    "exactly 3 images are required (background, product, composition), got {}",
                    images.len()
                )))
            }
            None => {
                return Err(MoodShotError::ValidationError(
                    "image_urls is required".into(),
                ))
            }
        };

        let mut images = images.into_iter().map(ImagePayload::new);
        let references = match (images.next(), images.next(), images.next()) {
            (Some(background), Some(product), Some(composition)) => ReferenceImages {
                background,
                product,
                composition,
            },
            _ => {
                return Err(MoodShotError::ValidationError(
                    "exactly 3 images are required".into(),
                ))
            }
        };

        Ok(GenerationRequest {
            references,
            instruction: self.query.unwrap_or_default().trim().to_string(),
            count: clamp_count(self.count.as_ref().map(saturating_int)),
            image_size: self
                .image_size
                .unwrap_or_else(|| DEFAULT_IMAGE_SIZE.to_string()),
            mood_intensity: clamp_level(
                self.mood_intensity.as_ref().map(saturating_int),
                DEFAULT_MOOD_INTENSITY,
            ),
            product_preservation: clamp_level(
                self.product_preservation.as_ref().map(saturating_int),
                DEFAULT_PRODUCT_PRESERVATION,
            ),
        })
    }
}

/// Integers beyond `i64` saturate, fractions truncate toward zero.
pub fn saturating_int(number: &Number) -> i64 {
    if let Some(value) = number.as_i64() {
        value
    } else if number.as_u64().is_some() {
        i64::MAX
    } else {
        // `as` saturates at the i64 bounds and maps NaN to 0.
        number.as_f64().map_or(0, |value| value as i64)
    }
}

pub fn clamp_count(count: Option<i64>) -> usize {
    count
        .unwrap_or(DEFAULT_COUNT as i64)
        .clamp(MIN_COUNT as i64, MAX_COUNT as i64) as usize
}

fn clamp_level(level: Option<i64>, default: u8) -> u8 {
    level.map_or(default, |value| value.clamp(0, 10) as u8)
}

/// An embedded image as sent by the caller, usually a `data:image/...;base64,` URI.
#[derive(Clone, PartialEq, Eq)]
pub struct ImagePayload(String);

impl ImagePayload {
    pub fn new(data: impl Into<String>) -> Self {
        Self(data.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn decode(&self, role: ImageRole) -> Result<Vec<u8>> {
        let raw = self.0.trim();
        let encoded = match raw.strip_prefix("data:") {
            Some(rest) => match rest.split_once(',') {
                Some((meta, data)) if meta.ends_with(";base64") => data,
                _ => {
                    return Err(MoodShotError::DecodeError {
                        role,
                        cause: "data URI is not base64 encoded".into(),
                    })
                }
            },
            None => raw,
        };

        let bytes = general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| MoodShotError::DecodeError {
                role,
                cause: e.to_string(),
            })?;

        if bytes.is_empty() {
            return Err(MoodShotError::DecodeError {
                role,
                cause: "image payload is empty".into(),
            });
        }
        Ok(bytes)
    }
}

impl fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImagePayload({} bytes)", self.0.len())
    }
}

#[derive(Debug, Clone)]
pub struct ReferenceImages {
    pub background: ImagePayload,
    pub product: ImagePayload,
    pub composition: ImagePayload,
}

/// Validated, immutable request passed through the pipeline.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub references: ReferenceImages,
    pub instruction: String,
    pub count: usize,
    pub image_size: String,
    pub mood_intensity: u8,
    pub product_preservation: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedReference {
    pub role: ImageRole,
    pub url: String,
}

/// Public URLs of the three references, in role order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceUrls {
    pub background: String,
    pub product: String,
    pub composition: String,
}

impl ReferenceUrls {
    pub fn from_uploads(uploads: [UploadedReference; 3]) -> Self {
        let [background, product, composition] = uploads;
        Self {
            background: background.url,
            product: product.url,
            composition: composition.url,
        }
    }
}
