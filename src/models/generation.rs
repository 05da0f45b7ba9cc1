use super::ReferenceUrls;
use serde::Serialize;

/// A hosted model that can synthesize the final composition, with the fixed
/// strength/guidance configuration sent on every call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelPreset {
    pub name: &'static str,
    pub model: &'static str,
    pub label: &'static str,
    /// Input key that receives the composition reference URL.
    pub reference_key: &'static str,
    pub prompt_strength: Option<f64>,
    pub num_inference_steps: u32,
    pub guidance_scale: Option<f64>,
    pub output_format: &'static str,
    pub output_quality: Option<u32>,
    pub aspect_ratio: Option<&'static str>,
    pub supports_negative_prompt: bool,
    pub price_per_image: f64,
}

pub const DEFAULT_PRESET: &str = "flux-dev";

static PRESETS: [ModelPreset; 3] = [
    ModelPreset {
        name: "flux-dev",
        model: "black-forest-labs/flux-dev",
        label: "Flux Dev",
        reference_key: "image",
        prompt_strength: Some(0.80),
        num_inference_steps: 28,
        guidance_scale: Some(3.5),
        output_format: "png",
        output_quality: Some(100),
        aspect_ratio: Some("1:1"),
        supports_negative_prompt: true,
        price_per_image: 0.10,
    },
    ModelPreset {
        name: "flux-schnell",
        model: "black-forest-labs/flux-schnell",
        label: "Flux Schnell",
        reference_key: "image",
        prompt_strength: Some(0.80),
        num_inference_steps: 4,
        guidance_scale: None,
        output_format: "png",
        output_quality: Some(100),
        aspect_ratio: Some("1:1"),
        supports_negative_prompt: false,
        price_per_image: 0.003,
    },
    ModelPreset {
        name: "sdxl",
        model: "stability-ai/sdxl",
        label: "Stable Diffusion XL",
        reference_key: "image",
        prompt_strength: Some(0.75),
        num_inference_steps: 40,
        guidance_scale: Some(7.5),
        output_format: "png",
        output_quality: None,
        aspect_ratio: None,
        supports_negative_prompt: true,
        price_per_image: 0.01,
    },
];

impl ModelPreset {
    pub fn find(name: &str) -> Option<&'static ModelPreset> {
        let name = name.trim();
        PRESETS
            .iter()
            .find(|preset| preset.name.eq_ignore_ascii_case(name) || preset.model == name)
    }

    pub fn default_preset() -> &'static ModelPreset {
        &PRESETS[0]
    }

    pub fn estimated_cost(&self, images: usize) -> f64 {
        self.price_per_image * images as f64
    }
}

/// Everything a single generation call needs apart from its seed.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub prompt: String,
    pub negative_prompt: String,
    pub references: ReferenceUrls,
    pub preset: &'static ModelPreset,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationAttempt {
    pub seed: u32,
    pub round: u8,
    pub url: Option<String>,
}

/// Settled output of one batch: successful URLs in completion order plus
/// the attempts that produced them.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    pub images: Vec<String>,
    pub requested: usize,
    pub rounds: u8,
    pub attempts: Vec<GenerationAttempt>,
}

impl GenerationResult {
    pub fn count(&self) -> usize {
        self.images.len()
    }

    pub fn is_short(&self) -> bool {
        self.count() < self.requested
    }
}
