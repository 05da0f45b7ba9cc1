//! Deterministic prompt construction from the caller's instruction and the two sliders.

use serde::Serialize;

pub const NEGATIVE_PROMPT: &str = "artistic interpretation, stylized, abstract, wrong product shape, \
distorted proportions, different product, decorative props, fantasy elements, glowing effects, \
composite artifacts, low quality, blurry, wrong colors";

/// Qualitative phrasing tier selected by a 0-10 slider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Tier {
    Low,
    Medium,
    High,
}

impl Tier {
    /// `<= 4` low, `5..=7` medium, `> 7` high.
    pub fn from_level(level: u8) -> Self {
        if level > 7 {
            Tier::High
        } else if level > 4 {
            Tier::Medium
        } else {
            Tier::Low
        }
    }

    pub fn mood_adverb(&self) -> &'static str {
        match self {
            Tier::Low => "subtly",
            Tier::Medium => "moderately",
            Tier::High => "strongly",
        }
    }

    pub fn preservation_adverb(&self) -> &'static str {
        match self {
            Tier::Low => "loosely",
            Tier::Medium => "moderately",
            Tier::High => "strictly",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuiltPrompt {
    pub prompt: String,
    pub negative_prompt: String,
}

pub fn build_prompt(instruction: &str, mood_intensity: u8, product_preservation: u8) -> BuiltPrompt {
    let mood = mood_intensity.min(10);
    let preservation = product_preservation.min(10);
    let instruction = instruction.trim();

    let mut prompt = String::new();
    if !instruction.is_empty() {
        prompt.push_str(instruction);
        prompt.push_str("\n\n");
    }
    prompt.push_str(
        "Create a professional product mood shot by harmonizing background, product, and composition reference images.\n\n",
    );
    prompt.push_str("REQUIREMENTS:\n");
    prompt.push_str(&format!(
        "- Mood Intensity: {}/10 - Apply background atmosphere and lighting {}\n",
        mood,
        Tier::from_level(mood).mood_adverb()
    ));
    prompt.push_str(&format!(
        "- Product Preservation: {}/10 - Preserve product details {}\n",
        preservation,
        Tier::from_level(preservation).preservation_adverb()
    ));
    prompt.push_str(
        "- Seamlessly blend the product into the background\n\
         - Match lighting, shadows and reflections naturally\n\
         - Remove any existing products from the background\n\
         - Follow the composition reference for product placement\n\
         - Maintain photorealistic quality with no composite artifacts\n\n",
    );
    prompt.push_str(
        "STYLE: Professional studio photography, high detail, natural lighting, perfect integration",
    );

    BuiltPrompt {
        prompt,
        negative_prompt: NEGATIVE_PROMPT.to_string(),
    }
}
