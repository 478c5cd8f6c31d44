use crate::domain::CaptionModel;
use crate::errors::CaptionError;
use crate::storage::strip_data_url_prefix;
use async_trait::async_trait;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use tracing;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const GEMINI_MODEL: &str = "gemini-2.0-flash";

// Short, varied, low-cost completions.
const SAMPLING_TEMPERATURE: f64 = 0.8;
const MAX_OUTPUT_TOKENS: u32 = 100;

const FALLBACK_TEXT: &str = "Failed to generate caption";

/// Caption generator backed by the Gemini REST API. Requires an API key at
/// construction; callers without one use `mock_caption` instead.
#[derive(Debug, Clone)]
pub struct GeminiCaptioner {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiCaptioner {
    pub fn new(api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }
}

/// One prompt, one line back: asks the model for a single shareable caption,
/// naming the tags when any are present.
fn build_prompt(tags: &[String]) -> String {
    let mut prompt = String::from(
        "What's a funny caption for this meme? Give me just one short, shareable \
         one-liner and nothing else.",
    );
    if !tags.is_empty() {
        prompt.push_str(&format!(" Consider these themes: {}.", tags.join(", ")));
    }
    prompt
}

// --- Wire types for generateContent ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: &'static str,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[async_trait]
impl CaptionModel for GeminiCaptioner {
    /// Single non-streaming call, no retry. Failures are bucketed by message
    /// content into credential, quota and generic errors.
    async fn generate(&self, image_data: &str, tags: &[String]) -> Result<String, CaptionError> {
        let payload = strip_data_url_prefix(image_data);

        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part {
                        text: Some(build_prompt(tags)),
                        inline_data: None,
                    },
                    Part {
                        text: None,
                        inline_data: Some(InlineData {
                            mime_type: "image/jpeg",
                            data: payload.to_string(),
                        }),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: SAMPLING_TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, GEMINI_MODEL, self.api_key
        );

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| CaptionError::classify(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, %body, "Gemini API request failed");
            return Err(CaptionError::classify(format!("{}: {}", status, body)));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| CaptionError::Generation(e.to_string()))?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| FALLBACK_TEXT.to_string());

        Ok(text)
    }
}

// --- Static fallback captions ---

const CODING_CAPTION: &str =
    "When your code works on the first try and you're both happy and suspicious";
const FOOD_CAPTION: &str =
    "Me explaining why I need to order food when there's food at home";
const PETS_CAPTION: &str =
    "When your pet does something cute but stops the moment you grab your camera";

const GENERIC_CAPTIONS: [&str; 7] = [
    "When you try your best but still fail spectacularly",
    "That awkward moment when you realize...",
    "Nobody: Absolutely nobody: Me at 3 AM:",
    "My brain during an important meeting:",
    "How I think I look vs. How I actually look:",
    "When someone explains something and asks if you understand",
    "Me pretending to be productive while scrolling memes",
];

/// Static fallback when no API credential is configured. Tag matching is
/// case-sensitive exact membership, first matching theme wins; otherwise a
/// uniform pick from the generic pool.
pub fn mock_caption(tags: &[String]) -> String {
    let has = |names: &[&str]| tags.iter().any(|t| names.contains(&t.as_str()));

    if has(&["coding", "programming"]) {
        return CODING_CAPTION.to_string();
    }
    if has(&["food"]) {
        return FOOD_CAPTION.to_string();
    }
    if has(&["pets", "cats", "dogs"]) {
        return PETS_CAPTION.to_string();
    }

    GENERIC_CAPTIONS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(GENERIC_CAPTIONS[0])
        .to_string()
}
