use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::{
    config::StudioConfig,
    error::GenerationError,
    models::{GeneratedImageSet, GeneratedTextContent, UploadedImage, UserPreferences},
};

pub const MAX_TEXT_TO_IMAGE_COUNT: u8 = 4;

/// Templates only get the category clause when they contain this phrase.
pub const REALISTIC_SETTING_MARKER: &str = "in a realistic setting";

pub const VARIATION_TEMPLATES: [&str; 4] = [
    "A professional product photograph of this item from a 45-degree angle on a clean, neutral light grey background.",
    "A lifestyle shot of this product in a realistic setting.",
    "A close-up, detailed shot of this product, focusing on its texture and material craftsmanship against a complementary colored background.",
    "This product presented in premium, minimalist packaging, suggesting it's a high-quality gift.",
];

/// The generation operations the studio depends on. One attempt per call, no retries.
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate_text(
        &self,
        image: &UploadedImage,
        preferences: &UserPreferences,
    ) -> Result<GeneratedTextContent, GenerationError>;

    /// Four concurrent requests, one per template; results in template order.
    async fn generate_image_variations(
        &self,
        image: &UploadedImage,
        preferences: &UserPreferences,
    ) -> Result<GeneratedImageSet, GenerationError>;

    async fn generate_images_from_text(&self, prompt: &str, count: u8) -> Result<GeneratedImageSet, GenerationError>;
}

pub fn build_text_prompt(prefs: &UserPreferences) -> String {
    let mut prompt = String::from("Based on the provided product image, generate content for an e-commerce listing.");
    if !prefs.category.is_empty() {
        prompt.push_str(&format!(" The product category is \"{}\".", prefs.category));
    }
    if !prefs.audience.is_empty() {
        prompt.push_str(&format!(" The target audience is \"{}\".", prefs.audience));
    }
    if !prefs.features.is_empty() {
        prompt.push_str(&format!(" Key features to highlight are: \"{}\".", prefs.features));
    }
    if !prefs.tone.is_empty() {
        prompt.push_str(&format!(" The desired tone is \"{}\".", prefs.tone));
    }
    prompt.push_str(" Provide a catchy product name, a descriptive title, a compelling product description, a list of 3-5 key highlights/specifications, and a list of 2-4 customer benefits.");
    prompt
}

pub fn contextualize(template: &str, prefs: &UserPreferences) -> String {
    let mut p = template.to_string();
    if !prefs.category.is_empty() && p.contains(REALISTIC_SETTING_MARKER) {
        p.push_str(&format!(
            " The product category is \"{}\", so place it in a suitable environment (e.g., kitchen for a gadget, park for a shoe).",
            prefs.category
        ));
    }
    if !prefs.audience.is_empty() {
        p.push_str(&format!(" The scene should be appealing to {}.", prefs.audience));
    }
    if !prefs.tone.is_empty() {
        p.push_str(&format!(" The overall mood should be {}.", prefs.tone));
    }
    p
}

pub fn variation_prompts(prefs: &UserPreferences) -> [String; 4] {
    VARIATION_TEMPLATES.map(|t| contextualize(t, prefs))
}

/// Client-side precondition for text-to-image, checked before any request is built.
pub fn check_text_to_image(prompt: &str, count: u8) -> Result<(), GenerationError> {
    if prompt.trim().is_empty() {
        return Err(GenerationError::EmptyPrompt);
    }
    if count == 0 || count > MAX_TEXT_TO_IMAGE_COUNT {
        return Err(GenerationError::InvalidImageCount(count));
    }
    Ok(())
}

fn text_response_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "name": { "type": "STRING", "description": "A catchy and short product name, 2-5 words long." },
            "title": { "type": "STRING", "description": "A descriptive e-commerce title, optimized for search engines, around 10-15 words." },
            "description": { "type": "STRING", "description": "A compelling and descriptive product paragraph, around 50-80 words long." },
            "highlights": {
                "type": "ARRAY",
                "description": "A list of 3 to 5 key features or technical specifications, each as a short string.",
                "items": { "type": "STRING" }
            },
            "benefits": {
                "type": "ARRAY",
                "description": "A list of 2 to 4 key benefits for the customer, explaining why they should buy it.",
                "items": { "type": "STRING" }
            }
        },
        "required": ["name", "title", "description", "highlights", "benefits"]
    })
}

// Helper function to truncate base64 data in JSON for cleaner logging
fn truncate_base64_in_json(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                if key == "data" || key == "bytesBase64Encoded" {
                    if let serde_json::Value::String(s) = val {
                        if s.len() > 100 && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=') {
                            *val = serde_json::Value::String(format!("{}...[truncated {} chars]", &s[..50], s.len() - 50));
                        }
                    }
                } else {
                    truncate_base64_in_json(val);
                }
            }
        }
        serde_json::Value::Array(arr) => {
            for val in arr.iter_mut() {
                truncate_base64_in_json(val);
            }
        }
        _ => {}
    }
}

/// Masks the API key in a request URL. An empty key has nothing to mask.
fn redact_key(url: &str, key: &str) -> String {
    if key.is_empty() {
        return url.to_string();
    }
    url.replace(key, "***")
}

fn loggable(value: &serde_json::Value) -> String {
    let mut v = value.clone();
    truncate_base64_in_json(&mut v);
    serde_json::to_string(&v).unwrap_or_default()
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    text_model: String,
    image_model: String,
    imagen_model: String,
    demo: bool,
}

impl GeminiClient {
    pub fn new(config: &StudioConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
            imagen_model: config.imagen_model.clone(),
            demo: config.is_demo(),
        }
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}?key={}", self.base_url, model, method, self.api_key)
    }

    async fn post_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<T, GenerationError> {
        info!("🔗 Making request to: {}", redact_key(url, &self.api_key));
        info!("📤 Request body: {}", loggable(body));

        let response = self.client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| GenerationError::Service(e.to_string()))?;

        let status = response.status();
        let response_text = response.text().await
            .map_err(|e| GenerationError::Service(e.to_string()))?;
        info!("📥 Response status: {}", status);

        if !status.is_success() {
            error!("❌ API Error response: {}", response_text);
            return Err(GenerationError::Service(format!("status={} body={}", status, response_text)));
        }

        match serde_json::from_str::<serde_json::Value>(&response_text) {
            Ok(v) => info!("📥 Raw Gemini API response: {}", loggable(&v)),
            Err(_) => info!("📥 Raw Gemini API response (not JSON, {} chars)", response_text.len()),
        }

        serde_json::from_str(&response_text)
            .map_err(|e| GenerationError::InvalidResponseShape(format!("parse error: {}", e)))
    }

    async fn generate_variation(&self, prompt: &str, image: &UploadedImage) -> Result<Vec<String>, GenerationError> {
        let body = json!({
            "contents": [{
                "parts": [
                    { "text": prompt },
                    { "inlineData": { "data": image.to_base64(), "mimeType": image.media_type } }
                ]
            }],
            "generationConfig": { "responseModalities": ["IMAGE"] }
        });
        let parsed: GeminiResponse = self.post_json(&self.model_url(&self.image_model, "generateContent"), &body).await?;
        let candidate = parsed.candidates.first()
            .ok_or_else(|| GenerationError::InvalidResponseShape("no candidates in image response".into()))?;
        Ok(candidate.content.parts.iter().filter_map(|p| match p {
            Part::Inline { inline_data } => Some(format!("data:{};base64,{}", inline_data.mime_type, inline_data.data)),
            _ => None,
        }).collect())
    }

    fn generate_placeholder_image(&self, prompt: &str) -> String {
        let colors = ["#3B82F6", "#EF4444", "#10B981", "#F59E0B", "#8B5CF6"];
        let color = colors[prompt.len() % colors.len()];
        let title = if prompt.contains("45-degree") { "📷 Studio Angle" }
                   else if prompt.contains(REALISTIC_SETTING_MARKER) { "🏡 Lifestyle" }
                   else if prompt.contains("close-up") { "🔍 Material Detail" }
                   else if prompt.contains("packaging") { "🎁 Gift Packaging" }
                   else { "✨ Creative" };

        let svg = format!(r#"<svg width="512" height="512" xmlns="http://www.w3.org/2000/svg">
            <rect width="512" height="512" fill="{}" />
            <text x="256" y="256" font-family="Arial, sans-serif" font-size="32" font-weight="bold"
                  text-anchor="middle" fill="white">{}</text>
            <text x="256" y="300" font-family="Arial, sans-serif" font-size="14"
                  text-anchor="middle" fill="white" opacity="0.8">Demo placeholder</text>
        </svg>"#, color, title);

        format!("data:image/svg+xml;base64,{}", base64::engine::general_purpose::STANDARD.encode(svg.as_bytes()))
    }

    fn demo_text(prefs: &UserPreferences) -> GeneratedTextContent {
        let category = if prefs.category.is_empty() { "Product" } else { prefs.category.as_str() };
        GeneratedTextContent {
            name: format!("Demo {category}"),
            title: format!("Demo {category} listing generated without a Gemini API key"),
            description: "Demo description: set GEMINI_API_KEY to generate real listing copy from your product photo.".to_string(),
            highlights: vec!["Placeholder highlight one".into(), "Placeholder highlight two".into(), "Placeholder highlight three".into()],
            benefits: vec!["Runs offline".into(), "Exercises the full studio workflow".into()],
        }
    }
}

#[async_trait]
impl GenerationService for GeminiClient {
    async fn generate_text(
        &self,
        image: &UploadedImage,
        preferences: &UserPreferences,
    ) -> Result<GeneratedTextContent, GenerationError> {
        if self.demo {
            info!("Using demo mode - generating placeholder listing text");
            return Ok(Self::demo_text(preferences));
        }

        info!("Generating listing text with Gemini API...");
        let body = json!({
            "contents": [{
                "parts": [
                    { "text": build_text_prompt(preferences) },
                    { "inlineData": { "data": image.to_base64(), "mimeType": image.media_type } }
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": text_response_schema()
            }
        });
        let parsed: GeminiResponse = self.post_json(&self.model_url(&self.text_model, "generateContent"), &body).await?;

        let text = parsed.candidates.iter()
            .flat_map(|c| c.content.parts.iter())
            .find_map(|p| match p {
                Part::Text { text } => Some(text.trim()),
                _ => None,
            })
            .ok_or_else(|| GenerationError::InvalidResponseShape("no text content found in response".into()))?;

        let content: GeneratedTextContent = serde_json::from_str(text)
            .map_err(|e| GenerationError::InvalidResponseShape(e.to_string()))?;
        info!("✅ Listing text generated: {}", content.name);
        Ok(content)
    }

    async fn generate_image_variations(
        &self,
        image: &UploadedImage,
        preferences: &UserPreferences,
    ) -> Result<GeneratedImageSet, GenerationError> {
        let prompts = variation_prompts(preferences);
        if self.demo {
            info!("Using demo mode - no real images generated");
            return Ok(prompts.iter().map(|p| self.generate_placeholder_image(p)).collect());
        }

        info!("🎯 Generating {} image variations concurrently", prompts.len());
        let (a, b, c, d) = tokio::try_join!(
            self.generate_variation(&prompts[0], image),
            self.generate_variation(&prompts[1], image),
            self.generate_variation(&prompts[2], image),
            self.generate_variation(&prompts[3], image),
        )?;
        let images: GeneratedImageSet = [a, b, c, d].into_iter().flatten().collect();
        info!("✅ Generated {} image variations", images.len());
        Ok(images)
    }

    async fn generate_images_from_text(&self, prompt: &str, count: u8) -> Result<GeneratedImageSet, GenerationError> {
        check_text_to_image(prompt, count)?;
        if self.demo {
            info!("Using demo mode - {} placeholder images", count);
            return Ok((0..count).map(|_| self.generate_placeholder_image(prompt)).collect());
        }

        info!("🎯 Generating {} images from prompt (truncated): {}", count, &prompt[..prompt.char_indices().nth(100).map_or(prompt.len(), |(i, _)| i)]);
        let body = json!({
            "instances": [{ "prompt": prompt }],
            "parameters": {
                "sampleCount": count,
                "outputMimeType": "image/png",
                "aspectRatio": "1:1"
            }
        });
        let parsed: ImagenResponse = self.post_json(&self.model_url(&self.imagen_model, "predict"), &body).await?;
        if parsed.predictions.is_empty() {
            return Err(GenerationError::Service("no images returned; the prompt may have been filtered".into()));
        }
        Ok(parsed.predictions.into_iter()
            .map(|p| format!("data:image/png;base64,{}", p.bytes_base64_encoded))
            .collect())
    }
}

// --- Response Parsing Helpers ---

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate { #[serde(default)] content: Content }

#[derive(Debug, Deserialize, Default)]
struct Content { #[serde(default)] parts: Vec<Part> }

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Part {
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData
    },
    Text { text: String },
    #[allow(dead_code)]
    Other(serde_json::Value)
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: String,
    #[serde(rename = "mimeType")]
    mime_type: String,
}

#[derive(Debug, Deserialize)]
struct ImagenResponse {
    #[serde(default)]
    predictions: Vec<ImagenPrediction>,
}

#[derive(Debug, Deserialize)]
struct ImagenPrediction {
    #[serde(rename = "bytesBase64Encoded")]
    bytes_base64_encoded: String,
}
