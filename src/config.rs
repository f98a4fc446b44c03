use std::path::PathBuf;

pub const DEMO_KEY: &str = "DEMO_KEY";

#[derive(Debug, Clone)]
pub struct StudioConfig {
    pub api_key: String,
    pub base_url: String,
    pub text_model: String,
    pub image_model: String,
    pub imagen_model: String,
    pub data_dir: PathBuf,
    pub port: u16,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            api_key: DEMO_KEY.to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            text_model: "gemini-2.5-flash".to_string(),
            image_model: "gemini-2.5-flash-image".to_string(),
            imagen_model: "imagen-4.0-generate-001".to_string(),
            data_dir: PathBuf::from("./studio-data"),
            port: 8080,
        }
    }
}

impl StudioConfig {
    /// Reads the process environment; call after `dotenv` so `.env` values apply.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            // A blank key behaves like no key at all.
            api_key: lookup("GEMINI_API_KEY").filter(|k| !k.trim().is_empty()).unwrap_or(defaults.api_key),
            base_url: lookup("GEMINI_API_BASE").unwrap_or(defaults.base_url),
            text_model: lookup("STUDIO_TEXT_MODEL").unwrap_or(defaults.text_model),
            image_model: lookup("STUDIO_IMAGE_MODEL").unwrap_or(defaults.image_model),
            imagen_model: lookup("STUDIO_IMAGEN_MODEL").unwrap_or(defaults.imagen_model),
            data_dir: lookup("STUDIO_DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            port: lookup("PORT").and_then(|v| v.parse().ok()).unwrap_or(defaults.port),
        }
    }

    pub fn is_demo(&self) -> bool {
        self.api_key == DEMO_KEY
    }

    /// Short key prefix for startup logs.
    pub fn redacted_key(&self) -> String {
        self.api_key.chars().take(10).collect()
    }
}
