use serde::{Serialize, Deserialize};
use serde_with::{serde_as, base64::Base64};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// The product photo a session is built around. Replaced wholesale on every upload.
#[serde_as]
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadedImage {
    #[serde_as(as = "Base64")]
    pub content: Vec<u8>,
    pub media_type: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPreferences {
    pub category: String,
    pub audience: String,
    pub features: String,
    pub tone: String,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            category: String::new(),
            audience: String::new(),
            features: String::new(),
            tone: "Professional".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PreferenceField {
    Category,
    Audience,
    Features,
    Tone,
}

impl UserPreferences {
    pub fn set(&mut self, field: PreferenceField, value: String) {
        match field {
            PreferenceField::Category => self.category = value,
            PreferenceField::Audience => self.audience = value,
            PreferenceField::Features => self.features = value,
            PreferenceField::Tone => self.tone = value,
        }
    }
}

/// Listing copy produced by one structured text call. Deserializing this type is
/// the shape check applied to provider output.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct GeneratedTextContent {
    pub name: String,
    pub title: String,
    pub description: String,
    pub highlights: Vec<String>,
    pub benefits: Vec<String>,
}

/// Data URIs in generation order.
pub type GeneratedImageSet = Vec<String>;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub source_image: UploadedImage,
    pub preferences: UserPreferences,
    pub text: GeneratedTextContent,
    pub images: GeneratedImageSet,
}

/// Everything a record needs except its identity, produced by the orchestrator
/// when a session has fresh text and images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryDraft {
    pub source_image: UploadedImage,
    pub preferences: UserPreferences,
    pub text: GeneratedTextContent,
    pub images: GeneratedImageSet,
}

impl HistoryDraft {
    pub fn into_record(self) -> HistoryRecord {
        HistoryRecord {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            source_image: self.source_image,
            preferences: self.preferences,
            text: self.text,
            images: self.images,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PreferenceUpdate {
    pub field: PreferenceField,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CreativeRequest {
    pub prompt: String,
    #[serde(default)]
    pub count: Option<u8>,
}
