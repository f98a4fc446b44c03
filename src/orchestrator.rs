//! Product studio session state.
//!
//! A session starts with every upload or replay and is identified by a [`SessionTag`].
//! Generation requests take a [`GenerationTicket`] carrying the tag; when the result
//! comes back with an outdated tag it is dropped without touching state.
//!
//! A history draft is emitted exactly once per session in which both text and images
//! were freshly generated, whichever finishes first.

use serde::Serialize;
use tracing::{error, info};

use crate::{
    error::GenerationError,
    models::{
        GeneratedImageSet, GeneratedTextContent, HistoryDraft, HistoryRecord, PreferenceField, UploadedImage,
        UserPreferences,
    },
};

pub const TEXT_ERROR_MESSAGE: &str = "Failed to generate text content. Please try again.";
pub const IMAGES_ERROR_MESSAGE: &str = "Failed to generate images. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SessionTag(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionProgress {
    #[default]
    Idle,
    TextDone,
    ImagesDone,
    /// Both fresh, waiting for content that can be recorded (non-empty images).
    BothDone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationKind {
    Text,
    Images,
}

impl SessionProgress {
    fn advance(self, kind: GenerationKind) -> Self {
        use GenerationKind::*;
        use SessionProgress::*;
        match (self, kind) {
            (Idle, Text) | (TextDone, Text) => TextDone,
            (Idle, Images) | (ImagesDone, Images) => ImagesDone,
            (TextDone, Images) | (ImagesDone, Text) | (BothDone, _) => BothDone,
        }
    }

    pub fn text_just_completed(self) -> bool {
        matches!(self, SessionProgress::TextDone | SessionProgress::BothDone)
    }

    pub fn images_just_completed(self) -> bool {
        matches!(self, SessionProgress::ImagesDone | SessionProgress::BothDone)
    }
}

/// Inputs captured when a request starts, so the call runs without holding the state.
#[derive(Debug, Clone)]
pub struct GenerationTicket {
    pub session: SessionTag,
    pub image: UploadedImage,
    pub preferences: UserPreferences,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The session moved on while the request was in flight.
    Stale,
    /// Carries the user-facing message recorded in `last_error`.
    Failed(String),
    Stored { draft: Option<HistoryDraft> },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorSnapshot {
    pub source_image: Option<String>,
    pub preferences: UserPreferences,
    pub text_result: Option<GeneratedTextContent>,
    pub image_results: GeneratedImageSet,
    pub text_loading: bool,
    pub images_loading: bool,
    pub last_error: Option<String>,
    pub progress: SessionProgress,
}

#[derive(Debug, Default)]
pub struct Orchestrator {
    next_session: u64,
    session: Option<SessionTag>,
    source_image: Option<UploadedImage>,
    preferences: UserPreferences,
    text_result: Option<GeneratedTextContent>,
    image_results: GeneratedImageSet,
    text_loading: bool,
    images_loading: bool,
    last_error: Option<String>,
    progress: SessionProgress,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    fn start_session(&mut self) -> SessionTag {
        self.next_session += 1;
        let tag = SessionTag(self.next_session);
        self.session = Some(tag);
        self.text_loading = false;
        self.images_loading = false;
        self.last_error = None;
        self.progress = SessionProgress::Idle;
        tag
    }

    pub fn set_source_image(&mut self, image: UploadedImage) -> SessionTag {
        let tag = self.start_session();
        self.source_image = Some(image);
        self.text_result = None;
        self.image_results.clear();
        info!("🆕 Started session {:?}", tag);
        tag
    }

    pub fn update_preference(&mut self, field: PreferenceField, value: String) {
        self.preferences.set(field, value);
    }

    /// Replays a stored record. Never counts as fresh generation.
    pub fn load_from_record(&mut self, record: &HistoryRecord) -> SessionTag {
        let tag = self.start_session();
        self.source_image = Some(record.source_image.clone());
        self.preferences = record.preferences.clone();
        self.text_result = Some(record.text.clone());
        self.image_results = record.images.clone();
        info!("⏪ Replayed history record {} as session {:?}", record.id, tag);
        tag
    }

    /// Returns `None` without side effects when there is no image or the same kind is already loading.
    pub fn begin(&mut self, kind: GenerationKind) -> Option<GenerationTicket> {
        let session = self.session?;
        let image = self.source_image.clone()?;
        let loading = match kind {
            GenerationKind::Text => &mut self.text_loading,
            GenerationKind::Images => &mut self.images_loading,
        };
        if *loading {
            return None;
        }
        *loading = true;
        self.last_error = None;
        Some(GenerationTicket { session, image, preferences: self.preferences.clone() })
    }

    pub fn finish_text(
        &mut self,
        session: SessionTag,
        result: Result<GeneratedTextContent, GenerationError>,
    ) -> Completion {
        if self.session != Some(session) {
            info!("⏭️ Discarding text result from superseded session {:?}", session);
            return Completion::Stale;
        }
        self.text_loading = false;
        match result {
            Ok(text) => {
                self.text_result = Some(text);
                self.complete(GenerationKind::Text)
            }
            Err(e) => {
                error!("❌ Text generation failed: {}", e);
                self.last_error = Some(TEXT_ERROR_MESSAGE.to_string());
                Completion::Failed(TEXT_ERROR_MESSAGE.to_string())
            }
        }
    }

    pub fn finish_images(
        &mut self,
        session: SessionTag,
        result: Result<GeneratedImageSet, GenerationError>,
    ) -> Completion {
        if self.session != Some(session) {
            info!("⏭️ Discarding image result from superseded session {:?}", session);
            return Completion::Stale;
        }
        self.images_loading = false;
        match result {
            Ok(images) => {
                self.image_results = images;
                self.complete(GenerationKind::Images)
            }
            Err(e) => {
                error!("❌ Image generation failed: {}", e);
                self.last_error = Some(IMAGES_ERROR_MESSAGE.to_string());
                Completion::Failed(IMAGES_ERROR_MESSAGE.to_string())
            }
        }
    }

    fn complete(&mut self, kind: GenerationKind) -> Completion {
        self.progress = self.progress.advance(kind);
        if self.progress != SessionProgress::BothDone || self.image_results.is_empty() {
            return Completion::Stored { draft: None };
        }
        let (Some(source_image), Some(text)) = (self.source_image.clone(), self.text_result.clone()) else {
            return Completion::Stored { draft: None };
        };
        self.progress = SessionProgress::Idle;
        Completion::Stored {
            draft: Some(HistoryDraft {
                source_image,
                preferences: self.preferences.clone(),
                text,
                images: self.image_results.clone(),
            }),
        }
    }

    pub fn session(&self) -> Option<SessionTag> {
        self.session
    }

    pub fn source_image(&self) -> Option<&UploadedImage> {
        self.source_image.as_ref()
    }

    pub fn preferences(&self) -> &UserPreferences {
        &self.preferences
    }

    pub fn text_result(&self) -> Option<&GeneratedTextContent> {
        self.text_result.as_ref()
    }

    pub fn image_results(&self) -> &[String] {
        &self.image_results
    }

    pub fn text_loading(&self) -> bool {
        self.text_loading
    }

    pub fn images_loading(&self) -> bool {
        self.images_loading
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn progress(&self) -> SessionProgress {
        self.progress
    }

    pub fn snapshot(&self) -> OrchestratorSnapshot {
        OrchestratorSnapshot {
            source_image: self.source_image.as_ref().map(UploadedImage::to_data_uri),
            preferences: self.preferences.clone(),
            text_result: self.text_result.clone(),
            image_results: self.image_results.clone(),
            text_loading: self.text_loading,
            images_loading: self.images_loading,
            last_error: self.last_error.clone(),
            progress: self.progress,
        }
    }
}
