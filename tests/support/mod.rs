#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use content_studio::{
    error::GenerationError,
    gemini::GenerationService,
    models::{GeneratedImageSet, GeneratedTextContent, UploadedImage, UserPreferences},
};

pub fn image(byte: u8) -> UploadedImage {
    UploadedImage { content: vec![byte; 4], media_type: "image/png".into() }
}

pub fn listing(name: &str) -> GeneratedTextContent {
    GeneratedTextContent {
        name: name.into(),
        title: format!("{name} title"),
        description: "A dependable product.".into(),
        highlights: vec!["one".into(), "two".into(), "three".into()],
        benefits: vec!["saves time".into(), "looks good".into()],
    }
}

pub fn variations(n: usize) -> GeneratedImageSet {
    (0..n).map(|i| format!("data:image/png;base64,AQI{i}")).collect()
}

/// Scripted generation service. Calls can be held until `release` is called.
#[derive(Default)]
pub struct FakeService {
    pub text: Mutex<Option<Result<GeneratedTextContent, String>>>,
    pub images: Mutex<Option<Result<GeneratedImageSet, String>>>,
    pub text_calls: AtomicUsize,
    pub image_calls: AtomicUsize,
    pub creative_calls: AtomicUsize,
    pub seen_preferences: Mutex<Vec<UserPreferences>>,
    gate: Option<Semaphore>,
}

impl FakeService {
    pub fn new() -> Self {
        Self {
            text: Mutex::new(Some(Ok(listing("Trail Runner")))),
            images: Mutex::new(Some(Ok(variations(4)))),
            ..Default::default()
        }
    }

    pub fn gated() -> Self {
        Self { gate: Some(Semaphore::new(0)), ..Self::new() }
    }

    pub fn release(&self, permits: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(permits);
        }
    }

    pub fn fail_text(&self) {
        *self.text.lock() = Some(Err("service unavailable".into()));
    }

    pub fn fail_images(&self) {
        *self.images.lock() = Some(Err("service unavailable".into()));
    }

    async fn wait(&self) {
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
    }
}

#[async_trait]
impl GenerationService for FakeService {
    async fn generate_text(
        &self,
        _image: &UploadedImage,
        preferences: &UserPreferences,
    ) -> Result<GeneratedTextContent, GenerationError> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        self.seen_preferences.lock().push(preferences.clone());
        self.wait().await;
        let scripted = self.text.lock().clone().expect("text result scripted");
        scripted.map_err(GenerationError::Service)
    }

    async fn generate_image_variations(
        &self,
        _image: &UploadedImage,
        preferences: &UserPreferences,
    ) -> Result<GeneratedImageSet, GenerationError> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        self.seen_preferences.lock().push(preferences.clone());
        self.wait().await;
        let scripted = self.images.lock().clone().expect("image result scripted");
        scripted.map_err(GenerationError::Service)
    }

    async fn generate_images_from_text(&self, prompt: &str, count: u8) -> Result<GeneratedImageSet, GenerationError> {
        content_studio::gemini::check_text_to_image(prompt, count)?;
        self.creative_calls.fetch_add(1, Ordering::SeqCst);
        if prompt.contains("forbidden") {
            return Err(GenerationError::Service("rejected".into()));
        }
        Ok(variations(count as usize))
    }
}

pub fn shared(service: FakeService) -> Arc<FakeService> {
    Arc::new(service)
}
