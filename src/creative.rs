use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::error;

use crate::{
    error::GenerationError,
    gemini::{GenerationService, MAX_TEXT_TO_IMAGE_COUNT},
    models::GeneratedImageSet,
};

pub const EMPTY_PROMPT_MESSAGE: &str = "Please enter a prompt to generate images.";
pub const CREATIVE_ERROR_MESSAGE: &str =
    "Failed to generate images. The prompt may have been rejected. Please try again with a different prompt.";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreativeState {
    pub prompt: String,
    pub count: u8,
    pub images: GeneratedImageSet,
    pub loading: bool,
    pub error: Option<String>,
}

impl Default for CreativeState {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            count: MAX_TEXT_TO_IMAGE_COUNT,
            images: Vec::new(),
            loading: false,
            error: None,
        }
    }
}

/// Text-to-image workspace. Results never enter the history log.
pub struct CreativeStudio {
    state: Arc<Mutex<CreativeState>>,
    service: Arc<dyn GenerationService>,
}

impl CreativeStudio {
    pub fn new(service: Arc<dyn GenerationService>) -> Self {
        Self { state: Arc::new(Mutex::new(CreativeState::default())), service }
    }

    pub fn state(&self) -> CreativeState {
        self.state.lock().clone()
    }

    /// Returns the state after the attempt. A request made while one is running is ignored.
    /// The attempt settles on its own task, so dropping the returned future does not leave
    /// the workspace loading.
    pub async fn generate(&self, prompt: String, count: Option<u8>) -> CreativeState {
        let count = count.unwrap_or(MAX_TEXT_TO_IMAGE_COUNT).clamp(1, MAX_TEXT_TO_IMAGE_COUNT);
        {
            let mut state = self.state.lock();
            if state.loading {
                return state.clone();
            }
            state.prompt = prompt.clone();
            state.count = count;
            if prompt.trim().is_empty() {
                state.error = Some(EMPTY_PROMPT_MESSAGE.to_string());
                return state.clone();
            }
            state.loading = true;
            state.error = None;
            state.images.clear();
        }

        let service = self.service.clone();
        let state = self.state.clone();
        let handle = tokio::spawn(async move {
            let result = service.generate_images_from_text(&prompt, count).await;
            let mut state = state.lock();
            settle(&mut state, result)
        });
        match handle.await {
            Ok(state) => state,
            Err(e) => {
                let failure = Err(GenerationError::Service(format!("generation task failed: {e}")));
                settle(&mut self.state.lock(), failure)
            }
        }
    }
}

fn settle(state: &mut CreativeState, result: Result<GeneratedImageSet, GenerationError>) -> CreativeState {
    state.loading = false;
    match result {
        Ok(images) => state.images = images,
        Err(GenerationError::EmptyPrompt) => state.error = Some(EMPTY_PROMPT_MESSAGE.to_string()),
        Err(e) => {
            error!("❌ Creative generation failed: {}", e);
            state.error = Some(CREATIVE_ERROR_MESSAGE.to_string());
        }
    }
    state.clone()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use tokio::sync::Semaphore;

    use super::*;
    use crate::models::{GeneratedTextContent, UploadedImage, UserPreferences};

    /// Records every requested count; holds calls until permits are added when gated.
    #[derive(Default)]
    struct ImageService {
        counts: Mutex<Vec<u8>>,
        gate: Option<Semaphore>,
    }

    impl ImageService {
        fn open() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn gated() -> Arc<Self> {
            Arc::new(Self { gate: Some(Semaphore::new(0)), ..Default::default() })
        }

        fn release(&self, permits: usize) {
            if let Some(gate) = &self.gate {
                gate.add_permits(permits);
            }
        }

        fn calls(&self) -> usize {
            self.counts.lock().len()
        }
    }

    #[async_trait]
    impl GenerationService for ImageService {
        async fn generate_text(
            &self,
            _image: &UploadedImage,
            _preferences: &UserPreferences,
        ) -> Result<GeneratedTextContent, GenerationError> {
            Err(GenerationError::Service("not scripted".into()))
        }

        async fn generate_image_variations(
            &self,
            _image: &UploadedImage,
            _preferences: &UserPreferences,
        ) -> Result<GeneratedImageSet, GenerationError> {
            Err(GenerationError::Service("not scripted".into()))
        }

        async fn generate_images_from_text(&self, prompt: &str, count: u8) -> Result<GeneratedImageSet, GenerationError> {
            self.counts.lock().push(count);
            if let Some(gate) = &self.gate {
                gate.acquire().await.map_err(|e| GenerationError::Service(e.to_string()))?.forget();
            }
            Ok((0..count).map(|i| format!("data:image/png;base64,{prompt}{i}")).collect())
        }
    }

    async fn wait_for_calls(service: &ImageService, calls: usize) {
        while service.calls() < calls {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn count_is_clamped_and_defaults_to_four() {
        let service = ImageService::open();
        let studio = CreativeStudio::new(service.clone());

        let state = studio.generate("lamp".into(), Some(0)).await;
        assert_eq!((state.count, state.images.len()), (1, 1));
        let state = studio.generate("lamp".into(), Some(9)).await;
        assert_eq!((state.count, state.images.len()), (4, 4));
        let state = studio.generate("lamp".into(), None).await;
        assert_eq!((state.count, state.images.len()), (4, 4));

        assert_eq!(*service.counts.lock(), vec![1, 4, 4]);
    }

    #[tokio::test]
    async fn empty_prompt_never_reaches_the_service() {
        let service = ImageService::open();
        let studio = CreativeStudio::new(service.clone());

        let state = studio.generate("   ".into(), Some(2)).await;
        assert_eq!(state.error.as_deref(), Some(EMPTY_PROMPT_MESSAGE));
        assert!(!state.loading);
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn request_while_loading_is_ignored_and_images_clear_first() {
        let service = ImageService::gated();
        let studio = Arc::new(CreativeStudio::new(service.clone()));
        service.release(1);
        assert_eq!(studio.generate("first".into(), Some(2)).await.images.len(), 2);

        let pending = tokio::spawn({
            let studio = studio.clone();
            async move { studio.generate("second".into(), Some(3)).await }
        });
        wait_for_calls(&service, 2).await;

        let during = studio.state();
        assert!(during.loading);
        assert!(during.images.is_empty());

        let ignored = studio.generate("third".into(), Some(1)).await;
        assert_eq!(ignored.prompt, "second");
        assert!(ignored.loading);
        assert_eq!(service.calls(), 2);

        service.release(1);
        let done = pending.await.unwrap();
        assert_eq!(done.prompt, "second");
        assert_eq!(done.images.len(), 3);
        assert!(!done.loading);
    }

    #[tokio::test]
    async fn dropped_request_still_settles() {
        let service = ImageService::gated();
        let studio = CreativeStudio::new(service.clone());

        let waited = tokio::time::timeout(Duration::from_millis(20), studio.generate("lost".into(), Some(1))).await;
        assert!(waited.is_err());
        assert!(studio.state().loading);

        service.release(1);
        while studio.state().loading {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(studio.state().images.len(), 1);

        service.release(1);
        let next = studio.generate("next".into(), Some(2)).await;
        assert_eq!(next.images.len(), 2);
        assert_eq!(service.calls(), 2);
    }
}
