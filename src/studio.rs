use std::{future::Future, sync::Arc};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::AbortHandle;
use tracing::{error, info, warn};

use crate::{
    error::GenerationError,
    gemini::GenerationService,
    history::HistoryStore,
    models::{GeneratedImageSet, GeneratedTextContent, HistoryRecord, PreferenceField, UploadedImage},
    orchestrator::{Completion, GenerationKind, GenerationTicket, Orchestrator, OrchestratorSnapshot, SessionTag},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum RequestOutcome {
    /// No source image, or the same request is already running.
    Skipped,
    Superseded,
    Failed { message: String },
    #[serde(rename_all = "camelCase")]
    Completed { history_record_id: Option<String> },
}

/// Drives the product studio. Each generation runs on a spawned task that also commits
/// its result, so the state settles even if the caller stops waiting. A task left over
/// from a superseded session is aborted.
pub struct Studio {
    orchestrator: Arc<Mutex<Orchestrator>>,
    history: Arc<Mutex<HistoryStore>>,
    service: Arc<dyn GenerationService>,
    in_flight: Mutex<Vec<(SessionTag, AbortHandle)>>,
}

type Finish<T> = fn(&mut Orchestrator, SessionTag, Result<T, GenerationError>) -> Completion;

impl Studio {
    pub fn new(service: Arc<dyn GenerationService>, history: HistoryStore) -> Self {
        Self {
            orchestrator: Arc::new(Mutex::new(Orchestrator::new())),
            history: Arc::new(Mutex::new(history)),
            service,
            in_flight: Mutex::new(Vec::new()),
        }
    }

    pub fn set_source_image(&self, image: UploadedImage) {
        let session = self.orchestrator.lock().set_source_image(image);
        self.abort_superseded(session);
    }

    pub fn update_preference(&self, field: PreferenceField, value: String) {
        self.orchestrator.lock().update_preference(field, value);
    }

    pub async fn request_text(&self) -> RequestOutcome {
        let ticket = self.orchestrator.lock().begin(GenerationKind::Text);
        let Some(GenerationTicket { session, image, preferences }) = ticket else {
            return RequestOutcome::Skipped;
        };
        let service = self.service.clone();
        self.run_tracked(
            session,
            async move { service.generate_text(&image, &preferences).await },
            Orchestrator::finish_text,
        )
        .await
    }

    pub async fn request_images(&self) -> RequestOutcome {
        let ticket = self.orchestrator.lock().begin(GenerationKind::Images);
        let Some(GenerationTicket { session, image, preferences }) = ticket else {
            return RequestOutcome::Skipped;
        };
        let service = self.service.clone();
        self.run_tracked(
            session,
            async move { service.generate_image_variations(&image, &preferences).await },
            Orchestrator::finish_images,
        )
        .await
    }

    /// Replays a stored record. Returns false, changing nothing, for an unknown id.
    pub fn load_history(&self, id: &str) -> bool {
        let record = self.history.lock().find_by_id(id).cloned();
        let Some(record) = record else {
            warn!("⚠️ History record {} not found", id);
            return false;
        };
        let session = self.orchestrator.lock().load_from_record(&record);
        self.abort_superseded(session);
        true
    }

    pub async fn clear_history(&self) {
        let history = self.history.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || history.lock().clear()).await {
            error!("❌ Clearing history did not finish: {}", e);
        }
    }

    pub fn history(&self) -> Vec<HistoryRecord> {
        self.history.lock().records().to_vec()
    }

    pub fn snapshot(&self) -> OrchestratorSnapshot {
        self.orchestrator.lock().snapshot()
    }

    pub fn text_result(&self) -> Option<GeneratedTextContent> {
        self.orchestrator.lock().text_result().cloned()
    }

    pub fn image_results(&self) -> GeneratedImageSet {
        self.orchestrator.lock().image_results().to_vec()
    }

    /// Runs `call` and commits its result with `finish` on a task registered under `session`.
    async fn run_tracked<T, F>(&self, session: SessionTag, call: F, finish: Finish<T>) -> RequestOutcome
    where
        T: Send + 'static,
        F: Future<Output = Result<T, GenerationError>> + Send + 'static,
    {
        let orchestrator = self.orchestrator.clone();
        let history = self.history.clone();
        let handle = tokio::spawn(async move {
            let result = call.await;
            let completion = finish(&mut *orchestrator.lock(), session, result);
            commit(history, completion).await
        });
        {
            let mut in_flight = self.in_flight.lock();
            in_flight.retain(|(_, h)| !h.is_finished());
            in_flight.push((session, handle.abort_handle()));
        }
        match handle.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => {
                info!("⏹️ Generation task for session {:?} was aborted", session);
                RequestOutcome::Superseded
            }
            Err(e) => {
                let failure = Err(GenerationError::Service(format!("generation task failed: {e}")));
                let completion = finish(&mut *self.orchestrator.lock(), session, failure);
                commit(self.history.clone(), completion).await
            }
        }
    }

    fn abort_superseded(&self, current: SessionTag) {
        self.in_flight.lock().retain(|(session, handle)| {
            if *session == current {
                return true;
            }
            handle.abort();
            false
        });
    }
}

/// Turns a completion into the caller's outcome, appending any finished draft to history.
/// The store writes to disk, so the append runs on the blocking pool.
async fn commit(history: Arc<Mutex<HistoryStore>>, completion: Completion) -> RequestOutcome {
    match completion {
        Completion::Stale => RequestOutcome::Superseded,
        Completion::Failed(message) => RequestOutcome::Failed { message },
        Completion::Stored { draft: None } => RequestOutcome::Completed { history_record_id: None },
        Completion::Stored { draft: Some(draft) } => {
            let record = draft.into_record();
            let id = record.id.clone();
            if let Err(e) = tokio::task::spawn_blocking(move || history.lock().append(record)).await {
                error!("❌ History append did not finish: {}", e);
            }
            RequestOutcome::Completed { history_record_id: Some(id) }
        }
    }
}
