use std::{path::PathBuf, sync::Arc};

use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use serde_json::json;

use crate::{
    creative::{CreativeState, CreativeStudio},
    error::ExportError,
    export::{self, ImagePrefix},
    models::{CreativeRequest, HistoryRecord, PreferenceUpdate, UploadedImage},
    orchestrator::OrchestratorSnapshot,
    studio::{RequestOutcome, Studio},
};

/// Product photos routinely exceed axum's 2 MB default.
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub studio: Arc<Studio>,
    pub creative: Arc<CreativeStudio>,
    pub export_dir: PathBuf,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/product", get(get_product))
        .route("/api/product/image", post(upload_image))
        .route("/api/product/preferences", axum::routing::patch(update_preference))
        .route("/api/product/text", post(request_text))
        .route("/api/product/images", post(request_images))
        .route("/api/product/images/save", post(save_product_images))
        .route("/api/product/images/:index", get(download_product_image))
        .route("/api/product/downloads", get(product_download_plan))
        .route("/api/product/export/text", get(export_text))
        .route("/api/product/export/pdf", get(export_pdf))
        .route("/api/creative", get(get_creative).post(generate_creative))
        .route("/api/creative/images/:index", get(download_creative_image))
        .route("/api/history", get(list_history).delete(clear_history))
        .route("/api/history/:id/load", post(load_history))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

pub async fn get_product(State(state): State<AppState>) -> Json<OrchestratorSnapshot> {
    Json(state.studio.snapshot())
}

pub async fn upload_image(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let declared = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok());
    match UploadedImage::from_upload(body.to_vec(), declared) {
        Ok(image) => {
            state.studio.set_source_image(image);
            Json(state.studio.snapshot()).into_response()
        }
        Err(e) => {
            tracing::warn!("⚠️ Rejected upload: {}", e);
            (StatusCode::UNSUPPORTED_MEDIA_TYPE, Json(json!({ "error": e.to_string() }))).into_response()
        }
    }
}

pub async fn update_preference(State(state): State<AppState>, Json(body): Json<PreferenceUpdate>) -> Json<OrchestratorSnapshot> {
    state.studio.update_preference(body.field, body.value);
    Json(state.studio.snapshot())
}

pub async fn request_text(State(state): State<AppState>) -> Json<RequestOutcome> {
    tracing::info!("🚀 Text generation requested");
    Json(state.studio.request_text().await)
}

pub async fn request_images(State(state): State<AppState>) -> Json<RequestOutcome> {
    tracing::info!("🚀 Image variations requested");
    Json(state.studio.request_images().await)
}

pub async fn product_download_plan(State(state): State<AppState>) -> Json<Vec<export::DownloadItem>> {
    Json(export::download_plan(state.studio.image_results().len(), ImagePrefix::Product))
}

pub async fn download_product_image(Path(index): Path<usize>, State(state): State<AppState>) -> Response {
    image_attachment(&state.studio.image_results(), index, ImagePrefix::Product)
}

pub async fn download_creative_image(Path(index): Path<usize>, State(state): State<AppState>) -> Response {
    image_attachment(&state.creative.state().images, index, ImagePrefix::Creative)
}

fn image_attachment(images: &[String], index: usize, prefix: ImagePrefix) -> Response {
    match export::image_at(images, index) {
        Ok((media_type, bytes)) => attachment(&media_type, &export::image_file_name(prefix, index), bytes),
        Err(ExportError::ImageIndex(_)) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            tracing::error!("❌ Stored image {} is not downloadable: {}", index, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn save_product_images(State(state): State<AppState>) -> Response {
    let images = state.studio.image_results();
    if images.is_empty() {
        return StatusCode::NOT_FOUND.into_response();
    }
    match export::write_downloads(&state.export_dir, &images, ImagePrefix::Product).await {
        Ok(files) => Json(json!({ "directory": state.export_dir, "files": files })).into_response(),
        Err(e) => {
            tracing::error!("❌ Failed to save images: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn export_text(State(state): State<AppState>) -> Response {
    let Some(text) = state.studio.text_result() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    attachment("text/plain; charset=utf-8", &export::text_file_name(&text.name), export::text_document(&text).into_bytes())
}

pub async fn export_pdf(State(state): State<AppState>) -> Response {
    let Some(text) = state.studio.text_result() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let file_name = export::text_file_name(&text.name).replace("-content.txt", "-listing.pdf");
    attachment("application/pdf", &file_name, export::listing_pdf(&text))
}

fn attachment(content_type: &str, file_name: &str, bytes: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", file_name)),
        ],
        bytes,
    )
        .into_response()
}

pub async fn get_creative(State(state): State<AppState>) -> Json<CreativeState> {
    Json(state.creative.state())
}

pub async fn generate_creative(State(state): State<AppState>, Json(body): Json<CreativeRequest>) -> Json<CreativeState> {
    tracing::info!("🎨 Creative generation requested ({:?} images)", body.count);
    Json(state.creative.generate(body.prompt, body.count).await)
}

pub async fn list_history(State(state): State<AppState>) -> Json<Vec<HistoryRecord>> {
    Json(state.studio.history())
}

pub async fn clear_history(State(state): State<AppState>) -> StatusCode {
    state.studio.clear_history().await;
    StatusCode::NO_CONTENT
}

pub async fn load_history(Path(id): Path<String>, State(state): State<AppState>) -> Response {
    if state.studio.load_history(&id) {
        Json(state.studio.snapshot()).into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}
