use base64::Engine;
use tracing::info;

use crate::{error::UploadError, models::UploadedImage};

impl UploadedImage {
    /// Accepts one selected file. Only `image/*` types pass; a missing or generic
    /// declared type is replaced by the type sniffed from the bytes.
    pub fn from_upload(content: Vec<u8>, declared: Option<&str>) -> Result<Self, UploadError> {
        if content.is_empty() {
            return Err(UploadError::Empty);
        }
        let declared = declared
            .map(|d| d.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
            .filter(|d| !d.is_empty() && d != "application/octet-stream");

        let media_type = match declared {
            Some(d) => d,
            None => image::guess_format(&content)
                .map(|f| f.to_mime_type().to_string())
                .map_err(|_| UploadError::UnsupportedMediaType("unknown".into()))?,
        };
        if !media_type.starts_with("image/") {
            return Err(UploadError::UnsupportedMediaType(media_type));
        }
        info!("🖼️ Accepted upload: {} ({} bytes)", media_type, content.len());
        Ok(Self { content, media_type })
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.content)
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.to_base64())
    }
}
