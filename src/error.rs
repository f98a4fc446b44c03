use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("service error: {0}")] Service(String),
    #[error("invalid response shape: {0}")] InvalidResponseShape(String),
    #[error("prompt must not be empty")] EmptyPrompt,
    #[error("image count must be between 1 and 4, got {0}")] InvalidImageCount(u8),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("uploaded file is empty")] Empty,
    #[error("unsupported media type: {0}")] UnsupportedMediaType(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io: {0}")] Io(#[from] std::io::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExportError {
    #[error("no image at index {0}")] ImageIndex(usize),
    #[error("invalid data uri: {0}")] InvalidDataUri(String),
}
