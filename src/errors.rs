use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error; // Use thiserror for cleaner error definitions
use uuid::Uuid;

// --- Domain/Infrastructure Errors ---

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("Meme not found with ID: {0}")]
    NotFound(Uuid),

    #[error("Database backend error: {0}")]
    BackendError(#[from] anyhow::Error), // Wrap Anyhow errors from DB layer

    #[error("Corrupt meme record: {0}")]
    DataCorruption(String),
}

/// Failures talking to the external media store. Transport and remote-service
/// errors are not retried.
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Failed to upload image to media store: {0}")]
    UploadFailed(String),

    #[error("Failed to delete image from media store: {0}")]
    DeleteFailed(String),
}

/// Failures from the caption model, classified by message content the way the
/// upstream API reports them.
#[derive(Error, Debug)]
pub enum CaptionError {
    #[error("Invalid Gemini API key")]
    InvalidCredential(String),

    #[error("API quota exceeded. Please try again later.")]
    QuotaExceeded(String),

    #[error("Failed to generate caption: {0}")]
    Generation(String),
}

impl CaptionError {
    /// Buckets a raw upstream failure message into the three caption error
    /// kinds: "API key" means a bad credential, "quota" means throttling,
    /// anything else is generic.
    pub fn classify(message: String) -> CaptionError {
        if message.contains("API key") {
            CaptionError::InvalidCredential(message)
        } else if message.contains("quota") {
            CaptionError::QuotaExceeded(message)
        } else {
            CaptionError::Generation(message)
        }
    }
}

// --- Web Layer Error ---

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid pagination parameters")]
    InvalidQuery,

    #[error("Meme not found")]
    NotFound,

    #[error("You are not authorized to delete this meme")]
    Forbidden,

    #[error("Could not save meme data")]
    Repository(#[source] RepoError),

    #[error("Media store operation failed")]
    Media(#[source] MediaError),

    #[error("Failed to generate caption")]
    Caption(#[source] CaptionError),

    // Configuration / Startup errors
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Initialization error: {0}")]
    Init(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(_) => AppError::NotFound,
            e => AppError::Repository(e),
        }
    }
}

impl From<MediaError> for AppError {
    fn from(err: MediaError) -> Self {
        AppError::Media(err)
    }
}

impl From<CaptionError> for AppError {
    fn from(err: CaptionError) -> Self {
        AppError::Caption(err)
    }
}

impl From<crate::config::ConfigError> for AppError {
    fn from(err: crate::config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

// --- Axum Response Implementation ---

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            // 4xx client errors carry their own message
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::InvalidQuery => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),

            // 5xx dependency failures respond with a generic message; the
            // underlying cause is logged, never sent to the client
            AppError::Repository(e) => {
                tracing::error!(error.source = ?e, "Repository error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::Media(e) => {
                tracing::error!(error.source = ?e, "Media store error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::Caption(e) => {
                tracing::error!(error.source = ?e, "Caption generation error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::Config(msg) | AppError::Init(msg) => {
                tracing::error!("Startup error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server Error".to_string())
            }
            AppError::Io(e) => {
                tracing::error!("IO error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server Error".to_string())
            }
        };

        tracing::debug!(error.message = %message, error.status = %status, "Responding with error");

        // Uniform failure envelope; detailed cause attached in debug builds only.
        let body = if cfg!(debug_assertions) {
            let detail = std::error::Error::source(&self).map(|s| s.to_string());
            serde_json::json!({ "success": false, "message": message, "error": detail })
        } else {
            serde_json::json!({ "success": false, "message": message })
        };

        (status, Json(body)).into_response()
    }
}
