use std::path::PathBuf;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Usage: crosspost <text to post>")]
    Usage,

    #[error(
        "Image {} is too large: {:.2} MB, allowed {:.2} MB",
        .path.display(),
        megabytes(.actual),
        megabytes(.limit)
    )]
    ImageTooLarge {
        path: PathBuf,
        actual: u64,
        limit: u64,
    },

    #[error("API error: {0}")]
    ApiError(String),

    #[error("HTTP {status} from remote API")]
    Http { status: u16, body: String },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Timeout waiting for server response")]
    Timeout,

    #[error("{0}")]
    Custom(String),
}

impl AppError {
    /// Ошибки, после которых процесс завершается с кодом 1
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Usage | AppError::ImageTooLarge { .. })
    }

    /// Тело ответа удалённого API, если оно есть
    pub fn details(&self) -> Option<String> {
        match self {
            AppError::Http { body, .. } if !body.trim().is_empty() => Some(body.clone()),
            _ => None,
        }
    }
}

fn megabytes(bytes: &u64) -> f64 {
    *bytes as f64 / BYTES_PER_MB
}

impl From<String> for AppError {
    fn from(s: String) -> Self {
        AppError::Custom(s)
    }
}

impl From<&str> for AppError {
    fn from(s: &str) -> Self {
        AppError::Custom(s.to_string())
    }
}
