use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("DOCX error: {0}")]
    Docx(String),

    #[error("HTML error: {0}")]
    Html(String),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("OPENAI_API_KEY is not set and settings contain no api_key")]
    MissingApiKey,

    #[error("Task error: {0}")]
    Task(String),

    #[error("Server error: {0}")]
    Server(String),
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Task(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
