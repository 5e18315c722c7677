use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScrapflyError>;

#[derive(Debug, Error)]
pub enum ScrapflyError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed API response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ScrapflyError {
    fn from(err: reqwest::Error) -> Self {
        ScrapflyError::Network(err.to_string())
    }
}
