use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChuggError {
    #[error("Request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),
    #[error("Authentication failure: {0}")]
    AuthenticationFailed(String),
    #[error("Invalid ISBN '{0}': expected at least 3 alphanumeric characters")]
    InvalidIsbn(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = anyhow::Result<T, ChuggError>;
