use thiserror::Error;

#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Invalid reachability host: {0}")]
    InvalidHost(String),

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Session configuration rejected: {0}")]
    Configuration(String),

    #[error("Logging initialization failed: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, HttpError>;
