use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Secure storage unavailable: {0}")]
    SecureStorageUnavailable(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;

/// Failure reasons from decoding a JWT.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtError {
    #[error("Not enough segments")]
    NotEnoughSegments,

    #[error("Payload is not correctly encoded as base64: {0}")]
    InvalidBase64(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}
