use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum CryptoError {
    #[error("invalid point encoding: {0}")]
    InvalidPoint(&'static str),
    #[error("invalid secret key")]
    InvalidSecretKey,
    #[error("invalid signature encoding: {0}")]
    InvalidSignature(&'static str),
    #[error("signature recovery failed")]
    RecoveryFailed,
}
