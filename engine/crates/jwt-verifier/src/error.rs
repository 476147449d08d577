#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("no token in header {0}")]
    MissingToken(String),
    #[error("header {0} is not valid UTF-8")]
    InvalidHeader(String),
    #[error("invalid verification key: {0}")]
    InvalidKey(#[source] jsonwebtoken::errors::Error),
    #[error(transparent)]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("claim {0} is neither an object nor a JSON encoded object")]
    InvalidNamespace(String),
}
