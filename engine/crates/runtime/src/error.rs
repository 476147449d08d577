#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no entity with uid {0}")]
    NotFound(crate::Uid),
    #[error("invalid regular expression `{pattern}`: {message}")]
    InvalidRegex { pattern: String, message: String },
    #[error("transaction aborted: {0}")]
    Aborted(String),
    #[error("store error: {0}")]
    Store(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
