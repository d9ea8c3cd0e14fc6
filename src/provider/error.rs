use crate::auth::AuthorizationError;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Raised while building a `TransactionLoader`.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("transaction loader requires a client source")]
    MissingClientSource,
    #[error("option `{0}` must not be empty")]
    EmptyOption(&'static str),
}

/// Failures handed to the error stage of the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("OAuth service provider requires session support")]
    NoSession,
    #[error("failed to deserialize client: {0}")]
    Lookup(#[source] BoxError),
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),
}

impl Error {
    pub fn lookup(e: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Lookup(Box::new(e))
    }

    /// Machine readable OAuth problem code, only set for authorization errors.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::Authorization(e) => Some(e.code()),
            _ => None,
        }
    }

    /// Whether the same transaction can be loaded again later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Lookup(_))
    }
}
