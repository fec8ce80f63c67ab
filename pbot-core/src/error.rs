use thiserror::Error;

/// Errors reported by a backend adapter.
///
/// `Clone` so one failed fetch can be handed to every caller waiting on the same hydration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PuppetError {
    #[error("Operation not supported by backend: {0}")]
    Unsupported(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("IO error: {0}")]
    Io(String),
}

impl PuppetError {
    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }
}

impl From<std::io::Error> for PuppetError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

pub type PuppetResult<T> = std::result::Result<T, PuppetError>;
