/// Marker the API layer puts in messages for payloads that failed to decode.
///
/// The waiter treats any error carrying it as transient, including errors
/// produced outside this crate that only expose a message.
pub const VALIDATION_MARKER: &str = "validation error";

#[derive(Debug, thiserror::Error)]
pub enum DaytonaError {
    #[error("{0}")]
    Config(String),

    #[error("{kind} {id} failed to {verb} with state: {state}, error reason: {reason}")]
    Resource {
        kind: &'static str,
        id: String,
        verb: &'static str,
        state: String,
        reason: String,
    },

    #[error("{0}")]
    Timeout(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("api error ({status}): {message}")]
    Api {
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{prefix}{source}")]
    Context {
        prefix: &'static str,
        #[source]
        source: Box<DaytonaError>,
    },
}

pub type Result<T> = std::result::Result<T, DaytonaError>;

impl DaytonaError {
    /// Innermost error, looking through any [`DaytonaError::Context`] layers.
    pub fn root(&self) -> &DaytonaError {
        match self {
            DaytonaError::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether a failed state lookup should be retried by the waiter.
    ///
    /// Decode failures are transient by kind. Anything else only counts if
    /// its message carries [`VALIDATION_MARKER`], which mirrors how the
    /// service's other clients classify these errors.
    pub fn is_transient(&self) -> bool {
        match self.root() {
            DaytonaError::Validation(_) => true,
            other => other.to_string().contains(VALIDATION_MARKER),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.root(), DaytonaError::Timeout(_))
    }

    /// Wrap with an operation-specific prefix.
    pub fn context(self, prefix: &'static str) -> Self {
        DaytonaError::Context {
            prefix,
            source: Box::new(self),
        }
    }
}

/// Extension for attaching an operation prefix to a `Result`.
pub trait ResultExt<T> {
    fn context(self, prefix: &'static str) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, prefix: &'static str) -> Result<T> {
        self.map_err(|e| e.context(prefix))
    }
}
