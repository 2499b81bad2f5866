//! Deadline enforcement for long-running sandbox operations.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::{DaytonaError, Result};

/// Deadline applied when the caller does not pass one.
pub const DEFAULT_TIMEOUT_SECS: f64 = 60.0;

/// A validated deadline. `Unbounded` comes from an explicit `0` or a value
/// too large to represent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Deadline {
    Unbounded,
    After { secs: f64, duration: Duration },
}

impl Deadline {
    /// Resolve a caller-supplied timeout in seconds.
    ///
    /// `None` resolves to [`DEFAULT_TIMEOUT_SECS`], `0` disables the deadline,
    /// negative or non-finite values are rejected. Values too large for a
    /// [`Duration`] can never elapse and are treated like `0`.
    pub fn from_secs(timeout: Option<f64>) -> Result<Self> {
        let secs = timeout.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if !secs.is_finite() || secs < 0.0 {
            return Err(DaytonaError::Config(
                "Timeout must be a non-negative number or None.".to_string(),
            ));
        }
        if secs == 0.0 {
            return Ok(Deadline::Unbounded);
        }
        match Duration::try_from_secs_f64(secs) {
            Ok(duration) => Ok(Deadline::After { secs, duration }),
            Err(_) => Ok(Deadline::Unbounded),
        }
    }

    /// Seconds as the caller expressed them, `0` for no deadline.
    pub fn secs(&self) -> f64 {
        match self {
            Deadline::Unbounded => 0.0,
            Deadline::After { secs, .. } => *secs,
        }
    }

    /// Drive `fut` to completion or fail with a [`DaytonaError::Timeout`]
    /// built from `message` once the deadline passes.
    ///
    /// On expiry `fut` is dropped, which cancels whatever it was awaiting.
    pub async fn run<T, F, M>(self, message: M, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
        M: FnOnce(f64) -> String,
    {
        match self {
            Deadline::Unbounded => fut.await,
            Deadline::After { secs, duration } => match tokio::time::timeout(duration, fut).await
            {
                Ok(result) => result,
                Err(_) => {
                    debug!(timeout_secs = secs, "deadline exceeded, operation abandoned");
                    Err(DaytonaError::Timeout(message(secs)))
                }
            },
        }
    }
}

/// Validate `timeout` and run `fut` under it.
///
/// The template receives the timeout in seconds; capture whatever context the
/// message needs (usually the sandbox id) in the closure. When `timeout` is
/// invalid `fut` is never polled.
pub async fn with_timeout<T, F, M>(timeout: Option<f64>, message: M, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
    M: FnOnce(f64) -> String,
{
    Deadline::from_secs(timeout)?.run(message, fut).await
}

/// Render seconds the way users typed them: `60` rather than `60.0`.
pub(crate) fn format_secs(secs: f64) -> String {
    if secs.fract() == 0.0 {
        format!("{secs:.0}")
    } else {
        secs.to_string()
    }
}
