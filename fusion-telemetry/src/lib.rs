//! Observability utilities.
//!
//! [`try_init_tracing`] installs a `fmt` subscriber filtered by `RUST_LOG`
//! (falling back to the supplied directive). [`Stopwatch`] backs the timing
//! output of the dispatch engine.

#![warn(missing_docs, clippy::pedantic)]

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Filter used when neither `RUST_LOG` nor an explicit directive is supplied.
pub const DEFAULT_FILTER: &str = "info";

/// Errors produced while installing the tracing subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The filter directive could not be parsed.
    #[error("invalid tracing filter `{directive}`: {reason}")]
    InvalidFilter {
        /// Offending directive.
        directive: String,
        /// Parser error message.
        reason: String,
    },

    /// A global subscriber is already installed.
    #[error("tracing subscriber already installed: {reason}")]
    AlreadyInstalled {
        /// Error reported by the subscriber registry.
        reason: String,
    },
}

/// Installs a global `fmt` subscriber.
///
/// `RUST_LOG` takes precedence over `default_directive`.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] for unparsable directives and
/// [`TelemetryError::AlreadyInstalled`] when a subscriber is already set.
pub fn try_init_tracing(default_directive: &str) -> Result<(), TelemetryError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directive).map_err(|err| {
            TelemetryError::InvalidFilter {
                directive: default_directive.to_owned(),
                reason: err.to_string(),
            }
        })?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|err| TelemetryError::AlreadyInstalled {
            reason: err.to_string(),
        })
}

/// Installs a global `fmt` subscriber, ignoring a subscriber that is already set.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] for unparsable directives.
pub fn init_tracing(default_directive: &str) -> Result<(), TelemetryError> {
    match try_init_tracing(default_directive) {
        Err(TelemetryError::AlreadyInstalled { .. }) | Ok(()) => Ok(()),
        Err(err) => Err(err),
    }
}

/// Measures elapsed wall-clock time.
#[derive(Clone, Copy, Debug)]
pub struct Stopwatch {
    started: Instant,
}

impl Stopwatch {
    /// Starts a new stopwatch.
    #[must_use]
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    /// Time elapsed since [`start`](Self::start).
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Milliseconds elapsed since [`start`](Self::start).
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::start()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopwatch_is_monotonic() {
        let watch = Stopwatch::start();
        std::thread::sleep(Duration::from_millis(5));
        assert!(watch.elapsed() >= Duration::from_millis(5));
        assert!(watch.elapsed_ms() >= 5.0);
    }

    #[test]
    fn second_initialisation_is_tolerated() {
        init_tracing("debug").expect("first install");
        init_tracing("debug").expect("second install is a no-op");
        let err = try_init_tracing("debug").expect_err("already installed");
        assert!(matches!(err, TelemetryError::AlreadyInstalled { .. }));
    }
}
