//! Owned runtime used by the blocking surface to drive asynchronous tools.

use std::future::Future;
use std::io;

use thiserror::Error;
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

/// Single-threaded tokio runtime scoped to one orchestration call.
#[derive(Debug)]
pub struct BlockingExecutor {
    runtime: Runtime,
}

impl BlockingExecutor {
    /// Starts a current-thread runtime with I/O and timers enabled.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::Startup`] when the runtime cannot be built.
    pub fn new() -> ExecutorResult<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|source| ExecutorError::Startup { source })?;
        debug!("blocking executor started");
        Ok(Self { runtime })
    }

    /// Drives `future` to completion on the calling thread.
    ///
    /// # Panics
    ///
    /// Panics when called from within an asynchronous execution context.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

/// Creates the executor on first use and reuses it afterwards.
#[derive(Debug, Default)]
pub(crate) struct LazyExecutor {
    executor: Option<BlockingExecutor>,
}

impl LazyExecutor {
    pub(crate) fn get(&mut self) -> ExecutorResult<&BlockingExecutor> {
        let executor = match self.executor.take() {
            Some(executor) => executor,
            None => BlockingExecutor::new()?,
        };
        Ok(self.executor.insert(executor))
    }

    #[cfg(test)]
    pub(crate) fn is_started(&self) -> bool {
        self.executor.is_some()
    }
}

/// Errors produced while starting the blocking executor.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The runtime could not be built.
    #[error("failed to start blocking executor: {source}")]
    Startup {
        /// Underlying I/O error.
        source: io::Error,
    },
}

/// Result alias for executor operations.
pub type ExecutorResult<T> = Result<T, ExecutorError>;
