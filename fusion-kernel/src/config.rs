//! Dispatch configuration.

use serde::{Deserialize, Serialize};

/// Default ceiling on chained tool-call rounds.
pub const DEFAULT_MAX_CHAINED_CALLS: usize = 5;

/// Options recognised by the dispatch engine.
///
/// Every field is optional when deserialised, so the struct can be embedded in
/// a larger configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    verbose: bool,
    verbose_time: bool,
    clean_messages: bool,
    use_async_poll: bool,
    max_chained_calls: usize,
}

impl DispatchConfig {
    /// Creates the default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            verbose: false,
            verbose_time: false,
            clean_messages: false,
            use_async_poll: false,
            max_chained_calls: DEFAULT_MAX_CHAINED_CALLS,
        }
    }

    /// Raises progress lines from `debug` to `info`.
    #[must_use]
    pub const fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Emits per-invocation and total timings.
    #[must_use]
    pub const fn with_verbose_time(mut self, verbose_time: bool) -> Self {
        self.verbose_time = verbose_time;
        self
    }

    /// Collapses the terminal response to its textual content.
    #[must_use]
    pub const fn with_clean_messages(mut self, clean_messages: bool) -> Self {
        self.clean_messages = clean_messages;
        self
    }

    /// Runs the asynchronous tools of one response concurrently.
    #[must_use]
    pub const fn with_async_poll(mut self, use_async_poll: bool) -> Self {
        self.use_async_poll = use_async_poll;
        self
    }

    /// Sets the number of tool rounds allowed before a final answer is demanded.
    #[must_use]
    pub const fn with_max_chained_calls(mut self, max_chained_calls: usize) -> Self {
        self.max_chained_calls = max_chained_calls;
        self
    }

    /// Returns `true` when progress lines are logged at `info`.
    #[must_use]
    pub const fn verbose(self) -> bool {
        self.verbose
    }

    /// Returns `true` when timings are logged.
    #[must_use]
    pub const fn verbose_time(self) -> bool {
        self.verbose_time
    }

    /// Returns `true` when the terminal response is reduced to text.
    #[must_use]
    pub const fn clean_messages(self) -> bool {
        self.clean_messages
    }

    /// Returns `true` when asynchronous tools are batched.
    #[must_use]
    pub const fn use_async_poll(self) -> bool {
        self.use_async_poll
    }

    /// Returns the chained round ceiling.
    #[must_use]
    pub const fn max_chained_calls(self) -> usize {
        self.max_chained_calls
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self::new()
    }
}
