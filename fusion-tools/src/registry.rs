//! Runtime registry for tool callables.

use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use fusion_primitives::{Error, Framework, ToolKind};
use tracing::debug;

use crate::ToolFunction;
use crate::schema::{ToolDefinition, extract};

/// Errors raised while registering tools.
pub type RegistrationError = Error;

#[derive(Default)]
struct Inner {
    sync: Vec<ToolFunction>,
    asynchronous: Vec<ToolFunction>,
}

/// Registry of blocking and asynchronous tools, kept in registration order.
///
/// Tool names are expected to be unique across both sets. When they are not,
/// every entry still appears in [`export_schemas`](Self::export_schemas) but
/// only the last registered one is reachable through
/// [`callable_by_name`](Self::callable_by_name).
#[derive(Default)]
pub struct ToolRegistry {
    inner: RwLock<Inner>,
    framework: Framework,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read().expect("tool registry poisoned");
        let sync: Vec<_> = inner.sync.iter().map(ToolFunction::name).collect();
        let asynchronous: Vec<_> = inner.asynchronous.iter().map(ToolFunction::name).collect();
        f.debug_struct("ToolRegistry")
            .field("framework", &self.framework)
            .field("sync", &sync)
            .field("async", &asynchronous)
            .finish()
    }
}

impl ToolRegistry {
    /// Creates an empty registry speaking the OpenAI-style wire shape.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the wire shape used when dispatching this registry's tools.
    #[must_use]
    pub fn with_framework(mut self, framework: Framework) -> Self {
        self.framework = framework;
        self
    }

    /// Returns the wire shape tag.
    #[must_use]
    pub const fn framework(&self) -> Framework {
        self.framework
    }

    /// Registers `function` under the supplied kind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`] for blank names and
    /// [`Error::KindMismatch`] when `kind` contradicts the callable body.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    pub fn register(&self, function: ToolFunction, kind: ToolKind) -> Result<(), RegistrationError> {
        validate_name(function.name())?;
        if function.kind() != kind {
            return Err(Error::KindMismatch {
                name: function.name().to_owned(),
                declared: kind,
                actual: function.kind(),
            });
        }

        let mut inner = self.inner.write().expect("tool registry poisoned");
        let shadows = inner
            .sync
            .iter()
            .chain(&inner.asynchronous)
            .any(|existing| existing.name() == function.name());
        if shadows {
            debug!(tool = function.name(), "tool name already registered; later registration wins");
        }

        debug!(tool = function.name(), %kind, "registering tool");
        match kind {
            ToolKind::Sync => inner.sync.push(function),
            ToolKind::Async => inner.asynchronous.push(function),
        }
        Ok(())
    }

    /// Registers `function` using a textual kind (`"sync"` or `"async"`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKind`] when `kind` is not recognised, plus every
    /// error of [`register`](Self::register).
    pub fn register_with_kind_str(&self, function: ToolFunction, kind: &str) -> Result<(), RegistrationError> {
        let kind = kind.parse::<ToolKind>()?;
        self.register(function, kind)
    }

    /// Registers `function` under the kind implied by its body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`] for blank names.
    pub fn register_tool(&self, function: ToolFunction) -> Result<(), RegistrationError> {
        let kind = function.kind();
        self.register(function, kind)
    }

    /// Registers a list of `(function, kind)` pairs in order.
    ///
    /// Registration stops at the first failing entry; earlier entries remain
    /// registered.
    ///
    /// # Errors
    ///
    /// Propagates the first error of [`register_with_kind_str`](Self::register_with_kind_str).
    pub fn register_list_tools<I, K>(&self, entries: I) -> Result<(), RegistrationError>
    where
        I: IntoIterator<Item = (ToolFunction, K)>,
        K: AsRef<str>,
    {
        for (function, kind) in entries {
            self.register_with_kind_str(function, kind.as_ref())?;
        }
        Ok(())
    }

    /// Registers a blocking tool and hands it back unchanged.
    ///
    /// # Errors
    ///
    /// See [`register`](Self::register).
    pub fn tool(&self, function: ToolFunction) -> Result<ToolFunction, RegistrationError> {
        self.register(function.clone(), ToolKind::Sync)?;
        Ok(function)
    }

    /// Registers an asynchronous tool and hands it back unchanged.
    ///
    /// # Errors
    ///
    /// See [`register`](Self::register).
    pub fn async_tool(&self, function: ToolFunction) -> Result<ToolFunction, RegistrationError> {
        self.register(function.clone(), ToolKind::Async)?;
        Ok(function)
    }

    /// Derives the tool list for the LLM: blocking tools first, then
    /// asynchronous ones, each in registration order.
    ///
    /// Schemas are recomputed on every call.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    #[must_use]
    pub fn export_schemas(&self) -> Vec<ToolDefinition> {
        let inner = self.inner.read().expect("tool registry poisoned");
        inner
            .sync
            .iter()
            .chain(&inner.asynchronous)
            .map(|function| ToolDefinition::function(extract(function)))
            .collect()
    }

    /// Returns the names of the tools registered under `kind`.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    #[must_use]
    pub fn names_by_kind(&self, kind: ToolKind) -> BTreeSet<String> {
        let inner = self.inner.read().expect("tool registry poisoned");
        let functions = match kind {
            ToolKind::Sync => &inner.sync,
            ToolKind::Async => &inner.asynchronous,
        };
        functions.iter().map(|function| function.name().to_owned()).collect()
    }

    /// Names of the blocking tools.
    #[must_use]
    pub fn name_tools(&self) -> BTreeSet<String> {
        self.names_by_kind(ToolKind::Sync)
    }

    /// Names of the asynchronous tools.
    #[must_use]
    pub fn name_async_tools(&self) -> BTreeSet<String> {
        self.names_by_kind(ToolKind::Async)
    }

    /// Maps every tool name to its callable. On collisions the last registered
    /// tool (asynchronous tools count as registered after blocking ones) wins.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    #[must_use]
    pub fn callable_by_name(&self) -> HashMap<String, ToolFunction> {
        let inner = self.inner.read().expect("tool registry poisoned");
        inner
            .sync
            .iter()
            .chain(&inner.asynchronous)
            .map(|function| (function.name().to_owned(), function.clone()))
            .collect()
    }

    /// Returns the number of registered tools, counting duplicates.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        let inner = self.inner.read().expect("tool registry poisoned");
        inner.sync.len() + inner.asynchronous.len()
    }

    /// Returns `true` when nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn validate_name(name: &str) -> Result<(), RegistrationError> {
    if name.trim().is_empty() {
        return Err(Error::InvalidName {
            name: name.to_owned(),
            reason: "tool name cannot be empty".into(),
        });
    }
    Ok(())
}
