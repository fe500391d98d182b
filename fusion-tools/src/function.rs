//! Callable wrappers exposed to the LLM as tools.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use fusion_primitives::ToolKind;
use serde_json::Value;
use thiserror::Error;

/// Result alias for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Future alias produced by asynchronous tool bindings.
pub type ToolFuture = Pin<Box<dyn Future<Output = ToolResult<Value>> + Send>>;

/// Trait implemented by asynchronous tool bodies.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Invokes the tool with the given JSON arguments, returning JSON output.
    async fn invoke(&self, input: Value) -> ToolResult<Value>;
}

#[async_trait]
impl<F, Fut> Tool for F
where
    F: Send + Sync + Fn(Value) -> Fut,
    Fut: Future<Output = ToolResult<Value>> + Send,
{
    async fn invoke(&self, input: Value) -> ToolResult<Value> {
        (self)(input).await
    }
}

/// Trait implemented by blocking tool bodies.
pub trait BlockingTool: Send + Sync {
    /// Invokes the tool on the calling thread.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] when the arguments cannot be decoded or the
    /// implementation fails.
    fn call(&self, input: Value) -> ToolResult<Value>;
}

impl<F> BlockingTool for F
where
    F: Send + Sync + Fn(Value) -> ToolResult<Value>,
{
    fn call(&self, input: Value) -> ToolResult<Value> {
        (self)(input)
    }
}

/// Executable body of a tool.
#[derive(Clone)]
pub enum ToolBody {
    /// Runs to completion on the calling thread.
    Blocking(Arc<dyn BlockingTool>),
    /// Produces a future that must be awaited.
    Async(Arc<dyn Tool>),
}

impl ToolBody {
    /// Returns the execution kind implied by the body.
    #[must_use]
    pub const fn kind(&self) -> ToolKind {
        match self {
            Self::Blocking(_) => ToolKind::Sync,
            Self::Async(_) => ToolKind::Async,
        }
    }
}

/// A named callable plus the documentation its schema is derived from.
#[derive(Clone)]
pub struct ToolFunction {
    name: String,
    documentation: Option<String>,
    body: ToolBody,
}

impl fmt::Debug for ToolFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolFunction")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .field("documented", &self.documentation.is_some())
            .finish_non_exhaustive()
    }
}

impl ToolFunction {
    /// Wraps a blocking body.
    #[must_use]
    pub fn sync<T>(name: impl Into<String>, body: T) -> Self
    where
        T: BlockingTool + 'static,
    {
        Self {
            name: name.into(),
            documentation: None,
            body: ToolBody::Blocking(Arc::new(body)),
        }
    }

    /// Wraps an asynchronous body.
    #[must_use]
    pub fn asynchronous<T>(name: impl Into<String>, body: T) -> Self
    where
        T: Tool + 'static,
    {
        Self {
            name: name.into(),
            documentation: None,
            body: ToolBody::Async(Arc::new(body)),
        }
    }

    /// Attaches the documentation comment used for schema extraction.
    #[must_use]
    pub fn with_documentation(mut self, documentation: impl Into<String>) -> Self {
        let documentation = documentation.into();
        self.documentation = if documentation.trim().is_empty() {
            None
        } else {
            Some(documentation)
        };
        self
    }

    /// Returns the declared tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the raw documentation, if any.
    #[must_use]
    pub fn documentation(&self) -> Option<&str> {
        self.documentation.as_deref()
    }

    /// Returns the executable body.
    #[must_use]
    pub fn body(&self) -> &ToolBody {
        &self.body
    }

    /// Returns the execution kind implied by the body.
    #[must_use]
    pub const fn kind(&self) -> ToolKind {
        self.body.kind()
    }
}

/// Errors produced while decoding arguments for or executing a tool.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// Arguments could not be decoded into the expected shape.
    #[error("invalid arguments: {reason}")]
    InvalidArguments {
        /// Decoder error message.
        reason: String,
    },

    /// A required argument was absent.
    #[error("missing required argument `{name}`")]
    MissingArgument {
        /// Name of the missing parameter.
        name: String,
    },

    /// Requested tool does not exist.
    #[error("tool `{name}` is not registered")]
    UnknownTool {
        /// Name of the missing tool.
        name: String,
    },

    /// Tool execution failed.
    #[error("{reason}")]
    Execution {
        /// Human-readable error returned by the tool implementation.
        reason: String,
    },

    /// The tool body panicked.
    #[error("tool panicked: {reason}")]
    Panicked {
        /// Panic payload rendered as text.
        reason: String,
    },
}

impl ToolError {
    /// Creates an execution error from the supplied reason.
    #[must_use]
    pub fn execution(reason: impl Into<String>) -> Self {
        Self::Execution {
            reason: reason.into(),
        }
    }

    /// Creates an argument decoding error from the supplied reason.
    #[must_use]
    pub fn invalid_arguments(reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            reason: reason.into(),
        }
    }
}
