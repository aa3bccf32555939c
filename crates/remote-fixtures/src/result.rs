//! Result and error types for remote fixtures.

use std::time::Duration;
use thiserror::Error;

use crate::transport::ComponentId;

/// Result type for fixture operations
pub type FixtureResult<T> = Result<T, FixtureError>;

/// Errors that can occur while resolving or using fixtures
#[derive(Debug, Error)]
pub enum FixtureError {
    /// Resolution deadline elapsed without a single match
    #[error("Failed to find component {locator}{} in {timeout:?} ({attempts} attempts)", scope_suffix(.scope))]
    ComponentNotFound {
        /// Human description of the locator
        locator: String,
        /// Container the search was scoped to, if any
        scope: Option<String>,
        /// Deadline of the resolution attempt
        timeout: Duration,
        /// Number of queries issued
        attempts: usize,
        /// Transport failure still present at the deadline
        #[source]
        cause: Option<TransportError>,
    },

    /// Rendered text could not be extracted from a cell renderer
    #[error("Failed to extract rendered text from {component} at index {index}: {source}")]
    RenderExtraction {
        /// Renderer source component
        component: String,
        /// Model index requested
        index: usize,
        /// Underlying failure
        #[source]
        source: RenderError,
    },

    /// Non-transient transport failure
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Requested fixture type has no registered construction strategy
    #[error("No fixture registered for type {type_name}")]
    UnregisteredFixture {
        /// Rust type name of the fixture
        type_name: &'static str,
    },

    /// UI owner thread hand-off failed
    #[error("UI thread error: {message}")]
    UiThread {
        /// Error message
        message: String,
    },

    /// Generic wait condition never became true
    #[error("Timed out after {timeout:?} waiting for {description}")]
    WaitTimeout {
        /// What was waited for
        description: String,
        /// Deadline
        timeout: Duration,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn scope_suffix(scope: &Option<String>) -> String {
    scope
        .as_ref()
        .map(|s| format!(" within {s}"))
        .unwrap_or_default()
}

impl FixtureError {
    /// Create a UI thread error
    pub fn ui_thread(message: impl Into<String>) -> Self {
        Self::UiThread {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this is a resolution timeout
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::ComponentNotFound { .. })
    }
}

/// Failures reported by the remote tree accessor
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Remote side could not be reached
    #[error("remote unreachable: {message}")]
    Unreachable {
        /// Error message
        message: String,
    },

    /// Remote side did not answer in time
    #[error("remote call timed out after {ms}ms")]
    TimedOut {
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Remote side refused the request (bad query, unsupported locator)
    #[error("request rejected: {message}")]
    Rejected {
        /// Error message
        message: String,
    },

    /// Handle no longer refers to a live component
    #[error("component {id} no longer exists")]
    StaleComponent {
        /// Stale component
        id: ComponentId,
    },
}

impl TransportError {
    /// Create an unreachable error
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable {
            message: message.into(),
        }
    }

    /// Create a rejected error
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    /// Transient failures are retried while polling
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unreachable { .. } | Self::TimedOut { .. })
    }
}

/// Failures inside a single render extraction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// Model has no item at the requested index
    #[error("index {index} out of range for model of {len} items")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Model size
        len: usize,
    },

    /// Component exists but does not render cells
    #[error("component is not a renderer source")]
    NotARendererSource,

    /// Component does not exist on the UI side
    #[error("renderer source not found")]
    SourceNotFound,

    /// Cell renderer or paint returned an error
    #[error("renderer failed: {message}")]
    RendererFailed {
        /// Error message
        message: String,
    },

    /// Cell renderer or paint panicked
    #[error("renderer panicked: {message}")]
    Panicked {
        /// Panic payload
        message: String,
    },
}

impl RenderError {
    /// Create a renderer failure
    pub fn failed(message: impl Into<String>) -> Self {
        Self::RendererFailed {
            message: message.into(),
        }
    }
}
