//! Remote tree accessor.
//!
//! The boundary between the resolution engine and whatever transport carries
//! locators to the process that owns the UI. The engine only consumes this
//! trait; `crate::mock::MockRemote` is the in-process implementation.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::locator::Locator;
use crate::render::RenderRequest;
use crate::result::{FixtureResult, TransportError};

/// Identity of a node in the remote component tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentId(pub u64);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque reference to a remote component, owned by the accessor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentHandle {
    id: ComponentId,
    kind: String,
}

impl ComponentHandle {
    /// Create a handle
    #[must_use]
    pub fn new(id: ComponentId, kind: impl Into<String>) -> Self {
        Self {
            id,
            kind: kind.into(),
        }
    }

    /// Remote identity
    #[must_use]
    pub const fn id(&self) -> ComponentId {
        self.id
    }

    /// Widget kind reported when the handle was resolved
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }
}

impl fmt::Display for ComponentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind, self.id)
    }
}

/// Access to the live remote component tree.
///
/// Implementations must reflect the current remote state on every call and
/// must return an empty list, not an error, when nothing matches.
pub trait RemoteTree: Send + Sync {
    /// Find components matching `locator`, in traversal order.
    ///
    /// With a `scope`, only descendants of that component are searched.
    fn query(
        &self,
        scope: Option<&ComponentHandle>,
        locator: &Locator,
    ) -> Result<Vec<ComponentHandle>, TransportError>;

    /// Run the render extractor on the side that owns the UI.
    fn render_cell(&self, request: &RenderRequest) -> FixtureResult<String>;
}
