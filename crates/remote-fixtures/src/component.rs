//! Remote components and the built-in fixtures.

use std::fmt;
use std::sync::Arc;

use crate::finder::{Finder, Session};
use crate::render::{CellState, RenderRequest};
use crate::result::FixtureResult;
use crate::transport::{ComponentHandle, ComponentId};
use crate::Fixture;

/// A resolved remote component: its handle plus the session it came from.
///
/// Holding one never keeps remote state alive; if the component disappears,
/// the next remote call through it fails.
#[derive(Clone)]
pub struct RemoteComponent {
    handle: ComponentHandle,
    session: Arc<Session>,
}

impl fmt::Debug for RemoteComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteComponent")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for RemoteComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.handle, f)
    }
}

impl RemoteComponent {
    pub(crate) const fn new(handle: ComponentHandle, session: Arc<Session>) -> Self {
        Self { handle, session }
    }

    /// Remote handle
    #[must_use]
    pub const fn handle(&self) -> &ComponentHandle {
        &self.handle
    }

    /// Remote identity
    #[must_use]
    pub const fn id(&self) -> ComponentId {
        self.handle.id()
    }

    /// Widget kind
    #[must_use]
    pub fn kind(&self) -> &str {
        self.handle.kind()
    }

    /// Finder restricted to descendants of this component
    #[must_use]
    pub fn finder(&self) -> Finder {
        Finder::scoped(Arc::clone(&self.session), self.handle.clone())
    }

    /// Text this component's cell renderer paints for `cell`.
    ///
    /// Runs the render extractor on the UI owner thread of the remote side.
    pub fn rendered_text(&self, cell: CellState) -> FixtureResult<String> {
        let request = RenderRequest {
            source: self.id(),
            cell,
        };
        self.session.tree.render_cell(&request)
    }
}

/// Any component
#[derive(Debug, Clone, Fixture)]
#[fixture(any)]
pub struct ComponentFixture {
    remote: RemoteComponent,
}

/// A component with children; searches through it are scoped to it
#[derive(Debug, Clone, Fixture)]
#[fixture(kind = "Container", container)]
pub struct ContainerFixture {
    remote: RemoteComponent,
}

/// List whose items are painted by a cell renderer
#[derive(Debug, Clone, Fixture)]
#[fixture(kind = "List")]
pub struct ListFixture {
    remote: RemoteComponent,
}

impl ListFixture {
    /// Rendered text of item `index`
    pub fn item_text(&self, index: usize) -> FixtureResult<String> {
        self.remote.rendered_text(CellState::new(index))
    }

    /// Rendered text of item `index`, drawn as selected
    pub fn selected_item_text(&self, index: usize) -> FixtureResult<String> {
        self.remote
            .rendered_text(CellState::new(index).selected(true))
    }
}

/// Combo box whose entries are painted by a cell renderer
#[derive(Debug, Clone, Fixture)]
#[fixture(kind = "ComboBox")]
pub struct ComboBoxFixture {
    remote: RemoteComponent,
}

impl ComboBoxFixture {
    /// Rendered text of entry `index`
    pub fn item_text(&self, index: usize) -> FixtureResult<String> {
        self.remote.rendered_text(CellState::new(index))
    }

    /// Rendered text of entry `index` as it looks selected in the popup
    pub fn selected_item_text(&self, index: usize) -> FixtureResult<String> {
        self.remote
            .rendered_text(CellState::new(index).selected(true).focused(true))
    }
}
