//! Remote Fixtures: typed handles onto a remotely rendered UI.
//!
//! Tests describe components with [`Locator`]s and get back typed
//! [`Fixture`]s. Resolution polls the remote tree under a deadline; rendered
//! text of list-like components is extracted on the thread that owns the UI.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  test thread          │      UI owner thread     │
//! ├───────────────────────────────────────┼─────────────────────────┤
//! │  RemoteRobot / ContainerFixture       │                         │
//! │        │ find::<F>(locator)           │                         │
//! │        ▼                              │                         │
//! │  Finder ──poll──► RemoteTree::query ──┼──► component tree       │
//! │        │                              │                         │
//! │        ▼                              │                         │
//! │  FixtureRegistry ──► F                │                         │
//! │        │ item_text(i)                 │                         │
//! │        ▼                              │                         │
//! │  RemoteTree::render_cell ─────────────┼──► RenderExtractor      │
//! └───────────────────────────────────────┴─────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use remote_fixtures::mock::{MockComponent, MockRemote, MockUi};
//! use remote_fixtures::render::{CellHost, CellResult, CellState, FnRenderer, Label, ListSource};
//! use remote_fixtures::{ListFixture, RemoteRobot, SearchContext};
//!
//! let remote = MockRemote::spawn(|| {
//!     let fruits = ListSource::new(
//!         "fruits",
//!         vec!["Alpha", "Beta"],
//!         FnRenderer::new(|_: &CellHost, item: &&str, cell: CellState| -> CellResult {
//!             Ok(Box::new(Label::new(format!("{item} [{}]", cell.index))))
//!         }),
//!     );
//!     MockUi::new().with_root(MockComponent::new("List").renderer(fruits))
//! })
//! .unwrap();
//!
//! let robot = RemoteRobot::builder(remote).build().unwrap();
//! let list: ListFixture = robot.find_default().unwrap();
//! assert_eq!(list.item_text(0).unwrap(), "Alpha [0]");
//! ```

#![warn(missing_docs)]

// Generated code refers to `::remote_fixtures`.
extern crate self as remote_fixtures;

#[allow(clippy::missing_const_for_fn)]
mod component;
pub mod config;
mod finder;
mod fixture;
#[allow(clippy::missing_errors_doc)]
mod locator;
pub mod logging;
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod mock;
#[allow(clippy::missing_errors_doc)]
pub mod render;
mod result;
mod robot;
mod transport;
pub mod ui_thread;
pub mod wait;

pub use component::{
    ComboBoxFixture, ComponentFixture, ContainerFixture, ListFixture, RemoteComponent,
};
pub use config::FixturesConfig;
pub use finder::{Finder, SearchContext, LABEL_KIND};
pub use fixture::{Fixture, FixtureRegistry};
pub use locator::{Locator, TextMatch, TextPredicate};
pub use logging::{init_logging, LogFormat};
pub use remote_fixtures_derive::Fixture;
pub use render::{RenderExtractor, RenderRequest, RendererLookup, RendererSource};
pub use result::{FixtureError, FixtureResult, RenderError, TransportError};
pub use robot::{RemoteRobot, RemoteRobotBuilder};
pub use transport::{ComponentHandle, ComponentId, RemoteTree};
pub use ui_thread::UiThread;
pub use wait::{WaitOptions, Waiter};

/// Everything a test usually needs
pub mod prelude {
    pub use super::{
        ComboBoxFixture, ComponentFixture, ContainerFixture, Fixture, FixtureError,
        FixtureResult, FixturesConfig, ListFixture, Locator, RemoteComponent, RemoteRobot,
        SearchContext, TextMatch, WaitOptions,
    };
}
