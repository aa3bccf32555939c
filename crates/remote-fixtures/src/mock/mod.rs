//! In-process stand-in for the remote side.
//!
//! `MockUi` is a component tree owned by a dedicated UI thread; `MockRemote`
//! implements [`RemoteTree`](crate::RemoteTree) by evaluating locators and
//! render extractions there. Tests and demos use it in place of a real
//! transport.
//!
//! ```
//! use remote_fixtures::mock::{MockComponent, MockRemote, MockUi};
//! use remote_fixtures::{Locator, RemoteTree};
//!
//! let remote = MockRemote::spawn(|| {
//!     MockUi::new().with_root(MockComponent::new("Frame").child(MockComponent::new("Button")))
//! })
//! .unwrap();
//! let buttons = remote.query(None, &Locator::by_type("Button")).unwrap();
//! assert_eq!(buttons.len(), 1);
//! ```

mod remote;
mod ui;

pub use remote::MockRemote;
pub use ui::{MockComponent, MockUi, LABEL_FOR_ATTRIBUTE};
