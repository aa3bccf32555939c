//! Typed fixtures and their construction registry.
//!
//! A fixture wraps exactly one remote component handle. Fixtures are only
//! built by the registry, from a handle that just matched a locator, and are
//! never cached: every lookup resolves again.

use std::any::{self, Any, TypeId};
use std::collections::HashMap;
use tracing::trace;

use crate::component::{
    ComboBoxFixture, ComponentFixture, ContainerFixture, ListFixture, RemoteComponent,
};
use crate::locator::Locator;
use crate::result::{FixtureError, FixtureResult};

/// A typed wrapper around one remote component.
///
/// Usually derived:
///
/// ```
/// use remote_fixtures::{Fixture, RemoteComponent};
///
/// #[derive(Fixture)]
/// #[fixture(kind = "Button")]
/// struct ButtonFixture {
///     remote: RemoteComponent,
/// }
///
/// assert_eq!(ButtonFixture::default_locator().to_string(), "type 'Button'");
/// ```
pub trait Fixture: Sized + Send + 'static {
    /// Canonical locator used when the caller gives none
    fn default_locator() -> Locator;

    /// Wrap a resolved component.
    ///
    /// Must only store the handle; it may not talk to the remote side.
    fn from_remote(remote: RemoteComponent) -> Self;

    /// The wrapped component
    fn remote(&self) -> &RemoteComponent;
}

type Construct = fn(RemoteComponent) -> Box<dyn Any + Send>;

fn construct_boxed<F: Fixture>(remote: RemoteComponent) -> Box<dyn Any + Send> {
    Box::new(F::from_remote(remote))
}

/// Construction strategy for one fixture type
struct FixtureEntry {
    type_name: &'static str,
    default_locator: Locator,
    construct: Construct,
}

/// Maps fixture types to their construction strategy and default locator.
#[derive(Default)]
pub struct FixtureRegistry {
    entries: HashMap<TypeId, FixtureEntry>,
}

impl std::fmt::Debug for FixtureRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixtureRegistry")
            .field("fixtures", &self.type_names())
            .finish()
    }
}

impl FixtureRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in fixtures
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register::<ComponentFixture>();
        registry.register::<ContainerFixture>();
        registry.register::<ListFixture>();
        registry.register::<ComboBoxFixture>();
        registry
    }

    /// Register `F`. Returns `true` if it replaced an earlier registration.
    pub fn register<F: Fixture>(&mut self) -> bool {
        let entry = FixtureEntry {
            type_name: any::type_name::<F>(),
            default_locator: F::default_locator(),
            construct: construct_boxed::<F>,
        };
        trace!(fixture = entry.type_name, "registering fixture");
        self.entries.insert(TypeId::of::<F>(), entry).is_some()
    }

    /// Whether `F` is registered
    #[must_use]
    pub fn is_registered<F: Fixture>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<F>())
    }

    /// Number of registered fixture types
    #[must_use]
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Registered type names, sorted
    #[must_use]
    pub fn type_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.entries.values().map(|e| e.type_name).collect();
        names.sort_unstable();
        names
    }

    /// Default locator of `F`
    pub fn default_locator<F: Fixture>(&self) -> FixtureResult<Locator> {
        Ok(self.entry::<F>()?.default_locator.clone())
    }

    /// Fail unless `F` can be constructed
    pub fn ensure_registered<F: Fixture>(&self) -> FixtureResult<()> {
        self.entry::<F>().map(|_| ())
    }

    /// Build an `F` around `remote`
    pub fn construct<F: Fixture>(&self, remote: RemoteComponent) -> FixtureResult<F> {
        let entry = self.entry::<F>()?;
        (entry.construct)(remote)
            .downcast::<F>()
            .map(|fixture| *fixture)
            .map_err(|_| FixtureError::UnregisteredFixture {
                type_name: entry.type_name,
            })
    }

    fn entry<F: Fixture>(&self) -> FixtureResult<&FixtureEntry> {
        self.entries
            .get(&TypeId::of::<F>())
            .ok_or(FixtureError::UnregisteredFixture {
                type_name: any::type_name::<F>(),
            })
    }
}
