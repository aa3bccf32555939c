//! Component resolution engine.
//!
//! `Finder::find` polls the remote tree until something matches or the
//! deadline passes, then wraps the first match in the requested fixture.
//! `Finder::find_all` asks once and returns whatever is there.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

use crate::component::{ComponentFixture, RemoteComponent};
use crate::fixture::{Fixture, FixtureRegistry};
use crate::locator::{Locator, TextMatch};
use crate::result::{FixtureError, FixtureResult, TransportError};
use crate::transport::{ComponentHandle, RemoteTree};
use crate::wait::{WaitFailure, WaitOptions, WaitResult, Waiter};

/// Widget kind of labels resolved by `find_labeled`
pub const LABEL_KIND: &str = "Label";

/// State shared by every finder and component created from one robot
pub(crate) struct Session {
    pub(crate) tree: Arc<dyn RemoteTree>,
    pub(crate) registry: FixtureRegistry,
    pub(crate) options: WaitOptions,
}

/// Resolves locators against the whole tree or below one component
#[derive(Clone)]
pub struct Finder {
    session: Arc<Session>,
    scope: Option<ComponentHandle>,
}

impl std::fmt::Debug for Finder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Finder")
            .field("scope", &self.scope)
            .field("options", &self.session.options)
            .finish_non_exhaustive()
    }
}

impl Finder {
    pub(crate) const fn root(session: Arc<Session>) -> Self {
        Self {
            session,
            scope: None,
        }
    }

    pub(crate) const fn scoped(session: Arc<Session>, scope: ComponentHandle) -> Self {
        Self {
            session,
            scope: Some(scope),
        }
    }

    /// Component searches are restricted to, if any
    #[must_use]
    pub const fn scope(&self) -> Option<&ComponentHandle> {
        self.scope.as_ref()
    }

    /// Default wait options
    #[must_use]
    pub fn options(&self) -> &WaitOptions {
        &self.session.options
    }

    /// Fixture registry in use
    #[must_use]
    pub fn registry(&self) -> &FixtureRegistry {
        &self.session.registry
    }

    /// Resolve one `F` with the default timeout
    pub fn find<F: Fixture>(&self, locator: &Locator) -> FixtureResult<F> {
        self.find_with_options(locator, &self.session.options)
    }

    /// Resolve one `F`, waiting at most `timeout`
    pub fn find_with_timeout<F: Fixture>(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> FixtureResult<F> {
        let options = self.session.options.clone().with_timeout_duration(timeout);
        self.find_with_options(locator, &options)
    }

    /// Resolve one `F` using its registered default locator
    pub fn find_default<F: Fixture>(&self) -> FixtureResult<F> {
        let locator = self.session.registry.default_locator::<F>()?;
        self.find(&locator)
    }

    /// Resolve one `F` under explicit wait options.
    ///
    /// The first query is issued immediately. If several components match,
    /// the first one in the order the remote side reports them is taken.
    /// Options that would busy-loop are rejected before the first query.
    /// Transient transport failures are retried until the deadline; one that
    /// is still failing at the deadline becomes the cause of the
    /// `ComponentNotFound` error. Other transport failures end the search.
    pub fn find_with_options<F: Fixture>(
        &self,
        locator: &Locator,
        options: &WaitOptions,
    ) -> FixtureResult<F> {
        self.session.registry.ensure_registered::<F>()?;
        options.validate()?;
        debug!(
            %locator,
            scope = ?self.scope.as_ref().map(ToString::to_string),
            timeout_ms = options.timeout_ms,
            "resolving component"
        );

        let waiter = Waiter::with_options(options.clone());
        let outcome = waiter.poll(|| {
            let handles = self.query(locator)?;
            if handles.len() > 1 {
                trace!(%locator, matches = handles.len(), "multiple matches, taking the first");
            }
            Ok(handles.into_iter().next())
        });

        match outcome {
            Ok(WaitResult {
                value,
                elapsed,
                attempts,
            }) => {
                debug!(%locator, component = %value, ?elapsed, attempts, "component resolved");
                self.wrap(value)
            }
            Err(WaitFailure::TimedOut {
                elapsed,
                attempts,
                last_error,
            }) => {
                debug!(%locator, ?elapsed, attempts, cause = ?last_error, "component not found");
                Err(FixtureError::ComponentNotFound {
                    locator: locator.description(),
                    scope: self.scope.as_ref().map(ToString::to_string),
                    timeout: options.timeout(),
                    attempts,
                    cause: last_error,
                })
            }
            Err(WaitFailure::Aborted(error)) => {
                debug!(%locator, %error, "resolution aborted");
                Err(FixtureError::Transport(error))
            }
        }
    }

    /// Resolve one `F` through the label describing it.
    ///
    /// The label (a `Label` whose text matches `label_text`) is resolved
    /// first; `F` is then searched with its default locator narrowed to the
    /// component that label is attached to. Both lookups wait.
    pub fn find_labeled<F: Fixture>(
        &self,
        label_text: &str,
        matching: TextMatch,
    ) -> FixtureResult<F> {
        let default = self.session.registry.default_locator::<F>()?;
        let label: ComponentFixture = self.find(
            &Locator::by_type(LABEL_KIND).with(Locator::by_text_with(label_text, matching)),
        )?;
        self.find(&default.with(Locator::by_label(&label)))
    }

    /// Every current match as `F`, in remote order. Never waits.
    pub fn find_all<F: Fixture>(&self, locator: &Locator) -> FixtureResult<Vec<F>> {
        self.session.registry.ensure_registered::<F>()?;
        let handles = self.query(locator)?;
        trace!(%locator, matches = handles.len(), "find_all");
        handles.into_iter().map(|handle| self.wrap(handle)).collect()
    }

    /// All current matches of `F`'s default locator
    pub fn find_all_default<F: Fixture>(&self) -> FixtureResult<Vec<F>> {
        let locator = self.session.registry.default_locator::<F>()?;
        self.find_all(&locator)
    }

    /// Whether anything matches right now
    pub fn has_any(&self, locator: &Locator) -> FixtureResult<bool> {
        Ok(!self.query(locator)?.is_empty())
    }

    /// Wait until nothing matches `locator`
    pub fn wait_for_absence(&self, locator: &Locator, timeout: Duration) -> FixtureResult<()> {
        let options = self.session.options.clone().with_timeout_duration(timeout);
        let outcome = Waiter::with_options(options).poll(|| {
            let handles = self.query(locator)?;
            Ok(handles.is_empty().then_some(()))
        });
        match outcome {
            Ok(_) => Ok(()),
            Err(WaitFailure::TimedOut { .. }) => Err(FixtureError::WaitTimeout {
                description: format!("no component matching {locator}"),
                timeout,
            }),
            Err(WaitFailure::Aborted(error)) => Err(FixtureError::Transport(error)),
        }
    }

    fn query(&self, locator: &Locator) -> Result<Vec<ComponentHandle>, TransportError> {
        self.session.tree.query(self.scope.as_ref(), locator)
    }

    fn wrap<F: Fixture>(&self, handle: ComponentHandle) -> FixtureResult<F> {
        let remote = RemoteComponent::new(handle, Arc::clone(&self.session));
        self.session.registry.construct(remote)
    }
}

/// Anything fixtures can be searched from: the robot or a container.
///
/// Only `finder` has to be provided; nested containers compose because each
/// container's finder is scoped to its own component.
pub trait SearchContext {
    /// Finder for this context
    fn finder(&self) -> Finder;

    /// Resolve one `F` with the default timeout
    fn find<F: Fixture>(&self, locator: &Locator) -> FixtureResult<F> {
        self.finder().find(locator)
    }

    /// Resolve one `F`, waiting at most `timeout`
    fn find_with_timeout<F: Fixture>(&self, locator: &Locator, timeout: Duration) -> FixtureResult<F> {
        self.finder().find_with_timeout(locator, timeout)
    }

    /// Resolve one `F` by its default locator
    fn find_default<F: Fixture>(&self) -> FixtureResult<F> {
        self.finder().find_default()
    }

    /// Resolve one `F` through the label attached to it
    fn find_labeled<F: Fixture>(&self, label_text: &str, matching: TextMatch) -> FixtureResult<F> {
        self.finder().find_labeled(label_text, matching)
    }

    /// Every current match as `F`
    fn find_all<F: Fixture>(&self, locator: &Locator) -> FixtureResult<Vec<F>> {
        self.finder().find_all(locator)
    }

    /// Every current match of `F`'s default locator
    fn find_all_default<F: Fixture>(&self) -> FixtureResult<Vec<F>> {
        self.finder().find_all_default()
    }

    /// Whether anything matches right now
    fn has_any(&self, locator: &Locator) -> FixtureResult<bool> {
        self.finder().has_any(locator)
    }

    /// Wait until nothing matches `locator`
    fn wait_for_absence(&self, locator: &Locator, timeout: Duration) -> FixtureResult<()> {
        self.finder().wait_for_absence(locator, timeout)
    }
}
