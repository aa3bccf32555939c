//! Mock remote side driving a `MockUi` on its own UI thread.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::trace;

use super::ui::MockUi;
use crate::config::FixturesConfig;
use crate::locator::Locator;
use crate::render::{RenderExtractor, RenderRequest};
use crate::result::{FixtureResult, TransportError};
use crate::transport::{ComponentHandle, RemoteTree};
use crate::ui_thread::UiThread;

/// [`RemoteTree`] over a [`MockUi`] with failure injection.
///
/// Locators travel in their JSON wire form, as they would over a real
/// transport. Clones share the UI thread and the injection counters.
#[derive(Debug, Clone)]
pub struct MockRemote {
    ui: UiThread<MockUi>,
    extractor: RenderExtractor<MockUi>,
    failures: Arc<AtomicUsize>,
    rejections: Arc<AtomicUsize>,
    queries: Arc<AtomicUsize>,
}

impl MockRemote {
    /// Spawn with the default configuration.
    ///
    /// `init` runs on the new UI thread, so the tree it builds never has to
    /// be `Send`.
    pub fn spawn<I>(init: I) -> FixtureResult<Self>
    where
        I: FnOnce() -> MockUi + Send + 'static,
    {
        Self::spawn_with_config(&FixturesConfig::default(), init)
    }

    /// Spawn using the thread name and render fallback height of `config`
    pub fn spawn_with_config<I>(config: &FixturesConfig, init: I) -> FixtureResult<Self>
    where
        I: FnOnce() -> MockUi + Send + 'static,
    {
        config.validate()?;
        let ui = UiThread::spawn(config.ui_thread_name.clone(), init)?;
        let extractor =
            RenderExtractor::new(ui.clone()).with_fallback_height(config.render_fallback_height);
        Ok(Self {
            ui,
            extractor,
            failures: Arc::new(AtomicUsize::new(0)),
            rejections: Arc::new(AtomicUsize::new(0)),
            queries: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Make the next `count` queries fail as unreachable (transient)
    pub fn fail_next(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    /// Make the next `count` queries be rejected (non-transient)
    pub fn reject_next(&self, count: usize) {
        self.rejections.store(count, Ordering::SeqCst);
    }

    /// Queries received so far, failed ones included
    #[must_use]
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Change the tree on its UI thread
    pub fn mutate<R, F>(&self, change: F) -> FixtureResult<R>
    where
        F: FnOnce(&mut MockUi) -> R + Send + 'static,
        R: Send + 'static,
    {
        self.ui.run_sync(move |ui| Ok(change(ui)))
    }

    /// The UI owner thread
    #[must_use]
    pub const fn ui_thread(&self) -> &UiThread<MockUi> {
        &self.ui
    }
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

impl RemoteTree for MockRemote {
    fn query(
        &self,
        scope: Option<&ComponentHandle>,
        locator: &Locator,
    ) -> Result<Vec<ComponentHandle>, TransportError> {
        let attempt = self.queries.fetch_add(1, Ordering::SeqCst) + 1;
        if take_one(&self.failures) {
            trace!(attempt, "injected unreachable failure");
            return Err(TransportError::unreachable("injected failure"));
        }
        if take_one(&self.rejections) {
            trace!(attempt, "injected rejection");
            return Err(TransportError::rejected("injected rejection"));
        }

        let wire = locator
            .to_query()
            .map_err(|e| TransportError::rejected(e.to_string()))?;
        let scope = scope.map(ComponentHandle::id);
        let outcome = self.ui.run_sync(move |ui| {
            let locator = match Locator::from_query(&wire) {
                Ok(locator) => locator,
                Err(e) => return Ok(Err(TransportError::rejected(e.to_string()))),
            };
            Ok(ui.query(scope, &locator))
        });
        match outcome {
            Ok(result) => result,
            Err(error) => Err(TransportError::unreachable(error.to_string())),
        }
    }

    fn render_cell(&self, request: &RenderRequest) -> FixtureResult<String> {
        self.extractor.extract(request)
    }
}
