//! Top-level entry point.

use std::sync::Arc;
use tracing::debug;

use crate::config::FixturesConfig;
use crate::finder::{Finder, SearchContext, Session};
use crate::fixture::{Fixture, FixtureRegistry};
use crate::result::FixtureResult;
use crate::transport::RemoteTree;
use crate::wait::WaitOptions;

/// Search context over the whole remote tree.
///
/// ```
/// use remote_fixtures::mock::{MockComponent, MockRemote, MockUi};
/// use remote_fixtures::{ComponentFixture, Locator, RemoteRobot, SearchContext};
///
/// let remote = MockRemote::spawn(|| {
///     MockUi::new().with_root(MockComponent::new("Button").text("OK"))
/// })
/// .unwrap();
/// let robot = RemoteRobot::builder(remote).build().unwrap();
/// let ok: ComponentFixture = robot.find(&Locator::by_text("OK")).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct RemoteRobot {
    finder: Finder,
    config: FixturesConfig,
}

impl RemoteRobot {
    /// Start building a robot over `tree`
    pub fn builder(tree: impl RemoteTree + 'static) -> RemoteRobotBuilder {
        RemoteRobotBuilder::new(Arc::new(tree))
    }

    /// Start building a robot over a shared tree
    #[must_use]
    pub fn builder_shared(tree: Arc<dyn RemoteTree>) -> RemoteRobotBuilder {
        RemoteRobotBuilder::new(tree)
    }

    /// Configuration the robot was built with
    #[must_use]
    pub const fn config(&self) -> &FixturesConfig {
        &self.config
    }

    /// Frozen fixture registry
    #[must_use]
    pub fn registry(&self) -> &FixtureRegistry {
        self.finder.registry()
    }
}

impl SearchContext for RemoteRobot {
    fn finder(&self) -> Finder {
        self.finder.clone()
    }
}

/// Builder for [`RemoteRobot`]
pub struct RemoteRobotBuilder {
    tree: Arc<dyn RemoteTree>,
    config: FixturesConfig,
    wait_options: Option<WaitOptions>,
    registry: FixtureRegistry,
}

impl std::fmt::Debug for RemoteRobotBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteRobotBuilder")
            .field("config", &self.config)
            .field("wait_options", &self.wait_options)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl RemoteRobotBuilder {
    fn new(tree: Arc<dyn RemoteTree>) -> Self {
        Self {
            tree,
            config: FixturesConfig::default(),
            wait_options: None,
            registry: FixtureRegistry::with_builtins(),
        }
    }

    /// Use `config`
    #[must_use]
    pub fn config(mut self, config: FixturesConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the wait options derived from the configuration
    #[must_use]
    pub fn wait_options(mut self, options: WaitOptions) -> Self {
        self.wait_options = Some(options);
        self
    }

    /// Register an extra fixture type
    #[must_use]
    pub fn register<F: Fixture>(mut self) -> Self {
        self.registry.register::<F>();
        self
    }

    /// Validate the configuration and the effective wait options, then
    /// freeze the registry
    pub fn build(self) -> FixtureResult<RemoteRobot> {
        self.config.validate()?;
        let options = self
            .wait_options
            .unwrap_or_else(|| self.config.wait_options());
        options.validate()?;
        debug!(
            fixtures = self.registry.count(),
            timeout_ms = options.timeout_ms,
            poll_interval_ms = options.poll_interval_ms,
            "remote robot ready"
        );
        let session = Session {
            tree: self.tree,
            registry: self.registry,
            options,
        };
        Ok(RemoteRobot {
            finder: Finder::root(Arc::new(session)),
            config: self.config,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::component::ComponentFixture;
    use crate::locator::Locator;
    use crate::mock::{MockComponent, MockRemote, MockUi};
    use crate::result::FixtureError;
    use std::time::Duration;

    fn remote() -> MockRemote {
        MockRemote::spawn(|| MockUi::new().with_root(MockComponent::new("Button").text("OK")))
            .unwrap()
    }

    #[test]
    fn test_defaults_from_config() {
        let robot = RemoteRobot::builder(remote()).build().unwrap();
        assert_eq!(robot.config(), &FixturesConfig::default());
        assert_eq!(robot.finder().options().timeout_ms, 5_000);
        assert_eq!(robot.registry().count(), 4);
    }

    #[test]
    fn test_config_drives_wait_options() {
        let config = FixturesConfig {
            timeout_ms: 120,
            poll_interval_ms: 10,
            ..FixturesConfig::default()
        };
        let robot = RemoteRobot::builder(remote()).config(config).build().unwrap();
        assert_eq!(robot.finder().options().timeout(), Duration::from_millis(120));
        let err = robot
            .find::<ComponentFixture>(&Locator::by_text("absent"))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_explicit_wait_options_win() {
        let robot = RemoteRobot::builder(remote())
            .wait_options(WaitOptions::new().with_timeout(42))
            .build()
            .unwrap();
        assert_eq!(robot.finder().options().timeout_ms, 42);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = FixturesConfig {
            poll_interval_ms: 0,
            ..FixturesConfig::default()
        };
        let err = RemoteRobot::builder(remote())
            .config(config)
            .build()
            .unwrap_err();
        assert!(matches!(err, FixtureError::Config { .. }));
    }

    #[test]
    fn test_explicit_zero_interval_rejected() {
        let remote = remote();
        let err = RemoteRobot::builder(remote.clone())
            .wait_options(WaitOptions::new().with_timeout(200).with_poll_interval(0))
            .build()
            .unwrap_err();
        assert!(matches!(err, FixtureError::Config { .. }));
        assert_eq!(remote.query_count(), 0);
    }

    #[test]
    fn test_explicit_unbounded_backoff_rejected() {
        let err = RemoteRobot::builder(remote())
            .wait_options(WaitOptions::new().with_backoff(f64::INFINITY, 250))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("backoff"));
    }

    #[test]
    fn test_huge_backoff_times_out_without_panicking() {
        let robot = RemoteRobot::builder(remote())
            .wait_options(
                WaitOptions::new()
                    .with_timeout(150)
                    .with_poll_interval(10)
                    .with_backoff(1.0e300, 40),
            )
            .build()
            .unwrap();
        let err = robot
            .find::<ComponentFixture>(&Locator::by_text("missing"))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_shared_tree() {
        let tree: Arc<dyn RemoteTree> = Arc::new(remote());
        let robot = RemoteRobot::builder_shared(tree).build().unwrap();
        assert!(robot.has_any(&Locator::by_text("OK")).unwrap());
    }
}
