// vim: tw=80
//! Per-mock configuration.

use std::{fmt, sync::Arc, time::Duration};

use crate::report::{DeferredReporter, Reporter};

/// How long [`verify`](crate::Mock::verify) waits for each in-flight
/// suspension-capable call before declaring it unsatisfied.
pub const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_millis(500);

/// Configuration for one mock instance.
///
/// # Examples
/// ```
/// # use callmock::*;
/// # use std::time::Duration;
/// let reporter = CollectingReporter::new();
/// let settings = Settings::new("Collaborator")
///     .reporter(reporter.clone())
///     .verify_timeout(Duration::from_millis(50))
///     .verify_on_drop(true);
/// assert_eq!(settings.get_name(), "Collaborator");
/// ```
#[derive(Clone)]
pub struct Settings {
    name: Arc<str>,
    reporter: Arc<dyn Reporter>,
    verify_timeout: Duration,
    verify_on_drop: bool,
}

impl Settings {
    /// Default settings, for a mock identified by `name` in failure messages.
    pub fn new<S: AsRef<str>>(name: S) -> Self {
        Settings {
            name: Arc::from(name.as_ref()),
            reporter: Arc::new(DeferredReporter::new()),
            verify_timeout: DEFAULT_VERIFY_TIMEOUT,
            verify_on_drop: false
        }
    }

    /// Default settings for mock type `M`, named after its last path segment.
    pub fn for_mock<M: ?Sized>() -> Self {
        let full = std::any::type_name::<M>();
        // Strip generic parameters before looking for the last path segment
        let base = full.split('<').next().unwrap_or(full);
        Self::new(base.rsplit("::").next().unwrap_or(base))
    }

    pub fn name<S: AsRef<str>>(mut self, name: S) -> Self {
        self.name = Arc::from(name.as_ref());
        self
    }

    /// Route failures to `reporter` instead of the default
    /// [`DeferredReporter`].
    pub fn reporter<R: Reporter + 'static>(mut self, reporter: R) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }

    pub fn verify_timeout(mut self, timeout: Duration) -> Self {
        self.verify_timeout = timeout;
        self
    }

    /// Run [`verify`](crate::Mock::verify) automatically when the mock is
    /// dropped.
    pub fn verify_on_drop(mut self, enabled: bool) -> Self {
        self.verify_on_drop = enabled;
        self
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_verify_timeout(&self) -> Duration {
        self.verify_timeout
    }

    pub(crate) fn shared_name(&self) -> Arc<str> {
        self.name.clone()
    }

    pub(crate) fn shared_reporter(&self) -> Arc<dyn Reporter> {
        self.reporter.clone()
    }

    pub(crate) fn should_verify_on_drop(&self) -> bool {
        self.verify_on_drop
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Settings")
            .field("name", &self.name)
            .field("verify_timeout", &self.verify_timeout)
            .field("verify_on_drop", &self.verify_on_drop)
            .finish_non_exhaustive()
    }
}
