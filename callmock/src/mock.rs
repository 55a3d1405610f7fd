// vim: tw=80
//! The mock side of the library: the base every hand-written mock wraps, and
//! the trait that gives it the `expect` family of methods.

use std::{
    any,
    fmt,
    future::Future,
    panic::Location,
    sync::{Arc, Mutex},
    thread,
};

use downcast::*;
use futures::FutureExt;
use tracing::{debug, warn};

use crate::{
    codec::{Args, Call},
    expectation::{Claimed, DeclareFn, Expectation, ExpectationBuilder,
                  Recorder},
    lock,
    outcome::{self, Outcome, Payload},
    promise::Promise,
    registry::Registry,
    report::{Failure, Reporter},
    settings::Settings,
};

/// The four kinds of mocked method.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Shape {
    pub asynchronous: bool,
    pub raising: bool,
}

impl Shape {
    const SYNC: Shape = Shape{asynchronous: false, raising: false};
    const SYNC_RAISING: Shape = Shape{asynchronous: false, raising: true};
    const ASYNC: Shape = Shape{asynchronous: true, raising: false};
    const ASYNC_RAISING: Shape = Shape{asynchronous: true, raising: true};
}

/// What a call handler tells a mocked method to do.
pub enum Delivery {
    /// Return this, or nothing
    Value(Option<Payload>),
    /// Raise this
    Error(Payload),
    /// Suspend until the promise resolves
    Pending(Promise),
    /// Suspend forever
    Never,
}

/// Receives every call made through a [`MockBase`].
///
/// A consuming mock matches calls against its expectations.  The throwaway
/// mock handed to a declare block only records them.
pub trait CallHandler: Any + Send + Sync {
    fn accept(
        &self,
        summary: String,
        shape: Shape,
        args: Args,
        location: &'static Location<'static>
    ) -> Delivery;
}

downcast!(dyn CallHandler);

/// The state of a mock that's in use by the code under test.
pub(crate) struct Consumer {
    settings: Settings,
    registry: Mutex<Registry>,
}

impl Consumer {
    fn new(settings: Settings) -> Self {
        Consumer {
            settings,
            registry: Mutex::new(Registry::default())
        }
    }

    fn name(&self) -> String {
        self.settings.get_name().to_owned()
    }

    fn report(&self, failure: Failure, location: &'static Location<'static>) {
        warn!(%failure, %location);
        self.settings.shared_reporter().report(failure, location);
    }

    pub(crate) fn expect(
        &self,
        declare: DeclareFn,
        asynchronous: bool,
        location: &'static Location<'static>
    ) -> Arc<Mutex<Expectation>> {
        let e = Expectation::new(self.settings.shared_name(),
            self.settings.shared_reporter(), location, declare, asynchronous);
        let mut registry = lock(&self.registry);
        let e = registry.create(e);
        debug!(mock = %self.settings.get_name(), %location, asynchronous,
            outstanding = registry.len(), "declared expectation");
        e
    }

    /// Report every expectation that hasn't been claimed, and forget them all.
    ///
    /// Failures are reported at `location`, or where each expectation was
    /// declared if there is none.  Suspension-capable expectations get a grace
    /// period, in case their call is still on its way.
    pub(crate) fn verify(&self, location: Option<&'static Location<'static>>) {
        let in_flight = lock(&self.registry).in_flight();
        let timeout = self.settings.get_verify_timeout();
        for latch in in_flight {
            if !latch.wait_timeout(timeout) {
                debug!(mock = %self.settings.get_name(), ?timeout,
                    "timed out waiting for an in-flight call");
            }
        }
        let unsatisfied = lock(&self.registry).drain_unclaimed();
        debug!(mock = %self.settings.get_name(),
            unsatisfied = unsatisfied.len(), "verified");
        for (summary, declared) in unsatisfied {
            self.report(Failure::Unsatisfied{mock: self.name(), summary},
                location.unwrap_or(declared));
        }
    }

    /// Check that `outcome` suits a call of this `shape`, and unwrap it.
    fn deliver(outcome: Option<Outcome>, shape: Shape)
        -> Result<Delivery, &'static str>
    {
        const RAISES: &str = "the expectation raises an error, but the method \
            can't";
        const SUSPENDS: &str = "the expectation suspends, but the method is \
            synchronous";
        match outcome {
            None => Ok(Delivery::Value(None)),
            Some(Outcome::Success(mut v)) => Ok(Delivery::Value(v.take())),
            Some(Outcome::Failure(mut e)) if shape.raising =>
                Ok(e.take().map_or(Delivery::Value(None), Delivery::Error)),
            Some(Outcome::Failure(_)) => Err(RAISES),
            Some(Outcome::PendingSuccess(p)) if shape.asynchronous =>
                Ok(Delivery::Pending(p)),
            Some(Outcome::PendingFailure(p))
                if shape.asynchronous && shape.raising =>
                    Ok(Delivery::Pending(p)),
            Some(Outcome::PendingFailure(_)) if shape.asynchronous =>
                Err(RAISES),
            Some(_) => Err(SUSPENDS)
        }
    }
}

impl CallHandler for Consumer {
    fn accept(
        &self,
        summary: String,
        shape: Shape,
        mut args: Args,
        location: &'static Location<'static>
    ) -> Delivery {
        let (claimed, guess) = {
            let mut registry = lock(&self.registry);
            match registry.claim(&summary) {
                Some(claimed) => (Some(claimed), None),
                None => (None, registry.guess())
            }
        };
        let Some(Claimed{mut actions, outcome, done}) = claimed else {
            self.report(Failure::UnexpectedCall{mock: self.name(), summary},
                location);
            return guess.map_or(Delivery::Value(None),
                |g| g.into_delivery(shape));
        };
        debug!(mock = %self.settings.get_name(), %summary, "claimed");
        for action in actions.iter_mut() {
            action(&mut args);
        }
        done.release();
        match Self::deliver(outcome, shape) {
            Ok(delivery) => delivery,
            Err(reason) => {
                let failure = Failure::OutcomeMismatch {
                    mock: self.name(),
                    summary,
                    reason
                };
                self.report(failure, location);
                Delivery::Value(None)
            }
        }
    }
}

impl Drop for Consumer {
    fn drop(&mut self) {
        if self.settings.should_verify_on_drop() && !thread::panicking() {
            self.verify(None);
        }
    }
}

/// The part of a mock that does the work.
///
/// A hand-written mock wraps one of these and forwards each of its methods to
/// one of the `accept` methods, describing the call with a [`Call`].  Those
/// methods return `None` whenever there is no value to return, for example
/// when the expectation didn't configure one or when an unexpected call had
/// nothing to fall back on.  What the mock returns then is up to the mock.
pub struct MockBase {
    name: Arc<str>,
    reporter: Arc<dyn Reporter>,
    handler: Arc<dyn CallHandler>,
}

impl MockBase {
    pub(crate) fn new(
        name: Arc<str>,
        reporter: Arc<dyn Reporter>,
        handler: Arc<dyn CallHandler>
    ) -> Self {
        MockBase{name, reporter, handler}
    }

    fn consuming(settings: Settings) -> Self {
        let name = settings.shared_name();
        let reporter = settings.shared_reporter();
        MockBase::new(name, reporter, Arc::new(Consumer::new(settings)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Is this the throwaway mock a declare block runs against?
    pub fn is_recording(&self) -> bool {
        self.handler.is::<Recorder>()
    }

    fn consumer(&self) -> &Consumer {
        match self.handler.downcast_ref::<Consumer>() {
            Ok(consumer) => consumer,
            Err(_) => panic!("internal error: expectations can only be \
                              managed on a consuming mock")
        }
    }

    fn dispatch(
        &self,
        call: Call,
        shape: Shape,
        location: &'static Location<'static>
    ) -> (String, Delivery) {
        let (summary, args) = call.into_parts();
        let delivery = self.handler.accept(summary.clone(), shape, args,
            location);
        (summary, delivery)
    }

    fn type_mismatch<T>(
        &self,
        summary: &str,
        location: &'static Location<'static>
    ) {
        // Recording mocks get whatever the declaration staged; not their call
        if self.is_recording() {
            return;
        }
        let failure = Failure::TypeMismatch {
            mock: self.name.to_string(),
            summary: summary.to_owned(),
            expected: any::type_name::<T>()
        };
        warn!(%failure, %location);
        self.reporter.report(failure, location);
    }

    fn value<R: 'static>(
        &self,
        summary: &str,
        payload: Option<Payload>,
        location: &'static Location<'static>
    ) -> Option<R> {
        match outcome::take::<R>(payload?) {
            Ok(r) => Some(r),
            Err(_) => {
                self.type_mismatch::<R>(summary, location);
                None
            }
        }
    }

    fn error<R: 'static, E: 'static>(
        &self,
        summary: &str,
        payload: Payload,
        location: &'static Location<'static>
    ) -> Result<Option<R>, E> {
        match outcome::take::<E>(payload) {
            Ok(e) => Err(e),
            Err(_) => {
                self.type_mismatch::<E>(summary, location);
                Ok(None)
            }
        }
    }

    /// Handle a synchronous call that can't raise an error.
    #[track_caller]
    pub fn accept<R: 'static>(&self, call: Call) -> Option<R> {
        let location = Location::caller();
        let (summary, delivery) = self.dispatch(call, Shape::SYNC, location);
        match delivery {
            Delivery::Value(v) => self.value(&summary, v, location),
            Delivery::Error(_) | Delivery::Pending(_) | Delivery::Never => None
        }
    }

    /// Handle a synchronous call that can raise an error of type `E`.
    #[track_caller]
    pub fn throwing_accept<R: 'static, E: 'static>(&self, call: Call)
        -> Result<Option<R>, E>
    {
        let location = Location::caller();
        let (summary, delivery) = self.dispatch(call, Shape::SYNC_RAISING,
            location);
        match delivery {
            Delivery::Value(v) => Ok(self.value(&summary, v, location)),
            Delivery::Error(e) => self.error(&summary, e, location),
            Delivery::Pending(_) | Delivery::Never => Ok(None)
        }
    }

    /// Handle a suspension-capable call that can't raise an error.
    ///
    /// The call is matched against expectations when the returned future is
    /// first polled.
    #[track_caller]
    pub fn async_accept<R: Send + 'static>(&self, call: Call)
        -> impl Future<Output = Option<R>> + Send + '_
    {
        let location = Location::caller();
        async move {
            let (summary, delivery) = self.dispatch(call, Shape::ASYNC,
                location);
            match delivery {
                Delivery::Value(v) => self.value(&summary, v, location),
                Delivery::Pending(promise) => match promise.await {
                    Ok(v) => self.value(&summary, Some(v), location),
                    Err(_) => None
                },
                Delivery::Never => std::future::pending().await,
                Delivery::Error(_) => None
            }
        }
    }

    /// Handle a suspension-capable call that can raise an error of type `E`.
    #[track_caller]
    pub fn async_throwing_accept<R, E>(&self, call: Call)
        -> impl Future<Output = Result<Option<R>, E>> + Send + '_
        where R: Send + 'static,
              E: Send + 'static
    {
        let location = Location::caller();
        async move {
            let (summary, delivery) = self.dispatch(call, Shape::ASYNC_RAISING,
                location);
            match delivery {
                Delivery::Value(v) => Ok(self.value(&summary, v, location)),
                Delivery::Error(e) => self.error(&summary, e, location),
                Delivery::Pending(promise) => match promise.await {
                    Ok(v) => Ok(self.value(&summary, Some(v), location)),
                    Err(e) => self.error(&summary, e, location)
                },
                Delivery::Never => std::future::pending().await
            }
        }
    }
}

impl fmt::Debug for MockBase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("MockBase")
            .field("name", &self.name)
            .field("recording", &self.is_recording())
            .finish()
    }
}

/// Implemented by every hand-written mock.
///
/// A mock is a thin wrapper around a [`MockBase`].  Only
/// [`from_base`](#tymethod.from_base) and [`base`](#tymethod.base) need
/// implementing; everything else is provided.
///
/// Expectations are declared by example: the block passed to `expect` calls
/// the mocked method exactly once, with the arguments the real call should
/// have.  The block runs later, against a recording copy of the mock, the
/// first time a real call reaches this mock or at `verify`.
///
/// # Examples
/// ```
/// # use callmock::*;
/// struct MockGreeter(MockBase);
///
/// impl Mock for MockGreeter {
///     fn from_base(base: MockBase) -> Self { MockGreeter(base) }
///     fn base(&self) -> &MockBase { &self.0 }
/// }
///
/// impl MockGreeter {
///     fn greet(&self, who: &str) -> String {
///         self.0.accept(Call::new(function!()).check(who))
///             .unwrap_or_default()
///     }
/// }
///
/// let mock = MockGreeter::with_settings(
///     Settings::for_mock::<MockGreeter>().reporter(PanicReporter));
/// mock.expect(|m| m.greet("Ford")).returning("Hi Ford".to_owned());
/// assert_eq!(mock.greet("Ford"), "Hi Ford");
/// mock.verify();
/// ```
pub trait Mock: Sized + 'static {
    /// Wrap a base.  Used both for the real mock and for the recording mocks
    /// declare blocks run against.
    fn from_base(base: MockBase) -> Self;

    fn base(&self) -> &MockBase;

    /// Create a mock with default [`Settings`].
    fn create() -> Self {
        Self::with_settings(Settings::for_mock::<Self>())
    }

    fn with_settings(settings: Settings) -> Self {
        Self::from_base(MockBase::consuming(settings))
    }

    /// Expect one call to a synchronous method that can't raise an error.
    #[track_caller]
    fn expect<T, F>(&self, block: F) -> ExpectationBuilder<T>
        where F: FnOnce(&Self) -> T + Send + 'static
    {
        let declare: DeclareFn = Box::new(move |base: MockBase| {
            let mock = Self::from_base(base);
            block(&mock);
        });
        let e = self.base().consumer().expect(declare, false,
            Location::caller());
        ExpectationBuilder::new(e)
    }

    /// Expect one call to a synchronous method that can raise an error.
    #[track_caller]
    fn expect_fallible<T, E, F>(&self, block: F) -> ExpectationBuilder<T, E>
        where F: FnOnce(&Self) -> Result<T, E> + Send + 'static
    {
        let declare: DeclareFn = Box::new(move |base: MockBase| {
            let mock = Self::from_base(base);
            let _ = block(&mock);
        });
        let e = self.base().consumer().expect(declare, false,
            Location::caller());
        ExpectationBuilder::new(e)
    }

    /// Expect one call to a suspension-capable method that can't raise an
    /// error.
    ///
    /// The block receives the recording mock by value.  Its future is polled
    /// exactly once, which is enough for any mocked method to record its
    /// call.
    #[track_caller]
    fn expect_async<T, F, Fut>(&self, block: F) -> ExpectationBuilder<T>
        where F: FnOnce(Self) -> Fut + Send + 'static,
              Fut: Future<Output = T>
    {
        let declare: DeclareFn = Box::new(move |base: MockBase| {
            let _ = block(Self::from_base(base)).now_or_never();
        });
        let e = self.base().consumer().expect(declare, true,
            Location::caller());
        ExpectationBuilder::new(e)
    }

    /// Expect one call to a suspension-capable method that can raise an
    /// error.
    #[track_caller]
    fn expect_async_fallible<T, E, F, Fut>(&self, block: F)
        -> ExpectationBuilder<T, E>
        where F: FnOnce(Self) -> Fut + Send + 'static,
              Fut: Future<Output = Result<T, E>>
    {
        let declare: DeclareFn = Box::new(move |base: MockBase| {
            let _ = block(Self::from_base(base)).now_or_never();
        });
        let e = self.base().consumer().expect(declare, true,
            Location::caller());
        ExpectationBuilder::new(e)
    }

    /// Report every expectation that wasn't claimed, then forget all
    /// expectations.
    ///
    /// Waits a little while for suspension-capable calls that may still be on
    /// their way; see [`Settings::verify_timeout`].
    #[track_caller]
    fn verify(&self) {
        self.base().consumer().verify(Some(Location::caller()));
    }
}
