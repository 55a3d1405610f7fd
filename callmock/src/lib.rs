// vim: tw=80
//! Declarative call expectations for hand-written test doubles.
//!
//! Callmock doesn't generate mocks.  Instead it gives hand-written mocks a
//! small engine that records the calls a test expects, pairs them with the
//! calls the code under test actually makes, and reports everything that
//! doesn't line up.
//!
//! # Usage
//!
//! * Write a mock struct that wraps a [`MockBase`] and implements [`Mock`].
//! * Implement each mocked method by describing the call with a [`Call`] and
//!   forwarding it to the `accept` variant that matches the method's shape.
//! * In the test, declare expectations by example: call the mocked method,
//!   with the expected arguments, inside a block passed to
//!   [`expect`](Mock::expect) or one of its siblings.
//! * Configure what each expected call does with the returned
//!   [`ExpectationBuilder`].
//! * Exercise the code under test, then call [`verify`](Mock::verify).
//!
//! # User Guide
//!
//! * [`Getting started`](#getting-started)
//! * [`Call summaries`](#call-summaries)
//! * [`Outcomes`](#outcomes)
//! * [`Actions`](#actions)
//! * [`Suspending calls`](#suspending-calls)
//! * [`Unexpected calls`](#unexpected-calls)
//! * [`Reporting failures`](#reporting-failures)
//!
//! ## Getting started
//! ```
//! use callmock::*;
//!
//! trait Database {
//!     fn lookup(&self, key: &str) -> Option<u32>;
//! }
//!
//! struct MockDatabase(MockBase);
//!
//! impl Mock for MockDatabase {
//!     fn from_base(base: MockBase) -> Self { MockDatabase(base) }
//!     fn base(&self) -> &MockBase { &self.0 }
//! }
//!
//! impl Database for MockDatabase {
//!     fn lookup(&self, key: &str) -> Option<u32> {
//!         self.0.accept(Call::new(function!()).check(key)).flatten()
//!     }
//! }
//!
//! let mock = MockDatabase::with_settings(
//!     Settings::for_mock::<MockDatabase>().reporter(PanicReporter));
//! mock.expect(|m| m.lookup("answer")).returning(Some(42));
//! assert_eq!(mock.lookup("answer"), Some(42));
//! mock.verify();
//! ```
//!
//! The declare block doesn't run right away.  It runs, against a recording
//! copy of the mock, when the first real call reaches the mock or when the
//! mock is verified.  So the outcome may be configured after `expect`
//! returns, and values captured by the block may still change until then.
//!
//! ## Call summaries
//!
//! Calls are matched by their summary: the method name, followed by its
//! checked arguments in brackets.  Arguments are rendered by [`ToArg`].
//! Sequences keep their order, maps have their keys sorted, and absent values
//! render as `nil`.  So `set_env(Some("HOME"), None)` is summarized as
//! `set_env [HOME,nil]`.  The summary of a method without checked arguments is
//! just its name.
//!
//! Arguments that shouldn't take part in matching, such as callbacks, are
//! added with [`Call::action`] instead.
//!
//! ## Outcomes
//!
//! Each expectation can have a single [`Outcome`].  Use
//! [`returning`](ExpectationBuilder::returning),
//! [`return_once`](ExpectationBuilder::return_once), or
//! [`returning_st`](ExpectationBuilder::returning_st) to return a value, and
//! [`throwing`](ExpectationBuilder::throwing) to raise an error from a
//! method that returns a `Result`:
//! ```
//! # use callmock::*;
//! # struct MockFs(MockBase);
//! # impl Mock for MockFs {
//! #     fn from_base(base: MockBase) -> Self { MockFs(base) }
//! #     fn base(&self) -> &MockBase { &self.0 }
//! # }
//! impl MockFs {
//!     fn read(&self, path: &str) -> Result<String, String> {
//!         self.0.throwing_accept(Call::new(function!()).check(path))
//!             .map(Option::unwrap_or_default)
//!     }
//! }
//!
//! # let mock = MockFs::with_settings(
//! #     Settings::new("MockFs").reporter(PanicReporter));
//! mock.expect_fallible(|m| m.read("/etc/motd"))
//!     .throwing("ENOENT".to_owned());
//! assert_eq!(mock.read("/etc/motd"), Err("ENOENT".to_owned()));
//! # mock.verify();
//! ```
//!
//! ## Actions
//!
//! [`doing`](ExpectationBuilder::doing) attaches side effects that run when
//! the expectation is claimed, before its outcome is delivered.  They receive
//! the call's action arguments, which is how a test gets hold of callbacks
//! passed to the mock.
//!
//! ## Suspending calls
//!
//! Mocked `async` methods use [`async_accept`](MockBase::async_accept) or
//! [`async_throwing_accept`](MockBase::async_throwing_accept), and their
//! expectations are declared with [`expect_async`](Mock::expect_async) or
//! [`expect_async_fallible`](Mock::expect_async_fallible).  Besides the
//! synchronous outcomes, they can be told to suspend until the test says
//! otherwise:
//! ```
//! # use callmock::*;
//! # use futures::executor::block_on;
//! # struct MockClock(MockBase);
//! # impl Mock for MockClock {
//! #     fn from_base(base: MockBase) -> Self { MockClock(base) }
//! #     fn base(&self) -> &MockBase { &self.0 }
//! # }
//! impl MockClock {
//!     async fn tick(&self) -> u64 {
//!         self.0.async_accept(Call::new(function!())).await.unwrap_or(0)
//!     }
//! }
//!
//! # let mock = MockClock::with_settings(
//! #     Settings::new("MockClock").reporter(PanicReporter));
//! let handle = mock.expect_async(|m| async move { m.tick().await })
//!     .async_returning(1);
//! handle.fulfill();
//! assert_eq!(block_on(mock.tick()), 1);
//! # mock.verify();
//! ```
//!
//! [`verify`](Mock::verify) gives each suspension-capable expectation that
//! hasn't been claimed yet a grace period, [`DEFAULT_VERIFY_TIMEOUT`] by
//! default, in case its call is still on the way from another thread.
//!
//! ## Unexpected calls
//!
//! A call that matches no outstanding expectation is reported.  The mock
//! then falls back on the most recently declared expectation that is still
//! outstanding: it returns a copy of that expectation's value, or raises a
//! copy of its error if the method can raise one.  Suspension-capable calls
//! whose fallback would suspend never resume.
//!
//! ## Reporting failures
//!
//! Every failure is a [`Failure`], handed to the mock's [`Reporter`].  The
//! default [`DeferredReporter`] logs failures as they happen and fails the
//! test when the last mock using it is dropped.  [`PanicReporter`] fails the
//! test immediately.  [`CollectingReporter`] keeps failures around so tests
//! can make assertions about them.

use std::{
    any,
    sync::{Mutex, MutexGuard},
};

mod codec;
mod expectation;
mod mock;
mod outcome;
mod promise;
mod registry;
mod report;
mod settings;

pub use crate::codec::{summarize, Arg, Args, Call, ToArg};
pub use crate::expectation::{ClaimState, ExpectationBuilder};
pub use crate::mock::{Mock, MockBase};
pub use crate::outcome::{Outcome, Payload, Value};
pub use crate::promise::{FulfillHandle, Promise};
pub use crate::report::{
    CollectingReporter,
    DeferredReporter,
    Failure,
    PanicReporter,
    Report,
    Reporter
};
pub use crate::settings::{Settings, DEFAULT_VERIFY_TIMEOUT};

/// Lock a mutex, ignoring poison.
///
/// A mock's state stays consistent across a panicking reporter, so the panic
/// that poisoned the lock has already been reported.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[doc(hidden)]
pub fn __enclosing_fn<F>(_: F) -> &'static str {
    let path = any::type_name::<F>();
    path.strip_suffix("::f")
        .unwrap_or(path)
        .rsplit("::")
        .find(|segment| *segment != "{{closure}}")
        .unwrap_or(path)
}

/// The name of the enclosing function, for use with [`Call::new`].
///
/// Inside an `async fn`, or a method rewritten by `#[async_trait]`, this is
/// still the name of the function rather than of the closure that the
/// compiler generates for its body.
///
/// # Examples
/// ```
/// # use callmock::function;
/// fn void_func() -> &'static str {
///     function!()
/// }
/// assert_eq!(void_func(), "void_func");
/// ```
#[macro_export]
macro_rules! function {
    () => {{
        fn f() {}
        $crate::__enclosing_fn(f)
    }};
}
