// vim: tw=80
//! Failure reporting.
//!
//! Every problem a mock detects, whether a test authoring mistake or an
//! unsatisfied expectation, is funneled through a single [`Reporter`] along
//! with the source location responsible for it.  The mock itself never
//! unwinds on a mismatch; whether a report panics is the reporter's choice.

use std::{
    fmt,
    panic::Location,
    sync::{Arc, Mutex},
    thread,
};

use thiserror::Error;

use crate::lock;

/// Something a mock wants the test to know about.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Failure {
    /// A real call arrived that no outstanding expectation matches.
    #[error("[{mock}] Unexpected call: {summary}")]
    UnexpectedCall { mock: String, summary: String },
    /// An expectation was never claimed before `verify`.
    #[error("[{mock}] Unsatisfied expectation: {summary}")]
    Unsatisfied { mock: String, summary: String },
    /// A declare block made more than one call.
    #[error("[{mock}] Too many expectations in one expect block: {summary}")]
    TooManyCalls { mock: String, summary: String },
    /// The configured outcome can't be delivered by the kind of call that
    /// claimed it, e.g. an error for a method that can't raise one.
    #[error("[{mock}] Outcome mismatch for {summary}: {reason}")]
    OutcomeMismatch {
        mock: String,
        summary: String,
        reason: &'static str
    },
    /// The configured value has a different type than the method returns.
    #[error("[{mock}] Type mismatch for {summary}: expected {expected}")]
    TypeMismatch {
        mock: String,
        summary: String,
        expected: &'static str
    },
}

impl Failure {
    pub fn mock(&self) -> &str {
        match self {
            Failure::UnexpectedCall { mock, .. } |
            Failure::Unsatisfied { mock, .. } |
            Failure::TooManyCalls { mock, .. } |
            Failure::OutcomeMismatch { mock, .. } |
            Failure::TypeMismatch { mock, .. } => mock
        }
    }

    pub fn summary(&self) -> &str {
        match self {
            Failure::UnexpectedCall { summary, .. } |
            Failure::Unsatisfied { summary, .. } |
            Failure::TooManyCalls { summary, .. } |
            Failure::OutcomeMismatch { summary, .. } |
            Failure::TypeMismatch { summary, .. } => summary
        }
    }
}

/// A [`Failure`] together with the place it was detected.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Report {
    pub failure: Failure,
    pub location: &'static Location<'static>,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} at {}", self.failure, self.location)
    }
}

/// The capability through which mocks fail tests.
///
/// Implementations must not block, and should be cheap; they may be called
/// while the mock holds internal locks.
pub trait Reporter: Send + Sync {
    fn report(&self, failure: Failure, location: &'static Location<'static>);
}

/// Panics as soon as anything is reported.
///
/// This is the classic mock behavior.  The panic message is the failure's
/// `Display` form, so tests can use `#[should_panic(expected = ...)]`.
#[derive(Clone, Copy, Debug, Default)]
pub struct PanicReporter;

impl Reporter for PanicReporter {
    fn report(&self, failure: Failure, location: &'static Location<'static>) {
        panic!("{} at {}", failure, location);
    }
}

/// Keeps every report, for tests that make assertions about failures.
///
/// Clones share the same storage.
///
/// # Examples
/// ```
/// # use callmock::*;
/// # use std::panic::Location;
/// let reporter = CollectingReporter::new();
/// let failure = Failure::UnexpectedCall {
///     mock: "Foo".to_owned(),
///     summary: "bar".to_owned()
/// };
/// reporter.report(failure, Location::caller());
/// assert_eq!(reporter.messages(), ["[Foo] Unexpected call: bar"]);
/// ```
#[derive(Clone, Debug, Default)]
pub struct CollectingReporter(Arc<Mutex<Vec<Report>>>);

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<Report> {
        lock(&self.0).clone()
    }

    pub fn failures(&self) -> Vec<Failure> {
        lock(&self.0).iter().map(|r| r.failure.clone()).collect()
    }

    /// The `Display` form of every failure reported so far, oldest first.
    pub fn messages(&self) -> Vec<String> {
        lock(&self.0).iter().map(|r| r.failure.to_string()).collect()
    }

    /// Remove and return everything reported so far.
    pub fn take(&self) -> Vec<Report> {
        std::mem::take(&mut *lock(&self.0))
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.0).is_empty()
    }
}

impl Reporter for CollectingReporter {
    fn report(&self, failure: Failure, location: &'static Location<'static>) {
        lock(&self.0).push(Report{failure, location});
    }
}

/// Lets the test run to completion, then fails it.
///
/// Reports are logged as they arrive and kept.  When the reporter is dropped,
/// which normally happens when the last mock using it is dropped, it panics
/// with everything it collected.  This is the default reporter.
#[derive(Debug, Default)]
pub struct DeferredReporter(Mutex<Vec<Report>>);

impl DeferredReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Reporter for DeferredReporter {
    fn report(&self, failure: Failure, location: &'static Location<'static>) {
        tracing::error!(%failure, %location, "mock failure");
        lock(&self.0).push(Report{failure, location});
    }
}

impl Drop for DeferredReporter {
    fn drop(&mut self) {
        let reports = std::mem::take(&mut *lock(&self.0));
        if !thread::panicking() && !reports.is_empty() {
            let msgs = reports.iter()
                .map(Report::to_string)
                .collect::<Vec<_>>()
                .join("\n");
            panic!("{} mock failure(s):\n{}", reports.len(), msgs);
        }
    }
}
