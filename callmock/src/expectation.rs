// vim: tw=80
//! Expectations: one declared call each, with the state machine that carries
//! it from a deferred declare block to a claimed call.

use std::{
    convert::Infallible,
    fmt,
    marker::PhantomData,
    mem,
    panic::Location,
    sync::{Arc, Mutex},
};

use tracing::trace;

use crate::{
    codec::Args,
    lock,
    mock::{CallHandler, Delivery, MockBase, Shape},
    outcome::{Outcome, Payload, Value},
    promise::{self, FulfillHandle, Latch},
    report::{Failure, Reporter},
};

/// A deferred declare block, bound to the mock type that declared it.  It
/// builds a mock of that type around the recording base it's given and runs
/// the user's block against it.
pub(crate) type DeclareFn = Box<dyn FnOnce(MockBase) + Send>;

/// A side effect run when an expectation is claimed.
pub(crate) type Action = Box<dyn FnMut(&mut Args) + Send>;

/// Where an expectation is in its life.
///
/// ```text
/// AwaitingSummary ──┬──► Unclaimed(summary) ──► Claimed(summary)
/// AwaitingAsyncSummary ┘         │
///         │                      │
///         └──────► Invalid ◄─────┘
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ClaimState {
    /// The declare block of a synchronous call hasn't run yet.
    AwaitingSummary,
    /// The declare block of a suspension-capable call hasn't run yet.
    AwaitingAsyncSummary,
    /// The declare block made no calls, or too many.  Nothing can claim it.
    Invalid,
    /// Built, and waiting for a real call with this summary.
    Unclaimed(String),
    /// Satisfied by a real call with this summary.
    Claimed(String),
}

impl ClaimState {
    fn is_awaiting(&self) -> bool {
        matches!(self,
            ClaimState::AwaitingSummary | ClaimState::AwaitingAsyncSummary)
    }
}

/// What [`Registry::guess`](crate::registry::Registry::guess) offers an
/// unexpected call in place of a real outcome.
pub(crate) enum Guess {
    Value(Option<Payload>),
    Error(Option<Payload>),
    Pending,
}

impl Guess {
    pub(crate) fn into_delivery(self, shape: Shape) -> Delivery {
        match self {
            Guess::Value(v) => Delivery::Value(v),
            Guess::Error(Some(e)) if shape.raising => Delivery::Error(e),
            Guess::Error(_) => Delivery::Value(None),
            Guess::Pending if shape.asynchronous => Delivery::Never,
            Guess::Pending => Delivery::Value(None),
        }
    }
}

/// Everything a claimed expectation hands over to the call that claimed it.
pub(crate) struct Claimed {
    pub actions: Vec<Action>,
    pub outcome: Option<Outcome>,
    /// Released once the actions have run
    pub done: Latch,
}

pub(crate) struct Expectation {
    mock: Arc<str>,
    reporter: Arc<dyn Reporter>,
    /// Where the test declared this expectation
    location: &'static Location<'static>,
    asynchronous: bool,
    state: ClaimState,
    declare: Option<DeclareFn>,
    actions: Vec<Action>,
    outcome: Option<Outcome>,
    done: Latch,
}

impl Expectation {
    pub(crate) fn new(
        mock: Arc<str>,
        reporter: Arc<dyn Reporter>,
        location: &'static Location<'static>,
        declare: DeclareFn,
        asynchronous: bool
    ) -> Self {
        let state = if asynchronous {
            ClaimState::AwaitingAsyncSummary
        } else {
            ClaimState::AwaitingSummary
        };
        Expectation {
            mock,
            reporter,
            location,
            asynchronous,
            state,
            declare: Some(declare),
            actions: Vec::new(),
            outcome: None,
            done: Latch::default()
        }
    }

    /// Run the declare block against a recording mock, if it hasn't run yet,
    /// and settle on a summary.
    pub(crate) fn force_build(&mut self) {
        if !self.state.is_awaiting() {
            return;
        }
        let staged = match &self.outcome {
            Some(Outcome::Success(v)) => v.peek(),
            _ => None
        };
        let Some(declare) = self.declare.take() else {
            // A previous build never finished
            self.state = ClaimState::Invalid;
            return;
        };
        let recorder = Arc::new(Recorder::new(self.mock.clone(),
            self.reporter.clone(), self.location, staged));
        let handler: Arc<dyn CallHandler> = recorder.clone();
        declare(MockBase::new(self.mock.clone(), self.reporter.clone(),
            handler));
        self.state = match recorder.finish() {
            Recording::One(summary) => ClaimState::Unclaimed(summary),
            Recording::Nothing | Recording::Many => ClaimState::Invalid
        };
        trace!(mock = %self.mock, state = ?self.state, "built expectation");
    }

    /// Claim this expectation for a call with summary `candidate`, if it
    /// matches.
    pub(crate) fn claim(&mut self, candidate: &str) -> bool {
        self.force_build();
        match &self.state {
            ClaimState::Unclaimed(s) if s == candidate => {
                self.state = ClaimState::Claimed(candidate.to_owned());
                true
            },
            _ => false
        }
    }

    pub(crate) fn set_outcome(&mut self, outcome: Outcome) {
        self.outcome = Some(outcome);
    }

    /// Hand over the actions and outcome of a claimed expectation.
    pub(crate) fn take_claimed(&mut self) -> Claimed {
        Claimed {
            actions: mem::take(&mut self.actions),
            outcome: self.outcome.take(),
            done: self.done.clone()
        }
    }

    /// A best-effort stand-in for this expectation's outcome, produced without
    /// consuming it.
    pub(crate) fn guess(&self) -> Guess {
        match &self.outcome {
            None => Guess::Value(None),
            Some(Outcome::Success(v)) => Guess::Value(v.peek()),
            Some(Outcome::Failure(e)) => Guess::Error(e.peek()),
            Some(Outcome::PendingSuccess(_)) |
            Some(Outcome::PendingFailure(_)) => Guess::Pending
        }
    }

    pub(crate) fn is_asynchronous(&self) -> bool {
        self.asynchronous
    }

    pub(crate) fn is_unclaimed(&self) -> bool {
        matches!(self.state, ClaimState::Unclaimed(_))
    }

    /// Should `verify` complain about this expectation?
    pub(crate) fn is_outstanding(&self) -> bool {
        !matches!(self.state, ClaimState::Claimed(_) | ClaimState::Invalid)
    }

    pub(crate) fn location(&self) -> &'static Location<'static> {
        self.location
    }

    pub(crate) fn done(&self) -> Latch {
        self.done.clone()
    }

    pub(crate) fn summary(&self) -> Option<&str> {
        match &self.state {
            ClaimState::Unclaimed(s) | ClaimState::Claimed(s) => Some(s),
            _ => None
        }
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.summary().unwrap_or("<unknown>"))
    }
}

enum Recording {
    Nothing,
    One(String),
    Many,
}

/// The call handler behind the throwaway mock a declare block runs against.
/// It records summaries instead of claiming anything.
pub(crate) struct Recorder {
    mock: Arc<str>,
    reporter: Arc<dyn Reporter>,
    location: &'static Location<'static>,
    /// Returned to the declare block's call, so it has something to work with
    staged: Mutex<Option<Payload>>,
    summaries: Mutex<Vec<String>>,
}

impl Recorder {
    fn new(
        mock: Arc<str>,
        reporter: Arc<dyn Reporter>,
        location: &'static Location<'static>,
        staged: Option<Payload>
    ) -> Self {
        Recorder {
            mock,
            reporter,
            location,
            staged: Mutex::new(staged),
            summaries: Mutex::new(Vec::new())
        }
    }

    fn finish(&self) -> Recording {
        let mut summaries = lock(&self.summaries);
        match summaries.len() {
            0 => Recording::Nothing,
            1 => Recording::One(summaries.remove(0)),
            _ => Recording::Many
        }
    }
}

impl CallHandler for Recorder {
    fn accept(
        &self,
        summary: String,
        _shape: Shape,
        _args: Args,
        _location: &'static Location<'static>
    ) -> Delivery {
        let first = {
            let mut summaries = lock(&self.summaries);
            summaries.push(summary.clone());
            summaries.len() == 1
        };
        if !first {
            let failure = Failure::TooManyCalls {
                mock: self.mock.to_string(),
                summary
            };
            tracing::warn!(%failure, location = %self.location);
            self.reporter.report(failure, self.location);
        }
        Delivery::Value(lock(&self.staged).take())
    }
}

/// A declared expectation, as seen by the test.
///
/// Returned by the `expect` family of methods on [`Mock`](crate::Mock).  `T`
/// is the type the mocked method returns on success, and `E` the type of
/// error it can raise.  Everything configured here may be configured at any
/// point before the first real call arrives; the declare block itself doesn't
/// run until then.
pub struct ExpectationBuilder<T, E = Infallible> {
    inner: Arc<Mutex<Expectation>>,
    _types: PhantomData<fn() -> (T, E)>,
}

impl<T, E> ExpectationBuilder<T, E> {
    pub(crate) fn new(inner: Arc<Mutex<Expectation>>) -> Self {
        ExpectationBuilder{inner, _types: PhantomData}
    }

    fn set_outcome(&self, outcome: Outcome) -> &Self {
        lock(&self.inner).set_outcome(outcome);
        self
    }

    /// Return a copy of `t` when the call is claimed.
    pub fn returning(&self, t: T) -> &Self
        where T: Clone + Send + 'static
    {
        self.set_outcome(Outcome::Success(Value::cloned(t)))
    }

    /// Return `t` when the call is claimed.  Useful for return types that
    /// aren't `Clone`.  Such values can't serve as a best guess for
    /// unexpected calls.
    pub fn return_once(&self, t: T) -> &Self
        where T: Send + 'static
    {
        self.set_outcome(Outcome::Success(Value::once(t)))
    }

    /// Single-threaded version of [`returning`](#method.returning).  Can be
    /// used when the return type isn't `Send`.
    ///
    /// A call from any thread but the one that called this method gets no
    /// value, and neither does a best guess made on another thread.
    pub fn returning_st(&self, t: T) -> &Self
        where T: Clone + 'static
    {
        self.set_outcome(Outcome::Success(Value::cloned_st(t)))
    }

    /// Raise a copy of `e` when the call is claimed.
    pub fn throwing(&self, e: E) -> &Self
        where E: Clone + Send + 'static
    {
        self.set_outcome(Outcome::Failure(Value::cloned(e)))
    }

    /// Run `action` when the call is claimed, before its outcome is
    /// delivered.  Actions run in the order they were added, and receive the
    /// call's action arguments.
    pub fn doing<F>(&self, action: F) -> &Self
        where F: FnMut(&mut Args) + Send + 'static
    {
        lock(&self.inner).actions.push(Box::new(action));
        self
    }

    /// Suspend the call when it's claimed, until the returned handle is
    /// fulfilled.  Then resume it with `t`.
    pub fn async_returning(&self, t: T) -> FulfillHandle
        where T: Send + 'static
    {
        let (handle, pending) = promise::channel(Ok(Box::new(t)));
        self.set_outcome(Outcome::PendingSuccess(pending));
        handle
    }

    /// Suspend the call when it's claimed, until the returned handle is
    /// fulfilled.  Then fail it with `e`.
    pub fn async_throwing(&self, e: E) -> FulfillHandle
        where E: Send + 'static
    {
        let (handle, pending) = promise::channel(Err(Box::new(e)));
        self.set_outcome(Outcome::PendingFailure(pending));
        handle
    }

    /// The call summary, if the declare block has already run.
    pub fn summary(&self) -> Option<String> {
        lock(&self.inner).summary().map(str::to_owned)
    }

    pub fn state(&self) -> ClaimState {
        lock(&self.inner).state.clone()
    }

    pub fn is_claimed(&self) -> bool {
        matches!(self.state(), ClaimState::Claimed(_))
    }
}

impl<T, E> fmt::Debug for ExpectationBuilder<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ExpectationBuilder")
            .field("state", &self.state())
            .finish()
    }
}
