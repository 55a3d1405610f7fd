// vim: tw=80
//! The per-mock collection of outstanding expectations.

use std::{
    panic::Location,
    sync::{Arc, Mutex},
};

use crate::{
    expectation::{Claimed, Expectation, Guess},
    lock,
    promise::Latch,
};

/// Expectations in declaration order.  Claimed expectations are removed.
#[derive(Default)]
pub(crate) struct Registry(Vec<Arc<Mutex<Expectation>>>);

impl Registry {
    /// Store a newly declared expectation.  Its declare block doesn't run yet.
    pub(crate) fn create(&mut self, expectation: Expectation)
        -> Arc<Mutex<Expectation>>
    {
        let e = Arc::new(Mutex::new(expectation));
        self.0.push(e.clone());
        e
    }

    fn build_all(&self) {
        for e in self.0.iter() {
            lock(e).force_build();
        }
    }

    /// Find the first expectation whose summary is `summary`, mark it claimed,
    /// and remove it.
    pub(crate) fn claim(&mut self, summary: &str) -> Option<Claimed> {
        self.build_all();
        let i = self.0.iter().position(|e| lock(e).claim(summary))?;
        let e = self.0.remove(i);
        let claimed = lock(&e).take_claimed();
        Some(claimed)
    }

    /// Offer up the outcome of the most recently declared expectation that
    /// could still be claimed, for a call that matched nothing.
    pub(crate) fn guess(&self) -> Option<Guess> {
        self.0.iter()
            .rev()
            .map(|e| lock(e))
            .find(|e| e.is_unclaimed())
            .map(|e| e.guess())
    }

    /// Latches for every suspension-capable expectation that could still be
    /// claimed.
    pub(crate) fn in_flight(&self) -> Vec<Latch> {
        self.build_all();
        self.0.iter()
            .map(|e| lock(e))
            .filter(|e| e.is_asynchronous() && e.is_unclaimed())
            .map(|e| e.done())
            .collect()
    }

    /// Remove every expectation, returning the summaries of those that are
    /// still outstanding, along with where they were declared.
    pub(crate) fn drain_unclaimed(&mut self)
        -> Vec<(String, &'static Location<'static>)>
    {
        self.build_all();
        self.0.drain(..)
            .filter_map(|e| {
                let e = lock(&e);
                e.is_outstanding().then(|| (e.to_string(), e.location()))
            })
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }
}
