// vim: tw=80
//! What a claimed call should do: return a value, raise an error, or resolve
//! later through a [`FulfillHandle`](crate::FulfillHandle).

use std::{
    any::{self, Any},
    fmt,
};

use fragile::Fragile;

use crate::promise::Promise;

/// A type-erased value travelling between a test and a mocked method.
pub type Payload = Box<dyn Any + Send>;

/// Produces the payloads held by an [`Outcome`].
enum Rfunc {
    /// Hands out a fresh copy every time it can
    Clone(Box<dyn Fn() -> Option<Payload> + Send>),
    /// Hands out its value exactly once
    Once(Option<Payload>),
}

/// A value or error configured on an expectation.
pub struct Value {
    rfunc: Rfunc,
    type_name: &'static str,
}

impl Value {
    pub(crate) fn cloned<T>(t: T) -> Self
        where T: Clone + Send + 'static
    {
        let f = move || Some(Box::new(t.clone()) as Payload);
        Value {
            rfunc: Rfunc::Clone(Box::new(f)),
            type_name: any::type_name::<T>()
        }
    }

    pub(crate) fn once<T: Send + 'static>(t: T) -> Self {
        Value {
            rfunc: Rfunc::Once(Some(Box::new(t))),
            type_name: any::type_name::<T>()
        }
    }

    /// Single-threaded version of [`cloned`](#method.cloned).  The copies are
    /// wrapped in a `Fragile`, so they may only be unwrapped on the thread
    /// that supplied the original.  Other threads get nothing.
    pub(crate) fn cloned_st<T>(t: T) -> Self
        where T: Clone + 'static
    {
        let fragile = Fragile::new(t);
        let f = move || {
            fragile.is_valid().then(|| {
                Box::new(Fragile::new(fragile.get().clone())) as Payload
            })
        };
        Value {
            rfunc: Rfunc::Clone(Box::new(f)),
            type_name: any::type_name::<T>()
        }
    }

    /// Produce the payload for a claimed call.
    pub(crate) fn take(&mut self) -> Option<Payload> {
        match &mut self.rfunc {
            Rfunc::Clone(f) => f(),
            Rfunc::Once(o) => o.take()
        }
    }

    /// Produce a copy of the payload without consuming it.  Values that can
    /// only be handed out once have nothing to offer here.
    pub(crate) fn peek(&self) -> Option<Payload> {
        match &self.rfunc {
            Rfunc::Clone(f) => f(),
            Rfunc::Once(_) => None
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Value").field(&self.type_name).finish()
    }
}

/// The result a satisfied expectation delivers to its caller.
#[derive(Debug)]
pub enum Outcome {
    /// Return this value synchronously.
    Success(Value),
    /// Raise this error synchronously.
    Failure(Value),
    /// Suspend the caller until the promise resolves with a value.
    PendingSuccess(Promise),
    /// Suspend the caller until the promise resolves with an error.
    PendingFailure(Promise),
}

impl Outcome {
    pub fn is_pending(&self) -> bool {
        matches!(self, Outcome::PendingSuccess(_) | Outcome::PendingFailure(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_) | Outcome::PendingFailure(_))
    }
}

/// Unwrap a payload into a concrete type, looking through the `Fragile`
/// wrapper used by single-threaded values.
///
/// Gives the payload back if it holds some other type.
pub(crate) fn take<T: 'static>(payload: Payload) -> Result<T, Payload> {
    match payload.downcast::<T>() {
        Ok(t) => Ok(*t),
        Err(payload) => match payload.downcast::<Fragile<T>>() {
            Ok(fragile) => Ok(fragile.into_inner()),
            Err(payload) => Err(payload)
        }
    }
}
