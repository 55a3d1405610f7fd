// vim: tw=80
//! Call summaries: the canonical string form of a call, used as the key that
//! pairs real calls with declared expectations.

use std::{
    any::Any,
    collections::{BTreeMap, HashMap, VecDeque},
    fmt::{self, Display, Write},
};

use crate::outcome::Payload;

/// A checked argument, reduced to a closed set of shapes that can be rendered
/// deterministically.
///
/// Concrete mocks never build these by hand; they go through [`ToArg`].
#[derive(Clone, Debug, PartialEq)]
pub enum Arg {
    /// An absent value, such as `None`.
    Nil,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Char(char),
    Str(String),
    /// An ordered sequence.  Element order is significant.
    Seq(Vec<Arg>),
    /// A key-value mapping.  Entry order is not significant; keys are sorted
    /// when rendered.
    Map(Vec<(String, Arg)>),
}

impl Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Arg::Nil => f.write_str("nil"),
            Arg::Bool(b) => write!(f, "{}", b),
            Arg::Int(i) => write!(f, "{}", i),
            Arg::UInt(u) => write!(f, "{}", u),
            // Debug keeps the fractional part, so 1.0 doesn't render as 1
            Arg::Float(x) => write!(f, "{:?}", x),
            Arg::Char(c) => f.write_char(*c),
            Arg::Str(s) => f.write_str(s),
            Arg::Seq(items) => render_list(f, items.iter()),
            Arg::Map(entries) => {
                let mut sorted = entries.iter().collect::<Vec<_>>();
                sorted.sort_by(|a, b| a.0.cmp(&b.0));
                f.write_char('[')?;
                for (i, (k, v)) in sorted.into_iter().enumerate() {
                    if i > 0 {
                        f.write_char(',')?;
                    }
                    write!(f, "{}:{}", k, v)?;
                }
                f.write_char(']')
            }
        }
    }
}

fn render_list<'a, I>(f: &mut fmt::Formatter, items: I) -> fmt::Result
    where I: Iterator<Item=&'a Arg>
{
    f.write_char('[')?;
    for (i, item) in items.enumerate() {
        if i > 0 {
            f.write_char(',')?;
        }
        write!(f, "{}", item)?;
    }
    f.write_char(']')
}

/// Render a call summary from a function identifier and its checked
/// arguments.
///
/// The argument list, and the space before it, is omitted when there are no
/// checked arguments.
///
/// # Examples
/// ```
/// # use callmock::*;
/// let args = [42i32.to_arg(), "meaning of life".to_arg()];
/// assert_eq!(summarize("func_with_two_args", &args),
///            "func_with_two_args [42,meaning of life]");
/// assert_eq!(summarize("void_func", &[]), "void_func");
/// ```
pub fn summarize(func: &str, checked: &[Arg]) -> String {
    if checked.is_empty() {
        return func.to_owned();
    }
    let mut s = String::with_capacity(func.len() + 2 + 8 * checked.len());
    s.push_str(func);
    s.push(' ');
    // Writing into a String can't fail
    let _ = write!(s, "{}", Arg::Seq(checked.to_vec()));
    s
}

/// Conversion of a typed argument into its [`Arg`] form.
pub trait ToArg {
    fn to_arg(&self) -> Arg;
}

impl ToArg for Arg {
    fn to_arg(&self) -> Arg {
        self.clone()
    }
}

macro_rules! to_arg_as {
    ($variant:ident, $via:ty, $($t:ty)*) => {
        $(
            impl ToArg for $t {
                fn to_arg(&self) -> Arg {
                    Arg::$variant(*self as $via)
                }
            }
        )*
    }
}

to_arg_as!{Int, i64, i8 i16 i32 i64 isize}
to_arg_as!{UInt, u64, u8 u16 u32 u64 usize}
to_arg_as!{Float, f64, f32 f64}

impl ToArg for i128 {
    fn to_arg(&self) -> Arg {
        i64::try_from(*self)
            .map(Arg::Int)
            .unwrap_or_else(|_| Arg::Str(self.to_string()))
    }
}

impl ToArg for u128 {
    fn to_arg(&self) -> Arg {
        u64::try_from(*self)
            .map(Arg::UInt)
            .unwrap_or_else(|_| Arg::Str(self.to_string()))
    }
}

impl ToArg for bool {
    fn to_arg(&self) -> Arg {
        Arg::Bool(*self)
    }
}

impl ToArg for char {
    fn to_arg(&self) -> Arg {
        Arg::Char(*self)
    }
}

impl ToArg for str {
    fn to_arg(&self) -> Arg {
        Arg::Str(self.to_owned())
    }
}

impl ToArg for String {
    fn to_arg(&self) -> Arg {
        Arg::Str(self.clone())
    }
}

impl<T: ToArg + ?Sized> ToArg for &T {
    fn to_arg(&self) -> Arg {
        (**self).to_arg()
    }
}

impl<T: ToArg + ?Sized> ToArg for Box<T> {
    fn to_arg(&self) -> Arg {
        (**self).to_arg()
    }
}

impl<T: ToArg> ToArg for Option<T> {
    fn to_arg(&self) -> Arg {
        match self {
            Some(t) => t.to_arg(),
            None => Arg::Nil
        }
    }
}

impl<T: ToArg> ToArg for [T] {
    fn to_arg(&self) -> Arg {
        Arg::Seq(self.iter().map(ToArg::to_arg).collect())
    }
}

impl<T: ToArg, const N: usize> ToArg for [T; N] {
    fn to_arg(&self) -> Arg {
        self.as_slice().to_arg()
    }
}

impl<T: ToArg> ToArg for Vec<T> {
    fn to_arg(&self) -> Arg {
        self.as_slice().to_arg()
    }
}

impl<T: ToArg> ToArg for VecDeque<T> {
    fn to_arg(&self) -> Arg {
        Arg::Seq(self.iter().map(ToArg::to_arg).collect())
    }
}

impl<K: Display, V: ToArg, S> ToArg for HashMap<K, V, S> {
    fn to_arg(&self) -> Arg {
        Arg::Map(self.iter().map(|(k, v)| (k.to_string(), v.to_arg())).collect())
    }
}

impl<K: Display, V: ToArg> ToArg for BTreeMap<K, V> {
    fn to_arg(&self) -> Arg {
        Arg::Map(self.iter().map(|(k, v)| (k.to_string(), v.to_arg())).collect())
    }
}

/// The action arguments of one call.
///
/// These are handed, unchecked and untouched, to every action attached with
/// [`doing`](crate::ExpectationBuilder::doing).
#[derive(Default)]
pub struct Args(Vec<Payload>);

impl Args {
    /// Borrow the argument at `index`, if it exists and has type `T`.
    pub fn get<T: 'static>(&self, index: usize) -> Option<&T> {
        self.0.get(index).and_then(|p| (**p).downcast_ref::<T>())
    }

    /// Mutably borrow the argument at `index`, if it exists and has type `T`.
    ///
    /// Useful for capturing callbacks, like `Box<dyn FnMut(u32) + Send>`.
    pub fn get_mut<T: 'static>(&mut self, index: usize) -> Option<&mut T> {
        self.0.get_mut(index).and_then(|p| (**p).downcast_mut::<T>())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    fn push<T: Any + Send>(&mut self, t: T) {
        self.0.push(Box::new(t));
    }
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Args").field("len", &self.0.len()).finish()
    }
}

/// One call into a mocked method, as seen by the mock.
///
/// Every concrete mock method builds one of these and hands it to an `accept`
/// variant of [`MockBase`](crate::MockBase).
///
/// # Examples
/// ```
/// # use callmock::*;
/// let call = Call::new("func_with_action_args")
///     .check(&42)
///     .action("captured".to_owned());
/// assert_eq!(call.summary(), "func_with_action_args [42]");
/// ```
#[derive(Debug)]
pub struct Call {
    func: String,
    checked: Vec<Arg>,
    args: Args,
}

impl Call {
    pub fn new<S: Into<String>>(func: S) -> Self {
        Call {
            func: func.into(),
            checked: Vec::new(),
            args: Args::default()
        }
    }

    /// Add an argument that is both matched against and passed to actions.
    pub fn arg<T>(mut self, t: T) -> Self
        where T: ToArg + Send + 'static
    {
        self.checked.push(t.to_arg());
        self.args.push(t);
        self
    }

    /// Add an argument that is matched against, but not passed to actions.
    pub fn check<T: ToArg + ?Sized>(mut self, t: &T) -> Self {
        self.checked.push(t.to_arg());
        self
    }

    /// Add an argument that is passed to actions, but never matched.
    pub fn action<T: Any + Send>(mut self, t: T) -> Self {
        self.args.push(t);
        self
    }

    pub fn func(&self) -> &str {
        &self.func
    }

    pub fn checked(&self) -> &[Arg] {
        &self.checked
    }

    pub fn summary(&self) -> String {
        summarize(&self.func, &self.checked)
    }

    pub(crate) fn into_parts(self) -> (String, Args) {
        let summary = self.summary();
        (summary, self.args)
    }
}
