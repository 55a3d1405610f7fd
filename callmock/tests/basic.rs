// vim: tw=80
//! Synchronous mocked methods, with and without errors
#![deny(warnings)]

use std::{
    collections::HashMap,
    rc::Rc,
    sync::{
        Arc,
        Mutex,
        atomic::{AtomicI32, Ordering},
    },
    thread,
};

use callmock::*;

#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    Vogons,
}

pub trait TestProtocol {
    fn void_func(&self);
    fn returns_optional_string(&self) -> Option<String>;
    fn func_which_throws(&self) -> Result<String, Error>;
    fn func_with_one_arg(&self, value: i32);
    fn func_with_one_optional_arg(&self, value: Option<i32>);
    fn func_with_two_args(&self, value1: i32, value2: &str);
    fn func_with_array_of_dicts(&self, values: &[HashMap<&str, i32>]);
    fn func_with_dict(&self, value: &HashMap<&str, i32>);
    fn func_with_action_args(&self, value1: i32, value2: String);
    fn func_with_arg_and_return_value(&self, value: &str) -> i32;
    fn func_which_throws_with_arg_and_return_value(&self, value: &str)
        -> Result<i32, Error>;
}

pub struct MockTestProtocol(MockBase);

impl Mock for MockTestProtocol {
    fn from_base(base: MockBase) -> Self {
        MockTestProtocol(base)
    }

    fn base(&self) -> &MockBase {
        &self.0
    }
}

impl TestProtocol for MockTestProtocol {
    fn void_func(&self) {
        self.0.accept::<()>(Call::new(function!()));
    }

    fn returns_optional_string(&self) -> Option<String> {
        self.0.accept(Call::new(function!())).flatten()
    }

    fn func_which_throws(&self) -> Result<String, Error> {
        self.0.throwing_accept(Call::new(function!()))
            .map(Option::unwrap_or_default)
    }

    fn func_with_one_arg(&self, value: i32) {
        self.0.accept::<()>(Call::new(function!()).arg(value));
    }

    fn func_with_one_optional_arg(&self, value: Option<i32>) {
        self.0.accept::<()>(Call::new(function!()).arg(value));
    }

    fn func_with_two_args(&self, value1: i32, value2: &str) {
        let call = Call::new(function!())
            .arg(value1)
            .arg(value2.to_owned());
        self.0.accept::<()>(call);
    }

    fn func_with_array_of_dicts(&self, values: &[HashMap<&str, i32>]) {
        self.0.accept::<()>(Call::new(function!()).check(values));
    }

    fn func_with_dict(&self, value: &HashMap<&str, i32>) {
        self.0.accept::<()>(Call::new(function!()).check(value));
    }

    fn func_with_action_args(&self, value1: i32, value2: String) {
        let call = Call::new(function!())
            .action(value1)
            .action(value2);
        self.0.accept::<()>(call);
    }

    fn func_with_arg_and_return_value(&self, value: &str) -> i32 {
        self.0.accept(Call::new(function!()).arg(value.to_owned()))
            .unwrap_or_default()
    }

    fn func_which_throws_with_arg_and_return_value(&self, value: &str)
        -> Result<i32, Error>
    {
        self.0.throwing_accept(Call::new(function!()).arg(value.to_owned()))
            .map(Option::unwrap_or_default)
    }
}

impl MockTestProtocol {
    /// Deliberately asks for a wider type than the one it declares
    fn returns_narrowed(&self) -> u8 {
        self.0.accept::<u32>(Call::new(function!()))
            .map_or(0, |v| v as u8)
    }

    fn returns_shared(&self) -> Rc<u32> {
        self.0.accept(Call::new(function!()))
            .unwrap_or_else(|| Rc::new(0))
    }
}

fn mock() -> (MockTestProtocol, CollectingReporter) {
    let reporter = CollectingReporter::new();
    let settings = Settings::new("TestProtocol").reporter(reporter.clone());
    (MockTestProtocol::with_settings(settings), reporter)
}

#[test]
fn verify_without_expectations() {
    let (mock, reporter) = mock();
    mock.verify();
    assert!(reporter.is_empty());
}

#[test]
fn satisfied() {
    let (mock, reporter) = mock();
    mock.expect(|m| m.void_func());
    mock.void_func();
    mock.verify();
    assert!(reporter.is_empty());
}

#[test]
fn unexpected_call() {
    let (mock, reporter) = mock();
    mock.void_func();
    assert_eq!(reporter.messages(),
        ["[TestProtocol] Unexpected call: void_func"]);
}

#[test]
fn return_value() {
    let (mock, reporter) = mock();
    mock.expect(|m| m.returns_optional_string())
        .returning(Some("fnord".to_owned()));
    assert_eq!(mock.returns_optional_string().as_deref(), Some("fnord"));
    mock.verify();
    assert!(reporter.is_empty());
}

#[test]
fn fallible_returns_value() {
    let (mock, reporter) = mock();
    mock.expect_fallible(|m| m.func_which_throws())
        .returning("fnord".to_owned());
    assert_eq!(mock.func_which_throws(), Ok("fnord".to_owned()));
    mock.verify();
    assert!(reporter.is_empty());
}

#[test]
fn fallible_raises_error() {
    let (mock, reporter) = mock();
    mock.expect_fallible(|m| m.func_which_throws())
        .throwing(Error::Vogons);
    assert_eq!(mock.func_which_throws(), Err(Error::Vogons));
    mock.verify();
    assert!(reporter.is_empty());
}

#[test]
fn too_many_calls_in_expect_block() {
    let (mock, reporter) = mock();
    mock.expect(|m| {
        m.void_func();
        m.func_with_one_arg(42);
    });
    mock.verify();
    assert_eq!(reporter.messages(), [
        "[TestProtocol] Too many expectations in one expect block: \
         func_with_one_arg [42]"
    ]);
}

#[test]
fn unsatisfied() {
    let (mock, reporter) = mock();
    mock.expect(|m| m.void_func());
    mock.verify();
    assert_eq!(reporter.messages(),
        ["[TestProtocol] Unsatisfied expectation: void_func"]);
}

#[test]
fn verify_again_after_unsatisfied() {
    let (mock, reporter) = mock();
    mock.expect(|m| m.void_func());
    mock.verify();
    assert_eq!(reporter.take().len(), 1);
    mock.verify();
    assert!(reporter.is_empty());
}

#[test]
fn empty_expect_block() {
    let (mock, reporter) = mock();
    let e = mock.expect(|_| ());
    mock.verify();
    assert_eq!(e.state(), ClaimState::Invalid);
    assert!(reporter.is_empty());
}

#[test]
fn summary_one_arg() {
    let (mock, reporter) = mock();
    mock.expect(|m| m.func_with_one_arg(42));
    mock.verify();
    assert_eq!(reporter.messages(),
        ["[TestProtocol] Unsatisfied expectation: func_with_one_arg [42]"]);
}

#[test]
fn summary_optional_arg() {
    let (mock, reporter) = mock();
    mock.expect(|m| m.func_with_one_optional_arg(None));
    mock.verify();
    assert_eq!(reporter.messages(), [
        "[TestProtocol] Unsatisfied expectation: \
         func_with_one_optional_arg [nil]"
    ]);
}

#[test]
fn summary_two_args() {
    let (mock, reporter) = mock();
    mock.expect(|m| m.func_with_two_args(42, "meaning of life"));
    mock.verify();
    assert_eq!(reporter.messages(), [
        "[TestProtocol] Unsatisfied expectation: \
         func_with_two_args [42,meaning of life]"
    ]);
}

#[test]
fn summary_array_of_dicts() {
    let (mock, reporter) = mock();
    mock.expect(|m| {
        let mut first = HashMap::new();
        first.insert("one", 1);
        first.insert("two", 2);
        let mut second = HashMap::new();
        second.insert("three", 3);
        second.insert("four", 4);
        m.func_with_array_of_dicts(&[first, second]);
    });
    mock.verify();
    assert_eq!(reporter.messages(), [
        "[TestProtocol] Unsatisfied expectation: \
         func_with_array_of_dicts [[[one:1,two:2],[four:4,three:3]]]"
    ]);
}

/// Dictionaries match whatever order their entries were inserted in
#[test]
fn dict_arg_insertion_order() {
    let (mock, reporter) = mock();
    let entries = [("Arthur", 1), ("Ford", 2), ("Trillian", 3), ("Zaphod", 4),
                   ("Marvin", 5), ("Eddie", 6)];
    mock.expect(move |m| {
        let mut dict = HashMap::new();
        for (k, v) in entries {
            dict.insert(k, v);
        }
        m.func_with_dict(&dict);
    });
    let mut dict = HashMap::with_capacity(64);
    for (k, v) in entries.into_iter().rev() {
        dict.insert(k, v);
    }
    mock.func_with_dict(&dict);
    mock.verify();
    assert!(reporter.is_empty());
}

#[test]
fn action_args_are_not_checked() {
    let (mock, reporter) = mock();
    let captured = Arc::new(Mutex::new((0, String::new())));
    let c = captured.clone();
    mock.expect(|m| m.func_with_action_args(42, "Slartibartfast".to_owned()))
        .doing(move |args| {
            let mut c = c.lock().unwrap();
            c.0 = *args.get::<i32>(0).unwrap();
            c.1 = args.get::<String>(1).unwrap().clone();
        });
    mock.func_with_action_args(1, "hi".to_owned());
    mock.verify();
    assert!(reporter.is_empty());
    assert_eq!(*captured.lock().unwrap(), (1, "hi".to_owned()));
}

#[test]
fn args_are_checked_and_passed_to_actions() {
    let (mock, reporter) = mock();
    let captured = Arc::new(Mutex::new((0, String::new())));
    let c = captured.clone();
    mock.expect(|m| m.func_with_two_args(42, "Slartibartfast"))
        .doing(move |args| {
            let mut c = c.lock().unwrap();
            c.0 = *args.get::<i32>(0).unwrap();
            c.1 = args.get::<String>(1).unwrap().clone();
        });
    mock.func_with_two_args(42, "Slartibartfast");
    mock.verify();
    assert!(reporter.is_empty());
    assert_eq!(*captured.lock().unwrap(), (42, "Slartibartfast".to_owned()));
}

#[test]
fn actions_run_in_order() {
    let (mock, _reporter) = mock();
    let order = Arc::new(Mutex::new(Vec::new()));
    let o1 = order.clone();
    let o2 = order.clone();
    mock.expect(|m| m.void_func())
        .doing(move |_| o1.lock().unwrap().push(1))
        .doing(move |_| o2.lock().unwrap().push(2));
    mock.void_func();
    assert_eq!(*order.lock().unwrap(), [1, 2]);
}

#[test]
fn doing_and_returning() {
    let (mock, reporter) = mock();
    let captured = Arc::new(Mutex::new(String::new()));
    let c = captured.clone();
    mock.expect(|m| m.func_with_arg_and_return_value("Vogons"))
        .doing(move |args| {
            *c.lock().unwrap() = args.get::<String>(0).unwrap().clone();
        })
        .returning(42);
    assert_eq!(mock.func_with_arg_and_return_value("Vogons"), 42);
    mock.verify();
    assert!(reporter.is_empty());
    assert_eq!(*captured.lock().unwrap(), "Vogons");
}

#[test]
fn expected_twice_performed_once() {
    let (mock, reporter) = mock();
    mock.expect(|m| m.void_func());
    mock.expect(|m| m.void_func());
    mock.void_func();
    mock.verify();
    assert_eq!(reporter.messages(),
        ["[TestProtocol] Unsatisfied expectation: void_func"]);
}

#[test]
fn expected_twice_performed_three_times() {
    let (mock, reporter) = mock();
    mock.expect(|m| m.void_func());
    mock.expect(|m| m.void_func());
    mock.void_func();
    mock.void_func();
    mock.void_func();
    mock.verify();
    assert_eq!(reporter.messages(),
        ["[TestProtocol] Unexpected call: void_func"]);
}

#[test]
fn expected_twice_performed_twice() {
    let (mock, reporter) = mock();
    mock.expect(|m| m.void_func());
    mock.expect(|m| m.void_func());
    mock.void_func();
    mock.void_func();
    mock.verify();
    assert!(reporter.is_empty());
}

/// Identical expectations are claimed in the order they were declared
#[test]
fn claimed_in_declaration_order() {
    let (mock, _reporter) = mock();
    mock.expect(|m| m.func_with_arg_and_return_value("Arthur")).returning(1);
    mock.expect(|m| m.func_with_arg_and_return_value("Arthur")).returning(2);
    assert_eq!(mock.func_with_arg_and_return_value("Arthur"), 1);
    assert_eq!(mock.func_with_arg_and_return_value("Arthur"), 2);
}

#[test]
fn args_do_not_match_return_best_guess() {
    let (mock, reporter) = mock();
    mock.expect(|m| m.func_with_arg_and_return_value("Vogons"))
        .returning(42);
    assert_eq!(mock.func_with_arg_and_return_value("Humans"), 42);
    assert_eq!(reporter.messages(), [
        "[TestProtocol] Unexpected call: \
         func_with_arg_and_return_value [Humans]"
    ]);
}

#[test]
fn fallible_args_do_not_match_return_best_guess() {
    let (mock, reporter) = mock();
    mock.expect_fallible(|m|
        m.func_which_throws_with_arg_and_return_value("Vogons")
    ).returning(42);
    assert_eq!(mock.func_which_throws_with_arg_and_return_value("Humans"),
        Ok(42));
    assert_eq!(reporter.messages(), [
        "[TestProtocol] Unexpected call: \
         func_which_throws_with_arg_and_return_value [Humans]"
    ]);
}

#[test]
fn fallible_args_do_not_match_raise_best_guess() {
    let (mock, reporter) = mock();
    mock.expect_fallible(|m|
        m.func_which_throws_with_arg_and_return_value("Vogons")
    ).throwing(Error::Vogons);
    assert_eq!(mock.func_which_throws_with_arg_and_return_value("Humans"),
        Err(Error::Vogons));
    assert_eq!(reporter.messages(), [
        "[TestProtocol] Unexpected call: \
         func_which_throws_with_arg_and_return_value [Humans]"
    ]);
}

/// A best guess that can't be raised is not returned either
#[test]
fn best_guess_error_for_infallible_method() {
    let (mock, reporter) = mock();
    mock.expect_fallible(|m|
        m.func_which_throws_with_arg_and_return_value("Vogons")
    ).throwing(Error::Vogons);
    assert_eq!(mock.func_with_arg_and_return_value("Humans"), 0);
    assert_eq!(reporter.failures().len(), 1);
}

#[test]
fn declare_block_runs_lazily() {
    let (mock, reporter) = mock();
    let value = Arc::new(AtomicI32::new(1));
    let v = value.clone();
    let e = mock.expect(move |m| {
        m.func_with_one_arg(v.load(Ordering::SeqCst))
    });
    assert_eq!(e.state(), ClaimState::AwaitingSummary);
    assert_eq!(e.summary(), None);
    value.store(2, Ordering::SeqCst);
    mock.func_with_one_arg(2);
    assert!(e.is_claimed());
    assert_eq!(e.summary().as_deref(), Some("func_with_one_arg [2]"));
    mock.verify();
    assert!(reporter.is_empty());
}

#[test]
fn return_once() {
    let (mock, reporter) = mock();
    mock.expect(|m| m.returns_optional_string())
        .return_once(Some("once".to_owned()));
    assert_eq!(mock.returns_optional_string().as_deref(), Some("once"));
    mock.verify();
    assert!(reporter.is_empty());
}

#[test]
fn returning_st() {
    let (mock, reporter) = mock();
    mock.expect(|m| m.returns_shared()).returning_st(Rc::new(42));
    assert_eq!(*mock.returns_shared(), 42);
    mock.verify();
    assert!(reporter.is_empty());
}

/// A single-threaded value doesn't get in the way of other methods called
/// from other threads
#[test]
fn returning_st_with_calls_from_another_thread() {
    let (mock, reporter) = mock();
    mock.expect(|m| m.returns_shared()).returning_st(Rc::new(7));
    mock.expect(|m| m.func_with_arg_and_return_value("Zaphod")).returning(1);
    thread::scope(|s| {
        s.spawn(|| {
            assert_eq!(mock.func_with_arg_and_return_value("Zaphod"), 1);
        });
    });
    mock.verify();
    assert_eq!(reporter.messages(),
        ["[TestProtocol] Unsatisfied expectation: returns_shared"]);
}

/// Another thread can't borrow a single-threaded value as its best guess
#[test]
fn returning_st_best_guess_on_another_thread() {
    let (mock, reporter) = mock();
    mock.expect(|m| m.returns_shared()).returning_st(Rc::new(7));
    thread::scope(|s| {
        s.spawn(|| {
            assert_eq!(mock.func_with_arg_and_return_value("Marvin"), 0);
        });
    });
    assert_eq!(*mock.returns_shared(), 7);
    mock.verify();
    assert_eq!(reporter.messages(), [
        "[TestProtocol] Unexpected call: \
         func_with_arg_and_return_value [Marvin]"
    ]);
}

#[test]
fn outcome_mismatch_suspension_on_sync_method() {
    let (mock, reporter) = mock();
    mock.expect(|m| m.func_with_arg_and_return_value("x"))
        .async_returning(1)
        .fulfill();
    assert_eq!(mock.func_with_arg_and_return_value("x"), 0);
    assert_eq!(reporter.messages(), [
        "[TestProtocol] Outcome mismatch for func_with_arg_and_return_value \
         [x]: the expectation suspends, but the method is synchronous"
    ]);
}

#[test]
fn type_mismatch() {
    let (mock, reporter) = mock();
    mock.expect(|m| m.returns_narrowed()).returning(7u8);
    assert_eq!(mock.returns_narrowed(), 0);
    mock.verify();
    assert_eq!(reporter.messages(), [
        "[TestProtocol] Type mismatch for returns_narrowed: expected u32"
    ]);
}
