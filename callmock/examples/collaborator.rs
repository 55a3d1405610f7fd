// vim: tw=80
//! Test a struct in isolation from the collaborator it depends on
//!
//! `Example` does its work by calling into a `Collaborator`.  Its tests swap
//! in `MockCollaborator`, a hand-written mock, declare which calls they
//! expect `Example` to make, and verify afterwards that it made them.
#![deny(warnings)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use callmock::*;

pub trait Collaborator {
    fn void_function(&self);
    fn function(&self, int: i32, string: &str) -> String;
    fn string_dict_function(&self, dict: &HashMap<String, String>) -> String;
}

/// The struct under test
pub struct Example<C: Collaborator> {
    collaborator: C,
}

impl<C: Collaborator> Example<C> {
    pub fn new(collaborator: C) -> Self {
        Example{collaborator}
    }

    pub fn do_something(&self) {
        self.collaborator.void_function();
    }

    pub fn do_something_with_parameters(&self, int: i32, string: &str)
        -> String
    {
        self.collaborator.function(int, string)
    }

    pub fn do_something_with_dict_parameters(
        &self,
        dict: &HashMap<String, String>
    ) -> String {
        self.collaborator.string_dict_function(dict)
    }
}

pub struct MockCollaborator(MockBase);

impl Mock for MockCollaborator {
    fn from_base(base: MockBase) -> Self {
        MockCollaborator(base)
    }

    fn base(&self) -> &MockBase {
        &self.0
    }
}

impl Collaborator for &MockCollaborator {
    fn void_function(&self) {
        self.0.accept::<()>(Call::new(function!()));
    }

    fn function(&self, int: i32, string: &str) -> String {
        let call = Call::new(function!())
            .arg(int)
            .arg(string.to_owned());
        self.0.accept(call).unwrap_or_default()
    }

    fn string_dict_function(&self, dict: &HashMap<String, String>) -> String {
        self.0.accept(Call::new(function!()).check(dict)).unwrap_or_default()
    }
}

fn collaborator() -> MockCollaborator {
    MockCollaborator::with_settings(
        Settings::for_mock::<MockCollaborator>().reporter(PanicReporter))
}

fn do_something() {
    let mock = collaborator();
    let sut = Example::new(&mock);
    mock.expect(|m| m.void_function());
    sut.do_something();
    mock.verify();
}

fn do_something_with_parameters() {
    let mock = collaborator();
    let sut = Example::new(&mock);
    mock.expect(|m| m.function(42, "frood"))
        .returning("hoopy".to_owned());
    assert_eq!(sut.do_something_with_parameters(42, "frood"), "hoopy");
    mock.verify();
}

fn string_dict() {
    let mock = collaborator();
    let sut = Example::new(&mock);
    let dict = HashMap::from([("Hello".to_owned(), "Pong".to_owned())]);
    let expected = dict.clone();
    mock.expect(move |m| m.string_dict_function(&expected))
        .returning("ping".to_owned());
    assert_eq!(sut.do_something_with_dict_parameters(&dict), "ping");
    mock.verify();
}

fn doing() {
    let mock = collaborator();
    let sut = Example::new(&mock);
    let called = Arc::new(Mutex::new(false));
    let c = called.clone();
    mock.expect(|m| m.void_function())
        .doing(move |_| *c.lock().unwrap() = true);
    sut.do_something();
    mock.verify();
    assert!(*called.lock().unwrap());
}

fn main() {
    do_something();
    do_something_with_parameters();
    string_dict();
    doing();
    println!("all expectations satisfied");
}
