// vim: tw=80
//! Where failures go, and where they point
#![deny(warnings)]

use callmock::*;

pub struct MockFoo(MockBase);

impl Mock for MockFoo {
    fn from_base(base: MockBase) -> Self {
        MockFoo(base)
    }

    fn base(&self) -> &MockBase {
        &self.0
    }
}

impl MockFoo {
    fn foo(&self, x: u32) -> u32 {
        self.0.accept(Call::new(function!()).arg(x)).unwrap_or_default()
    }
}

#[test]
#[should_panic(expected = "[MockFoo] Unexpected call: foo [4]")]
fn panic_reporter_unexpected() {
    let settings = Settings::for_mock::<MockFoo>().reporter(PanicReporter);
    let mock = MockFoo::with_settings(settings);
    mock.foo(4);
}

#[test]
#[should_panic(expected = "[MockFoo] Unsatisfied expectation: foo [5]")]
fn panic_reporter_unsatisfied() {
    let settings = Settings::for_mock::<MockFoo>().reporter(PanicReporter);
    let mock = MockFoo::with_settings(settings);
    mock.expect(|m| m.foo(5));
    mock.verify();
}

#[test]
fn default_name() {
    let mock = MockFoo::with_settings(
        Settings::for_mock::<MockFoo>().reporter(CollectingReporter::new()));
    assert_eq!(mock.base().name(), "MockFoo");
}

/// The default reporter lets the test finish, then fails it
#[test]
#[should_panic(expected = "1 mock failure(s):\n[MockFoo] Unexpected call: foo [6]")]
fn deferred_reporter_panics_on_drop() {
    let mock = MockFoo::create();
    assert_eq!(mock.foo(6), 0);
}

#[test]
fn deferred_reporter_without_failures() {
    let mock = MockFoo::create();
    mock.expect(|m| m.foo(7)).returning(8);
    assert_eq!(mock.foo(7), 8);
    mock.verify();
}

#[test]
fn unexpected_call_points_at_the_caller() {
    let reporter = CollectingReporter::new();
    let mock = MockFoo::with_settings(
        Settings::for_mock::<MockFoo>().reporter(reporter.clone()));
    mock.foo(1);
    let reports = reporter.reports();
    assert_eq!(reports.len(), 1);
    // MockFoo::foo is the one calling accept
    assert_eq!(reports[0].location.file(), file!());
    assert_eq!(reports[0].location.line(), 21);
}

#[test]
fn unsatisfied_points_at_verify() {
    let reporter = CollectingReporter::new();
    let mock = MockFoo::with_settings(
        Settings::for_mock::<MockFoo>().reporter(reporter.clone()));
    mock.expect(|m| m.foo(1));
    let line = line!() + 1;
    mock.verify();
    let reports = reporter.reports();
    assert_eq!(reports[0].location.file(), file!());
    assert_eq!(reports[0].location.line(), line);
    assert_eq!(reports[0].failure, Failure::Unsatisfied {
        mock: "MockFoo".to_owned(),
        summary: "foo [1]".to_owned()
    });
}

#[test]
fn too_many_calls_points_at_expect() {
    let reporter = CollectingReporter::new();
    let mock = MockFoo::with_settings(
        Settings::for_mock::<MockFoo>().reporter(reporter.clone()));
    let line = line!() + 1;
    mock.expect(|m| { m.foo(1); m.foo(2) });
    mock.verify();
    let reports = reporter.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].location.line(), line);
    assert!(reports[0].to_string().starts_with(
        "[MockFoo] Too many expectations in one expect block: foo [2] at "));
}

#[test]
fn collecting_reporter_take() {
    let reporter = CollectingReporter::new();
    let mock = MockFoo::with_settings(
        Settings::for_mock::<MockFoo>().reporter(reporter.clone()));
    mock.foo(1);
    mock.foo(2);
    let failures = reporter.failures();
    assert_eq!(failures.iter().map(Failure::summary).collect::<Vec<_>>(),
        ["foo [1]", "foo [2]"]);
    assert!(failures.iter().all(|f| f.mock() == "MockFoo"));
    assert_eq!(reporter.take().len(), 2);
    assert!(reporter.is_empty());
}

/// Mocks sharing one reporter report to the same place
#[test]
fn shared_reporter() {
    let reporter = CollectingReporter::new();
    let a = MockFoo::with_settings(
        Settings::new("A").reporter(reporter.clone()));
    let b = MockFoo::with_settings(
        Settings::new("B").reporter(reporter.clone()));
    a.foo(1);
    b.foo(2);
    assert_eq!(reporter.messages(),
        ["[A] Unexpected call: foo [1]", "[B] Unexpected call: foo [2]"]);
}
