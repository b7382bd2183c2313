// Copyright (c) The taut Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test registration and suite execution.
//!
//! Tests register themselves at link time via `inventory::submit!`,
//! rather than through a build-script-generated list, so an embedder can
//! run `taut::runner::run` against whatever set of crates got linked in
//! without maintaining its own registry.

use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use crate::config::RunnerConfig;
use crate::context;
use crate::errors::{hard_error, DuplicateTestError, HardError, HardErrorKind, InterruptTest, TestNameError};
use crate::events::{self, Event, EventTally};
use crate::generate::GeneratorSession;

/// Process exit codes for an embedding binary's `main` to return.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(i32)]
pub enum ExitCode {
    Ok = 0,
    TestFailed = 1,
    BadCommandLineArguments = 2,
    NoTestNameMatch = 3,
}

/// One registered test case: a name, its source location (for duplicate
/// detection and diagnostics), the function to run, and whether it was
/// declared `disabled` in source (`#[taut::test(disabled)]`).
pub struct TestCase {
    pub name: &'static str,
    pub location: &'static str,
    pub body: fn(),
    pub disabled: bool,
}

/// The `inventory`-collected wrapper around a [`TestCase`]; tests never
/// construct this directly, the `#[taut::test]` attribute macro expands
/// to an `inventory::submit!` of one of these.
pub struct TestRegistration(pub TestCase);

inventory::collect!(TestRegistration);

/// A test name is `::`-joined segments, each matching `[A-Za-z0-9_]+`; no
/// segment may be empty (a leading, trailing, or doubled `::`).
fn validate_test_name(name: &str) -> Result<(), TestNameError> {
    if name.is_empty() {
        return Err(TestNameError::Empty);
    }
    for segment in name.split("::") {
        if segment.is_empty() {
            return Err(TestNameError::EmptySegment);
        }
        if !segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(TestNameError::InvalidSegment(segment.to_string()));
        }
    }
    Ok(())
}

fn collect_tests() -> Result<Vec<&'static TestCase>, DuplicateTestError> {
    let mut seen: Vec<&'static TestCase> = Vec::new();
    for reg in inventory::iter::<TestRegistration> {
        let case = &reg.0;
        if let Err(e) = validate_test_name(case.name) {
            hard_error(HardErrorKind::User, format!("test `{}` at {}: {e}", case.name, case.location));
        }
        if let Some(prior) = seen.iter().find(|t| t.name == case.name) {
            if prior.location == case.location {
                // The same test linked in twice from the exact same source
                // location (e.g. a crate compiled into more than one test
                // binary) is not a conflicting registration - coalesce it
                // silently rather than erroring.
                continue;
            }
            return Err(DuplicateTestError {
                name: case.name.to_string(),
                first_location: prior.location.to_string(),
                second_location: case.location.to_string(),
            });
        }
        seen.push(case);
    }
    seen.sort_by_key(|t| t.name);
    Ok(seen)
}

/// Runs every registered test matching `config`'s filter and returns the
/// process exit code to use.
///
/// A [`HardError`] unwinding out of a test body stops the whole suite
/// immediately: it means taut itself, or the test author's use of it, is
/// in a broken state that further testing cannot meaningfully recover
/// from.
pub fn run(config: &RunnerConfig) -> ExitCode {
    let tests = match collect_tests() {
        Ok(tests) => tests,
        Err(e) => {
            eprintln!("taut: {e}");
            return ExitCode::BadCommandLineArguments;
        }
    };

    let matching: Vec<&TestCase> = tests
        .into_iter()
        .filter(|t| {
            let included = config.filter.matches(t.name, t.disabled);
            events::emit(Event::OnFilterTest {
                name: t.name.to_string(),
                included,
            });
            included
        })
        .collect();

    if matching.is_empty() {
        eprintln!("taut: no test matched the given filters");
        return ExitCode::NoTestNameMatch;
    }

    if config.flags.contains(crate::config::RunnerFlags::LIST_ONLY) {
        for test in &matching {
            println!("{}", test.name);
        }
        return ExitCode::Ok;
    }

    let mut tally = EventTally::default();
    events::emit(Event::SuiteStarted {
        test_count: matching.len(),
    });

    for test in &matching {
        let outcome = run_one(test, config.generate_override.as_ref());
        tally.record(&outcome);
        events::emit(outcome.clone());
        if matches!(outcome, Event::TestFailed { .. }) && config.flags.contains(crate::config::RunnerFlags::FAIL_FAST) {
            break;
        }
    }

    events::emit(Event::SuiteFinished {
        passed: tally.passed,
        failed: tally.failed,
        skipped: tally.skipped,
    });

    if tally.failed > 0 {
        ExitCode::TestFailed
    } else {
        ExitCode::Ok
    }
}

fn run_one(test: &TestCase, generate_override: Option<&crate::generate::override_program::OverrideProgram>) -> Event {
    let start = Instant::now();
    events::emit(Event::TestStarted { name: test.name.to_string() });

    context::reset_for_new_test();
    let mut session = match generate_override {
        Some(program) => GeneratorSession::with_override(test.name, program.clone()),
        None => GeneratorSession::new(),
    };
    let mut repetitions = 0usize;

    loop {
        if !session.next_pass() {
            break;
        }
        repetitions += 1;
        context::reset_for_new_test();

        let result = panic::catch_unwind(AssertUnwindSafe(test.body));
        if let Err(payload) = result {
            if let Some(hard) = payload.downcast_ref::<HardError>() {
                eprintln!("{hard}");
                std::process::abort();
            }
            if let Some(interrupt) = payload.downcast_ref::<InterruptTest>() {
                let reason = interrupt.report.clone().unwrap_or_else(|| "test interrupted".to_string());
                events::emit(Event::PreFailTest {
                    name: test.name.to_string(),
                    reason: reason.clone(),
                });
                return Event::TestFailed {
                    name: test.name.to_string(),
                    reason,
                };
            }
            let reason = panic_message(&payload);
            events::emit(Event::UncaughtException {
                name: test.name.to_string(),
                message: reason.clone(),
            });
            events::emit(Event::PreFailTest {
                name: test.name.to_string(),
                reason: reason.clone(),
            });
            return Event::TestFailed {
                name: test.name.to_string(),
                reason,
            };
        }
        if context::is_failing() {
            let reason = "one or more soft assertions failed".to_string();
            events::emit(Event::PreFailTest {
                name: test.name.to_string(),
                reason: reason.clone(),
            });
            return Event::TestFailed {
                name: test.name.to_string(),
                reason,
            };
        }
    }

    let _elapsed = start.elapsed();
    if repetitions == 0 {
        return Event::TestSkippedEmptyGenerator {
            name: test.name.to_string(),
        };
    }
    Event::TestPassed {
        name: test.name.to_string(),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "test panicked with a non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_case(name: &'static str, location: &'static str, body: fn()) -> TestCase {
        TestCase {
            name,
            location,
            body,
            disabled: false,
        }
    }

    #[test]
    fn invalid_test_name_segment_is_rejected() {
        assert_eq!(validate_test_name("").unwrap_err(), TestNameError::Empty);
        assert_eq!(validate_test_name("a::").unwrap_err(), TestNameError::EmptySegment);
        assert_eq!(
            validate_test_name("a::b c").unwrap_err(),
            TestNameError::InvalidSegment("b c".to_string())
        );
        assert!(validate_test_name("cart::total_is_nonnegative").is_ok());
    }

    #[test]
    fn passing_test_reports_passed() {
        let case = dummy_case("unit::pass", "runner.rs:0", || {});
        match run_one(&case, None) {
            Event::TestPassed { name } => assert_eq!(name, "unit::pass"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn panicking_test_reports_failed() {
        fn body() {
            panic!("deliberate failure");
        }
        let case = dummy_case("unit::fail", "runner.rs:0", body);
        match run_one(&case, None) {
            Event::TestFailed { name, reason } => {
                assert_eq!(name, "unit::fail");
                assert!(reason.contains("deliberate"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
