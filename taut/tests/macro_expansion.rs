// Copyright (c) The taut Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Exercises `#[taut::test]`, `check!`, `require!`, and `arg!` through
//! genuine proc-macro expansion, rather than calling the functions they
//! expand to directly. `runner_basics.rs`, in this same directory, covers
//! the runner/registry machinery those expansions ultimately call into.

use std::panic::{self, AssertUnwindSafe};

use taut::arg;
use taut_macros::{check, require};

#[test]
fn passing_check_does_not_mark_the_test_failing() {
    taut::context::reset_for_new_test();
    let price = 3;
    let quantity = 4;
    check!(arg!(price * quantity) == arg!(12));
    assert!(!taut::is_failing());
}

#[test]
fn failing_check_marks_the_test_failing_without_unwinding() {
    taut::context::reset_for_new_test();
    let price = 3;
    let quantity = 4;
    check!(arg!(price * quantity) == arg!(10));
    assert!(taut::is_failing(), "a false check! must mark the test failing");
    // Execution reaches here: `check!` does not unwind.
    taut::context::reset_for_new_test();
}

#[test]
fn failing_require_unwinds_the_current_repetition() {
    taut::context::reset_for_new_test();
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let total = 0;
        require!(arg!(total) > arg!(0));
        unreachable!("require! of a false condition must unwind before this runs");
    }));
    assert!(result.is_err(), "a false require! must unwind");
    taut::context::reset_for_new_test();
}

#[taut_macros::test]
#[allow(dead_code)]
fn registered_via_attribute_macro() {
    check!(arg!(1 + 1) == arg!(2));
}

#[test]
fn attribute_macro_registers_into_the_inventory() {
    let found = taut::__inventory::iter::<taut::TestRegistration>
        .into_iter()
        .any(|reg| reg.0.name == "registered_via_attribute_macro");
    assert!(found, "#[taut::test] must submit a TestRegistration reachable via inventory");
}

#[taut_macros::test(disabled)]
#[allow(dead_code)]
fn disabled_via_attribute_macro() {
    require!(arg!(false));
}

#[test]
fn disabled_attribute_flag_reaches_the_test_case() {
    let case = taut::__inventory::iter::<taut::TestRegistration>
        .into_iter()
        .find(|reg| reg.0.name == "disabled_via_attribute_macro")
        .expect("disabled_via_attribute_macro must still be registered");
    assert!(case.0.disabled, "`#[taut::test(disabled)]` must set TestCase::disabled");
}
