// Copyright (c) The taut Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Exercises the `log!`/`context!`/`context_lazy!`/`must_throw!`/`select!`
//! macro surface end to end, as a test author would actually write them,
//! rather than only the lower-level functions they expand into.

use taut::context;
use taut::generate::GeneratorSession;

#[test]
fn log_and_context_macros_format_like_format_args() {
    context::reset_for_new_test();
    taut::log!("queued {} items", 3);
    let _scope = taut::context!("processing batch {}", "alpha");
    assert_eq!(context::log_entries(), vec!["queued 3 items".to_string()]);
    assert_eq!(context::trace(), vec!["processing batch alpha".to_string()]);
    context::reset_for_new_test();
}

#[test]
fn context_lazy_macro_reflects_state_at_read_time() {
    use std::cell::Cell;
    use std::rc::Rc;

    context::reset_for_new_test();
    let stage = Rc::new(Cell::new("start"));
    let for_closure = Rc::clone(&stage);
    let guard = taut::context_lazy!(move || format!("stage={}", for_closure.get()));
    assert_eq!(context::trace(), vec!["stage=start".to_string()]);
    stage.set("mid");
    assert_eq!(context::trace(), vec!["stage=mid".to_string()]);
    drop(guard);
    context::reset_for_new_test();
}

#[test]
fn must_throw_returns_a_thrown_cursor_on_panic() {
    let thrown = taut::must_throw!({
        panic!("boom");
    });
    assert_eq!(thrown.top_level().message, "boom");
}

#[test]
fn must_throw_interrupts_the_test_when_body_does_not_panic() {
    let result = std::panic::catch_unwind(|| {
        let _ = taut::must_throw!({});
    });
    let err = result.unwrap_err();
    assert!(err.downcast_ref::<taut::InterruptTest>().is_some());
}

#[test]
fn select_macro_runs_each_branch_once_across_the_generator_sweep() {
    context::reset_for_new_test();
    let mut session = GeneratorSession::new();
    let mut seen = Vec::new();
    while session.next_pass() {
        taut::select! { "mode" => {
            small => { seen.push("small"); }
            medium => { seen.push("medium"); }
            large => { seen.push("large"); }
        }}
    }
    seen.sort();
    assert_eq!(seen, vec!["large", "medium", "small"]);
    context::reset_for_new_test();
}
