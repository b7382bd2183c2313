// Copyright (c) The taut Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end checks of the registry and runner against ordinary Rust
//! functions standing in for `#[taut::test]`-registered cases: this file
//! drives `taut::runner::run_one`-equivalent behavior through the public
//! surface a generated test body actually calls. `macro_expansion.rs`, in
//! this same directory, is where `#[taut::test]`/`check!`/`require!`
//! themselves get exercised, since expanding a proc macro attribute needs
//! its own compiled test binary rather than a unit test inside the crate
//! that defines it.

use taut::config::{NameFilter, RunnerConfig, RunnerFlags};
use taut::context;
use taut::generate::{generate, select, GeneratorSession};

#[test]
fn name_filter_matches_registration_order_independent_of_case() {
    let filter = NameFilter::new().include("cart::").unwrap();
    assert!(filter.matches("cart::total_is_nonnegative", false));
    assert!(!filter.matches("checkout::total_is_nonnegative", false));
}

#[test]
fn runner_config_color_precedence() {
    let mut config = RunnerConfig::new();
    assert!(config.color_enabled(true));
    assert!(!config.color_enabled(false));
    config.flags |= RunnerFlags::FORCE_COLOR;
    assert!(config.color_enabled(false));
    config.flags |= RunnerFlags::NO_COLOR;
    assert!(!config.color_enabled(true));
}

#[test]
fn generator_sweep_runs_every_combination_once() {
    context::reset_for_new_test();
    let mut session = GeneratorSession::new();
    let mut combos = Vec::new();
    while session.next_pass() {
        let quantity = generate("quantity", "runner_basics.rs:1", &[1, 2, 3]);
        let branch = select("discount_tier", "runner_basics.rs:2", 2);
        combos.push((quantity, branch));
    }
    combos.sort();
    assert_eq!(
        combos,
        vec![(1, 0), (1, 1), (2, 0), (2, 1), (3, 0), (3, 1)]
    );
}

#[test]
fn context_trace_is_empty_between_tests() {
    context::reset_for_new_test();
    assert!(context::trace().is_empty());
    assert!(!context::is_failing());
}
