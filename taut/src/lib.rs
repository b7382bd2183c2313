// Copyright (c) The taut Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A unit-testing framework built around expression decomposition: a
//! single `check!(a == b)` call captures and prints every subexpression
//! value on failure, without writing `assert_eq!`-style duplicated
//! operands.
//!
//! Start with [`runner`] for how tests are registered and executed,
//! [`assert`] for what `check!`/`require!` actually do, and [`generate`]
//! for data-driven test generation.

pub mod assert;
pub mod canvas;
pub mod catch;
pub mod config;
pub mod context;
pub mod errors;
pub mod events;
pub mod generate;
pub mod runner;
pub mod value;

pub use assert::{check_impl, ArgInfo};
pub use config::RunnerConfig;
pub use context::is_failing;
pub use errors::{HardError, HardErrorKind, InterruptTest};
pub use runner::{ExitCode, TestCase, TestRegistration};
pub use value::{FromTautString, ToTautString};

#[doc(hidden)]
pub use inventory as __inventory;

/// Marks an expression as a captured operand inside `check!`/`require!`.
///
/// Outside of those macros this macro is inert and simply evaluates to its
/// argument; `taut-macros::check` rewrites `arg!(expr)` occurrences inside
/// its own input into self-describing capture calls before this arm ever
/// runs.
#[macro_export]
macro_rules! arg {
    ($e:expr) => {
        $e
    };
}

/// Appends an eagerly-formatted entry to the current thread's log.
///
/// Log entries are never shown on a passing test; they are kept around
/// and printed alongside any context trace when the test later fails, in
/// the chronological order they and any `context!`/`context_lazy!` scopes
/// were pushed.
#[macro_export]
macro_rules! log {
    ($($arg:tt)*) => {
        $crate::context::log(format!($($arg)*))
    };
}

/// Pushes a scoped trace note, formatted immediately, that appears in any
/// failure report produced while it is still on the stack.
///
/// Returns a guard; the note is popped when the guard is dropped, so it
/// is usually bound at the top of the scope it documents (`let _ctx =
/// taut::context!(...)`).
#[macro_export]
macro_rules! context {
    ($($arg:tt)*) => {
        $crate::context::push_trace(format!($($arg)*))
    };
}

/// Like [`context!`], but re-evaluates `$thunk` every time the trace is
/// printed instead of formatting it once up front, for a scope whose
/// state keeps changing after the note is pushed.
#[macro_export]
macro_rules! context_lazy {
    ($thunk:expr) => {
        $crate::context::push_trace_lazy($thunk)
    };
}

/// Runs `$body`, requiring it to panic; on success, returns a
/// [`catch::Thrown`] cursor over the caught exception chain for further
/// structural checks. A body that returns normally is itself a hard
/// failure, interrupting the test the same way a failed `require!` would.
#[macro_export]
macro_rules! must_throw {
    ($body:block) => {{
        match $crate::catch::expect_throw(move || $body) {
            Ok(thrown) => thrown,
            Err(_no_throw) => {
                $crate::context::mark_failing();
                ::std::panic::panic_any($crate::errors::InterruptTest::with_report(
                    "expected an exception but the block returned normally".to_string(),
                ))
            }
        }
    }};
}

/// Runs exactly one of several named branches, sweeping across every
/// branch over successive repetitions of the enclosing test (the same
/// Cartesian re-entry [`generate`] uses).
///
/// ```ignore
/// taut::select! { name => {
///     small => { /* ... */ }
///     large => { /* ... */ }
/// }}
/// ```
///
/// This covers the common, fixed-arity case of `SELECT`/`VARIANT`
/// subcase selection; it does not support a branch whose presence itself
/// depends on runtime control flow (a variant declared only under some
/// condition), which would need its own two-pass discovery macro. See
/// `DESIGN.md` for why that distinction was left unimplemented.
#[macro_export]
macro_rules! select {
    ($name:expr => { $($label:ident => $body:block)+ }) => {{
        let __taut_branch_names: &[&str] = &[$(stringify!($label)),+];
        let __taut_picked = $crate::generate::select($name, concat!(file!(), ":", line!()), __taut_branch_names.len());
        let mut __taut_index = 0usize;
        $(
            if __taut_index == __taut_picked {
                $body
            }
            #[allow(unused_assignments)]
            { __taut_index += 1; }
        )+
    }};
}
