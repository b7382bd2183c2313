// Copyright (c) The taut Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Expression decomposition and assertion evaluation.
//!
//! `taut_macros::check!(expr)` rewrites every `arg!(sub_expr)` marker
//! inside `expr` into a call to [`capture`], tagging each with a
//! compile-time-assigned counter and nesting depth, opens the capture
//! buffer with [`begin_assertion`], evaluates `expr`, then calls
//! [`check_impl`] with the overall boolean result and the list of
//! captures recorded along the way. This module owns what happens after
//! that: rendering a failure diagram and deciding whether to unwind.

use bitflags::bitflags;
use std::cell::{Cell, RefCell};

use crate::canvas::{Canvas, CellInfo};
use crate::context;
use crate::errors::{hard_error, HardErrorKind, InterruptTest};
use crate::value::ToTautString;

bitflags! {
    /// Per-call behavior flags baked in by the macro expansion.
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    pub struct AssertFlags: u32 {
        /// `require!`: unwind the current test on failure.
        const HARD = 1 << 0;
        /// `check!`: record the failure and keep running the test.
        const SOFT = 1 << 1;
        /// The assertion is an `expect_*`/warning-level check that never
        /// fails the test, only logs.
        const ADVISORY = 1 << 2;
    }
}

/// One captured subexpression: its source text, nesting depth, and
/// rendered value.
#[derive(Clone, Debug)]
pub struct ArgInfo {
    pub source_text: &'static str,
    pub counter_id: usize,
    pub depth: usize,
    pub rendered: String,
}

/// Where the per-assertion capture buffer currently stands: no assertion
/// is being evaluated, one is and may still record captures, or one just
/// finished and its captures were already collected by [`check_impl`].
/// [`capture`] only accepts new entries in the `InProgress` state; any
/// other state means `arg!(...)` was reached without an enclosing
/// `check!`/`require!` driving it, which is a misuse of the macro surface
/// rather than something a test body can trigger through its own logic.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum CaptureState {
    NotStarted,
    InProgress,
    Done,
}

thread_local! {
    static CAPTURES: RefCell<Vec<ArgInfo>> = const { RefCell::new(Vec::new()) };
    static CAPTURE_STATE: Cell<CaptureState> = const { Cell::new(CaptureState::NotStarted) };
}

/// Called by the macro-generated expansion of each `arg!(...)` marker.
/// Records the evaluated value's rendered form and passes the value
/// through unchanged so the surrounding expression still evaluates
/// normally.
pub fn capture<T: ToTautString>(value: T, source_text: &'static str, counter_id: usize, depth: usize) -> T {
    let state = CAPTURE_STATE.with(Cell::get);
    if state != CaptureState::InProgress {
        hard_error(
            HardErrorKind::User,
            format!("`arg!({source_text})` evaluated outside an active `check!`/`require!` assertion"),
        );
    }
    let rendered = value.to_taut_string();
    CAPTURES.with(|c| {
        c.borrow_mut().push(ArgInfo {
            source_text,
            counter_id,
            depth,
            rendered,
        });
    });
    value
}

/// Clears the thread-local capture buffer and opens it for recording;
/// called by the `check!`/`require!` expansion immediately before
/// evaluating its expression, so captures from a previous, unrelated
/// assertion can never leak in and a stray `arg!` outside any assertion
/// is caught rather than silently recorded.
///
/// Also pushes the assertion's context frame, returned as part of the
/// guard: the macro expansion holds this guard across evaluating the
/// expression (when `capture` calls happen) and drops it before calling
/// [`check_impl`], so the frame is active exactly while its captures are
/// being gathered and does not linger into the assertion's own failure
/// report as "while evaluating itself".
pub fn begin_assertion(source_text: impl Into<String>) -> context::FrameGuard {
    CAPTURES.with(|c| c.borrow_mut().clear());
    CAPTURE_STATE.with(|s| s.set(CaptureState::InProgress));
    context::push_assertion(source_text)
}

fn take_captures() -> Vec<ArgInfo> {
    CAPTURE_STATE.with(|s| s.set(CaptureState::Done));
    CAPTURES.with(|c| std::mem::take(&mut *c.borrow_mut()))
}

/// Renders the expression line plus one value box per capture, closest
/// first, into a text diagram.
///
/// A capture whose source text is a single token (e.g. a bare variable)
/// gets a plain drop line down to its value. A capture spanning more than
/// one character is a compound subexpression, not a single value, so it
/// gets a bracket over its whole span instead, with the drop line as the
/// bracket's tail; the single deepest (narrowest) subexpression is also
/// underlined with its capture index, marking which box is "closest to
/// the fault" when several nested captures are in play.
fn render_failure(expr_text: &str, captures: &[ArgInfo]) -> String {
    let mut canvas = Canvas::new();
    canvas.draw_string(0, 0, expr_text, CellInfo::plain());

    // Highlight each capture's source span within the expression text when
    // it occurs literally (it usually does, since `arg!` wraps a verbatim
    // subexpression); captures are drawn in depth order, deepest first, so
    // shallower boxes land below the narrower ones they contain.
    let mut ordered: Vec<&ArgInfo> = captures.iter().collect();
    ordered.sort_by(|a, b| b.depth.cmp(&a.depth).then(a.counter_id.cmp(&b.counter_id)));

    let max_depth = captures.iter().map(|c| c.depth).max();

    let mut row_for_counter = vec![1usize; captures.len()];
    let mut next_free_row = 2usize;
    for (slot, info) in ordered.iter().enumerate() {
        let Some(col) = expr_text.find(info.source_text) else {
            continue;
        };
        let own_width = info.source_text.chars().count();
        let width = own_width.max(info.rendered.chars().count());

        if own_width > 1 {
            canvas.draw_hor_bracket(1, col, own_width, None, 1, CellInfo::colored(slot));
        } else {
            canvas.draw_column(col, 1, 1, '\u{2502}', CellInfo::colored(slot));
        }

        if info.depth > 0 && Some(info.depth) == max_depth {
            canvas.draw_overline(next_free_row, col, own_width, &info.counter_id.to_string(), CellInfo::dimmed());
            next_free_row += 2;
        }

        let row = canvas.find_free_space(next_free_row, col, 1, width, 1, 1);
        canvas.draw_string(row, col, &info.rendered, CellInfo::colored(slot));
        row_for_counter[slot] = row;
        next_free_row = row + 1;
    }

    canvas.render(false)
}

/// Evaluates an assertion's already-computed boolean `passed`, given the
/// source text of the whole expression and the captures gathered while
/// evaluating it. Returns normally on success; on failure, either
/// unwinds with [`InterruptTest`] (hard) or marks the test failing and
/// returns (soft), per `flags`.
///
/// This is the function `taut_macros::check!`'s expansion calls after
/// evaluating the user's boolean expression.
pub fn check_impl(passed: bool, expr_text: &'static str, flags: AssertFlags) -> bool {
    let captures = take_captures();
    if passed {
        return true;
    }

    let diagram = render_failure(expr_text, &captures);
    let trace = context::trace();

    if flags.contains(AssertFlags::ADVISORY) {
        tracing::warn!(expr = expr_text, "advisory assertion failed");
        return false;
    }

    let mut report = format!("assertion failed: {expr_text}\n{diagram}");
    if !trace.is_empty() {
        report.push_str("while:\n");
        for line in &trace {
            report.push_str("  ");
            report.push_str(line);
            report.push('\n');
        }
    }

    if flags.contains(AssertFlags::HARD) {
        std::panic::panic_any(InterruptTest::with_report(report));
    }

    context::mark_failing();
    eprint!("{report}");
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passing_assertion_records_nothing_observable() {
        context::reset_for_new_test();
        let frame = begin_assertion("1 == 1");
        let a = capture(1, "1", 0, 0);
        let b = capture(1, "1", 1, 0);
        drop(frame);
        assert!(check_impl(a == b, "1 == 1", AssertFlags::SOFT));
    }

    #[test]
    fn soft_failure_marks_context_without_unwinding() {
        context::reset_for_new_test();
        let frame = begin_assertion("1 == 2");
        let a = capture(1, "1", 0, 0);
        let b = capture(2, "2", 1, 0);
        drop(frame);
        let passed = check_impl(a == b, "1 == 2", AssertFlags::SOFT);
        assert!(!passed);
        assert!(context::is_failing());
        context::reset_for_new_test();
    }

    #[test]
    fn hard_failure_unwinds_with_interrupt_test() {
        context::reset_for_new_test();
        let result = std::panic::catch_unwind(|| {
            let frame = begin_assertion("1 == 2");
            let a = capture(1, "1", 0, 0);
            let b = capture(2, "2", 1, 0);
            drop(frame);
            check_impl(a == b, "1 == 2", AssertFlags::HARD);
        });
        let err = result.unwrap_err();
        assert!(err.downcast_ref::<InterruptTest>().is_some());
        context::reset_for_new_test();
    }

    #[test]
    fn failure_report_renders_expression_and_both_captured_values() {
        context::reset_for_new_test();
        let result = std::panic::catch_unwind(|| {
            let frame = begin_assertion("1 == 2");
            let a = capture(1, "1", 0, 0);
            let b = capture(2, "2", 1, 0);
            drop(frame);
            check_impl(a == b, "1 == 2", AssertFlags::HARD);
        });
        let err = result.unwrap_err();
        let interrupt = err.downcast_ref::<InterruptTest>().unwrap();
        let report = interrupt.report.as_deref().unwrap();
        pretty_assertions::assert_eq!(
            report,
            "assertion failed: 1 == 2\n1 == 2\n\u{2502}    \u{2502}\n\n1\n     2\n"
        );
        context::reset_for_new_test();
    }

    #[test]
    fn capture_outside_an_assertion_is_a_hard_error() {
        context::reset_for_new_test();
        CAPTURE_STATE.with(|s| s.set(CaptureState::NotStarted));
        let result = std::panic::catch_unwind(|| capture(1, "1", 0, 0));
        assert!(result.is_err());
        CAPTURE_STATE.with(|s| s.set(CaptureState::NotStarted));
    }
}
