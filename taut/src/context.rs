// Copyright (c) The taut Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-thread assertion and logging context.
//!
//! A stack of [`Frame`]s tracks what the current thread is "inside" right
//! now: an in-progress assertion, an exception expectation, a user-pushed
//! trace note. Frames are pushed by [`FrameGuard::push`] and popped
//! strictly LIFO by `Drop`; trying to pop out of order is a programming
//! error and raises a hard error rather than silently desyncing the
//! stack, since any frame still below it on the stack can no longer trust
//! its own lifetime.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use crate::errors::hard_error;

/// One entry in the per-thread context stack.
pub enum Frame {
    /// An assertion (`check!`/`require!`) is currently being evaluated;
    /// carries the macro-supplied source text for use in a hard error's
    /// "while evaluating" trace if the assertion machinery itself panics.
    Assertion { source_text: String },
    /// A `must_throw!` block is collecting an exception to inspect.
    ExceptionExpectation,
    /// Iterating the exception chain produced by a caught panic, tracking
    /// which link of the chain is being inspected.
    CaughtExceptionCursor { depth: usize },
    /// A user-supplied trace note pushed via [`push_trace`].
    UserTrace { message: String },
    /// A user-supplied trace note pushed via [`push_trace_lazy`]; the
    /// closure is re-invoked every time the trace is printed, never
    /// cached, so it can report the enclosing scope's latest state.
    UserTraceLazy { render: Rc<dyn Fn() -> String> },
    /// The source location of a pending lazily-formatted log entry.
    LogSourceLoc { file: &'static str, line: u32 },
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Assertion { source_text } => f.debug_struct("Assertion").field("source_text", source_text).finish(),
            Frame::ExceptionExpectation => write!(f, "ExceptionExpectation"),
            Frame::CaughtExceptionCursor { depth } => f.debug_struct("CaughtExceptionCursor").field("depth", depth).finish(),
            Frame::UserTrace { message } => f.debug_struct("UserTrace").field("message", message).finish(),
            Frame::UserTraceLazy { .. } => write!(f, "UserTraceLazy(..)"),
            Frame::LogSourceLoc { file, line } => f.debug_struct("LogSourceLoc").field("file", file).field("line", line).finish(),
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Assertion { source_text } => write!(f, "while evaluating `{source_text}`"),
            Frame::ExceptionExpectation => write!(f, "while expecting an exception"),
            Frame::CaughtExceptionCursor { depth } => write!(f, "at exception chain depth {depth}"),
            Frame::UserTrace { message } => write!(f, "{message}"),
            Frame::UserTraceLazy { render } => write!(f, "{}", render()),
            Frame::LogSourceLoc { file, line } => write!(f, "at {file}:{line}"),
        }
    }
}

/// The identity a [`Frame`] is deduplicated on: two frames with equal keys
/// are the same logical frame, and pushing one while the other is still
/// active is a no-op rather than a second stack entry.
#[derive(Clone, PartialEq, Eq, Hash)]
enum FrameKey {
    Assertion(String),
    ExceptionExpectation,
    CaughtExceptionCursor(usize),
    UserTrace(String),
    /// Identity of the closure itself: the `Rc` backing a lazy trace is
    /// unique per [`push_trace_lazy`] call and stays alive for as long as
    /// its dedup entry does, so its address is a valid identity.
    UserTraceLazy(usize),
    LogSourceLoc(&'static str, u32),
}

impl Frame {
    fn key(&self) -> FrameKey {
        match self {
            Frame::Assertion { source_text } => FrameKey::Assertion(source_text.clone()),
            Frame::ExceptionExpectation => FrameKey::ExceptionExpectation,
            Frame::CaughtExceptionCursor { depth } => FrameKey::CaughtExceptionCursor(*depth),
            Frame::UserTrace { message } => FrameKey::UserTrace(message.clone()),
            Frame::UserTraceLazy { render } => FrameKey::UserTraceLazy(Rc::as_ptr(render) as *const () as usize),
            Frame::LogSourceLoc { file, line } => FrameKey::LogSourceLoc(file, *line),
        }
    }
}

/// A log entry's payload: either already formatted, or a closure
/// re-invoked on every print (never cached), for a log message whose
/// value may change between when it was pushed and when the test fails.
enum LogPayload {
    Eager(String),
    /// `file`/`line` are where [`log_lazy`] was called, pushed as a
    /// [`Frame::LogSourceLoc`] while `render` runs so a panic inside the
    /// closure is reported against the log call site rather than wherever
    /// the log happens to be printed from.
    Lazy {
        render: Rc<dyn Fn() -> String>,
        file: &'static str,
        line: u32,
    },
}

/// One entry in the per-thread log, in the order it was recorded.
pub struct LogEntry {
    pub id: u64,
    payload: LogPayload,
}

impl LogEntry {
    /// The entry's current text; re-evaluates a lazy entry's closure each
    /// call rather than caching its first result.
    pub fn render(&self) -> String {
        match &self.payload {
            LogPayload::Eager(s) => s.clone(),
            LogPayload::Lazy { render, file, line } => {
                let _frame = push_log_source_loc(file, *line);
                render()
            }
        }
    }
}

struct ThreadState {
    stack: Vec<Frame>,
    /// Mirrors `stack`'s content by key: a frame already present here is
    /// not pushed again, per the one-active-instance-per-key invariant.
    dedup: HashSet<FrameKey>,
    failing: bool,
    log: Vec<LogEntry>,
    next_log_id: u64,
}

impl ThreadState {
    fn new() -> Self {
        Self {
            stack: Vec::new(),
            dedup: HashSet::new(),
            failing: false,
            log: Vec::new(),
            next_log_id: 0,
        }
    }
}

thread_local! {
    static STATE: RefCell<ThreadState> = RefCell::new(ThreadState::new());
}

/// An RAII token returned by [`FrameGuard::push`]. Popping out of stack
/// order (e.g. dropping an outer guard before an inner one) is a hard
/// error: the context stack would otherwise silently desynchronize from
/// the call stack that produced it.
///
/// Pushing a frame whose key is already active elsewhere on the stack is
/// a no-op: the returned guard carries no stack entry of its own and
/// drops without touching the stack, so that the frame which is actually
/// on the stack is the one that gets popped, and only once.
pub struct FrameGuard {
    active: Option<(usize, FrameKey)>,
}

impl FrameGuard {
    fn push(frame: Frame) -> Self {
        let key = frame.key();
        STATE.with(|s| {
            let mut s = s.borrow_mut();
            if !s.dedup.insert(key.clone()) {
                return FrameGuard { active: None };
            }
            s.stack.push(frame);
            FrameGuard {
                active: Some((s.stack.len(), key)),
            }
        })
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        let Some((depth, key)) = self.active.take() else {
            return;
        };
        STATE.with(|s| {
            let mut s = s.borrow_mut();
            if s.stack.len() != depth {
                hard_error(
                    crate::errors::HardErrorKind::Internal,
                    format!(
                        "context frame popped out of order: expected stack depth {}, found {}",
                        depth,
                        s.stack.len()
                    ),
                );
            }
            s.stack.pop();
            s.dedup.remove(&key);
        });
    }
}

/// Pushes an assertion frame for the duration of the returned guard's
/// lifetime.
pub fn push_assertion(source_text: impl Into<String>) -> FrameGuard {
    FrameGuard::push(Frame::Assertion {
        source_text: source_text.into(),
    })
}

/// Pushes an exception-expectation frame.
pub fn push_exception_expectation() -> FrameGuard {
    FrameGuard::push(Frame::ExceptionExpectation)
}

/// Pushes a cursor frame while inspecting one link of a caught exception
/// chain.
pub fn push_exception_cursor(depth: usize) -> FrameGuard {
    FrameGuard::push(Frame::CaughtExceptionCursor { depth })
}

/// Pushes a user-supplied trace note, surfaced in any failure that occurs
/// while it is on the stack.
pub fn push_trace(message: impl Into<String>) -> FrameGuard {
    FrameGuard::push(Frame::UserTrace {
        message: message.into(),
    })
}

/// Like [`push_trace`], but `render` is re-invoked every time the trace is
/// printed rather than formatted once up front; backs `CONTEXT_LAZY`.
pub fn push_trace_lazy(render: impl Fn() -> String + 'static) -> FrameGuard {
    FrameGuard::push(Frame::UserTraceLazy { render: Rc::new(render) })
}

/// Pushes the source location of a lazily-rendered log entry for the
/// duration of its closure's evaluation.
pub fn push_log_source_loc(file: &'static str, line: u32) -> FrameGuard {
    FrameGuard::push(Frame::LogSourceLoc { file, line })
}

/// Returns the current stack of active frames, outermost first, formatted
/// for display in a failure report.
pub fn trace() -> Vec<String> {
    STATE.with(|s| s.borrow().stack.iter().map(|f| f.to_string()).collect())
}

/// Marks the current test as failing without unwinding; used by the soft
/// (`AssertFlags::SOFT`) assertion path.
pub fn mark_failing() {
    STATE.with(|s| s.borrow_mut().failing = true);
}

/// Returns whether the current test has recorded a soft failure.
///
/// Exposed as `taut::is_failing()`, for a test to cheaply early-exit
/// expensive follow-up work once a soft assertion has already failed.
pub fn is_failing() -> bool {
    STATE.with(|s| s.borrow().failing)
}

/// Resets per-test state; called by the runner between tests so that
/// soft-failure flags and logs from one test never leak into the next.
pub fn reset_for_new_test() {
    STATE.with(|s| {
        let mut s = s.borrow_mut();
        s.failing = false;
        s.log.clear();
        s.next_log_id = 0;
        debug_assert!(s.stack.is_empty(), "context stack not empty between tests");
        debug_assert!(s.dedup.is_empty(), "context dedup set not empty between tests");
    });
}

/// Appends a message to the current thread's log, returning its
/// monotonically increasing id.
pub fn log(message: impl Into<String>) -> u64 {
    push_log_entry(LogPayload::Eager(message.into()))
}

/// Like [`log`], but `render` is re-invoked every time the log is printed
/// rather than formatted once up front. `file`/`line` identify where this
/// was called, so a failure while rendering the entry can be traced back
/// to the log call site rather than the print site.
pub fn log_lazy(render: impl Fn() -> String + 'static, file: &'static str, line: u32) -> u64 {
    push_log_entry(LogPayload::Lazy {
        render: Rc::new(render),
        file,
        line,
    })
}

fn push_log_entry(payload: LogPayload) -> u64 {
    STATE.with(|s| {
        let mut s = s.borrow_mut();
        let id = s.next_log_id;
        s.next_log_id += 1;
        s.log.push(LogEntry { id, payload });
        id
    })
}

/// Returns a snapshot of the log entries recorded so far on this thread,
/// rendering any lazy entry fresh rather than reusing a cached value.
pub fn log_entries() -> Vec<String> {
    STATE.with(|s| s.borrow().log.iter().map(LogEntry::render).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failing_flag_round_trips() {
        reset_for_new_test();
        assert!(!is_failing());
        mark_failing();
        assert!(is_failing());
        reset_for_new_test();
        assert!(!is_failing());
    }

    #[test]
    fn trace_reflects_active_frames() {
        reset_for_new_test();
        assert!(trace().is_empty());
        let guard = push_trace("inside widget setup");
        assert_eq!(trace(), vec!["inside widget setup".to_string()]);
        drop(guard);
        assert!(trace().is_empty());
    }

    #[test]
    fn log_ids_are_monotonic() {
        reset_for_new_test();
        let a = log("first");
        let b = log("second");
        assert!(b > a);
        assert_eq!(log_entries(), vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn lazy_log_entry_reflects_state_at_print_time_not_push_time() {
        use std::cell::Cell;
        use std::rc::Rc;

        reset_for_new_test();
        let counter = Rc::new(Cell::new(0));
        let for_closure = Rc::clone(&counter);
        log_lazy(move || format!("count={}", for_closure.get()), file!(), line!());
        counter.set(5);
        assert_eq!(log_entries(), vec!["count=5".to_string()]);
        counter.set(9);
        assert_eq!(log_entries(), vec!["count=9".to_string()]);
    }

    #[test]
    fn lazy_trace_is_re_rendered_on_every_read() {
        use std::cell::Cell;
        use std::rc::Rc;

        reset_for_new_test();
        let state = Rc::new(Cell::new("idle"));
        let for_closure = Rc::clone(&state);
        let guard = push_trace_lazy(move || format!("phase={}", for_closure.get()));
        assert_eq!(trace(), vec!["phase=idle".to_string()]);
        state.set("armed");
        assert_eq!(trace(), vec!["phase=armed".to_string()]);
        drop(guard);
        assert!(trace().is_empty());
    }

    #[test]
    fn pushing_a_content_identical_frame_twice_is_a_no_op() {
        reset_for_new_test();
        let outer = push_trace("retrying widget setup");
        let inner = push_trace("retrying widget setup");
        assert_eq!(trace(), vec!["retrying widget setup".to_string()]);
        drop(inner);
        assert_eq!(trace(), vec!["retrying widget setup".to_string()]);
        drop(outer);
        assert!(trace().is_empty());
    }

    #[test]
    fn distinct_frames_stack_independently() {
        reset_for_new_test();
        let a = push_trace("phase a");
        let b = push_trace("phase b");
        assert_eq!(trace(), vec!["phase a".to_string(), "phase b".to_string()]);
        drop(b);
        drop(a);
        assert!(trace().is_empty());
    }
}
