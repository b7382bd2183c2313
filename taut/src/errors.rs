// Copyright (c) The taut Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by taut: recoverable errors returned as `Result`, and
//! process-fatal misuse signaled by panicking with a [`HardError`]
//! payload.

use miette::{Diagnostic, SourceSpan};
use std::fmt;
use thiserror::Error;

/// Distinguishes a bug in taut itself from a misuse of taut by a test author.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum HardErrorKind {
    /// A programming error in the test author's code (e.g. a generator
    /// reached out of order, a `FrameGuard` destroyed out of stack order).
    User,
    /// An invariant inside taut itself was violated.
    Internal,
}

impl fmt::Display for HardErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HardErrorKind::User => write!(f, "user error"),
            HardErrorKind::Internal => write!(f, "internal error"),
        }
    }
}

/// The payload carried by a process-fatal panic.
///
/// The runner distinguishes this from an ordinary test panic (test
/// failure) and from [`InterruptTest`] (normal test-body unwind): seeing
/// this payload unwind past the runner's per-test catch boundary means the
/// whole process must stop.
#[derive(Clone, Debug)]
pub struct HardError {
    pub kind: HardErrorKind,
    pub message: String,
}

impl fmt::Display for HardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "taut: {}: {}", self.kind, self.message)
    }
}

impl std::error::Error for HardError {}

/// Aborts the current thread with a [`HardError`] payload.
///
/// This panics rather than returning a `Result`: a hard error terminates
/// the process with a diagnostic and cannot be handled by ordinary
/// control flow. The runner's top-level catch boundary (`crate::runner`)
/// is the only place this is caught, and only in order to print the
/// diagnostic before re-aborting.
#[track_caller]
pub fn hard_error(kind: HardErrorKind, message: impl Into<String>) -> ! {
    let err = HardError {
        kind,
        message: message.into(),
    };
    std::panic::panic_any(err);
}

/// The sentinel unwound through a test body on hard-assertion failure.
///
/// Unlike [`HardError`], catching this and stopping unwinding is the
/// normal, expected way to end one repetition of a test.
#[derive(Clone, Debug, Default)]
pub struct InterruptTest {
    /// The already-rendered failure report, if this interrupt carries one
    /// (a hard assertion failure); `None` for other kinds of interruption,
    /// such as a generator signaling exhaustion mid-test.
    pub report: Option<String>,
}

impl InterruptTest {
    pub fn with_report(report: impl Into<String>) -> Self {
        Self {
            report: Some(report.into()),
        }
    }
}

impl fmt::Display for InterruptTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.report {
            Some(report) => write!(f, "{report}"),
            None => write!(f, "test interrupted"),
        }
    }
}

impl std::error::Error for InterruptTest {}

/// Error returned by [`crate::value::FromTautString`] implementations.
///
/// `from_string` consumes a prefix of the input on success; on failure the
/// cursor is left at the first offending byte and this carries a
/// human-readable diagnostic.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("{message}")]
pub struct ValueParseError {
    pub message: String,
    /// Byte offset into the original input at which parsing failed.
    pub offset: usize,
}

impl ValueParseError {
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

/// Error from the escape/unescape grammar.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum EscapeError {
    #[error("unterminated escape sequence")]
    Unterminated,
    #[error("invalid escape sequence `\\{0}`")]
    UnknownEscape(char),
    #[error("escape sequence encodes a surrogate codepoint (0x{0:x})")]
    Surrogate(u32),
    #[error("escape sequence encodes a codepoint beyond 0x10FFFF (0x{0:x})")]
    OutOfRange(u32),
    #[error("escape value does not fit in the target character width")]
    TooWide,
    #[error("invalid UTF-8 in input")]
    InvalidUtf8,
}

/// Error raised when parsing a `--generate` override program. Carries a
/// span so the caller can render a caret diagnostic.
#[derive(Clone, Debug, Error, Diagnostic, Eq, PartialEq)]
#[error("{message}")]
pub struct OverrideProgramParseError {
    pub message: String,
    #[label("here")]
    pub span: SourceSpan,
}

impl OverrideProgramParseError {
    pub fn new(message: impl Into<String>, offset: usize, len: usize) -> Self {
        Self {
            message: message.into(),
            span: (offset, len.max(1)).into(),
        }
    }
}

/// A test name failed the `[A-Za-z0-9_]`-segments-joined-by-`::` grammar.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum TestNameError {
    #[error("test name is empty")]
    Empty,
    #[error("test name segment `{0}` contains characters other than [A-Za-z0-9_]")]
    InvalidSegment(String),
    #[error("test name has an empty segment (consecutive or leading/trailing `/`)")]
    EmptySegment,
}

/// Raised by the registry when two tests with the same name are registered
/// at different source locations.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("duplicate test name `{name}`, registered at both {first_location} and {second_location}")]
pub struct DuplicateTestError {
    pub name: String,
    pub first_location: String,
    pub second_location: String,
}

/// Raised when a generator's source produces no values and it was not
/// marked `interrupt_test_if_empty`.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("generator `{name}` at {location} produced no values")]
pub struct GeneratorEmptyError {
    pub name: String,
    pub location: String,
}

/// Raised when a test re-entry visits a different sequence of generator
/// call sites than the previous pass.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error(
    "generator visitation is nondeterministic: expected to reach `{expected}` but reached `{actual}`"
)]
pub struct GeneratorDeterminismError {
    pub expected: String,
    pub actual: String,
}
