// Copyright (c) The taut Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Exception expectation for `must_throw!`.
//!
//! Rust has no exceptions; a panic caught by [`expect_throw`] is the
//! nearest analogue, and a panic's payload chained through
//! [`std::error::Error::source`] is the nearest analogue of a caught
//! exception's `what()`/cause chain. `must_throw!` expands to a call into
//! [`expect_throw`], which runs the guarded closure under
//! [`std::panic::catch_unwind`] and hands the caller a [`Thrown`] cursor
//! over the resulting chain.

use std::any::{Any, TypeId};
use std::error::Error as StdError;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use regex::Regex;

use crate::context;
use crate::events::{self, Event};

/// One link of a caught panic's cause chain.
#[derive(Debug)]
pub struct ExceptionLink {
    pub message: String,
    /// The payload's concrete `TypeId`, when known: `Some` for the
    /// top-level link of a typed panic payload (a string or a boxed
    /// `Error`), `None` for a link reconstructed from `source()` (which
    /// only hands back a `&dyn Error`, with no way to recover the
    /// original concrete type) or an untyped payload.
    pub type_id_or_unknown: Option<TypeId>,
}

/// The result of a panic caught by [`expect_throw`], giving four cursor
/// views over it: the top-level payload, the most deeply nested cause,
/// the full chain, and index-based access.
pub struct Thrown {
    chain: Vec<ExceptionLink>,
    payload_type: TypeId,
    error_chain: Option<Box<dyn StdError + Send + Sync>>,
}

impl Thrown {
    fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let payload_type = (*payload).type_id();
        let top_message = message_from_payload(&payload);
        // `std::panic::catch_unwind` only gives us the payload, not a
        // `dyn Error` - if the payload itself is an error we can walk its
        // `source()` chain; otherwise the chain is just the one message.
        let error_chain = payload.downcast::<Box<dyn StdError + Send + Sync>>().ok().map(|b| *b);

        let mut chain = vec![ExceptionLink {
            message: top_message,
            type_id_or_unknown: Some(payload_type),
        }];
        if let Some(err) = &error_chain {
            let mut current: &(dyn StdError + 'static) = err.as_ref();
            while let Some(source) = current.source() {
                chain.push(ExceptionLink {
                    message: source.to_string(),
                    type_id_or_unknown: None,
                });
                current = source;
            }
        }
        Thrown {
            chain,
            payload_type,
            error_chain,
        }
    }

    /// The chain depth a cursor addresses, for [`context::push_exception_cursor`].
    /// `All`/`Any` report depth 0 since they span the whole chain rather
    /// than pointing at one link.
    fn cursor_depth(&self, cursor: ExceptionCursor) -> usize {
        match cursor {
            ExceptionCursor::TopLevel => 0,
            ExceptionCursor::MostNested => self.chain.len().saturating_sub(1),
            ExceptionCursor::Index(i) => i,
            ExceptionCursor::All | ExceptionCursor::Any => 0,
        }
    }

    /// The `source()`-chain error at `depth`, if the payload was an
    /// error (`None` for a plain string/`&str` panic, which has no
    /// chain to walk below its own message).
    fn error_link_at(&self, depth: usize) -> Option<&(dyn StdError + 'static)> {
        let mut current: &(dyn StdError + 'static) = self.error_chain.as_ref()?.as_ref();
        for _ in 0..depth {
            current = current.source()?;
        }
        Some(current)
    }

    /// The outermost (first-thrown, in exception-chain terms "most
    /// recently caught") link.
    pub fn top_level(&self) -> &ExceptionLink {
        &self.chain[0]
    }

    /// The innermost link: the original cause at the bottom of the
    /// `source()` chain.
    pub fn most_nested(&self) -> &ExceptionLink {
        self.chain.last().unwrap()
    }

    /// All links, outermost first.
    pub fn all(&self) -> &[ExceptionLink] {
        &self.chain
    }

    /// True if any link's message contains `needle`.
    pub fn any_message_contains(&self, needle: &str) -> bool {
        self.chain.iter().any(|link| link.message.contains(needle))
    }

    pub fn index(&self, i: usize) -> Option<&ExceptionLink> {
        self.chain.get(i)
    }

    /// Structural check: does `cursor`'s link(s) match `pattern` anywhere
    /// in the message. `top_level`/`most_nested` pick one link;
    /// [`ExceptionCursor::All`] requires every link to match,
    /// [`ExceptionCursor::Any`] requires at least one.
    pub fn message_matches(&self, cursor: ExceptionCursor, pattern: &str) -> Result<bool, regex::Error> {
        let _guard = context::push_exception_cursor(self.cursor_depth(cursor));
        let re = Regex::new(pattern)?;
        Ok(match cursor {
            ExceptionCursor::TopLevel => re.is_match(&self.top_level().message),
            ExceptionCursor::MostNested => re.is_match(&self.most_nested().message),
            ExceptionCursor::All => self.chain.iter().all(|l| re.is_match(&l.message)),
            ExceptionCursor::Any => self.chain.iter().any(|l| re.is_match(&l.message)),
            ExceptionCursor::Index(i) => self.chain.get(i).is_some_and(|l| re.is_match(&l.message)),
        })
    }

    /// Exact-type match against the panic payload's own concrete type.
    ///
    /// Only the top-level link carries a recoverable concrete type: once
    /// a cause is reached via [`StdError::source`] it is only available
    /// as `&dyn Error`, with no preserved concrete type to compare
    /// against an arbitrary `T: 'static`. A derived-type check against a
    /// known `Error` type at any depth is [`Thrown::derived_type_matches`].
    pub fn type_matches<T: 'static>(&self) -> bool {
        let _guard = context::push_exception_cursor(0);
        events::emit(Event::OnExplainException {
            name: std::any::type_name::<T>().to_string(),
            explanation: "exact payload type comparison".to_string(),
        });
        self.payload_type == TypeId::of::<T>()
    }

    /// Structural match: true if the link(s) `cursor` addresses downcast
    /// to `T` somewhere along the `source()` chain.
    pub fn derived_type_matches<T: StdError + 'static>(&self, cursor: ExceptionCursor) -> bool {
        let _guard = context::push_exception_cursor(self.cursor_depth(cursor));
        let check = |depth: usize| self.error_link_at(depth).is_some_and(|e| e.downcast_ref::<T>().is_some());
        match cursor {
            ExceptionCursor::TopLevel => check(0),
            ExceptionCursor::MostNested => check(self.chain.len().saturating_sub(1)),
            ExceptionCursor::All => (0..self.chain.len()).all(check),
            ExceptionCursor::Any => (0..self.chain.len()).any(check),
            ExceptionCursor::Index(i) => check(i),
        }
    }
}

/// Which link(s) of a [`Thrown`] chain a structural check addresses.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ExceptionCursor {
    TopLevel,
    MostNested,
    All,
    Any,
    Index(usize),
}

fn message_from_payload(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(err) = payload.downcast_ref::<Box<dyn StdError + Send + Sync>>() {
        err.to_string()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Did `f` throw, and if so, what. Returns `Err` when `f` returned
/// normally without throwing: a `must_throw` block whose body returns
/// normally is itself a failure.
pub fn expect_throw<F: FnOnce() + std::panic::UnwindSafe>(f: F) -> Result<Thrown, NoThrow> {
    let _guard = context::push_exception_expectation();
    events::emit(Event::OnPreTryCatch {
        name: "must_throw".to_string(),
    });
    let previous_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {})); // suppress default panic printing while expecting one
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    panic::set_hook(previous_hook);
    match result {
        Ok(()) => {
            events::emit(Event::MissingException {
                name: "must_throw".to_string(),
                message: "block returned normally".to_string(),
            });
            Err(NoThrow)
        }
        Err(payload) => {
            if payload.downcast_ref::<crate::errors::InterruptTest>().is_some() {
                // A hard assertion failing inside a must_throw body is not
                // "the thrown exception"; propagate it so the enclosing
                // test still aborts.
                panic::resume_unwind(payload);
            }
            Ok(Thrown::from_payload(payload))
        }
    }
}

/// Returned by [`expect_throw`] when the guarded body did not panic.
#[derive(Debug)]
pub struct NoThrow;

impl fmt::Display for NoThrow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected an exception but the block returned normally")
    }
}

impl StdError for NoThrow {}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Inner;
    impl fmt::Display for Inner {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "inner cause")
        }
    }
    impl StdError for Inner {}

    #[derive(Debug)]
    struct Outer;
    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "outer failure")
        }
    }
    impl StdError for Outer {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&Inner)
        }
    }

    #[test]
    fn string_panic_is_captured() {
        let result = expect_throw(|| panic!("boom"));
        let thrown = result.unwrap();
        assert_eq!(thrown.top_level().message, "boom");
        assert_eq!(thrown.all().len(), 1);
    }

    #[test]
    fn normal_return_is_no_throw() {
        let result = expect_throw(|| {});
        assert!(result.is_err());
    }

    #[test]
    fn error_panic_walks_source_chain() {
        let result = expect_throw(|| {
            let boxed: Box<dyn StdError + Send + Sync> = Box::new(Outer);
            panic::panic_any(boxed);
        });
        let thrown = result.unwrap();
        assert_eq!(thrown.top_level().message, "outer failure");
        assert_eq!(thrown.most_nested().message, "inner cause");
        assert!(thrown.any_message_contains("inner"));
        assert!(thrown.message_matches(ExceptionCursor::MostNested, "^inner").unwrap());
        assert!(!thrown.message_matches(ExceptionCursor::TopLevel, "^inner").unwrap());
        assert!(thrown.derived_type_matches::<Outer>(ExceptionCursor::TopLevel));
        assert!(thrown.derived_type_matches::<Inner>(ExceptionCursor::MostNested));
        assert!(!thrown.derived_type_matches::<Inner>(ExceptionCursor::TopLevel));
    }

    #[test]
    fn type_matches_is_exact_on_the_top_level_payload() {
        let result = expect_throw(|| panic!("boom"));
        let thrown = result.unwrap();
        assert!(thrown.type_matches::<&'static str>());
        assert!(!thrown.type_matches::<String>());
    }
}
