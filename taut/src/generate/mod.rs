// Copyright (c) The taut Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data-driven generators.
//!
//! A test body that calls [`generate`] or [`select`] is run more than
//! once: each full re-entry explores one more leaf of the Cartesian tree
//! formed by every generator call site the body reaches. The mechanism is
//! the re-entrant "replay a recorded path, then advance the last branch"
//! state machine familiar from stack-based subcase runners: the first
//! pass through a call site discovers how many branches or values it has
//! and records position zero; later passes replay every earlier decision
//! exactly and advance only the most recently recorded undecided call
//! site, depth-first, until every leaf has been visited once.
//!
//! `VARIANT` generators ([`generate`]) yield a value of a type; `SELECT`
//! generators ([`select`]) pick which of several always-present branches
//! runs this pass. Both are driven by the same two-pass state machine in
//! [`GeneratorSession`].

pub mod override_program;

use std::cell::RefCell;

use crate::errors::{hard_error, GeneratorDeterminismError, GeneratorEmptyError, HardErrorKind};
use crate::events::{self, Event};
use override_program::OverrideProgram;

/// A single call site's recorded state across passes.
#[derive(Clone, Debug)]
struct SiteRecord {
    name: &'static str,
    location: &'static str,
    /// The value indices this site sweeps over this session, in visiting
    /// order; ordinarily `0..arity`, narrowed by an override program's
    /// `#`/`-#` rules when one applies to this site.
    indices: Vec<usize>,
    /// Position of the current pass within `indices`.
    pos: usize,
}

struct SessionState {
    /// The call-site path recorded on the previous pass, replayed in
    /// order on this pass as each site is reached.
    recorded: Vec<SiteRecord>,
    /// How far into `recorded` this pass has replayed so far.
    cursor: usize,
    /// True for the very first pass ever made (nothing to replay yet).
    first_pass: bool,
    /// Set once every site has exhausted every branch: the test has fully
    /// enumerated its generator tree.
    done: bool,
    /// A `--generate` override in effect for this test, if one applies.
    overrides: Option<OverrideProgram>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            recorded: Vec::new(),
            cursor: 0,
            first_pass: true,
            done: false,
            overrides: None,
        }
    }
}

thread_local! {
    static SESSION: RefCell<SessionState> = RefCell::new(SessionState::new());
}

/// Owns one test's generator re-entry loop; the runner creates one of
/// these per test and calls [`GeneratorSession::next_pass`] until it
/// reports the tree is exhausted.
pub struct GeneratorSession;

impl GeneratorSession {
    pub fn new() -> Self {
        SESSION.with(|s| *s.borrow_mut() = SessionState::new());
        GeneratorSession
    }

    /// Like [`GeneratorSession::new`], but pins call sites named in
    /// `overrides` (for a test name it applies to) to a fixed index
    /// subset instead of sweeping their full arity.
    pub fn with_override(test_name: &str, overrides: OverrideProgram) -> Self {
        SESSION.with(|s| {
            let mut state = SessionState::new();
            if overrides.applies_to(test_name) {
                for generator in overrides.generators() {
                    events::emit(Event::OnRegisterGeneratorOverride {
                        name: generator.name.clone(),
                        program: test_name.to_string(),
                    });
                }
                state.overrides = Some(overrides);
            }
            *s.borrow_mut() = state;
        });
        GeneratorSession
    }

    /// Prepares the state for one more re-entry of the test body. Returns
    /// `false` when the previous pass already visited every leaf, meaning
    /// the test is done.
    pub fn next_pass(&mut self) -> bool {
        SESSION.with(|s| {
            let mut s = s.borrow_mut();
            if s.done {
                return false;
            }
            if s.first_pass {
                s.first_pass = false;
                s.cursor = 0;
                return true;
            }
            // Advance the deepest site that still has unvisited branches,
            // dropping every site recorded after it (a fresh sub-tree will
            // be discovered on the way back down).
            while let Some(last) = s.recorded.last_mut() {
                if last.pos + 1 < last.indices.len() {
                    last.pos += 1;
                    s.cursor = 0;
                    return true;
                }
                events::emit(Event::PrePruneGenerator {
                    name: last.name.to_string(),
                    location: last.location.to_string(),
                });
                s.recorded.pop();
            }
            s.done = true;
            false
        })
    }
}

impl Default for GeneratorSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Reached when a call site's recorded identity (name + location) does
/// not match what the replay cursor expected at this position, meaning
/// the test body took a different path through its generators than it
/// did on an earlier pass.
fn check_determinism(name: &'static str, location: &'static str) {
    SESSION.with(|s| {
        let s = s.borrow();
        if let Some(expected) = s.recorded.get(s.cursor) {
            if expected.name != name || expected.location != location {
                hard_error(
                    HardErrorKind::User,
                    GeneratorDeterminismError {
                        expected: format!("{}@{}", expected.name, expected.location),
                        actual: format!("{name}@{location}"),
                    }
                    .to_string(),
                );
            }
        }
    });
}

/// Records or replays one call site and returns which branch/value index
/// this pass should use at it.
fn visit_site(name: &'static str, location: &'static str, arity: usize, interrupt_if_empty: bool) -> usize {
    if arity == 0 {
        if interrupt_if_empty {
            std::panic::panic_any(crate::errors::InterruptTest::default());
        }
        hard_error(
            HardErrorKind::User,
            GeneratorEmptyError {
                name: name.to_string(),
                location: location.to_string(),
            }
            .to_string(),
        );
    }

    check_determinism(name, location);

    events::emit(Event::PreGenerate {
        name: name.to_string(),
        location: location.to_string(),
    });

    let index = SESSION.with(|s| {
        let mut s = s.borrow_mut();
        let cursor = s.cursor;
        if cursor < s.recorded.len() {
            let record = &s.recorded[cursor];
            let index = record.indices[record.pos];
            s.cursor += 1;
            index
        } else {
            debug_assert_eq!(cursor, s.recorded.len());
            let has_override = s.overrides.as_ref().and_then(|o| o.generator(name)).is_some();
            if has_override {
                events::emit(Event::OnOverrideGenerator {
                    name: name.to_string(),
                    location: location.to_string(),
                });
            }
            let indices = s
                .overrides
                .as_ref()
                .and_then(|o| o.generator(name))
                .and_then(|g| g.kept_indices(arity))
                .unwrap_or_else(|| (0..arity).collect());
            if indices.is_empty() {
                hard_error(
                    HardErrorKind::User,
                    format!("generator `{name}` at {location}: override left no indices to visit out of {arity}"),
                );
            }
            s.recorded.push(SiteRecord {
                name,
                location,
                indices: indices.clone(),
                pos: 0,
            });
            s.cursor += 1;
            indices[0]
        }
    });

    events::emit(Event::PostGenerate {
        name: name.to_string(),
        location: location.to_string(),
        index,
    });

    index
}

/// Yields one value from `values` this pass; later passes yield the next
/// value, until all have been visited once.
///
/// `name`/`location` identify the call site for determinism checking and
/// must be the same literal across every pass (the macro expansion
/// supplies these from `file!()`/`line!()` and the generator's name
/// argument, so this is automatic for ordinary use).
pub fn generate<'a, T: Clone>(name: &'static str, location: &'static str, values: &'a [T]) -> T {
    let index = visit_site(name, location, values.len(), false);
    values[index].clone()
}

/// Like [`generate`], but a test author opts into "empty source means
/// skip this repetition rather than error" by calling this form instead.
pub fn generate_or_skip<'a, T: Clone>(name: &'static str, location: &'static str, values: &'a [T]) -> T {
    let index = visit_site(name, location, values.len(), true);
    values[index].clone()
}

/// Like [`generate`], but when a `--generate` override program names this
/// call site with an `=VALUE`/`-=VALUE` literal injection or removal rule,
/// applies it against `values` before sweeping: `=VALUE` is parsed through
/// `T::from_taut_str_complete` and appended, `-=VALUE` drops any natural
/// value whose rendering equals `VALUE`. Requires `T: ToTautString +
/// FromTautString` to do so, which plain [`generate`] does not, since
/// those bounds would otherwise needlessly restrict every caller that
/// never attaches an override program.
pub fn generate_overridable<T>(name: &'static str, location: &'static str, values: &[T]) -> T
where
    T: Clone + crate::value::ToTautString + crate::value::FromTautString,
{
    let resolved = SESSION.with(|s| {
        s.borrow()
            .overrides
            .as_ref()
            .and_then(|o| o.generator(name))
            .map(|g| g.resolve_values(values))
    });
    match resolved {
        Some(resolved) => {
            let index = visit_site(name, location, resolved.len(), false);
            resolved[index].clone()
        }
        None => generate(name, location, values),
    }
}

/// Runs exactly one of `branch_count` logical branches this pass,
/// returning which index was selected; the macro expansion of `select!`
/// uses this to decide which arm's body to execute.
pub fn select(name: &'static str, location: &'static str, branch_count: usize) -> usize {
    visit_site(name, location, branch_count, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enumerates_full_cartesian_product() {
        let mut session = GeneratorSession::new();
        let mut seen = Vec::new();
        while session.next_pass() {
            let a = generate("a", "test.rs:1", &[1, 2]);
            let b = generate("b", "test.rs:2", &["x", "y"]);
            seen.push((a, b));
        }
        seen.sort();
        assert_eq!(seen, vec![(1, "x"), (1, "y"), (2, "x"), (2, "y")]);
    }

    #[test]
    fn select_runs_each_branch_once() {
        let mut session = GeneratorSession::new();
        let mut branches_run = Vec::new();
        while session.next_pass() {
            let picked = select("mode", "test.rs:3", 3);
            branches_run.push(picked);
        }
        branches_run.sort();
        assert_eq!(branches_run, vec![0, 1, 2]);
    }

    #[test]
    fn override_pins_a_call_site_to_one_index() {
        let program = override_program::parse("demo // letters#2").unwrap();
        let mut session = GeneratorSession::with_override("demo", program);
        let mut seen = Vec::new();
        while session.next_pass() {
            let value = generate("letters", "test.rs:9", &["a", "b", "c"]);
            seen.push(value);
        }
        assert_eq!(seen, vec!["b"]);
    }

    #[test]
    fn override_injects_and_removes_literal_values() {
        let program = override_program::parse("demo // count{=42,-=2}").unwrap();
        let mut session = GeneratorSession::with_override("demo", program);
        let mut seen = Vec::new();
        while session.next_pass() {
            let value = generate_overridable("count", "test.rs:10", &[1, 2, 3]);
            seen.push(value);
        }
        seen.sort();
        assert_eq!(seen, vec![1, 3, 42]);
    }

    #[test]
    fn nested_generator_depends_on_outer_choice() {
        let mut session = GeneratorSession::new();
        let mut pairs = Vec::new();
        while session.next_pass() {
            let outer = generate("outer", "test.rs:4", &[0, 1]);
            if outer == 0 {
                let inner = generate("inner", "test.rs:5", &["a", "b"]);
                pairs.push((outer, Some(inner)));
            } else {
                pairs.push((outer, None));
            }
        }
        pairs.sort();
        assert_eq!(pairs, vec![(0, Some("a")), (0, Some("b")), (1, None)]);
    }
}
