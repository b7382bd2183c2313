// Copyright (c) The taut Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runner configuration. Argv parsing is out of scope here; callers that
//! want a CLI build one with `clap` or similar and populate
//! [`RunnerConfig`] themselves.

use bitflags::bitflags;
use regex::Regex;

use crate::generate::override_program::OverrideProgram;

bitflags! {
    /// Behavioral toggles consulted while running a suite, stored as a
    /// bitflag set for cheap copying through the runner's hot path.
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    pub struct RunnerFlags: u32 {
        /// Stop the whole suite at the first failing test rather than
        /// continuing to the next registered test.
        const FAIL_FAST = 1 << 0;
        /// Force color output even when stdout is not a terminal.
        const FORCE_COLOR = 1 << 1;
        /// Suppress color output unconditionally.
        const NO_COLOR = 1 << 2;
        /// List matching tests without running them.
        const LIST_ONLY = 1 << 3;
        /// Run each test's generator sweep in a single pass, failing at the
        /// first non-deterministic parameter rather than re-walking it.
        const STRICT_DETERMINISM = 1 << 4;
    }
}

/// Whether a declared pattern turns matching tests on or off.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum FilterPatternKind {
    Include,
    Exclude,
}

#[derive(Clone, Debug)]
struct FilterPattern {
    kind: FilterPatternKind,
    regex: Regex,
}

/// Name-based test selection, built from `--include`/`--force-include`/
/// `--exclude` regexes: a force-included test runs even if an exclude
/// pattern would otherwise drop it, and even if the test is disabled in
/// source.
///
/// `--include`/`--exclude` are not independent set operations: a test
/// starts in an undecided state, and every pattern that matches it, in
/// the order the patterns were declared, toggles whether it runs — the
/// first matching pattern sets the state (`Include` on, `Exclude` off),
/// and each later matching pattern flips whatever the state currently is.
/// This means `--include foo --exclude foo` and `--exclude foo --include
/// foo` are different: the former ends excluded (on, then flipped off),
/// the latter ends included (off, then flipped on).
#[derive(Clone, Debug, Default)]
pub struct NameFilter {
    patterns: Vec<FilterPattern>,
    force_include: Vec<Regex>,
}

impl NameFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `--include REGEX` / `-i`.
    pub fn include(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.patterns.push(FilterPattern {
            kind: FilterPatternKind::Include,
            regex: Regex::new(pattern)?,
        });
        Ok(self)
    }

    /// `--exclude REGEX` / `-e`.
    pub fn exclude(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.patterns.push(FilterPattern {
            kind: FilterPatternKind::Exclude,
            regex: Regex::new(pattern)?,
        });
        Ok(self)
    }

    /// `--force-include REGEX` / `-I`: matches run even if excluded, and
    /// even if no `--include` would otherwise have selected them.
    pub fn force_include(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.force_include.push(Regex::new(pattern)?);
        Ok(self)
    }

    /// Whether a test named `full_name` runs. `disabled` is the test's
    /// own source-level flag (`#[taut::test(disabled)]`): a disabled test
    /// can only be brought back by a force-include pattern, never by an
    /// ordinary `--include`.
    pub fn matches(&self, full_name: &str, disabled: bool) -> bool {
        if self.force_include.iter().any(|r| r.is_match(full_name)) {
            return true;
        }
        if disabled {
            return false;
        }
        let mut enabled: Option<bool> = None;
        for pattern in &self.patterns {
            if pattern.regex.is_match(full_name) {
                enabled = Some(match enabled {
                    None => pattern.kind == FilterPatternKind::Include,
                    Some(state) => !state,
                });
            }
        }
        enabled.unwrap_or(true)
    }
}

/// Top-level knobs for a test run, constructed by an embedding binary
/// (e.g. a thin `main.rs` built on `clap`) and passed to
/// [`crate::runner::run`].
#[derive(Clone, Debug, Default)]
pub struct RunnerConfig {
    pub flags: RunnerFlags,
    pub filter: NameFilter,
    /// Seed for any randomized ordering of test execution; `None` runs
    /// tests in registration order.
    pub shuffle_seed: Option<u64>,
    /// A parsed `--generate` override program, applied to each test whose
    /// name it matches.
    pub generate_override: Option<OverrideProgram>,
}

impl RunnerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn color_enabled(&self, stdout_is_terminal: bool) -> bool {
        if self.flags.contains(RunnerFlags::NO_COLOR) {
            false
        } else if self.flags.contains(RunnerFlags::FORCE_COLOR) {
            true
        } else {
            stdout_is_terminal
        }
    }
}

impl Default for RunnerFlags {
    fn default() -> Self {
        RunnerFlags::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn force_include_bypasses_exclude() {
        let filter = NameFilter::new()
            .exclude("slow")
            .unwrap()
            .force_include("^suite::slow_but_wanted$")
            .unwrap();
        assert!(filter.matches("suite::slow_but_wanted", false));
        assert!(!filter.matches("suite::slow_other", false));
    }

    #[test]
    fn include_regex_narrows_the_default_match_all() {
        let filter = NameFilter::new().include("^suite::a").unwrap();
        assert!(filter.matches("suite::a::one", false));
        assert!(!filter.matches("suite::b::one", false));
    }

    #[test]
    fn pattern_order_changes_the_outcome() {
        let include_then_exclude = NameFilter::new().include("foo").unwrap().exclude("foo").unwrap();
        assert!(!include_then_exclude.matches("foo", false));

        let exclude_then_include = NameFilter::new().exclude("foo").unwrap().include("foo").unwrap();
        assert!(exclude_then_include.matches("foo", false));
    }

    #[test]
    fn disabled_test_only_runs_if_force_included() {
        let filter = NameFilter::new();
        assert!(!filter.matches("suite::skipped", true));

        let filter = NameFilter::new().force_include("^suite::skipped$").unwrap();
        assert!(filter.matches("suite::skipped", true));
    }

    #[test]
    fn no_color_wins_over_force_color() {
        let mut config = RunnerConfig::new();
        config.flags |= RunnerFlags::FORCE_COLOR | RunnerFlags::NO_COLOR;
        assert!(!config.color_enabled(true));
    }
}
