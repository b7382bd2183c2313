// Copyright (c) The taut Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The event stream emitted while a suite runs. Consumers that want JSON
//! or a custom terminal renderer subscribe to these events instead of
//! scraping stdout text; `serde` derives make them easy to forward over a
//! pipe or into a file.

use serde::{Deserialize, Serialize};

/// One emitted occurrence during a run, in emission order.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    SuiteStarted { test_count: usize },
    /// Emitted once per registered test while the name filter is applied,
    /// before `SuiteStarted`'s count is known to reflect only the matching
    /// subset.
    OnFilterTest { name: String, included: bool },
    TestStarted { name: String },
    /// Emitted immediately before a generator call site is visited, so a
    /// consumer can correlate a slow test with the generator it's
    /// currently sweeping.
    PreGenerate { name: String, location: String },
    /// A single generator parameter reached a new value; `path` is the
    /// dotted index path identifying which nested generator advanced.
    GeneratorAdvanced { name: String, path: String, value: String },
    /// Emitted right after a generator call site yields the index for
    /// this pass.
    PostGenerate { name: String, location: String, index: usize },
    /// Emitted when a generator session drops an exhausted call site from
    /// its recorded path, before resuming the next unvisited branch above
    /// it.
    PrePruneGenerator { name: String, location: String },
    /// Emitted once when a `--generate` override program is attached to a
    /// session because it names this test.
    OnRegisterGeneratorOverride { name: String, program: String },
    /// Emitted when a call site's swept values were narrowed or rewritten
    /// by an active override program.
    OnOverrideGenerator { name: String, location: String },
    /// `check!`/`require!` failed; `fatal` distinguishes a hard assertion
    /// (test aborted) from a soft one (test continues, already marked
    /// failing).
    AssertionFailed { name: String, diagram: String, fatal: bool },
    /// Emitted before a `must_throw!` block runs, so a consumer can tell
    /// a deliberate panic apart from an uncaught one.
    OnPreTryCatch { name: String },
    /// Emitted when a structural check against a caught exception chain
    /// runs, describing which cursor and predicate were evaluated.
    OnExplainException { name: String, explanation: String },
    /// A `must_throw!` block returned normally instead of panicking.
    MissingException { name: String, message: String },
    /// A test panicked without going through `must_throw!`/a hard
    /// assertion: an uncaught, unexpected panic rather than a recorded
    /// failure.
    UncaughtException { name: String, message: String },
    /// Emitted immediately before a test is finalized as failed, carrying
    /// the same reason `TestFailed` will report.
    PreFailTest { name: String, reason: String },
    TestPassed { name: String },
    TestFailed { name: String, reason: String },
    /// Emitted instead of `TestPassed`/`TestFailed` when the test's
    /// generator produced zero parameter combinations.
    TestSkippedEmptyGenerator { name: String },
    SuiteFinished { passed: usize, failed: usize, skipped: usize },
}

/// Forwards `event` to the tracing subscriber, if any; the single point
/// every emission call site in the crate funnels through.
pub fn emit(event: Event) {
    tracing::debug!(?event, "taut event");
}

/// Accumulates a stream of [`Event`]s into final tallies, the same
/// counters a formatter prints as the run's summary line.
#[derive(Default)]
pub struct EventTally {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl EventTally {
    pub fn record(&mut self, event: &Event) {
        match event {
            Event::TestPassed { .. } => self.passed += 1,
            Event::TestFailed { .. } => self.failed += 1,
            Event::TestSkippedEmptyGenerator { .. } => self.skipped += 1,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_counts_terminal_events_only() {
        let mut tally = EventTally::default();
        tally.record(&Event::SuiteStarted { test_count: 3 });
        tally.record(&Event::TestPassed { name: "a".into() });
        tally.record(&Event::TestFailed {
            name: "b".into(),
            reason: "boom".into(),
        });
        tally.record(&Event::TestSkippedEmptyGenerator { name: "c".into() });
        assert_eq!(tally.passed, 1);
        assert_eq!(tally.failed, 1);
        assert_eq!(tally.skipped, 1);
    }

    #[test]
    fn new_event_variant_roundtrips_through_json() {
        let event = Event::OnFilterTest {
            name: "suite::t".into(),
            included: false,
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        match back {
            Event::OnFilterTest { included, .. } => assert!(!included),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn event_roundtrips_through_json() {
        let event = Event::AssertionFailed {
            name: "suite::t".into(),
            diagram: "x == y".into(),
            fatal: true,
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        match back {
            Event::AssertionFailed { fatal, .. } => assert!(fatal),
            _ => panic!("wrong variant"),
        }
    }
}
