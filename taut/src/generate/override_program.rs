// Copyright (c) The taut Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parser for generator override programs.
//!
//! An override program pins specific generator call sites to a fixed
//! subset of their indices instead of letting [`super::GeneratorSession`]
//! enumerate every branch, so a failure found during a full sweep can be
//! reproduced with a single re-entry. A full program is a test-name regex,
//! a `//` separator, then a comma-separated list of per-generator rule
//! groups:
//!
//! ```text
//! suite::retry_test // retries{#2, backoff#1..3}
//! ```
//!
//! Each generator names an ordered list of rules, applied left to right:
//!
//! - `#RANGE` / `-#RANGE` select or deselect a 1-based inclusive index or
//!   range (`N`, `N..`, `..N`, `N..M`).
//! - `=VALUE` / `-=VALUE` inject or remove a literal value (parsed later
//!   by the generator's own [`crate::value::FromTautString`] impl, since
//!   this parser only sees the grammar, not the target type), optionally
//!   followed by a parenthesized nested program applied to the generators
//!   reached underneath that value.
//!
//! Parse errors carry a [`SourceSpan`][miette::SourceSpan] so a caller
//! using `miette` can render a caret under the offending token.

use regex::Regex;

use crate::errors::OverrideProgramParseError;

/// A 1-based, inclusive index bound parsed from `N`, `N..`, `..N`, or
/// `N..M`; an absent bound means "unbounded in that direction".
#[derive(Clone, Debug, Default)]
pub struct IndexRange {
    pub start: Option<usize>,
    pub end: Option<usize>,
}

impl IndexRange {
    /// Does this range cover 1-based index `i`.
    pub fn contains(&self, one_based: usize) -> bool {
        self.start.map_or(true, |s| one_based >= s) && self.end.map_or(true, |e| one_based <= e)
    }
}

/// One rule inside a generator's `{ ... }` group, applied in source order.
#[derive(Clone, Debug)]
pub enum Rule {
    /// `=VALUE nested?` — inject a literal value, optionally recursing
    /// into a nested program for generator calls reached only when that
    /// value is selected.
    Inject { value: String, nested: Option<Box<OverrideProgram>> },
    /// `-=VALUE` — remove a naturally generated value equal to `VALUE`.
    Remove { value: String },
    /// `#RANGE nested?` — keep only the values at these 1-based indices.
    SelectIndex { range: IndexRange, nested: Option<Box<OverrideProgram>> },
    /// `-#RANGE` — drop the values at these 1-based indices.
    DeselectIndex { range: IndexRange },
}

/// One generator's rule group: `NAME` alone (equivalent to `NAME{#1}`,
/// i.e. pin to the first value) or `NAME{rule (',' | '&') rule ...}`.
#[derive(Clone, Debug)]
pub struct GeneratorOverride {
    pub name: String,
    pub rules: Vec<Rule>,
}

impl GeneratorOverride {
    /// The 0-based indices this override keeps out of `arity` naturally
    /// generated values, in the order they should be visited. `None` means
    /// this override only touches injected/removed literal values and
    /// leaves the natural sweep over `0..arity` untouched.
    pub fn kept_indices(&self, arity: usize) -> Option<Vec<usize>> {
        let mut selected: Option<Vec<bool>> = None;
        let mut keep = vec![true; arity];
        let mut touched = false;
        for rule in &self.rules {
            match rule {
                Rule::SelectIndex { range, .. } => {
                    touched = true;
                    let mask = selected.get_or_insert_with(|| vec![false; arity]);
                    for (i, slot) in mask.iter_mut().enumerate() {
                        if range.contains(i + 1) {
                            *slot = true;
                        }
                    }
                }
                Rule::DeselectIndex { range } => {
                    touched = true;
                    for (i, slot) in keep.iter_mut().enumerate() {
                        if range.contains(i + 1) {
                            *slot = false;
                        }
                    }
                }
                Rule::Inject { .. } | Rule::Remove { .. } => {}
            }
        }
        if !touched {
            return None;
        }
        let base = selected.unwrap_or(keep.clone());
        Some(
            (0..arity)
                .filter(|&i| base.get(i).copied().unwrap_or(false) && keep.get(i).copied().unwrap_or(false))
                .collect(),
        )
    }

    /// Applies every rule against a generator's already-materialized
    /// natural values, returning the final ordered sequence to sweep:
    /// `#`/`-#` narrow which natural values survive (as in
    /// [`GeneratorOverride::kept_indices`]), `-=VALUE` removes any
    /// surviving value whose [`crate::value::ToTautString`] rendering
    /// equals `VALUE` literally, and `=VALUE` parses `VALUE` through `T`'s
    /// own [`crate::value::FromTautString`] impl and appends it.
    pub fn resolve_values<T>(&self, natural: &[T]) -> Vec<T>
    where
        T: Clone + crate::value::ToTautString + crate::value::FromTautString,
    {
        let mut values: Vec<T> = match self.kept_indices(natural.len()) {
            Some(indices) => indices.into_iter().map(|i| natural[i].clone()).collect(),
            None => natural.to_vec(),
        };
        for rule in &self.rules {
            match rule {
                Rule::Remove { value } => values.retain(|v| &v.to_taut_string() != value),
                Rule::Inject { value, .. } => {
                    if let Ok(parsed) = T::from_taut_str_complete(value) {
                        values.push(parsed);
                    }
                }
                Rule::SelectIndex { .. } | Rule::DeselectIndex { .. } => {}
            }
        }
        values
    }
}

/// A parsed override program: the test-name regex it applies under, and
/// which generator call sites to pin.
#[derive(Clone, Debug)]
pub struct OverrideProgram {
    test_regex: Option<Regex>,
    generators: Vec<GeneratorOverride>,
}

impl Default for OverrideProgram {
    fn default() -> Self {
        Self {
            test_regex: None,
            generators: Vec::new(),
        }
    }
}

impl OverrideProgram {
    /// Whether this program applies to `test_name`; a program with no
    /// regex (a bare nested program) applies unconditionally.
    pub fn applies_to(&self, test_name: &str) -> bool {
        self.test_regex.as_ref().map_or(true, |r| r.is_match(test_name))
    }

    pub fn generators(&self) -> &[GeneratorOverride] {
        &self.generators
    }

    /// The override for `name`, if this program mentions it.
    pub fn generator(&self, name: &str) -> Option<&GeneratorOverride> {
        self.generators.iter().find(|g| g.name == name)
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn skip_ws(&mut self) {
        while self.rest().starts_with(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn error(&self, message: impl Into<String>, len: usize) -> OverrideProgramParseError {
        OverrideProgramParseError::new(message, self.pos, len)
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        let mut end = self.rest().len();
        for (i, c) in self.rest().char_indices() {
            if !pred(c) {
                end = i;
                break;
            }
        }
        self.pos = start + end;
        &self.input[start..start + end]
    }

    fn expect_char(&mut self, c: char) -> Result<(), OverrideProgramParseError> {
        if self.rest().starts_with(c) {
            self.pos += c.len_utf8();
            Ok(())
        } else {
            Err(self.error(format!("expected `{c}`"), 1))
        }
    }

    fn eat_str(&mut self, s: &str) -> bool {
        if self.rest().starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn parse_identifier(&mut self) -> Result<&'a str, OverrideProgramParseError> {
        let text = self.take_while(|c| c.is_alphanumeric() || c == '_' || c == ':' || c == '/' || c == '.' || c == '-');
        if text.is_empty() {
            return Err(self.error("expected a generator name", 1));
        }
        Ok(text)
    }

    fn parse_value(&mut self) -> Result<String, OverrideProgramParseError> {
        let text = self.take_while(|c| !matches!(c, ',' | '&' | '(' | ')' | '{' | '}'));
        let trimmed = text.trim_end();
        if trimmed.is_empty() {
            return Err(self.error("expected a value literal", 1));
        }
        self.pos -= text.len() - trimmed.len();
        Ok(trimmed.to_string())
    }

    fn parse_index_range(&mut self) -> Result<IndexRange, OverrideProgramParseError> {
        if self.eat_str("..") {
            let digits_start = self.pos;
            let digits = self.take_while(|c| c.is_ascii_digit());
            if digits.is_empty() {
                return Err(self.error("expected an end index after `..`", 1));
            }
            let end = parse_index(digits, digits_start)?;
            return Ok(IndexRange { start: None, end: Some(end) });
        }
        let digits_start = self.pos;
        let digits = self.take_while(|c| c.is_ascii_digit());
        if digits.is_empty() {
            return Err(self.error("expected an index", 1));
        }
        let start = parse_index(digits, digits_start)?;
        if self.eat_str("..") {
            let end_start = self.pos;
            let end_digits = self.take_while(|c| c.is_ascii_digit());
            if end_digits.is_empty() {
                Ok(IndexRange { start: Some(start), end: None })
            } else {
                let end = parse_index(end_digits, end_start)?;
                Ok(IndexRange { start: Some(start), end: Some(end) })
            }
        } else {
            Ok(IndexRange { start: Some(start), end: Some(start) })
        }
    }

    fn parse_nested(&mut self) -> Result<Option<Box<OverrideProgram>>, OverrideProgramParseError> {
        if !self.rest().starts_with('(') {
            return Ok(None);
        }
        self.pos += 1;
        self.skip_ws();
        if self.rest().starts_with(')') {
            self.pos += 1;
            return Ok(Some(Box::new(OverrideProgram::default())));
        }
        let generators = self.parse_generator_list()?;
        self.skip_ws();
        self.expect_char(')')?;
        Ok(Some(Box::new(OverrideProgram {
            test_regex: None,
            generators,
        })))
    }

    fn parse_rule(&mut self) -> Result<Rule, OverrideProgramParseError> {
        self.skip_ws();
        if self.eat_str("-=") {
            let value = self.parse_value()?;
            return Ok(Rule::Remove { value });
        }
        if self.eat_str("=") {
            let value = self.parse_value()?;
            let nested = self.parse_nested()?;
            return Ok(Rule::Inject { value, nested });
        }
        if self.eat_str("-#") {
            let range = self.parse_index_range()?;
            return Ok(Rule::DeselectIndex { range });
        }
        if self.eat_str("#") {
            let range = self.parse_index_range()?;
            let nested = self.parse_nested()?;
            return Ok(Rule::SelectIndex { range, nested });
        }
        Err(self.error("expected a rule (`=`, `-=`, `#`, or `-#`)", 1))
    }

    fn parse_generator(&mut self) -> Result<GeneratorOverride, OverrideProgramParseError> {
        self.skip_ws();
        let name = self.parse_identifier()?.to_string();
        self.skip_ws();
        if self.rest().starts_with('{') {
            self.pos += 1;
            let mut rules = Vec::new();
            loop {
                rules.push(self.parse_rule()?);
                self.skip_ws();
                if self.rest().starts_with(',') || self.rest().starts_with('&') {
                    self.pos += 1;
                    continue;
                }
                break;
            }
            self.skip_ws();
            self.expect_char('}')?;
            Ok(GeneratorOverride { name, rules })
        } else {
            let rule = self.parse_rule()?;
            Ok(GeneratorOverride { name, rules: vec![rule] })
        }
    }

    fn parse_generator_list(&mut self) -> Result<Vec<GeneratorOverride>, OverrideProgramParseError> {
        let mut generators = Vec::new();
        self.skip_ws();
        if self.rest().is_empty() || self.rest().starts_with(')') {
            return Ok(generators);
        }
        loop {
            generators.push(self.parse_generator()?);
            self.skip_ws();
            if self.rest().starts_with(',') {
                self.pos += 1;
                self.skip_ws();
                continue;
            }
            break;
        }
        Ok(generators)
    }
}

fn parse_index(digits: &str, offset: usize) -> Result<usize, OverrideProgramParseError> {
    digits
        .parse()
        .map_err(|_| OverrideProgramParseError::new("index is too large", offset, digits.len()))
}

/// Parses a full override program: `TEST_REGEX '//' program`.
pub fn parse(input: &str) -> Result<OverrideProgram, OverrideProgramParseError> {
    let Some(sep) = input.find("//") else {
        return Err(OverrideProgramParseError::new("expected a `//` separator after the test-name regex", input.len(), 1));
    };
    let (regex_part, rest) = input.split_at(sep);
    let program_part = &rest[2..];

    let regex_text = regex_part.trim();
    let test_regex = if regex_text.is_empty() {
        None
    } else {
        Some(
            Regex::new(regex_text)
                .map_err(|e| OverrideProgramParseError::new(format!("invalid test-name regex: {e}"), 0, regex_part.len()))?,
        )
    };

    let mut parser = Parser::new(program_part);
    let generators = parser.parse_generator_list()?;
    parser.skip_ws();
    if !parser.rest().is_empty() {
        return Err(parser.error("unexpected trailing input", parser.rest().len()));
    }

    Ok(OverrideProgram { test_regex, generators })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_index_selection() {
        let program = parse("suite::t // retries#2").unwrap();
        assert!(program.applies_to("suite::t"));
        assert!(!program.applies_to("suite::other"));
        let gen = program.generator("retries").unwrap();
        assert_eq!(gen.kept_indices(5), Some(vec![1]));
    }

    #[test]
    fn parses_grouped_rules_with_deselect() {
        let program = parse("// retries{#1..3, -#2}").unwrap();
        assert!(program.applies_to("anything"));
        let gen = program.generator("retries").unwrap();
        assert_eq!(gen.kept_indices(5), Some(vec![0, 2]));
    }

    #[test]
    fn parses_open_ended_range() {
        let program = parse("// retries#3..").unwrap();
        let gen = program.generator("retries").unwrap();
        assert_eq!(gen.kept_indices(5), Some(vec![2, 3, 4]));
    }

    #[test]
    fn parses_injected_value_with_nested_program() {
        let program = parse("// mode=fast(inner#1)").unwrap();
        let gen = program.generator("mode").unwrap();
        match &gen.rules[0] {
            Rule::Inject { value, nested } => {
                assert_eq!(value, "fast");
                let nested = nested.as_ref().unwrap();
                assert!(nested.generator("inner").is_some());
            }
            other => panic!("unexpected rule: {other:?}"),
        }
    }

    #[test]
    fn missing_separator_is_a_parse_error() {
        assert!(parse("retries#2").is_err());
    }

    #[test]
    fn trailing_garbage_is_rejected() {
        assert!(parse("// retries#2 garbage").is_err());
    }

    #[test]
    fn invalid_regex_is_a_parse_error() {
        assert!(parse("suite::[ //").is_err());
    }
}
