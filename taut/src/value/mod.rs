// Copyright (c) The taut Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bidirectional string <-> value conversion.
//!
//! [`ToTautString`] is the "print this for a failure diagram" direction;
//! [`FromTautString`] is the "parse this out of a `--generate` override or
//! a golden-file fixture" direction. Unlike `Display`/`FromStr`, these are
//! taut-specific: strings and chars are quoted and escaped, containers are
//! classified by [`RangeKind`], and parsing consumes a prefix of the
//! input, leaving the rest in the cursor for the caller (so tuples and
//! ranges can parse their elements one at a time).

pub mod encoding;
pub mod option_variant;
pub mod range;
pub mod scalar;
pub mod string;
pub mod tuple;

use crate::errors::ValueParseError;

/// Produces the taut textual form of a value, for printing captured
/// arguments in a failure diagram.
pub trait ToTautString {
    fn to_taut_string(&self) -> String;
}

/// Parses a prefix of `*cursor` into `Self`, advancing `*cursor` past what
/// was consumed.
///
/// On success, `*cursor` points just past the consumed text. On failure,
/// the error carries the byte offset of the first offending character and
/// `*cursor` is left wherever parsing gave up.
pub trait FromTautString: Sized {
    fn from_taut_str(cursor: &mut &str) -> Result<Self, ValueParseError>;

    /// Convenience: parse the whole string, requiring it to be fully
    /// consumed.
    fn from_taut_str_complete(input: &str) -> Result<Self, ValueParseError> {
        let mut cursor = input;
        let value = Self::from_taut_str(&mut cursor)?;
        if !cursor.is_empty() {
            let offset = input.len() - cursor.len();
            return Err(ValueParseError::new(
                format!("unexpected trailing input `{cursor}`"),
                offset,
            ));
        }
        Ok(value)
    }
}

/// The grammatical family a container prints/parses as.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RangeKind {
    /// `[a, b, c]`
    Sequence,
    /// `{a, b, c}`
    Set,
    /// `{k: v, ...}`
    Map,
    /// `"..."`
    StringLike,
}

pub(crate) fn skip_ws(cursor: &mut &str) {
    *cursor = cursor.trim_start_matches([' ', '\t', '\n', '\r']);
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn i64_roundtrips_through_taut_string(value: i64) {
            let printed = value.to_taut_string();
            prop_assert_eq!(i64::from_taut_str_complete(&printed).unwrap(), value);
        }

        #[test]
        fn string_roundtrips_through_taut_string(value: String) {
            let printed = value.to_taut_string();
            prop_assert_eq!(String::from_taut_str_complete(&printed).unwrap(), value);
        }

        #[test]
        fn bool_roundtrips_through_taut_string(value: bool) {
            let printed = value.to_taut_string();
            prop_assert_eq!(bool::from_taut_str_complete(&printed).unwrap(), value);
        }
    }
}
