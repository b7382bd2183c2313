// Copyright (c) The taut Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scalar serialization policy.
//!
//! Integers accept an optional sign, bases `10`/`0x`/`0b`/`0` (octal), and
//! `'` digit separators that may not sit adjacent to the sign. Floats
//! accept decimal with an optional exponent plus the words
//! `inf`/`infinity`/`nan`. `to_string` always emits plain decimal.
//!
//! A raw-pointer/`nullptr` scalar has no idiomatic Rust equivalent and is
//! folded into `Option<T>` instead — see `DESIGN.md`.

use super::{ToTautString, FromTautString};
use crate::errors::ValueParseError;

/// Consumes an optional leading `+`/`-`. Returns `true` if negative.
fn consume_sign(cursor: &mut &str) -> bool {
    if let Some(rest) = cursor.strip_prefix('-') {
        *cursor = rest;
        true
    } else if let Some(rest) = cursor.strip_prefix('+') {
        *cursor = rest;
        false
    } else {
        false
    }
}

/// Parses digits (with internal `'` separators) in `radix` from the front
/// of `cursor`, returning the accumulated magnitude. Does not allow a
/// separator as the first or last character of the run.
fn parse_magnitude(cursor: &mut &str, radix: u32) -> Option<u128> {
    let bytes = cursor.as_bytes();
    let mut i = 0;
    let mut value: u128 = 0;
    let mut saw_digit = false;
    let mut last_was_sep = false;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if c == '\'' {
            if !saw_digit || last_was_sep {
                break;
            }
            last_was_sep = true;
            i += 1;
            continue;
        }
        match c.to_digit(radix) {
            Some(d) => {
                value = value.checked_mul(radix as u128)?.checked_add(d as u128)?;
                saw_digit = true;
                last_was_sep = false;
                i += 1;
            }
            None => break,
        }
    }
    if !saw_digit || last_was_sep {
        return None;
    }
    *cursor = &cursor[i..];
    Some(value)
}

/// Parses an optionally-signed, optionally-based integer literal,
/// returning `(negative, magnitude)`. `origin` is the full string being
/// parsed (used only to compute the error offset, which points at the
/// start of the bad token).
fn parse_integer_magnitude(
    cursor: &mut &str,
    origin: &str,
) -> Result<(bool, u128), ValueParseError> {
    let start_offset = origin.len() - cursor.len();
    let mut scan = *cursor;
    let negative = consume_sign(&mut scan);
    let radix = if let Some(rest) = scan.strip_prefix("0x").or_else(|| scan.strip_prefix("0X")) {
        scan = rest;
        16
    } else if let Some(rest) = scan.strip_prefix("0b").or_else(|| scan.strip_prefix("0B")) {
        scan = rest;
        2
    } else if scan.starts_with('0') && scan.len() > 1 && scan.as_bytes()[1].is_ascii_digit() {
        scan = &scan[1..];
        8
    } else {
        10
    };
    match parse_magnitude(&mut scan, radix) {
        Some(magnitude) => {
            *cursor = scan;
            Ok((negative, magnitude))
        }
        None => Err(ValueParseError::new("expected an integer", start_offset)),
    }
}

macro_rules! impl_unsigned {
    ($($t:ty),* $(,)?) => {
        $(
            impl ToTautString for $t {
                fn to_taut_string(&self) -> String {
                    self.to_string()
                }
            }

            impl FromTautString for $t {
                fn from_taut_str(cursor: &mut &str) -> Result<Self, ValueParseError> {
                    let origin = *cursor;
                    let start_offset = origin.len() - cursor.len();
                    let (negative, magnitude) = parse_integer_magnitude(cursor, origin)?;
                    if negative && magnitude != 0 {
                        return Err(ValueParseError::new(
                            concat!(stringify!($t), " cannot be negative"),
                            start_offset,
                        ));
                    }
                    <$t>::try_from(magnitude).map_err(|_| {
                        ValueParseError::new(
                            concat!(stringify!($t), " out of range"),
                            start_offset,
                        )
                    })
                }
            }
        )*
    };
}

macro_rules! impl_signed {
    ($($t:ty),* $(,)?) => {
        $(
            impl ToTautString for $t {
                fn to_taut_string(&self) -> String {
                    self.to_string()
                }
            }

            impl FromTautString for $t {
                fn from_taut_str(cursor: &mut &str) -> Result<Self, ValueParseError> {
                    let origin = *cursor;
                    let start_offset = origin.len() - cursor.len();
                    let (negative, magnitude) = parse_integer_magnitude(cursor, origin)?;
                    let signed_magnitude = i128::try_from(magnitude).map_err(|_| {
                        ValueParseError::new(concat!(stringify!($t), " out of range"), start_offset)
                    })?;
                    let value = if negative { -signed_magnitude } else { signed_magnitude };
                    <$t>::try_from(value).map_err(|_| {
                        ValueParseError::new(concat!(stringify!($t), " out of range"), start_offset)
                    })
                }
            }
        )*
    };
}

impl_unsigned!(u8, u16, u32, u64, u128, usize);
impl_signed!(i8, i16, i32, i64, i128, isize);

impl ToTautString for bool {
    fn to_taut_string(&self) -> String {
        self.to_string()
    }
}

impl FromTautString for bool {
    fn from_taut_str(cursor: &mut &str) -> Result<Self, ValueParseError> {
        let origin = *cursor;
        let start_offset = origin.len() - cursor.len();
        if let Some(rest) = cursor.strip_prefix("true") {
            *cursor = rest;
            Ok(true)
        } else if let Some(rest) = cursor.strip_prefix("false") {
            *cursor = rest;
            Ok(false)
        } else {
            Err(ValueParseError::new("expected `true` or `false`", start_offset))
        }
    }
}

macro_rules! impl_float {
    ($($t:ty),* $(,)?) => {
        $(
            impl ToTautString for $t {
                fn to_taut_string(&self) -> String {
                    if self.is_nan() {
                        "nan".to_string()
                    } else if self.is_infinite() {
                        if *self < 0.0 { "-inf".to_string() } else { "inf".to_string() }
                    } else {
                        self.to_string()
                    }
                }
            }

            impl FromTautString for $t {
                fn from_taut_str(cursor: &mut &str) -> Result<Self, ValueParseError> {
                    let origin = *cursor;
                    let start_offset = origin.len() - cursor.len();
                    let mut scan = *cursor;
                    let negative = consume_sign(&mut scan);

                    let lower_starts_with = |s: &str, word: &str| {
                        s.len() >= word.len() && s[..word.len()].eq_ignore_ascii_case(word)
                    };
                    if lower_starts_with(scan, "infinity") {
                        *cursor = &scan[8..];
                        return Ok(if negative { <$t>::NEG_INFINITY } else { <$t>::INFINITY });
                    }
                    if lower_starts_with(scan, "inf") {
                        *cursor = &scan[3..];
                        return Ok(if negative { <$t>::NEG_INFINITY } else { <$t>::INFINITY });
                    }
                    if lower_starts_with(scan, "nan") {
                        *cursor = &scan[3..];
                        return Ok(<$t>::NAN);
                    }

                    // Plain decimal with optional exponent: reuse Rust's own
                    // float grammar by scanning the maximal valid prefix.
                    let bytes = scan.as_bytes();
                    let mut i = 0;
                    let mut saw_digit = false;
                    while i < bytes.len() && bytes[i].is_ascii_digit() {
                        saw_digit = true;
                        i += 1;
                    }
                    if i < bytes.len() && bytes[i] == b'.' {
                        i += 1;
                        while i < bytes.len() && bytes[i].is_ascii_digit() {
                            saw_digit = true;
                            i += 1;
                        }
                    }
                    if !saw_digit {
                        return Err(ValueParseError::new("expected a number", start_offset));
                    }
                    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
                        let mut j = i + 1;
                        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
                            j += 1;
                        }
                        let exp_start = j;
                        while j < bytes.len() && bytes[j].is_ascii_digit() {
                            j += 1;
                        }
                        if j > exp_start {
                            i = j;
                        }
                    }
                    let token = &scan[..i];
                    let magnitude: $t = token.parse().map_err(|_| {
                        ValueParseError::new("expected a number", start_offset)
                    })?;
                    *cursor = &scan[i..];
                    Ok(if negative { -magnitude } else { magnitude })
                }
            }
        )*
    };
}

impl_float!(f32, f64);

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("0" => Some(0))]
    #[test_case("42" => Some(42))]
    #[test_case("0x2a" => Some(42))]
    #[test_case("0b101010" => Some(42))]
    #[test_case("052" => Some(42))]
    #[test_case("4'2" => Some(42))]
    #[test_case("'42" => None; "leading_separator_expects_none")]
    #[test_case("42'" => None; "trailing_separator_expects_none")]
    #[test_case("" => None)]
    fn integer_magnitude_parses_every_base(input: &str) -> Option<u32> {
        u32::from_taut_str_complete(input).ok()
    }

    #[test]
    fn integer_roundtrip_with_separators() {
        let mut cursor = "1'000'000";
        let value = i64::from_taut_str(&mut cursor).unwrap();
        assert_eq!(value, 1_000_000);
        assert!(cursor.is_empty());
    }

    #[test]
    fn hex_and_binary_bases() {
        assert_eq!(u32::from_taut_str_complete("0xff").unwrap(), 255);
        assert_eq!(u32::from_taut_str_complete("0b1010").unwrap(), 10);
        assert_eq!(u32::from_taut_str_complete("010").unwrap(), 8);
    }

    #[test]
    fn overflow_leaves_cursor_at_token_start() {
        let mut cursor = "99999";
        let err = u8::from_taut_str(&mut cursor).unwrap_err();
        assert_eq!(err.offset, 0);
    }

    #[test]
    fn float_words_are_case_insensitive() {
        assert!(f64::from_taut_str_complete("NaN").unwrap().is_nan());
        assert_eq!(f64::from_taut_str_complete("-Infinity").unwrap(), f64::NEG_INFINITY);
    }
}
