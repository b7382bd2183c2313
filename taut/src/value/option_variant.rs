// Copyright (c) The taut Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Option and variant serialization policy.
//!
//! `Option<T>` prints as `none` or `optional(x)`. Variants print as
//! `(TypeName)value`, or `(TypeName#k)value` when the payload type repeats
//! across alternatives (1-based index among same-typed alternatives).
//! `valueless_by_exception` has no Rust equivalent (an enum is always one
//! of its variants) but the token is kept reserved and rejected on parse
//! for format compatibility with readers expecting it.

use super::{skip_ws, ToTautString, FromTautString};
use crate::errors::ValueParseError;

const VALUELESS_TOKEN: &str = "valueless_by_exception";

impl<T: ToTautString> ToTautString for Option<T> {
    fn to_taut_string(&self) -> String {
        match self {
            None => "none".to_string(),
            Some(v) => format!("optional({})", v.to_taut_string()),
        }
    }
}

impl<T: FromTautString> FromTautString for Option<T> {
    fn from_taut_str(cursor: &mut &str) -> Result<Self, ValueParseError> {
        let origin = *cursor;
        skip_ws(cursor);
        let start_offset = origin.len() - cursor.len();
        if let Some(rest) = cursor.strip_prefix("none") {
            *cursor = rest;
            return Ok(None);
        }
        if cursor.starts_with(VALUELESS_TOKEN) {
            return Err(ValueParseError::new(
                "`valueless_by_exception` cannot be parsed",
                start_offset,
            ));
        }
        let rest = cursor
            .strip_prefix("optional(")
            .ok_or_else(|| ValueParseError::new("expected `none` or `optional(...)`", start_offset))?;
        *cursor = rest;
        let value = T::from_taut_str(cursor)?;
        skip_ws(cursor);
        let close_offset = origin.len() - cursor.len();
        if !cursor.starts_with(')') {
            return Err(ValueParseError::new("expected `)`", close_offset));
        }
        *cursor = &cursor[1..];
        Ok(Some(value))
    }
}

/// Implemented by hand on an enum type to describe how it prints as a
/// taut variant. Blanket [`ToTautString`]/[`FromTautString`] impls format
/// and parse `(TypeName)payload` or `(TypeName#k)payload` from these
/// facts.
pub trait TautVariant: Sized {
    /// The enum's own type name, used as the `TypeName` in the printed
    /// form.
    const TYPE_NAME: &'static str;

    /// The currently-active payload, rendered with its own
    /// [`ToTautString`] impl.
    fn variant_payload(&self) -> String;

    /// `Some(k)` (1-based) when more than one alternative shares this
    /// variant's payload type and this is the k-th such alternative;
    /// `None` when the payload type occurs exactly once.
    fn variant_same_typed_index(&self) -> Option<usize>;

    /// Parses the payload following a `(TypeName)`/`(TypeName#k)` header
    /// that [`FromTautString::from_taut_str`] has already consumed.
    /// `same_typed_index` carries the `#k` read from the header (`None`
    /// if there wasn't one); only the enum's own definition knows which
    /// alternative that index picks out, so this is hand-written
    /// alongside the other three methods rather than derived.
    fn parse_variant_payload(same_typed_index: Option<usize>, cursor: &mut &str) -> Result<Self, ValueParseError>;
}

impl<T: TautVariant> ToTautString for T {
    fn to_taut_string(&self) -> String {
        let header = match self.variant_same_typed_index() {
            Some(k) => format!("({}#{})", T::TYPE_NAME, k),
            None => format!("({})", T::TYPE_NAME),
        };
        format!("{header}{}", self.variant_payload())
    }
}

impl<T: TautVariant> FromTautString for T {
    fn from_taut_str(cursor: &mut &str) -> Result<Self, ValueParseError> {
        let origin = *cursor;
        skip_ws(cursor);
        let start_offset = origin.len() - cursor.len();
        let rest = cursor
            .strip_prefix('(')
            .ok_or_else(|| ValueParseError::new("expected `(TypeName)`", start_offset))?;
        let rest = rest.strip_prefix(T::TYPE_NAME).ok_or_else(|| {
            ValueParseError::new(format!("expected type name `{}`", T::TYPE_NAME), start_offset)
        })?;

        let (same_typed_index, rest) = if let Some(after_hash) = rest.strip_prefix('#') {
            let digit_count = after_hash.chars().take_while(char::is_ascii_digit).count();
            if digit_count == 0 {
                return Err(ValueParseError::new("expected digits after `#`", start_offset));
            }
            let (digits, remainder) = after_hash.split_at(digit_count);
            let k: usize = digits
                .parse()
                .map_err(|_| ValueParseError::new("variant index out of range", start_offset))?;
            (Some(k), remainder)
        } else {
            (None, rest)
        };

        let rest = rest
            .strip_prefix(')')
            .ok_or_else(|| ValueParseError::new("expected `)`", start_offset))?;
        *cursor = rest;
        T::parse_variant_payload(same_typed_index, cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_roundtrip() {
        let some: Option<i32> = Some(5);
        let printed = some.to_taut_string();
        assert_eq!(printed, "optional(5)");
        assert_eq!(Option::<i32>::from_taut_str_complete(&printed).unwrap(), some);

        let none: Option<i32> = None;
        assert_eq!(none.to_taut_string(), "none");
        assert_eq!(Option::<i32>::from_taut_str_complete("none").unwrap(), none);
    }

    #[test]
    fn valueless_token_rejected() {
        assert!(Option::<i32>::from_taut_str_complete("valueless_by_exception").is_err());
    }

    #[derive(Debug, Eq, PartialEq)]
    enum DiscountTier {
        None,
        Flat(i32),
        Percent(i32),
    }

    impl TautVariant for DiscountTier {
        const TYPE_NAME: &'static str = "DiscountTier";

        fn variant_payload(&self) -> String {
            match self {
                DiscountTier::None => String::new(),
                DiscountTier::Flat(v) => v.to_taut_string(),
                DiscountTier::Percent(v) => v.to_taut_string(),
            }
        }

        fn variant_same_typed_index(&self) -> Option<usize> {
            match self {
                DiscountTier::None => None,
                DiscountTier::Flat(_) => Some(1),
                DiscountTier::Percent(_) => Some(2),
            }
        }

        fn parse_variant_payload(same_typed_index: Option<usize>, cursor: &mut &str) -> Result<Self, ValueParseError> {
            match same_typed_index {
                None => Ok(DiscountTier::None),
                Some(1) => Ok(DiscountTier::Flat(i32::from_taut_str(cursor)?)),
                Some(2) => Ok(DiscountTier::Percent(i32::from_taut_str(cursor)?)),
                Some(k) => Err(ValueParseError::new(format!("no alternative #{k}"), 0)),
            }
        }
    }

    #[test]
    fn taut_variant_roundtrips_through_its_header() {
        let flat = DiscountTier::Flat(5);
        let printed = flat.to_taut_string();
        assert_eq!(printed, "(DiscountTier#1)5");
        assert_eq!(DiscountTier::from_taut_str_complete(&printed).unwrap(), flat);

        let none = DiscountTier::None;
        assert_eq!(none.to_taut_string(), "(DiscountTier)");
        assert_eq!(DiscountTier::from_taut_str_complete("(DiscountTier)").unwrap(), none);
    }

    #[test]
    fn taut_variant_rejects_a_wrong_type_name() {
        assert!(DiscountTier::from_taut_str_complete("(WrongName#1)5").is_err());
    }
}
