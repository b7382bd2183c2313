// Copyright (c) The taut Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tuple serialization: renders as `(a, b, c)`, including the empty tuple
//! `()`. Rust tuples are already structurally `a.0, a.1, ...`-addressable,
//! so there is nothing to discover here beyond picking the right arity
//! impl.

use super::{skip_ws, ToTautString, FromTautString};
use crate::errors::ValueParseError;

impl ToTautString for () {
    fn to_taut_string(&self) -> String {
        "()".to_string()
    }
}

impl FromTautString for () {
    fn from_taut_str(cursor: &mut &str) -> Result<Self, ValueParseError> {
        let origin = *cursor;
        skip_ws(cursor);
        let offset = origin.len() - cursor.len();
        if let Some(rest) = cursor.strip_prefix("()") {
            *cursor = rest;
            Ok(())
        } else {
            Err(ValueParseError::new("expected `()`", offset))
        }
    }
}

macro_rules! impl_tuple {
    ($($idx:tt : $name:ident),+ $(,)?) => {
        impl<$($name: ToTautString),+> ToTautString for ($($name,)+) {
            fn to_taut_string(&self) -> String {
                let parts: Vec<String> = vec![$(self.$idx.to_taut_string()),+];
                format!("({})", parts.join(", "))
            }
        }

        impl<$($name: FromTautString),+> FromTautString for ($($name,)+) {
            fn from_taut_str(cursor: &mut &str) -> Result<Self, ValueParseError> {
                let origin = *cursor;
                skip_ws(cursor);
                let open_offset = origin.len() - cursor.len();
                if !cursor.starts_with('(') {
                    return Err(ValueParseError::new("expected `(`", open_offset));
                }
                *cursor = &cursor[1..];
                let result = (
                    $({
                        let _ = $idx; // keeps the field index bound in scope for readability
                        skip_ws(cursor);
                        let value = <$name>::from_taut_str(cursor)?;
                        skip_ws(cursor);
                        // Consume a separating comma if present. Requiring it
                        // strictly for every non-last field and forbidding it
                        // for the last would need arity arithmetic in the
                        // macro; accepting an optional comma everywhere is a
                        // harmless laxity and malformed input still fails
                        // when the next element can't parse.
                        if cursor.starts_with(',') {
                            *cursor = &cursor[1..];
                            skip_ws(cursor);
                        }
                        value
                    },)+
                );
                skip_ws(cursor);
                let close_offset = origin.len() - cursor.len();
                if !cursor.starts_with(')') {
                    return Err(ValueParseError::new("expected `)`", close_offset));
                }
                *cursor = &cursor[1..];
                Ok(result)
            }
        }
    };
}

impl_tuple!(0: A0);
impl_tuple!(0: A0, 1: A1);
impl_tuple!(0: A0, 1: A1, 2: A2);
impl_tuple!(0: A0, 1: A1, 2: A2, 3: A3);
impl_tuple!(0: A0, 1: A1, 2: A2, 3: A3, 4: A4);
impl_tuple!(0: A0, 1: A1, 2: A2, 3: A3, 4: A4, 5: A5);
impl_tuple!(0: A0, 1: A1, 2: A2, 3: A3, 4: A4, 5: A5, 6: A6);
impl_tuple!(0: A0, 1: A1, 2: A2, 3: A3, 4: A4, 5: A5, 6: A6, 7: A7);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_roundtrip() {
        assert_eq!(().to_taut_string(), "()");
        <()>::from_taut_str_complete("()").unwrap();
    }

    #[test]
    fn pair_roundtrip() {
        let pair = (1, "x".to_string());
        let printed = pair.to_taut_string();
        assert_eq!(printed, "(1, \"x\")");
        assert_eq!(<(i32, String)>::from_taut_str_complete(&printed).unwrap(), pair);
    }

    #[test]
    fn triple_roundtrip() {
        let t = (1u8, 2.5f64, true);
        let printed = t.to_taut_string();
        assert_eq!(<(u8, f64, bool)>::from_taut_str_complete(&printed).unwrap(), t);
    }
}
