// Copyright (c) The taut Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Container serialization policy.
//!
//! `Vec<T>` prints as a sequence `[a, b, c]`; `BTreeSet`/`HashSet` as a set
//! `{a, b, c}`; `BTreeMap`/`HashMap` as a map `{k: v, ...}`. Duplicate keys
//! in a set or map literal are rejected on parse, and `[T; N]` validates
//! that exactly `N` elements were supplied.

use super::string::{ByteString, WideString};
use super::{skip_ws, ToTautString, FromTautString, RangeKind};
use crate::errors::ValueParseError;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::Hash;

/// The grammatical family a type serializes as; implemented for the
/// container types below so generic code (the generator override engine)
/// can ask "is this a range, and which kind" without downcasting.
///
/// A string type is a `Range` too, of kind [`RangeKind::StringLike`]: it
/// behaves like a sequence of characters for generator/override purposes
/// (`resolve_values`'s per-element rules still make sense over its code
/// units) but prints as one quoted literal rather than a bracketed list,
/// which is why it gets its own kind instead of reusing `Sequence`.
pub trait Range {
    const KIND: RangeKind;
}

impl<T> Range for Vec<T> {
    const KIND: RangeKind = RangeKind::Sequence;
}
impl<T> Range for BTreeSet<T> {
    const KIND: RangeKind = RangeKind::Set;
}
impl<T> Range for HashSet<T> {
    const KIND: RangeKind = RangeKind::Set;
}
impl<K, V> Range for BTreeMap<K, V> {
    const KIND: RangeKind = RangeKind::Map;
}
impl<K, V> Range for HashMap<K, V> {
    const KIND: RangeKind = RangeKind::Map;
}
impl Range for String {
    const KIND: RangeKind = RangeKind::StringLike;
}
impl Range for ByteString {
    const KIND: RangeKind = RangeKind::StringLike;
}
impl Range for WideString {
    const KIND: RangeKind = RangeKind::StringLike;
}

/// Scans a `open elem (sep elem)* close` list, calling `parse_elem` for
/// each element. `origin` is the top-level string being parsed, used only
/// to compute byte offsets for errors.
fn parse_list<'a, T>(
    cursor: &mut &'a str,
    origin: &str,
    open: char,
    close: char,
    mut parse_elem: impl FnMut(&mut &'a str, &str) -> Result<T, ValueParseError>,
) -> Result<Vec<T>, ValueParseError> {
    skip_ws(cursor);
    let start_offset = origin.len() - cursor.len();
    if !cursor.starts_with(open) {
        return Err(ValueParseError::new(format!("expected `{open}`"), start_offset));
    }
    *cursor = &cursor[open.len_utf8()..];
    let mut items = Vec::new();
    skip_ws(cursor);
    if cursor.starts_with(close) {
        *cursor = &cursor[close.len_utf8()..];
        return Ok(items);
    }
    loop {
        skip_ws(cursor);
        items.push(parse_elem(cursor, origin)?);
        skip_ws(cursor);
        if cursor.starts_with(',') {
            *cursor = &cursor[1..];
            skip_ws(cursor);
            continue;
        }
        break;
    }
    skip_ws(cursor);
    let tail_offset = origin.len() - cursor.len();
    if !cursor.starts_with(close) {
        return Err(ValueParseError::new(format!("expected `{close}`"), tail_offset));
    }
    *cursor = &cursor[close.len_utf8()..];
    Ok(items)
}

impl<T: ToTautString> ToTautString for Vec<T> {
    fn to_taut_string(&self) -> String {
        let body: Vec<String> = self.iter().map(|v| v.to_taut_string()).collect();
        format!("[{}]", body.join(", "))
    }
}

impl<T: FromTautString> FromTautString for Vec<T> {
    fn from_taut_str(cursor: &mut &str) -> Result<Self, ValueParseError> {
        let origin = *cursor;
        parse_list(cursor, origin, '[', ']', |c, _origin| T::from_taut_str(c))
    }
}

impl<T: ToTautString, const N: usize> ToTautString for [T; N] {
    fn to_taut_string(&self) -> String {
        let body: Vec<String> = self.iter().map(|v| v.to_taut_string()).collect();
        format!("[{}]", body.join(", "))
    }
}

impl<T: FromTautString + std::fmt::Debug, const N: usize> FromTautString for [T; N] {
    fn from_taut_str(cursor: &mut &str) -> Result<Self, ValueParseError> {
        let origin = *cursor;
        let start_offset = origin.len() - cursor.len();
        let items = parse_list(cursor, origin, '[', ']', |c, _origin| T::from_taut_str(c))?;
        if items.len() != N {
            return Err(ValueParseError::new(
                format!("expected exactly {N} elements, found {}", items.len()),
                start_offset,
            ));
        }
        items
            .try_into()
            .map_err(|_| ValueParseError::new("element count mismatch", start_offset))
    }
}

impl<T: ToTautString + Ord> ToTautString for BTreeSet<T> {
    fn to_taut_string(&self) -> String {
        let body: Vec<String> = self.iter().map(|v| v.to_taut_string()).collect();
        format!("{{{}}}", body.join(", "))
    }
}

impl<T: FromTautString + Ord> FromTautString for BTreeSet<T> {
    fn from_taut_str(cursor: &mut &str) -> Result<Self, ValueParseError> {
        let origin = *cursor;
        let start_offset = origin.len() - cursor.len();
        let items = parse_list(cursor, origin, '{', '}', |c, _origin| T::from_taut_str(c))?;
        let mut set = BTreeSet::new();
        for item in items {
            if !set.insert(item) {
                return Err(ValueParseError::new("duplicate value in set literal", start_offset));
            }
        }
        Ok(set)
    }
}

impl<T: ToTautString + Eq + Hash> ToTautString for HashSet<T> {
    fn to_taut_string(&self) -> String {
        let mut body: Vec<String> = self.iter().map(|v| v.to_taut_string()).collect();
        body.sort();
        format!("{{{}}}", body.join(", "))
    }
}

impl<T: FromTautString + Eq + Hash> FromTautString for HashSet<T> {
    fn from_taut_str(cursor: &mut &str) -> Result<Self, ValueParseError> {
        let origin = *cursor;
        let start_offset = origin.len() - cursor.len();
        let items = parse_list(cursor, origin, '{', '}', |c, _origin| T::from_taut_str(c))?;
        let mut set = HashSet::new();
        for item in items {
            if !set.insert(item) {
                return Err(ValueParseError::new("duplicate value in set literal", start_offset));
            }
        }
        Ok(set)
    }
}

fn parse_map_entry<K: FromTautString, V: FromTautString>(
    cursor: &mut &str,
    origin: &str,
) -> Result<(K, V), ValueParseError> {
    let key = K::from_taut_str(cursor)?;
    skip_ws(cursor);
    let colon_offset = origin.len() - cursor.len();
    if !cursor.starts_with(':') {
        return Err(ValueParseError::new("expected `:`", colon_offset));
    }
    *cursor = &cursor[1..];
    skip_ws(cursor);
    let value = V::from_taut_str(cursor)?;
    Ok((key, value))
}

impl<K: ToTautString + Ord, V: ToTautString> ToTautString for BTreeMap<K, V> {
    fn to_taut_string(&self) -> String {
        let body: Vec<String> = self
            .iter()
            .map(|(k, v)| format!("{}: {}", k.to_taut_string(), v.to_taut_string()))
            .collect();
        format!("{{{}}}", body.join(", "))
    }
}

impl<K: FromTautString + Ord, V: FromTautString> FromTautString for BTreeMap<K, V> {
    fn from_taut_str(cursor: &mut &str) -> Result<Self, ValueParseError> {
        let origin = *cursor;
        let start_offset = origin.len() - cursor.len();
        let entries = parse_list(cursor, origin, '{', '}', parse_map_entry::<K, V>)?;
        let mut map = BTreeMap::new();
        for (k, v) in entries {
            if map.insert(k, v).is_some() {
                return Err(ValueParseError::new("duplicate key in map literal", start_offset));
            }
        }
        Ok(map)
    }
}

impl<K: ToTautString + Eq + Hash, V: ToTautString> ToTautString for HashMap<K, V> {
    fn to_taut_string(&self) -> String {
        let mut body: Vec<String> = self
            .iter()
            .map(|(k, v)| format!("{}: {}", k.to_taut_string(), v.to_taut_string()))
            .collect();
        body.sort();
        format!("{{{}}}", body.join(", "))
    }
}

impl<K: FromTautString + Eq + Hash, V: FromTautString> FromTautString for HashMap<K, V> {
    fn from_taut_str(cursor: &mut &str) -> Result<Self, ValueParseError> {
        let origin = *cursor;
        let start_offset = origin.len() - cursor.len();
        let entries = parse_list(cursor, origin, '{', '}', parse_map_entry::<K, V>)?;
        let mut map = HashMap::new();
        for (k, v) in entries {
            if map.insert(k, v).is_some() {
                return Err(ValueParseError::new("duplicate key in map literal", start_offset));
            }
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_roundtrip() {
        let v = vec![1, 2, 3];
        let printed = v.to_taut_string();
        assert_eq!(printed, "[1, 2, 3]");
        assert_eq!(Vec::<i32>::from_taut_str_complete(&printed).unwrap(), v);
    }

    #[test]
    fn fixed_size_array_validates_length() {
        assert!(<[i32; 3]>::from_taut_str_complete("[1, 2]").is_err());
        assert_eq!(<[i32; 2]>::from_taut_str_complete("[1, 2]").unwrap(), [1, 2]);
    }

    #[test]
    fn set_rejects_duplicate_keys() {
        assert!(BTreeSet::<i32>::from_taut_str_complete("{1, 1}").is_err());
    }

    #[test]
    fn string_is_a_string_like_range() {
        assert_eq!(<String as Range>::KIND, RangeKind::StringLike);
        assert_eq!(<Vec<i32> as Range>::KIND, RangeKind::Sequence);
    }

    #[test]
    fn map_roundtrip() {
        let mut m = BTreeMap::new();
        m.insert(1, "a".to_string());
        m.insert(2, "b".to_string());
        let printed = m.to_taut_string();
        assert_eq!(BTreeMap::<i32, String>::from_taut_str_complete(&printed).unwrap(), m);
    }
}
