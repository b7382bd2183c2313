// Copyright (c) The taut Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! String and character serialization policy.
//!
//! Rust's native `char`/`String` already are the 32-bit-scalar/UTF-8
//! encodings, so they serialize with no type prefix. The narrower
//! encodings (`u8`-as-char, `char16_t`-as-`u`; see `DESIGN.md` for how
//! `wchar_t`/`L` folds into this) are modeled as small newtypes so the
//! "prefix must match the target type exactly" rule has something to
//! check against.

use super::encoding::{self, Decoded};
use super::{ToTautString, FromTautString};
use crate::errors::ValueParseError;

/// A single UTF-8 code unit treated as a character (the `u8` prefix).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Byte(pub u8);

/// A single UTF-16 code unit treated as a character (the `u` prefix). May
/// be a lone surrogate, unlike [`char`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Utf16Unit(pub u16);

/// A byte string (the `u8` string prefix). Not assumed to be valid UTF-8;
/// invalid spans render as `\x{..}` per byte.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Default)]
pub struct ByteString(pub Vec<u8>);

/// A UTF-16 string (the `u` string prefix). Lone surrogates render the
/// same way as invalid UTF-8 does for [`ByteString`].
#[derive(Clone, Debug, Eq, PartialEq, Hash, Default)]
pub struct WideString(pub Vec<u16>);

fn quote_and_escape(body: &str, quote: char) -> String {
    let mut out = String::with_capacity(body.len() + 2);
    out.push(quote);
    out.push_str(&encoding::escape(body));
    out.push(quote);
    out
}

/// Reads an optional exact-match type prefix, then a delimited, escaped
/// body, returning the unescaped codepoints and the number of source bytes
/// consumed (including prefix and delimiters).
fn parse_prefixed_literal(
    cursor: &mut &str,
    origin: &str,
    expected_prefix: &str,
    quote: char,
) -> Result<Vec<u32>, ValueParseError> {
    let start_offset = origin.len() - cursor.len();
    let mut scan = *cursor;
    if expected_prefix.is_empty() {
        // No prefix allowed: reject if one of the known prefixes is present.
        for known in ["u8", "u", "U", "L"] {
            if scan.starts_with(known) && scan[known.len()..].starts_with(quote) {
                return Err(ValueParseError::new(
                    format!("unexpected type prefix `{known}`"),
                    start_offset,
                ));
            }
        }
    } else if let Some(rest) = scan.strip_prefix(expected_prefix) {
        scan = rest;
    } else {
        return Err(ValueParseError::new(
            format!("expected type prefix `{expected_prefix}`"),
            start_offset,
        ));
    }

    if !scan.starts_with(quote) {
        return Err(ValueParseError::new(
            format!("expected opening `{quote}`"),
            origin.len() - scan.len(),
        ));
    }
    scan = &scan[quote.len_utf8()..];

    let mut body = String::new();
    let mut chars = scan.char_indices().peekable();
    let mut close_at = None;
    while let Some((idx, c)) = chars.next() {
        if c == '\\' {
            // Consume the escape's second character too, so an escaped
            // quote doesn't end the literal early.
            if let Some((_, _next)) = chars.next() {
                body.push('\\');
                body.push(_next);
            } else {
                return Err(ValueParseError::new("unterminated literal", start_offset));
            }
            continue;
        }
        if c == quote {
            close_at = Some(idx + c.len_utf8());
            break;
        }
        body.push(c);
    }
    let close_at = close_at.ok_or_else(|| ValueParseError::new("unterminated literal", start_offset))?;
    let codepoints = encoding::unescape_to_codepoints(&body).map_err(|e| {
        ValueParseError::new(e.to_string(), start_offset)
    })?;
    *cursor = &scan[close_at..];
    Ok(codepoints)
}

impl ToTautString for char {
    fn to_taut_string(&self) -> String {
        quote_and_escape(&self.to_string(), '\'')
    }
}

impl FromTautString for char {
    fn from_taut_str(cursor: &mut &str) -> Result<Self, ValueParseError> {
        let origin = *cursor;
        let start_offset = origin.len() - cursor.len();
        let codepoints = parse_prefixed_literal(cursor, origin, "", '\'')?;
        match codepoints.as_slice() {
            [cp] => char::from_u32(*cp)
                .ok_or_else(|| ValueParseError::new("invalid codepoint for char", start_offset)),
            _ => Err(ValueParseError::new(
                "char literal must contain exactly one character",
                start_offset,
            )),
        }
    }
}

impl ToTautString for Byte {
    fn to_taut_string(&self) -> String {
        format!("u8{}", quote_and_escape(&(self.0 as char).to_string(), '\''))
    }
}

impl FromTautString for Byte {
    fn from_taut_str(cursor: &mut &str) -> Result<Self, ValueParseError> {
        let origin = *cursor;
        let start_offset = origin.len() - cursor.len();
        let codepoints = parse_prefixed_literal(cursor, origin, "u8", '\'')?;
        match codepoints.as_slice() {
            [cp] if *cp <= 0xFF => Ok(Byte(*cp as u8)),
            _ => Err(ValueParseError::new(
                "u8 char literal must be a single byte-sized character",
                start_offset,
            )),
        }
    }
}

impl ToTautString for Utf16Unit {
    fn to_taut_string(&self) -> String {
        let body = char::from_u32(self.0 as u32)
            .map(|c| c.to_string())
            .unwrap_or_else(|| format!("\\x{{{:x}}}", self.0));
        format!("u{}", quote_and_escape(&body, '\''))
    }
}

impl FromTautString for Utf16Unit {
    fn from_taut_str(cursor: &mut &str) -> Result<Self, ValueParseError> {
        let origin = *cursor;
        let start_offset = origin.len() - cursor.len();
        let codepoints = parse_prefixed_literal(cursor, origin, "u", '\'')?;
        match codepoints.as_slice() {
            [cp] if *cp <= 0xFFFF => Ok(Utf16Unit(*cp as u16)),
            _ => Err(ValueParseError::new(
                "u char literal must fit in one UTF-16 code unit",
                start_offset,
            )),
        }
    }
}

impl ToTautString for String {
    fn to_taut_string(&self) -> String {
        quote_and_escape(self, '"')
    }
}

impl ToTautString for str {
    fn to_taut_string(&self) -> String {
        quote_and_escape(self, '"')
    }
}

impl FromTautString for String {
    fn from_taut_str(cursor: &mut &str) -> Result<Self, ValueParseError> {
        let origin = *cursor;
        let codepoints = parse_prefixed_literal(cursor, origin, "", '"')?;
        codepoints_to_string(&codepoints, origin.len() - cursor.len())
    }
}

fn codepoints_to_string(codepoints: &[u32], offset: usize) -> Result<String, ValueParseError> {
    codepoints
        .iter()
        .map(|&cp| char::from_u32(cp).ok_or_else(|| ValueParseError::new("invalid codepoint", offset)))
        .collect()
}

impl ToTautString for ByteString {
    fn to_taut_string(&self) -> String {
        let mut body = String::new();
        let mut rest = self.0.as_slice();
        while !rest.is_empty() {
            match encoding::decode_one_utf8(rest) {
                Decoded::Ok(c, len) => {
                    body.push_str(&encoding::escape(&c.to_string()));
                    rest = &rest[len..];
                }
                Decoded::Error(len) => {
                    for byte in &rest[..len] {
                        body.push_str(&format!("\\x{{{:x}}}", byte));
                    }
                    rest = &rest[len..];
                }
            }
        }
        format!("u8\"{body}\"")
    }
}

impl FromTautString for ByteString {
    fn from_taut_str(cursor: &mut &str) -> Result<Self, ValueParseError> {
        let origin = *cursor;
        let start_offset = origin.len() - cursor.len();
        let codepoints = parse_prefixed_literal(cursor, origin, "u8", '"')?;
        let mut bytes = Vec::with_capacity(codepoints.len());
        for cp in codepoints {
            if cp > 0xFF {
                return Err(ValueParseError::new(
                    "u8 string literal contains a character that doesn't fit in a byte",
                    start_offset,
                ));
            }
            bytes.push(cp as u8);
        }
        Ok(ByteString(bytes))
    }
}

impl ToTautString for WideString {
    fn to_taut_string(&self) -> String {
        let mut body = String::new();
        let mut rest = self.0.as_slice();
        while !rest.is_empty() {
            match encoding::decode_one_utf16(rest) {
                Decoded::Ok(c, len) => {
                    body.push_str(&encoding::escape(&c.to_string()));
                    rest = &rest[len..];
                }
                Decoded::Error(len) => {
                    for unit in &rest[..len] {
                        body.push_str(&format!("\\x{{{:x}}}", unit));
                    }
                    rest = &rest[len..];
                }
            }
        }
        format!("u\"{body}\"")
    }
}

impl FromTautString for WideString {
    fn from_taut_str(cursor: &mut &str) -> Result<Self, ValueParseError> {
        let origin = *cursor;
        let start_offset = origin.len() - cursor.len();
        let codepoints = parse_prefixed_literal(cursor, origin, "u", '"')?;
        let mut units = Vec::new();
        for cp in codepoints {
            encoding::encode_one_utf16(cp, &mut units).map_err(|e| {
                ValueParseError::new(e.to_string(), start_offset)
            })?;
        }
        Ok(WideString(units))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_roundtrip() {
        let s = "tab\there\nquote\"back\\slash".to_string();
        let printed = s.to_taut_string();
        let parsed = String::from_taut_str_complete(&printed).unwrap();
        assert_eq!(parsed, s);
    }

    #[test]
    fn prefix_mismatch_is_rejected() {
        assert!(Byte::from_taut_str_complete("'a'").is_err());
        assert!(char::from_taut_str_complete("u8'a'").is_err());
    }

    #[test]
    fn byte_string_roundtrip() {
        let bytes = ByteString(vec![b'h', b'i']);
        let printed = bytes.to_taut_string();
        assert_eq!(printed, "u8\"hi\"");
        let parsed = ByteString::from_taut_str_complete(&printed).unwrap();
        assert_eq!(parsed, bytes);
    }
}
