use std::fmt::Write;
use std::str::Chars;

use log::warn;
use thiserror::Error;

/// Outcome of [`lookup`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lookup {
    /// The unescaped value of the first matching pair, empty when not found.
    pub value: String,
    /// Whether a pair named after the key was found.
    pub found: bool,
    /// Whether the tag uses the `KEY:"VALUE"` form at all.
    pub keyed: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnquoteError {
    #[error("value is not enclosed in double quotes")]
    NotQuoted,

    #[error("unescaped quote inside value")]
    StrayQuote,

    #[error("raw newline inside value")]
    Newline,

    #[error("unknown escape sequence '\\{0}'")]
    UnknownEscape(char),

    #[error("truncated escape sequence")]
    Truncated,

    #[error("escape sequence does not encode a valid character")]
    InvalidChar,
}

/// Searches an annotation tag for `key`.
///
/// The tag is a space separated sequence of `KEY:"VALUE"` pairs, values may
/// contain backslash escapes. Parsing stops at the first syntax error, so
/// everything after a malformed pair is invisible to the lookup. The first
/// pair named `key` wins.
pub fn lookup(tag: &str, key: &str) -> Lookup {
    let mut keyed = false;
    let mut rest = tag;

    while !rest.is_empty() {
        let skip = rest.bytes().take_while(|b| *b == b' ').count();
        rest = &rest[skip..];
        if rest.is_empty() {
            break;
        }

        // Scan to colon. A space, a quote or a control character ends the name.
        let bytes = rest.as_bytes();
        let mut i = 0;
        while i < bytes.len() && is_name_byte(bytes[i]) {
            i += 1;
        }
        if i == 0 || i + 1 >= bytes.len() || bytes[i] != b':' || bytes[i + 1] != b'"' {
            break;
        }
        keyed = true;

        let name = &rest[..i];
        rest = &rest[i + 1..];

        // Scan quoted string to find value.
        let bytes = rest.as_bytes();
        let mut i = 1;
        while i < bytes.len() && bytes[i] != b'"' {
            if bytes[i] == b'\\' {
                i += 1;
            }
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }
        let quoted = &rest[..i + 1];
        rest = &rest[i + 1..];

        if name == key {
            match unquote(quoted) {
                Ok(value) => {
                    return Lookup {
                        value,
                        found: true,
                        keyed,
                    }
                }
                Err(_) => break,
            }
        }
    }

    Lookup {
        value: String::new(),
        found: false,
        keyed,
    }
}

#[inline]
fn is_name_byte(b: u8) -> bool {
    b > b' ' && b != b':' && b != b'"' && b != 0x7f
}

/// Decodes a double quoted literal such as `"a\"b"`.
pub fn unquote(s: &str) -> Result<String, UnquoteError> {
    let inner = s
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or(UnquoteError::NotQuoted)?;

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => return Err(UnquoteError::StrayQuote),
            '\n' => return Err(UnquoteError::Newline),
            '\\' => out.push(unescape(&mut chars)?),
            c => out.push(c),
        }
    }

    Ok(out)
}

fn unescape(chars: &mut Chars) -> Result<char, UnquoteError> {
    let c = chars.next().ok_or(UnquoteError::Truncated)?;
    let decoded = match c {
        'a' => '\x07',
        'b' => '\x08',
        'f' => '\x0c',
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        'v' => '\x0b',
        '\\' => '\\',
        '"' => '"',
        'x' => ascii(digits(chars, 2, 16)?)?,
        'u' => char::from_u32(digits(chars, 4, 16)?).ok_or(UnquoteError::InvalidChar)?,
        'U' => char::from_u32(digits(chars, 8, 16)?).ok_or(UnquoteError::InvalidChar)?,
        '0'..='7' => {
            let high = c.to_digit(8).ok_or(UnquoteError::InvalidChar)?;
            let low = digits(chars, 2, 8)?;
            ascii(high * 64 + low)?
        }
        c => return Err(UnquoteError::UnknownEscape(c)),
    };
    Ok(decoded)
}

fn digits(chars: &mut Chars, count: usize, radix: u32) -> Result<u32, UnquoteError> {
    let mut value = 0u32;
    for _ in 0..count {
        let digit = chars
            .next()
            .ok_or(UnquoteError::Truncated)?
            .to_digit(radix)
            .ok_or(UnquoteError::Truncated)?;
        value = value * radix + digit;
    }
    Ok(value)
}

// Byte escapes must stay ASCII, anything above would split a UTF-8 sequence.
fn ascii(value: u32) -> Result<char, UnquoteError> {
    if value >= 0x80 {
        return Err(UnquoteError::InvalidChar);
    }
    char::from_u32(value).ok_or(UnquoteError::InvalidChar)
}

/// Encodes `s` as a double quoted literal accepted by [`unquote`].
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() && (c as u32) < 0x80 => {
                _ = write!(out, "\\x{:02x}", c as u32);
            }
            c if c.is_control() => {
                _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// The requirement an annotation places on one verb.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// No annotation, or one too malformed to interpret.
    Absent,
    /// Keyed annotation that leaves this verb open.
    Unrestricted,
    /// The permission or role the caller must hold.
    Required(String),
}

impl Requirement {
    pub fn parse(tag: &str, verb: &str) -> Self {
        if tag.is_empty() {
            return Self::Absent;
        }

        let found = lookup(tag, verb);
        if found.keyed {
            if !found.found || found.value.is_empty() {
                return Self::Unrestricted;
            }
            return Self::Required(found.value);
        }

        // A bare value is a single literal, quotes mean a broken keyed tag.
        if tag.contains('"') {
            warn!("Ignore malformed annotation {tag:?}");
            return Self::Absent;
        }

        Self::Required(tag.to_string())
    }
}
