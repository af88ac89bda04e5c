//! Client name sanitization.
//!
//! Every client name is reduced to `[0-9A-Za-z_-]` before it is used as a
//! ledger key or a path component. The mapping is lossy: `"a b"` and
//! `"a.b"` both become `a_b`.

use std::fmt;
use std::str::Chars;

use crate::error::ClientError;

/// A sanitized client identity, safe to embed in file names and easyrsa
/// arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientName(String);

impl ClientName {
    /// Sanitize a caller-supplied name.
    ///
    /// Surrounding whitespace is trimmed and a double-quoted name is
    /// unquoted (escapes resolved) when the quoted form is well formed.
    /// Anything left outside the allowed set becomes `_`.
    pub fn parse(raw: &str) -> Result<Self, ClientError> {
        let trimmed = raw.trim();
        let unquoted = unquote(trimmed);
        let clean = unquoted.as_deref().unwrap_or(trimmed).trim();

        if clean.is_empty() {
            return Err(ClientError::InvalidIdentity);
        }

        let name: String = clean
            .chars()
            .map(|c| if is_allowed(c) { c } else { '_' })
            .collect();

        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ClientName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Interpret `s` as a double-quoted string literal with Go escape rules:
/// `\a \b \f \n \r \t \v \\ \"`, `\xNN`, octal `\NNN`, `\uNNNN` and
/// `\UNNNNNNNN`.
///
/// Returns `None` when `s` is not a well-formed quoted string, in which
/// case the caller keeps the raw text. `\x` and octal escapes yield raw
/// bytes; each byte that is not valid UTF-8 decodes to U+FFFD.
fn unquote(s: &str) -> Option<String> {
    let inner = s.strip_prefix('"')?.strip_suffix('"')?;
    if inner.contains('\n') {
        return None;
    }

    let mut out = Vec::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => unescape(&mut chars, &mut out)?,
            '"' => return None,
            other => push_char(&mut out, other),
        }
    }
    Some(decode_bytes(&out))
}

fn unescape(chars: &mut Chars<'_>, out: &mut Vec<u8>) -> Option<()> {
    let byte = match chars.next()? {
        'a' => 0x07,
        'b' => 0x08,
        'f' => 0x0c,
        'n' => b'\n',
        'r' => b'\r',
        't' => b'\t',
        'v' => 0x0b,
        '\\' => b'\\',
        '"' => b'"',
        'x' => u8::try_from(digits(chars, 2, 16)?).ok()?,
        'u' => {
            push_char(out, char::from_u32(digits(chars, 4, 16)?)?);
            return Some(());
        }
        'U' => {
            push_char(out, char::from_u32(digits(chars, 8, 16)?)?);
            return Some(());
        }
        first @ '0'..='7' => {
            let value = first.to_digit(8)? * 64 + digits(chars, 2, 8)?;
            u8::try_from(value).ok()?
        }
        _ => return None,
    };
    out.push(byte);
    Some(())
}

/// Read exactly `count` digits in `radix`.
fn digits(chars: &mut Chars<'_>, count: usize, radix: u32) -> Option<u32> {
    let mut value = 0u32;
    for _ in 0..count {
        value = value * radix + chars.next()?.to_digit(radix)?;
    }
    Some(value)
}

fn push_char(out: &mut Vec<u8>, c: char) {
    let mut buf = [0u8; 4];
    out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}

fn decode_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
        for _ in chunk.invalid() {
            out.push(char::REPLACEMENT_CHARACTER);
        }
    }
    out
}
