//! Path parameter resolution
//!
//! People are addressed by a URL-encoded "First Last" segment, courses by a
//! positive numeric ID. Both resolvers work on the raw (still encoded) path
//! segment so that decoding happens exactly once.

use std::fmt;

use crate::{Error, Result};

/// First/last name pair used as the natural key of a person.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullName {
    pub first: String,
    pub last: String,
}

impl FullName {
    pub fn new(first: impl Into<String>, last: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            last: last.into(),
        }
    }
}

impl fmt::Display for FullName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.first, self.last)
    }
}

/// Decode a raw path segment and split it on the first space.
///
/// `+` decodes to a space, as in query-string decoding. Everything after the
/// first space is the last name, including further spaces. Case is kept.
pub fn resolve_full_name(segment: &str) -> Result<FullName> {
    if segment.is_empty() {
        return Err(Error::InvalidFormat("name is empty".to_string()));
    }

    let decoded = percent_decode(segment)?;

    let Some((first, last)) = decoded.split_once(' ') else {
        return Err(Error::InvalidFormat(format!(
            "expected \"First Last\", got '{decoded}'"
        )));
    };

    if first.is_empty() || last.is_empty() {
        return Err(Error::InvalidFormat(format!(
            "expected \"First Last\", got '{decoded}'"
        )));
    }

    Ok(FullName::new(first, last))
}

/// Parse a course ID path segment; only positive integers are accepted.
pub fn parse_id(segment: &str) -> Result<i64> {
    match segment.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(Error::InvalidId(format!(
            "'{segment}' is not a positive integer"
        ))),
    }
}

fn percent_decode(segment: &str) -> Result<String> {
    let bytes = segment.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let escape = bytes.get(i + 1..i + 3);
            if !escape.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)) {
                return Err(Error::InvalidFormat(format!(
                    "malformed percent-escape in '{segment}'"
                )));
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    let spaced = segment.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| Error::InvalidFormat(format!("'{segment}' is not valid UTF-8")))
}
