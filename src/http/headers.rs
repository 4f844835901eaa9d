//! Case-insensitive header collection and field-line parsing.
//!
//! # Responsibilities
//! - Store header fields under lower-cased names
//! - Merge repeated fields with `", "` in arrival order
//! - Parse one field line at a time from a growing buffer
//!
//! # Design Decisions
//! - Fields keep first-insertion order so serialization is deterministic
//! - Field names may not contain whitespace (no obsolete line folding)

use indexmap::IndexMap;
use thiserror::Error;

pub(crate) const CRLF: &[u8] = b"\r\n";

/// Errors produced while parsing a field line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    /// The line has no colon, or its name is empty, carries whitespace or is not ASCII.
    #[error("Invalid field-line")]
    InvalidHeaderLine,
}

/// A collection of header fields keyed by lower-cased name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    fields: IndexMap<String, String>,
}

impl Headers {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name.to_ascii_lowercase().as_str())
            .map(String::as_str)
    }

    /// Check if a field is present.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name.to_ascii_lowercase().as_str())
    }

    /// Insert or overwrite a field.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.fields.insert(name.to_ascii_lowercase(), value.into());
    }

    /// Insert a field, appending to an existing value with `", "`.
    pub fn add(&mut self, name: &str, value: &str) {
        match self.fields.get_mut(name.to_ascii_lowercase().as_str()) {
            Some(existing) => {
                existing.push_str(", ");
                existing.push_str(value);
            }
            None => {
                self.fields.insert(name.to_ascii_lowercase(), value.to_string());
            }
        }
    }

    /// Remove a field, returning its value if it was present.
    pub fn delete(&mut self, name: &str) -> Option<String> {
        self.fields.shift_remove(name.to_ascii_lowercase().as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parse exactly one field line from the front of `data`.
    ///
    /// Returns the number of bytes consumed and whether the blank line that
    /// ends the header section was reached. `(0, false)` means no complete
    /// line is buffered yet.
    pub fn parse_one(&mut self, data: &[u8]) -> Result<(usize, bool), HeaderError> {
        let Some(idx) = find_crlf(data) else {
            return Ok((0, false));
        };
        if idx == 0 {
            return Ok((CRLF.len(), true));
        }

        let line = &data[..idx];
        let colon = line
            .iter()
            .position(|&b| b == b':')
            .ok_or(HeaderError::InvalidHeaderLine)?;
        let (name, value) = (&line[..colon], &line[colon + 1..]);
        if name.is_empty() || name.iter().any(|&b| b == b' ' || b == b'\t' || !b.is_ascii()) {
            return Err(HeaderError::InvalidHeaderLine);
        }
        let name = std::str::from_utf8(name).map_err(|_| HeaderError::InvalidHeaderLine)?;

        // Values are opaque octets; obs-text is decoded lossily.
        let value = String::from_utf8_lossy(value);
        self.add(name, value.trim());
        Ok((idx + CRLF.len(), false))
    }

    /// Append every field as a `name: value\r\n` line.
    pub(crate) fn write_to(&self, buf: &mut Vec<u8>) {
        for (name, value) in self.iter() {
            buf.extend_from_slice(name.as_bytes());
            buf.extend_from_slice(b": ");
            buf.extend_from_slice(value.as_bytes());
            buf.extend_from_slice(CRLF);
        }
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Headers {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.add(name, value);
        }
        headers
    }
}

/// Position of the first CRLF in `data`.
pub(crate) fn find_crlf(data: &[u8]) -> Option<usize> {
    data.windows(CRLF.len()).position(|w| w == CRLF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_single_header() {
        let mut headers = Headers::new();
        let data = b"Host: localhost:42069\r\n\r\n";
        let (n, done) = headers.parse_one(data).unwrap();
        assert_eq!(headers.get("host"), Some("localhost:42069"));
        assert_eq!(n, 23);
        assert!(!done);
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let mut headers = Headers::new();
        let (n, done) = headers.parse_one(b"Host:    localhost:42069     \r\n").unwrap();
        assert_eq!(headers.get("Host"), Some("localhost:42069"));
        assert_eq!(n, 31);
        assert!(!done);
    }

    #[test]
    fn blank_line_ends_section() {
        let mut headers = Headers::new();
        assert_eq!(headers.parse_one(b"\r\nbody").unwrap(), (2, true));
        assert!(headers.is_empty());
    }

    #[test]
    fn incomplete_line_needs_more_data() {
        let mut headers = Headers::new();
        assert_eq!(headers.parse_one(b"Host: local").unwrap(), (0, false));
        assert!(headers.is_empty());
    }

    #[test]
    fn whitespace_before_colon_is_rejected() {
        let mut headers = Headers::new();
        assert_eq!(
            headers.parse_one(b"       Host : localhost:42069       \r\n\r\n"),
            Err(HeaderError::InvalidHeaderLine)
        );
        assert_eq!(
            headers.parse_one(b"Ho\tst: x\r\n"),
            Err(HeaderError::InvalidHeaderLine)
        );
    }

    #[test]
    fn missing_colon_or_name_is_rejected() {
        let mut headers = Headers::new();
        assert!(headers.parse_one(b"Host localhost\r\n").is_err());
        assert!(headers.parse_one(b": value\r\n").is_err());
    }

    #[test]
    fn non_utf8_value_is_accepted() {
        let mut headers = Headers::new();
        let (n, done) = headers.parse_one(b"X-Name: caf\xe9\r\n").unwrap();
        assert_eq!(n, 14);
        assert!(!done);
        assert_eq!(headers.get("x-name"), Some("caf\u{FFFD}"));
    }

    #[test]
    fn non_ascii_name_is_rejected() {
        let mut headers = Headers::new();
        assert_eq!(
            headers.parse_one(b"Caf\xe9: x\r\n"),
            Err(HeaderError::InvalidHeaderLine)
        );
    }

    #[test]
    fn repeated_fields_merge_in_order() {
        let mut headers = Headers::new();
        headers.parse_one(b"Accept: text/html\r\n").unwrap();
        headers.parse_one(b"accept: application/json\r\n").unwrap();
        assert_eq!(headers.get("ACCEPT"), Some("text/html, application/json"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn set_overwrites_and_delete_removes() {
        let mut headers = Headers::new();
        headers.set("Content-Type", "text/plain");
        headers.set("content-type", "text/html");
        assert_eq!(headers.get("content-type"), Some("text/html"));
        assert_eq!(headers.delete("CONTENT-TYPE").as_deref(), Some("text/html"));
        assert_eq!(headers.get("content-type"), None);
        assert_eq!(headers.delete("content-type"), None);
    }

    #[test]
    fn serialization_keeps_insertion_order() {
        let mut headers: Headers = [("B", "2"), ("a", "1")].into_iter().collect();
        headers.set("b", "3");
        let mut out = Vec::new();
        headers.write_to(&mut out);
        assert_eq!(out, b"b: 3\r\na: 1\r\n");
    }
}
