//! Per-call capture buffer (headers + bounded body).
//!
//! Rules:
//! - One buffer per call direction; never shared across concurrent calls.
//! - Exceeding the body cap is not an error: extra bytes are dropped and
//!   `truncated` is set.
//! - Header names are case-insensitive and stored lower-cased.

use bytes::{BufMut, BytesMut};

/// Captured header with all values seen for its name, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedHeader {
    pub name: String,
    pub values: Vec<String>,
}

impl CapturedHeader {
    /// Values joined the way HTTP folds repeated fields.
    pub fn joined(&self) -> String {
        self.values.join(", ")
    }
}

/// Mutable capture state owned by exactly one in-flight call.
#[derive(Debug)]
pub struct CaptureBuffer {
    headers: Vec<CapturedHeader>,
    body: BytesMut,
    max_body_bytes: usize,
    truncated: bool,
}

impl CaptureBuffer {
    pub fn new(max_body_bytes: usize) -> Self {
        Self {
            headers: Vec::new(),
            body: BytesMut::new(),
            max_body_bytes,
            truncated: false,
        }
    }

    /// Append a header value. Duplicate names accumulate.
    pub fn add_header(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match self.headers.iter_mut().find(|h| h.name == name) {
            Some(h) => h.values.push(value.to_string()),
            None => self.headers.push(CapturedHeader {
                name,
                values: vec![value.to_string()],
            }),
        }
    }

    /// Append body bytes up to the cap; the rest is discarded. A cut that
    /// would split a UTF-8 character inside `chunk` drops the whole character.
    pub fn append_body(&mut self, chunk: &[u8]) {
        let room = self.max_body_bytes.saturating_sub(self.body.len());
        let take = if chunk.len() > room {
            self.truncated = true;
            char_boundary(chunk, room)
        } else {
            chunk.len()
        };
        if take > 0 {
            self.body.put_slice(&chunk[..take]);
        }
    }

    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.body.is_empty()
    }

    /// Read-only copy of the current state.
    pub fn snapshot(&self) -> CaptureSnapshot {
        CaptureSnapshot {
            headers: self.headers.clone(),
            body: String::from_utf8_lossy(&self.body).into_owned(),
            truncated: self.truncated,
        }
    }
}

fn is_continuation(b: u8) -> bool {
    b & 0b1100_0000 == 0b1000_0000
}

/// Largest cut `<= cut` that does not split a multi-byte character.
/// Requires `cut < chunk.len()`. Non-UTF-8 data keeps the byte cut.
fn char_boundary(chunk: &[u8], cut: usize) -> usize {
    if !is_continuation(chunk[cut]) {
        return cut;
    }
    let mut i = cut;
    while i > 0 && cut - i < 3 && is_continuation(chunk[i]) {
        i -= 1;
    }
    if chunk[i] >= 0xC0 {
        i
    } else {
        cut
    }
}

/// Point-in-time copy of a [`CaptureBuffer`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureSnapshot {
    pub headers: Vec<CapturedHeader>,
    pub body: String,
    pub truncated: bool,
}

impl CaptureSnapshot {
    /// Joined value of a header (case-insensitive lookup).
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(CapturedHeader::joined)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn duplicate_headers_accumulate_in_order() {
        let mut buf = CaptureBuffer::new(16);
        buf.add_header("Accept", "text/html");
        buf.add_header("x-id", "7");
        buf.add_header("ACCEPT", "application/json");

        let snap = buf.snapshot();
        assert_eq!(snap.headers.len(), 2);
        assert_eq!(snap.headers[0].name, "accept");
        assert_eq!(snap.headers[0].values, vec!["text/html", "application/json"]);
        assert_eq!(snap.header("Accept").unwrap(), "text/html, application/json");
        assert_eq!(snap.header("X-ID").unwrap(), "7");
    }

    #[test]
    fn body_is_capped_and_flagged() {
        let mut buf = CaptureBuffer::new(8);
        buf.append_body(b"hello");
        assert!(!buf.is_truncated());
        buf.append_body(b" world");
        buf.append_body(b"!!!");

        assert_eq!(buf.body_len(), 8);
        assert!(buf.is_truncated());
        assert_eq!(buf.snapshot().body, "hello wo");
    }

    #[test]
    fn exact_fill_is_not_truncation() {
        let mut buf = CaptureBuffer::new(4);
        buf.append_body(b"abcd");
        buf.append_body(b"");
        assert_eq!(buf.body_len(), 4);
        assert!(!buf.is_truncated());
    }

    #[test]
    fn cap_never_splits_a_character() {
        let mut buf = CaptureBuffer::new(4);
        buf.append_body("ab€".as_bytes());

        assert!(buf.is_truncated());
        assert_eq!(buf.body_len(), 2);
        assert_eq!(buf.snapshot().body, "ab");
    }

    #[test]
    fn binary_data_keeps_the_byte_cut() {
        let mut buf = CaptureBuffer::new(2);
        buf.append_body(&[0x80, 0x80, 0x80, 0x80]);
        assert_eq!(buf.body_len(), 2);
    }

    #[test]
    fn zero_cap_drops_everything() {
        let mut buf = CaptureBuffer::new(0);
        buf.append_body(b"x");
        assert_eq!(buf.body_len(), 0);
        assert!(buf.is_truncated());
    }
}
