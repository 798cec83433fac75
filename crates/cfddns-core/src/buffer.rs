// # Response Buffer
//
// Bounded byte buffer that accumulates one HTTP response body.
//
// The capacity is fixed when the buffer is created. An append that would
// exceed it fails with `Error::BufferTooSmall` and leaves the buffer
// untouched: no silent truncation, no reallocation.

use crate::config::RESPONSE_BUFFER_CAPACITY;
use crate::{Error, Result};

/// Fixed-capacity response body
#[derive(Clone, PartialEq, Eq)]
pub struct ResponseBuffer {
    data: Vec<u8>,
    capacity: usize,
}

impl ResponseBuffer {
    /// Create an empty buffer with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(RESPONSE_BUFFER_CAPACITY)
    }

    /// Create an empty buffer holding at most `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Build a buffer from a complete body, checking it fits
    pub fn from_bytes(bytes: &[u8], capacity: usize) -> Result<Self> {
        let mut buffer = Self::with_capacity(capacity);
        buffer.try_extend(bytes)?;
        Ok(buffer)
    }

    /// Append `chunk`, or fail without modifying the buffer
    pub fn try_extend(&mut self, chunk: &[u8]) -> Result<()> {
        if chunk.len() > self.remaining() {
            return Err(Error::BufferTooSmall {
                required: self.data.len() + chunk.len(),
                capacity: self.capacity,
            });
        }
        self.data.extend_from_slice(chunk);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes that can still be appended
    pub fn remaining(&self) -> usize {
        self.capacity - self.data.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// The body as UTF-8 text
    pub fn as_str(&self) -> Result<&str> {
        std::str::from_utf8(&self.data)
            .map_err(|e| Error::parse(format!("Response body is not UTF-8: {}", e)))
    }
}

impl Default for ResponseBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ResponseBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseBuffer")
            .field("len", &self.data.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_within_capacity() {
        let mut buffer = ResponseBuffer::with_capacity(8);
        buffer.try_extend(b"ip=").unwrap();
        buffer.try_extend(b"1.2.3").unwrap();
        assert_eq!(buffer.as_bytes(), b"ip=1.2.3");
        assert_eq!(buffer.remaining(), 0);
    }

    #[test]
    fn test_overflow_is_signalled_and_buffer_untouched() {
        let mut buffer = ResponseBuffer::with_capacity(8);
        buffer.try_extend(b"12345").unwrap();

        let err = buffer.try_extend(b"6789").unwrap_err();
        match err {
            Error::BufferTooSmall { required, capacity } => {
                assert_eq!(required, 9);
                assert_eq!(capacity, 8);
            }
            other => panic!("expected BufferTooSmall, got {other:?}"),
        }

        assert_eq!(buffer.as_bytes(), b"12345");
        assert_eq!(buffer.remaining(), 3);
    }

    #[test]
    fn test_from_bytes_too_large() {
        assert!(matches!(
            ResponseBuffer::from_bytes(b"too long", 4),
            Err(Error::BufferTooSmall { .. })
        ));
    }

    #[test]
    fn test_as_str_rejects_invalid_utf8() {
        let buffer = ResponseBuffer::from_bytes(&[0xff, 0xfe], 4).unwrap();
        assert!(matches!(buffer.as_str(), Err(Error::Parse(_))));
    }
}
