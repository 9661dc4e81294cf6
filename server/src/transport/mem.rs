/*
 * TMemoryBuffer: a finite in-memory byte transport with a read cursor. Used
 * standalone for serialization to/from a `Vec<u8>`, and as the bottom layer
 * under the framed/buffered transports in tests.
 */

use super::{TTransport, TransportResult};
use crate::error::TTransportException;

#[derive(Debug, Default)]
pub struct TMemoryBuffer {
    buf: Vec<u8>,
    read_pos: usize,
    open: bool,
}

impl TMemoryBuffer {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            read_pos: 0,
            open: true,
        }
    }

    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            buf: data,
            read_pos: 0,
            open: true,
        }
    }

    /// Bytes not yet consumed by `read`.
    pub fn remaining(&self) -> &[u8] {
        &self.buf[self.read_pos..]
    }

    /// Everything ever written, including already-consumed bytes.
    pub fn written(&self) -> &[u8] {
        &self.buf
    }

    /// Reset both the write buffer and the read cursor.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.read_pos = 0;
    }
}

impl TTransport for TMemoryBuffer {
    fn is_open(&self) -> bool {
        self.open
    }

    fn open(&mut self) -> TransportResult<()> {
        self.open = true;
        Ok(())
    }

    fn close(&mut self) -> TransportResult<()> {
        self.open = false;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> TransportResult<usize> {
        if !self.open {
            return Err(super::not_open());
        }
        let available = self.buf.len() - self.read_pos;
        let n = available.min(buf.len());
        buf[..n].copy_from_slice(&self.buf[self.read_pos..self.read_pos + n]);
        self.read_pos += n;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> TransportResult<()> {
        if !self.open {
            return Err(super::not_open());
        }
        self.buf.extend_from_slice(buf);
        Ok(())
    }

    fn flush(&mut self) -> TransportResult<()> {
        Ok(())
    }
}

impl From<Vec<u8>> for TMemoryBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self::with_data(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_roundtrips() {
        let mut mem = TMemoryBuffer::new();
        mem.write(b"hello").unwrap();
        let mut out = [0u8; 5];
        mem.read_all(&mut out).unwrap();
        assert_eq!(&out, b"hello");
    }

    #[test]
    fn partial_read_returns_available_bytes() {
        let mut mem = TMemoryBuffer::with_data(b"abc".to_vec());
        let mut out = [0u8; 10];
        let n = mem.read(&mut out).unwrap();
        assert_eq!(n, 3);
        assert_eq!(&out[..3], b"abc");
    }

    #[test]
    fn reset_clears_buffer_and_cursor() {
        let mut mem = TMemoryBuffer::with_data(b"abc".to_vec());
        let mut one = [0u8; 1];
        mem.read(&mut one).unwrap();
        mem.reset();
        assert!(mem.remaining().is_empty());
        assert!(mem.written().is_empty());
    }

    fn err_is_not_open(e: TTransportException) {
        assert_eq!(e.kind, crate::error::TransportErrorKind::NotOpen);
    }

    #[test]
    fn closed_transport_rejects_io() {
        let mut mem = TMemoryBuffer::new();
        mem.close().unwrap();
        err_is_not_open(mem.write(b"x").unwrap_err());
    }
}
