/*
 * TFramedTransport: wraps another transport to add a 4-byte big-endian
 * length prefix per logical message. Grounded on the length-prefixed
 * frame read/write loop in `engine/net/protocol/data_exchange.rs` and the
 * write-buffer-cleared-before-delegating-write ordering used throughout
 * `dbnet` so that a failing write leaves the transport in a recoverable
 * state rather than replaying a stale frame on the next flush.
 */

use super::{TTransport, TTransportFactory, TransportConfiguration, TransportResult};
use crate::error::TTransportException;
use bytes::{Buf, BytesMut};

const LEN_PREFIX: usize = 4;

pub struct TFramedTransport<T> {
    inner: T,
    config: TransportConfiguration,
    write_buf: Vec<u8>,
    read_buf: BytesMut,
}

impl<T: TTransport> TFramedTransport<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, TransportConfiguration::default())
    }

    pub fn with_config(inner: T, config: TransportConfiguration) -> Self {
        Self {
            inner,
            config,
            write_buf: Vec::new(),
            read_buf: BytesMut::new(),
        }
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Prepend bytes to the read buffer, as if they had not yet been consumed.
    pub fn put_back(&mut self, data: &[u8]) {
        let mut replacement = BytesMut::with_capacity(data.len() + self.read_buf.len());
        replacement.extend_from_slice(data);
        replacement.extend_from_slice(&self.read_buf);
        self.read_buf = replacement;
    }

    fn fill_frame(&mut self) -> TransportResult<()> {
        let mut len_bytes = [0u8; LEN_PREFIX];
        self.inner.read_all(&mut len_bytes)?;
        let len = u32::from_be_bytes(len_bytes) as u64;
        self.config.check_size(len)?;
        let mut payload = vec![0u8; len as usize];
        self.inner.read_all(&mut payload)?;
        self.read_buf = BytesMut::from(&payload[..]);
        Ok(())
    }
}

impl<T: TTransport> TTransport for TFramedTransport<T> {
    fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    fn open(&mut self) -> TransportResult<()> {
        self.inner.open()
    }

    fn close(&mut self) -> TransportResult<()> {
        self.inner.close()
    }

    fn read(&mut self, buf: &mut [u8]) -> TransportResult<usize> {
        if self.read_buf.is_empty() {
            self.fill_frame()?;
        }
        let n = buf.len().min(self.read_buf.len());
        buf[..n].copy_from_slice(&self.read_buf[..n]);
        self.read_buf.advance(n);
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> TransportResult<()> {
        self.write_buf.extend_from_slice(buf);
        Ok(())
    }

    fn flush(&mut self) -> TransportResult<()> {
        let frame = std::mem::take(&mut self.write_buf);
        let len = frame.len() as u32;
        // the write buffer is cleared above, before we touch the underlying
        // transport, so an error from `inner.write` never corrupts the next frame
        let result: TransportResult<()> = (|| {
            self.inner.write(&len.to_be_bytes())?;
            self.inner.write(&frame)?;
            self.inner.flush()
        })();
        result
    }
}

pub struct TFramedTransportFactory {
    pub config: TransportConfiguration,
}

impl TFramedTransportFactory {
    pub fn new(config: TransportConfiguration) -> Self {
        Self { config }
    }
}

impl<T: TTransport> TTransportFactory for TFramedTransportFactory {
    type Inner = T;
    type Output = TFramedTransport<T>;

    fn get_transport(&self, inner: T) -> TransportResult<TFramedTransport<T>> {
        Ok(TFramedTransport::with_config(inner, self.config))
    }
}

/// Raises a [`TTransportException`] of kind [`crate::error::TransportErrorKind::NegativeSize`]
/// for a frame length that, interpreted as signed, would be negative — the
/// SASL transport reuses this helper for its own length-prefixed header.
pub fn reject_negative_length(raw: i64) -> TransportResult<()> {
    if raw < 0 {
        return Err(TTransportException::negative_size(raw));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mem::TMemoryBuffer;

    #[test]
    fn zero_length_frame_round_trips() {
        let mem = TMemoryBuffer::new();
        let mut framed = TFramedTransport::new(mem);
        framed.flush().unwrap();
        let mem = framed.into_inner();
        assert_eq!(mem.written(), &[0, 0, 0, 0]);

        let mut framed = TFramedTransport::new(mem);
        let mut out = [0u8; 1];
        let n = framed.read(&mut out).unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn payload_frames_as_length_prefixed_bytes() {
        let mem = TMemoryBuffer::new();
        let mut framed = TFramedTransport::new(mem);
        framed.write(b"Hello, world!").unwrap();
        framed.flush().unwrap();
        let mem = framed.into_inner();
        let expected: &[u8] = &[
            0x00, 0x00, 0x00, 0x0D, b'H', b'e', b'l', b'l', b'o', b',', b' ', b'w', b'o', b'r',
            b'l', b'd', b'!',
        ];
        assert_eq!(mem.written(), expected);
    }

    #[test]
    fn partial_reads_reassemble_full_payload() {
        let mem = TMemoryBuffer::with_data(vec![
            0x00, 0x00, 0x00, 0x0D, b'H', b'e', b'l', b'l', b'o', b',', b' ', b'w', b'o', b'r',
            b'l', b'd', b'!',
        ]);
        let mut framed = TFramedTransport::new(mem);
        let mut buf5 = [0u8; 5];
        framed.read(&mut buf5).unwrap();
        assert_eq!(&buf5, b"Hello");
        let mut buf8 = [0u8; 8];
        framed.read(&mut buf8).unwrap();
        assert_eq!(&buf8, b", world!");
    }

    #[test]
    fn oversized_frame_is_rejected_before_allocating() {
        let mem = TMemoryBuffer::with_data(vec![0x00, 0x10, 0x00, 0x00]);
        let config = TransportConfiguration::new(1024);
        let mut framed = TFramedTransport::with_config(mem, config);
        let mut out = [0u8; 1];
        let err = framed.read(&mut out).unwrap_err();
        assert_eq!(err.kind, crate::error::TransportErrorKind::SizeLimit);
    }

    #[test]
    fn arbitrary_split_of_underlying_reads_still_reassembles() {
        // property-style check over a handful of split points
        let payload = b"the quick brown fox jumps over the lazy dog";
        let mut wire = (payload.len() as u32).to_be_bytes().to_vec();
        wire.extend_from_slice(payload);
        for split in [1usize, 3, 4, 5, 10, wire.len() - 1, wire.len()] {
            let split = split.min(wire.len());
            let chunked = ChunkedTransport::new(wire.clone(), split);
            let mut framed = TFramedTransport::new(chunked);
            let mut out = vec![0u8; payload.len()];
            framed.read_all(&mut out).unwrap();
            assert_eq!(out, payload);
        }
    }

    /// A transport that only ever returns up to `chunk` bytes per `read` call,
    /// used to exercise the framed reader's reassembly over arbitrary splits.
    struct ChunkedTransport {
        data: Vec<u8>,
        pos: usize,
        chunk: usize,
    }

    impl ChunkedTransport {
        fn new(data: Vec<u8>, chunk: usize) -> Self {
            Self {
                data,
                pos: 0,
                chunk: chunk.max(1),
            }
        }
    }

    impl TTransport for ChunkedTransport {
        fn is_open(&self) -> bool {
            true
        }
        fn open(&mut self) -> TransportResult<()> {
            Ok(())
        }
        fn close(&mut self) -> TransportResult<()> {
            Ok(())
        }
        fn read(&mut self, buf: &mut [u8]) -> TransportResult<usize> {
            let n = (self.data.len() - self.pos).min(buf.len()).min(self.chunk);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
        fn write(&mut self, buf: &[u8]) -> TransportResult<()> {
            self.data.extend_from_slice(buf);
            Ok(())
        }
        fn flush(&mut self) -> TransportResult<()> {
            Ok(())
        }
    }
}
