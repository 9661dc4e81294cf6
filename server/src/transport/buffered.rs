/*
 * TBufferedTransport: fixed-capacity read/write buffers in front of another
 * transport, coalescing small writes and topping reads up from the
 * underlying stream in larger chunks. Grounded on the read-ahead buffer in
 * `dbnet/connection.rs`'s `BufWriter`-wrapped stream handling.
 */

use super::{TTransport, TTransportFactory, TransportResult};

const DEFAULT_CAPACITY: usize = 4096;

pub struct TBufferedTransport<T> {
    inner: T,
    capacity: usize,
    read_buf: Vec<u8>,
    read_pos: usize,
    write_buf: Vec<u8>,
}

impl<T: TTransport> TBufferedTransport<T> {
    pub fn new(inner: T) -> Self {
        Self::with_capacity(inner, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(inner: T, capacity: usize) -> Self {
        Self {
            inner,
            capacity,
            read_buf: Vec::new(),
            read_pos: 0,
            write_buf: Vec::with_capacity(capacity),
        }
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    fn read_buf_remaining(&self) -> usize {
        self.read_buf.len() - self.read_pos
    }

    fn top_up(&mut self) -> TransportResult<()> {
        let mut chunk = vec![0u8; self.capacity];
        let n = self.inner.read(&mut chunk)?;
        chunk.truncate(n);
        self.read_buf = chunk;
        self.read_pos = 0;
        Ok(())
    }
}

impl<T: TTransport> TTransport for TBufferedTransport<T> {
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
        if self.read_buf_remaining() == 0 {
            self.top_up()?;
        }
        let n = self.read_buf_remaining().min(buf.len());
        buf[..n].copy_from_slice(&self.read_buf[self.read_pos..self.read_pos + n]);
        self.read_pos += n;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> TransportResult<()> {
        if self.write_buf.len() + buf.len() > self.capacity {
            self.flush()?;
        }
        if buf.len() >= self.capacity {
            self.inner.write(buf)?;
        } else {
            self.write_buf.extend_from_slice(buf);
        }
        Ok(())
    }

    fn flush(&mut self) -> TransportResult<()> {
        if !self.write_buf.is_empty() {
            let chunk = std::mem::take(&mut self.write_buf);
            self.inner.write(&chunk)?;
        }
        self.inner.flush()
    }
}

pub struct TBufferedTransportFactory {
    pub capacity: usize,
}

impl TBufferedTransportFactory {
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }
}

impl Default for TBufferedTransportFactory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl<T: TTransport> TTransportFactory for TBufferedTransportFactory {
    type Inner = T;
    type Output = TBufferedTransport<T>;

    fn get_transport(&self, inner: T) -> TransportResult<TBufferedTransport<T>> {
        Ok(TBufferedTransport::with_capacity(inner, self.capacity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mem::TMemoryBuffer;

    #[test]
    fn small_writes_coalesce_until_flush() {
        let mem = TMemoryBuffer::new();
        let mut buffered = TBufferedTransport::with_capacity(mem, 64);
        buffered.write(b"a").unwrap();
        buffered.write(b"b").unwrap();
        assert!(buffered.inner.written().is_empty());
        buffered.flush().unwrap();
        assert_eq!(buffered.inner.written(), b"ab");
    }

    #[test]
    fn write_larger_than_capacity_flushes_through() {
        let mem = TMemoryBuffer::new();
        let mut buffered = TBufferedTransport::with_capacity(mem, 4);
        buffered.write(b"0123456789").unwrap();
        assert_eq!(buffered.inner.written(), b"0123456789");
    }

    #[test]
    fn reads_top_up_from_underlying_transport() {
        let mem = TMemoryBuffer::with_data(b"hello world".to_vec());
        let mut buffered = TBufferedTransport::with_capacity(mem, 4);
        let mut out = [0u8; 4];
        buffered.read_all(&mut out).unwrap();
        assert_eq!(&out, b"hell");
        let mut out2 = [0u8; 4];
        buffered.read_all(&mut out2).unwrap();
        assert_eq!(&out2, b"o wo");
    }
}
