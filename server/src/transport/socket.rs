/*
 * TSocket / TTcpListener: a blocking std::net byte transport with
 * configurable send/receive timeouts. Grounded on `dbnet/tcp.rs`'s
 * accept-a-stream-and-wrap-it shape, reworked from tokio's async socket to
 * std::net blocking I/O per this runtime's single-threaded-per-connection
 * concurrency model.
 */

use super::{TTransport, TransportResult, TimeoutSpec};
use crate::error::TTransportException;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream, ToSocketAddrs};

pub struct TSocket {
    stream: TcpStream,
    open: bool,
}

impl TSocket {
    pub fn connect<A: ToSocketAddrs>(addr: A) -> TransportResult<Self> {
        let stream = TcpStream::connect(addr).map_err(TTransportException::from)?;
        Ok(Self::from_stream(stream))
    }

    pub fn from_stream(stream: TcpStream) -> Self {
        Self { stream, open: true }
    }

    pub fn set_timeouts(&mut self, send: TimeoutSpec, recv: TimeoutSpec) -> TransportResult<()> {
        self.stream
            .set_write_timeout(send.as_duration())
            .map_err(TTransportException::from)?;
        self.stream
            .set_read_timeout(recv.as_duration())
            .map_err(TTransportException::from)?;
        Ok(())
    }

    pub fn peer_addr(&self) -> Option<std::net::SocketAddr> {
        self.stream.peer_addr().ok()
    }

    /// A second handle onto the same underlying stream, so a connection can
    /// hand out independent read-side and write-side transports to its input
    /// and output protocols.
    pub fn try_clone(&self) -> TransportResult<Self> {
        Ok(Self {
            stream: self.stream.try_clone().map_err(TTransportException::from)?,
            open: self.open,
        })
    }
}

impl TTransport for TSocket {
    fn is_open(&self) -> bool {
        self.open
    }

    fn open(&mut self) -> TransportResult<()> {
        self.open = true;
        Ok(())
    }

    fn close(&mut self) -> TransportResult<()> {
        self.open = false;
        let _ = self.stream.shutdown(std::net::Shutdown::Both);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> TransportResult<usize> {
        if !self.open {
            return Err(super::not_open());
        }
        self.stream.read(buf).map_err(TTransportException::from)
    }

    fn write(&mut self, buf: &[u8]) -> TransportResult<()> {
        if !self.open {
            return Err(super::not_open());
        }
        self.stream
            .write_all(buf)
            .map_err(TTransportException::from)
    }

    fn flush(&mut self) -> TransportResult<()> {
        self.stream.flush().map_err(TTransportException::from)
    }
}

/// A listening transport: binds a TCP port and hands back a [`TSocket`] per
/// accepted connection. The server loop (`serve::simple`/`serve::forking`)
/// drives this directly; it is not itself a [`TTransport`].
pub struct TServerSocket {
    listener: TcpListener,
}

impl TServerSocket {
    pub fn bind<A: ToSocketAddrs>(addr: A) -> TransportResult<Self> {
        let listener = TcpListener::bind(addr).map_err(TTransportException::from)?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> TransportResult<std::net::SocketAddr> {
        self.listener.local_addr().map_err(TTransportException::from)
    }

    pub fn accept(&self) -> TransportResult<TSocket> {
        let (stream, _addr) = self.listener.accept().map_err(TTransportException::from)?;
        Ok(TSocket::from_stream(stream))
    }

    pub fn try_clone(&self) -> TransportResult<Self> {
        Ok(Self {
            listener: self.listener.try_clone().map_err(TTransportException::from)?,
        })
    }
}
