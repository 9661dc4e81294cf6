/*
 * This file is a part of a Thrift-compatible RPC runtime
 *
 * The single-threaded accept loop: bind once, then serve connections one at
 * a time. Grounded on `dbnet/listener.rs`'s accept-loop shape, reworked from
 * tokio's async accept future to a blocking `std::net` loop per this
 * runtime's single-threaded-per-connection concurrency model.
 */

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::processor::TProcessor;
use crate::error::RpcError;
use crate::protocol::{TInputProtocol, TOutputProtocol};
use crate::transport::socket::{TServerSocket, TSocket};
use crate::transport::TransportResult;

type InputFactory = dyn Fn(TSocket) -> TransportResult<Box<dyn TInputProtocol>>;
type OutputFactory = dyn Fn(TSocket) -> TransportResult<Box<dyn TOutputProtocol>>;

/// Binds a listening socket and serves one connection at a time to
/// completion before accepting the next. `stop()` requests the accept loop
/// exit at its next iteration; because `accept` blocks, the request only
/// takes effect once the next connection (or a spurious wakeup) arrives.
pub struct TSimpleServer<P> {
    listener: TServerSocket,
    processor: P,
    build_input: Box<InputFactory>,
    build_output: Box<OutputFactory>,
    stopped: Arc<AtomicBool>,
}

impl<P: TProcessor> TSimpleServer<P> {
    pub fn new(
        listener: TServerSocket,
        processor: P,
        build_input: impl Fn(TSocket) -> TransportResult<Box<dyn TInputProtocol>> + 'static,
        build_output: impl Fn(TSocket) -> TransportResult<Box<dyn TOutputProtocol>> + 'static,
    ) -> Self {
        Self {
            listener,
            processor,
            build_input: Box::new(build_input),
            build_output: Box::new(build_output),
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A handle callers can flip from another thread (e.g. a signal handler)
    /// to request shutdown.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stopped.clone()
    }

    pub fn serve(&self) -> TransportResult<()> {
        let addr = self.listener.local_addr()?;
        log::info!("listening on {}", addr);
        loop {
            if self.stopped.load(Ordering::Relaxed) {
                log::info!("server stopping");
                return Ok(());
            }
            match self.listener.accept() {
                Ok(conn) => self.handle_connection(conn),
                Err(e) => log::error!("accept failed: {}", e),
            }
        }
    }

    fn handle_connection(&self, conn: TSocket) {
        let peer = conn.peer_addr();
        log::info!("accepted connection from {:?}", peer);
        let reader = match conn.try_clone() {
            Ok(c) => c,
            Err(e) => {
                log::error!("failed to clone connection from {:?}: {}", peer, e);
                return;
            }
        };
        let (mut input, mut output) = match ((self.build_input)(reader), (self.build_output)(conn))
        {
            (Ok(i), Ok(o)) => (i, o),
            (Err(e), _) | (_, Err(e)) => {
                log::error!("failed to build protocol stack for {:?}: {}", peer, e);
                return;
            }
        };
        loop {
            match self.processor.process(&mut *input, &mut *output) {
                Ok(true) => continue,
                Ok(false) => {
                    log::info!("connection from {:?} closed by processor", peer);
                    break;
                }
                Err(RpcError::Transport(e)) => {
                    log::warn!("transport error on connection from {:?}: {}", peer, e);
                    break;
                }
                Err(e) => {
                    log::error!("fatal error handling connection from {:?}: {}", peer, e);
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::json::{TJsonInputProtocol, TJsonOutputProtocol};
    use crate::serve::processor::ApplicationHandler;
    use crate::transport::buffered::TBufferedTransport;
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::thread;

    #[test]
    fn simple_server_answers_a_ping_over_tcp() {
        let listener = TServerSocket::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let mut handler = ApplicationHandler::new();
        handler.register("ping", |seqid, input, output| {
            input.read_struct_begin()?;
            loop {
                let f = input.read_field_begin()?;
                if f.field_type == crate::protocol::TType::Stop {
                    break;
                }
                crate::protocol::skip(input, f.field_type)?;
                input.read_field_end()?;
            }
            input.read_struct_end()?;
            input.read_message_end()?;
            output.write_message_begin(&crate::protocol::TMessageIdentifier::new(
                "ping",
                crate::protocol::TMessageType::Reply,
                seqid,
            ))?;
            output.write_struct_begin("pingResult")?;
            output.write_field_stop()?;
            output.write_struct_end()?;
            output.write_message_end()?;
            output.flush()?;
            Ok(())
        });

        let server = TSimpleServer::new(
            listener,
            handler,
            |t| Ok(Box::new(TJsonInputProtocol::new(TBufferedTransport::new(t)))),
            |t| Ok(Box::new(TJsonOutputProtocol::new(TBufferedTransport::new(t)))),
        );
        let stop = server.stop_handle();
        let server_thread = thread::spawn(move || {
            let _ = server.serve();
        });

        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(b"[1,\"ping\",1,9,{}]").unwrap();
        let mut buf = vec![0u8; 64];
        let n = stream.read(&mut buf).unwrap();
        let reply = String::from_utf8(buf[..n].to_vec()).unwrap();
        assert_eq!(reply, "[1,\"ping\",2,9,{}]");

        stop.store(true, Ordering::Relaxed);
        drop(stream);
        let _ = TcpStream::connect(addr); // wake the blocked accept() so the loop observes `stopped`
        server_thread.join().unwrap();
    }
}
