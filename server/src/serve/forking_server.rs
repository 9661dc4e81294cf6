/*
 * This file is a part of a Thrift-compatible RPC runtime
 *
 * The forking server: same accept loop as `TSimpleServer`, but each accepted
 * connection runs in its own forked child process. Grounded on the accept
 * loop in `dbnet/listener.rs`; the fork/reap mechanics are new (the teacher
 * runs every connection on its tokio runtime instead), built on this crate's
 * existing `cfg(unix)` `libc` dependency.
 */

#![cfg(unix)]

use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::processor::TProcessor;
use crate::error::RpcError;
use crate::protocol::{TInputProtocol, TOutputProtocol};
use crate::transport::socket::{TServerSocket, TSocket};
use crate::transport::TransportResult;

type InputFactory = dyn Fn(TSocket) -> TransportResult<Box<dyn TInputProtocol>>;
type OutputFactory = dyn Fn(TSocket) -> TransportResult<Box<dyn TOutputProtocol>>;

pub struct TForkingServer<P> {
    listener: TServerSocket,
    processor: Arc<P>,
    build_input: Arc<InputFactory>,
    build_output: Arc<OutputFactory>,
    stopped: Arc<AtomicBool>,
    children: Vec<libc::pid_t>,
}

impl<P: TProcessor> TForkingServer<P> {
    pub fn new(
        listener: TServerSocket,
        processor: P,
        build_input: impl Fn(TSocket) -> TransportResult<Box<dyn TInputProtocol>> + 'static,
        build_output: impl Fn(TSocket) -> TransportResult<Box<dyn TOutputProtocol>> + 'static,
    ) -> Self {
        Self {
            listener,
            processor: Arc::new(processor),
            build_input: Arc::new(build_input),
            build_output: Arc::new(build_output),
            stopped: Arc::new(AtomicBool::new(false)),
            children: Vec::new(),
        }
    }

    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stopped.clone()
    }

    pub fn serve(&mut self) -> TransportResult<()> {
        let addr = self.listener.local_addr()?;
        log::info!("forking server listening on {}", addr);
        loop {
            self.reap_finished_children();
            if self.stopped.load(Ordering::Relaxed) {
                log::info!("forking server stopping");
                return Ok(());
            }
            let conn = match self.listener.accept() {
                Ok(c) => c,
                Err(e) => {
                    log::error!("accept failed: {}", e);
                    continue;
                }
            };
            self.fork_child(conn);
        }
    }

    fn fork_child(&mut self, conn: TSocket) {
        // SAFETY: fork() is called with no other threads expected to hold
        // locks this process depends on across the fork boundary; the child
        // only ever touches `conn`, the processor, and the protocol factories.
        let pid = unsafe { libc::fork() };
        match pid {
            -1 => {
                log::error!("fork failed: {}", std::io::Error::last_os_error());
            }
            0 => {
                // child
                handle_connection(&*self.processor, &*self.build_input, &*self.build_output, conn);
                process::exit(0);
            }
            child_pid => {
                // parent: drop our copy of the connection, track the child
                drop(conn);
                self.children.push(child_pid);
            }
        }
    }

    fn reap_finished_children(&mut self) {
        self.children.retain(|&pid| {
            let mut status = 0i32;
            // WNOHANG: never block the accept loop waiting on a child
            let res = unsafe { libc::waitpid(pid, &mut status, libc::WNOHANG) };
            res == 0
        });
    }
}

fn handle_connection(
    processor: &dyn TProcessor,
    build_input: &InputFactory,
    build_output: &OutputFactory,
    conn: TSocket,
) {
    let peer = conn.peer_addr();
    log::info!("accepted connection from {:?} (pid {})", peer, process::id());
    let reader = match conn.try_clone() {
        Ok(c) => c,
        Err(e) => {
            log::error!("failed to clone connection from {:?}: {}", peer, e);
            return;
        }
    };
    let (mut input, mut output) = match (build_input(reader), build_output(conn)) {
        (Ok(i), Ok(o)) => (i, o),
        (Err(e), _) | (_, Err(e)) => {
            log::error!("failed to build protocol stack for {:?}: {}", peer, e);
            return;
        }
    };
    loop {
        match processor.process(&mut *input, &mut *output) {
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
