/*
 * This file is a part of a Thrift-compatible RPC runtime
 */

//! # thriftd
//!
//! The server binary: resolves configuration from defaults/file/env/CLI,
//! builds the transport + protocol stack the configuration names, and runs
//! one of the two accept-loop implementations until asked to stop.

mod config;
mod error;
mod protocol;
mod serve;
mod transport;

#[cfg(test)]
mod tests;

use std::fs;
use std::path;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use config::{ProtocolKind, ServerConfig, ServerKind, TransportKind};
use libsky::{URL, VERSION};
use protocol::json::{TJsonInputProtocol, TJsonOutputProtocol};
use protocol::simple_json::TSimpleJsonProtocol;
use protocol::{TInputProtocol, TOutputProtocol};
use serve::{ApplicationHandler, TSimpleServer};
use transport::buffered::TBufferedTransport;
use transport::framed::TFramedTransport;
use transport::socket::{TServerSocket, TSocket};
use transport::{TimeoutSpec as TransportTimeoutSpec, TransportConfiguration, TransportResult};

#[cfg(not(target_env = "msvc"))]
use jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

const PID_PATH: &str = ".thriftd_pid";

static STOP: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
extern "C" fn handle_sigint(_sig: libc::c_int) {
    STOP.store(true, Ordering::SeqCst);
}

fn main() {
    env_logger::Builder::new()
        .parse_filters(&std::env::var("THRIFTD_LOG").unwrap_or_else(|_| "info".to_owned()))
        .init();

    let pid_file = run_pre_startup_tasks();

    let outcome = match config::get_config() {
        Ok(outcome) => outcome,
        Err(e) => {
            log::error!("{}", e);
            process::exit(0x100);
        }
    };
    outcome.print_warnings();
    println!("thriftd v{} | {}", VERSION, URL);

    install_sigint_handler();

    let result = run_server(&outcome.config);

    drop(pid_file);
    if let Err(e) = fs::remove_file(PID_PATH) {
        log::error!("shutdown failure: failed to remove pid file: {}", e);
        process::exit(0x100);
    }
    if let Err(e) = result {
        log::error!("server exited with error: {}", e);
        process::exit(0x100);
    }
    log::info!("goodbye");
}

#[cfg(unix)]
fn install_sigint_handler() {
    // SAFETY: `handle_sigint` only touches a static `AtomicBool` and is
    // async-signal-safe; no allocation or locking happens in the handler.
    unsafe {
        libc::signal(libc::SIGINT, handle_sigint as libc::sighandler_t);
        libc::signal(libc::SIGTERM, handle_sigint as libc::sighandler_t);
    }
}

#[cfg(not(unix))]
fn install_sigint_handler() {
    log::warn!("signal-driven shutdown is only wired up on unix; stop the process to exit");
}

/// Builds the per-connection input-side factory: always JSON, the only
/// protocol in this crate with a reader, framed or buffered per configuration.
fn build_input(
    max_message_size: usize,
    transport_kind: TransportKind,
    send_timeout: TransportTimeoutSpec,
    recv_timeout: TransportTimeoutSpec,
) -> impl Fn(TSocket) -> TransportResult<Box<dyn TInputProtocol>> {
    move |mut sock: TSocket| -> TransportResult<Box<dyn TInputProtocol>> {
        sock.set_timeouts(send_timeout, recv_timeout)?;
        match transport_kind {
            TransportKind::Framed => {
                let cfg = TransportConfiguration::new(max_message_size as u64);
                Ok(Box::new(TJsonInputProtocol::new(TFramedTransport::with_config(sock, cfg))))
            }
            TransportKind::Buffered => Ok(Box::new(TJsonInputProtocol::new(TBufferedTransport::new(sock)))),
        }
    }
}

/// Builds the per-connection output-side factory: JSON or SimpleJSON (the
/// latter write-only, matching its role as a reply-rendering format rather
/// than a full round-trip protocol) over the configured transport.
fn build_output(
    max_message_size: usize,
    transport_kind: TransportKind,
    protocol_kind: ProtocolKind,
    send_timeout: TransportTimeoutSpec,
    recv_timeout: TransportTimeoutSpec,
) -> impl Fn(TSocket) -> TransportResult<Box<dyn TOutputProtocol>> {
    move |mut sock: TSocket| -> TransportResult<Box<dyn TOutputProtocol>> {
        sock.set_timeouts(send_timeout, recv_timeout)?;
        match (transport_kind, protocol_kind) {
            (TransportKind::Framed, ProtocolKind::Json) => {
                let cfg = TransportConfiguration::new(max_message_size as u64);
                Ok(Box::new(TJsonOutputProtocol::new(TFramedTransport::with_config(sock, cfg))))
            }
            (TransportKind::Framed, ProtocolKind::SimpleJson) => {
                let cfg = TransportConfiguration::new(max_message_size as u64);
                Ok(Box::new(TSimpleJsonProtocol::new(TFramedTransport::with_config(sock, cfg))))
            }
            (TransportKind::Buffered, ProtocolKind::Json) => {
                Ok(Box::new(TJsonOutputProtocol::new(TBufferedTransport::new(sock))))
            }
            (TransportKind::Buffered, ProtocolKind::SimpleJson) => {
                Ok(Box::new(TSimpleJsonProtocol::new(TBufferedTransport::new(sock))))
            }
        }
    }
}

/// The one handler this binary ships out of the box: a `ping` method that
/// takes no arguments and returns nothing, useful for liveness checks and as
/// a template for generated processors.
fn default_handler() -> ApplicationHandler {
    let mut handler = ApplicationHandler::new();
    handler.register("ping", |seqid, input, output| {
        use protocol::{skip, TMessageIdentifier, TMessageType, TType};
        input.read_struct_begin()?;
        loop {
            let field = input.read_field_begin()?;
            if field.field_type == TType::Stop {
                break;
            }
            skip(input, field.field_type)?;
            input.read_field_end()?;
        }
        input.read_struct_end()?;
        input.read_message_end()?;
        output.write_message_begin(&TMessageIdentifier::new("ping", TMessageType::Reply, seqid))?;
        output.write_struct_begin("pingResult")?;
        output.write_field_stop()?;
        output.write_struct_end()?;
        output.write_message_end()?;
        output.flush()?;
        Ok(())
    });
    handler
}

fn run_server(cfg: &ServerConfig) -> TransportResult<()> {
    let listener = TServerSocket::bind((cfg.host, cfg.port))?;

    let send_timeout = TransportTimeoutSpec::new(cfg.send_timeout.secs, cfg.send_timeout.micros as u32);
    let recv_timeout = TransportTimeoutSpec::new(cfg.recv_timeout.secs, cfg.recv_timeout.micros as u32);

    let in_factory = build_input(cfg.max_message_size, cfg.transport, send_timeout, recv_timeout);
    let out_factory = build_output(
        cfg.max_message_size,
        cfg.transport,
        cfg.protocol,
        send_timeout,
        recv_timeout,
    );

    match cfg.server_kind {
        ServerKind::Simple => {
            let server = TSimpleServer::new(listener, default_handler(), in_factory, out_factory);
            let stop = server.stop_handle();
            spawn_stop_watcher(stop);
            server.serve()
        }
        ServerKind::Forking => run_forking(listener, in_factory, out_factory),
    }
}

#[cfg(unix)]
fn run_forking(
    listener: TServerSocket,
    in_factory: impl Fn(TSocket) -> TransportResult<Box<dyn TInputProtocol>> + 'static,
    out_factory: impl Fn(TSocket) -> TransportResult<Box<dyn TOutputProtocol>> + 'static,
) -> TransportResult<()> {
    let mut server = serve::TForkingServer::new(listener, default_handler(), in_factory, out_factory);
    let stop = server.stop_handle();
    spawn_stop_watcher(stop);
    server.serve()
}

#[cfg(not(unix))]
fn run_forking(
    _listener: TServerSocket,
    _in_factory: impl Fn(TSocket) -> TransportResult<Box<dyn TInputProtocol>> + 'static,
    _out_factory: impl Fn(TSocket) -> TransportResult<Box<dyn TOutputProtocol>> + 'static,
) -> TransportResult<()> {
    log::error!("the forking server is only available on unix");
    process::exit(0x100);
}

/// Bridges the process-wide `SIGINT`/`SIGTERM` flag to a server's own
/// `stop_handle`, polling at a coarse interval since the accept loop only
/// observes its flag between connections.
fn spawn_stop_watcher(stop: Arc<AtomicBool>) {
    std::thread::spawn(move || loop {
        if STOP.load(Ordering::SeqCst) {
            stop.store(true, Ordering::SeqCst);
            return;
        }
        std::thread::sleep(std::time::Duration::from_millis(200));
    });
}

/// Refuses to start if another instance already owns the data directory
/// (detected via a pid file left behind by a previous run), mirroring the
/// teacher's single-instance guard.
fn run_pre_startup_tasks() -> fs::File {
    use std::io::Write;

    let path = path::Path::new(PID_PATH);
    if path.exists() {
        let pid = fs::read_to_string(path).unwrap_or_else(|_| "unknown".to_owned());
        log::error!(
            "startup failure: another process with pid {} appears to be running",
            pid
        );
        process::exit(0x100);
    }
    let mut file = match fs::OpenOptions::new().create(true).write(true).truncate(true).open(path) {
        Ok(f) => f,
        Err(e) => {
            log::error!("startup failure: failed to open pid file: {}", e);
            process::exit(0x100);
        }
    };
    if let Err(e) = file.write_all(process::id().to_string().as_bytes()) {
        log::error!("startup failure: failed to write pid file: {}", e);
        process::exit(0x100);
    }
    file
}
