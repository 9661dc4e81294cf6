/*
 * This file is a part of a Thrift-compatible RPC runtime
 *
 * The server layer: a processor contract plus two accept-loop
 * implementations (single-threaded, and one-process-per-connection) over
 * the transport/protocol stack built elsewhere in this crate.
 */

pub mod failure_oracle;
pub mod processor;
pub mod simple_server;

#[cfg(unix)]
pub mod forking_server;

pub use failure_oracle::{FailureOracle, InMemoryFailureOracle, NoFailureOracle};
pub use processor::{ApplicationHandler, TProcessor};
pub use simple_server::TSimpleServer;

#[cfg(unix)]
pub use forking_server::TForkingServer;
