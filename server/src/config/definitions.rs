/*
 * This file is a part of a Thrift-compatible RPC runtime
 *
 * The configuration value types: what can be bound, which protocol/transport
 * pair a connection speaks, how large a message may be, and which accept-loop
 * strategy the server runs.
 */

use core::str::FromStr;
use std::net::IpAddr;

pub const DEFAULT_IPV4: IpAddr = IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1));
pub const DEFAULT_PORT: u16 = 9090;
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;
pub const DEFAULT_TIMEOUT: (u64, u64) = (0, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolKind {
    Json,
    SimpleJson,
}

impl ProtocolKind {
    pub const fn default() -> Self {
        Self::Json
    }
}

impl FromStr for ProtocolKind {
    type Err = &'static str;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "simple-json" => Ok(Self::SimpleJson),
            _ => Err("expected one of `json`, `simple-json`"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Framed,
    Buffered,
}

impl TransportKind {
    pub const fn default() -> Self {
        Self::Buffered
    }
}

impl FromStr for TransportKind {
    type Err = &'static str;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "framed" => Ok(Self::Framed),
            "buffered" => Ok(Self::Buffered),
            _ => Err("expected one of `framed`, `buffered`"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerKind {
    Simple,
    Forking,
}

impl ServerKind {
    pub const fn default() -> Self {
        Self::Simple
    }
}

impl FromStr for ServerKind {
    type Err = &'static str;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(Self::Simple),
            "forking" => Ok(Self::Forking),
            _ => Err("expected one of `simple`, `forking`"),
        }
    }
}

/// A duration expressed the way this crate's transport timeouts are: whole
/// seconds plus a microsecond remainder, matching `TSocket::set_timeouts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutSpec {
    pub secs: u64,
    pub micros: u64,
}

impl TimeoutSpec {
    pub const fn new(secs: u64, micros: u64) -> Self {
        Self { secs, micros }
    }
    pub const fn zero() -> Self {
        Self::new(0, 0)
    }
    pub fn is_zero(&self) -> bool {
        self.secs == 0 && self.micros == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub protocol: ProtocolKind,
    pub transport: TransportKind,
    pub max_message_size: usize,
    pub send_timeout: TimeoutSpec,
    pub recv_timeout: TimeoutSpec,
    pub server_kind: ServerKind,
}

impl ServerConfig {
    pub const fn default() -> Self {
        Self {
            host: DEFAULT_IPV4,
            port: DEFAULT_PORT,
            protocol: ProtocolKind::default(),
            transport: TransportKind::default(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            send_timeout: TimeoutSpec::zero(),
            recv_timeout: TimeoutSpec::zero(),
            server_kind: ServerKind::default(),
        }
    }
}
