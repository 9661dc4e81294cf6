/*
 * This file is a part of a Thrift-compatible RPC runtime
 *
 * Layered configuration: built-in defaults, overridden by a YAML file,
 * overridden by `THRIFTD_*` environment variables, overridden by CLI flags.
 * Each source is parsed independently into a `Configset` (every field
 * optional; a bad value for a field is recorded on that source's
 * `ErrorStack` rather than aborting the whole source), then the sets are
 * overlaid onto the built-in default in ascending precedence. A source with
 * a malformed value for a field fails the whole merge, even if a
 * lower-precedence source had a well-formed value for that same field.
 */

use core::str::FromStr;
use std::env::VarError;
use std::fs;
use std::net::IpAddr;

mod cfgcli;
mod cfgenv;
mod cfgfile;
mod definitions;
mod feedback;
#[cfg(test)]
mod tests;

pub use cfgcli::Cli;
pub use definitions::*;
pub use feedback::ConfigError;
use feedback::{ErrorStack, WarningStack};

use clap::Parser;

type StaticStr = &'static str;

#[derive(Debug)]
/// The outcome of parsing one field from one configuration source.
pub enum ConfigSourceParseResult<T> {
    Okay(T),
    Absent,
    ParseFailure,
}

/// A source of configuration values: a field may be absent from it,
/// present and well-formed, or present and malformed.
pub trait TryFromConfigSource<T>: Sized {
    fn try_parse(self) -> ConfigSourceParseResult<T>;
}

impl<'a, T: FromStr> TryFromConfigSource<T> for Option<&'a str> {
    fn try_parse(self) -> ConfigSourceParseResult<T> {
        match self {
            Some(s) => s
                .parse()
                .map(ConfigSourceParseResult::Okay)
                .unwrap_or(ConfigSourceParseResult::ParseFailure),
            None => ConfigSourceParseResult::Absent,
        }
    }
}

impl<T: FromStr> TryFromConfigSource<T> for Result<String, VarError> {
    fn try_parse(self) -> ConfigSourceParseResult<T> {
        match self {
            Ok(s) => s
                .parse()
                .map(ConfigSourceParseResult::Okay)
                .unwrap_or(ConfigSourceParseResult::ParseFailure),
            Err(VarError::NotPresent) => ConfigSourceParseResult::Absent,
            Err(VarError::NotUnicode(_)) => ConfigSourceParseResult::ParseFailure,
        }
    }
}

fn try_set<T>(
    raw: impl TryFromConfigSource<T>,
    target: &mut Option<T>,
    estack: &mut ErrorStack,
    key: StaticStr,
    expected: StaticStr,
) {
    match raw.try_parse() {
        ConfigSourceParseResult::Okay(v) => *target = Some(v),
        ConfigSourceParseResult::ParseFailure => {
            estack.push(format!("bad value for `{}`, expected {}", key, expected))
        }
        ConfigSourceParseResult::Absent => {}
    }
}

/// Every field a single configuration source may contribute, each optional:
/// `None` means "this source is silent here", not "use the default".
#[derive(Debug)]
pub struct Configset {
    estack: ErrorStack,
    host: Option<IpAddr>,
    port: Option<u16>,
    protocol: Option<ProtocolKind>,
    transport: Option<TransportKind>,
    max_message_size: Option<usize>,
    send_timeout: Option<TimeoutSpec>,
    recv_timeout: Option<TimeoutSpec>,
    server_kind: Option<ServerKind>,
}

impl Configset {
    const EMSG_ENV: StaticStr = "environment";
    const EMSG_CLI: StaticStr = "CLI arguments";
    const EMSG_FILE: StaticStr = "configuration file";

    fn new(source: StaticStr) -> Self {
        Self {
            estack: ErrorStack::new(source),
            host: None,
            port: None,
            protocol: None,
            transport: None,
            max_message_size: None,
            send_timeout: None,
            recv_timeout: None,
            server_kind: None,
        }
    }
    pub fn new_env() -> Self {
        Self::new(Self::EMSG_ENV)
    }
    pub fn new_cli() -> Self {
        Self::new(Self::EMSG_CLI)
    }
    pub fn new_file() -> Self {
        Self::new(Self::EMSG_FILE)
    }
    pub fn is_okay(&self) -> bool {
        self.estack.is_empty()
    }

    pub fn server_net(
        &mut self,
        host: impl TryFromConfigSource<IpAddr>,
        host_key: StaticStr,
        port: impl TryFromConfigSource<u16>,
        port_key: StaticStr,
    ) {
        try_set(
            host,
            &mut self.host,
            &mut self.estack,
            host_key,
            "an IPv4/IPv6 address",
        );
        try_set(
            port,
            &mut self.port,
            &mut self.estack,
            port_key,
            "a 16-bit positive integer",
        );
    }
    pub fn protocol(&mut self, v: impl TryFromConfigSource<ProtocolKind>, key: StaticStr) {
        try_set(
            v,
            &mut self.protocol,
            &mut self.estack,
            key,
            "`json` or `simple-json`",
        );
    }
    pub fn transport(&mut self, v: impl TryFromConfigSource<TransportKind>, key: StaticStr) {
        try_set(
            v,
            &mut self.transport,
            &mut self.estack,
            key,
            "`framed` or `buffered`",
        );
    }
    pub fn max_message_size(&mut self, v: impl TryFromConfigSource<usize>, key: StaticStr) {
        try_set(
            v,
            &mut self.max_message_size,
            &mut self.estack,
            key,
            "a positive integer",
        );
    }
    pub fn server_kind(&mut self, v: impl TryFromConfigSource<ServerKind>, key: StaticStr) {
        try_set(
            v,
            &mut self.server_kind,
            &mut self.estack,
            key,
            "`simple` or `forking`",
        );
    }

    fn overlay_onto(&self, cfg: &mut ServerConfig) {
        if let Some(v) = self.host {
            cfg.host = v;
        }
        if let Some(v) = self.port {
            cfg.port = v;
        }
        if let Some(v) = self.protocol {
            cfg.protocol = v;
        }
        if let Some(v) = self.transport {
            cfg.transport = v;
        }
        if let Some(v) = self.max_message_size {
            cfg.max_message_size = v;
        }
        if let Some(v) = self.send_timeout {
            cfg.send_timeout = v;
        }
        if let Some(v) = self.recv_timeout {
            cfg.recv_timeout = v;
        }
        if let Some(v) = self.server_kind {
            cfg.server_kind = v;
        }
    }
}

/// A merged configuration plus any non-fatal warnings collected while
/// assembling it.
pub struct ConfigOutcome {
    pub config: ServerConfig,
    pub warnings: WarningStack,
}

impl ConfigOutcome {
    pub fn print_warnings(&self) {
        self.warnings.print_warnings()
    }
}

/// Overlay three already-parsed sources onto the built-in default, in
/// ascending precedence: `file`, then `env`, then `cli`.
pub fn resolve(
    file: Option<Configset>,
    env: Configset,
    cli: Configset,
) -> Result<ConfigOutcome, ConfigError> {
    // Highest-precedence errors win: a bad CLI flag is reported even when
    // the environment or file had a usable value for the same field.
    if !cli.is_okay() {
        return Err(cli.estack.into());
    }
    if !env.is_okay() {
        return Err(env.estack.into());
    }
    let mut cfg = ServerConfig::default();
    if let Some(file) = file {
        if !file.is_okay() {
            return Err(file.estack.into());
        }
        file.overlay_onto(&mut cfg);
    }
    env.overlay_onto(&mut cfg);
    cli.overlay_onto(&mut cfg);

    let mut wstack = WarningStack::new("configuration");
    if cfg.max_message_size < 1024 {
        wstack.push(format!(
            "max_message_size of {} bytes is unusually small; most struct headers alone exceed it",
            cfg.max_message_size
        ));
    }
    Ok(ConfigOutcome {
        config: cfg,
        warnings: wstack,
    })
}

/// The real entrypoint: parses `argv`, then (if `--config` was given) the
/// YAML file it names, then the process environment, and merges all three
/// with the built-in default.
pub fn get_config() -> Result<ConfigOutcome, ConfigError> {
    let cli_args = Cli::parse();
    let file_set = match cli_args.config.as_deref() {
        Some(path) => {
            let bytes = fs::read(path)?;
            let file_cfg: cfgfile::Config = serde_yaml::from_slice(&bytes)?;
            Some(cfgfile::into_configset(file_cfg))
        }
        None => None,
    };
    let env_set = cfgenv::parse_env_config();
    let cli_set = cfgcli::parse_cli_args(&cli_args);
    resolve(file_set, env_set, cli_set)
}
