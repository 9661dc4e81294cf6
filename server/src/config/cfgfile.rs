/*
 * This file is a part of a Thrift-compatible RPC runtime
 *
 * YAML config file shape: an object representation for `serde_yaml` to
 * deserialize into, under the `net:`/`limits:` sections the CLI/env
 * surface mirrors.
 */

use super::{Configset, TimeoutSpec};
use serde::Deserialize;
use std::net::IpAddr;

#[derive(Deserialize, Debug, PartialEq, Default)]
pub struct Config {
    pub net: Option<ConfigKeyNet>,
    pub limits: Option<ConfigKeyLimits>,
}

/// Converts a parsed YAML document into a `Configset`: host/port/limits are
/// already natively typed by serde, the enum-valued keys still need
/// `FromStr` validation the same way a CLI flag or env var would.
pub(super) fn into_configset(file: Config) -> Configset {
    let mut set = Configset::new_file();
    if let Some(net) = file.net {
        set.host = net.host;
        set.port = net.port;
        set.protocol(net.protocol.as_deref(), "net.protocol");
        set.transport(net.transport.as_deref(), "net.transport");
        set.server_kind(net.server.as_deref(), "net.server");
    }
    if let Some(limits) = file.limits {
        set.max_message_size = limits.max_message_size;
        if limits.send_timeout_secs.is_some() || limits.send_timeout_micros.is_some() {
            set.send_timeout = Some(TimeoutSpec::new(
                limits.send_timeout_secs.unwrap_or(0),
                limits.send_timeout_micros.unwrap_or(0),
            ));
        }
        if limits.recv_timeout_secs.is_some() || limits.recv_timeout_micros.is_some() {
            set.recv_timeout = Some(TimeoutSpec::new(
                limits.recv_timeout_secs.unwrap_or(0),
                limits.recv_timeout_micros.unwrap_or(0),
            ));
        }
    }
    set
}

#[derive(Deserialize, Debug, PartialEq)]
pub struct ConfigKeyNet {
    pub host: Option<IpAddr>,
    pub port: Option<u16>,
    pub protocol: Option<String>,
    pub transport: Option<String>,
    pub server: Option<String>,
}

#[derive(Deserialize, Debug, PartialEq)]
pub struct ConfigKeyLimits {
    pub max_message_size: Option<usize>,
    pub send_timeout_secs: Option<u64>,
    pub send_timeout_micros: Option<u64>,
    pub recv_timeout_secs: Option<u64>,
    pub recv_timeout_micros: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_net_and_limits_sections() {
        let yaml = "\
net:
  host: 0.0.0.0
  port: 9191
  protocol: simple-json
limits:
  max_message_size: 1000
";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        let net = cfg.net.unwrap();
        assert_eq!(net.host, Some("0.0.0.0".parse().unwrap()));
        assert_eq!(net.port, Some(9191));
        assert_eq!(net.protocol.as_deref(), Some("simple-json"));
        assert_eq!(cfg.limits.unwrap().max_message_size, Some(1000));
    }

    #[test]
    fn empty_document_parses_to_all_none() {
        let cfg: Config = serde_yaml::from_str("{}").unwrap();
        assert!(cfg.net.is_none());
        assert!(cfg.limits.is_none());
    }

    #[test]
    fn into_configset_carries_max_message_size() {
        let cfg: Config = serde_yaml::from_str("limits:\n  max_message_size: 1000\n").unwrap();
        let set = into_configset(cfg);
        assert!(set.is_okay());
        assert_eq!(set.max_message_size, Some(1000));
    }

    #[test]
    fn into_configset_reports_bad_protocol_name() {
        let cfg: Config = serde_yaml::from_str("net:\n  protocol: xml\n").unwrap();
        let set = into_configset(cfg);
        assert!(!set.is_okay());
    }
}
