/*
 * This file is a part of a Thrift-compatible RPC runtime
 *
 * End-to-end coverage of the layered merge: default < file < env < CLI.
 */

use super::cfgfile::{Config as FileConfig, ConfigKeyLimits};
use super::{resolve, Configset, ProtocolKind, ServerKind, TransportKind};

fn file_with_max_message_size(n: usize) -> Configset {
    let cfg = FileConfig {
        net: None,
        limits: Some(ConfigKeyLimits {
            max_message_size: Some(n),
            send_timeout_secs: None,
            send_timeout_micros: None,
            recv_timeout_secs: None,
            recv_timeout_micros: None,
        }),
    };
    super::cfgfile::into_configset(cfg)
}

#[test]
fn cli_wins_over_env_and_file() {
    let file = file_with_max_message_size(1000);
    let mut env = Configset::new_env();
    env.max_message_size(Some("2000"), "THRIFTD_MAX_MESSAGE_SIZE");
    let mut cli = Configset::new_cli();
    cli.max_message_size(Some("3000"), "--max-message-size");

    let outcome = resolve(Some(file), env, cli).unwrap();
    assert_eq!(outcome.config.max_message_size, 3000);
}

#[test]
fn env_wins_over_file_when_cli_absent() {
    let file = file_with_max_message_size(1000);
    let mut env = Configset::new_env();
    env.max_message_size(Some("2000"), "THRIFTD_MAX_MESSAGE_SIZE");
    let cli = Configset::new_cli();

    let outcome = resolve(Some(file), env, cli).unwrap();
    assert_eq!(outcome.config.max_message_size, 2000);
}

#[test]
fn file_wins_over_default_when_env_and_cli_absent() {
    let file = file_with_max_message_size(1000);
    let outcome = resolve(Some(file), Configset::new_env(), Configset::new_cli()).unwrap();
    assert_eq!(outcome.config.max_message_size, 1000);
}

#[test]
fn default_applies_when_no_source_sets_the_field() {
    let outcome = resolve(None, Configset::new_env(), Configset::new_cli()).unwrap();
    assert_eq!(
        outcome.config.max_message_size,
        super::DEFAULT_MAX_MESSAGE_SIZE
    );
}

#[test]
fn malformed_cli_value_fails_even_if_file_is_valid() {
    let file = file_with_max_message_size(1000);
    let mut cli = Configset::new_cli();
    cli.max_message_size(Some("not-a-number"), "--max-message-size");

    let result = resolve(Some(file), Configset::new_env(), cli);
    assert!(result.is_err());
}

#[test]
fn protocol_and_server_kind_round_trip_through_env() {
    let mut env = Configset::new_env();
    env.protocol(Some("simple-json"), "THRIFTD_PROTOCOL");
    env.server_kind(Some("forking"), "THRIFTD_SERVER");
    let outcome = resolve(None, env, Configset::new_cli()).unwrap();
    assert_eq!(outcome.config.protocol, ProtocolKind::SimpleJson);
    assert_eq!(outcome.config.server_kind, ServerKind::Forking);
    // untouched field keeps the default
    assert_eq!(outcome.config.transport, TransportKind::default());
}
