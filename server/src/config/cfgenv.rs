/*
 * This file is a part of a Thrift-compatible RPC runtime
 *
 * Reads the `THRIFTD_*` environment variables into a `Configset`, using the
 * same `TryFromConfigSource` scalar-parse idiom the file and CLI sources use.
 */

use super::Configset;
use std::env;

pub(super) fn parse_env_config() -> Configset {
    let mut set = Configset::new_env();
    set.server_net(
        env::var("THRIFTD_HOST"),
        "THRIFTD_HOST",
        env::var("THRIFTD_PORT"),
        "THRIFTD_PORT",
    );
    set.protocol(env::var("THRIFTD_PROTOCOL"), "THRIFTD_PROTOCOL");
    set.transport(env::var("THRIFTD_TRANSPORT"), "THRIFTD_TRANSPORT");
    set.max_message_size(
        env::var("THRIFTD_MAX_MESSAGE_SIZE"),
        "THRIFTD_MAX_MESSAGE_SIZE",
    );
    set.server_kind(env::var("THRIFTD_SERVER"), "THRIFTD_SERVER");
    set
}

#[cfg(test)]
mod tests {
    use super::super::TryFromConfigSource;
    use std::env::VarError;

    #[test]
    fn missing_var_is_absent_not_an_error() {
        let v: Result<String, VarError> = Err(VarError::NotPresent);
        assert!(!v.is_present());
    }

    #[test]
    fn present_var_is_present() {
        let v: Result<String, VarError> = Ok("9090".to_string());
        assert!(v.is_present());
    }
}
