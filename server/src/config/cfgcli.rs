/*
 * This file is a part of a Thrift-compatible RPC runtime
 *
 * CLI flags via `clap`'s v4 derive API (the idiom this workspace's newer
 * crates already use, ahead of this module's older `load_yaml!`/`ArgMatches`
 * style). Values are kept as strings here and fed through the same
 * `TryFromConfigSource<Option<&str>>` scalar parser the env/file sources use.
 */

use super::Configset;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "thriftd", about = "Thrift-compatible RPC server")]
pub struct Cli {
    /// Path to a YAML configuration file
    #[arg(long)]
    pub config: Option<String>,
    #[arg(long)]
    pub host: Option<String>,
    #[arg(long)]
    pub port: Option<String>,
    /// `json` or `simple-json`
    #[arg(long)]
    pub protocol: Option<String>,
    /// `framed` or `buffered`
    #[arg(long)]
    pub transport: Option<String>,
    #[arg(long = "max-message-size")]
    pub max_message_size: Option<String>,
    /// `simple` or `forking`
    #[arg(long)]
    pub server: Option<String>,
}

pub(super) fn parse_cli_args(cli: &Cli) -> Configset {
    let mut set = Configset::new_cli();
    set.server_net(
        cli.host.as_deref(),
        "--host",
        cli.port.as_deref(),
        "--port",
    );
    set.protocol(cli.protocol.as_deref(), "--protocol");
    set.transport(cli.transport.as_deref(), "--transport");
    set.max_message_size(cli.max_message_size.as_deref(), "--max-message-size");
    set.server_kind(cli.server.as_deref(), "--server");
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_flags() {
        let cli = Cli::parse_from([
            "thriftd",
            "--host",
            "0.0.0.0",
            "--port",
            "9191",
            "--protocol",
            "simple-json",
        ]);
        assert_eq!(cli.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(cli.port.as_deref(), Some("9191"));
        assert_eq!(cli.protocol.as_deref(), Some("simple-json"));
        assert!(cli.transport.is_none());
    }
}
