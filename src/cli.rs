//! proxywarden/src/cli.rs
//! A4: CLI binding for C11. Grounded on `suprohub-novaprox`'s `Args`
//! (`clap::Parser`) shape.

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "proxywarden", about = "Personal-use proxy multiplexer and quality-curator")]
pub struct Cli {
    /// Path to the YAML config file.
    #[arg(long, default_value = "proxywarden.yaml")]
    pub config: String,

    /// Path to the pool JSON file.
    #[arg(long, default_value = "pool.json")]
    pub pool: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Import candidates from a newline-delimited `"<scheme>://<host>:<port>"` file.
    Import { file: String },
    /// Re-validate the current pool and persist the merged results.
    Retest,
    /// Start the SOCKS5 and HTTP listeners.
    Serve,
    /// Stop both listeners.
    Stop,
    /// Publish a new active upstream, e.g. `socks5://1.2.3.4:1080`.
    Switch { upstream_url: String },
    /// Enable or disable periodic upstream rotation.
    Rotate {
        #[command(subcommand)]
        action: RotateAction,
    },
    /// Print the current pool as a table.
    Status,
}

#[derive(Debug, Subcommand)]
pub enum RotateAction {
    Enable { interval_secs: u64 },
    Disable,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_import() {
        let cli = Cli::try_parse_from(["proxywarden", "import", "candidates.txt"]).unwrap();
        assert!(matches!(cli.command, Command::Import { file } if file == "candidates.txt"));
    }

    #[test]
    fn parses_switch() {
        let cli = Cli::try_parse_from(["proxywarden", "switch", "socks5://1.2.3.4:1080"]).unwrap();
        assert!(matches!(cli.command, Command::Switch { upstream_url } if upstream_url == "socks5://1.2.3.4:1080"));
    }

    #[test]
    fn parses_rotate_enable() {
        let cli = Cli::try_parse_from(["proxywarden", "rotate", "enable", "30"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Rotate { action: RotateAction::Enable { interval_secs: 30 } }
        ));
    }

    #[test]
    fn parses_rotate_disable() {
        let cli = Cli::try_parse_from(["proxywarden", "rotate", "disable"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Rotate { action: RotateAction::Disable }
        ));
    }

    #[test]
    fn parses_serve_stop_status_retest() {
        assert!(matches!(
            Cli::try_parse_from(["proxywarden", "serve"]).unwrap().command,
            Command::Serve
        ));
        assert!(matches!(
            Cli::try_parse_from(["proxywarden", "stop"]).unwrap().command,
            Command::Stop
        ));
        assert!(matches!(
            Cli::try_parse_from(["proxywarden", "status"]).unwrap().command,
            Command::Status
        ));
        assert!(matches!(
            Cli::try_parse_from(["proxywarden", "retest"]).unwrap().command,
            Command::Retest
        ));
    }

    #[test]
    fn rejects_unknown_subcommand() {
        assert!(Cli::try_parse_from(["proxywarden", "bogus"]).is_err());
    }
}
