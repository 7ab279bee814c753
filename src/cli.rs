use clap::{Args, Parser, Subcommand};
use std::net::IpAddr;
use std::process::ExitCode;

/// `wgtunnel`: toggles a tunnel by exact gateway address.
#[derive(Parser, Debug)]
#[command(name = "wgtunnel")]
#[command(version, about = "Toggles WireGuard tunnels off and on based on network topology.", long_about = None)]
pub struct TunnelCli {
    /// WireGuard tunnel name to toggle
    #[arg(short, long)]
    pub tunnel: String,

    /// Gateway IP address match
    #[arg(short, long = "gateway", required = true)]
    pub gateways: Vec<IpAddr>,
}

/// `wgtoggle`: installs, uninstalls and runs the network-change task.
#[derive(Parser, Debug)]
#[command(name = "wgtoggle")]
#[command(version, about = "Toggles WireGuard tunnels off and on based on network topology.", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Installs wgtoggle on the local machine
    Install(UpdateArgs),
    /// Uninstalls wgtoggle from the local machine
    Uninstall,
    /// Updates the requested tunnel state as necessary
    Update(UpdateArgs),
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct UpdateArgs {
    /// WireGuard tunnel name to toggle
    #[arg(short, long)]
    pub tunnel: String,

    /// Gateway IP address match (glob patterns such as 192.168.1.* are accepted)
    #[arg(short, long = "gateway", required = true)]
    pub gateways: Vec<String>,
}

impl UpdateArgs {
    /// Arguments that rerun `update` with this configuration.
    pub fn to_exec_args(&self) -> Vec<String> {
        let mut args = vec!["update".to_string()];
        if !self.tunnel.is_empty() {
            args.push("-t".to_string());
            args.push(self.tunnel.clone());
        }
        for gateway in &self.gateways {
            args.push("-g".to_string());
            args.push(gateway.clone());
        }
        args
    }
}

/// Parses the process arguments, mapping usage errors to exit code 1.
///
/// `--help` and `--version` print and yield exit code 0.
pub fn parse_or_exit<P: Parser>() -> Result<P, ExitCode> {
    P::try_parse().map_err(|e| {
        let _ = e.print();
        if e.use_stderr() {
            ExitCode::from(1)
        } else {
            ExitCode::SUCCESS
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definitions_are_valid() {
        Cli::command().debug_assert();
        TunnelCli::command().debug_assert();
    }

    #[test]
    fn tunnel_cli_parses_repeated_addresses() {
        let cli = TunnelCli::try_parse_from([
            "wgtunnel",
            "-t",
            "Office",
            "-g",
            "192.168.1.1",
            "--gateway",
            "fe80::1",
        ])
        .unwrap();
        assert_eq!(cli.tunnel, "Office");
        assert_eq!(
            cli.gateways,
            vec![
                "192.168.1.1".parse::<IpAddr>().unwrap(),
                "fe80::1".parse::<IpAddr>().unwrap()
            ]
        );
    }

    #[test]
    fn tunnel_cli_rejects_patterns_and_missing_flags() {
        assert!(TunnelCli::try_parse_from(["wgtunnel", "-t", "Office", "-g", "192.168.1.*"]).is_err());
        assert!(TunnelCli::try_parse_from(["wgtunnel", "-t", "Office"]).is_err());
        assert!(TunnelCli::try_parse_from(["wgtunnel", "-g", "192.168.1.1"]).is_err());
    }

    #[test]
    fn update_accepts_patterns() {
        let cli = Cli::try_parse_from([
            "wgtoggle", "update", "-t", "Office", "-g", "192.168.1.*", "-g", "10.0.0.1",
        ])
        .unwrap();
        match cli.command {
            Commands::Update(args) => {
                assert_eq!(args.tunnel, "Office");
                assert_eq!(args.gateways, vec!["192.168.1.*", "10.0.0.1"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn install_requires_gateway() {
        assert!(Cli::try_parse_from(["wgtoggle", "install", "-t", "Office"]).is_err());
        assert!(Cli::try_parse_from(["wgtoggle", "uninstall"]).is_ok());
    }

    #[test]
    fn exec_args_rerun_update() {
        let args = UpdateArgs {
            tunnel: "Office".into(),
            gateways: vec!["192.168.1.*".into()],
        };
        assert_eq!(
            args.to_exec_args(),
            vec!["update", "-t", "Office", "-g", "192.168.1.*"]
        );

        let reparsed = Cli::try_parse_from(
            std::iter::once("wgtoggle".to_string()).chain(args.to_exec_args()),
        )
        .unwrap();
        match reparsed.command {
            Commands::Update(parsed) => assert_eq!(parsed, args),
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
