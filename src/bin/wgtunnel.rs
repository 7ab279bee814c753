use std::process::ExitCode;

use wgtoggle::app;
use wgtoggle::cli::{self, TunnelCli};
use wgtoggle::config::AppConfig;
use wgtoggle::matcher::GatewayMatcher;

fn main() -> ExitCode {
    let cli = match cli::parse_or_exit::<TunnelCli>() {
        Ok(cli) => cli,
        Err(code) => return code,
    };

    app::init_tracing();
    let matcher = GatewayMatcher::exact(cli.gateways);
    app::block_on(app::run_toggle(AppConfig::global(), &cli.tunnel, &matcher))
}
