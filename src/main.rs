use std::process::ExitCode;

use wgtoggle::app;
use wgtoggle::cli::{self, Cli, Commands};
use wgtoggle::config::AppConfig;
use wgtoggle::matcher::GatewayMatcher;

fn main() -> ExitCode {
    let cli = match cli::parse_or_exit::<Cli>() {
        Ok(cli) => cli,
        Err(code) => return code,
    };

    // Initialize logging
    app::init_tracing();
    let config = AppConfig::global();

    match cli.command {
        Commands::Install(args) => app::run_install(config, &args),
        Commands::Uninstall => app::run_uninstall(config),
        Commands::Update(args) => {
            let matcher = match GatewayMatcher::patterns(args.gateways) {
                Ok(m) => m,
                Err(e) => {
                    eprintln!("{}", e);
                    return ExitCode::from(e.exit_code());
                }
            };
            app::block_on(app::run_toggle(config, &args.tunnel, &matcher))
        }
    }
}
