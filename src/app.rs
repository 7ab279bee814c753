//! Console front end shared by the `wgtoggle` and `wgtunnel` binaries.

use colored::Colorize;
use std::future::Future;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::cli::UpdateArgs;
use crate::config::AppConfig;
use crate::installer::Installer;
use crate::matcher::GatewayMatcher;
use crate::platform::{self, ConsoleRunner};
use crate::report::Report;
use crate::signal;
use crate::toggle::{Action, Outcome, Toggler};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();
}

/// Drives `future` on a single-threaded runtime. A service call abandoned
/// after a timeout or interrupt must not keep the process alive, so the
/// blocking pool is not waited on at shutdown.
pub fn block_on<F: Future<Output = ExitCode>>(future: F) -> ExitCode {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("{} Failed to start runtime: {}", "[✗]".bright_red(), e);
            return ExitCode::from(1);
        }
    };
    let code = runtime.block_on(future);
    runtime.shutdown_background();
    code
}

/// Runs one toggle cycle against the local service manager.
pub async fn run_toggle(config: &AppConfig, tunnel: &str, matcher: &GatewayMatcher) -> ExitCode {
    let shutdown = signal::shutdown_token().unwrap_or_else(|e| {
        warn!("Failed to install signal handler: {}", e);
        CancellationToken::new()
    });

    let gateways = platform::Gateway;
    let toggler = Toggler::new(Arc::new(platform::Services), &gateways, &config.service);

    match toggler.run(tunnel, matcher, &shutdown).await {
        Ok(Outcome::NoService { service }) => {
            println!(
                "{}",
                format!("[-] {} is not installed, nothing to do", service).bright_black()
            );
            ExitCode::SUCCESS
        }
        Ok(Outcome::Toggled {
            service, action, ..
        }) => {
            let verb = match action {
                Action::Start => "started",
                Action::Stop => "stopped",
            };
            println!("{} {} {}", "[✓]".green(), service, verb);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{} {}", "[✗]".bright_red(), e);
            ExitCode::from(e.exit_code())
        }
    }
}

pub fn run_install(config: &AppConfig, args: &UpdateArgs) -> ExitCode {
    if let Err(e) = GatewayMatcher::patterns(args.gateways.iter().cloned()) {
        eprintln!("{} {}", "[✗]".bright_red(), e);
        return ExitCode::from(e.exit_code());
    }
    if !require_elevation() {
        return ExitCode::from(1);
    }

    let program = match std::env::current_exe() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{} Failed to locate the running executable: {}", "[✗]".bright_red(), e);
            return ExitCode::from(1);
        }
    };

    banner(&format!("Installing {} {}", config.product.name, VERSION));
    let scheduler = platform::Scheduler;
    let registry = platform::Registry::new(config.product.uninstall_key.clone());
    let installer = Installer::new(config, VERSION, &scheduler, &registry, &ConsoleRunner);

    let mut report = Report::new();
    let program_files = std::env::var_os("PROGRAMFILES");
    installer.install(&mut report, &program, program_files.as_deref(), args);
    report.display_summary("Install");
    ExitCode::from(report.exit_code())
}

pub fn run_uninstall(config: &AppConfig) -> ExitCode {
    if !require_elevation() {
        return ExitCode::from(1);
    }

    banner(&format!("Uninstalling {}", config.product.name));
    let scheduler = platform::Scheduler;
    let registry = platform::Registry::new(config.product.uninstall_key.clone());
    let installer = Installer::new(config, VERSION, &scheduler, &registry, &ConsoleRunner);

    let mut report = Report::new();
    installer.uninstall(&mut report);
    report.display_summary("Uninstall");
    ExitCode::from(report.exit_code())
}

fn require_elevation() -> bool {
    if platform::is_elevated() {
        return true;
    }
    eprintln!(
        "{}",
        "Error: wgtoggle must be run as Administrator".bright_red().bold()
    );
    false
}

fn banner(title: &str) {
    println!("{}", "━".repeat(50).bright_blue());
    println!("{}", format!("  {}...", title).bright_blue().bold());
    println!("{}", "━".repeat(50).bright_blue());
}
