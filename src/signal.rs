use tokio_util::sync::CancellationToken;
use tracing::info;

/// Installs the process-wide Ctrl-C / termination handler.
///
/// May only be called once per process; the handler cancels the returned
/// token.
pub fn shutdown_token() -> anyhow::Result<CancellationToken> {
    let token = CancellationToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || {
        info!("Shutdown signal received");
        handler_token.cancel();
    })?;
    Ok(token)
}
