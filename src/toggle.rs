use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ServiceConfig;
use crate::error::{PlatformError, ToggleError};
use crate::matcher::GatewayMatcher;
use crate::platform::{GatewayDiscovery, ServiceControl, ServiceState};

/// The state change requested from the service manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    Stop,
}

impl Action {
    /// A trusted gateway means the tunnel is unnecessary.
    pub fn for_match(matched: bool) -> Self {
        if matched {
            Action::Stop
        } else {
            Action::Start
        }
    }

    fn target_state(self) -> ServiceState {
        match self {
            Action::Start => ServiceState::Running,
            Action::Stop => ServiceState::Stopped,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Start => f.write_str("start"),
            Action::Stop => f.write_str("stop"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The tunnel service is not installed; nothing was done.
    NoService { service: String },
    Toggled {
        service: String,
        gateway: Option<IpAddr>,
        matched: bool,
        action: Action,
    },
}

/// One discover-match-toggle cycle for a single tunnel.
///
/// Service manager calls block, so each one runs on the blocking pool where
/// the deadline and the shutdown token can race it.
pub struct Toggler<'a> {
    services: Arc<dyn ServiceControl>,
    gateways: &'a dyn GatewayDiscovery,
    config: ServiceConfig,
}

impl<'a> Toggler<'a> {
    pub fn new(
        services: Arc<dyn ServiceControl>,
        gateways: &'a dyn GatewayDiscovery,
        config: &ServiceConfig,
    ) -> Self {
        Self {
            services,
            gateways,
            config: config.clone(),
        }
    }

    pub async fn run(
        &self,
        tunnel: &str,
        matcher: &GatewayMatcher,
        shutdown: &CancellationToken,
    ) -> Result<Outcome, ToggleError> {
        let service = self.config.service_name(tunnel);

        let found = self
            .blocking(&service, |services, name| services.exists(name))
            .await
            .map_err(ToggleError::ServiceCheck)?;
        if !found {
            debug!("{} is not installed, nothing to manage", service);
            return Ok(Outcome::NoService { service });
        }
        info!("Tunnel found: {}", service);

        let gateway = match self.gateways.default_gateway() {
            Ok(gateway) => {
                info!("Gateway discovered: {}", gateway);
                Some(gateway)
            }
            Err(e) => {
                warn!("Gateway query failed: {}", e);
                None
            }
        };

        let matched = gateway.is_some_and(|gw| matcher.matches(gw));
        match gateway {
            Some(gw) if matched => info!("Gateway matched: {}", gw),
            _ => info!("Gateway not matched against {}", matcher),
        }

        let action = Action::for_match(matched);
        self.apply(&service, action, shutdown).await?;

        Ok(Outcome::Toggled {
            service,
            gateway,
            matched,
            action,
        })
    }

    /// Requests `action` once and waits for the service to settle, bounded
    /// by the timeout and the shutdown token.
    async fn apply(
        &self,
        service: &str,
        action: Action,
        shutdown: &CancellationToken,
    ) -> Result<(), ToggleError> {
        info!("{} {}", if action == Action::Start { "Starting" } else { "Stopping" }, service);

        let timeout = self.config.timeout();
        let wait = tokio::time::timeout(timeout, self.request_and_wait(service, action));
        tokio::select! {
            _ = shutdown.cancelled() => Err(ToggleError::Interrupted {
                action,
                service: service.to_string(),
            }),
            result = wait => match result {
                Ok(inner) => inner,
                Err(_) => Err(ToggleError::Timeout {
                    action,
                    service: service.to_string(),
                    timeout,
                }),
            },
        }
    }

    async fn request_and_wait(&self, service: &str, action: Action) -> Result<(), ToggleError> {
        let control_error = |source| ToggleError::ServiceControl {
            action,
            service: service.to_string(),
            source,
        };

        self.blocking(service, move |services, name| match action {
            Action::Start => services.start(name),
            Action::Stop => services.stop(name),
        })
        .await
        .map_err(control_error)?;

        let target = action.target_state();
        loop {
            let state = self
                .blocking(service, |services, name| services.state(name))
                .await
                .map_err(control_error)?;
            if state == target {
                return Ok(());
            }
            debug!("{} is {:?}, waiting for {:?}", service, state, target);
            tokio::time::sleep(self.config.poll_interval()).await;
        }
    }

    /// Runs one service manager call on the blocking pool. Dropping the
    /// returned future abandons the call; the OS call itself runs to completion.
    async fn blocking<T, F>(&self, service: &str, call: F) -> crate::error::Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn ServiceControl, &str) -> crate::error::Result<T> + Send + 'static,
    {
        let services = Arc::clone(&self.services);
        let name = service.to_string();
        tokio::task::spawn_blocking(move || call(services.as_ref(), &name))
            .await
            .map_err(|e| {
                PlatformError::Service(format!("Service call for {} failed: {}", service, e))
            })?
    }
}
