// src/platform/unsupported.rs

use std::net::IpAddr;

use crate::error::{PlatformError, Result};
use crate::platform::{
    GatewayDiscovery, ServiceControl, ServiceState, TaskScheduler, UninstallRegistry,
};
use crate::registry::UninstallData;
use crate::task::TaskDefinition;

/// Service control for targets without a Windows service manager.
pub struct UnsupportedServices;

pub struct UnsupportedGateway;

pub struct UnsupportedRegistry;

pub struct UnsupportedScheduler;

impl UnsupportedRegistry {
    pub fn new(_key_name: impl Into<String>) -> Self {
        UnsupportedRegistry
    }
}

impl ServiceControl for UnsupportedServices {
    fn exists(&self, _name: &str) -> Result<bool> {
        Err(PlatformError::Unsupported("Service control"))
    }

    fn state(&self, _name: &str) -> Result<ServiceState> {
        Err(PlatformError::Unsupported("Service control"))
    }

    fn start(&self, _name: &str) -> Result<()> {
        Err(PlatformError::Unsupported("Service control"))
    }

    fn stop(&self, _name: &str) -> Result<()> {
        Err(PlatformError::Unsupported("Service control"))
    }
}

impl GatewayDiscovery for UnsupportedGateway {
    fn default_gateway(&self) -> Result<IpAddr> {
        Err(PlatformError::Unsupported("Gateway discovery"))
    }
}

impl UninstallRegistry for UnsupportedRegistry {
    fn read(&self) -> Result<Option<UninstallData>> {
        Err(PlatformError::Unsupported("The uninstall registry"))
    }

    fn write(&self, _data: &UninstallData) -> Result<()> {
        Err(PlatformError::Unsupported("The uninstall registry"))
    }

    fn delete(&self) -> Result<()> {
        Err(PlatformError::Unsupported("The uninstall registry"))
    }
}

impl TaskScheduler for UnsupportedScheduler {
    fn exists(&self, _path: &str) -> Result<bool> {
        Err(PlatformError::Unsupported("The task scheduler"))
    }

    fn delete(&self, _path: &str) -> Result<()> {
        Err(PlatformError::Unsupported("The task scheduler"))
    }

    fn create(&self, _path: &str, _definition: &TaskDefinition) -> Result<()> {
        Err(PlatformError::Unsupported("The task scheduler"))
    }

    fn run(&self, _path: &str) -> Result<()> {
        Err(PlatformError::Unsupported("The task scheduler"))
    }
}

/// Only Windows installs need elevation checks; elsewhere every platform
/// call fails with `Unsupported` instead.
pub fn is_elevated() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_call_reports_unsupported() {
        assert!(matches!(
            UnsupportedServices.exists("WireGuardTunnel$Office"),
            Err(PlatformError::Unsupported(_))
        ));
        assert!(matches!(
            UnsupportedGateway.default_gateway(),
            Err(PlatformError::Unsupported(_))
        ));
        assert!(UnsupportedRegistry::new("WGToggle").read().is_err());
        assert!(UnsupportedScheduler.exists("\\SCJ\\WireGuard Toggle").is_err());
    }
}
