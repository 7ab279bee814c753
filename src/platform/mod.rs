// src/platform/mod.rs

#[cfg(target_os = "windows")]
mod windows;

#[cfg(not(target_os = "windows"))]
mod unsupported;

#[cfg(target_os = "windows")]
pub use self::windows::{
    is_elevated, SchtasksScheduler as Scheduler, WindowsGateway as Gateway,
    WindowsRegistry as Registry, WindowsServices as Services,
};

#[cfg(not(target_os = "windows"))]
pub use self::unsupported::{
    is_elevated, UnsupportedGateway as Gateway, UnsupportedRegistry as Registry,
    UnsupportedScheduler as Scheduler, UnsupportedServices as Services,
};

use crate::error::Result;
use crate::registry::UninstallData;
use crate::task::TaskDefinition;
use std::net::IpAddr;
use std::process::Command;

/// Observed state of an OS service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Stopped,
    StartPending,
    StopPending,
    Running,
    Other,
}

/// Calls block the caller and run on the blocking pool, so implementations
/// must be shareable across threads.
#[cfg_attr(test, mockall::automock)]
pub trait ServiceControl: Send + Sync {
    /// Returns `false` when no service with this name is registered.
    fn exists(&self, name: &str) -> Result<bool>;
    fn state(&self, name: &str) -> Result<ServiceState>;
    /// Requests a start. A service that is already running is not an error.
    fn start(&self, name: &str) -> Result<()>;
    /// Requests a stop. A service that is not running is not an error.
    fn stop(&self, name: &str) -> Result<()>;
}

#[cfg_attr(test, mockall::automock)]
pub trait GatewayDiscovery {
    fn default_gateway(&self) -> Result<IpAddr>;
}

/// Uninstall entry for this program in the OS program registry.
#[cfg_attr(test, mockall::automock)]
pub trait UninstallRegistry {
    fn read(&self) -> Result<Option<UninstallData>>;
    fn write(&self, data: &UninstallData) -> Result<()>;
    /// Removing an entry that does not exist succeeds.
    fn delete(&self) -> Result<()>;
}

/// Paths are rooted task scheduler paths such as `\SCJ\WireGuard Toggle`.
#[cfg_attr(test, mockall::automock)]
pub trait TaskScheduler {
    fn exists(&self, path: &str) -> Result<bool>;
    fn delete(&self, path: &str) -> Result<()>;
    fn create(&self, path: &str, definition: &TaskDefinition) -> Result<()>;
    fn run(&self, path: &str) -> Result<()>;
}

/// Runs an external program attached to this console.
#[cfg_attr(test, mockall::automock)]
pub trait ProcessRunner {
    /// Returns whether the program exited successfully.
    fn run(&self, program: &str, args: &[String]) -> Result<bool>;
}

pub struct ConsoleRunner;

impl ProcessRunner for ConsoleRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<bool> {
        let status = Command::new(program).args(args).status()?;
        Ok(status.success())
    }
}
