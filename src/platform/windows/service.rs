use ::windows::core::PCWSTR;
use ::windows::Win32::Foundation::{
    ERROR_SERVICE_ALREADY_RUNNING, ERROR_SERVICE_DOES_NOT_EXIST, ERROR_SERVICE_NOT_ACTIVE,
};
use ::windows::Win32::System::Services::{
    CloseServiceHandle, ControlService, OpenSCManagerW, OpenServiceW, QueryServiceStatus,
    StartServiceW, SC_HANDLE, SC_MANAGER_CONNECT, SERVICE_CONTROL_STOP, SERVICE_QUERY_STATUS,
    SERVICE_RUNNING, SERVICE_START, SERVICE_START_PENDING, SERVICE_STATUS, SERVICE_STOP,
    SERVICE_STOPPED, SERVICE_STOP_PENDING,
};
use tracing::debug;

use super::wide;
use crate::error::{PlatformError, Result};
use crate::platform::{ServiceControl, ServiceState};

/// Service control manager access through the Win32 service API.
pub struct WindowsServices;

/// Closes the wrapped service or manager handle on drop.
struct ScHandle(SC_HANDLE);

impl Drop for ScHandle {
    fn drop(&mut self) {
        // SAFETY: the handle came from OpenSCManagerW/OpenServiceW and is closed once.
        unsafe {
            let _ = CloseServiceHandle(self.0);
        }
    }
}

impl WindowsServices {
    fn manager() -> Result<ScHandle> {
        // SAFETY: null machine and database names select the local active database.
        let scm = unsafe { OpenSCManagerW(PCWSTR::null(), PCWSTR::null(), SC_MANAGER_CONNECT) }
            .map_err(|e| PlatformError::Service(format!("Failed to open SCM: {}", e)))?;
        Ok(ScHandle(scm))
    }

    /// Opens `name`, returning `None` when no such service is registered.
    fn open(name: &str, access: u32) -> Result<Option<ScHandle>> {
        let scm = Self::manager()?;
        let name_wide = wide(name);
        // SAFETY: `name_wide` is null-terminated and outlives the call.
        match unsafe { OpenServiceW(scm.0, PCWSTR(name_wide.as_ptr()), access) } {
            Ok(service) => Ok(Some(ScHandle(service))),
            Err(e) if e.code() == ERROR_SERVICE_DOES_NOT_EXIST.to_hresult() => Ok(None),
            Err(e) => Err(PlatformError::Service(format!(
                "Failed to open {}: {}",
                name, e
            ))),
        }
    }

    fn open_existing(name: &str, access: u32) -> Result<ScHandle> {
        Self::open(name, access)?
            .ok_or_else(|| PlatformError::Service(format!("{} does not exist", name)))
    }
}

impl ServiceControl for WindowsServices {
    fn exists(&self, name: &str) -> Result<bool> {
        Ok(Self::open(name, SERVICE_QUERY_STATUS)?.is_some())
    }

    fn state(&self, name: &str) -> Result<ServiceState> {
        let service = Self::open_existing(name, SERVICE_QUERY_STATUS)?;
        let mut status = SERVICE_STATUS::default();
        // SAFETY: `status` is a valid out-pointer for the duration of the call.
        unsafe { QueryServiceStatus(service.0, &mut status) }
            .map_err(|e| PlatformError::Service(format!("Failed to query {}: {}", name, e)))?;

        let state = match status.dwCurrentState {
            s if s == SERVICE_RUNNING => ServiceState::Running,
            s if s == SERVICE_STOPPED => ServiceState::Stopped,
            s if s == SERVICE_START_PENDING => ServiceState::StartPending,
            s if s == SERVICE_STOP_PENDING => ServiceState::StopPending,
            _ => ServiceState::Other,
        };
        Ok(state)
    }

    fn start(&self, name: &str) -> Result<()> {
        let service = Self::open_existing(name, SERVICE_START | SERVICE_QUERY_STATUS)?;
        // SAFETY: the handle is open with SERVICE_START access.
        match unsafe { StartServiceW(service.0, None) } {
            Ok(()) => Ok(()),
            Err(e) if e.code() == ERROR_SERVICE_ALREADY_RUNNING.to_hresult() => {
                debug!("{} is already running", name);
                Ok(())
            }
            Err(e) => Err(PlatformError::Service(e.to_string())),
        }
    }

    fn stop(&self, name: &str) -> Result<()> {
        let service = Self::open_existing(name, SERVICE_STOP | SERVICE_QUERY_STATUS)?;
        let mut status = SERVICE_STATUS::default();
        // SAFETY: the handle is open with SERVICE_STOP access and `status` is writable.
        match unsafe { ControlService(service.0, SERVICE_CONTROL_STOP, &mut status) } {
            Ok(()) => Ok(()),
            Err(e) if e.code() == ERROR_SERVICE_NOT_ACTIVE.to_hresult() => {
                debug!("{} is not running", name);
                Ok(())
            }
            Err(e) => Err(PlatformError::Service(e.to_string())),
        }
    }
}
