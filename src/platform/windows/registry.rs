use std::io::ErrorKind;
use winreg::enums::{HKEY_LOCAL_MACHINE, KEY_READ};
use winreg::RegKey;

use crate::error::{PlatformError, Result};
use crate::platform::UninstallRegistry;
use crate::registry::{EntryValue, UninstallData, UNINSTALL_ROOT};

/// The program's subkey below `HKLM\...\CurrentVersion\Uninstall`.
pub struct WindowsRegistry {
    key_name: String,
}

impl WindowsRegistry {
    pub fn new(key_name: impl Into<String>) -> Self {
        Self {
            key_name: key_name.into(),
        }
    }

    fn path(&self) -> String {
        format!("{}\\{}", UNINSTALL_ROOT, self.key_name)
    }
}

fn registry_error(context: &str, e: std::io::Error) -> PlatformError {
    PlatformError::Registry(format!("{}: {}", context, e))
}

impl UninstallRegistry for WindowsRegistry {
    fn read(&self) -> Result<Option<UninstallData>> {
        let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);
        let entry = match hklm.open_subkey_with_flags(self.path(), KEY_READ) {
            Ok(key) => key,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(registry_error("Failed to open uninstall entry", e)),
        };

        let required = |name: &str| -> Result<String> {
            entry
                .get_value::<String, _>(name)
                .map_err(|e| registry_error(name, e))
        };
        let optional = |name: &str| entry.get_value::<String, _>(name).unwrap_or_default();

        Ok(Some(UninstallData {
            display_name: required("DisplayName")?,
            uninstall_command: required("UninstallString")?,
            display_version: optional("DisplayVersion"),
            display_icon: optional("DisplayIcon"),
            install_location: optional("InstallLocation"),
            install_source: optional("InstallSource"),
            publisher: optional("Publisher"),
            estimated_size: entry.get_value::<u32, _>("EstimatedSize").unwrap_or(0),
        }))
    }

    fn write(&self, data: &UninstallData) -> Result<()> {
        let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);
        let (entry, _) = hklm
            .create_subkey(self.path())
            .map_err(|e| registry_error("Failed to create uninstall entry", e))?;

        data.store(|name, value| match value {
            EntryValue::Text(text) => entry.set_value(name, &text),
            EntryValue::Dword(number) => entry.set_value(name, &number),
        })
        .map_err(|(name, e)| registry_error(name, e))?;
        Ok(())
    }

    fn delete(&self) -> Result<()> {
        let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);
        match hklm.delete_subkey_all(self.path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(registry_error("Failed to remove uninstall entry", e)),
        }
    }
}
