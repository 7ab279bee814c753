use std::path::PathBuf;
use std::process::Output;
use tracing::debug;

use super::hidden_command;
use crate::error::{PlatformError, Result};
use crate::platform::TaskScheduler;
use crate::task::{find_in_listing, TaskDefinition};

/// Task Scheduler access through `schtasks.exe`.
pub struct SchtasksScheduler;

impl SchtasksScheduler {
    fn schtasks(args: &[&str]) -> Result<Output> {
        debug!("schtasks {:?}", args);
        hidden_command("schtasks")
            .args(args)
            .output()
            .map_err(|e| PlatformError::Scheduler(format!("Failed to run schtasks: {}", e)))
    }

    fn check(output: Output, what: &str) -> Result<()> {
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(PlatformError::Scheduler(format!(
            "{} failed: {}",
            what,
            stderr.trim()
        )))
    }

    /// schtasks only reads task XML reliably as UTF-16 with a byte order mark.
    fn write_definition(definition: &TaskDefinition) -> Result<PathBuf> {
        let path = std::env::temp_dir().join(format!("wgtoggle-task-{}.xml", std::process::id()));
        let mut bytes = vec![0xFF, 0xFE];
        for unit in definition.to_xml().encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        std::fs::write(&path, bytes)?;
        Ok(path)
    }
}

impl TaskScheduler for SchtasksScheduler {
    /// Queries by listing, since `/Query /TN` reports a missing task and a
    /// denied query with the same exit code.
    fn exists(&self, path: &str) -> Result<bool> {
        let output = Self::schtasks(&["/Query", "/FO", "CSV", "/NH"])?;
        find_in_listing(
            output.status.success(),
            &String::from_utf8_lossy(&output.stdout),
            &String::from_utf8_lossy(&output.stderr),
            path,
        )
    }

    fn delete(&self, path: &str) -> Result<()> {
        let output = Self::schtasks(&["/Delete", "/TN", path, "/F"])?;
        Self::check(output, "Task deletion")
    }

    fn create(&self, path: &str, definition: &TaskDefinition) -> Result<()> {
        let xml_path = Self::write_definition(definition)?;
        let xml_arg = xml_path.display().to_string();
        let result = Self::schtasks(&["/Create", "/TN", path, "/XML", &xml_arg, "/F"]);
        let _ = std::fs::remove_file(&xml_path);
        Self::check(result?, "Task creation")
    }

    fn run(&self, path: &str) -> Result<()> {
        let output = Self::schtasks(&["/Run", "/TN", path])?;
        Self::check(output, "Task start")
    }
}
