//! Uninstall metadata for the Windows "Apps & features" list.

use std::fmt;
use std::path::Path;
use tracing::warn;

use crate::cmdline::escape_arg;
use crate::config::ProductConfig;

/// Key that holds one subkey per uninstallable program, below `HKEY_LOCAL_MACHINE`.
pub const UNINSTALL_ROOT: &str = r"SOFTWARE\Microsoft\Windows\CurrentVersion\Uninstall";

/// A single value written below the uninstall key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryValue<'a> {
    Text(&'a str),
    Dword(u32),
}

/// Values stored under the program's uninstall key.
///
/// `display_name` and `uninstall_command` are required by Windows; empty
/// optional strings and a zero size are not written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UninstallData {
    pub display_name: String,
    pub display_version: String,
    pub display_icon: String,
    /// Stored as `UninstallString`; must be quoted.
    pub uninstall_command: String,
    pub install_location: String,
    pub install_source: String,
    pub publisher: String,
    /// In KiB.
    pub estimated_size: u32,
}

impl UninstallData {
    /// Builds the entry for an executable installed as `dest_dir\exe`.
    pub fn for_install(
        product: &ProductConfig,
        version: &str,
        source_dir: &Path,
        dest_dir: &Path,
        exe: &str,
        size_in_bytes: u64,
    ) -> Self {
        let installed = dest_dir.join(exe);
        Self {
            display_name: product.name.clone(),
            display_version: version.to_string(),
            display_icon: installed.display().to_string(),
            uninstall_command: uninstall_command(dest_dir, exe),
            install_location: dest_dir.display().to_string(),
            install_source: source_dir.join(exe).display().to_string(),
            publisher: product.company.clone(),
            estimated_size: u32::try_from(size_in_bytes / 1024).unwrap_or(u32::MAX),
        }
    }

    /// Writes every value through `set`. Only `DisplayName` and
    /// `UninstallString` are fatal; other failures are logged and their
    /// names returned.
    pub fn store<E: fmt::Display>(
        &self,
        mut set: impl FnMut(&'static str, EntryValue<'_>) -> Result<(), E>,
    ) -> Result<Vec<&'static str>, (&'static str, E)> {
        set("DisplayName", EntryValue::Text(&self.display_name))
            .map_err(|e| ("DisplayName", e))?;
        set("UninstallString", EntryValue::Text(&self.uninstall_command))
            .map_err(|e| ("UninstallString", e))?;

        let mut optional: Vec<(&'static str, EntryValue<'_>)> = self
            .optional_values()
            .map(|(name, value)| (name, EntryValue::Text(value)))
            .collect();
        if self.estimated_size != 0 {
            optional.push(("EstimatedSize", EntryValue::Dword(self.estimated_size)));
        }

        let mut skipped = Vec::new();
        for (name, value) in optional {
            if let Err(e) = set(name, value) {
                warn!("Could not write {}: {}", name, e);
                skipped.push(name);
            }
        }
        Ok(skipped)
    }

    /// Optional string values that should be written, by registry value name.
    fn optional_values(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("DisplayVersion", self.display_version.as_str()),
            ("DisplayIcon", self.display_icon.as_str()),
            ("InstallLocation", self.install_location.as_str()),
            ("InstallSource", self.install_source.as_str()),
            ("Publisher", self.publisher.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
    }
}

/// Quoted command line that uninstalls the executable at `dir\exe`.
pub fn uninstall_command(dir: &Path, exe: &str) -> String {
    format!("{} uninstall", escape_arg(&dir.join(exe).display().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmdline::split_command;
    use std::path::PathBuf;

    #[test]
    fn uninstall_command_round_trips() {
        let dir = PathBuf::from("C:/Program Files/SCJ/wgtoggle/1.0.0");
        let command = uninstall_command(&dir, "wgtoggle.exe");
        assert!(command.starts_with('"'));
        assert!(command.ends_with("\" uninstall"));

        let (program, args) = split_command(&command).unwrap();
        assert_eq!(PathBuf::from(program), dir.join("wgtoggle.exe"));
        assert_eq!(args, vec!["uninstall"]);
    }

    #[test]
    fn entry_for_install() {
        let product = ProductConfig::default();
        let data = UninstallData::for_install(
            &product,
            "1.0.0",
            Path::new("downloads"),
            Path::new("programs"),
            "wgtoggle.exe",
            5 * 1024 * 1024 + 100,
        );
        assert_eq!(data.display_name, "WG Toggle");
        assert_eq!(data.publisher, "SCJ Alliance");
        assert_eq!(data.display_version, "1.0.0");
        assert_eq!(data.estimated_size, 5 * 1024);
        assert_eq!(
            data.install_source,
            Path::new("downloads").join("wgtoggle.exe").display().to_string()
        );
        assert_eq!(data.install_location, "programs");
    }

    #[test]
    fn empty_optional_values_are_skipped() {
        let data = UninstallData {
            display_name: "WG Toggle".into(),
            uninstall_command: "wgtoggle.exe uninstall".into(),
            publisher: "SCJ Alliance".into(),
            ..Default::default()
        };
        let values: Vec<_> = data.optional_values().collect();
        assert_eq!(values, vec![("Publisher", "SCJ Alliance")]);
    }

    fn sample() -> UninstallData {
        UninstallData::for_install(
            &ProductConfig::default(),
            "1.0.0",
            Path::new("downloads"),
            Path::new("programs"),
            "wgtoggle.exe",
            4096,
        )
    }

    #[test]
    fn optional_value_failure_is_skipped() {
        let mut written = Vec::new();
        let skipped = sample()
            .store(|name, value| {
                if name == "DisplayIcon" {
                    return Err("access denied");
                }
                written.push((name, value == EntryValue::Dword(4)));
                Ok(())
            })
            .unwrap();

        assert_eq!(skipped, vec!["DisplayIcon"]);
        let names: Vec<_> = written.iter().map(|(name, _)| *name).collect();
        assert_eq!(
            names,
            vec![
                "DisplayName",
                "UninstallString",
                "DisplayVersion",
                "InstallLocation",
                "InstallSource",
                "Publisher",
                "EstimatedSize",
            ]
        );
        assert!(written.last().unwrap().1);
    }

    #[test]
    fn required_value_failure_fails_the_write() {
        let mut calls = 0;
        let err = sample()
            .store(|name, _| {
                calls += 1;
                if name == "UninstallString" {
                    Err("access denied")
                } else {
                    Ok(())
                }
            })
            .unwrap_err();

        assert_eq!(err, ("UninstallString", "access denied"));
        assert_eq!(calls, 2);
    }
}
