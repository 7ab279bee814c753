use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, warn};

use crate::task::MultipleInstances;

const CONFIG_FILE: &str = "wgtoggle.toml";

static GLOBAL: OnceLock<AppConfig> = OnceLock::new();

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub product: ProductConfig,
    pub task: TaskConfig,
    pub service: ServiceConfig,
}

/// Names written to the uninstall entry and used for the install path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductConfig {
    pub name: String,
    pub company: String,
    /// Directory under `%PROGRAMFILES%\<company_dir>`.
    pub company_dir: String,
    pub install_dir: String,
    /// Subkey name below the Windows `Uninstall` key.
    pub uninstall_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    pub folder: String,
    pub name: String,
    /// Windows event query that fires on network connects and disconnects.
    pub event_query: String,
    pub trigger_delay_secs: u64,
    pub time_limit_secs: u64,
    /// SID of the account the task runs as.
    pub user_id: String,
    /// Network changes in quick succession queue up behind the running update.
    pub multiple_instances: MultipleInstances,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// WireGuard installs each tunnel as `<prefix><tunnel>`.
    pub prefix: String,
    pub timeout_secs: u64,
    pub poll_interval_ms: u64,
}

impl Default for ProductConfig {
    fn default() -> Self {
        Self {
            name: "WG Toggle".to_string(),
            company: "SCJ Alliance".to_string(),
            company_dir: "SCJ".to_string(),
            install_dir: "wgtoggle".to_string(),
            uninstall_key: "WGToggle".to_string(),
        }
    }
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            folder: "SCJ".to_string(),
            name: "WireGuard Toggle".to_string(),
            event_query: "<QueryList><Query Id='1'><Select Path='Microsoft-Windows-NetworkProfile/Operational'>*[System[(EventID=10000 or EventID=10001)]]</Select></Query></QueryList>".to_string(),
            trigger_delay_secs: 5,
            time_limit_secs: 5 * 60,
            user_id: "S-1-5-18".to_string(),
            multiple_instances: MultipleInstances::default(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            prefix: "WireGuardTunnel$".to_string(),
            timeout_secs: 10,
            poll_interval_ms: 250,
        }
    }
}

impl TaskConfig {
    /// Path of the task relative to the scheduler library root, e.g. `SCJ\WireGuard Toggle`.
    pub fn path(&self) -> String {
        if self.folder.is_empty() {
            self.name.clone()
        } else {
            format!("{}\\{}", self.folder, self.name)
        }
    }

    pub fn rooted_path(&self) -> String {
        format!("\\{}", self.path())
    }

    pub fn trigger_delay(&self) -> Duration {
        Duration::from_secs(self.trigger_delay_secs)
    }

    pub fn time_limit(&self) -> Duration {
        Duration::from_secs(self.time_limit_secs)
    }
}

impl ServiceConfig {
    pub fn service_name(&self, tunnel: &str) -> String {
        format!("{}{}", self.prefix, tunnel)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl AppConfig {
    /// Returns the process-wide configuration, loading it on first use.
    pub fn global() -> &'static AppConfig {
        GLOBAL.get_or_init(|| match Self::load() {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring invalid configuration: {:#}", e);
                Self::default()
            }
        })
    }

    /// Loads `wgtoggle.toml` from beside the running executable, or the
    /// defaults when no such file exists.
    pub fn load() -> anyhow::Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        debug!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    fn config_path() -> Option<PathBuf> {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|dir| dir.join(CONFIG_FILE)))
    }
}
