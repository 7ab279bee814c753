//! Scheduled task definition and its Task Scheduler XML form.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

use crate::cli::UpdateArgs;
use crate::cmdline::join_args;
use crate::config::AppConfig;
use crate::error::{PlatformError, Result};

/// How the scheduler treats a trigger that fires while the task is running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MultipleInstances {
    Parallel,
    #[default]
    Queue,
    IgnoreNew,
    StopExisting,
}

impl MultipleInstances {
    fn as_str(self) -> &'static str {
        match self {
            MultipleInstances::Parallel => "Parallel",
            MultipleInstances::Queue => "Queue",
            MultipleInstances::IgnoreNew => "IgnoreNew",
            MultipleInstances::StopExisting => "StopExisting",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDefinition {
    pub author: String,
    pub description: String,
    /// Principal SID; `S-1-5-18` is LocalSystem.
    pub user_id: String,
    pub event_query: String,
    pub trigger_delay: Duration,
    pub time_limit: Duration,
    pub multiple_instances: MultipleInstances,
    pub disallow_start_if_on_batteries: bool,
    pub stop_if_going_on_batteries: bool,
    pub command: String,
    pub arguments: String,
    pub working_directory: String,
}

impl TaskDefinition {
    /// The task that reruns `update` for `args` on every network profile change.
    pub fn network_change(config: &AppConfig, program: &Path, args: &UpdateArgs) -> Self {
        let working_directory = program
            .parent()
            .map(|dir| dir.display().to_string())
            .unwrap_or_default();
        Self {
            author: config.product.company.clone(),
            description: format!(
                "Disables the {} WireGuard tunnel when in the office",
                args.tunnel
            ),
            user_id: config.task.user_id.clone(),
            event_query: config.task.event_query.clone(),
            trigger_delay: config.task.trigger_delay(),
            time_limit: config.task.time_limit(),
            multiple_instances: config.task.multiple_instances,
            disallow_start_if_on_batteries: false,
            stop_if_going_on_batteries: false,
            command: program.display().to_string(),
            arguments: join_args(args.to_exec_args()),
            working_directory,
        }
    }

    /// Renders the definition as a Task Scheduler 1.4 document.
    pub fn to_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-16\"?>\n");
        xml.push_str(
            "<Task version=\"1.4\" xmlns=\"http://schemas.microsoft.com/windows/2004/02/mit/task\">\n",
        );

        xml.push_str("  <RegistrationInfo>\n");
        let _ = writeln!(xml, "    <Author>{}</Author>", escape_xml(&self.author));
        let _ = writeln!(
            xml,
            "    <Description>{}</Description>",
            escape_xml(&self.description)
        );
        xml.push_str("  </RegistrationInfo>\n");

        xml.push_str("  <Triggers>\n    <EventTrigger>\n      <Enabled>true</Enabled>\n");
        let _ = writeln!(
            xml,
            "      <Subscription>{}</Subscription>",
            escape_xml(&self.event_query)
        );
        let _ = writeln!(xml, "      <Delay>{}</Delay>", iso_duration(self.trigger_delay));
        xml.push_str("    </EventTrigger>\n  </Triggers>\n");

        xml.push_str("  <Principals>\n    <Principal id=\"Author\">\n");
        let _ = writeln!(xml, "      <UserId>{}</UserId>", escape_xml(&self.user_id));
        xml.push_str("      <RunLevel>HighestAvailable</RunLevel>\n");
        xml.push_str("    </Principal>\n  </Principals>\n");

        xml.push_str("  <Settings>\n");
        let _ = writeln!(
            xml,
            "    <MultipleInstancesPolicy>{}</MultipleInstancesPolicy>",
            self.multiple_instances.as_str()
        );
        let _ = writeln!(
            xml,
            "    <DisallowStartIfOnBatteries>{}</DisallowStartIfOnBatteries>",
            self.disallow_start_if_on_batteries
        );
        let _ = writeln!(
            xml,
            "    <StopIfGoingOnBatteries>{}</StopIfGoingOnBatteries>",
            self.stop_if_going_on_batteries
        );
        let _ = writeln!(
            xml,
            "    <ExecutionTimeLimit>{}</ExecutionTimeLimit>",
            iso_duration(self.time_limit)
        );
        xml.push_str("    <Enabled>true</Enabled>\n");
        xml.push_str("  </Settings>\n");

        xml.push_str("  <Actions Context=\"Author\">\n    <Exec>\n");
        let _ = writeln!(xml, "      <Command>{}</Command>", escape_xml(&self.command));
        if !self.arguments.is_empty() {
            let _ = writeln!(
                xml,
                "      <Arguments>{}</Arguments>",
                escape_xml(&self.arguments)
            );
        }
        if !self.working_directory.is_empty() {
            let _ = writeln!(
                xml,
                "      <WorkingDirectory>{}</WorkingDirectory>",
                escape_xml(&self.working_directory)
            );
        }
        xml.push_str("    </Exec>\n  </Actions>\n");
        xml.push_str("</Task>\n");
        xml
    }
}

/// Formats a duration as an ISO-8601 `PnDTnHnMnS` value, e.g. `PT5M`.
pub fn iso_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    if total == 0 {
        return "PT0S".to_string();
    }

    let (days, rem) = (total / 86_400, total % 86_400);
    let (hours, rem) = (rem / 3_600, rem % 3_600);
    let (minutes, seconds) = (rem / 60, rem % 60);

    let mut out = String::from("P");
    if days > 0 {
        let _ = write!(out, "{}D", days);
    }
    if hours > 0 || minutes > 0 || seconds > 0 {
        out.push('T');
        for (value, unit) in [(hours, 'H'), (minutes, 'M'), (seconds, 'S')] {
            if value > 0 {
                let _ = write!(out, "{}{}", value, unit);
            }
        }
    }
    out
}

/// Interprets a `schtasks /Query /FO CSV /NH` listing. A failed listing is an
/// error, never "no such task".
pub fn find_in_listing(success: bool, stdout: &str, stderr: &str, path: &str) -> Result<bool> {
    if !success {
        return Err(PlatformError::Scheduler(format!(
            "Task query failed: {}",
            stderr.trim()
        )));
    }
    Ok(stdout
        .lines()
        .filter_map(|line| line.trim().strip_prefix('"'))
        .filter_map(|rest| rest.split('"').next())
        .any(|name| name.eq_ignore_ascii_case(path)))
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn args() -> UpdateArgs {
        UpdateArgs {
            tunnel: "Main Office".to_string(),
            gateways: vec!["192.168.1.*".to_string(), "10.0.0.1".to_string()],
        }
    }

    const LISTING: &str = "\"\\Microsoft\\Windows\\Defrag\\ScheduledDefrag\",\"N/A\",\"Ready\"\r\n\
                           \"\\SCJ\\WireGuard Toggle\",\"N/A\",\"Ready\"\r\n";

    #[test]
    fn listing_finds_task_by_rooted_path() {
        assert!(find_in_listing(true, LISTING, "", "\\SCJ\\WireGuard Toggle").unwrap());
        assert!(find_in_listing(true, LISTING, "", "\\scj\\wireguard toggle").unwrap());
        assert!(!find_in_listing(true, LISTING, "", "\\SCJ\\Other").unwrap());
        assert!(!find_in_listing(true, "", "", "\\SCJ\\WireGuard Toggle").unwrap());
    }

    #[test]
    fn failed_listing_is_an_error_not_a_missing_task() {
        let stderr = "ERROR: Access is denied.\r\n";
        let err = find_in_listing(false, "", stderr, "\\SCJ\\WireGuard Toggle").unwrap_err();
        assert!(
            matches!(err, PlatformError::Scheduler(ref msg) if msg.contains("Access is denied"))
        );
    }

    #[test]
    fn durations() {
        assert_eq!(iso_duration(Duration::from_secs(0)), "PT0S");
        assert_eq!(iso_duration(Duration::from_secs(5)), "PT5S");
        assert_eq!(iso_duration(Duration::from_secs(300)), "PT5M");
        assert_eq!(iso_duration(Duration::from_secs(3_723)), "PT1H2M3S");
        assert_eq!(iso_duration(Duration::from_secs(86_400)), "P1D");
        assert_eq!(iso_duration(Duration::from_secs(90_000)), "P1DT1H");
    }

    #[test]
    fn network_change_task_runs_update() {
        let config = AppConfig::default();
        let program = PathBuf::from("install").join("wgtoggle.exe");
        let task = TaskDefinition::network_change(&config, &program, &args());

        assert_eq!(task.author, "SCJ Alliance");
        assert_eq!(
            task.description,
            "Disables the Main Office WireGuard tunnel when in the office"
        );
        assert_eq!(
            task.arguments,
            "update -t \"Main Office\" -g 192.168.1.* -g 10.0.0.1"
        );
        assert_eq!(task.working_directory, "install");
        assert_eq!(task.time_limit, Duration::from_secs(300));
        assert_eq!(task.trigger_delay, Duration::from_secs(5));
        assert_eq!(task.multiple_instances, MultipleInstances::Queue);
        assert!(!task.stop_if_going_on_batteries);
    }

    #[test]
    fn configured_instance_policy_reaches_the_xml() {
        let mut config = AppConfig::default();
        config.task.multiple_instances = MultipleInstances::StopExisting;
        let task =
            TaskDefinition::network_change(&config, &PathBuf::from("wgtoggle.exe"), &args());

        assert!(task
            .to_xml()
            .contains("<MultipleInstancesPolicy>StopExisting</MultipleInstancesPolicy>"));
    }

    #[test]
    fn xml_escapes_query_and_arguments() {
        let config = AppConfig::default();
        let task =
            TaskDefinition::network_change(&config, &PathBuf::from("wgtoggle.exe"), &args());
        let xml = task.to_xml();

        assert!(xml.contains("<UserId>S-1-5-18</UserId>"));
        assert!(xml.contains("<ExecutionTimeLimit>PT5M</ExecutionTimeLimit>"));
        assert!(xml.contains("<Delay>PT5S</Delay>"));
        assert!(xml.contains("<MultipleInstancesPolicy>Queue</MultipleInstancesPolicy>"));
        assert!(xml.contains("&lt;QueryList&gt;&lt;Query Id=&apos;1&apos;&gt;"));
        assert!(xml.contains(
            "<Arguments>update -t &quot;Main Office&quot; -g 192.168.1.* -g 10.0.0.1</Arguments>"
        ));
        assert!(!xml.contains("<WorkingDirectory>"));
    }
}
