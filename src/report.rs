use colored::Colorize;
use std::fmt;

/// A single install or uninstall step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    ResolveSource,
    ResolveInstallDir,
    CompareExisting,
    CreateInstallDir,
    RemovePrevious,
    RemoveExistingTask,
    CopyExecutable,
    WriteRegistry,
    CreateTask,
    RunTask,
    RemoveTask,
    RemoveRegistry,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Step::ResolveSource => "Locate executable",
            Step::ResolveInstallDir => "Locate installation directory",
            Step::CompareExisting => "Examine existing executable",
            Step::CreateInstallDir => "Create installation directory",
            Step::RemovePrevious => "Remove previous installation",
            Step::RemoveExistingTask => "Remove existing task",
            Step::CopyExecutable => "Copy executable",
            Step::WriteRegistry => "Write uninstall entry",
            Step::CreateTask => "Create scheduled task",
            Step::RunTask => "Run scheduled task",
            Step::RemoveTask => "Remove scheduled task",
            Step::RemoveRegistry => "Remove uninstall entry",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Done,
    Skipped,
    /// Reported, but the remaining steps still ran.
    Warned,
    /// Stopped the remaining steps.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub step: Step,
    pub status: StepStatus,
    pub detail: String,
}

/// Returned by [`Report::abort`] so a fatal step can end a workflow with `?`.
#[derive(Debug)]
pub struct Aborted;

/// Ordered outcome of every step an install or uninstall performed.
#[derive(Debug, Default)]
pub struct Report {
    steps: Vec<StepRecord>,
    quiet: bool,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// A report that records without printing.
    pub fn quiet() -> Self {
        Self {
            steps: Vec::new(),
            quiet: true,
        }
    }

    pub fn done(&mut self, step: Step, detail: impl Into<String>) {
        self.record(step, StepStatus::Done, detail.into());
    }

    pub fn skipped(&mut self, step: Step, detail: impl Into<String>) {
        self.record(step, StepStatus::Skipped, detail.into());
    }

    pub fn warn(&mut self, step: Step, detail: impl fmt::Display) {
        self.record(step, StepStatus::Warned, detail.to_string());
    }

    pub fn abort(&mut self, step: Step, detail: impl fmt::Display) -> Aborted {
        self.record(step, StepStatus::Failed, detail.to_string());
        Aborted
    }

    #[cfg(test)]
    pub(crate) fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    pub fn status_of(&self, step: Step) -> Option<StepStatus> {
        self.steps.iter().find(|r| r.step == step).map(|r| r.status)
    }

    pub fn is_aborted(&self) -> bool {
        self.steps.iter().any(|r| r.status == StepStatus::Failed)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps.iter().filter(|r| r.status == StepStatus::Warned)
    }

    /// 1 when a fatal step failed, otherwise 0 even with warnings.
    pub fn exit_code(&self) -> u8 {
        if self.is_aborted() {
            1
        } else {
            0
        }
    }

    fn record(&mut self, step: Step, status: StepStatus, detail: String) {
        let record = StepRecord {
            step,
            status,
            detail,
        };
        if !self.quiet {
            print_record(&record);
        }
        self.steps.push(record);
    }

    pub fn display_summary(&self, action: &str) {
        println!("{}", "━".repeat(50).bright_blue());
        if self.is_aborted() {
            println!("{}", format!("  {} failed", action).bright_red().bold());
        } else if self.warnings().next().is_some() {
            println!(
                "{}",
                format!("  {} completed with warnings", action)
                    .bright_yellow()
                    .bold()
            );
            for record in self.warnings() {
                println!("  {} {}", "-".yellow(), record.step);
            }
        } else {
            println!(
                "{}",
                format!("  {} completed", action).bright_green().bold()
            );
        }
        println!("{}", "━".repeat(50).bright_blue());
    }
}

fn print_record(record: &StepRecord) {
    match record.status {
        StepStatus::Done => println!(
            "{} {}: {}",
            "[✓]".green(),
            record.step,
            record.detail
        ),
        StepStatus::Skipped => println!(
            "{} {}: {}",
            "[-]".bright_black(),
            record.step,
            record.detail
        ),
        StepStatus::Warned => eprintln!(
            "{} {}: {}",
            "[!]".yellow(),
            record.step,
            record.detail
        ),
        StepStatus::Failed => eprintln!(
            "{} {}: {}",
            "[✗]".bright_red(),
            record.step,
            record.detail
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_do_not_fail_the_report() {
        let mut report = Report::quiet();
        report.done(Step::CopyExecutable, "copied");
        report.warn(Step::WriteRegistry, "access denied");
        report.done(Step::CreateTask, "created");

        assert!(!report.is_aborted());
        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.warnings().count(), 1);
        assert_eq!(report.status_of(Step::WriteRegistry), Some(StepStatus::Warned));
        assert_eq!(report.status_of(Step::RunTask), None);
    }

    #[test]
    fn abort_marks_the_report_failed() {
        let mut report = Report::quiet();
        report.done(Step::ResolveSource, "found");
        let _ = report.abort(Step::ResolveInstallDir, "no ProgramFiles");

        assert!(report.is_aborted());
        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.steps().len(), 2);
        assert_eq!(report.steps()[1].detail, "no ProgramFiles");
    }
}
