use std::ffi::OsStr;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::cli::UpdateArgs;
use crate::cmdline::split_command;
use crate::config::{AppConfig, ProductConfig};
use crate::platform::{ProcessRunner, TaskScheduler, UninstallRegistry};
use crate::registry::UninstallData;
use crate::report::{Aborted, Report, Step};
use crate::task::TaskDefinition;

/// Result of comparing the source executable with an installed copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Missing,
    Same,
    Different,
}

/// Installs and removes the executable, uninstall entry and scheduled task.
pub struct Installer<'a> {
    config: &'a AppConfig,
    version: &'a str,
    scheduler: &'a dyn TaskScheduler,
    registry: &'a dyn UninstallRegistry,
    runner: &'a dyn ProcessRunner,
}

impl<'a> Installer<'a> {
    pub fn new(
        config: &'a AppConfig,
        version: &'a str,
        scheduler: &'a dyn TaskScheduler,
        registry: &'a dyn UninstallRegistry,
        runner: &'a dyn ProcessRunner,
    ) -> Self {
        Self {
            config,
            version,
            scheduler,
            registry,
            runner,
        }
    }

    /// Installs `program` below `program_files` and registers the
    /// network-change task for `args`.
    pub fn install(
        &self,
        report: &mut Report,
        program: &Path,
        program_files: Option<&OsStr>,
        args: &UpdateArgs,
    ) {
        if self.install_steps(report, program, program_files, args).is_err() {
            debug!("Install stopped early");
        }
    }

    pub fn uninstall(&self, report: &mut Report) {
        if self.uninstall_steps(report).is_err() {
            debug!("Uninstall stopped early");
        }
    }

    fn install_steps(
        &self,
        report: &mut Report,
        program: &Path,
        program_files: Option<&OsStr>,
        args: &UpdateArgs,
    ) -> Result<(), Aborted> {
        let source = absolute(program).map_err(|e| {
            report.abort(
                Step::ResolveSource,
                format!("Failed to determine the absolute path of {}: {}", program.display(), e),
            )
        })?;
        let exe = installed_name(&source)
            .ok_or_else(|| report.abort(Step::ResolveSource, "Executable has no file name"))?;
        let source_dir = source.parent().map(Path::to_path_buf).unwrap_or_default();
        let size = std::fs::metadata(&source)
            .map(|m| m.len())
            .map_err(|e| report.abort(Step::ResolveSource, format!("Failed to open {}: {}", exe, e)))?;
        report.done(Step::ResolveSource, source.display().to_string());

        let dest_dir = install_dir(program_files, &self.config.product, self.version)
            .map_err(|e| report.abort(Step::ResolveInstallDir, e))?;
        report.done(
            Step::ResolveInstallDir,
            format!("Installing {} to: {}", exe, dest_dir.display()),
        );

        let state = compare_file_content(&source, &dest_dir.join(&exe)).map_err(|e| {
            report.abort(
                Step::CompareExisting,
                format!("Failed to examine existing {} file: {}", exe, e),
            )
        })?;
        match state {
            FileState::Missing => report.done(Step::CompareExisting, format!("No existing {}", exe)),
            FileState::Same => report.done(
                Step::CompareExisting,
                format!("Existing {} file is up to date", exe),
            ),
            FileState::Different => report.done(
                Step::CompareExisting,
                format!("Existing {} file is out of date", exe),
            ),
        }

        std::fs::create_dir_all(&dest_dir).map_err(|e| {
            report.abort(
                Step::CreateInstallDir,
                format!(
                    "Failed to create installation directory \"{}\": {}",
                    dest_dir.display(),
                    e
                ),
            )
        })?;
        report.done(Step::CreateInstallDir, dest_dir.display().to_string());

        self.remove_previous(report);

        let task_path = self.config.task.rooted_path();
        self.remove_task(report, Step::RemoveExistingTask, &task_path)?;

        if state == FileState::Same {
            report.skipped(Step::CopyExecutable, format!("{} is up to date", exe));
        } else {
            copy_executable(&source, &dest_dir, &exe).map_err(|e| {
                report.abort(
                    Step::CopyExecutable,
                    format!("Failed to copy {} executable: {}", exe, e),
                )
            })?;
            report.done(
                Step::CopyExecutable,
                format!("{} copied to {}", exe, dest_dir.display()),
            );
        }

        let data = UninstallData::for_install(
            &self.config.product,
            self.version,
            &source_dir,
            &dest_dir,
            &exe,
            size,
        );
        match self.registry.write(&data) {
            Ok(()) => report.done(
                Step::WriteRegistry,
                "Wrote uninstall entry to the Windows registry",
            ),
            Err(e) => report.warn(
                Step::WriteRegistry,
                format!(
                    "Failed to write uninstall entry to the Windows registry: {}",
                    e
                ),
            ),
        }

        let definition = TaskDefinition::network_change(self.config, &dest_dir.join(&exe), args);
        let display_path = self.config.task.path();
        self.scheduler
            .create(&task_path, &definition)
            .map_err(|e| {
                report.abort(
                    Step::CreateTask,
                    format!("Failed to create \"{}\" task: {}", display_path, e),
                )
            })?;
        report.done(
            Step::CreateTask,
            format!("\"{}\" task created successfully", display_path),
        );

        self.scheduler
            .run(&task_path)
            .map_err(|e| report.abort(Step::RunTask, format!("Failed to start task: {}", e)))?;
        report.done(Step::RunTask, "Task started");

        info!("Installed {} {} to {}", self.config.product.name, self.version, dest_dir.display());
        Ok(())
    }

    fn uninstall_steps(&self, report: &mut Report) -> Result<(), Aborted> {
        let task_path = self.config.task.rooted_path();
        self.remove_task(report, Step::RemoveTask, &task_path)?;

        match self.registry.delete() {
            Ok(()) => report.done(
                Step::RemoveRegistry,
                "Removed uninstall entry from the Windows registry",
            ),
            Err(e) => report.warn(
                Step::RemoveRegistry,
                format!(
                    "Failed to remove uninstall entry from the Windows registry: {}",
                    e
                ),
            ),
        }
        Ok(())
    }

    /// Runs the uninstaller recorded by an earlier installation, if any.
    fn remove_previous(&self, report: &mut Report) {
        let data = match self.registry.read() {
            Ok(Some(data)) => data,
            Ok(None) => {
                report.skipped(Step::RemovePrevious, "No previous installation");
                return;
            }
            Err(e) => {
                report.warn(
                    Step::RemovePrevious,
                    format!("Failed to read previous uninstall entry: {}", e),
                );
                return;
            }
        };

        info!(
            "Removing {} version {}",
            data.display_name, data.display_version
        );
        let Some((program, args)) = split_command(&data.uninstall_command) else {
            report.warn(Step::RemovePrevious, "Failed to locate uninstaller");
            return;
        };

        info!("Executing: {}", data.uninstall_command);
        match self.runner.run(&program, &args) {
            Ok(true) => report.done(
                Step::RemovePrevious,
                format!("Removed {} version {}", data.display_name, data.display_version),
            ),
            Ok(false) => report.warn(
                Step::RemovePrevious,
                format!("Removal failed: {} exited unsuccessfully", program),
            ),
            Err(e) => report.warn(Step::RemovePrevious, format!("Removal failed: {}", e)),
        }
    }

    fn remove_task(&self, report: &mut Report, step: Step, task_path: &str) -> Result<(), Aborted> {
        let display_path = self.config.task.path();
        let exists = self.scheduler.exists(task_path).map_err(|e| {
            report.abort(step, format!("Failed to check for existing task: {}", e))
        })?;
        if !exists {
            report.skipped(step, format!("No \"{}\" task", display_path));
            return Ok(());
        }

        self.scheduler.delete(task_path).map_err(|e| {
            report.abort(step, format!("Removal of existing task failed: {}", e))
        })?;
        report.done(
            step,
            format!("The \"{}\" task has been removed", display_path),
        );
        Ok(())
    }
}

/// `%PROGRAMFILES%\<company_dir>\<install_dir>\<version>`.
pub fn install_dir(
    program_files: Option<&OsStr>,
    product: &ProductConfig,
    version: &str,
) -> Result<PathBuf, String> {
    match program_files {
        Some(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)
            .join(&product.company_dir)
            .join(&product.install_dir)
            .join(version)),
        _ => Err("Unable to determine ProgramFiles location".to_string()),
    }
}

/// File name the executable is installed under; always ends in `.exe`.
pub fn installed_name(source: &Path) -> Option<String> {
    let name = source.file_name()?.to_string_lossy().into_owned();
    if name.to_ascii_lowercase().ends_with(".exe") {
        Some(name)
    } else {
        Some(format!("{}.exe", name))
    }
}

pub fn compare_file_content(source: &Path, existing: &Path) -> io::Result<FileState> {
    let existing_file = match File::open(existing) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(FileState::Missing),
        Err(e) => return Err(e),
    };
    let source_file = File::open(source)?;

    if source_file.metadata()?.len() != existing_file.metadata()?.len() {
        return Ok(FileState::Different);
    }

    let mut a = BufReader::new(source_file);
    let mut b = BufReader::new(existing_file);
    let mut buf_a = [0u8; 8192];
    let mut buf_b = [0u8; 8192];
    loop {
        let n = a.read(&mut buf_a)?;
        if n == 0 {
            return Ok(FileState::Same);
        }
        b.read_exact(&mut buf_b[..n])?;
        if buf_a[..n] != buf_b[..n] {
            return Ok(FileState::Different);
        }
    }
}

/// Copies through a temporary file so a failed copy leaves any existing
/// executable in place.
fn copy_executable(source: &Path, dest_dir: &Path, exe: &str) -> io::Result<()> {
    let target = dest_dir.join(exe);
    let partial = dest_dir.join(format!("{}.partial", exe));
    if let Err(e) = std::fs::copy(source, &partial) {
        let _ = std::fs::remove_file(&partial);
        return Err(e);
    }
    std::fs::rename(&partial, &target).map_err(|e| {
        let _ = std::fs::remove_file(&partial);
        e
    })
}

fn absolute(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
