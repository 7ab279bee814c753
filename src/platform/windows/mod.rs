// src/platform/windows/mod.rs

mod gateway;
mod registry;
mod scheduler;
mod service;

pub use gateway::WindowsGateway;
pub use registry::WindowsRegistry;
pub use scheduler::SchtasksScheduler;
pub use service::WindowsServices;

use std::os::windows::process::CommandExt;
use std::process::Command;

const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// A console-less child process, so scheduled runs do not flash windows.
pub(crate) fn hidden_command(program: &str) -> Command {
    let mut cmd = Command::new(program);
    cmd.creation_flags(CREATE_NO_WINDOW);
    cmd
}

/// Null-terminated UTF-16 for `PCWSTR` parameters.
pub(crate) fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

pub fn is_elevated() -> bool {
    // SAFETY: takes no arguments and only inspects the process token.
    unsafe { ::windows::Win32::UI::Shell::IsUserAnAdmin().as_bool() }
}
