//! Command execution utilities

use crate::utils::error::{Result, VolstrapError};
use std::io::Write;
use std::process::{Command, Output, Stdio};
use tracing::{debug, warn};

/// Execute a command and return the output
pub fn run_command(program: &str, args: &[&str]) -> Result<Output> {
    debug!("Running: {} {}", program, args.join(" "));

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                VolstrapError::CommandNotFound(program.to_string())
            } else {
                VolstrapError::Io(e)
            }
        })?;

    check_status(program, args, output)
}

/// Execute a command with the given string fed to its stdin.
///
/// Used for tools that take their specification on stdin (sfdisk partition
/// scripts, cryptsetup passphrases).
pub fn run_command_with_input(program: &str, args: &[&str], input: &str) -> Result<Output> {
    debug!("Running (with stdin): {} {}", program, args.join(" "));

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                VolstrapError::CommandNotFound(program.to_string())
            } else {
                VolstrapError::Io(e)
            }
        })?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(input.as_bytes())?;
    }

    let output = child.wait_with_output()?;
    check_status(program, args, output)
}

/// Execute a command and return stdout as string
pub fn run_command_output(program: &str, args: &[&str]) -> Result<String> {
    let output = run_command(program, args)?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn check_status(program: &str, args: &[&str], output: Output) -> Result<Output> {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        warn!(
            "Command failed: {} {}\n  stderr: {}",
            program,
            args.join(" "),
            stderr.trim()
        );
        return Err(VolstrapError::CommandFailed {
            command: format!("{} {}", program, args.join(" ")),
            stderr,
        });
    }
    Ok(output)
}

/// Log a command that would be run (for dry-run mode)
fn log_dry_run(program: &str, args: &[&str]) {
    println!("  [dry-run] {} {}", program, args.join(" "));
}

/// Wrapper for command execution that respects dry-run mode.
///
/// Every external operation goes through this wrapper; a non-zero exit
/// status aborts the run. An interrupt received before a command starts
/// stops the sequence, but a command already in flight always runs to
/// completion.
pub struct CommandRunner {
    dry_run: bool,
}

impl CommandRunner {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    pub fn run(&self, program: &str, args: &[&str]) -> Result<Option<Output>> {
        if crate::utils::signal::is_interrupted() {
            return Err(VolstrapError::Interrupted);
        }
        if self.dry_run {
            log_dry_run(program, args);
            Ok(None)
        } else {
            run_command(program, args).map(Some)
        }
    }

    pub fn run_with_input(
        &self,
        program: &str,
        args: &[&str],
        input: &str,
    ) -> Result<Option<Output>> {
        if crate::utils::signal::is_interrupted() {
            return Err(VolstrapError::Interrupted);
        }
        if self.dry_run {
            log_dry_run(program, args);
            Ok(None)
        } else {
            run_command_with_input(program, args, input).map(Some)
        }
    }

    pub fn run_output(&self, program: &str, args: &[&str]) -> Result<Option<String>> {
        if self.dry_run {
            log_dry_run(program, args);
            Ok(None)
        } else {
            run_command_output(program, args).map(Some)
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}
