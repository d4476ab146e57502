//! Workload command construction and environment resolution.

use super::lifecycle::SandboxRoot;
use crate::error::{Error, Result};
use crate::overlay::relative_of;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::os::unix::process::ExitStatusExt;
use std::path::Path;
use std::process::{Command, ExitStatus};

/// Program that enters the sandbox root without privileges.
pub const PROOT: &str = "proot";

/// What: One environment variable as written in a job file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    /// Set verbatim.
    Literal(String),
    /// Colon-joined and prepended to the variable's current value.
    PathList(Vec<String>),
}

/// What: Turn job environment entries into concrete `NAME=value` pairs.
///
/// Inputs:
/// - `env`: Entries from the job.
/// - `destination`: Sandbox root on the host.
/// - `chroot`: Whether the command runs with `destination` as its `/`.
/// - `current`: Lookup for the variable's present value.
///
/// Output:
/// - Pairs in name order.
///
/// Details:
/// - Without a chroot, absolute list entries are re-rooted under `destination`
///   so they still point into the sandbox tree.
pub fn resolve_env<F>(
    env: &BTreeMap<String, EnvValue>,
    destination: &Path,
    chroot: bool,
    current: F,
) -> Vec<(String, String)>
where
    F: Fn(&str) -> Option<String>,
{
    env.iter()
        .map(|(name, value)| {
            let resolved = match value {
                EnvValue::Literal(s) => s.clone(),
                EnvValue::PathList(entries) => {
                    let mut parts: Vec<String> = entries
                        .iter()
                        .map(|entry| {
                            if !chroot && Path::new(entry).is_absolute() {
                                destination
                                    .join(relative_of(Path::new(entry)))
                                    .to_string_lossy()
                                    .into_owned()
                            } else {
                                entry.clone()
                            }
                        })
                        .collect();
                    if let Some(existing) = current(name).filter(|v| !v.is_empty()) {
                        parts.push(existing);
                    }
                    parts.join(":")
                }
            };
            (name.clone(), resolved)
        })
        .collect()
}

/// What: Build the command that runs `argv` inside the sandbox.
///
/// Inputs:
/// - `root`: Built sandbox.
/// - `argv`: Program and arguments; must not be empty.
/// - `chroot`: Enter the root through `proot` with the host `/` bound at the
///   private subtree; otherwise run `argv` directly on the host.
///
/// Output:
/// - Ready-to-spawn command, or `MissingProgram("proot")`.
pub fn sandbox_command(root: &SandboxRoot, argv: &[String], chroot: bool) -> Result<Command> {
    let Some((program, args)) = argv.split_first() else {
        return Err(Error::InvalidJob("no command to run".to_string()));
    };
    if !chroot {
        let mut cmd = Command::new(program);
        cmd.args(args);
        return Ok(cmd);
    }
    let proot = which::which(PROOT).map_err(|_| Error::MissingProgram(PROOT))?;
    let mut cmd = Command::new(proot);
    cmd.arg("-r")
        .arg(root.destination())
        .arg(format!("--bind=/:/{}", root.private_root_name()))
        .arg(program)
        .args(args);
    Ok(cmd)
}

/// Exit code of a finished process; signal deaths map to `128 + signal`.
#[must_use]
pub fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(1)
}

/// What: Spawn `cmd`, wait for it and return its exit code.
pub fn run_command(cmd: &mut Command) -> Result<i32> {
    tracing::info!(command = ?cmd, "running command");
    let status = cmd.status()?;
    let code = exit_code(status);
    if code == 0 {
        tracing::debug!("command exited successfully");
    } else {
        tracing::warn!(code, "command exited with failure");
    }
    Ok(code)
}
