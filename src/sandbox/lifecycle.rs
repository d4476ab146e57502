//! Sandbox state machine: capture mounts, build the tree, run, tear down.

use super::mounts;
use crate::error::{Error, Result};
use crate::overlay::{BuildReport, Gateway, OverlayLayout, PRIVATE_ROOT_NAME, build_overlay};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Lifecycle states; transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SandboxState {
    /// Nothing inspected or touched yet.
    Created,
    /// Destination checked and host mountpoints recorded.
    MountsCaptured,
    /// Overlay tree materialized in the destination.
    TreeBuilt,
    /// Workload executing.
    Running,
    /// Destination removed; terminal.
    TornDown,
}

impl fmt::Display for SandboxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::MountsCaptured => "mounts-captured",
            Self::TreeBuilt => "tree-built",
            Self::Running => "running",
            Self::TornDown => "torn-down",
        };
        f.write_str(s)
    }
}

/// What: Where a sandbox lives and what the host looked like when it was made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxRoot {
    destination: PathBuf,
    private_root_name: String,
    mountpoints: Vec<PathBuf>,
}

impl SandboxRoot {
    /// Root directory handed to the isolation mechanism.
    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Name of the private subtree under the destination.
    #[must_use]
    pub fn private_root_name(&self) -> &str {
        &self.private_root_name
    }

    /// Absolute path of the private subtree (`{destination}/{private}`).
    #[must_use]
    pub fn private_root(&self) -> PathBuf {
        self.destination.join(&self.private_root_name)
    }

    /// Non-system host mountpoints relative to `/`, recorded at capture time.
    #[must_use]
    pub fn mountpoints(&self) -> &[PathBuf] {
        &self.mountpoints
    }
}

/// What: Owns a sandbox destination from capture to teardown.
///
/// Details:
/// - Once tree construction begins the destination belongs to the sandbox and
///   is removed on teardown, including when the value is dropped early.
/// - A destination rejected at capture time is never touched.
pub struct Sandbox {
    root: SandboxRoot,
    gateway: Gateway,
    state: SandboxState,
    owns_destination: bool,
}

impl Sandbox {
    /// New sandbox at `destination`; nothing is inspected yet.
    #[must_use]
    pub fn new(destination: impl Into<PathBuf>, gateway: Gateway) -> Self {
        Self {
            root: SandboxRoot {
                destination: destination.into(),
                private_root_name: PRIVATE_ROOT_NAME.to_string(),
                mountpoints: Vec::new(),
            },
            gateway,
            state: SandboxState::Created,
            owns_destination: false,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> SandboxState {
        self.state
    }

    /// Root description.
    #[must_use]
    pub const fn root(&self) -> &SandboxRoot {
        &self.root
    }

    /// Gateway used for every mutation.
    #[must_use]
    pub const fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    fn expect_state(&self, expected: SandboxState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Error::Process(format!(
                "sandbox is {}, expected {expected}",
                self.state
            )))
        }
    }

    /// What: Check the destination and record the host mountpoints.
    ///
    /// Output:
    /// - `Err(DestinationNotEmpty)` when the destination holds anything or is not
    ///   a directory; nothing has been mutated in that case.
    pub fn capture_mounts(&mut self) -> Result<()> {
        let mounts = mounts::capture_mounts()?;
        self.capture_mounts_with(mounts)
    }

    /// What: Like [`Self::capture_mounts`] with an already captured mount list.
    ///
    /// Inputs:
    /// - `mountpoints`: Relative, already filtered mountpoints.
    pub fn capture_mounts_with(&mut self, mountpoints: Vec<PathBuf>) -> Result<()> {
        self.expect_state(SandboxState::Created)?;
        ensure_empty_destination(&self.root.destination)?;
        tracing::debug!(count = mountpoints.len(), "captured host mountpoints");
        self.root.mountpoints = mountpoints;
        self.state = SandboxState::MountsCaptured;
        Ok(())
    }

    /// What: Create the destination and its private subtree, then merge `layout` into it.
    ///
    /// Output:
    /// - Build report; on any error the sandbox is torn down before returning.
    pub fn build(&mut self, layout: &OverlayLayout) -> Result<BuildReport> {
        self.expect_state(SandboxState::MountsCaptured)?;
        self.owns_destination = true;
        match self.build_tree(layout) {
            Ok(report) => {
                self.state = SandboxState::TreeBuilt;
                Ok(report)
            }
            Err(e) => {
                tracing::error!(error = %e, "building the sandbox tree failed");
                self.teardown_logged();
                Err(e)
            }
        }
    }

    fn build_tree(&mut self, layout: &OverlayLayout) -> Result<BuildReport> {
        let dest = self.root.destination.clone();
        if fs::symlink_metadata(&dest).is_err() {
            self.gateway.create_dir_all(&dest)?;
        }
        self.gateway.create_dir_all(&self.root.private_root())?;
        build_overlay(layout, &dest, &mut self.gateway)
    }

    /// What: Run `workload` against the built tree, then tear down.
    ///
    /// Output:
    /// - The workload's value, or its error; a teardown failure is reported only
    ///   when the workload itself succeeded.
    pub fn run<T, F>(&mut self, workload: F) -> Result<T>
    where
        F: FnOnce(&SandboxRoot) -> Result<T>,
    {
        self.expect_state(SandboxState::TreeBuilt)?;
        self.state = SandboxState::Running;
        let _span = tracing::info_span!("sandbox", root = %self.root.destination.display()).entered();
        let outcome = workload(&self.root);
        let teardown = self.teardown();
        match (outcome, teardown) {
            (Ok(value), Ok(())) => Ok(value),
            (Err(e), Err(te)) => {
                tracing::error!(error = %te, "teardown after failed workload also failed");
                Err(e)
            }
            (Ok(_), Err(e)) | (Err(e), Ok(())) => Err(e),
        }
    }

    /// What: Remove the destination (if owned) and enter `TornDown`.
    ///
    /// Details:
    /// - Idempotent; the removal goes through the gateway so dry-run and confirm
    ///   modes apply to it as well.
    pub fn teardown(&mut self) -> Result<()> {
        if self.state == SandboxState::TornDown {
            return Ok(());
        }
        self.state = SandboxState::TornDown;
        if !self.owns_destination {
            return Ok(());
        }
        self.owns_destination = false;
        let dest = &self.root.destination;
        tracing::info!(destination = %dest.display(), "Cleaning up...");
        if fs::symlink_metadata(dest).is_err() {
            return Ok(());
        }
        self.gateway.remove_tree(dest)?;
        Ok(())
    }

    fn teardown_logged(&mut self) {
        if let Err(e) = self.teardown() {
            tracing::error!(error = %e, destination = %self.root.destination.display(), "teardown failed");
        }
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        if self.state != SandboxState::TornDown {
            self.teardown_logged();
        }
    }
}

impl fmt::Debug for Sandbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sandbox")
            .field("root", &self.root)
            .field("state", &self.state)
            .field("gateway", &self.gateway)
            .finish_non_exhaustive()
    }
}

/// Reject a destination that exists as anything but an empty directory.
fn ensure_empty_destination(dest: &Path) -> Result<()> {
    match fs::symlink_metadata(dest) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
        Ok(meta) if !meta.is_dir() => Err(Error::DestinationNotEmpty {
            path: dest.to_path_buf(),
        }),
        Ok(_) => {
            if fs::read_dir(dest)?.next().is_some() {
                Err(Error::DestinationNotEmpty {
                    path: dest.to_path_buf(),
                })
            } else {
                Ok(())
            }
        }
    }
}

/// What: Full lifecycle in one call: capture, build, run, tear down.
///
/// Inputs:
/// - `destination`: Empty or missing directory for the sandbox root.
/// - `layout`: Sources and policies to merge.
/// - `gateway`: Mutation gateway for the whole run.
/// - `workload`: Runs with the built root; its value is returned.
///
/// Output:
/// - Workload value, or the first fatal error. Teardown has happened on every
///   path once construction began.
pub fn with_sandbox<T, F>(
    destination: &Path,
    layout: &OverlayLayout,
    gateway: Gateway,
    workload: F,
) -> Result<T>
where
    F: FnOnce(&SandboxRoot) -> Result<T>,
{
    let mut sandbox = Sandbox::new(destination, gateway);
    sandbox.capture_mounts()?;
    let report = sandbox.build(layout)?;
    tracing::debug!(?report, "sandbox tree ready");
    sandbox.run(workload)
}
