//! Sandbox lifecycle: an owned destination directory that holds a merged
//! overlay tree for the lifetime of one workload.
//!
//! A [`Sandbox`] moves through `Created → MountsCaptured → TreeBuilt → Running →
//! TornDown`. Every filesystem mutation goes through the [`crate::overlay::Gateway`]
//! it was created with, and the destination is removed on every exit path once
//! construction has begun. Workloads are started with [`sandbox_command`] and may
//! run in a forked child under a different account via [`run_as_user`].

mod launch;
mod lifecycle;
mod mounts;
mod privilege;

pub use launch::{EnvValue, PROOT, exit_code, resolve_env, run_command, sandbox_command};
pub use lifecycle::{Sandbox, SandboxRoot, SandboxState, with_sandbox};
pub use mounts::{SYSTEM_MOUNTPOINTS, capture_mounts, filter_protected};
pub use privilege::{lookup_user, resolve_target_user, run_as_user, run_isolated, target_account};
