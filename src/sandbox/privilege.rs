//! Run work in a forked child, optionally as an unprivileged user.

use crate::error::{Error, Result};
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{ForkResult, Gid, User, fork, setgid, setgroups, setuid};
use std::io::Write;

/// Exit code a child uses when it cannot switch to the target user.
const PRIVILEGE_DROP_FAILED: i32 = 126;

/// Exit code a child uses when the work panicked.
const WORK_PANICKED: i32 = 101;

/// What: Pick the account to drop to.
///
/// Inputs:
/// - `explicit`: User named by the caller, if any.
/// - `invoking`: Account that invoked the tool through sudo (`SUDO_USER`).
///
/// Output:
/// - The explicit name when given, otherwise the invoking user.
///
/// Details:
/// - Fails with `UserLookup` when neither is available and with
///   `SuperuserRefused` when the choice is literally `root`.
pub fn resolve_target_user(explicit: Option<&str>, invoking: Option<&str>) -> Result<String> {
    let name = explicit
        .or(invoking)
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| Error::UserLookup {
            name: String::new(),
            reason: "no user given and SUDO_USER is not set".to_string(),
        })?;
    if name == "root" {
        return Err(Error::SuperuserRefused {
            name: name.to_string(),
        });
    }
    Ok(name.to_string())
}

/// What: Resolve `name` to an account, refusing uid 0.
pub fn lookup_user(name: &str) -> Result<User> {
    let user = User::from_name(name)
        .map_err(|e| Error::UserLookup {
            name: name.to_string(),
            reason: e.to_string(),
        })?
        .ok_or_else(|| Error::UserLookup {
            name: name.to_string(),
            reason: "no such user".to_string(),
        })?;
    if user.uid.is_root() {
        return Err(Error::SuperuserRefused {
            name: name.to_string(),
        });
    }
    Ok(user)
}

/// What: Resolve the account a workload should run as.
///
/// Inputs:
/// - `explicit`: User named by the caller, if any.
/// - `invoking`: Value of `SUDO_USER`, if any.
///
/// Output:
/// - The looked-up account, never uid 0.
///
/// Details:
/// - Combines [`resolve_target_user`] and [`lookup_user`]; callers use it to
///   validate the target before any work starts.
pub fn target_account(explicit: Option<&str>, invoking: Option<&str>) -> Result<User> {
    let name = resolve_target_user(explicit, invoking)?;
    lookup_user(&name)
}

/// Drop supplementary groups, then group, then user.
fn become_user(user: &User) -> nix::Result<()> {
    setgroups(&[] as &[Gid])?;
    setgid(user.gid)?;
    setuid(user.uid)
}

/// What: Run `work` in a forked child and wait for it.
///
/// Inputs:
/// - `work`: Returns the child's exit code.
///
/// Output:
/// - The child's exit code; `128 + n` when it was killed by signal `n`.
///
/// Details:
/// - Whatever `work` changes about the process (credentials, cwd, env) dies
///   with the child.
pub fn run_isolated<F>(work: F) -> Result<i32>
where
    F: FnOnce() -> i32,
{
    // SAFETY: the process may have other threads (the non-blocking log
    // writer), and `work` allocates and may spawn processes, none of which is
    // async-signal-safe. A lock held by another thread at fork time (allocator,
    // stdio) stays locked in the child and can hang it. The child never logs
    // and leaves via `_exit` without running destructors or atexit handlers.
    match unsafe { fork() }? {
        ForkResult::Child => {
            let code = std::panic::catch_unwind(std::panic::AssertUnwindSafe(work))
                .unwrap_or(WORK_PANICKED);
            let _ = std::io::stdout().flush();
            let _ = std::io::stderr().flush();
            // SAFETY: terminates the child immediately; nothing runs afterwards.
            unsafe { nix::libc::_exit(code) }
        }
        ForkResult::Parent { child } => loop {
            match waitpid(child, None) {
                Ok(WaitStatus::Exited(_, code)) => return Ok(code),
                Ok(WaitStatus::Signaled(_, sig, _)) => return Ok(128 + sig as i32),
                Ok(status) => tracing::trace!(?status, "child status change"),
                Err(nix::errno::Errno::EINTR) => {}
                Err(e) => return Err(e.into()),
            }
        },
    }
}

/// What: Run `work` in a forked child as an unprivileged user.
///
/// Inputs:
/// - `work`: Returns the child's exit code.
/// - `user`: Account to drop to; `None` means the invoking user from `SUDO_USER`.
///
/// Output:
/// - Child exit code as in [`run_isolated`]. A missing `SUDO_USER`, an unknown
///   account or a superuser target fails before forking.
///
/// Details:
/// - The parent keeps its privileges so that it can still tear the sandbox down.
/// - Use [`run_isolated`] to run without any privilege change.
pub fn run_as_user<F>(work: F, user: Option<&str>) -> Result<i32>
where
    F: FnOnce() -> i32,
{
    let invoking = std::env::var("SUDO_USER").ok();
    let account = target_account(user, invoking.as_deref())?;
    tracing::info!(user = %account.name, uid = %account.uid, "dropping privileges for workload");
    run_isolated(move || match become_user(&account) {
        Ok(()) => work(),
        Err(e) => {
            eprintln!("cannot switch to user {}: {e}", account.name);
            PRIVILEGE_DROP_FAILED
        }
    })
}
