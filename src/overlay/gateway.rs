//! Single choke point for every filesystem mutation made while building or
//! tearing down a sandbox root.

use crate::error::{Error, Result};
use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::Path;

/// What: How mutations are handled for a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Log the action and perform nothing.
    DryRun,
    /// Ask the operator before each action.
    Confirm,
    /// Perform immediately.
    Execute,
}

/// What: Explicit per-run options selecting the gateway mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GatewayOptions {
    /// Log actions without performing them. Wins over `confirm_each_action`.
    pub dry_run: bool,
    /// Block for operator approval before each action.
    pub confirm_each_action: bool,
}

impl GatewayOptions {
    /// Mode implied by the options.
    #[must_use]
    pub const fn mode(self) -> Mode {
        if self.dry_run {
            Mode::DryRun
        } else if self.confirm_each_action {
            Mode::Confirm
        } else {
            Mode::Execute
        }
    }
}

/// A pending filesystem mutation.
#[derive(Debug, Clone, Copy)]
pub enum Action<'a> {
    /// `mkdir -p`.
    CreateDir(&'a Path),
    /// Create `link` pointing at `target`.
    Symlink {
        /// Link contents.
        target: &'a Path,
        /// Where the link is created.
        link: &'a Path,
    },
    /// `rm -r`.
    RemoveTree(&'a Path),
}

impl fmt::Display for Action<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateDir(p) => write!(f, "create_dir_all({})", p.display()),
            Self::Symlink { target, link } => {
                write!(f, "symlink({} -> {})", link.display(), target.display())
            }
            Self::RemoveTree(p) => write!(f, "remove_dir_all({})", p.display()),
        }
    }
}

/// Operator prompt used in confirm mode: `Ok(true)` approves, `Ok(false)` skips, `Err` aborts.
pub type Prompt = Box<dyn FnMut(&Action<'_>) -> Result<bool>>;

/// What: Executes, confirms, or merely logs filesystem mutations.
///
/// Details:
/// - Every method reports whether the action was actually performed.
pub struct Gateway {
    mode: Mode,
    prompt: Prompt,
    performed: usize,
    skipped: usize,
}

impl Gateway {
    /// Gateway for `options`, prompting on stdin in confirm mode.
    #[must_use]
    pub fn new(options: GatewayOptions) -> Self {
        Self::with_prompt(options, Box::new(stdin_prompt))
    }

    /// Gateway with a custom confirm-mode prompt.
    #[must_use]
    pub fn with_prompt(options: GatewayOptions, prompt: Prompt) -> Self {
        Self {
            mode: options.mode(),
            prompt,
            performed: 0,
            skipped: 0,
        }
    }

    /// Gateway that performs everything immediately.
    #[must_use]
    pub fn execute() -> Self {
        Self::new(GatewayOptions::default())
    }

    /// Active mode.
    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Number of actions performed so far.
    #[must_use]
    pub const fn performed(&self) -> usize {
        self.performed
    }

    /// Number of actions logged or refused without being performed.
    #[must_use]
    pub const fn skipped(&self) -> usize {
        self.skipped
    }

    /// What: Run one action through the gateway.
    ///
    /// Inputs:
    /// - `action`: Mutation to perform.
    ///
    /// Output:
    /// - `Ok(true)` when performed, `Ok(false)` when dry-run or refused by the
    ///   operator, `Err` on I/O failure or operator abort.
    pub fn perform(&mut self, action: Action<'_>) -> Result<bool> {
        tracing::trace!(action = %action, "gateway");
        match self.mode {
            Mode::DryRun => {
                tracing::info!(action = %action, "dry run: would perform");
                self.skipped += 1;
                return Ok(false);
            }
            Mode::Confirm => {
                if !(self.prompt)(&action)? {
                    tracing::info!(action = %action, "operator declined");
                    self.skipped += 1;
                    return Ok(false);
                }
            }
            Mode::Execute => {}
        }
        match action {
            Action::CreateDir(p) => std::fs::create_dir_all(p)?,
            Action::Symlink { target, link } => std::os::unix::fs::symlink(target, link)?,
            Action::RemoveTree(p) => std::fs::remove_dir_all(p)?,
        }
        self.performed += 1;
        Ok(true)
    }

    /// Create `path` and its parents.
    pub fn create_dir_all(&mut self, path: &Path) -> Result<bool> {
        self.perform(Action::CreateDir(path))
    }

    /// Create a symlink at `link` pointing to `target`.
    pub fn symlink(&mut self, target: &Path, link: &Path) -> Result<bool> {
        self.perform(Action::Symlink { target, link })
    }

    /// Recursively remove `path`.
    pub fn remove_tree(&mut self, path: &Path) -> Result<bool> {
        self.perform(Action::RemoveTree(path))
    }
}

impl fmt::Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("mode", &self.mode)
            .field("performed", &self.performed)
            .field("skipped", &self.skipped)
            .finish_non_exhaustive()
    }
}

/// What: Ask on stdin whether to perform `action`.
///
/// Output:
/// - `true` on empty input or `y`, `false` on `n`/`no`, `Err(Aborted)` on `q`.
///
/// Details:
/// - Defaults to "yes" so that pressing return simply steps through the actions.
fn stdin_prompt(action: &Action<'_>) -> Result<bool> {
    print!("going to {action} - OK? [Y/n/q]: ");
    io::stdout().flush().ok();
    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;
    let answer = input.trim();
    if answer.eq_ignore_ascii_case("q") || answer.eq_ignore_ascii_case("quit") {
        return Err(Error::Aborted);
    }
    Ok(!(answer.eq_ignore_ascii_case("n") || answer.eq_ignore_ascii_case("no")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    /// What: Dry-run performs nothing and reports not-performed.
    ///
    /// Inputs:
    /// - Directory creation and symlink requests in dry-run mode.
    ///
    /// Output:
    /// - `Ok(false)` for each; nothing appears on disk.
    ///
    /// Details:
    /// - Dry-run wins even when confirm is also requested.
    fn dry_run_touches_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let opts = GatewayOptions {
            dry_run: true,
            confirm_each_action: true,
        };
        let mut gw = Gateway::with_prompt(
            opts,
            Box::new(|_: &Action<'_>| -> Result<bool> { panic!("must not prompt") }),
        );
        assert_eq!(gw.mode(), Mode::DryRun);
        let sub = dir.path().join("a/b");
        assert!(!gw.create_dir_all(&sub).expect("dry"));
        assert!(!gw.symlink(Path::new("/x"), &dir.path().join("l")).expect("dry"));
        assert!(!sub.exists());
        assert!(std::fs::symlink_metadata(dir.path().join("l")).is_err());
        assert_eq!(gw.skipped(), 2);
        assert_eq!(gw.performed(), 0);
    }

    #[test]
    /// What: Confirm mode performs approved actions and skips refused ones.
    ///
    /// Inputs:
    /// - Prompt approving directory creation and refusing symlinks.
    ///
    /// Output:
    /// - Directory exists, link does not.
    ///
    /// Details:
    /// - The prompt sees the concrete action.
    fn confirm_mode_follows_operator() {
        let dir = tempfile::tempdir().expect("tempdir");
        let opts = GatewayOptions {
            dry_run: false,
            confirm_each_action: true,
        };
        let mut gw = Gateway::with_prompt(
            opts,
            Box::new(|a: &Action<'_>| -> Result<bool> { Ok(matches!(a, Action::CreateDir(_))) }),
        );
        let sub = dir.path().join("made");
        assert!(gw.create_dir_all(&sub).expect("approved"));
        assert!(!gw.symlink(Path::new("/x"), &sub.join("l")).expect("refused"));
        assert!(sub.is_dir());
        assert!(std::fs::symlink_metadata(sub.join("l")).is_err());
    }

    #[test]
    /// What: Operator abort propagates as an error.
    ///
    /// Inputs:
    /// - Prompt returning `Err(Aborted)`.
    ///
    /// Output:
    /// - The action fails with `Aborted` and nothing is created.
    ///
    /// Details:
    /// - Lets the lifecycle manager tear down early.
    fn confirm_mode_abort_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let opts = GatewayOptions {
            dry_run: false,
            confirm_each_action: true,
        };
        let mut gw = Gateway::with_prompt(
            opts,
            Box::new(|_: &Action<'_>| -> Result<bool> { Err(Error::Aborted) }),
        );
        let sub = dir.path().join("never");
        assert!(matches!(gw.create_dir_all(&sub), Err(Error::Aborted)));
        assert!(!sub.exists());
    }

    #[test]
    fn execute_mode_creates_links() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut gw = Gateway::execute();
        let link = dir.path().join("l");
        assert!(gw.symlink(Path::new("/__root/etc"), &link).expect("symlink"));
        assert_eq!(
            std::fs::read_link(&link).expect("read_link"),
            Path::new("/__root/etc")
        );
        assert!(gw.remove_tree(dir.path()).expect("remove"));
        assert!(!dir.path().exists());
    }
}
