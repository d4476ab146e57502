//! Command-line argument definition.

use clap::Parser;
use std::path::PathBuf;

/// debroot - run a Debian package from a throwaway overlay of the host root
#[derive(Parser, Debug)]
#[command(name = "debroot")]
#[command(version)]
#[command(
    about = "Run a Debian package and its dependencies from a throwaway overlay of the host root",
    long_about = None
)]
#[allow(clippy::struct_excessive_bools)]
pub struct Args {
    /// Job file (YAML or JSON); `-` or nothing reads the job from stdin
    pub job: Option<PathBuf>,

    /// Print the dependency closure of the job's package and exit
    #[arg(long)]
    pub print_deps: bool,

    /// Print the closure as a JSON array (use with --print-deps)
    #[arg(long, requires = "print_deps")]
    pub json: bool,

    /// Run the command directly on the host instead of entering the overlay with proot
    #[arg(long)]
    pub no_chroot: bool,

    /// Run the command given after `--` instead of the job's command
    #[arg(long)]
    pub exec: bool,

    /// Set the logging level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Enable verbose output (equivalent to --log-level debug)
    #[arg(short, long)]
    pub verbose: bool,

    /// Wait for return before cleaning up, to inspect the overlay
    #[arg(long)]
    pub pause: bool,

    /// Log every filesystem change instead of performing it
    #[arg(long)]
    pub dry_run: bool,

    /// Ask before every filesystem change
    #[arg(long)]
    pub confirm: bool,

    /// Sandbox root to create (must be missing or empty); defaults to a fresh temporary path
    #[arg(long, value_name = "DIR")]
    pub dest: Option<PathBuf>,

    /// Download and unpack cache (default: $XDG_CACHE_HOME/debroot)
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Run the command as this user
    #[arg(long, value_name = "NAME", conflicts_with = "drop_privileges")]
    pub user: Option<String>,

    /// Run the command as the user that invoked sudo ($SUDO_USER)
    #[arg(long)]
    pub drop_privileges: bool,

    /// Always take this path from the host (repeatable)
    #[arg(long = "never-overlay", value_name = "PATH")]
    pub never_overlay: Vec<String>,

    /// Prefer existing host files under this prefix (repeatable)
    #[arg(long = "prefer-existing", value_name = "PATH")]
    pub prefer_existing: Vec<String>,

    /// Abort when a source directory cannot be listed instead of skipping it
    #[arg(long)]
    pub strict_listing: bool,

    /// Command for --exec
    #[arg(last = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}
