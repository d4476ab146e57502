//! The default action: resolve, materialize, build the sandbox and run the command.

use crate::args::{Args, deps, utils};
use debroot::error::{Error, Result};
use debroot::index::{HttpIndexFetcher, PackageIndex};
use debroot::job::{JobSpec, Policy};
use debroot::logic::deps::closure;
use debroot::materialize::{DebMaterializer, materialize_all};
use debroot::overlay::{Gateway, GatewayOptions, OverlayLayout};
use debroot::sandbox::{
    SandboxRoot, resolve_env, run_as_user, run_command, sandbox_command, target_account,
    with_sandbox,
};
use debroot::util::config::Settings;
use debroot::util::paths::{absolutize, default_cache_dir};
use std::path::PathBuf;

/// Exit code the child reports when the command could not be started.
const COMMAND_NOT_STARTED: i32 = 127;

/// What: Everything decided before the first filesystem mutation.
#[derive(Debug)]
struct Plan {
    job: JobSpec,
    policy: Policy,
    cache_dir: PathBuf,
    destination: PathBuf,
    argv: Vec<String>,
    chroot: bool,
    user: Option<String>,
    gateway: GatewayOptions,
}

/// What: Combine settings, job and command line into a [`Plan`].
///
/// Details:
/// - Command-line values win over the job, the job over settings.
/// - The target user is resolved and looked up here, so an unknown account or
///   a superuser target fails before the sandbox exists.
/// - An empty command is allowed with `--pause`: the tree is built for
///   inspection only.
fn plan(args: &Args, settings: &Settings) -> Result<Plan> {
    let job = JobSpec::load(args.job.as_deref())?;
    let policy = job
        .policy(settings)
        .extended(&args.never_overlay, &args.prefer_existing);

    let cache_dir = absolutize(
        &args
            .cache_dir
            .clone()
            .or_else(|| settings.cache_dir.clone())
            .unwrap_or_else(default_cache_dir),
    );

    let destination = match &args.dest {
        Some(d) => absolutize(d),
        None => {
            let parent = settings
                .dest_parent
                .clone()
                .unwrap_or_else(std::env::temp_dir);
            utils::fresh_destination(&absolutize(&parent), &job.package)
        }
    };

    let argv = if args.exec {
        args.command.clone()
    } else {
        if !args.command.is_empty() {
            tracing::warn!("ignoring trailing command without --exec");
        }
        job.command.clone()
    };
    if argv.is_empty() && !args.print_deps && !args.pause {
        return Err(Error::InvalidJob(
            "no command: set `command` in the job, use --exec -- COMMAND, or --pause to inspect the tree"
                .to_string(),
        ));
    }

    let user = if args.user.is_some() || args.drop_privileges {
        let invoking = std::env::var("SUDO_USER").ok();
        let account = target_account(args.user.as_deref(), invoking.as_deref())?;
        Some(account.name)
    } else {
        None
    };

    Ok(Plan {
        job,
        policy,
        cache_dir,
        destination,
        argv,
        chroot: !args.no_chroot,
        user,
        gateway: GatewayOptions {
            dry_run: args.dry_run,
            confirm_each_action: args.confirm || settings.confirm,
        },
    })
}

/// What: Start the command inside the built sandbox and wait for it.
///
/// Output:
/// - The command's exit code; `0` without running anything in dry-run mode
///   or when there is no command.
fn run_workload(plan: &Plan, root: &SandboxRoot) -> Result<i32> {
    if plan.argv.is_empty() {
        tracing::info!(root = %root.destination().display(), "no command; tree built for inspection");
        return Ok(0);
    }
    let mut cmd = sandbox_command(root, &plan.argv, plan.chroot)?;
    cmd.envs(resolve_env(
        &plan.job.env,
        root.destination(),
        plan.chroot,
        |name| std::env::var(name).ok(),
    ));
    if plan.gateway.dry_run {
        tracing::info!(command = ?cmd, "dry run: would run command");
        return Ok(0);
    }
    println!("running cmd: {:?}", plan.argv);
    match plan.user.as_deref() {
        None => run_command(&mut cmd),
        Some(user) => run_as_user(
            move || match run_command(&mut cmd) {
                Ok(code) => code,
                Err(e) => {
                    eprintln!("cannot run command: {e}");
                    COMMAND_NOT_STARTED
                }
            },
            Some(user),
        ),
    }
}

/// What: Handle a full run.
///
/// Inputs:
/// - `args`: Parsed command line.
///
/// Output:
/// - Exit code for the process: the command's own code, or `0` after
///   `--print-deps`.
///
/// Details:
/// - Order: load settings and job, fetch indexes, resolve the closure,
///   materialize packages, then build, run and tear down the sandbox.
pub fn handle_run(args: &Args) -> Result<i32> {
    let settings = Settings::load();
    let plan = plan(args, &settings)?;
    tracing::info!(package = %plan.job.package, cache = %plan.cache_dir.display(), "starting");

    let fetcher = HttpIndexFetcher::new(&plan.cache_dir);
    let index = PackageIndex::build(&plan.job.repos, &fetcher)?;
    if args.print_deps {
        return deps::handle_print_deps(&plan.job.package, &index, args.json);
    }

    let ids = closure(&plan.job.package, &index, &plan.policy.exclude)?;
    tracing::info!(count = ids.len(), "dependency closure resolved");
    let roots = materialize_all(&ids, &index, &DebMaterializer::new(&plan.cache_dir))?;

    let layout = OverlayLayout::new(roots)
        .with_sacred(&plan.policy.sacred)
        .with_prefer_existing(&plan.policy.prefer_existing)
        .with_strict_listing(args.strict_listing);

    tracing::info!(destination = %plan.destination.display(), "making sandbox");
    with_sandbox(&plan.destination, &layout, Gateway::new(plan.gateway), |root| {
        let result = run_workload(&plan, root);
        if args.pause {
            utils::pause(&format!(
                "Command exited. Press return to continue cleanup (root = {})",
                root.destination().display()
            ));
        }
        result
    })
}
