//! Integration tests for the sandbox lifecycle around a real overlay build.
//!
//! Tests cover:
//! - Teardown after a failure in the middle of tree construction
//! - Teardown after a listing failure made fatal by strict listing
//! - Rejection of a populated destination before any mutation
//! - End-to-end run of a host command through `with_sandbox`

#![cfg(test)]

use debroot::error::Error;
use debroot::overlay::{Action, Gateway, GatewayOptions, OverlayLayout};
use debroot::sandbox::{Sandbox, SandboxState, run_command, sandbox_command, with_sandbox};
use std::fs;
use std::path::Path;

const CONFIRM: GatewayOptions = GatewayOptions {
    dry_run: false,
    confirm_each_action: true,
};

/// What: One package root and a real root with a few entries.
///
/// Output:
/// - Layout over `{tmp}/pkg` with `{tmp}/real` as the real root.
fn layout(tmp: &Path) -> OverlayLayout {
    let pkg = tmp.join("pkg");
    let real = tmp.join("real");
    for rel in ["usr/bin/tool", "usr/share/doc/tool/README"] {
        let p = pkg.join(rel);
        fs::create_dir_all(p.parent().expect("parent")).expect("mkdir");
        fs::write(p, rel).expect("write");
    }
    for rel in ["usr/bin/boom", "etc/hostname"] {
        let p = real.join(rel);
        fs::create_dir_all(p.parent().expect("parent")).expect("mkdir");
        fs::write(p, rel).expect("write");
    }
    OverlayLayout::new([pkg]).with_real_root(real)
}

#[test]
/// What: A failure while placing links tears the destination down.
///
/// Inputs:
/// - Confirm-mode gateway whose operator aborts when asked to link `usr/bin/boom`.
///
/// Output:
/// - `build` returns `Aborted`, the sandbox is `TornDown` and the destination is gone.
///
/// Details:
/// - The removal itself also passes through the gateway and is approved.
fn builder_failure_tears_down() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let layout = layout(tmp.path());
    let dest = tmp.path().join("dest");
    let gateway = Gateway::with_prompt(
        CONFIRM,
        Box::new(|action: &Action<'_>| -> debroot::Result<bool> {
            match action {
                Action::Symlink { link, .. } if link.ends_with("usr/bin/boom") => Err(Error::Aborted),
                _ => Ok(true),
            }
        }),
    );
    let mut sandbox = Sandbox::new(&dest, gateway);
    sandbox.capture_mounts_with(Vec::new()).expect("capture");

    let result = sandbox.build(&layout);

    assert!(matches!(result, Err(Error::Aborted)));
    assert_eq!(sandbox.state(), SandboxState::TornDown);
    assert!(!dest.exists());
}

#[test]
/// What: A strict listing failure is fatal and tears the destination down.
///
/// Inputs:
/// - Strict-listing layout; the package's `usr` turns into a dangling link
///   while the merged `usr` is being created in the destination.
///
/// Output:
/// - `build` returns `ListingFailure` for the package's `usr`; the sandbox is
///   `TornDown` and the destination is gone.
///
/// Details:
/// - Without strict listing the same build skips the source and continues.
fn strict_listing_failure_tears_down() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let layout = layout(tmp.path()).with_strict_listing(true);
    let dest = tmp.path().join("dest");
    let vanishing = tmp.path().join("pkg/usr");
    let expected = vanishing.clone();
    let gateway = Gateway::with_prompt(
        CONFIRM,
        Box::new(move |action: &Action<'_>| -> debroot::Result<bool> {
            if let Action::CreateDir(p) = action
                && p.ends_with("usr")
                && vanishing.is_dir()
            {
                fs::remove_dir_all(&vanishing)?;
                std::os::unix::fs::symlink("/nonexistent-debroot-source", &vanishing)?;
            }
            Ok(true)
        }),
    );
    let mut sandbox = Sandbox::new(&dest, gateway);
    sandbox.capture_mounts_with(Vec::new()).expect("capture");

    let result = sandbox.build(&layout);

    match result {
        Err(Error::ListingFailure { path, .. }) => assert_eq!(path, expected),
        other => panic!("expected ListingFailure, got {other:?}"),
    }
    assert_eq!(sandbox.state(), SandboxState::TornDown);
    assert!(!dest.exists());
}

#[test]
/// What: A populated destination is refused before the gateway is ever consulted.
///
/// Inputs:
/// - Destination holding a file; confirm gateway whose prompt panics.
///
/// Output:
/// - `DestinationNotEmpty`; the file is untouched.
///
/// Details:
/// - Uses the full `with_sandbox` path including the real mount table.
fn populated_destination_is_refused() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let layout = layout(tmp.path());
    let dest = tmp.path().join("dest");
    fs::create_dir_all(&dest).expect("mkdir");
    fs::write(dest.join("precious"), "keep").expect("write");
    let gateway = Gateway::with_prompt(
        CONFIRM,
        Box::new(|a: &Action<'_>| -> debroot::Result<bool> { panic!("unexpected action {a}") }),
    );

    let result = with_sandbox(&dest, &layout, gateway, |_| Ok(0));

    assert!(matches!(result, Err(Error::DestinationNotEmpty { .. })));
    assert_eq!(fs::read_to_string(dest.join("precious")).expect("read"), "keep");
}

#[test]
/// What: `with_sandbox` runs host commands against the tree and cleans up afterwards.
///
/// Inputs:
/// - Workload running `test` without chroot against the merged `usr` and the linked `etc`.
///
/// Output:
/// - `usr` is a directory, `etc` a symlink; destination removed afterwards.
///
/// Details:
/// - `etc` is only defined by the real root, so it is placed as a single link.
fn with_sandbox_runs_and_cleans_up() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let layout = layout(tmp.path());
    let dest = tmp.path().join("dest");

    let code = with_sandbox(&dest, &layout, Gateway::execute(), |root| {
        assert!(root.private_root().is_dir());
        let test = |flag: &str, rel: &str| -> debroot::Result<i32> {
            let path = root.destination().join(rel).to_string_lossy().into_owned();
            let argv = vec!["test".to_string(), flag.to_string(), path];
            run_command(&mut sandbox_command(root, &argv, false)?)
        };
        assert_eq!(test("-d", "usr")?, 0, "usr is merged into a directory");
        test("-L", "etc")
    })
    .expect("sandbox");

    assert_eq!(code, 0);
    assert!(!dest.exists());
}
