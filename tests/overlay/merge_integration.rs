//! Integration tests for the layered symlink merge.
//!
//! Tests cover:
//! - Coverage and priority when several roots share a directory
//! - Sacred paths resolving from the real root
//! - Prefer-existing files under a configured prefix
//! - Files winning over directories from lower-priority sources

#![cfg(test)]

use debroot::overlay::{BuildReport, Gateway, OverlayLayout, build_overlay};
use std::fs;
use std::path::{Path, PathBuf};

/// What: Three source trees plus an empty destination inside one temp dir.
struct Fixture {
    _tmp: tempfile::TempDir,
    r1: PathBuf,
    r2: PathBuf,
    real: PathBuf,
    dest: PathBuf,
}

/// What: Create the fixture directories.
///
/// Output:
/// - `Fixture` with `r1`, `r2`, `real` and `dest` existing and empty.
fn fixture() -> Fixture {
    let tmp = tempfile::tempdir().expect("tempdir");
    let base = tmp.path().to_path_buf();
    let f = Fixture {
        r1: base.join("r1"),
        r2: base.join("r2"),
        real: base.join("real"),
        dest: base.join("dest"),
        _tmp: tmp,
    };
    for d in [&f.r1, &f.r2, &f.real, &f.dest] {
        fs::create_dir_all(d).expect("mkdir");
    }
    f
}

fn touch(root: &Path, rel: &str) {
    let p = root.join(rel);
    fs::create_dir_all(p.parent().expect("parent")).expect("mkdir");
    fs::write(p, rel).expect("write");
}

fn link(dest: &Path, rel: &str) -> PathBuf {
    fs::read_link(dest.join(rel)).unwrap_or_else(|e| panic!("{rel} is not a link: {e}"))
}

fn build(layout: &OverlayLayout, dest: &Path) -> BuildReport {
    let mut gw = Gateway::execute();
    build_overlay(layout, dest, &mut gw).expect("build")
}

#[test]
/// What: Shared directory merges with first-source-wins for each child.
///
/// Inputs:
/// - R1 = {a/x, a/y}, R2 = {a/x, a/z}, real = {a/w}.
///
/// Output:
/// - `dest/a` is a real directory with exactly four links: x and y from R1,
///   z from R2, w from the real root.
///
/// Details:
/// - Exercises merge coverage and deterministic priority.
fn shared_directory_merges_by_priority() {
    let f = fixture();
    touch(&f.r1, "a/x");
    touch(&f.r1, "a/y");
    touch(&f.r2, "a/x");
    touch(&f.r2, "a/z");
    touch(&f.real, "a/w");
    let layout = OverlayLayout::new([&f.r1, &f.r2]).with_real_root(&f.real);

    let report = build(&layout, &f.dest);

    let a = f.dest.join("a");
    assert!(fs::symlink_metadata(&a).expect("a").is_dir());
    let mut names: Vec<String> = fs::read_dir(&a)
        .expect("list")
        .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, ["w", "x", "y", "z"]);
    assert_eq!(link(&f.dest, "a/x"), layout.link_target(&f.r1, Path::new("a/x")));
    assert_eq!(link(&f.dest, "a/y"), layout.link_target(&f.r1, Path::new("a/y")));
    assert_eq!(link(&f.dest, "a/z"), layout.link_target(&f.r2, Path::new("a/z")));
    assert_eq!(link(&f.dest, "a/w"), layout.link_target(&f.real, Path::new("a/w")));
    assert_eq!(report.placed, 4);
    assert_eq!(report.merged_dirs, 1);
}

#[test]
/// What: A sacred path is linked to the real root even when overlays define it.
///
/// Inputs:
/// - R1 and real both contain `home/...`; `/home/` configured as sacred.
///
/// Output:
/// - `dest/home` is a single link into the real root; nothing from R1 appears.
///
/// Details:
/// - Trailing slashes in configured paths are irrelevant.
fn sacred_path_comes_from_real_root() {
    let f = fixture();
    touch(&f.r1, "home/intruder");
    touch(&f.real, "home/user/notes");
    let layout = OverlayLayout::new([&f.r1])
        .with_real_root(&f.real)
        .with_sacred(["/home/"]);

    build(&layout, &f.dest);

    assert_eq!(link(&f.dest, "home"), layout.link_target(&f.real, Path::new("home")));
}

#[test]
/// What: Existing real-root files under a prefer-existing prefix win.
///
/// Inputs:
/// - R1 = {etc/app.conf, etc/new.conf}, real = {etc/app.conf}; prefix `/etc`.
///
/// Output:
/// - `etc/app.conf` links to the real root, `etc/new.conf` to R1.
///
/// Details:
/// - Paths defined by a single source are placed before prefer-existing applies.
fn prefer_existing_keeps_host_files() {
    let f = fixture();
    touch(&f.r1, "etc/app.conf");
    touch(&f.r1, "etc/new.conf");
    touch(&f.real, "etc/app.conf");
    let layout = OverlayLayout::new([&f.r1])
        .with_real_root(&f.real)
        .with_prefer_existing(["/etc"]);

    build(&layout, &f.dest);

    assert_eq!(
        link(&f.dest, "etc/app.conf"),
        layout.link_target(&f.real, Path::new("etc/app.conf"))
    );
    assert_eq!(
        link(&f.dest, "etc/new.conf"),
        layout.link_target(&f.r1, Path::new("etc/new.conf"))
    );
}

#[test]
/// What: Without the prefix the overlay copy wins.
///
/// Inputs:
/// - Same trees as the prefer-existing case, no prefixes configured.
///
/// Output:
/// - `etc/app.conf` links to R1.
///
/// Details:
/// - Guards against prefer-existing leaking into the default policy.
fn overlay_file_wins_without_prefer_existing() {
    let f = fixture();
    touch(&f.r1, "etc/app.conf");
    touch(&f.real, "etc/app.conf");
    let layout = OverlayLayout::new([&f.r1]).with_real_root(&f.real);

    build(&layout, &f.dest);

    assert_eq!(
        link(&f.dest, "etc/app.conf"),
        layout.link_target(&f.r1, Path::new("etc/app.conf"))
    );
}

#[test]
/// What: A top-priority file shadows a lower-priority directory.
///
/// Inputs:
/// - R1 has `opt` as a file, real has `opt/` as a directory.
///
/// Output:
/// - `dest/opt` is one link to R1; nothing is merged.
///
/// Details:
/// - Non-directories are never merged.
fn file_beats_directory() {
    let f = fixture();
    touch(&f.r1, "opt");
    touch(&f.real, "opt/tool/bin");
    let layout = OverlayLayout::new([&f.r1]).with_real_root(&f.real);

    let report = build(&layout, &f.dest);

    assert_eq!(link(&f.dest, "opt"), layout.link_target(&f.r1, Path::new("opt")));
    assert_eq!(report.merged_dirs, 0);
}

#[test]
/// What: A lower-priority file inside a merged directory is dropped with a count.
///
/// Inputs:
/// - R1 and real have `lib/` as directories, R2 has `lib` as a file.
///
/// Output:
/// - `dest/lib` is merged from R1 and real; the report counts one unmergeable entry.
///
/// Details:
/// - The dropped contribution is logged, not fatal.
fn unmergeable_contribution_is_dropped() {
    let f = fixture();
    touch(&f.r1, "lib/one.so");
    touch(&f.r2, "lib");
    touch(&f.real, "lib/two.so");
    let layout = OverlayLayout::new([&f.r1, &f.r2]).with_real_root(&f.real);

    let report = build(&layout, &f.dest);

    assert_eq!(report.unmergeable, 1);
    assert!(fs::symlink_metadata(f.dest.join("lib")).expect("lib").is_dir());
    assert_eq!(link(&f.dest, "lib/one.so"), layout.link_target(&f.r1, Path::new("lib/one.so")));
    assert_eq!(
        link(&f.dest, "lib/two.so"),
        layout.link_target(&f.real, Path::new("lib/two.so"))
    );
}
