//! Undoing a preseed run.
//!
//! Removes everything listed in the artifact catalog from a chroot so the
//! image can be preseeded again. Running it on a clean tree is a no-op.

use crate::artifacts::{self, ArtifactKind};
use crate::error::{Error, Result};
use crate::paths::{absolute, Dirs};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Remove all preseed artifacts from the chroot at `path`.
///
/// `path` may be relative; errors always report the absolute path. The state
/// file is removed last, so an interrupted reset still looks preseeded and
/// can simply be rerun.
pub fn reset_preseeded_chroot(path: &Path, dirs: &Dirs) -> Result<()> {
    let root = absolute(path)?;

    match fs::metadata(&root) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => return Err(Error::TargetNotDirectory(root)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(Error::TargetMissing(root));
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!(root = %root.display(), "resetting preseeded chroot");

    let mut removed = 0usize;
    for entry in artifacts::catalog(dirs) {
        let matches = entry
            .expand(&root)
            .map_err(|e| Error::remove(artifacts_dir(&root, &entry.path), e))?;

        // Decide ownership for every completer before touching any of them;
        // aliases resolve through their siblings.
        let matches: Vec<PathBuf> = match entry.kind {
            ArtifactKind::Tree => matches,
            ArtifactKind::CompletionSymlink => matches
                .into_iter()
                .filter(|p| artifacts::is_complete_sh_symlink(p))
                .collect(),
        };

        for path in &matches {
            if remove_path(path)? {
                tracing::debug!(path = %path.display(), "removed");
                removed += 1;
            }
        }
    }

    tracing::info!(root = %root.display(), removed, "reset complete");
    Ok(())
}

/// Remove a file, symlink or directory tree. Returns false if it was already gone.
fn remove_path(path: &Path) -> Result<bool> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(Error::remove(path, e)),
    };

    let res = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    match res {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::remove(path, e)),
    }
}

fn artifacts_dir(root: &Path, pattern: &Path) -> PathBuf {
    let full = crate::paths::join_root(root, pattern);
    full.parent().map(Path::to_path_buf).unwrap_or(full)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;
    use std::os::unix::fs::symlink;
    use tempfile::TempDir;

    /// (path relative to the chroot, symlink target or None for a plain file)
    const ARTIFACTS: &[(&str, Option<&str>)] = &[
        ("var/lib/snapd/state.json", None),
        ("var/lib/snapd/system-key", None),
        ("var/lib/snapd/desktop/applications/foo.desktop", None),
        ("var/lib/snapd/desktop/icons/foo.png", None),
        ("var/lib/snapd/mount/foo.fstab", None),
        ("var/lib/snapd/snaps/foo.snap", None),
        ("etc/udev/rules.d/foo-snap.bar.rules", None),
        ("etc/dbus-1/system.d/snap.foo.bar.conf", None),
        ("var/lib/snapd/dbus-1/services/org.example.Session.service", None),
        ("var/lib/snapd/dbus-1/system-services/org.example.System.service", None),
        ("etc/systemd/system/snap.foo.service", None),
        ("etc/systemd/system/snap.foo.timer", None),
        ("etc/systemd/system/snap.foo.socket", None),
        ("etc/systemd/system/snap-foo.mount", None),
        ("etc/systemd/system/multi-user.target.wants/snap-foo.mount", None),
        ("var/snap/foo/bar", None),
        ("var/cache/snapd/foocache/bar", None),
        ("var/cache/apparmor/foo/bar", None),
        ("var/lib/snapd/apparmor/profiles/foo", None),
        ("var/lib/snapd/assertions/foo", None),
        ("var/lib/snapd/features/foo", None),
        ("var/lib/snapd/device/foo-1/bar", None),
        ("var/lib/snapd/cookie/foo", None),
        ("var/lib/snapd/sequence/foo.json", None),
        ("snap/foo/bin", None),
        ("var/lib/snapd/seccomp/bpf/foo.bin", None),
        ("var/lib/snapd/inhibit/foo.lock", None),
        ("usr/share/bash-completion/completions/foo.bar", Some("/a/snapd/complete.sh")),
        ("usr/share/bash-completion/completions/foo", Some("foo.bar")),
    ];

    /// Files that look similar to artifacts but belong to the base system.
    const KEEP: &[(&str, Option<&str>)] = &[
        ("etc/systemd/system/snapd.service", None),
        ("etc/systemd/system/multi-user.target.wants/ssh.service", None),
        ("etc/udev/rules.d/70-persistent.rules", None),
        ("var/lib/snapd/seed/seed.yaml", None),
        ("var/lib/snapd/sequence/README", None),
        ("usr/share/bash-completion/completions/git", None),
        ("usr/share/bash-completion/completions/apt", Some("/usr/share/bash-completion/helpers/apt")),
    ];

    fn populate(root: &Path, files: &[(&str, Option<&str>)]) {
        for (rel, target) in files {
            let full = root.join(rel);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            match target {
                Some(target) => symlink(target, &full).unwrap(),
                None => fs::write(&full, "").unwrap(),
            }
        }
    }

    fn exists(path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    fn check_reset(root: &Path, arg: &Path) {
        populate(root, ARTIFACTS);
        populate(root, KEEP);
        for (rel, _) in ARTIFACTS {
            assert!(exists(&root.join(rel)), "missing fixture {}", rel);
        }

        let dirs = Dirs::default();
        reset_preseeded_chroot(arg, &dirs).unwrap();

        for (rel, _) in ARTIFACTS {
            assert!(!exists(&root.join(rel)), "left behind {}", rel);
        }
        for (rel, _) in KEEP {
            assert!(exists(&root.join(rel)), "removed {}", rel);
        }

        // Running it again is fine.
        reset_preseeded_chroot(arg, &dirs).unwrap();

        let dummy = arg.join("foo");
        fs::write(&dummy, "").unwrap();
        let err = reset_preseeded_chroot(&dummy, &dirs).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("cannot reset {:?}, it is not a directory", root.join("foo"))
        );
    }

    #[test]
    fn test_reset_absolute_path() {
        let temp = TempDir::new().unwrap();
        check_reset(temp.path(), temp.path());
    }

    #[test]
    fn test_reset_relative_path() {
        let _serial = testutil::serial();
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("chroot");
        fs::create_dir(&root).unwrap();

        let cwd = std::env::current_dir().unwrap();
        std::env::set_current_dir(temp.path()).unwrap();
        // The tmp dir may sit behind a symlink; compare against what the
        // process sees as its working directory.
        let root = std::env::current_dir().unwrap().join("chroot");
        check_reset(&root, Path::new("chroot"));
        std::env::set_current_dir(cwd).unwrap();
    }

    #[test]
    fn test_reset_through_parent_dir() {
        let _serial = testutil::serial();
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("sub")).unwrap();
        let cwd = std::env::current_dir().unwrap();
        std::env::set_current_dir(temp.path().join("sub")).unwrap();
        let parent = std::env::current_dir().unwrap().parent().unwrap().to_path_buf();
        let root = parent.join("chroot");
        populate(&root, ARTIFACTS);

        let dirs = Dirs::default();
        let res = reset_preseeded_chroot(Path::new("../chroot"), &dirs);
        let missing = reset_preseeded_chroot(Path::new("../nope"), &dirs);
        std::env::set_current_dir(cwd).unwrap();

        res.unwrap();
        for (rel, _) in ARTIFACTS {
            assert!(!exists(&root.join(rel)), "left behind {}", rel);
        }
        assert_eq!(
            missing.unwrap_err().to_string(),
            format!("cannot reset non-existing directory {:?}", parent.join("nope"))
        );
    }

    #[test]
    fn test_reset_missing_target() {
        let err = reset_preseeded_chroot(Path::new("/non/existing/chrootpath"), &Dirs::default())
            .unwrap_err();
        assert!(matches!(err, Error::TargetMissing(_)));
        assert_eq!(
            err.to_string(),
            r#"cannot reset non-existing directory "/non/existing/chrootpath""#
        );
    }

    #[test]
    fn test_reset_alt_snap_mount_dir() {
        let temp = TempDir::new().unwrap();
        populate(
            temp.path(),
            &[
                ("etc/os-release", None),
                ("var/lib/snapd/snap/foo/bin", None),
                ("snap/unrelated", None),
            ],
        );
        fs::write(temp.path().join("etc/os-release"), "ID=fedora\n").unwrap();

        let dirs = Dirs::default().adapt_to_distro(temp.path());
        reset_preseeded_chroot(temp.path(), &dirs).unwrap();

        assert!(!exists(&temp.path().join("var/lib/snapd/snap/foo")));
        assert!(exists(&temp.path().join("snap/unrelated")));
    }

    #[test]
    fn test_reset_does_not_follow_symlinks() {
        let temp = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("precious"), "").unwrap();

        let data = temp.path().join("var/snap");
        fs::create_dir_all(&data).unwrap();
        symlink(outside.path(), data.join("foo")).unwrap();

        reset_preseeded_chroot(temp.path(), &Dirs::default()).unwrap();

        assert!(!exists(&data.join("foo")));
        assert!(outside.path().join("precious").exists());
    }
}
