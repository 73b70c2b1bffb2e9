//! Catalog of paths a preseeding run leaves behind.
//!
//! Each entry is a root-relative path whose last component may contain `*`
//! wildcards. Entries are expanded with `glob` against a concrete root right
//! before removal; a missing parent directory simply expands to nothing.

use crate::paths::{join_root, Dirs};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Suffix of the snapd bash completion helper that completer symlinks point to.
pub const COMPLETE_SH_SUFFIX: &str = "/snapd/complete.sh";

/// How matches of an entry are removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Files and symlinks are unlinked, directories removed recursively.
    Tree,
    /// Only symlinks owned by snapd's completion helper are unlinked.
    CompletionSymlink,
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactEntry {
    /// Root-relative path; the file name may be a wildcard pattern.
    pub path: PathBuf,
    pub kind: ArtifactKind,
}

impl ArtifactEntry {
    fn tree(dir: &Path, pattern: &str) -> Self {
        Self {
            path: dir.join(pattern),
            kind: ArtifactKind::Tree,
        }
    }

    fn file(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            kind: ArtifactKind::Tree,
        }
    }

    /// Expand the entry against `root`, returning existing matches.
    pub fn expand(&self, root: &Path) -> io::Result<Vec<PathBuf>> {
        let full = join_root(root, &self.path);
        let Some(name) = full.file_name() else {
            return Ok(Vec::new());
        };

        // glob follows symlinks when checking literal paths, which would
        // hide a dangling link such as a stale system-key.
        if !name.to_string_lossy().contains('*') {
            return match fs::symlink_metadata(&full) {
                Ok(_) => Ok(vec![full]),
                Err(e) if is_absent(&e) => Ok(Vec::new()),
                Err(e) => Err(e),
            };
        }

        let root = root.to_str().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("non UTF-8 root {:?}", root),
            )
        })?;
        let rel = self.path.to_string_lossy();
        let pattern = format!(
            "{}/{}",
            glob::Pattern::escape(root.trim_end_matches('/')),
            rel.trim_start_matches('/')
        );

        let paths = glob::glob(&pattern)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        let mut matches = Vec::new();
        for entry in paths {
            match entry {
                Ok(path) => matches.push(path),
                Err(e) => {
                    let err = e.into_error();
                    if !is_absent(&err) {
                        return Err(err);
                    }
                }
            }
        }
        Ok(matches)
    }
}

/// Every artifact a preseeding run can produce, state file last.
pub fn catalog(dirs: &Dirs) -> Vec<ArtifactEntry> {
    let services = dirs.snap_services_dir.as_path();

    vec![
        ArtifactEntry::file(&dirs.snap_system_key_file),
        ArtifactEntry::tree(&dirs.snap_desktop_files_dir, "*.desktop"),
        ArtifactEntry::tree(&dirs.snap_desktop_icons_dir, "*"),
        ArtifactEntry::tree(&dirs.snap_mount_policy_dir, "*.fstab"),
        ArtifactEntry::tree(&dirs.snap_blob_dir, "*.snap"),
        ArtifactEntry::tree(&dirs.snap_udev_rules_dir, "*-snap.*.rules"),
        ArtifactEntry::tree(&dirs.snap_dbus_system_policy_dir, "snap.*.conf"),
        ArtifactEntry::tree(&dirs.snap_dbus_session_services_dir, "*.service"),
        ArtifactEntry::tree(&dirs.snap_dbus_system_services_dir, "*.service"),
        ArtifactEntry::tree(services, "snap.*.service"),
        ArtifactEntry::tree(services, "snap.*.timer"),
        ArtifactEntry::tree(services, "snap.*.socket"),
        ArtifactEntry::tree(services, "snap-*.mount"),
        ArtifactEntry::tree(&services.join("multi-user.target.wants"), "snap-*.mount"),
        ArtifactEntry::tree(&services.join("default.target.wants"), "snap-*.mount"),
        ArtifactEntry::tree(&services.join("snapd.mounts.target.wants"), "snap-*.mount"),
        ArtifactEntry::tree(&dirs.snap_data_dir, "*"),
        ArtifactEntry::tree(&dirs.snap_cache_dir, "*"),
        ArtifactEntry::tree(&dirs.apparmor_cache_dir, "*"),
        ArtifactEntry::tree(&dirs.snap_apparmor_dir, "*"),
        ArtifactEntry::tree(&dirs.snap_asserts_db_dir, "*"),
        ArtifactEntry::tree(&dirs.features_dir, "*"),
        ArtifactEntry::tree(&dirs.snap_device_dir, "*"),
        ArtifactEntry::tree(&dirs.snap_cookie_dir, "*"),
        ArtifactEntry::tree(&dirs.snap_seq_dir, "*.json"),
        ArtifactEntry::tree(&dirs.snap_mount_dir, "*"),
        ArtifactEntry::tree(&dirs.snap_seccomp_dir, "*"),
        ArtifactEntry::tree(&dirs.snap_inhibit_dir, "*.lock"),
        ArtifactEntry {
            path: dirs.completers_dir.join("*"),
            kind: ArtifactKind::CompletionSymlink,
        },
        ArtifactEntry::file(&dirs.snap_state_file),
    ]
}

/// Whether `path` is a completer symlink pointing at snapd's `complete.sh`.
///
/// Completers may also alias each other: a relative target naming a sibling
/// symlink is followed one hop.
pub fn is_complete_sh_symlink(path: &Path) -> bool {
    let Ok(mut target) = fs::read_link(path) else {
        return false;
    };

    if target.is_relative() {
        let Some(dir) = path.parent() else {
            return false;
        };
        match fs::read_link(dir.join(&target)) {
            Ok(next) => target = next,
            Err(_) => return false,
        }
    }

    target.to_string_lossy().ends_with(COMPLETE_SH_SUFFIX)
}

fn is_absent(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::NotFound || e.raw_os_error() == Some(libc::ENOTDIR)
}
