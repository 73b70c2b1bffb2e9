//! snapd filesystem layout.
//!
//! All paths snapd creates or reads inside an image are defined here. They
//! are stored relative to a root directory so the same registry serves the
//! host side of a chroot (`<chroot>/var/lib/snapd/...`) and the inside
//! (`/var/lib/snapd/...`).

use std::fs;
use std::path::{Component, Path, PathBuf};

// =============================================================================
// snapd state
// =============================================================================

/// snapd persisted state; its presence marks an image as preseeded.
pub const SNAP_STATE_FILE: &str = "var/lib/snapd/state.json";

/// System key used to detect security profile invalidation.
pub const SNAP_SYSTEM_KEY_FILE: &str = "var/lib/snapd/system-key";

/// Directory holding snapd's libexec helpers, the `snapd` binary and `info`.
pub const CORE_LIBEXEC_DIR: &str = "usr/lib/snapd";

/// Classic seed directory.
pub const SNAP_SEED_DIR: &str = "var/lib/snapd/seed";

// =============================================================================
// Generated artifacts
// =============================================================================

pub const SNAP_DESKTOP_FILES_DIR: &str = "var/lib/snapd/desktop/applications";
pub const SNAP_DESKTOP_ICONS_DIR: &str = "var/lib/snapd/desktop/icons";
pub const SNAP_MOUNT_POLICY_DIR: &str = "var/lib/snapd/mount";
pub const SNAP_BLOB_DIR: &str = "var/lib/snapd/snaps";
pub const SNAP_UDEV_RULES_DIR: &str = "etc/udev/rules.d";
pub const SNAP_DBUS_SYSTEM_POLICY_DIR: &str = "etc/dbus-1/system.d";
pub const SNAP_DBUS_SESSION_SERVICES_DIR: &str = "var/lib/snapd/dbus-1/services";
pub const SNAP_DBUS_SYSTEM_SERVICES_DIR: &str = "var/lib/snapd/dbus-1/system-services";
pub const SNAP_SERVICES_DIR: &str = "etc/systemd/system";
pub const SNAP_DATA_DIR: &str = "var/snap";
pub const SNAP_CACHE_DIR: &str = "var/cache/snapd";
pub const APPARMOR_CACHE_DIR: &str = "var/cache/apparmor";
pub const SNAP_APPARMOR_DIR: &str = "var/lib/snapd/apparmor/profiles";
pub const SNAP_ASSERTS_DB_DIR: &str = "var/lib/snapd/assertions";
pub const FEATURES_DIR: &str = "var/lib/snapd/features";
pub const SNAP_DEVICE_DIR: &str = "var/lib/snapd/device";
pub const SNAP_COOKIE_DIR: &str = "var/lib/snapd/cookie";
pub const SNAP_SEQ_DIR: &str = "var/lib/snapd/sequence";
pub const SNAP_SECCOMP_DIR: &str = "var/lib/snapd/seccomp/bpf";
pub const SNAP_INHIBIT_DIR: &str = "var/lib/snapd/inhibit";
pub const COMPLETERS_DIR: &str = "usr/share/bash-completion/completions";

/// Where snaps are mounted on Debian-like systems.
pub const DEFAULT_SNAP_MOUNT_DIR: &str = "snap";

/// Where snaps are mounted on Fedora, Arch and friends.
pub const ALT_SNAP_MOUNT_DIR: &str = "var/lib/snapd/snap";

/// Distributions (by os-release `ID`/`ID_LIKE`) that use [`ALT_SNAP_MOUNT_DIR`].
const ALT_SNAP_MOUNT_DISTROS: &[&str] = &[
    "fedora",
    "centos",
    "rhel",
    "amzn",
    "arch",
    "archlinux",
    "manjaro",
    "opensuse",
    "suse",
];

/// snapd layout registry.
///
/// Every path field is relative to `root_dir`. Production code builds one
/// instance at startup; tests point `root_dir` at a scratch directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dirs {
    /// Root the relative paths hang off. `/` outside of tests.
    pub root_dir: PathBuf,

    pub snap_state_file: PathBuf,
    pub snap_system_key_file: PathBuf,
    pub core_libexec_dir: PathBuf,
    pub snap_seed_dir: PathBuf,

    pub snap_desktop_files_dir: PathBuf,
    pub snap_desktop_icons_dir: PathBuf,
    pub snap_mount_policy_dir: PathBuf,
    pub snap_blob_dir: PathBuf,
    pub snap_udev_rules_dir: PathBuf,
    pub snap_dbus_system_policy_dir: PathBuf,
    pub snap_dbus_session_services_dir: PathBuf,
    pub snap_dbus_system_services_dir: PathBuf,
    pub snap_services_dir: PathBuf,
    pub snap_data_dir: PathBuf,
    pub snap_cache_dir: PathBuf,
    pub apparmor_cache_dir: PathBuf,
    pub snap_apparmor_dir: PathBuf,
    pub snap_asserts_db_dir: PathBuf,
    pub features_dir: PathBuf,
    pub snap_device_dir: PathBuf,
    pub snap_cookie_dir: PathBuf,
    pub snap_seq_dir: PathBuf,
    pub snap_mount_dir: PathBuf,
    pub snap_seccomp_dir: PathBuf,
    pub snap_inhibit_dir: PathBuf,
    pub completers_dir: PathBuf,
}

impl Default for Dirs {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("/"),
            snap_state_file: SNAP_STATE_FILE.into(),
            snap_system_key_file: SNAP_SYSTEM_KEY_FILE.into(),
            core_libexec_dir: CORE_LIBEXEC_DIR.into(),
            snap_seed_dir: SNAP_SEED_DIR.into(),
            snap_desktop_files_dir: SNAP_DESKTOP_FILES_DIR.into(),
            snap_desktop_icons_dir: SNAP_DESKTOP_ICONS_DIR.into(),
            snap_mount_policy_dir: SNAP_MOUNT_POLICY_DIR.into(),
            snap_blob_dir: SNAP_BLOB_DIR.into(),
            snap_udev_rules_dir: SNAP_UDEV_RULES_DIR.into(),
            snap_dbus_system_policy_dir: SNAP_DBUS_SYSTEM_POLICY_DIR.into(),
            snap_dbus_session_services_dir: SNAP_DBUS_SESSION_SERVICES_DIR.into(),
            snap_dbus_system_services_dir: SNAP_DBUS_SYSTEM_SERVICES_DIR.into(),
            snap_services_dir: SNAP_SERVICES_DIR.into(),
            snap_data_dir: SNAP_DATA_DIR.into(),
            snap_cache_dir: SNAP_CACHE_DIR.into(),
            apparmor_cache_dir: APPARMOR_CACHE_DIR.into(),
            snap_apparmor_dir: SNAP_APPARMOR_DIR.into(),
            snap_asserts_db_dir: SNAP_ASSERTS_DB_DIR.into(),
            features_dir: FEATURES_DIR.into(),
            snap_device_dir: SNAP_DEVICE_DIR.into(),
            snap_cookie_dir: SNAP_COOKIE_DIR.into(),
            snap_seq_dir: SNAP_SEQ_DIR.into(),
            snap_mount_dir: DEFAULT_SNAP_MOUNT_DIR.into(),
            snap_seccomp_dir: SNAP_SECCOMP_DIR.into(),
            snap_inhibit_dir: SNAP_INHIBIT_DIR.into(),
            completers_dir: COMPLETERS_DIR.into(),
        }
    }
}

impl Dirs {
    /// Registry rooted at `root` instead of `/`.
    pub fn with_root_dir(root: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root.into(),
            ..Self::default()
        }
    }

    /// Resolve a registry path against `root_dir`.
    pub fn under_root(&self, rel: impl AsRef<Path>) -> PathBuf {
        join_root(&self.root_dir, rel)
    }

    /// Pick the snap mount directory used by the distribution installed in `root`.
    pub fn adapt_to_distro(mut self, root: &Path) -> Self {
        if uses_alt_snap_mount_dir(root) {
            tracing::debug!(root = %root.display(), "target uses {}", ALT_SNAP_MOUNT_DIR);
            self.snap_mount_dir = ALT_SNAP_MOUNT_DIR.into();
        }
        self
    }

    /// Path of the snapd binary below `base` (a root-relative prefix).
    pub fn snapd_binary(&self, base: impl AsRef<Path>) -> PathBuf {
        join_root(base.as_ref(), &self.core_libexec_dir).join("snapd")
    }

    /// Path of the snapd `info` file below `base`.
    pub fn snapd_info_file(&self, base: impl AsRef<Path>) -> PathBuf {
        join_root(base.as_ref(), &self.core_libexec_dir).join("info")
    }
}

/// Join `rel` onto `root`, treating an absolute `rel` as root-relative.
///
/// `Path::join` replaces the base when handed an absolute path; this keeps
/// `/var/lib/snapd` under the chroot instead.
pub fn join_root(root: &Path, rel: impl AsRef<Path>) -> PathBuf {
    let mut path = root.to_path_buf();
    for component in rel.as_ref().components() {
        match component {
            Component::RootDir | Component::Prefix(_) | Component::CurDir => {}
            other => path.push(other),
        }
    }
    path
}

/// Make `path` absolute against the current directory and clean it lexically.
///
/// `.` components are dropped and `..` removes the preceding component, so
/// the result can be compared with mount table entries. Symlinks are not
/// resolved.
pub fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut cleaned = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            // popping "/" is a no-op, so ".." never escapes the root
            Component::ParentDir => {
                cleaned.pop();
            }
            other => cleaned.push(other),
        }
    }
    Ok(cleaned)
}

fn uses_alt_snap_mount_dir(root: &Path) -> bool {
    let content = ["etc/os-release", "usr/lib/os-release"]
        .iter()
        .find_map(|rel| fs::read_to_string(root.join(rel)).ok());

    let Some(content) = content else {
        return false;
    };

    content
        .lines()
        .filter_map(|line| line.split_once('='))
        .filter(|(key, _)| matches!(key.trim(), "ID" | "ID_LIKE"))
        .flat_map(|(_, value)| {
            value
                .trim()
                .trim_matches(|c| c == '"' || c == '\'')
                .split_whitespace()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .any(|id| ALT_SNAP_MOUNT_DISTROS.contains(&id.as_str()))
}
