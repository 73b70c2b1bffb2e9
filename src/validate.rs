//! Sanity checks of a preseed chroot.
//!
//! snapd needs the kernel filesystems bind-mounted into the chroot and an
//! AppArmor-enabled kernel to generate security profiles. The two failures
//! are reported separately: a missing mount is a caller mistake, missing
//! AppArmor is a property of the running kernel.

use crate::error::{Error, Result};
use crate::mountinfo;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Mount points that must exist inside the chroot, relative to its root.
pub const REQUIRED_MOUNTPOINTS: &[&str] = &["dev", "proc", "sys/kernel/security"];

/// AppArmor securityfs directory, relative to the chroot root.
pub const APPARMOR_SECURITYFS_DIR: &str = "sys/kernel/security/apparmor";

/// Check that `root` is fit for running snapd in preseed mode.
///
/// `mountinfo_path` is the mount table to consult, normally
/// `/proc/self/mountinfo`.
pub fn check_chroot(root: &Path, mountinfo_path: &Path) -> Result<()> {
    let mut missing: BTreeSet<PathBuf> = REQUIRED_MOUNTPOINTS
        .iter()
        .map(|p| root.join(p))
        .collect();

    for entry in mountinfo::load(mountinfo_path)? {
        missing.remove(&entry.mount_dir);
    }

    if !missing.is_empty() {
        return Err(Error::MissingMountpoints(missing.into_iter().collect()));
    }

    let apparmor = root.join(APPARMOR_SECURITYFS_DIR);
    if fs::read_dir(&apparmor).is_err() {
        return Err(Error::MissingApparmor(apparmor));
    }

    tracing::debug!(root = %root.display(), "chroot mount points verified");
    Ok(())
}
