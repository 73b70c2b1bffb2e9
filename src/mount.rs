//! Mounting the runtime image inside the chroot.
//!
//! The snap is mounted read-only at a fixed location inside the target so
//! code running in the chroot finds it without knowing the host-side root.
//! The mount is owned by a [`MountGuard`] and released on every exit path.

use crate::config::Tools;
use crate::error::{Error, Result};
use crate::process::{self, command_line, describe_status};
use std::ffi::OsString;
use std::fs;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};

/// Filesystem type of snap images.
pub const SQUASHFS: &str = "squashfs";

/// Read-only, and hidden from desktop volume monitors (udisks, gvfs).
pub const MOUNT_OPTIONS: &str = "ro,x-gdu.hide,x-gvfs-hide";

/// A single image mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountSpec {
    pub source: PathBuf,
    pub target: PathBuf,
    pub fs_type: &'static str,
    pub options: &'static str,
}

impl MountSpec {
    /// Read-only squashfs mount of `source` at `target`.
    pub fn squashfs(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            fs_type: SQUASHFS,
            options: MOUNT_OPTIONS,
        }
    }

    /// Arguments passed to `mount`.
    pub fn args(&self) -> Vec<OsString> {
        vec![
            "-t".into(),
            self.fs_type.into(),
            "-o".into(),
            self.options.into(),
            self.source.clone().into_os_string(),
            self.target.clone().into_os_string(),
        ]
    }
}

/// Mount `image` at `dest`, creating `dest` if needed.
pub fn mount_image(tools: &Tools, image: &Path, dest: &Path) -> Result<MountGuard> {
    fs::DirBuilder::new()
        .recursive(true)
        .mode(0o755)
        .create(dest)?;

    let spec = MountSpec::squashfs(image, dest);
    let args = spec.args();
    let command = command_line(tools.mount.as_os_str(), &args);

    tracing::info!(image = %image.display(), dest = %dest.display(), "mounting runtime image");

    let failed = |status: String, output: String| Error::MountFailed {
        image: image.to_path_buf(),
        dest: dest.to_path_buf(),
        status,
        command: command.clone(),
        output,
    };

    let output = process::run_captured(tools.mount.as_os_str(), &args)
        .map_err(|e| failed(e.to_string(), String::new()))?;

    if !output.success() {
        return Err(failed(
            describe_status(output.status),
            output.combined.trim_end().to_string(),
        ));
    }

    Ok(MountGuard {
        target: dest.to_path_buf(),
        umount: tools.umount.clone(),
        mounted: true,
    })
}

/// RAII guard for the runtime image mount. Unmounts on drop.
#[derive(Debug)]
pub struct MountGuard {
    target: PathBuf,
    umount: PathBuf,
    mounted: bool,
}

impl MountGuard {
    /// Path the mount is currently addressed by.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Address the mount by a new path, e.g. after entering the chroot.
    pub fn relocate(&mut self, target: impl Into<PathBuf>) {
        self.target = target.into();
    }

    /// Unmount now instead of at drop.
    pub fn release(mut self) {
        self.unmount();
    }

    fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;

        let args = [self.target.as_os_str()];
        match process::run_captured(self.umount.as_os_str(), &args) {
            Ok(output) if output.success() => {
                tracing::info!(target = %self.target.display(), "runtime image unmounted");
            }
            Ok(output) => {
                tracing::warn!(
                    target = %self.target.display(),
                    status = %describe_status(output.status),
                    output = %output.combined.trim_end(),
                    "cannot unmount runtime image"
                );
            }
            Err(e) => {
                tracing::warn!(
                    target = %self.target.display(),
                    error = %e,
                    "cannot unmount runtime image"
                );
            }
        }
    }
}

impl Drop for MountGuard {
    fn drop(&mut self) {
        self.unmount();
    }
}
