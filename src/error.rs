//! Error types for snap-preseed.
//!
//! Every failure is terminal for the current invocation and carries a single
//! descriptive message. The messages are part of the user-facing interface:
//! operators grep for them and the `--reset` hint is printed verbatim.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for snap-preseed operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while preseeding or resetting an image.
#[derive(Error, Debug)]
pub enum Error {
    /// The preseed target does not exist or is not a directory.
    #[error("cannot verify {0:?}: is not a directory")]
    NotADirectory(PathBuf),

    /// The snapd state file is already present in the target.
    #[error("the system at {0:?} appears to be preseeded, pass --reset flag to clean it up")]
    AlreadyPreseeded(PathBuf),

    /// One or more kernel filesystems are not mounted inside the target.
    #[error("cannot preseed without the following mountpoints:{}", bullet_list(.0))]
    MissingMountpoints(Vec<PathBuf>),

    /// The running kernel exposes no AppArmor securityfs directory.
    #[error("cannot preseed without access to {0:?}")]
    MissingApparmor(PathBuf),

    /// The mount table could not be read or parsed.
    #[error("cannot parse mount info: {0}")]
    MountInfo(String),

    /// The runtime image could not be located in the seed.
    #[error("{0}")]
    Seed(String),

    /// The mount command failed.
    #[error("cannot mount {} at {} in preseed mode: {status}\n'{command}' failed with: {output}\n", .image.display(), .dest.display())]
    MountFailed {
        image: PathBuf,
        dest: PathBuf,
        status: String,
        command: String,
        output: String,
    },

    /// A version string has a non-numeric or empty component.
    #[error("cannot parse version {version:?}: {reason}")]
    MalformedVersion { version: String, reason: String },

    /// An info file is missing or carries no `VERSION=` line.
    #[error("cannot find snapd version information in {0:?}")]
    VersionInfo(PathBuf),

    /// The selected snapd is too old to run in preseed mode.
    #[error("snapd {version} from the target system does not support preseeding, the minimum required version is {minimum}+")]
    UnsupportedVersion { version: String, minimum: String },

    /// chroot(2) into the target failed.
    #[error("cannot chroot into {}: {source}", .path.display())]
    ChrootFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The snapd binary could not be started.
    #[error("cannot run {}: {source}", .path.display())]
    RuntimeSpawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// snapd exited unsuccessfully in preseed mode.
    #[error("error running snapd in preseed mode: {0}")]
    RuntimeExecFailed(String),

    /// Reset was asked to clean a path that does not exist.
    #[error("cannot reset non-existing directory {0:?}")]
    TargetMissing(PathBuf),

    /// Reset was asked to clean something that is not a directory.
    #[error("cannot reset {0:?}, it is not a directory")]
    TargetNotDirectory(PathBuf),

    /// Removing a preseed artifact failed for a reason other than absence.
    #[error("cannot remove {}: {source}", .path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be loaded.
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// The tool needs root privileges for mount and chroot.
    #[error("must be run as root")]
    NotRoot,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a mount table error.
    pub fn mount_info(message: impl Into<String>) -> Self {
        Self::MountInfo(message.into())
    }

    /// Create a seed resolution error.
    pub fn seed(message: impl Into<String>) -> Self {
        Self::Seed(message.into())
    }

    /// Create a malformed version error.
    pub fn malformed_version(version: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedVersion {
            version: version.into(),
            reason: reason.into(),
        }
    }

    /// Create a removal error for an artifact path.
    pub fn remove(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Remove {
            path: path.into(),
            source,
        }
    }
}

fn bullet_list(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("\n - {}", p.display()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_mountpoints_lists_every_path() {
        let err = Error::MissingMountpoints(vec![
            PathBuf::from("/r/dev"),
            PathBuf::from("/r/proc"),
        ]);
        assert_eq!(
            err.to_string(),
            "cannot preseed without the following mountpoints:\n - /r/dev\n - /r/proc"
        );
    }

    #[test]
    fn test_quoted_paths() {
        let err = Error::NotADirectory(PathBuf::from("/non-existing-dir"));
        assert_eq!(
            err.to_string(),
            r#"cannot verify "/non-existing-dir": is not a directory"#
        );

        let err = Error::TargetNotDirectory(PathBuf::from("/tmp/foo"));
        assert_eq!(err.to_string(), r#"cannot reset "/tmp/foo", it is not a directory"#);
    }

    #[test]
    fn test_mount_failed_message() {
        let err = Error::MountFailed {
            image: PathBuf::from("/a/core.snap"),
            dest: PathBuf::from("/r/tmp/snapd-preseed"),
            status: "exit status 32".into(),
            command: "mount -t squashfs -o ro,x-gdu.hide,x-gvfs-hide /a/core.snap /r/tmp/snapd-preseed".into(),
            output: "something went wrong".into(),
        };
        assert_eq!(
            err.to_string(),
            "cannot mount /a/core.snap at /r/tmp/snapd-preseed in preseed mode: exit status 32\n\
             'mount -t squashfs -o ro,x-gdu.hide,x-gvfs-hide /a/core.snap /r/tmp/snapd-preseed' failed with: something went wrong\n"
        );
    }

    #[test]
    fn test_chroot_failed_keeps_source() {
        let err = Error::ChrootFailed {
            path: PathBuf::from("/r"),
            source: std::io::Error::other("FAIL: /r"),
        };
        assert_eq!(err.to_string(), "cannot chroot into /r: FAIL: /r");
        assert!(std::error::Error::source(&err).is_some());
    }
}
