//! Test helpers: fake commands, fake mount tables, a serialization lock.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tempfile::TempDir;

static SERIAL: Mutex<()> = Mutex::new(());

/// Serialize tests that spawn processes or change the working directory.
///
/// Writing an executable while another thread forks can make the exec fail
/// with ETXTBSY, and the working directory is process-wide.
pub fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(|e| e.into_inner())
}

/// A shell script standing in for a real program, logging every call.
pub struct MockCommand {
    pub path: PathBuf,
    log: PathBuf,
}

impl MockCommand {
    /// Create an executable at `path` that records its argv, then runs `body`.
    pub fn new(path: impl Into<PathBuf>, body: &str) -> Self {
        let path = path.into();
        let log = path.with_file_name(format!(
            ".{}.calls",
            path.file_name().unwrap().to_string_lossy()
        ));
        let script = format!(
            "#!/bin/sh\n\
             printf '%s' \"$(basename \"$0\")\" >> '{log}'\n\
             for arg in \"$@\"; do printf '\\t%s' \"$arg\" >> '{log}'; done\n\
             printf '\\n' >> '{log}'\n\
             {body}\n",
            log = log.display(),
            body = body,
        );
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        Self { path, log }
    }

    /// Every recorded invocation as `[argv0 basename, args...]`.
    pub fn calls(&self) -> Vec<Vec<String>> {
        match fs::read_to_string(&self.log) {
            Ok(content) => content
                .lines()
                .map(|line| line.split('\t').map(str::to_string).collect())
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

/// A mount table file living in its own scratch directory.
pub struct MockMountInfo {
    _dir: TempDir,
    pub path: PathBuf,
}

impl MockMountInfo {
    /// Write a mount table listing `mount_dirs`.
    pub fn new(mount_dirs: &[PathBuf]) -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mountinfo");
        let content: String = mount_dirs
            .iter()
            .enumerate()
            .map(|(i, p)| {
                format!(
                    "{} 1 0:{} / {} rw,relatime - tmpfs none rw\n",
                    100 + i,
                    i,
                    p.display()
                )
            })
            .collect();
        fs::write(&path, content).unwrap();
        Self { _dir: dir, path }
    }
}

/// Make `root` look like a chroot with kernel filesystems bind-mounted.
///
/// The mount table lists `root/dev`, `root/proc` and `root/sys/kernel/security`;
/// the AppArmor securityfs directory is created only when `apparmor` is set.
pub fn mock_chroot_dirs(root: &Path, apparmor: bool) -> MockMountInfo {
    let mounts = ["dev", "proc", "sys/kernel/security"]
        .iter()
        .map(|p| root.join(p))
        .collect::<Vec<_>>();
    if apparmor {
        fs::create_dir_all(root.join("sys/kernel/security/apparmor")).unwrap();
    }
    MockMountInfo::new(&mounts)
}

/// Write a snapd `info` file under `base`.
pub fn write_info_file(base: &Path, version: &str) {
    let dir = base.join("usr/lib/snapd");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("info"), format!("VERSION={}", version)).unwrap();
}
