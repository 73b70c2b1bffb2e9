//! Entering the target root.

use std::io;
use std::path::Path;

/// Capability to change the process root directory.
///
/// Production uses [`SystemChroot`]; tests substitute an implementation that
/// records the call or fails on demand.
pub trait Chroot {
    /// Make `root` the root directory of the current process.
    fn enter(&self, root: &Path) -> io::Result<()>;
}

/// chroot(2) followed by chdir("/").
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemChroot;

impl Chroot for SystemChroot {
    fn enter(&self, root: &Path) -> io::Result<()> {
        tracing::info!(root = %root.display(), "entering chroot");
        nix::unistd::chroot(root)?;
        nix::unistd::chdir("/")?;
        Ok(())
    }
}

impl<F> Chroot for F
where
    F: Fn(&Path) -> io::Result<()>,
{
    fn enter(&self, root: &Path) -> io::Result<()> {
        self(root)
    }
}
