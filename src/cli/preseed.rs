//! Preseed and reset command implementation.

use clap::Args;
use snap_preseed::config::PreseedConfig;
use snap_preseed::error::Error;
use snap_preseed::paths::Dirs;
use snap_preseed::Preseeder;
use std::path::PathBuf;

/// Preseed an image chroot, or undo a previous preseed.
#[derive(Args, Debug)]
pub struct PreseedCmd {
    /// Root directory of the image to preseed.
    #[arg(value_name = "CHROOT")]
    pub chroot: PathBuf,

    /// Remove all preseed artifacts from the chroot instead.
    #[arg(long)]
    pub reset: bool,
}

impl PreseedCmd {
    /// Execute the command.
    pub fn run(&self, config: PreseedConfig) -> snap_preseed::Result<()> {
        // mount and chroot need root
        if unsafe { libc::geteuid() } != 0 {
            return Err(Error::NotRoot);
        }

        let dirs = Dirs::default().adapt_to_distro(&self.chroot);

        if self.reset {
            snap_preseed::reset_preseeded_chroot(&self.chroot, &dirs)?;
            println!("Reset preseeded chroot: {}", self.chroot.display());
            return Ok(());
        }

        Preseeder::new(config, dirs).classic(&self.chroot)
    }
}
