//! snap-preseed: preseed classic Ubuntu images with snapd.
//!
//! Preseeding runs snapd once, in a special one-shot mode, inside a chroot of
//! an image that has not been booted yet. snapd performs the seeding work it
//! would otherwise do on first boot and exits. The image then boots with
//! snaps already set up.
//!
//! The crate provides two entry points:
//!
//! - [`classic`] / [`Preseeder::classic`] preseed an image chroot.
//! - [`reset_preseeded_chroot`] removes everything a preseed run produced.

pub mod artifacts;
pub mod chroot;
pub mod config;
pub mod error;
pub mod mount;
pub mod mountinfo;
pub mod paths;
pub mod preseed;
pub mod process;
pub mod reset;
pub mod seed;
pub mod validate;
pub mod version;

#[cfg(test)]
mod testutil;

pub use error::{Error, Result};
pub use preseed::{classic, Preseeder};
pub use reset::reset_preseeded_chroot;

/// snap-preseed version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
