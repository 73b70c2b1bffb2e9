//! Mount table parsing.
//!
//! Reads the kernel's per-process mount table (`/proc/self/mountinfo`). The
//! path is configurable so tests can substitute a hand-written table.

use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Default location of the mount table.
pub const DEFAULT_MOUNTINFO: &str = "/proc/self/mountinfo";

/// A single mount table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    /// Mount point, with octal escapes decoded.
    pub mount_dir: PathBuf,
    /// Filesystem type (e.g. `proc`, `securityfs`).
    pub fs_type: String,
    /// Mount source (e.g. `/dev/sda1`, `none`).
    pub source: String,
}

/// Load and parse a mount table file.
pub fn load(path: &Path) -> Result<Vec<MountEntry>> {
    let content = fs::read_to_string(path)
        .map_err(|e| Error::mount_info(format!("cannot read {}: {}", path.display(), e)))?;
    parse(&content)
}

/// Parse mountinfo text.
///
/// Line format:
/// `ID PARENT MAJ:MIN ROOT MOUNTPOINT OPTIONS [OPTIONAL...] - FSTYPE SOURCE SUPEROPTIONS`
pub fn parse(input: &str) -> Result<Vec<MountEntry>> {
    let mut entries = Vec::new();

    for line in input.lines().filter(|line| !line.trim().is_empty()) {
        let (left, right) = line
            .split_once(" - ")
            .ok_or_else(|| Error::mount_info(format!("incorrect separator in {:?}", line)))?;

        let mount_dir = left
            .split_whitespace()
            .nth(4)
            .ok_or_else(|| Error::mount_info(format!("incorrect number of fields in {:?}", line)))?;

        let mut right_fields = right.split_whitespace();
        let fs_type = right_fields
            .next()
            .ok_or_else(|| Error::mount_info(format!("missing filesystem type in {:?}", line)))?;
        let source = right_fields.next().unwrap_or_default();

        entries.push(MountEntry {
            mount_dir: PathBuf::from(unescape(mount_dir)),
            fs_type: unescape(fs_type),
            source: unescape(source),
        });
    }

    Ok(entries)
}

/// Decode the `\NNN` octal escapes the kernel uses for whitespace and backslash.
fn unescape(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() && is_octal_escape(&bytes[i + 1..i + 4]) {
            let value = (bytes[i + 1] - b'0') * 64 + (bytes[i + 2] - b'0') * 8 + (bytes[i + 3] - b'0');
            out.push(value);
            i += 4;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn is_octal_escape(digits: &[u8]) -> bool {
    digits.len() == 3 && digits[0] <= b'3' && digits.iter().all(|d| (b'0'..=b'7').contains(d))
}
