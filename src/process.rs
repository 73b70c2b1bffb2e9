//! External command helpers.
//!
//! The preseed workflow shells out to `mount`, `umount` and snapd itself.
//! Errors must show operators exactly what was run, so these helpers render
//! command lines and exit statuses in a reproducible form.

use std::ffi::OsStr;
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::process::{Command, ExitStatus};

/// Result of a command run with captured output.
#[derive(Debug)]
pub struct CapturedOutput {
    /// Exit status of the command.
    pub status: ExitStatus,
    /// stdout followed by stderr, lossily decoded.
    pub combined: String,
}

impl CapturedOutput {
    /// Whether the command exited with status 0.
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Run `program` with `args`, capturing stdout and stderr.
pub fn run_captured<S: AsRef<OsStr>>(program: &OsStr, args: &[S]) -> io::Result<CapturedOutput> {
    let output = Command::new(program).args(args).output()?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    Ok(CapturedOutput {
        status: output.status,
        combined,
    })
}

/// Render a command line the way an operator would type it.
pub fn command_line<S: AsRef<OsStr>>(program: &OsStr, args: &[S]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(|arg| arg.as_ref()))
        .map(|part| part.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Describe how a process ended: `exit status N` or `signal: N`.
pub fn describe_status(status: ExitStatus) -> String {
    if let Some(code) = status.code() {
        format!("exit status {}", code)
    } else if let Some(signal) = status.signal() {
        format!("signal: {}", signal)
    } else {
        status.to_string()
    }
}
