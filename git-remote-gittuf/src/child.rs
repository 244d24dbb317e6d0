//! The backing transport helper subprocess.
//!
//! The translator does not speak HTTP itself; it drives `git-remote-http`
//! over its stdin/stdout and lets its stderr flow straight through to ours.

use std::io;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use tracing::debug;

use crate::error::{Error, Result};

/// The helper backing `http://` and `https://` remotes.
pub const HTTP_HELPER: &str = "git-remote-http";

/// A spawned backing helper. The protocol pipes are handed out at spawn time;
/// this handle keeps the process for reaping.
pub struct ChildHelper {
    program: &'static str,
    child: Child,
}

impl ChildHelper {
    /// Spawn `git-remote-http <remote> <url>` with piped stdin/stdout and
    /// inherited stderr, returning the handle and both pipe ends.
    pub fn spawn_http(remote: &str, url: &str) -> Result<(Self, ChildStdin, ChildStdout)> {
        Self::spawn(HTTP_HELPER, &[remote, url])
    }

    fn spawn(program: &'static str, args: &[&str]) -> Result<(Self, ChildStdin, ChildStdout)> {
        debug!(helper = program, ?args, "spawning backing helper");
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "child stdin not piped"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "child stdout not piped"))?;
        Ok((Self { program, child }, stdin, stdout))
    }

    /// Reap the helper and surface its exit status.
    ///
    /// Callers must drop the pipes first, stdin before stdout, so the child
    /// observes EOF and terminates.
    pub fn finish(mut self) -> Result<()> {
        let status = self.child.wait()?;
        debug!(helper = self.program, %status, "backing helper exited");
        if status.success() {
            Ok(())
        } else {
            Err(Error::ChildExit {
                helper: self.program,
                status,
            })
        }
    }

    /// Tear the helper down on an error path: kill, then reap, best effort.
    pub fn abort(mut self) {
        debug!(helper = self.program, "aborting backing helper");
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
