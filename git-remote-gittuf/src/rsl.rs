//! Recording reference-state-log entries for refs about to be pushed.
//!
//! The state machine only talks to the [`RslRecorder`] seam, so tests can
//! substitute a mock and the translator never needs the `gittuf` binary.

use std::io::Write;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::{Error, Result};

/// Records an RSL entry for a ref that is about to be pushed.
pub trait RslRecorder {
    /// Record the current state of `src_ref` as destined for `dst_ref`.
    ///
    /// Must have completed successfully before the corresponding refspec is
    /// forwarded to the backing helper, so the new RSL tip exists locally
    /// when the child reads the RSL ref.
    fn record(&mut self, src_ref: &str, dst_ref: &str) -> Result<()>;
}

/// Recorder backed by the `gittuf` CLI.
#[derive(Debug, Default)]
pub struct GittufCli;

impl GittufCli {
    /// Create a CLI-backed recorder.
    pub fn new() -> Self {
        Self
    }
}

impl RslRecorder for GittufCli {
    fn record(&mut self, src_ref: &str, dst_ref: &str) -> Result<()> {
        debug!(src_ref, dst_ref, "recording RSL entry");
        let output = Command::new("gittuf")
            .args(["rsl", "record", "--dst-ref", dst_ref, src_ref])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .output()?;

        // gittuf prints user-facing output on stdout; relay it on stderr so
        // Git surfaces it without corrupting the protocol channel.
        std::io::stderr().write_all(&output.stdout)?;

        if output.status.success() {
            Ok(())
        } else {
            Err(Error::RslRecord {
                dst_ref: dst_ref.to_owned(),
                status: output.status,
            })
        }
    }
}

/// Recorder that records nothing.
#[derive(Debug, Default)]
pub struct NoopRecorder;

impl NoopRecorder {
    /// Create a no-op recorder.
    pub fn new() -> Self {
        Self
    }
}

impl RslRecorder for NoopRecorder {
    fn record(&mut self, _src_ref: &str, _dst_ref: &str) -> Result<()> {
        Ok(())
    }
}
