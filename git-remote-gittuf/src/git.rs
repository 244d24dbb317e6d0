//! Local git plumbing for post-fetch bookkeeping.
//!
//! A fetch through this helper transports gittuf objects, but Git only
//! updates the refs it asked for itself. The driver therefore anchors the
//! fetched `refs/gittuf/*` tips locally with `git update-ref` once the
//! session completes.

use std::process::{Command, Stdio};

use gittuf_transport_core::refs::RefTips;
use gix_hash::ObjectId;
use tracing::{debug, trace};

use crate::error::{Error, Result};

/// Point each local gittuf ref at the tip fetched from the remote.
///
/// Advertised targets that are not object ids (e.g. `unborn`) are skipped.
/// This fast-forwards blindly: under this transport the local RSL is assumed
/// to never be ahead of the remote.
pub fn update_local_refs(tips: &RefTips) -> Result<()> {
    for (name, tip) in tips {
        if ObjectId::from_hex(tip.as_bytes()).is_err() {
            trace!(name = %name, tip = %tip, "skipping non-oid advertisement target");
            continue;
        }
        update_ref(name, tip)?;
    }
    Ok(())
}

fn update_ref(name: &str, target: &str) -> Result<()> {
    debug!(name, target, "updating local ref");
    let status = Command::new("git")
        .args(["update-ref", name, target])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::inherit())
        .status()?;
    if status.success() {
        Ok(())
    } else {
        Err(Error::GitCommand {
            subcommand: "update-ref",
            status,
        })
    }
}
