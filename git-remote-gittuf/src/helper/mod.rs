//! Protocol translation between the parent Git process and the backing
//! transport helper.

mod http;

pub use http::Translator;

use std::io::{self, BufReader};

use gittuf_transport_core::refs::RefTips;
use tracing::debug;

use crate::child::ChildHelper;
use crate::error::Result;
use crate::rsl::RslRecorder;

/// What a completed session learned about the remote.
#[derive(Debug, Default)]
pub struct SessionOutcome {
    /// Tips of the gittuf refs the remote advertised, `refname -> oid`.
    pub gittuf_refs: RefTips,
    /// Whether the controller drove a push.
    pub is_push: bool,
}

/// Run one full helper session for an http(s) remote over this process's
/// stdin/stdout.
pub fn run_http(remote: &str, url: &str, recorder: &mut dyn RslRecorder) -> Result<SessionOutcome> {
    let (child, mut child_in, child_stdout) = ChildHelper::spawn_http(remote, url)?;
    let mut child_out = BufReader::new(child_stdout);

    let stdin = io::stdin();
    let stdout = io::stdout();

    let result = Translator::new().run(
        stdin.lock(),
        &mut stdout.lock(),
        &mut child_in,
        &mut child_out,
        recorder,
    );

    match result {
        Ok(outcome) => {
            // Shutdown order matters: the child sees EOF on its stdin, its
            // stdout is released, then it is reaped.
            drop(child_in);
            drop(child_out);
            child.finish()?;
            debug!(
                gittuf_refs = outcome.gittuf_refs.len(),
                is_push = outcome.is_push,
                "session complete"
            );
            Ok(outcome)
        }
        Err(err) => {
            drop(child_in);
            drop(child_out);
            child.abort();
            Err(err)
        }
    }
}
