//! Git remote helper that makes gittuf policy refs travel with user refs.
//!
//! Git invokes this helper for `gittuf::`-prefixed remotes. The helper sits
//! between the parent Git process and a backing transport helper
//! (`git-remote-http`), translating the remote-helper conversation so that
//! the reference-state-log and other `refs/gittuf/*` refs are fetched and
//! pushed transparently:
//!
//! - during v2 `ls-refs`, a `ref-prefix refs/gittuf/` argument is injected so
//!   the remote advertises its policy refs;
//! - during v2 `fetch`, one `want` per advertised gittuf tip rides along with
//!   the user's wants;
//! - before a push batch is forwarded, `gittuf rsl record` runs for each user
//!   refspec and the RSL ref itself is appended to the batch.
//!
//! Everything else crosses the helper byte-for-byte.

#![deny(rust_2018_idioms)]

pub mod child;
pub mod error;
pub mod git;
pub mod helper;
pub mod rsl;

pub use error::{Error, Result};
pub use helper::{SessionOutcome, Translator};

/// The version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
