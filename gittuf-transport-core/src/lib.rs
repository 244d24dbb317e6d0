//! gittuf-transport-core: shared wire primitives for the gittuf remote helper.
//!
//! This crate provides the minimal, reusable building blocks the
//! `git-remote-gittuf` helper interposes with: the pkt-line codec, the
//! controller command splitter, and the gittuf ref conventions.
//!
#![deny(missing_docs, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod input;
pub mod pktline;
pub mod refs;
