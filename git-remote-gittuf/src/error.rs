//! Error types for the gittuf remote helper.

/// Result type alias for helper operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the gittuf remote helper.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error on the controller or child pipes.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// pkt-line framing error; the stream is desynchronised and unrecoverable.
    #[error("pkt-line error: {0}")]
    Pktline(#[from] gittuf_transport_core::pktline::Error),

    /// Malformed helper command or wire data.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The URL scheme has no backing transport helper.
    #[error("unsupported transport for {url:?}")]
    UnsupportedTransport {
        /// The remote URL as given by Git.
        url: String,
    },

    /// `gittuf rsl record` reported failure; the push was aborted before the
    /// offending refspec reached the remote.
    #[error("gittuf rsl record for {dst_ref:?} exited with {status}")]
    RslRecord {
        /// The destination ref whose entry could not be recorded.
        dst_ref: String,
        /// Exit status of the `gittuf` process.
        status: std::process::ExitStatus,
    },

    /// The backing transport helper exited unsuccessfully.
    #[error("{helper} exited with {status}")]
    ChildExit {
        /// Name of the backing helper executable.
        helper: &'static str,
        /// Its exit status.
        status: std::process::ExitStatus,
    },

    /// A local git plumbing invocation failed.
    #[error("git {subcommand} exited with {status}")]
    GitCommand {
        /// The plumbing subcommand that failed.
        subcommand: &'static str,
        /// Its exit status.
        status: std::process::ExitStatus,
    },
}

impl Error {
    /// Shorthand for a protocol error with a custom message.
    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Error::Protocol(message.into())
    }
}
