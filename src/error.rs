use std::path::PathBuf;

use thiserror::Error;

/// Fatal conditions that end an invocation with a non-zero exit.
///
/// Per-metric probe failures are not here on purpose: they degrade to
/// zero values inside `stat::compose` and never abort a report.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The config file exists but cannot be parsed. Never silently
    /// re-provisions over an existing file.
    #[error("config file {path} is corrupt: {source}")]
    ConfigCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The server URL is https but the pinned trust bundle is unreadable.
    #[error("cannot read trust anchors from {path}: {source}")]
    TrustMaterialMissing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The trust bundle was read but holds no usable PEM certificates.
    #[error("no valid PEM certificates in {path}")]
    TrustMaterialInvalid { path: PathBuf },

    /// Connection, TLS handshake, or I/O failure while delivering.
    #[error("delivery to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The collector answered with a non-empty body; the body is its
    /// error message and is printed verbatim.
    #[error("{0}")]
    ServerRejected(String),
}
