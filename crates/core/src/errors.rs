//! Error types for the gitshadow core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`SyncError`] enum unifies them all for callers that want a
//! single error type.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Shadow(#[from] ShadowError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading, validation, and name resolution.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// JSON parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue {
        field: String,
        detail: String,
    },

    /// A sync pair references a repository name that is not configured.
    #[error("sync pair references unknown {role} repository '{name}'")]
    UnknownRepository {
        name: String,
        role: String,
    },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Authentication errors
// ---------------------------------------------------------------------------

/// Errors from SSH credential resolution and use.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The private key file does not exist.
    #[error("ssh key file not found: {0}")]
    KeyFileNotFound(String),

    /// The private key file exists but could not be read.
    #[error("ssh key file unreadable at '{path}': {source}")]
    KeyFileUnreadable {
        path: String,
        source: std::io::Error,
    },

    /// The file's contents do not look like a private key.
    #[error("'{0}' does not contain a private key")]
    NotAPrivateKey(String),

    /// The peer or the ssh layer rejected the key (bad passphrase, key not
    /// authorized, or a failed host-key check).
    #[error("ssh authentication failed for '{url}': {detail}")]
    Rejected {
        url: String,
        detail: String,
    },
}

// ---------------------------------------------------------------------------
// Shadow repository errors
// ---------------------------------------------------------------------------

/// Errors from the shadow clone layer (path derivation, init, open).
#[derive(Debug, Error)]
pub enum ShadowError {
    /// The shadow directory could not be created or written.
    #[error("shadow directory error at '{path}': {source}")]
    IoError {
        path: String,
        source: std::io::Error,
    },

    /// A repository exists at the path but could not be opened. Distinct
    /// from the absent-repository case, which triggers initialization.
    #[error("failed to open shadow repository at '{path}': {source}")]
    OpenFailed {
        path: String,
        source: git2::Error,
    },

    /// A git2 error during init or remote setup.
    #[error("shadow git error: {0}")]
    Git(#[from] git2::Error),
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

/// Errors from network fetch/push operations. An up-to-date fetch or push is
/// a success, never one of these.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Fetch from the source failed.
    #[error("fetch from '{url}' failed: {source}")]
    Fetch {
        url: String,
        source: git2::Error,
    },

    /// Push to the destination failed.
    #[error("push to '{url}' failed: {source}")]
    Push {
        url: String,
        source: git2::Error,
    },

    /// The destination rejected a ref update.
    #[error("push to '{url}' rejected ref '{refname}': {detail}")]
    PushRejected {
        url: String,
        refname: String,
        detail: String,
    },

    /// The operation was cancelled via a [`CancelToken`](crate::CancelToken).
    #[error("transfer cancelled")]
    Cancelled,
}
