//! gitshadow core library.
//!
//! Mirrors the full ref set of configured source repositories to destination
//! repositories through local "shadow" bare clones, so no two live network
//! connections are held at once and re-syncs are incremental.

pub mod auth;
pub mod cancel;
pub mod config;
pub mod errors;
pub mod shadow;
pub mod sync;

// Re-exports for convenience.
pub use auth::SshCredential;
pub use cancel::CancelToken;
pub use config::SyncConfig;
pub use errors::SyncError;
