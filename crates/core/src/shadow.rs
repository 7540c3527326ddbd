//! Shadow clone management: deterministic path derivation and the
//! initialize-or-update state machine.
//!
//! A shadow is a local bare repository keyed by a digest of the source URL.
//! It is created on the first sync of a source, incrementally updated on
//! every later sync of the same source (regardless of destination), and
//! never deleted.

use std::path::{Path, PathBuf};

use git2::{AutotagOption, ErrorCode, FetchOptions, FetchPrune, Remote, Repository};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::auth::{is_auth_error, SshCredential};
use crate::cancel::CancelToken;
use crate::errors::{AuthError, ShadowError, SyncError, TransportError};

/// The catch-all force-mirror refspec used for every fetch. Pushes expand
/// it into per-ref refspecs, since libgit2 only accepts globs on fetch.
pub const MIRROR_REFSPEC: &str = "+refs/*:refs/*";

/// Name of the single remote a shadow carries. Its URL starts at the source
/// and is rewired to the destination before each push.
pub const SHADOW_REMOTE: &str = "origin";

// ---------------------------------------------------------------------------
// Path derivation
// ---------------------------------------------------------------------------

/// Derive the shadow directory for a source URL under `base_path` and make
/// sure it exists.
///
/// The path is the hex-encoded SHA-256 of the exact URL string, so it is
/// stable across runs and two distinct URLs cannot collide in practice.
pub fn derive_shadow_path(source_url: &str, base_path: &Path) -> Result<PathBuf, ShadowError> {
    let digest = Sha256::digest(source_url.as_bytes());
    let path = base_path.join(hex::encode(digest));

    std::fs::create_dir_all(&path).map_err(|e| ShadowError::IoError {
        path: path.display().to_string(),
        source: e,
    })?;

    debug!(url = source_url, path = %path.display(), "derived shadow path");
    Ok(path)
}

// ---------------------------------------------------------------------------
// Initialize-or-update
// ---------------------------------------------------------------------------

/// Ensure an up-to-date shadow of `source_url` exists at `path` and return
/// it.
///
/// Two transitions:
/// - no repository at `path` yet: init a bare repository, attach the
///   `origin` remote with the mirror refspec, full fetch;
/// - repository present: reopen and fetch incrementally on `origin`.
///
/// Both are idempotent; a fetch that transfers nothing is a success. An open
/// failure other than "no repository here" is fatal and does not trigger
/// initialization.
pub fn ensure_up_to_date(
    path: &Path,
    source_url: &str,
    credential: &SshCredential,
    token: &CancelToken,
) -> Result<Repository, SyncError> {
    match Repository::open(path) {
        Ok(repo) => {
            debug!(path = %path.display(), "updating existing shadow");
            {
                // The previous sync leaves the remote pointed at its
                // destination; aim it back at the source before fetching.
                repo.remote_set_url(SHADOW_REMOTE, source_url)
                    .map_err(ShadowError::Git)?;
                let mut remote = repo
                    .find_remote(SHADOW_REMOTE)
                    .map_err(ShadowError::Git)?;
                fetch_all(&mut remote, source_url, credential, token)?;
            }
            Ok(repo)
        }
        Err(e) if e.code() == ErrorCode::NotFound => {
            info!(url = source_url, path = %path.display(), "initializing shadow");
            let repo = Repository::init_bare(path).map_err(ShadowError::Git)?;
            {
                let mut remote = repo
                    .remote_with_fetch(SHADOW_REMOTE, source_url, MIRROR_REFSPEC)
                    .map_err(ShadowError::Git)?;
                fetch_all(&mut remote, source_url, credential, token)?;
            }
            Ok(repo)
        }
        Err(e) => Err(ShadowError::OpenFailed {
            path: path.display().to_string(),
            source: e,
        }
        .into()),
    }
}

/// Fetch the full ref namespace from the source. Prunes refs deleted
/// upstream so the shadow stays an exact mirror.
fn fetch_all(
    remote: &mut Remote<'_>,
    source_url: &str,
    credential: &SshCredential,
    token: &CancelToken,
) -> Result<(), SyncError> {
    if token.is_cancelled() {
        return Err(TransportError::Cancelled.into());
    }

    let mut opts = FetchOptions::new();
    opts.remote_callbacks(credential.remote_callbacks(token));
    opts.prune(FetchPrune::On);
    opts.download_tags(AutotagOption::All);

    remote
        .fetch(&[MIRROR_REFSPEC], Some(&mut opts), None)
        .map_err(|e| classify_fetch_error(e, source_url, token))?;

    debug!(url = source_url, "fetch completed");
    Ok(())
}

fn classify_fetch_error(err: git2::Error, url: &str, token: &CancelToken) -> SyncError {
    if token.is_cancelled() {
        return TransportError::Cancelled.into();
    }
    if is_auth_error(&err) {
        return AuthError::Rejected {
            url: url.to_string(),
            detail: err.message().to_string(),
        }
        .into();
    }
    TransportError::Fetch {
        url: url.to_string(),
        source: err,
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_derive_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let url = "git@git.example.com:acme/widget.git";
        let a = derive_shadow_path(url, dir.path()).unwrap();
        let b = derive_shadow_path(url, dir.path()).unwrap();
        assert_eq!(a, b);
        assert!(a.is_dir());

        // 256-bit digest, hex encoded.
        let name = a.file_name().unwrap().to_str().unwrap();
        assert_eq!(name.len(), 64);
        assert!(name.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_derive_distinct_urls_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let mut seen = HashSet::new();
        for i in 0..1000 {
            let url = format!("git@host-{i}.example.com:org/repo-{i}.git");
            let path = derive_shadow_path(&url, dir.path()).unwrap();
            assert!(seen.insert(path), "collision for {url}");
        }
        // A single-character difference must also produce a different path.
        let a = derive_shadow_path("git@h:a/r.git", dir.path()).unwrap();
        let b = derive_shadow_path("git@h:a/r.gib", dir.path()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_derive_fails_on_unwritable_base() {
        // A regular file where the base directory should be.
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("occupied");
        std::fs::write(&base, "not a directory").unwrap();
        let result = derive_shadow_path("git@h:a/r.git", &base);
        assert!(matches!(result, Err(ShadowError::IoError { .. })));
    }
}
