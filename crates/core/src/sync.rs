//! Sync orchestration: resolve a configured pair, bring the shadow up to
//! date with the source, rewire its remote, and mirror-push to the
//! destination.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use git2::{Direction, PushOptions, Repository};
use tracing::{debug, error, info, warn};

use crate::auth::{is_auth_error, SshCredential};
use crate::cancel::CancelToken;
use crate::config::{RepositoryAccess, SyncConfig, SyncPair};
use crate::errors::{AuthError, ConfigError, ShadowError, SyncError, TransportError};
use crate::shadow::{self, SHADOW_REMOTE};

/// Run one configured sync pair.
///
/// Steps, each a hard dependency on the previous one succeeding:
/// 1. resolve both names against the configuration;
/// 2. derive the shadow path, resolve the source credential, and ensure the
///    shadow is up to date with the source;
/// 3. resolve the destination credential;
/// 4. rewrite the shadow's sole remote to the destination URL;
/// 5. force-mirror-push the full ref namespace.
///
/// There is no rollback: a failed push leaves the shadow updated, and the
/// destination is simply retried on the next run.
pub fn sync_pair(
    config: &SyncConfig,
    pair: &SyncPair,
    token: &CancelToken,
) -> Result<(), SyncError> {
    let source = resolve_repository(config, &pair.source_name, "source")?;
    let destination = resolve_repository(config, &pair.destination_name, "destination")?;

    info!(
        source = %source.repo_name,
        destination = %destination.repo_name,
        "syncing pair"
    );

    let shadow_path =
        shadow::derive_shadow_path(&source.repo_url, &config.shadows_location_base_path)?;
    let source_credential = resolve_credential(source)?;
    let repo = shadow::ensure_up_to_date(&shadow_path, &source.repo_url, &source_credential, token)?;

    let destination_credential = resolve_credential(destination)?;

    // Repurpose the single remote slot: replace the URL, never add a second
    // remote. It stays pointed at the destination until the next run
    // overwrites it again.
    repo.remote_set_url(SHADOW_REMOTE, &destination.repo_url)
        .map_err(ShadowError::Git)?;

    mirror_push(&repo, &destination.repo_url, &destination_credential, token)?;

    info!(
        source = %source.repo_name,
        destination = %destination.repo_name,
        "pair synced"
    );
    Ok(())
}

/// Run every configured pair sequentially, in configuration order.
///
/// Fail-fast: the first failing pair aborts the remaining ones.
pub fn run_all(config: &SyncConfig, token: &CancelToken) -> Result<(), SyncError> {
    for pair in &config.sync_options {
        if let Err(e) = sync_pair(config, pair, token) {
            error!(
                source = %pair.source_name,
                destination = %pair.destination_name,
                error = %e,
                "sync pair failed, aborting remaining pairs"
            );
            return Err(e);
        }
    }
    Ok(())
}

fn resolve_repository<'a>(
    config: &'a SyncConfig,
    name: &str,
    role: &str,
) -> Result<&'a RepositoryAccess, ConfigError> {
    config
        .repository(name)
        .ok_or_else(|| ConfigError::UnknownRepository {
            name: name.to_string(),
            role: role.to_string(),
        })
}

fn resolve_credential(repo: &RepositoryAccess) -> Result<SshCredential, AuthError> {
    SshCredential::resolve(
        &repo.repo_pem_file_name,
        &repo.repo_pem_file_password,
        repo.repo_skip_host_key_validation,
    )
}

/// Push the full ref namespace to the destination with force semantics,
/// overwriting its refs to match the shadow exactly. A push that transfers
/// nothing is a success.
///
/// libgit2 rejects glob push refspecs, so the `+refs/*:refs/*` mirror is
/// expressed as explicit per-ref refspecs: a forced update for every shadow
/// ref plus a deletion for every destination ref the shadow no longer has.
fn mirror_push(
    repo: &Repository,
    destination_url: &str,
    credential: &SshCredential,
    token: &CancelToken,
) -> Result<(), SyncError> {
    if token.is_cancelled() {
        return Err(TransportError::Cancelled.into());
    }

    let shadow_refs = shadow_ref_names(repo)?;
    let mut remote = repo.find_remote(SHADOW_REMOTE).map_err(ShadowError::Git)?;

    let destination_refs: BTreeSet<String> = {
        let callbacks = credential.remote_callbacks(token);
        let connection = remote
            .connect_auth(Direction::Push, Some(callbacks), None)
            .map_err(|e| classify_push_error(e, destination_url, token))?;
        connection
            .list()
            .map_err(|e| classify_push_error(e, destination_url, token))?
            .iter()
            .map(|head| head.name().to_string())
            .collect()
    };

    let mut refspecs: Vec<String> = shadow_refs.iter().map(|n| format!("+{n}:{n}")).collect();
    for name in &destination_refs {
        if name != "HEAD" && !shadow_refs.contains(name) {
            refspecs.push(format!(":{name}"));
        }
    }

    if refspecs.is_empty() {
        info!(url = destination_url, "nothing to push");
        return Ok(());
    }
    debug!(
        updates = shadow_refs.len(),
        deletions = refspecs.len() - shadow_refs.len(),
        "built push refspecs"
    );

    let mut callbacks = credential.remote_callbacks(token);
    let rejection = Arc::new(Mutex::new(None::<(String, String)>));
    let rejection_hook = rejection.clone();
    callbacks.push_update_reference(move |refname, status| {
        if let Some(msg) = status {
            warn!(refname, msg, "destination rejected ref update");
            *rejection_hook.lock().unwrap() = Some((refname.to_string(), msg.to_string()));
        }
        Ok(())
    });

    let mut opts = PushOptions::new();
    opts.remote_callbacks(callbacks);

    remote
        .push(&refspecs, Some(&mut opts))
        .map_err(|e| classify_push_error(e, destination_url, token))?;

    if let Some((refname, detail)) = rejection.lock().unwrap().take() {
        return Err(TransportError::PushRejected {
            url: destination_url.to_string(),
            refname,
            detail,
        }
        .into());
    }

    info!(url = destination_url, "mirror push completed");
    Ok(())
}

/// Names of all refs currently in the shadow.
fn shadow_ref_names(repo: &Repository) -> Result<BTreeSet<String>, ShadowError> {
    let mut names = BTreeSet::new();
    for reference in repo.references().map_err(ShadowError::Git)? {
        let reference = reference.map_err(ShadowError::Git)?;
        if let Ok(name) = reference.name() {
            names.insert(name.to_string());
        }
    }
    Ok(names)
}

fn classify_push_error(err: git2::Error, url: &str, token: &CancelToken) -> SyncError {
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
    TransportError::Push {
        url: url.to_string(),
        source: err,
    }
    .into()
}
