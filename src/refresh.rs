//! The refresh module
//! Keep the served snapshot in step with the roster source
//!
//! The artifact on disk is `Stale` when the roster source was modified after
//! it, or when it does not exist. `refresh` moves a stale artifact through
//! `Rebuilding` to `Fresh` and is a no-op on a fresh one.

use crate::config::Config;
use crate::error::{RecommendError, Result};
use crate::model::Snapshot;
use crate::roster::load_roster;
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError, RwLock},
    time::SystemTime,
};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshState {
    Stale,
    Rebuilding,
    Fresh,
}

/// Result of a [`Refresher::refresh`] call.
#[derive(Debug)]
pub enum RefreshOutcome {
    UpToDate,
    Rebuilt(Arc<Snapshot>),
}

/// Shared pointer to the snapshot currently being served.
///
/// Readers clone the inner `Arc` and keep using it for the whole request, so
/// a concurrent [`replace`](ModelHandle::replace) never shows them a mix of
/// old and new state. The handle also remembers the modification time of the
/// artifact the snapshot came from, if any.
pub struct ModelHandle {
    current: RwLock<Served>,
}

struct Served {
    snapshot: Arc<Snapshot>,
    artifact_time: Option<SystemTime>,
}

impl ModelHandle {
    /// Wraps a snapshot with no known artifact behind it.
    pub fn new(snapshot: Arc<Snapshot>) -> ModelHandle {
        ModelHandle::with_artifact_time(snapshot, None)
    }

    fn with_artifact_time(snapshot: Arc<Snapshot>, artifact_time: Option<SystemTime>) -> ModelHandle {
        ModelHandle { current: RwLock::new(Served { snapshot, artifact_time }) }
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot
            .clone()
    }

    /// Modification time of the artifact the served snapshot was loaded from or saved to.
    pub fn artifact_time(&self) -> Option<SystemTime> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).artifact_time
    }

    pub fn replace(&self, snapshot: Arc<Snapshot>) {
        self.swap(snapshot, None);
    }

    fn swap(&self, snapshot: Arc<Snapshot>, artifact_time: Option<SystemTime>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Served { snapshot, artifact_time };
    }
}

/// Rebuilds the artifact from the roster source when it goes stale.
pub struct Refresher {
    source: PathBuf,
    artifact: PathBuf,
    genre_delimiter: char,
    rebuilding: Mutex<()>,
    state: RwLock<Option<RefreshState>>,
}

impl Refresher {
    pub fn new(source: impl Into<PathBuf>, artifact: impl Into<PathBuf>, genre_delimiter: char) -> Refresher {
        Refresher {
            source: source.into(),
            artifact: artifact.into(),
            genre_delimiter,
            rebuilding: Mutex::new(()),
            state: RwLock::new(None),
        }
    }

    pub fn from_config(config: &Config) -> Refresher {
        Refresher::new(
            config.roster.path.clone(),
            config.model.artifact_path.clone(),
            config.roster.genre_delimiter,
        )
    }

    pub fn artifact_path(&self) -> &Path {
        &self.artifact
    }

    /// True when the source is newer than the artifact or the artifact is missing.
    ///
    /// A missing source is an error: there is nothing to rebuild from.
    pub fn is_stale(&self) -> Result<bool> {
        let source_time = modified(&self.source)?;

        let artifact_time = match modified(&self.artifact) {
            Ok(time) => time,
            Err(_) => return Ok(true),
        };

        Ok(source_time > artifact_time)
    }

    /// Current state, checked against the files on disk unless a rebuild is running.
    pub fn state(&self) -> RefreshState {
        if *self.state.read().unwrap_or_else(PoisonError::into_inner) == Some(RefreshState::Rebuilding) {
            return RefreshState::Rebuilding;
        }

        match self.is_stale() {
            Ok(false) => RefreshState::Fresh,
            _ => RefreshState::Stale,
        }
    }

    /// State as seen by a server holding `handle`.
    ///
    /// `Stale` also covers an artifact that was rewritten by someone else
    /// (e.g. `litrec build`) after the served snapshot was taken from it.
    pub fn served_state(&self, handle: &ModelHandle) -> RefreshState {
        match self.state() {
            RefreshState::Fresh if !self.serves_current_artifact(handle) => RefreshState::Stale,
            state => state,
        }
    }

    fn serves_current_artifact(&self, handle: &ModelHandle) -> bool {
        match (modified(&self.artifact), handle.artifact_time()) {
            (Ok(on_disk), Some(served)) => on_disk == served,
            _ => false,
        }
    }

    fn set_state(&self, state: RefreshState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = Some(state);
    }

    /// Rebuilds the artifact if it is stale. Calls are serialized.
    ///
    /// On failure the previous artifact is left in place and the state goes
    /// back to `Stale`.
    pub fn refresh(&self) -> Result<RefreshOutcome> {
        let _guard = self.rebuilding.lock().unwrap_or_else(PoisonError::into_inner);

        if !self.is_stale()? {
            debug!(artifact = %self.artifact.display(), "Model is up-to-date");
            self.set_state(RefreshState::Fresh);
            return Ok(RefreshOutcome::UpToDate);
        }

        info!(source = %self.source.display(), "Roster updated, rebuilding model");
        self.set_state(RefreshState::Rebuilding);

        match self.rebuild() {
            Ok(snapshot) => {
                self.set_state(RefreshState::Fresh);
                info!(
                    artifact = %self.artifact.display(),
                    agents = snapshot.roster().len(),
                    "Model saved"
                );
                Ok(RefreshOutcome::Rebuilt(Arc::new(snapshot)))
            }
            Err(e) => {
                self.set_state(RefreshState::Stale);
                warn!(error = %e, "Model rebuild failed, keeping previous artifact");
                Err(e)
            }
        }
    }

    fn rebuild(&self) -> Result<Snapshot> {
        let roster = load_roster(&self.source, self.genre_delimiter)?;
        let snapshot = Snapshot::build(roster)?;
        snapshot.save(&self.artifact)?;
        Ok(snapshot)
    }

    /// Startup path: rebuild if stale, otherwise load the existing artifact.
    pub fn load_or_build(&self) -> Result<Arc<Snapshot>> {
        match self.refresh()? {
            RefreshOutcome::Rebuilt(snapshot) => Ok(snapshot),
            RefreshOutcome::UpToDate => {
                info!(artifact = %self.artifact.display(), "Loading existing model");
                Ok(Arc::new(Snapshot::load(&self.artifact)?))
            }
        }
    }

    /// Startup path for a server: [`load_or_build`](Refresher::load_or_build)
    /// wrapped in a handle that knows which artifact it serves.
    pub fn open_handle(&self) -> Result<ModelHandle> {
        let snapshot = self.load_or_build()?;
        let artifact_time = modified(&self.artifact).ok();
        Ok(ModelHandle::with_artifact_time(snapshot, artifact_time))
    }

    /// Refreshes and swaps a new snapshot into `handle` when one is available.
    ///
    /// A snapshot is new either because this call rebuilt it, or because the
    /// artifact on disk no longer matches the one `handle` was filled from.
    /// Returns whether a swap happened.
    pub fn refresh_into(&self, handle: &ModelHandle) -> Result<bool> {
        match self.refresh()? {
            RefreshOutcome::Rebuilt(snapshot) => {
                handle.swap(snapshot, modified(&self.artifact).ok());
                Ok(true)
            }
            RefreshOutcome::UpToDate if self.serves_current_artifact(handle) => Ok(false),
            RefreshOutcome::UpToDate => {
                // Read the time first: a write racing the load shows up as a mismatch next time
                let artifact_time = modified(&self.artifact)?;
                let snapshot = Snapshot::load(&self.artifact)?;
                info!(
                    artifact = %self.artifact.display(),
                    agents = snapshot.roster().len(),
                    "Artifact changed on disk, swapping in"
                );
                handle.swap(Arc::new(snapshot), Some(artifact_time));
                Ok(true)
            }
        }
    }
}

fn modified(path: &Path) -> Result<SystemTime> {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|e| RecommendError::unavailable(path, e))
}
