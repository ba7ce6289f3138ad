//! Lock-guarded portal shared by every producer and reader in the process.
//!
//! The mutex is held only to copy the committed value out or to move a
//! validated working copy in. Parsing, diffing, validation, and rendering all
//! run on private copies outside the lock. A commit only lands on the version
//! it was staged from; a writer that loses the race stages again on the newer
//! state, so disjoint edits are never lost and overlapping fields end up with
//! the last committer's values.

use std::time::{Duration, SystemTime};

use parking_lot::Mutex;
use portal_proto::{
    decode_update_json, encode_current_json, encode_legacy_json, ChangeSet, PortalUpdate,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::diff::{stage_feed_update, stage_update};
use crate::metrics::{MetricsSnapshot, UpdateMetrics};
use crate::portal::{Portal, ValidationError};
use crate::snapshot::{current_status, legacy_status};

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("update payload is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("update rejected: {0}")]
    Validation(#[from] ValidationError),
}

/// Result of an accepted update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Changed(ChangeSet),
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedDisposition {
    Committed,
    Unchanged,
    Rejected(ValidationError),
}

/// What the feed reader learns from one line: how long to pause, and what
/// happened to the update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedOutcome {
    pub delay: Duration,
    pub disposition: FeedDisposition,
}

#[derive(Debug)]
pub struct SharedPortal {
    inner: Mutex<Portal>,
    metrics: UpdateMetrics,
}

impl SharedPortal {
    pub fn new(portal: Portal) -> Self {
        Self {
            inner: Mutex::new(portal),
            metrics: UpdateMetrics::default(),
        }
    }

    /// Independent copy of the committed state.
    pub fn snapshot(&self) -> Portal {
        self.inner.lock().clone()
    }

    pub fn faction(&self) -> i64 {
        self.inner.lock().faction()
    }

    pub fn health(&self) -> i64 {
        self.inner.lock().health()
    }

    pub fn level(&self) -> i64 {
        self.inner.lock().level()
    }

    pub fn version(&self) -> u64 {
        self.inner.lock().version()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub(crate) fn metrics_handle(&self) -> &UpdateMetrics {
        &self.metrics
    }

    pub fn render_current(&self) -> serde_json::Result<String> {
        let portal = self.snapshot();
        encode_current_json(&current_status(&portal))
    }

    pub fn render_legacy(&self) -> serde_json::Result<String> {
        let portal = self.snapshot();
        encode_legacy_json(&legacy_status(&portal))
    }

    pub fn apply_update_json(&self, payload: &str) -> Result<UpdateOutcome, UpdateError> {
        let update = self.decode(payload)?;
        self.apply_update(&update)
    }

    /// Stage `update` against a fresh copy of the committed state and commit
    /// it only if the whole result validates. If another writer commits in
    /// between, the update is staged again on top of that writer's result.
    pub fn apply_update(&self, update: &PortalUpdate) -> Result<UpdateOutcome, UpdateError> {
        loop {
            let working = self.snapshot();
            let staged = match stage_update(&working, update) {
                Ok(staged) => staged,
                Err(err) => {
                    self.metrics.record_rejected();
                    warn!(
                        target: "portal::update",
                        portal = working.id(),
                        error = %err,
                        "update.rejected=validation"
                    );
                    return Err(err.into());
                }
            };

            if staged.changes.is_empty() {
                self.metrics.record_unchanged();
                debug!(
                    target: "portal::update",
                    portal = working.id(),
                    "update.unchanged"
                );
                return Ok(UpdateOutcome::Unchanged);
            }

            let Some(version) = self.try_commit(working.version(), staged.portal) else {
                debug!(target: "portal::update", portal = working.id(), "update.restaged");
                continue;
            };
            self.metrics.record_committed();
            info!(
                target: "portal::update",
                portal = working.id(),
                version,
                resonators = staged.changes.resonators.len(),
                "update.committed"
            );
            return Ok(UpdateOutcome::Changed(staged.changes));
        }
    }

    /// Feed-file entry point: a parse failure is an error, everything else
    /// yields the payload's delay hint.
    pub fn apply_feed_line(&self, payload: &str) -> Result<FeedOutcome, UpdateError> {
        self.metrics.record_feed_line();
        let update = self.decode(payload)?;
        Ok(self.apply_feed_update(&update))
    }

    pub fn apply_feed_update(&self, update: &PortalUpdate) -> FeedOutcome {
        let delay = update.delay_hint();
        let disposition = loop {
            let working = self.snapshot();
            match stage_feed_update(&working, update) {
                Ok(staged) if staged.changed => {
                    let Some(version) = self.try_commit(working.version(), staged.portal) else {
                        debug!(target: "portal::feed", portal = working.id(), "feed.restaged");
                        continue;
                    };
                    self.metrics.record_committed();
                    info!(
                        target: "portal::feed",
                        portal = working.id(),
                        version,
                        "feed.committed"
                    );
                    break FeedDisposition::Committed;
                }
                Ok(_) => {
                    self.metrics.record_unchanged();
                    break FeedDisposition::Unchanged;
                }
                Err(err) => {
                    self.metrics.record_rejected();
                    warn!(
                        target: "portal::feed",
                        portal = working.id(),
                        error = %err,
                        "feed.rejected=validation"
                    );
                    break FeedDisposition::Rejected(err);
                }
            }
        };
        FeedOutcome { delay, disposition }
    }

    fn decode(&self, payload: &str) -> Result<PortalUpdate, UpdateError> {
        decode_update_json(payload).map_err(|err| {
            self.metrics.record_parse_failure();
            warn!(
                target: "portal::update",
                error = %err,
                "update.rejected=parse"
            );
            UpdateError::Parse(err)
        })
    }

    /// Commit `staged` if the live version is still `base_version`. Returns
    /// the new version, or `None` when another writer got there first.
    fn try_commit(&self, base_version: u64, mut staged: Portal) -> Option<u64> {
        staged.last_mod_time = SystemTime::now();
        let mut live = self.inner.lock();
        if live.version() != base_version {
            return None;
        }
        live.commit_from(staged);
        Some(live.version())
    }
}
