//! Staging of incoming updates against a private working copy.
//!
//! Nothing here touches the live portal: callers hand in the committed value,
//! receive a validated working copy plus what changed, and decide whether to
//! commit it.

use std::sync::Arc;

use portal_proto::{ChangeSet, PortalUpdate, Position, ResonatorEntries};

use crate::portal::{Portal, ValidationError, MAX_RESONATORS};
use crate::resonator::{difference, Resonator};

/// A validated working copy and the changes that produced it.
#[derive(Debug, Clone)]
pub struct StagedUpdate {
    pub portal: Portal,
    pub changes: ChangeSet,
}

/// Working copy produced by the feed path, which only tracks whether
/// anything moved.
#[derive(Debug, Clone)]
pub struct StagedFeedUpdate {
    pub portal: Portal,
    pub changed: bool,
}

/// Diff `update` against `current` field by field, applying each observed
/// difference to a working copy, then validate the result.
pub fn stage_update(current: &Portal, update: &PortalUpdate) -> Result<StagedUpdate, ValidationError> {
    let mut working = current.clone();
    let mut changes = ChangeSet::default();

    if let Some(title) = &update.title {
        if *title != working.title {
            changes.title = Some(title.clone());
            working.title = title.clone();
        }
    }

    if let Some(faction) = update.faction {
        if faction != working.faction {
            changes.faction = Some(faction);
            working.faction = faction;
        }
    }

    if let Some(owner) = &update.owner {
        if *owner != working.owner {
            changes.owner = Some(owner.clone());
            working.owner = owner.clone();
        }
    }

    if let Some(mods) = &update.mods {
        if mods.as_slice() != working.mods.as_slice() {
            changes.mods = Some(mods.clone());
            working.mods = Arc::new(mods.clone());
        }
    }

    if let Some(entries) = &update.resonators {
        for (position, reso) in resolve_entries(entries)? {
            if let Some(change) = difference(working.resonators.get(&position), &reso) {
                changes.resonators.insert(position, change);
                working.resonators_mut().insert(position, reso);
            }
        }
    }

    if !changes.resonators.is_empty() {
        working.refresh_derived();
        changes.level = Some(working.level);
        changes.health = Some(working.health);
    }

    working.check()?;
    Ok(StagedUpdate {
        portal: working,
        changes,
    })
}

/// Feed-file variant: supplied resonators replace their slots without a
/// per-slot report, mods are compared in sorted order, and derived state is
/// recomputed whenever resonators are present.
pub fn stage_feed_update(
    current: &Portal,
    update: &PortalUpdate,
) -> Result<StagedFeedUpdate, ValidationError> {
    let mut working = current.clone();
    let mut changed = false;

    if let Some(title) = &update.title {
        if *title != working.title {
            working.title = title.clone();
            changed = true;
        }
    }

    if let Some(faction) = update.faction {
        if faction != working.faction {
            working.faction = faction;
            changed = true;
        }
    }

    if let Some(owner) = &update.owner {
        if *owner != working.owner {
            working.owner = owner.clone();
            changed = true;
        }
    }

    if let Some(mods) = &update.mods {
        let mut sorted = mods.clone();
        sorted.sort();
        if sorted != *working.mods {
            working.mods = Arc::new(sorted);
            changed = true;
        }
    }

    if let Some(entries) = &update.resonators {
        for (position, reso) in resolve_entries(entries)? {
            let previous = working.resonators_mut().insert(position, reso);
            changed |= previous.as_ref() != working.resonators.get(&position);
        }
        let (level, health) = (working.level, working.health);
        working.refresh_derived();
        changed |= level != working.level || health != working.health;
    }

    working.check()?;
    Ok(StagedFeedUpdate {
        portal: working,
        changed,
    })
}

/// Turn raw payload entries into typed slots. More than eight entries, a
/// label that is not a compass position, or an out-of-range value rejects the
/// whole update before anything is diffed.
fn resolve_entries(entries: &ResonatorEntries) -> Result<Vec<(Position, Resonator)>, ValidationError> {
    if entries.len() > MAX_RESONATORS {
        return Err(ValidationError::TooManyResonators(entries.len()));
    }
    entries
        .iter()
        .map(|(label, values)| {
            let position: Position = label
                .parse()
                .map_err(|_| ValidationError::InvalidPosition(label.to_string()))?;
            let reso = Resonator::from_update(position, values);
            reso.check()
                .map_err(|source| ValidationError::Resonator { position, source })?;
            Ok((position, reso))
        })
        .collect()
}
