use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::SystemTime;

use portal_proto::Position;
use thiserror::Error;

use crate::resonator::{Resonator, ResonatorError};

pub const DEFAULT_TITLE: &str = "default portal";
pub const MAX_FACTION: i64 = 2;
pub const MAX_PORTAL_LEVEL: i64 = 8;
pub const MAX_PORTAL_HEALTH: i64 = 100;
pub const MAX_TITLE_CHARS: usize = 300;
pub const MAX_RESONATORS: usize = 8;
pub const MAX_MODS: usize = 4;

/// Modifier codes a portal may carry.
pub const MOD_WHITELIST: [&str; 15] = [
    "FA", "HS-C", "HS-R", "HS-VR", "LA-R", "LA-VR", "SBUL", "MH-C", "MH-R", "MH-VR", "PS-C",
    "PS-R", "PS-VR", "AXA", "T",
];

/// XM invested in a resonator of each level, indexed by level 0..=8.
pub const RESONATOR_XM_WEIGHTS: [f64; 9] = [
    0.0, 1000.0, 1500.0, 2000.0, 2500.0, 3000.0, 4000.0, 5000.0, 6000.0,
];

/// Why a portal state was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("faction {0} outside 0..=2")]
    FactionOutOfRange(i64),
    #[error("portal health {0} outside 0..=100")]
    HealthOutOfRange(i64),
    #[error("portal level {0} outside 0..=8")]
    LevelOutOfRange(i64),
    #[error("title has {0} characters, limit is 300")]
    TitleTooLong(usize),
    #[error("{0} resonator entries, limit is 8")]
    TooManyResonators(usize),
    #[error("resonator position '{0}' is not a compass label")]
    InvalidPosition(String),
    #[error("resonator {position}: {source}")]
    Resonator {
        position: Position,
        #[source]
        source: ResonatorError,
    },
    #[error("{0} mods installed, limit is 4")]
    TooManyMods(usize),
    #[error("mod '{0}' is not a known modifier code")]
    UnknownMod(String),
}

/// Live state of one map location.
///
/// `resonators` and `mods` sit behind `Arc` so a cloned working copy shares
/// them with the committed value until it modifies one of them.
#[derive(Debug, Clone, PartialEq)]
pub struct Portal {
    id: u32,
    pub(crate) faction: i64,
    pub(crate) title: String,
    pub(crate) owner: String,
    pub(crate) owner_id: i64,
    pub(crate) resonators: Arc<BTreeMap<Position, Resonator>>,
    pub(crate) mods: Arc<Vec<String>>,
    pub(crate) level: i64,
    pub(crate) health: i64,
    create_time: SystemTime,
    pub(crate) last_mod_time: SystemTime,
    version: u64,
}

impl Portal {
    pub fn new(id: u32, title: impl Into<String>) -> Self {
        let now = SystemTime::now();
        Self {
            id,
            faction: 0,
            title: title.into(),
            owner: String::new(),
            owner_id: 0,
            resonators: Arc::new(BTreeMap::new()),
            mods: Arc::new(Vec::new()),
            level: 0,
            health: 0,
            create_time: now,
            last_mod_time: now,
            version: 0,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn faction(&self) -> i64 {
        self.faction
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn owner_id(&self) -> i64 {
        self.owner_id
    }

    pub fn resonators(&self) -> &BTreeMap<Position, Resonator> {
        &self.resonators
    }

    pub fn resonator(&self, position: Position) -> Option<&Resonator> {
        self.resonators.get(&position)
    }

    pub fn mods(&self) -> &[String] {
        &self.mods
    }

    /// Derived level as of the last resonator change.
    pub fn level(&self) -> i64 {
        self.level
    }

    /// Derived health as of the last resonator change.
    pub fn health(&self) -> i64 {
        self.health
    }

    pub fn create_time(&self) -> SystemTime {
        self.create_time
    }

    pub fn last_mod_time(&self) -> SystemTime {
        self.last_mod_time
    }

    /// Number of commits applied to this portal.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Sum of deployed resonator levels over the full eight slots, rounded
    /// down. A partially built portal levels toward zero.
    pub fn compute_level(&self) -> i64 {
        let level_sum = self
            .resonators
            .values()
            .map(Resonator::level)
            .fold(0_i64, i64::saturating_add);
        level_sum / MAX_RESONATORS as i64
    }

    /// XM-weighted average of resonator health, as a percentage.
    pub fn compute_health(&self) -> i64 {
        let mut total_weight = 0.0_f64;
        let mut weighted_health = 0.0_f64;
        for reso in self.resonators.values() {
            let weight = xm_weight(reso.level());
            total_weight += weight;
            weighted_health += (reso.health() as f64 / 100.0) * weight;
        }
        if total_weight < 1e-5 {
            return 0;
        }
        let health = ((weighted_health / total_weight) * 100.0).floor() as i64;
        health.min(MAX_PORTAL_HEALTH)
    }

    pub(crate) fn refresh_derived(&mut self) {
        self.level = self.compute_level();
        self.health = self.compute_health();
    }

    pub(crate) fn resonators_mut(&mut self) -> &mut BTreeMap<Position, Resonator> {
        Arc::make_mut(&mut self.resonators)
    }

    /// Copy a validated working copy into this instance, keeping identity and
    /// creation time.
    pub(crate) fn commit_from(&mut self, staged: Portal) {
        self.faction = staged.faction;
        self.title = staged.title;
        self.owner = staged.owner;
        self.owner_id = staged.owner_id;
        self.resonators = staged.resonators;
        self.mods = staged.mods;
        self.level = staged.level;
        self.health = staged.health;
        self.last_mod_time = staged.last_mod_time;
        self.version += 1;
    }

    pub fn check(&self) -> Result<(), ValidationError> {
        if !(0..=MAX_FACTION).contains(&self.faction) {
            return Err(ValidationError::FactionOutOfRange(self.faction));
        }
        if !(0..=MAX_PORTAL_HEALTH).contains(&self.health) {
            return Err(ValidationError::HealthOutOfRange(self.health));
        }
        if !(0..=MAX_PORTAL_LEVEL).contains(&self.level) {
            return Err(ValidationError::LevelOutOfRange(self.level));
        }
        let title_chars = self.title.chars().count();
        if title_chars > MAX_TITLE_CHARS {
            return Err(ValidationError::TitleTooLong(title_chars));
        }
        if self.resonators.len() > MAX_RESONATORS {
            return Err(ValidationError::TooManyResonators(self.resonators.len()));
        }
        for (position, reso) in self.resonators.iter() {
            reso.check()
                .map_err(|source| ValidationError::Resonator {
                    position: *position,
                    source,
                })?;
        }
        if self.mods.len() > MAX_MODS {
            return Err(ValidationError::TooManyMods(self.mods.len()));
        }
        if let Some(unknown) = self
            .mods
            .iter()
            .find(|code| !MOD_WHITELIST.contains(&code.as_str()))
        {
            return Err(ValidationError::UnknownMod(unknown.clone()));
        }
        Ok(())
    }
}

fn xm_weight(level: i64) -> f64 {
    usize::try_from(level)
        .ok()
        .and_then(|index| RESONATOR_XM_WEIGHTS.get(index))
        .copied()
        .unwrap_or(0.0)
}
