use portal_proto::{Position, ResonatorChange, ResonatorUpdate};
use thiserror::Error;

pub const MAX_RESONATOR_LEVEL: i64 = 8;
pub const MAX_RESONATOR_HEALTH: i64 = 100;
pub const MAX_RESONATOR_DISTANCE: i64 = 100;

/// Range violation on a single resonator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResonatorError {
    #[error("level {0} outside 0..=8")]
    LevelOutOfRange(i64),
    #[error("health {0} outside 0..=100")]
    HealthOutOfRange(i64),
    #[error("distance {0} outside 0..=100")]
    DistanceOutOfRange(i64),
}

/// One directional sub-structure of a portal.
///
/// The position is the slot identity and never changes. Values built from a
/// payload are taken as-is and only range-checked by [`Resonator::check`];
/// the setters keep `level == 0 => health == 0 && distance == 0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resonator {
    position: Position,
    level: i64,
    health: i64,
    distance: i64,
    owner: String,
}

impl Resonator {
    /// An empty slot.
    pub fn new(position: Position) -> Self {
        Self {
            position,
            level: 0,
            health: 0,
            distance: 0,
            owner: String::new(),
        }
    }

    pub fn from_update(position: Position, values: &ResonatorUpdate) -> Self {
        Self {
            position,
            level: values.level,
            health: values.health,
            distance: values.distance,
            owner: values.owner.clone(),
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn level(&self) -> i64 {
        self.level
    }

    pub fn health(&self) -> i64 {
        self.health
    }

    pub fn distance(&self) -> i64 {
        self.distance
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn set_level(&mut self, level: i64) -> Result<(), ResonatorError> {
        if !(0..=MAX_RESONATOR_LEVEL).contains(&level) {
            return Err(ResonatorError::LevelOutOfRange(level));
        }
        self.level = level;
        if level == 0 {
            self.health = 0;
            self.distance = 0;
        }
        Ok(())
    }

    pub fn set_health(&mut self, health: i64) -> Result<(), ResonatorError> {
        if !(0..=MAX_RESONATOR_HEALTH).contains(&health) {
            return Err(ResonatorError::HealthOutOfRange(health));
        }
        self.health = health;
        if health == 0 {
            self.level = 0;
            self.distance = 0;
        }
        Ok(())
    }

    pub fn set_distance(&mut self, distance: i64) -> Result<(), ResonatorError> {
        if !(0..=MAX_RESONATOR_DISTANCE).contains(&distance) {
            return Err(ResonatorError::DistanceOutOfRange(distance));
        }
        self.distance = distance;
        Ok(())
    }

    pub fn set_owner(&mut self, owner: impl Into<String>) {
        self.owner = owner.into();
    }

    pub fn check(&self) -> Result<(), ResonatorError> {
        if !(0..=MAX_RESONATOR_LEVEL).contains(&self.level) {
            return Err(ResonatorError::LevelOutOfRange(self.level));
        }
        if !(0..=MAX_RESONATOR_HEALTH).contains(&self.health) {
            return Err(ResonatorError::HealthOutOfRange(self.health));
        }
        if !(0..=MAX_RESONATOR_DISTANCE).contains(&self.distance) {
            return Err(ResonatorError::DistanceOutOfRange(self.distance));
        }
        Ok(())
    }
}

/// Differences between the slot's previous occupant and its replacement.
///
/// `None` as `old` means the slot was empty, so every field of `new` is
/// reported. Returns `None` when nothing differs. Positions are never compared.
pub fn difference(old: Option<&Resonator>, new: &Resonator) -> Option<ResonatorChange> {
    let Some(old) = old else {
        return Some(ResonatorChange {
            level: Some(new.level),
            health: Some(new.health),
            owner: Some(new.owner.clone()),
            distance: Some(new.distance),
            ..Default::default()
        });
    };

    let mut change = ResonatorChange::default();
    if new.level != old.level {
        change.level = Some(new.level);
        change.level_change = Some(new.level.saturating_sub(old.level));
    }
    if new.health != old.health {
        change.health = Some(new.health);
        change.health_change = Some(new.health.saturating_sub(old.health));
    }
    if new.owner != old.owner {
        change.owner = Some(new.owner.clone());
        change.owner_old = Some(old.owner.clone());
    }
    if new.distance != old.distance {
        change.distance = Some(new.distance);
        change.distance_old = Some(old.distance);
    }

    if change.is_empty() {
        None
    } else {
        Some(change)
    }
}
