use portal_proto::{CurrentResonator, CurrentStatus, LegacyResonator, LegacyStatus};

use crate::portal::Portal;
use crate::resonator::Resonator;

pub fn legacy_resonator(reso: &Resonator) -> LegacyResonator {
    LegacyResonator {
        level: reso.level(),
        health: reso.health(),
        position: reso.position(),
    }
}

/// Level-0 slots collapse to `{"level": 0}`; health and distance are
/// implied zero.
pub fn current_resonator(reso: &Resonator) -> CurrentResonator {
    if reso.level() == 0 {
        CurrentResonator {
            level: 0,
            health: None,
            distance: None,
        }
    } else {
        CurrentResonator {
            level: reso.level(),
            health: Some(reso.health()),
            distance: Some(reso.distance()),
        }
    }
}

/// Terse rendering. Empty slots are left out.
pub fn legacy_status(portal: &Portal) -> LegacyStatus {
    LegacyStatus {
        controlling_faction: portal.faction(),
        health: portal.health(),
        level: portal.level(),
        title: portal.title().to_string(),
        resonators: portal
            .resonators()
            .values()
            .filter(|reso| reso.level() > 0)
            .map(legacy_resonator)
            .collect(),
    }
}

/// Current rendering. A level-0 portal renders as neutral and bare: no
/// faction, health, resonators, or mods.
pub fn current_status(portal: &Portal) -> CurrentStatus {
    if portal.level() == 0 {
        return CurrentStatus {
            faction: 0,
            health: 0,
            level: 0,
            title: portal.title().to_string(),
            resonators: Default::default(),
            mods: Vec::new(),
        };
    }

    CurrentStatus {
        faction: portal.faction(),
        health: portal.health(),
        level: portal.level(),
        title: portal.title().to_string(),
        resonators: portal
            .resonators()
            .iter()
            .filter(|(_, reso)| reso.level() > 0)
            .map(|(position, reso)| (*position, current_resonator(reso)))
            .collect(),
        mods: portal.mods().to_vec(),
    }
}
