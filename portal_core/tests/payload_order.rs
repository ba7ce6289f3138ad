use portal_core::diff::stage_update;
use portal_core::{Portal, DEFAULT_TITLE};
use portal_proto::{Position, PortalUpdate, ResonatorEntries, ResonatorUpdate};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

fn entries(rng: &mut SmallRng) -> Vec<(String, ResonatorUpdate)> {
    let mut listed = Vec::new();
    for position in Position::ALL {
        if !rng.gen_bool(0.7) {
            continue;
        }
        let level = rng.gen_range(1..=8);
        listed.push((
            position.to_string(),
            ResonatorUpdate {
                level,
                health: rng.gen_range(0..=100),
                distance: rng.gen_range(0..=40),
                owner: format!("agent-{level}"),
            },
        ));
    }
    listed
}

#[test]
fn entry_order_does_not_change_the_outcome() {
    let mut rng = SmallRng::seed_from_u64(17);
    let base = Portal::new(3, DEFAULT_TITLE);

    for _ in 0..64 {
        let mut listed = entries(&mut rng);
        let ordered = PortalUpdate {
            resonators: Some(ResonatorEntries(listed.clone())),
            ..Default::default()
        };
        listed.shuffle(&mut rng);
        let shuffled = PortalUpdate {
            resonators: Some(ResonatorEntries(listed)),
            ..Default::default()
        };

        let a = stage_update(&base, &ordered).expect("valid payload");
        let b = stage_update(&base, &shuffled).expect("valid payload");
        assert_eq!(a.changes, b.changes);
        assert_eq!(a.portal.resonators(), b.portal.resonators());
        assert_eq!(a.portal.level(), b.portal.level());
        assert_eq!(a.portal.health(), b.portal.health());
    }
}

#[test]
fn change_report_positions_follow_slot_order() {
    let mut rng = SmallRng::seed_from_u64(99);
    let base = Portal::new(3, DEFAULT_TITLE);
    let mut listed = entries(&mut rng);
    listed.shuffle(&mut rng);
    let update = PortalUpdate {
        resonators: Some(ResonatorEntries(listed)),
        ..Default::default()
    };

    let staged = stage_update(&base, &update).expect("valid payload");
    let reported: Vec<Position> = staged.changes.resonators.keys().copied().collect();
    let mut sorted = reported.clone();
    sorted.sort();
    assert_eq!(reported, sorted);
}
