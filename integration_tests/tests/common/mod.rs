#![allow(dead_code)]

use std::sync::{Arc, Once};

use portal_core::{Portal, SharedPortal, DEFAULT_TITLE};
use portal_proto::Position;
use serde_json::json;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn fresh_portal() -> Arc<SharedPortal> {
    init_tracing();
    Arc::new(SharedPortal::new(Portal::new(1, DEFAULT_TITLE)))
}

/// Update payload deploying one resonator at `position`.
pub fn deploy_payload(position: Position, level: i64, health: i64, owner: &str) -> String {
    json!({
        "resonators": {
            position.as_str(): {
                "level": level,
                "health": health,
                "distance": 10,
                "owner": owner,
            }
        }
    })
    .to_string()
}

/// Update payload filling every slot with the same resonator.
pub fn full_deploy_payload(level: i64, health: i64) -> String {
    let resonators: serde_json::Map<String, serde_json::Value> = Position::ALL
        .iter()
        .map(|position| {
            (
                position.as_str().to_string(),
                json!({ "level": level, "health": health, "distance": 5, "owner": "agent" }),
            )
        })
        .collect();
    json!({ "faction": 1, "resonators": resonators }).to_string()
}
