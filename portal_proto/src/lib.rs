//! Wire contracts for the portal state service.
//!
//! Producers push partial [`PortalUpdate`] payloads (JSON objects whose keys
//! are all optional); the engine answers with a [`ChangeSet`]. Readers receive
//! either the terse [`LegacyStatus`] or the richer [`CurrentStatus`] document.

mod position;

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub use position::{Position, UnknownPosition};

/// Values supplied for one resonator slot. Missing keys read as zero / empty,
/// so an entry of `{}` describes an empty slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResonatorUpdate {
    pub level: i64,
    pub health: i64,
    pub distance: i64,
    pub owner: String,
}

/// The `resonators` object of an update, in payload order.
///
/// Labels stay raw strings and duplicates are kept so that validation sees
/// exactly what the producer sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResonatorEntries(pub Vec<(String, ResonatorUpdate)>);

impl ResonatorEntries {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResonatorUpdate)> {
        self.0.iter().map(|(label, values)| (label.as_str(), values))
    }
}

impl FromIterator<(String, ResonatorUpdate)> for ResonatorEntries {
    fn from_iter<I: IntoIterator<Item = (String, ResonatorUpdate)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for ResonatorEntries {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, values) in &self.0 {
            map.serialize_entry(label, values)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ResonatorEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = ResonatorEntries;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object keyed by resonator position")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0).min(8));
                while let Some((label, values)) = access.next_entry::<String, ResonatorUpdate>()? {
                    entries.push((label, values));
                }
                Ok(ResonatorEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// A partial portal update. Absent keys leave the current value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortalUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faction: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mods: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resonators: Option<ResonatorEntries>,
    /// Seconds the feed reader should pause before the next line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<f64>,
}

impl PortalUpdate {
    /// The `delay` hint as a duration. Negative, zero, or non-finite values
    /// mean "no extra pause".
    pub fn delay_hint(&self) -> Duration {
        match self.delay {
            Some(seconds) if seconds.is_finite() && seconds > 0.0 => {
                Duration::try_from_secs_f64(seconds).unwrap_or(Duration::ZERO)
            }
            _ => Duration::ZERO,
        }
    }
}

/// Field-level differences for one resonator slot.
///
/// A freshly occupied slot reports every field; otherwise only fields whose
/// value moved are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResonatorChange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<i64>,
    #[serde(rename = "level-change", default, skip_serializing_if = "Option::is_none")]
    pub level_change: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<i64>,
    #[serde(rename = "health-change", default, skip_serializing_if = "Option::is_none")]
    pub health_change: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(rename = "owner-old", default, skip_serializing_if = "Option::is_none")]
    pub owner_old: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<i64>,
    #[serde(rename = "distance-old", default, skip_serializing_if = "Option::is_none")]
    pub distance_old: Option<i64>,
}

impl ResonatorChange {
    pub fn is_empty(&self) -> bool {
        self.level.is_none()
            && self.health.is_none()
            && self.owner.is_none()
            && self.distance.is_none()
    }
}

/// Everything an accepted update changed on a portal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faction: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mods: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<i64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resonators: BTreeMap<Position, ResonatorChange>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.faction.is_none()
            && self.owner.is_none()
            && self.mods.is_none()
            && self.level.is_none()
            && self.health.is_none()
            && self.resonators.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyResonator {
    pub level: i64,
    pub health: i64,
    pub position: Position,
}

/// Terse status document consumed by older clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyStatus {
    #[serde(rename = "controllingFaction")]
    pub controlling_faction: i64,
    pub health: i64,
    pub level: i64,
    pub title: String,
    pub resonators: Vec<LegacyResonator>,
}

/// Per-slot entry of the current format. Health and distance are only
/// written for deployed resonators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentResonator {
    pub level: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentStatus {
    pub faction: i64,
    pub health: i64,
    pub level: i64,
    pub title: String,
    pub resonators: BTreeMap<Position, CurrentResonator>,
    pub mods: Vec<String>,
}

/// One line of a line-oriented update feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedLine<'a> {
    Blank,
    Comment,
    Update(&'a str),
}

pub fn classify_feed_line(line: &str) -> FeedLine<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        FeedLine::Blank
    } else if trimmed.starts_with('#') {
        FeedLine::Comment
    } else {
        FeedLine::Update(trimmed)
    }
}

pub fn decode_update_json(data: &str) -> serde_json::Result<PortalUpdate> {
    serde_json::from_str(data)
}

pub fn encode_update_json(update: &PortalUpdate) -> serde_json::Result<String> {
    serde_json::to_string(update)
}

pub fn encode_change_set_json(changes: &ChangeSet) -> serde_json::Result<String> {
    serde_json::to_string(changes)
}

pub fn encode_legacy_json(status: &LegacyStatus) -> serde_json::Result<String> {
    serde_json::to_string(status)
}

pub fn encode_current_json(status: &CurrentStatus) -> serde_json::Result<String> {
    serde_json::to_string(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_payload_leaves_other_keys_absent() {
        let update = decode_update_json(r#"{"faction": 2, "title": "Fountain"}"#)
            .expect("payload should parse");
        assert_eq!(update.faction, Some(2));
        assert_eq!(update.title.as_deref(), Some("Fountain"));
        assert!(update.owner.is_none());
        assert!(update.mods.is_none());
        assert!(update.resonators.is_none());
    }

    #[test]
    fn resonator_entries_keep_unknown_labels_and_duplicates() {
        let update = decode_update_json(
            r#"{"resonators": {"N": {"level": 3}, "UP": {"level": 1}, "N": {"level": 5}}}"#,
        )
        .expect("payload should parse");
        let entries = update.resonators.expect("resonators present");
        let labels: Vec<&str> = entries.iter().map(|(label, _)| label).collect();
        assert_eq!(labels, vec!["N", "UP", "N"]);
        assert_eq!(entries.0[2].1.level, 5);
    }

    #[test]
    fn encoded_update_keeps_entry_order_and_omits_absent_keys() {
        let update = decode_update_json(
            r#"{"faction": 1, "resonators": {"W": {"level": 2}, "UP": {}, "W": {"level": 4}}}"#,
        )
        .expect("payload should parse");
        let json = encode_update_json(&update).expect("encode");
        assert!(json.starts_with(r#"{"faction":1,"resonators":{"W":{"level":2,"#));
        assert!(!json.contains("title"));
        assert!(!json.contains("delay"));

        let again = decode_update_json(&json).expect("re-encoded payload parses");
        assert_eq!(again, update);
    }

    #[test]
    fn missing_resonator_fields_default_to_zero() {
        let update = decode_update_json(r#"{"resonators": {"SW": {"owner": "kit"}}}"#)
            .expect("payload should parse");
        let entries = update.resonators.expect("resonators present");
        assert_eq!(
            entries.0[0].1,
            ResonatorUpdate {
                level: 0,
                health: 0,
                distance: 0,
                owner: "kit".to_string(),
            }
        );
    }

    #[test]
    fn wrong_value_type_is_a_parse_error() {
        assert!(decode_update_json(r#"{"faction": "blue"}"#).is_err());
        assert!(decode_update_json(r#"[1, 2, 3]"#).is_err());
        assert!(decode_update_json("{not json").is_err());
    }

    #[test]
    fn delay_hint_ignores_negative_and_missing_values() {
        let mut update = PortalUpdate::default();
        assert_eq!(update.delay_hint(), Duration::ZERO);
        update.delay = Some(-3.0);
        assert_eq!(update.delay_hint(), Duration::ZERO);
        update.delay = Some(f64::NAN);
        assert_eq!(update.delay_hint(), Duration::ZERO);
        update.delay = Some(1.5);
        assert_eq!(update.delay_hint(), Duration::from_millis(1500));
    }

    #[test]
    fn integer_delay_is_accepted() {
        let update = decode_update_json(r#"{"delay": 2}"#).expect("payload should parse");
        assert_eq!(update.delay_hint(), Duration::from_secs(2));
    }

    #[test]
    fn change_set_uses_hyphenated_delta_keys() {
        let mut changes = ChangeSet::default();
        changes.resonators.insert(
            Position::NE,
            ResonatorChange {
                level: Some(5),
                level_change: Some(2),
                health: Some(80),
                health_change: Some(30),
                ..Default::default()
            },
        );
        let json = encode_change_set_json(&changes).expect("encode");
        assert_eq!(
            json,
            r#"{"resonators":{"NE":{"level":5,"level-change":2,"health":80,"health-change":30}}}"#
        );
    }

    #[test]
    fn change_set_decodes_from_server_reply() {
        let changes: ChangeSet = serde_json::from_str(
            r#"{"faction":1,"level":1,"health":62,"resonators":{"S":{"health":62,"health-change":-38,"owner":"kit","owner-old":"ada"}}}"#,
        )
        .expect("reply should decode");
        assert_eq!(changes.faction, Some(1));
        let south = &changes.resonators[&Position::S];
        assert_eq!(south.health_change, Some(-38));
        assert_eq!(south.owner_old.as_deref(), Some("ada"));
        assert!(south.level.is_none());
    }

    #[test]
    fn empty_change_set_reports_empty() {
        assert!(ChangeSet::default().is_empty());
        let changes = ChangeSet {
            mods: Some(Vec::new()),
            ..Default::default()
        };
        assert!(!changes.is_empty());
    }

    #[test]
    fn positions_parse_case_sensitively() {
        assert_eq!("NW".parse::<Position>(), Ok(Position::NW));
        assert_eq!(
            "nw".parse::<Position>(),
            Err(UnknownPosition("nw".to_string()))
        );
        let labels: Vec<&str> = Position::ALL.iter().map(|p| p.as_str()).collect();
        assert_eq!(labels, vec!["E", "NE", "N", "NW", "W", "SW", "S", "SE"]);
    }

    #[test]
    fn feed_lines_are_classified_after_trimming() {
        assert_eq!(classify_feed_line("   \n"), FeedLine::Blank);
        assert_eq!(classify_feed_line("  # scenario two"), FeedLine::Comment);
        assert_eq!(
            classify_feed_line("  {\"faction\": 1}\n"),
            FeedLine::Update("{\"faction\": 1}")
        );
    }
}
