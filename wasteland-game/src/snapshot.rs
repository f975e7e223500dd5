//! Flat, storage-agnostic record of a session.
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::bunker::BunkerStock;
use crate::constants::{RESOURCE_MAX, RESOURCE_MIN, SNAPSHOT_SCHEMA_VERSION, START_DAY};
use crate::error::SnapshotError;
use crate::inventory::{Inventory, ItemKind};
use crate::ledger::{Resource, ResourceLedger, ResourceLevels, TerminalReason};
use crate::session::{GameSession, PlayerId};
use crate::stats::{Achievement, RunStatistics};

const fn default_schema() -> u32 {
    SNAPSHOT_SCHEMA_VERSION
}

/// Serializable session record.
///
/// Unknown item tokens fail deserialization; everything else is checked by
/// [`SnapshotRecord::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    #[serde(default = "default_schema")]
    pub schema: u32,
    pub player_name: String,
    #[serde(default)]
    pub player_id: PlayerId,
    pub health: i32,
    pub food: i32,
    pub water: i32,
    pub radiation: i32,
    pub day: u32,
    #[serde(default)]
    pub inventory: Vec<ItemKind>,
    #[serde(default = "default_bunker")]
    pub bunker: BTreeMap<ItemKind, u32>,
    #[serde(default)]
    pub claimed_bundles: BTreeSet<String>,
    #[serde(default)]
    pub stats: RunStatistics,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub achievements: BTreeSet<Achievement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ending: Option<TerminalReason>,
}

fn default_bunker() -> BTreeMap<ItemKind, u32> {
    BunkerStock::new().counts().clone()
}

impl SnapshotRecord {
    #[must_use]
    pub const fn levels(&self) -> ResourceLevels {
        ResourceLevels {
            health: self.health,
            food: self.food,
            water: self.water,
            radiation: self.radiation,
        }
    }

    /// Check every field a session would otherwise have to clamp or guess.
    ///
    /// # Errors
    ///
    /// Returns the first problem found, in field order.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.schema != SNAPSHOT_SCHEMA_VERSION {
            return Err(SnapshotError::UnsupportedSchema {
                found: self.schema,
                expected: SNAPSHOT_SCHEMA_VERSION,
            });
        }
        if self.player_name.trim().is_empty() {
            return Err(SnapshotError::EmptyPlayerName);
        }
        if !self.player_id.is_empty() && !self.player_id.is_valid() {
            return Err(SnapshotError::InvalidPlayerId(self.player_id.to_string()));
        }
        let levels = self.levels();
        for resource in Resource::ALL {
            let value = levels.get(resource);
            if !(RESOURCE_MIN..=RESOURCE_MAX).contains(&value) {
                return Err(SnapshotError::ResourceOutOfRange { resource, value });
            }
        }
        if self.day < START_DAY {
            return Err(SnapshotError::InvalidDay(self.day));
        }
        if let Some(kind) = self.bunker.keys().find(|kind| !BunkerStock::is_stocked(**kind)) {
            return Err(SnapshotError::InvalidBunkerItem(*kind));
        }
        Ok(())
    }
}

/// Capture everything needed to rebuild `session` exactly.
#[must_use]
pub fn to_snapshot(session: &GameSession) -> SnapshotRecord {
    let levels = session.ledger().levels();
    SnapshotRecord {
        schema: SNAPSHOT_SCHEMA_VERSION,
        player_name: session.player_name().to_string(),
        player_id: session.player_id().clone(),
        health: levels.health,
        food: levels.food,
        water: levels.water,
        radiation: levels.radiation,
        day: session.ledger().day(),
        inventory: session.inventory().items().to_vec(),
        bunker: session.bunker().counts().clone(),
        claimed_bundles: session.claimed_bundles().clone(),
        stats: *session.stats(),
        achievements: session.achievements().clone(),
        ending: session.ending(),
    }
}

/// Rebuild a session, refusing malformed records instead of clamping them.
///
/// Records written before player ids existed get one derived from the name.
///
/// # Errors
///
/// Returns a [`SnapshotError`] describing the first invalid field.
pub fn from_snapshot(record: &SnapshotRecord) -> Result<GameSession, SnapshotError> {
    if let Err(err) = record.validate() {
        log::warn!("rejecting snapshot for '{}': {err}", record.player_name);
        return Err(err);
    }
    let bunker = BunkerStock::from_counts(&record.bunker)?;
    let player_id = if record.player_id.is_empty() {
        PlayerId::derive(&record.player_name, 0)
    } else {
        record.player_id.clone()
    };
    Ok(GameSession::from_parts(
        record.player_name.clone(),
        player_id,
        ResourceLedger::with_levels(record.levels(), record.day),
        Inventory::from_items(record.inventory.clone()),
        bunker,
        record.ending,
        record.claimed_bundles.clone(),
        record.stats,
        record.achievements.clone(),
    ))
}

/// # Errors
///
/// Returns an error if the record cannot be encoded.
pub fn snapshot_to_json(record: &SnapshotRecord) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(record)
}

/// # Errors
///
/// Returns an error for malformed JSON or unknown item tokens.
pub fn snapshot_from_json(json: &str) -> Result<SnapshotRecord, serde_json::Error> {
    serde_json::from_str(json)
}
