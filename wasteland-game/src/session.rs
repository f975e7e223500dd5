//! The per-player game session aggregate.
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;

use crate::bunker::BunkerStock;
use crate::constants::{DEFAULT_PLAYER_NAME, PLAYER_ID_HEX_LEN, PLAYER_ID_PREFIX};
use crate::entitlements::BundleCatalog;
use crate::error::ActionError;
use crate::inventory::Inventory;
use crate::ledger::{ResourceLedger, TerminalReason};
use crate::persistence::is_valid_key;
use crate::stats::{Achievement, RunStatistics};

/// Stable player identity used as the entitlement key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    /// Derive a `player_<hex>` id from the player name and caller entropy.
    #[must_use]
    pub fn derive(player_name: &str, entropy: u64) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(player_name.as_bytes());
        hasher.update(entropy.to_le_bytes());
        let digest = hasher.finalize();
        let hex: String = digest
            .iter()
            .take(PLAYER_ID_HEX_LEN / 2)
            .map(|byte| format!("{byte:02x}"))
            .collect();
        Self(format!("{PLAYER_ID_PREFIX}{hex}"))
    }

    /// Wrap an id that was issued earlier, e.g. read back from a snapshot.
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the id can key a storage document.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        is_valid_key(&self.0)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resource ledger, inventory and bunker for one player, plus how the run
/// ended once it has.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSession {
    player_name: String,
    player_id: PlayerId,
    ledger: ResourceLedger,
    inventory: Inventory,
    bunker: BunkerStock,
    ending: Option<TerminalReason>,
    claimed_bundles: BTreeSet<String>,
    stats: RunStatistics,
    achievements: BTreeSet<Achievement>,
}

impl GameSession {
    /// Fresh session with starting resources and a full bunker. A blank name
    /// falls back to the default survivor name.
    #[must_use]
    pub fn new(player_name: impl Into<String>, player_id: PlayerId) -> Self {
        let player_name = player_name.into();
        let trimmed = player_name.trim();
        let player_name = if trimmed.is_empty() {
            DEFAULT_PLAYER_NAME.to_string()
        } else {
            trimmed.to_string()
        };
        Self {
            player_name,
            player_id,
            ledger: ResourceLedger::new(),
            inventory: Inventory::new(),
            bunker: BunkerStock::new(),
            ending: None,
            claimed_bundles: BTreeSet::new(),
            stats: RunStatistics::default(),
            achievements: BTreeSet::new(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        player_name: String,
        player_id: PlayerId,
        ledger: ResourceLedger,
        inventory: Inventory,
        bunker: BunkerStock,
        ending: Option<TerminalReason>,
        claimed_bundles: BTreeSet<String>,
        stats: RunStatistics,
        achievements: BTreeSet<Achievement>,
    ) -> Self {
        Self {
            player_name,
            player_id,
            ledger,
            inventory,
            bunker,
            ending,
            claimed_bundles,
            stats,
            achievements,
        }
    }

    /// A brand new run for the same player. Nothing carries over except the
    /// name and id.
    #[must_use]
    pub fn reset(&self) -> Self {
        log::info!("resetting session for {}", self.player_id);
        Self::new(self.player_name.clone(), self.player_id.clone())
    }

    #[must_use]
    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    #[must_use]
    pub const fn player_id(&self) -> &PlayerId {
        &self.player_id
    }

    #[must_use]
    pub const fn ledger(&self) -> &ResourceLedger {
        &self.ledger
    }

    #[must_use]
    pub const fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    #[must_use]
    pub const fn bunker(&self) -> &BunkerStock {
        &self.bunker
    }

    #[must_use]
    pub const fn stats(&self) -> &RunStatistics {
        &self.stats
    }

    #[must_use]
    pub const fn claimed_bundles(&self) -> &BTreeSet<String> {
        &self.claimed_bundles
    }

    #[must_use]
    pub const fn achievements(&self) -> &BTreeSet<Achievement> {
        &self.achievements
    }

    /// Award every achievement the run now qualifies for, returning the new
    /// ones in award order.
    pub(crate) fn award_achievements(&mut self) -> Vec<Achievement> {
        let day = self.ledger.day();
        let earned: Vec<Achievement> = Achievement::ALL
            .into_iter()
            .filter(|achievement| !self.achievements.contains(achievement))
            .filter(|achievement| achievement.is_earned(day, &self.stats))
            .collect();
        for achievement in &earned {
            log::info!("{} earned {achievement}", self.player_id);
        }
        self.achievements.extend(earned.iter().copied());
        earned
    }

    /// Recorded ending, if the session has been closed.
    #[must_use]
    pub const fn ending(&self) -> Option<TerminalReason> {
        self.ending
    }

    /// Recorded ending, or the reason the ledger currently qualifies for.
    #[must_use]
    pub const fn terminal_reason(&self) -> Option<TerminalReason> {
        match self.ending {
            Some(reason) => Some(reason),
            None => self.ledger.terminal_reason(),
        }
    }

    #[must_use]
    pub const fn is_over(&self) -> bool {
        self.terminal_reason().is_some()
    }

    /// Run `f` against the mutable parts of a live session.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::SessionOver`] without calling `f` once the
    /// session is terminal.
    pub fn with_parts_mut<R>(
        &mut self,
        f: impl FnOnce(&mut ResourceLedger, &mut Inventory, &mut BunkerStock) -> R,
    ) -> Result<R, ActionError> {
        if let Some(reason) = self.terminal_reason() {
            return Err(ActionError::SessionOver { reason });
        }
        Ok(f(&mut self.ledger, &mut self.inventory, &mut self.bunker))
    }

    pub(crate) const fn stats_mut(&mut self) -> &mut RunStatistics {
        &mut self.stats
    }

    /// Close the session with `reason`. An earlier ending is kept.
    pub(crate) fn end(&mut self, reason: TerminalReason) -> TerminalReason {
        let reason = *self.ending.get_or_insert(reason);
        log::info!(
            "session for {} ended on day {}: {reason}",
            self.player_id,
            self.ledger.day()
        );
        reason
    }

    /// Record the ledger's terminal reason, if it has one.
    pub fn evaluate_terminal(&mut self) -> Option<TerminalReason> {
        if self.ending.is_some() {
            return self.ending;
        }
        let reason = self.ledger.terminal_reason()?;
        Some(self.end(reason))
    }

    /// Add a bundle's grant to the inventory once per session.
    ///
    /// Returns `Ok(false)` when the bundle was already claimed. Unknown bundles
    /// are recorded but grant nothing.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::SessionOver`] on a terminal session.
    pub fn claim_bundle(&mut self, bundle_id: &str, catalog: &BundleCatalog) -> Result<bool, ActionError> {
        if let Some(reason) = self.terminal_reason() {
            return Err(ActionError::SessionOver { reason });
        }
        if !self.claimed_bundles.insert(bundle_id.to_string()) {
            return Ok(false);
        }
        let grant = catalog.grant(bundle_id);
        if grant.is_empty() {
            log::warn!("bundle '{bundle_id}' has no catalog grant");
        }
        self.inventory.add_many(grant.iter().copied());
        log::info!(
            "{} claimed '{bundle_id}' ({} items)",
            self.player_id,
            grant.len()
        );
        Ok(true)
    }
}
