//! Wasteland Game Engine
//!
//! Platform-agnostic core for a turn-based post-apocalyptic survival game.
//! This crate owns the resource ledger, encounter resolution and the bunker
//! turn loop; storage and input transport sit behind traits.

pub mod bunker;
pub mod constants;
pub mod encounters;
pub mod entitlements;
pub mod error;
pub mod inventory;
pub mod ledger;
pub mod machine;
pub mod persistence;
pub mod rest;
pub mod session;
pub mod snapshot;
pub mod stats;

use anyhow::Context;

// Re-export commonly used types
pub use bunker::{BunkerRequest, BunkerStock};
pub use encounters::{
    CreatureTactic, Encounter, EncounterCategory, EncounterDecisions, FightResult,
    FixedDecisions, ItemBundle, SoundOutcome, SoundResponse, WastelandTrip,
    apply_radiation_exposure, enter_wasteland, resolve_wasteland_encounter,
};
pub use entitlements::{
    BundleCatalog, EntitlementGateway, JsonFileEntitlements, MEGA_PACK, MemoryEntitlements,
    PREMIUM_BUNDLE, STARTER_PACK,
};
pub use error::{ActionError, PersistError, SnapshotError};
pub use inventory::{Inventory, ItemKind};
pub use ledger::{
    DayAdvance, RadiationBand, Resource, ResourceLedger, ResourceLevels, TerminalReason,
};
pub use machine::{
    Action, ActionStateMachine, ChoiceSource, MachineState, ScriptedChoices, TurnEvent,
    TurnReport, is_yes,
};
pub use persistence::{JsonFileStore, MemoryStore, PersistenceGateway};
pub use rest::{RestDecisions, RestReport, rest};
pub use session::{GameSession, PlayerId};
pub use snapshot::{SnapshotRecord, from_snapshot, to_snapshot};
pub use stats::{Achievement, RunStatistics, RunSummary, run_summary};

/// Outcome of [`SurvivalEngine::start_session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStart {
    pub session: GameSession,
    /// Whether the session was rebuilt from a stored snapshot.
    pub resumed: bool,
    /// Bundles newly claimed into the session while starting it.
    pub claimed: Vec<String>,
}

/// Main engine tying sessions to their storage and entitlement gateways.
pub struct SurvivalEngine<P, E>
where
    P: PersistenceGateway,
    E: EntitlementGateway,
{
    persistence: P,
    entitlements: E,
    catalog: BundleCatalog,
}

impl<P, E> SurvivalEngine<P, E>
where
    P: PersistenceGateway,
    E: EntitlementGateway,
{
    /// Create an engine using the default bundle catalog.
    pub fn new(persistence: P, entitlements: E) -> Self {
        Self {
            persistence,
            entitlements,
            catalog: BundleCatalog::default(),
        }
    }

    #[must_use]
    pub fn with_catalog(mut self, catalog: BundleCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub const fn persistence(&self) -> &P {
        &self.persistence
    }

    pub const fn entitlements(&self) -> &E {
        &self.entitlements
    }

    pub const fn catalog(&self) -> &BundleCatalog {
        &self.catalog
    }

    /// Resume `session_id` or start a fresh run, then claim owned bundles.
    ///
    /// A missing snapshot starts a new session for `player_name` under the
    /// store's player id. The first session in a store derives that id from
    /// the name and `entropy` and records it for every later game. A stored
    /// session that already ended is replaced by a fresh run for the same
    /// player.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored snapshot cannot be read or is invalid,
    /// or if entitlements cannot be read.
    pub fn start_session(
        &self,
        session_id: &str,
        player_name: &str,
        entropy: u64,
    ) -> Result<SessionStart, PersistError> {
        let (mut session, resumed) = match self.persistence.load(session_id) {
            Ok(record) => {
                let session = from_snapshot(&record)?;
                if session.is_over() {
                    log::info!("stored session {session_id} had ended; starting over");
                    (session.reset(), false)
                } else {
                    (session, true)
                }
            }
            Err(err) if err.is_not_found() => {
                let player_id = self.player_id(player_name, entropy)?;
                (GameSession::new(player_name, player_id), false)
            }
            Err(err) => {
                log::warn!("could not load session {session_id}: {err}");
                return Err(err);
            }
        };
        let claimed = self.claim_owned_bundles(&mut session)?;
        log::info!(
            "session {session_id} started for {} (resumed: {resumed})",
            session.player_id()
        );
        Ok(SessionStart {
            session,
            resumed,
            claimed,
        })
    }

    /// The store's player id, issuing and recording one on first use.
    fn player_id(&self, player_name: &str, entropy: u64) -> Result<PlayerId, PersistError> {
        if let Some(player_id) = self.persistence.load_player_id()? {
            return Ok(player_id);
        }
        let player_id = PlayerId::derive(player_name, entropy);
        self.persistence.save_player_id(&player_id)?;
        log::info!("issued player id {player_id}");
        Ok(player_id)
    }

    /// Claim every bundle the player owns that the session has not claimed.
    ///
    /// # Errors
    ///
    /// Returns an error if entitlements cannot be read.
    pub fn claim_owned_bundles(&self, session: &mut GameSession) -> Result<Vec<String>, PersistError> {
        if session.is_over() {
            return Ok(Vec::new());
        }
        let owned = self.entitlements.entitlements(session.player_id())?;
        Ok(owned
            .into_iter()
            .filter(|bundle| matches!(session.claim_bundle(bundle, &self.catalog), Ok(true)))
            .collect())
    }

    /// Record a bundle purchase for `player`.
    ///
    /// # Errors
    ///
    /// Returns an error if the entitlement cannot be stored.
    pub fn grant_bundle(&self, player: &PlayerId, bundle: &str) -> Result<bool, PersistError> {
        self.entitlements.grant_entitlement(player, bundle)
    }

    /// Persist `session` under `session_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be stored. The in-memory
    /// session is unaffected.
    pub fn save_session(&self, session_id: &str, session: &GameSession) -> Result<(), PersistError> {
        self.persistence
            .save(session_id, &to_snapshot(session))
            .inspect_err(|err| log::warn!("saving session {session_id} failed: {err}"))
    }

    /// Drop the stored snapshot for `session_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing snapshot cannot be removed.
    pub fn clear_session(&self, session_id: &str) -> Result<(), PersistError> {
        self.persistence.clear(session_id)
    }

    /// Load a stored session, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot exists but cannot be read or rebuilt.
    pub fn load_session(&self, session_id: &str) -> Result<Option<GameSession>, anyhow::Error> {
        match self.persistence.load(session_id) {
            Ok(record) => from_snapshot(&record)
                .map(Some)
                .with_context(|| format!("rebuilding session {session_id}")),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err).with_context(|| format!("loading session {session_id}")),
        }
    }
}
