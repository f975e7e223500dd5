//! Centralized balance and tuning constants for the wasteland simulation.
//!
//! These values define the deterministic math for the core simulation.
//! Keeping them together ensures that gameplay can only be adjusted via
//! code changes reviewed in version control, rather than through external
//! data files.

// Resource bounds ----------------------------------------------------------
pub const RESOURCE_MIN: i32 = 0;
pub const RESOURCE_MAX: i32 = 100;

// Starting ledger ----------------------------------------------------------
pub const START_HEALTH: i32 = 100;
pub const START_FOOD: i32 = 50;
pub const START_WATER: i32 = 40;
pub const START_RADIATION: i32 = 0;
pub const START_DAY: u32 = 1;

// Periodic drain (applied when the day counter lands on a multiple) ---------
pub const DRAIN_INTERVAL_DAYS: u32 = 2;
pub const DRAIN_FOOD: i32 = 5;
pub const DRAIN_WATER: i32 = 8;

// Bunker stash -------------------------------------------------------------
pub const BUNKER_CANNED_FOOD: u32 = 5;
pub const BUNKER_WATER_BOTTLES: u32 = 3;
pub const BUNKER_MED_KITS: u32 = 2;

// Rest tuning --------------------------------------------------------------
pub const REST_FOOD_COST: i32 = 20;
pub const REST_WATER_COST: i32 = 15;
pub const CANNED_FOOD_VALUE: i32 = 30;
pub const WATER_BOTTLE_VALUE: i32 = 25;
pub const MED_KIT_HEAL: i32 = 40;
/// Med kits are only offered while health is strictly below this value.
pub const MED_KIT_HEALTH_CEILING: i32 = 80;
pub const RAD_PILLS_REDUCTION: i32 = 30;
/// Rad pills are only offered while radiation is strictly above this value.
pub const RAD_PILLS_THRESHOLD: i32 = 20;
pub const REST_HEALTH_REGEN: i32 = 10;

// Wasteland tuning ---------------------------------------------------------
pub const EXPOSURE_MIN: i32 = 5;
pub const EXPOSURE_MAX: i32 = 15;
pub const SOUND_CACHE_CHANCE: f64 = 0.3;
pub const SOUND_ATTACK_MIN: i32 = 15;
pub const SOUND_ATTACK_MAX: i32 = 30;
pub const CACHE_SIZE_MIN: usize = 2;
pub const CACHE_SIZE_MAX: usize = 4;
pub const STORM_MASKED_MIN: i32 = 5;
pub const STORM_MASKED_MAX: i32 = 10;
pub const STORM_UNMASKED_MIN: i32 = 20;
pub const STORM_UNMASKED_MAX: i32 = 35;
pub const FIGHT_WIN_CHANCE: f64 = 0.6;
pub const FIGHT_WOUND_MIN: i32 = 20;
pub const FIGHT_WOUND_MAX: i32 = 40;
pub const FLEE_DAMAGE: i32 = 10;
pub const BLUNDER_MIN: i32 = 15;
pub const BLUNDER_MAX: i32 = 25;

// Turn loop ----------------------------------------------------------------
pub const BROADCAST_CHANCE: f64 = 0.1;
pub const RADIO_BROADCAST: &str = "...anyone out there... the creatures are... *static*";

// Achievements -------------------------------------------------------------
pub const SURVIVOR_DAYS: u32 = 10;
pub const VETERAN_DAYS: u32 = 25;
pub const HUNTER_KILLS: u32 = 5;

// Radiation bands ----------------------------------------------------------
pub const RADIATION_ELEVATED: i32 = 25;
pub const RADIATION_DANGEROUS: i32 = 50;
pub const RADIATION_CRITICAL: i32 = 75;

// Persistence --------------------------------------------------------------
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;
pub const DEFAULT_PLAYER_NAME: &str = "Survivor";
pub(crate) const PLAYER_ID_PREFIX: &str = "player_";
pub(crate) const PLAYER_ID_HEX_LEN: usize = 12;
