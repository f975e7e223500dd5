//! Wasteland exposure and encounter resolution.
use rand::Rng;
use rand::seq::index;
use serde::Serialize;
use smallvec::SmallVec;
use std::fmt;

use crate::constants::{
    BLUNDER_MAX, BLUNDER_MIN, CACHE_SIZE_MAX, CACHE_SIZE_MIN, EXPOSURE_MAX, EXPOSURE_MIN,
    FIGHT_WIN_CHANCE, FIGHT_WOUND_MAX, FIGHT_WOUND_MIN, FLEE_DAMAGE, SOUND_ATTACK_MAX,
    SOUND_ATTACK_MIN, SOUND_CACHE_CHANCE, STORM_MASKED_MAX, STORM_MASKED_MIN, STORM_UNMASKED_MAX,
    STORM_UNMASKED_MIN,
};
use crate::inventory::{Inventory, ItemKind};
use crate::ledger::{Resource, ResourceLedger};

/// Items handed out by a single encounter.
pub type ItemBundle = SmallVec<[ItemKind; 4]>;

pub const SCAVENGE_LOCATIONS: [&str; 5] = [
    "abandoned supermarket",
    "destroyed pharmacy",
    "crashed military convoy",
    "ruined gas station",
    "collapsed apartment building",
];

pub const SCAVENGE_BUNDLES: [&[ItemKind]; 5] = [
    &[ItemKind::CannedFood, ItemKind::WaterBottles],
    &[ItemKind::MedKit],
    &[ItemKind::RadPills, ItemKind::CannedFood],
    &[ItemKind::WaterBottles, ItemKind::GasMask],
    &[],
];

pub const SOUNDS: [&str; 4] = [
    "Metal scraping against concrete...",
    "A low, inhuman growl...",
    "Rapid clicking sounds...",
    "Heavy breathing that isn't yours...",
];

pub const SOUND_CACHE: [ItemKind; 2] = [ItemKind::CannedFood, ItemKind::WaterBottles];

pub const SUPPLY_CACHE_POOL: [ItemKind; 5] = [
    ItemKind::MedKit,
    ItemKind::RadPills,
    ItemKind::CannedFood,
    ItemKind::WaterBottles,
    ItemKind::GasMask,
];

pub const CREATURES: [&str; 4] = [
    "Mutant rat the size of a dog",
    "Irradiated vulture with three heads",
    "Twisted humanoid figure in the shadows",
    "Pack of glowing-eyed wolves",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EncounterCategory {
    Scavenge,
    MysteriousSound,
    SupplyCache,
    RadiationStorm,
    Creature,
}

impl EncounterCategory {
    /// Draw order for the uniform category roll.
    pub const ALL: [Self; 5] = [
        Self::Scavenge,
        Self::MysteriousSound,
        Self::SupplyCache,
        Self::RadiationStorm,
        Self::Creature,
    ];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Scavenge => "scavenge",
            Self::MysteriousSound => "mysterious_sound",
            Self::SupplyCache => "supply_cache",
            Self::RadiationStorm => "radiation_storm",
            Self::Creature => "creature",
        }
    }
}

impl fmt::Display for EncounterCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundResponse {
    Investigate,
    Ignore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CreatureTactic {
    Fight,
    Flee,
    Appease,
}

impl CreatureTactic {
    pub const ALL: [Self; 3] = [Self::Fight, Self::Flee, Self::Appease];

    /// Parse a menu token (`1`-`3`) or tactic name. Unrecognized input yields
    /// `None`, which the creature resolver treats as a blunder.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "1" | "fight" => Some(Self::Fight),
            "2" | "flee" | "run" => Some(Self::Flee),
            "3" | "appease" | "feed" => Some(Self::Appease),
            _ => None,
        }
    }

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Fight => "fight",
            Self::Flee => "flee",
            Self::Appease => "appease",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SoundOutcome {
    Cache { items: ItemBundle },
    Attacked { damage: i32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum FightResult {
    Won { loot: ItemKind },
    Wounded { damage: i32 },
}

/// Record of what a single wasteland encounter did.
///
/// Labels are flavor only. The effects have already been applied to the
/// ledger and inventory by the time a caller sees this value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Encounter {
    ScavengeFound {
        location: &'static str,
        items: ItemBundle,
    },
    ScavengeEmpty {
        location: &'static str,
    },
    SoundInvestigated {
        sound: &'static str,
        outcome: SoundOutcome,
    },
    SoundIgnored {
        sound: &'static str,
    },
    SupplyCache {
        items: ItemBundle,
    },
    RadiationStorm {
        gain: i32,
        masked: bool,
    },
    CreatureFight {
        creature: &'static str,
        result: FightResult,
    },
    CreatureFlee {
        creature: &'static str,
        damage: i32,
    },
    CreatureAppease {
        creature: &'static str,
    },
    CreatureBlunder {
        creature: &'static str,
        damage: i32,
    },
}

impl Encounter {
    #[must_use]
    pub const fn category(&self) -> EncounterCategory {
        match self {
            Self::ScavengeFound { .. } | Self::ScavengeEmpty { .. } => EncounterCategory::Scavenge,
            Self::SoundInvestigated { .. } | Self::SoundIgnored { .. } => {
                EncounterCategory::MysteriousSound
            }
            Self::SupplyCache { .. } => EncounterCategory::SupplyCache,
            Self::RadiationStorm { .. } => EncounterCategory::RadiationStorm,
            Self::CreatureFight { .. }
            | Self::CreatureFlee { .. }
            | Self::CreatureAppease { .. }
            | Self::CreatureBlunder { .. } => EncounterCategory::Creature,
        }
    }

    /// Items this encounter put into the inventory.
    #[must_use]
    pub fn items_gained(&self) -> &[ItemKind] {
        match self {
            Self::ScavengeFound { items, .. }
            | Self::SupplyCache { items }
            | Self::SoundInvestigated {
                outcome: SoundOutcome::Cache { items },
                ..
            } => items.as_slice(),
            Self::CreatureFight {
                result: FightResult::Won { loot },
                ..
            } => std::slice::from_ref(loot),
            _ => &[],
        }
    }

    /// Rolled health damage, before clamping.
    #[must_use]
    pub const fn health_lost(&self) -> i32 {
        match self {
            Self::SoundInvestigated {
                outcome: SoundOutcome::Attacked { damage },
                ..
            }
            | Self::CreatureFight {
                result: FightResult::Wounded { damage },
                ..
            }
            | Self::CreatureFlee { damage, .. }
            | Self::CreatureBlunder { damage, .. } => *damage,
            _ => 0,
        }
    }

    #[must_use]
    pub const fn creature_defeated(&self) -> bool {
        matches!(
            self,
            Self::CreatureFight {
                result: FightResult::Won { .. },
                ..
            }
        )
    }
}

/// Player prompts raised while an encounter resolves.
pub trait EncounterDecisions {
    fn investigate_sound(&mut self, sound: &str) -> SoundResponse;

    /// `None` stands for input that names no tactic.
    fn creature_tactic(&mut self, creature: &str, inventory: &Inventory) -> Option<CreatureTactic>;
}

/// Answers every prompt the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDecisions {
    pub sound: SoundResponse,
    pub tactic: Option<CreatureTactic>,
}

impl EncounterDecisions for FixedDecisions {
    fn investigate_sound(&mut self, _sound: &str) -> SoundResponse {
        self.sound
    }

    fn creature_tactic(&mut self, _creature: &str, _inventory: &Inventory) -> Option<CreatureTactic> {
        self.tactic
    }
}

/// Exposure gain plus the encounter that followed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WastelandTrip {
    pub exposure: i32,
    pub encounter: Encounter,
}

fn pick_label(rng: &mut impl Rng, labels: &[&'static str]) -> &'static str {
    labels[rng.gen_range(0..labels.len())]
}

fn wound(ledger: &mut ResourceLedger, damage: i32) {
    ledger.apply_delta(Resource::Health, -damage);
}

/// Add the unconditional radiation dose of a wasteland trip.
pub fn apply_radiation_exposure(rng: &mut impl Rng, ledger: &mut ResourceLedger) -> i32 {
    let gain = rng.gen_range(EXPOSURE_MIN..=EXPOSURE_MAX);
    ledger.apply_delta(Resource::Radiation, gain);
    log::debug!("radiation exposure +{gain} -> {}", ledger.radiation());
    gain
}

pub fn resolve_scavenge(rng: &mut impl Rng, inventory: &mut Inventory) -> Encounter {
    let location = pick_label(rng, &SCAVENGE_LOCATIONS);
    let bundle = SCAVENGE_BUNDLES[rng.gen_range(0..SCAVENGE_BUNDLES.len())];
    if bundle.is_empty() {
        return Encounter::ScavengeEmpty { location };
    }
    inventory.add_many(bundle.iter().copied());
    Encounter::ScavengeFound {
        location,
        items: ItemBundle::from_slice(bundle),
    }
}

pub fn resolve_mysterious_sound(
    rng: &mut impl Rng,
    ledger: &mut ResourceLedger,
    inventory: &mut Inventory,
    decisions: &mut (impl EncounterDecisions + ?Sized),
) -> Encounter {
    let sound = pick_label(rng, &SOUNDS);
    if decisions.investigate_sound(sound) == SoundResponse::Ignore {
        return Encounter::SoundIgnored { sound };
    }
    let outcome = if rng.gen_bool(SOUND_CACHE_CHANCE) {
        inventory.add_many(SOUND_CACHE);
        SoundOutcome::Cache {
            items: ItemBundle::from_slice(&SOUND_CACHE),
        }
    } else {
        let damage = rng.gen_range(SOUND_ATTACK_MIN..=SOUND_ATTACK_MAX);
        wound(ledger, damage);
        SoundOutcome::Attacked { damage }
    };
    Encounter::SoundInvestigated { sound, outcome }
}

/// Sample two to four distinct items from the cache pool.
pub fn resolve_supply_cache(rng: &mut impl Rng, inventory: &mut Inventory) -> Encounter {
    let size = rng.gen_range(CACHE_SIZE_MIN..=CACHE_SIZE_MAX);
    let items: ItemBundle = index::sample(rng, SUPPLY_CACHE_POOL.len(), size)
        .into_iter()
        .map(|idx| SUPPLY_CACHE_POOL[idx])
        .collect();
    inventory.add_many(items.iter().copied());
    Encounter::SupplyCache { items }
}

/// A gas mask softens the storm but is never consumed.
pub fn resolve_radiation_storm(
    rng: &mut impl Rng,
    ledger: &mut ResourceLedger,
    inventory: &Inventory,
) -> Encounter {
    let masked = inventory.contains(ItemKind::GasMask);
    let gain = if masked {
        rng.gen_range(STORM_MASKED_MIN..=STORM_MASKED_MAX)
    } else {
        rng.gen_range(STORM_UNMASKED_MIN..=STORM_UNMASKED_MAX)
    };
    ledger.apply_delta(Resource::Radiation, gain);
    Encounter::RadiationStorm { gain, masked }
}

pub fn resolve_creature(
    rng: &mut impl Rng,
    ledger: &mut ResourceLedger,
    inventory: &mut Inventory,
    decisions: &mut (impl EncounterDecisions + ?Sized),
) -> Encounter {
    let creature = pick_label(rng, &CREATURES);
    match decisions.creature_tactic(creature, inventory) {
        Some(CreatureTactic::Fight) => {
            let result = if rng.gen_bool(FIGHT_WIN_CHANCE) {
                inventory.add(ItemKind::MeatRation);
                FightResult::Won {
                    loot: ItemKind::MeatRation,
                }
            } else {
                let damage = rng.gen_range(FIGHT_WOUND_MIN..=FIGHT_WOUND_MAX);
                wound(ledger, damage);
                FightResult::Wounded { damage }
            };
            Encounter::CreatureFight { creature, result }
        }
        Some(CreatureTactic::Flee) => {
            wound(ledger, FLEE_DAMAGE);
            Encounter::CreatureFlee {
                creature,
                damage: FLEE_DAMAGE,
            }
        }
        Some(CreatureTactic::Appease) if inventory.remove_one(ItemKind::CannedFood) => {
            Encounter::CreatureAppease { creature }
        }
        // Appeasing with nothing to offer is punished like any other blunder.
        Some(CreatureTactic::Appease) | None => {
            let damage = rng.gen_range(BLUNDER_MIN..=BLUNDER_MAX);
            wound(ledger, damage);
            Encounter::CreatureBlunder { creature, damage }
        }
    }
}

/// Draw a category uniformly and resolve it against the ledger and inventory.
pub fn resolve_wasteland_encounter(
    rng: &mut impl Rng,
    ledger: &mut ResourceLedger,
    inventory: &mut Inventory,
    decisions: &mut (impl EncounterDecisions + ?Sized),
) -> Encounter {
    let category = EncounterCategory::ALL[rng.gen_range(0..EncounterCategory::ALL.len())];
    log::debug!("wasteland encounter: {category}");
    let encounter = match category {
        EncounterCategory::Scavenge => resolve_scavenge(rng, inventory),
        EncounterCategory::MysteriousSound => {
            resolve_mysterious_sound(rng, ledger, inventory, decisions)
        }
        EncounterCategory::SupplyCache => resolve_supply_cache(rng, inventory),
        EncounterCategory::RadiationStorm => resolve_radiation_storm(rng, ledger, inventory),
        EncounterCategory::Creature => resolve_creature(rng, ledger, inventory, decisions),
    };
    log::debug!("encounter resolved: {encounter:?}");
    encounter
}

/// Exposure first, then one encounter.
pub fn enter_wasteland(
    rng: &mut impl Rng,
    ledger: &mut ResourceLedger,
    inventory: &mut Inventory,
    decisions: &mut (impl EncounterDecisions + ?Sized),
) -> WastelandTrip {
    let exposure = apply_radiation_exposure(rng, ledger);
    let encounter = resolve_wasteland_encounter(rng, ledger, inventory, decisions);
    WastelandTrip {
        exposure,
        encounter,
    }
}
