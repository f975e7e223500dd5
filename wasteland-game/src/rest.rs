//! The bunker rest procedure.
use serde::Serialize;

use crate::constants::{
    CANNED_FOOD_VALUE, MED_KIT_HEAL, MED_KIT_HEALTH_CEILING, RAD_PILLS_REDUCTION,
    RAD_PILLS_THRESHOLD, REST_FOOD_COST, REST_HEALTH_REGEN, REST_WATER_COST, WATER_BOTTLE_VALUE,
};
use crate::inventory::{Inventory, ItemKind};
use crate::ledger::{DayAdvance, Resource, ResourceLedger, ResourceLevels};

/// Optional consumables offered during a rest.
pub trait RestDecisions {
    /// Asked only when a med kit is held and health is below the ceiling.
    fn use_med_kit(&mut self, health: i32) -> bool;

    /// Asked only when rad pills are held and radiation is above the threshold.
    fn take_rad_pills(&mut self, radiation: i32) -> bool;
}

/// Step by step account of one rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestReport {
    pub food_consumed: i32,
    pub water_consumed: i32,
    pub ate_canned_food: bool,
    pub drank_water: bool,
    pub used_med_kit: bool,
    pub took_rad_pills: bool,
    pub health_regenerated: i32,
    /// Levels once the rest itself is done, before the day advances.
    pub after_rest: ResourceLevels,
    pub advance: DayAdvance,
}

impl RestReport {
    /// Number of inventory items the rest used up.
    #[must_use]
    pub fn items_consumed(&self) -> u32 {
        [
            self.ate_canned_food,
            self.drank_water,
            self.used_med_kit,
            self.took_rad_pills,
        ]
        .into_iter()
        .map(u32::from)
        .sum()
    }
}

/// Run the rest procedure in its fixed order and advance the day.
///
/// Canned food and water bottles are consumed automatically when held. Med
/// kits and rad pills are offered through `decisions` only when they would
/// help.
pub fn rest(
    ledger: &mut ResourceLedger,
    inventory: &mut Inventory,
    decisions: &mut (impl RestDecisions + ?Sized),
) -> RestReport {
    let food_consumed = -ledger.apply_delta(Resource::Food, -REST_FOOD_COST);
    let water_consumed = -ledger.apply_delta(Resource::Water, -REST_WATER_COST);

    let ate_canned_food = inventory.remove_one(ItemKind::CannedFood);
    if ate_canned_food {
        ledger.apply_delta(Resource::Food, CANNED_FOOD_VALUE);
    }
    let drank_water = inventory.remove_one(ItemKind::WaterBottles);
    if drank_water {
        ledger.apply_delta(Resource::Water, WATER_BOTTLE_VALUE);
    }

    let used_med_kit = inventory.contains(ItemKind::MedKit)
        && ledger.health() < MED_KIT_HEALTH_CEILING
        && decisions.use_med_kit(ledger.health())
        && inventory.remove_one(ItemKind::MedKit);
    if used_med_kit {
        ledger.apply_delta(Resource::Health, MED_KIT_HEAL);
    }

    let took_rad_pills = inventory.contains(ItemKind::RadPills)
        && ledger.radiation() > RAD_PILLS_THRESHOLD
        && decisions.take_rad_pills(ledger.radiation())
        && inventory.remove_one(ItemKind::RadPills);
    if took_rad_pills {
        ledger.apply_delta(Resource::Radiation, -RAD_PILLS_REDUCTION);
    }

    let health_regenerated = ledger.apply_delta(Resource::Health, REST_HEALTH_REGEN);
    let after_rest = ledger.levels();
    let advance = ledger.advance_day();
    log::debug!("rested: {after_rest:?}, now day {}", advance.day);

    RestReport {
        food_consumed,
        water_consumed,
        ate_canned_food,
        drank_water,
        used_med_kit,
        took_rad_pills,
        health_regenerated,
        after_rest,
        advance,
    }
}
