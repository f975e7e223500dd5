//! Bounded survival resources and the day counter.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{
    DRAIN_FOOD, DRAIN_INTERVAL_DAYS, DRAIN_WATER, RADIATION_CRITICAL, RADIATION_DANGEROUS,
    RADIATION_ELEVATED, RESOURCE_MAX, RESOURCE_MIN, START_DAY, START_FOOD, START_HEALTH,
    START_RADIATION, START_WATER,
};

/// One of the four bounded survival metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Health,
    Food,
    Water,
    Radiation,
}

impl Resource {
    pub const ALL: [Self; 4] = [Self::Health, Self::Food, Self::Water, Self::Radiation];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Health => "health",
            Self::Food => "food",
            Self::Water => "water",
            Self::Radiation => "radiation",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalReason {
    Injury,
    Exposure,
    Radiation,
    Voluntary,
}

impl TerminalReason {
    pub const ALL: [Self; 4] = [
        Self::Injury,
        Self::Exposure,
        Self::Radiation,
        Self::Voluntary,
    ];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Injury => "injury",
            Self::Exposure => "exposure",
            Self::Radiation => "radiation",
            Self::Voluntary => "voluntary",
        }
    }

    /// Whether the session ended because a resource threshold was crossed.
    #[must_use]
    pub const fn is_death(self) -> bool {
        !matches!(self, Self::Voluntary)
    }
}

impl fmt::Display for TerminalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Severity band reported by a Geiger counter reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RadiationBand {
    Safe,
    Elevated,
    Dangerous,
    Critical,
}

impl RadiationBand {
    #[must_use]
    pub const fn from_level(level: i32) -> Self {
        if level < RADIATION_ELEVATED {
            Self::Safe
        } else if level < RADIATION_DANGEROUS {
            Self::Elevated
        } else if level < RADIATION_CRITICAL {
            Self::Dangerous
        } else {
            Self::Critical
        }
    }

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Elevated => "elevated",
            Self::Dangerous => "dangerous",
            Self::Critical => "critical",
        }
    }
}

/// Plain copy of the four resource values at one observation point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLevels {
    pub health: i32,
    pub food: i32,
    pub water: i32,
    pub radiation: i32,
}

impl ResourceLevels {
    #[must_use]
    pub const fn get(&self, resource: Resource) -> i32 {
        match resource {
            Resource::Health => self.health,
            Resource::Food => self.food,
            Resource::Water => self.water,
            Resource::Radiation => self.radiation,
        }
    }

    #[must_use]
    pub fn in_bounds(&self) -> bool {
        Resource::ALL
            .iter()
            .all(|resource| (RESOURCE_MIN..=RESOURCE_MAX).contains(&self.get(*resource)))
    }
}

/// Result of moving the day counter forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayAdvance {
    pub day: u32,
    /// Food actually removed by the periodic drain (0 on odd days).
    pub food_drained: i32,
    /// Water actually removed by the periodic drain (0 on odd days).
    pub water_drained: i32,
}

/// Holds the four bounded resources and the day counter.
///
/// Every write clamps into `[0, 100]`, so any observation of the ledger sees
/// in-range values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceLedger {
    health: i32,
    food: i32,
    water: i32,
    radiation: i32,
    day: u32,
}

impl Default for ResourceLedger {
    fn default() -> Self {
        Self {
            health: START_HEALTH,
            food: START_FOOD,
            water: START_WATER,
            radiation: START_RADIATION,
            day: START_DAY,
        }
    }
}

const fn clamp_resource(value: i32) -> i32 {
    if value < RESOURCE_MIN {
        RESOURCE_MIN
    } else if value > RESOURCE_MAX {
        RESOURCE_MAX
    } else {
        value
    }
}

impl ResourceLedger {
    /// Fresh ledger with the session-start values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ledger from explicit levels, clamping each value and flooring
    /// the day at 1.
    #[must_use]
    pub const fn with_levels(levels: ResourceLevels, day: u32) -> Self {
        Self {
            health: clamp_resource(levels.health),
            food: clamp_resource(levels.food),
            water: clamp_resource(levels.water),
            radiation: clamp_resource(levels.radiation),
            day: if day < START_DAY { START_DAY } else { day },
        }
    }

    #[must_use]
    pub const fn health(&self) -> i32 {
        self.health
    }

    #[must_use]
    pub const fn food(&self) -> i32 {
        self.food
    }

    #[must_use]
    pub const fn water(&self) -> i32 {
        self.water
    }

    #[must_use]
    pub const fn radiation(&self) -> i32 {
        self.radiation
    }

    #[must_use]
    pub const fn day(&self) -> u32 {
        self.day
    }

    #[must_use]
    pub const fn get(&self, resource: Resource) -> i32 {
        match resource {
            Resource::Health => self.health,
            Resource::Food => self.food,
            Resource::Water => self.water,
            Resource::Radiation => self.radiation,
        }
    }

    #[must_use]
    pub const fn levels(&self) -> ResourceLevels {
        ResourceLevels {
            health: self.health,
            food: self.food,
            water: self.water,
            radiation: self.radiation,
        }
    }

    const fn slot_mut(&mut self, resource: Resource) -> &mut i32 {
        match resource {
            Resource::Health => &mut self.health,
            Resource::Food => &mut self.food,
            Resource::Water => &mut self.water,
            Resource::Radiation => &mut self.radiation,
        }
    }

    /// Add a signed amount to a resource and clamp the result.
    ///
    /// Returns the change that actually landed after clamping.
    pub fn apply_delta(&mut self, resource: Resource, amount: i32) -> i32 {
        let slot = self.slot_mut(resource);
        let before = *slot;
        *slot = clamp_resource(before.saturating_add(amount));
        *slot - before
    }

    /// Evaluate termination in priority order: injury, exposure, radiation.
    #[must_use]
    pub const fn terminal_reason(&self) -> Option<TerminalReason> {
        if self.health <= 0 {
            Some(TerminalReason::Injury)
        } else if self.food <= 0 && self.water <= 0 {
            Some(TerminalReason::Exposure)
        } else if self.radiation >= RESOURCE_MAX {
            Some(TerminalReason::Radiation)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.terminal_reason().is_some()
    }

    #[must_use]
    pub const fn radiation_band(&self) -> RadiationBand {
        RadiationBand::from_level(self.radiation)
    }

    /// Increment the day; every second day drains food and water.
    pub fn advance_day(&mut self) -> DayAdvance {
        self.day = self.day.saturating_add(1);
        let (food_drained, water_drained) = if self.day % DRAIN_INTERVAL_DAYS == 0 {
            (
                -self.apply_delta(Resource::Food, -DRAIN_FOOD),
                -self.apply_delta(Resource::Water, -DRAIN_WATER),
            )
        } else {
            (0, 0)
        };
        DayAdvance {
            day: self.day,
            food_drained,
            water_drained,
        }
    }
}
