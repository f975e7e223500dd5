//! Run statistics and the game-over summary.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{HUNTER_KILLS, SURVIVOR_DAYS, VETERAN_DAYS};
use crate::ledger::{ResourceLevels, TerminalReason};
use crate::session::GameSession;

/// Counters accumulated over one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunStatistics {
    pub wasteland_trips: u32,
    pub creatures_defeated: u32,
    pub items_found: u32,
    pub supplies_consumed: u32,
    pub rests: u32,
    pub bunker_withdrawals: u32,
}

/// Milestones awarded at most once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Achievement {
    #[serde(rename = "survivor_10")]
    Survivor,
    #[serde(rename = "survivor_25")]
    Veteran,
    #[serde(rename = "hunter")]
    Hunter,
}

impl Achievement {
    pub const ALL: [Self; 3] = [Self::Survivor, Self::Veteran, Self::Hunter];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Survivor => "survivor_10",
            Self::Veteran => "survivor_25",
            Self::Hunter => "hunter",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Survivor => "Survivor (10 days)",
            Self::Veteran => "Veteran (25 days)",
            Self::Hunter => "Hunter (5 kills)",
        }
    }

    /// Line shown when the achievement is first earned.
    #[must_use]
    pub const fn announcement(self) -> &'static str {
        match self {
            Self::Survivor => "SURVIVOR: Survived 10 days!",
            Self::Veteran => "VETERAN: Survived 25 days!",
            Self::Hunter => "HUNTER: Killed 5 creatures!",
        }
    }

    #[must_use]
    pub const fn is_earned(self, day: u32, stats: &RunStatistics) -> bool {
        match self {
            Self::Survivor => day >= SURVIVOR_DAYS,
            Self::Veteran => day >= VETERAN_DAYS,
            Self::Hunter => stats.creatures_defeated >= HUNTER_KILLS,
        }
    }
}

impl fmt::Display for Achievement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// What the game-over screen shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub player_name: String,
    pub reason: TerminalReason,
    pub headline: String,
    pub epilogue: &'static str,
    pub days_survived: u32,
    pub final_levels: ResourceLevels,
    pub stats: RunStatistics,
    pub achievements: Vec<Achievement>,
}

#[must_use]
pub fn headline(reason: TerminalReason, player_name: &str) -> String {
    match reason {
        TerminalReason::Injury => "You died from your injuries...".to_string(),
        TerminalReason::Exposure => "You died of starvation and thirst...".to_string(),
        TerminalReason::Radiation => "Radiation poisoning has consumed you...".to_string(),
        TerminalReason::Voluntary => format!("{player_name} has left the wasteland..."),
    }
}

#[must_use]
pub const fn epilogue(reason: TerminalReason) -> &'static str {
    match reason {
        TerminalReason::Injury => "The wasteland claims another soul.",
        TerminalReason::Exposure => "Your body becomes part of the wasteland.",
        TerminalReason::Radiation => "You become one with the toxic earth.",
        TerminalReason::Voluntary => "Sometimes running away is the only way to survive.",
    }
}

/// Build the summary for a finished session; `None` while it is still live.
#[must_use]
pub fn run_summary(session: &GameSession) -> Option<RunSummary> {
    let reason = session.ending()?;
    Some(RunSummary {
        player_name: session.player_name().to_string(),
        reason,
        headline: headline(reason, session.player_name()),
        epilogue: epilogue(reason),
        days_survived: session.ledger().day(),
        final_levels: session.ledger().levels(),
        stats: *session.stats(),
        achievements: session.achievements().iter().copied().collect(),
    })
}
