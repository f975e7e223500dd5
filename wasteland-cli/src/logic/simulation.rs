use serde::Serialize;
use wasteland_game::{
    Achievement, ActionError, ActionStateMachine, GameSession, PlayerId, ResourceLevels,
    RunStatistics, TerminalReason,
};

use crate::logic::policy::GameplayStrategy;

pub const DEFAULT_MAX_TURNS: usize = 500;

/// Which runs a `simulate` invocation plays.
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub strategy: GameplayStrategy,
    pub seeds: Vec<u64>,
    pub iterations: usize,
    pub max_turns: usize,
}

impl SimulationPlan {
    #[must_use]
    pub fn new(strategy: GameplayStrategy, seeds: Vec<u64>) -> Self {
        Self {
            strategy,
            seeds,
            iterations: 1,
            max_turns: DEFAULT_MAX_TURNS,
        }
    }

    #[must_use]
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations.max(1);
        self
    }

    #[must_use]
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns.max(1);
        self
    }
}

/// Outcome of one autoplay run.
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    /// Seed for both the game rng and the policy.
    pub seed: u64,
    pub iteration: usize,
    /// `None` when the run hit the turn cap.
    pub ending: Option<TerminalReason>,
    pub days_survived: u32,
    pub turns: usize,
    pub rejected_choices: usize,
    pub final_levels: ResourceLevels,
    pub stats: RunStatistics,
    pub achievements: Vec<Achievement>,
    pub violations: Vec<String>,
}

impl RunRecord {
    #[must_use]
    pub fn outcome_key(&self) -> &'static str {
        self.ending.map_or("halted", TerminalReason::key)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationSummary {
    pub strategy: &'static str,
    pub max_turns: usize,
    pub runs: Vec<RunRecord>,
}

impl SimulationSummary {
    /// Run count per ending, in a fixed order with `halted` last.
    #[must_use]
    pub fn ending_distribution(&self) -> Vec<(&'static str, usize)> {
        TerminalReason::ALL
            .iter()
            .map(|reason| reason.key())
            .chain(std::iter::once("halted"))
            .map(|key| {
                let count = self
                    .runs
                    .iter()
                    .filter(|run| run.outcome_key() == key)
                    .count();
                (key, count)
            })
            .collect()
    }

    #[must_use]
    pub fn average_days(&self) -> f64 {
        if self.runs.is_empty() {
            return 0.0;
        }
        let total: u64 = self.runs.iter().map(|run| u64::from(run.days_survived)).sum();
        #[allow(clippy::cast_precision_loss)]
        let (total, runs) = (total as f64, self.runs.len() as f64);
        total / runs
    }

    #[must_use]
    pub fn longest_run(&self) -> Option<&RunRecord> {
        self.runs.iter().max_by_key(|run| run.days_survived)
    }

    #[must_use]
    pub fn violation_count(&self) -> usize {
        self.runs.iter().map(|run| run.violations.len()).sum()
    }
}

/// Play every seed and iteration of `plan`.
#[must_use]
pub fn run_simulation(plan: &SimulationPlan) -> SimulationSummary {
    let mut runs = Vec::with_capacity(plan.seeds.len() * plan.iterations);
    for &base in &plan.seeds {
        for iteration in 0..plan.iterations {
            let seed = base.wrapping_add(iteration as u64);
            let record = simulate_run(plan.strategy, seed, iteration, plan.max_turns);
            log::info!(
                "{} seed {seed}: {} after {} days",
                plan.strategy,
                record.outcome_key(),
                record.days_survived
            );
            runs.push(record);
        }
    }
    SimulationSummary {
        strategy: plan.strategy.label(),
        max_turns: plan.max_turns,
        runs,
    }
}

/// Play one run to its ending or the turn cap, checking ledger invariants
/// after every accepted turn.
#[must_use]
pub fn simulate_run(
    strategy: GameplayStrategy,
    seed: u64,
    iteration: usize,
    max_turns: usize,
) -> RunRecord {
    let name = format!("{} autoplay", strategy.label());
    let session = GameSession::new(name.as_str(), PlayerId::derive(&name, seed));
    let mut machine = ActionStateMachine::seeded(session, seed);
    let mut policy = strategy.create_policy(seed);
    let mut violations = Vec::new();
    let mut rejected_choices = 0;
    let mut last_day = machine.session().ledger().day();
    let mut turns = 0;

    while turns < max_turns {
        turns += 1;
        match machine.step(&mut *policy) {
            Ok(report) => {
                let ledger = machine.session().ledger();
                if !ledger.levels().in_bounds() {
                    violations.push(format!("turn {turns}: levels out of range {:?}", ledger.levels()));
                }
                if report.day < last_day || report.day > last_day + 1 {
                    violations.push(format!(
                        "turn {turns}: day moved from {last_day} to {}",
                        report.day
                    ));
                }
                if let Some(reason) = report.ending
                    && reason.is_death()
                    && ledger.terminal_reason() != Some(reason)
                {
                    violations.push(format!(
                        "turn {turns}: ended by {reason} but the ledger reports {:?}",
                        ledger.terminal_reason()
                    ));
                }
                last_day = report.day;
                if report.ending.is_some() {
                    break;
                }
            }
            Err(ActionError::SessionOver { .. }) => break,
            Err(err) => {
                rejected_choices += 1;
                log::debug!("{} seed {seed}: rejected choice: {err}", policy.name());
            }
        }
    }

    let session = machine.session();
    for violation in &violations {
        log::warn!("seed {seed}: {violation}");
    }
    RunRecord {
        seed,
        iteration,
        ending: session.ending(),
        days_survived: session.ledger().day(),
        turns,
        rejected_choices,
        final_levels: session.ledger().levels(),
        stats: *session.stats(),
        achievements: session.achievements().iter().copied().collect(),
        violations,
    }
}
