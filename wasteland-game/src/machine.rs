//! Turn loop: one player decision resolved to completion per step.
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use crate::bunker::{BunkerRequest, BunkerStock};
use crate::constants::{BROADCAST_CHANCE, RADIO_BROADCAST};
use crate::encounters::{
    CreatureTactic, Encounter, EncounterDecisions, SoundResponse, enter_wasteland,
};
use crate::error::ActionError;
use crate::inventory::{Inventory, ItemKind};
use crate::ledger::{RadiationBand, TerminalReason};
use crate::rest::{RestDecisions, RestReport, rest};
use crate::session::GameSession;
use crate::stats::Achievement;

/// The five bunker menu entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    InspectBunker,
    EnterWasteland,
    Rest,
    CheckRadiation,
    Exit,
}

impl Action {
    /// Menu order; an action's token is its position plus one.
    pub const ALL: [Self; 5] = [
        Self::InspectBunker,
        Self::EnterWasteland,
        Self::Rest,
        Self::CheckRadiation,
        Self::Exit,
    ];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::InspectBunker => "bunker",
            Self::EnterWasteland => "wasteland",
            Self::Rest => "rest",
            Self::CheckRadiation => "radiation",
            Self::Exit => "exit",
        }
    }

    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::InspectBunker => "1",
            Self::EnterWasteland => "2",
            Self::Rest => "3",
            Self::CheckRadiation => "4",
            Self::Exit => "5",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::InspectBunker => "Check bunker supplies",
            Self::EnterWasteland => "Venture into the wasteland",
            Self::Rest => "Rest and recover",
            Self::CheckRadiation => "Check radiation levels",
            Self::Exit => "Leave the bunker for good",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Action {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "bunker" | "inspect" => Ok(Self::InspectBunker),
            "2" | "wasteland" | "explore" => Ok(Self::EnterWasteland),
            "3" | "rest" => Ok(Self::Rest),
            "4" | "radiation" | "geiger" => Ok(Self::CheckRadiation),
            "5" | "exit" | "quit" => Ok(Self::Exit),
            _ => Err(ActionError::invalid(s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineState {
    AwaitingAction,
    ResolvingWasteland,
    Resting,
    Terminal,
}

/// Something a turn did, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TurnEvent {
    RadioBroadcast { message: &'static str },
    BunkerDepleted,
    BunkerWithdrawal { kind: ItemKind, remaining: u32 },
    BunkerDeclined,
    RadiationExposure { gain: i32 },
    Encounter(Encounter),
    Rested(RestReport),
    RadiationReading { level: i32, band: RadiationBand },
    Achievement { achievement: Achievement },
    Ended { reason: TerminalReason },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnReport {
    /// Day counter once the turn finished.
    pub day: u32,
    /// `None` when the step only closed an already terminal session.
    pub action: Option<Action>,
    pub events: Vec<TurnEvent>,
    pub ending: Option<TerminalReason>,
}

/// Where every player choice comes from.
///
/// Implementations return raw tokens; the machine parses and validates them.
pub trait ChoiceSource: EncounterDecisions + RestDecisions {
    fn next_action(&mut self, session: &GameSession) -> String;

    /// Item key to withdraw, or `none`.
    fn bunker_withdrawal(&mut self, bunker: &BunkerStock) -> String;
}

/// Replays a fixed list of tokens, one per prompt.
///
/// Once the script runs dry it exits, declines and answers no.
#[derive(Debug, Clone, Default)]
pub struct ScriptedChoices {
    tokens: VecDeque<String>,
}

impl ScriptedChoices {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.tokens.len()
    }

    fn next_or(&mut self, fallback: &str) -> String {
        self.tokens
            .pop_front()
            .unwrap_or_else(|| fallback.to_string())
    }

    fn next_yes(&mut self) -> bool {
        is_yes(&self.next_or("n"))
    }
}

/// `y`, `yes` or `1`, ignoring case and whitespace.
#[must_use]
pub fn is_yes(token: &str) -> bool {
    matches!(token.trim().to_ascii_lowercase().as_str(), "y" | "yes" | "1")
}

impl EncounterDecisions for ScriptedChoices {
    fn investigate_sound(&mut self, _sound: &str) -> SoundResponse {
        if self.next_yes() {
            SoundResponse::Investigate
        } else {
            SoundResponse::Ignore
        }
    }

    fn creature_tactic(&mut self, _creature: &str, _inventory: &Inventory) -> Option<CreatureTactic> {
        CreatureTactic::from_token(&self.next_or(""))
    }
}

impl RestDecisions for ScriptedChoices {
    fn use_med_kit(&mut self, _health: i32) -> bool {
        self.next_yes()
    }

    fn take_rad_pills(&mut self, _radiation: i32) -> bool {
        self.next_yes()
    }
}

impl ChoiceSource for ScriptedChoices {
    fn next_action(&mut self, _session: &GameSession) -> String {
        self.next_or(Action::Exit.token())
    }

    fn bunker_withdrawal(&mut self, _bunker: &BunkerStock) -> String {
        self.next_or("none")
    }
}

/// A bunker visit checked against the stock before anything is rolled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BunkerVisit {
    Depleted,
    Declined,
    Withdraw(ItemKind),
}

/// Drives a [`GameSession`] through the bunker turn loop with one random
/// source.
#[derive(Debug, Clone)]
pub struct ActionStateMachine<R: Rng> {
    session: GameSession,
    rng: R,
    state: MachineState,
}

impl ActionStateMachine<ChaCha20Rng> {
    /// Machine over a `ChaCha20Rng` seeded from `seed`.
    #[must_use]
    pub fn seeded(session: GameSession, seed: u64) -> Self {
        Self::new(session, ChaCha20Rng::seed_from_u64(seed))
    }
}

impl<R: Rng> ActionStateMachine<R> {
    #[must_use]
    pub fn new(session: GameSession, rng: R) -> Self {
        let state = if session.ending().is_some() {
            MachineState::Terminal
        } else {
            MachineState::AwaitingAction
        };
        Self {
            session,
            rng,
            state,
        }
    }

    #[must_use]
    pub const fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut GameSession {
        &mut self.session
    }

    #[must_use]
    pub fn into_session(self) -> GameSession {
        self.session
    }

    #[must_use]
    pub const fn state(&self) -> MachineState {
        self.state
    }

    /// Reason the next step will close the session with, if any.
    #[must_use]
    pub const fn pending_terminal(&self) -> Option<TerminalReason> {
        self.session.terminal_reason()
    }

    /// Swap in a fresh run for the same player; the random source carries on.
    pub fn restart(&mut self) {
        self.session = self.session.reset();
        self.state = MachineState::AwaitingAction;
    }

    /// Run one turn: check for an ending, ask for an action and resolve it.
    ///
    /// # Errors
    ///
    /// [`ActionError::SessionOver`] once the machine is terminal, or the
    /// parse/validation error for a rejected choice. Rejected choices leave
    /// the session untouched.
    pub fn step(&mut self, source: &mut (impl ChoiceSource + ?Sized)) -> Result<TurnReport, ActionError> {
        if let Some(report) = self.close_if_terminal()? {
            return Ok(report);
        }
        let token = source.next_action(&self.session);
        let action = match token.parse::<Action>() {
            Ok(action) => action,
            Err(err) => {
                log::debug!("rejected action token: {err}");
                return Err(err);
            }
        };
        self.perform(action, source)
    }

    fn close_if_terminal(&mut self) -> Result<Option<TurnReport>, ActionError> {
        if self.state == MachineState::Terminal {
            let reason = self
                .session
                .terminal_reason()
                .unwrap_or(TerminalReason::Voluntary);
            return Err(ActionError::SessionOver { reason });
        }
        let Some(reason) = self.session.evaluate_terminal() else {
            return Ok(None);
        };
        self.state = MachineState::Terminal;
        Ok(Some(TurnReport {
            day: self.session.ledger().day(),
            action: None,
            events: vec![TurnEvent::Ended { reason }],
            ending: Some(reason),
        }))
    }

    /// Resolve an already parsed action.
    ///
    /// A bunker withdrawal is validated first, so a rejected one leaves the
    /// random source alone. Then comes the radio broadcast roll, the action
    /// itself and any newly earned achievements. A session that qualifies for
    /// an ending is closed instead.
    ///
    /// # Errors
    ///
    /// Same as [`ActionStateMachine::step`].
    pub fn perform(
        &mut self,
        action: Action,
        source: &mut (impl ChoiceSource + ?Sized),
    ) -> Result<TurnReport, ActionError> {
        if let Some(report) = self.close_if_terminal()? {
            return Ok(report);
        }
        log::debug!("day {}: {action}", self.session.ledger().day());
        let visit = match action {
            Action::InspectBunker => Some(self.plan_bunker_visit(source)?),
            _ => None,
        };

        let mut events = Vec::new();
        if self.rng.gen_bool(BROADCAST_CHANCE) {
            events.push(TurnEvent::RadioBroadcast {
                message: RADIO_BROADCAST,
            });
        }

        let mut ending = None;
        match action {
            Action::InspectBunker => {
                if let Some(visit) = visit {
                    self.inspect_bunker(visit, &mut events)?;
                }
            }
            Action::EnterWasteland => self.venture_out(source, &mut events)?,
            Action::Rest => self.rest(source, &mut events)?,
            Action::CheckRadiation => {
                let ledger = self.session.ledger();
                events.push(TurnEvent::RadiationReading {
                    level: ledger.radiation(),
                    band: ledger.radiation_band(),
                });
            }
            Action::Exit => {
                let reason = self.session.end(TerminalReason::Voluntary);
                events.push(TurnEvent::Ended { reason });
                ending = Some(reason);
            }
        }
        events.extend(
            self.session
                .award_achievements()
                .into_iter()
                .map(|achievement| TurnEvent::Achievement { achievement }),
        );

        self.state = if ending.is_some() {
            MachineState::Terminal
        } else {
            MachineState::AwaitingAction
        };
        Ok(TurnReport {
            day: self.session.ledger().day(),
            action: Some(action),
            events,
            ending,
        })
    }

    fn plan_bunker_visit(
        &self,
        source: &mut (impl ChoiceSource + ?Sized),
    ) -> Result<BunkerVisit, ActionError> {
        let bunker = self.session.bunker();
        if bunker.is_depleted() {
            return Ok(BunkerVisit::Depleted);
        }
        match BunkerRequest::parse(&source.bunker_withdrawal(bunker))? {
            BunkerRequest::Decline => Ok(BunkerVisit::Declined),
            BunkerRequest::Withdraw(kind) => {
                bunker.check_withdrawal(kind)?;
                Ok(BunkerVisit::Withdraw(kind))
            }
        }
    }

    fn inspect_bunker(&mut self, visit: BunkerVisit, events: &mut Vec<TurnEvent>) -> Result<(), ActionError> {
        let kind = match visit {
            BunkerVisit::Depleted => {
                events.push(TurnEvent::BunkerDepleted);
                return Ok(());
            }
            BunkerVisit::Declined => {
                events.push(TurnEvent::BunkerDeclined);
                return Ok(());
            }
            BunkerVisit::Withdraw(kind) => kind,
        };
        let remaining = self
            .session
            .with_parts_mut(|_, inventory, bunker| bunker.withdraw(kind, inventory))??;
        self.session.stats_mut().bunker_withdrawals += 1;
        events.push(TurnEvent::BunkerWithdrawal { kind, remaining });
        Ok(())
    }

    fn venture_out(
        &mut self,
        source: &mut (impl ChoiceSource + ?Sized),
        events: &mut Vec<TurnEvent>,
    ) -> Result<(), ActionError> {
        self.state = MachineState::ResolvingWasteland;
        let rng = &mut self.rng;
        let trip = self
            .session
            .with_parts_mut(|ledger, inventory, _| enter_wasteland(rng, ledger, inventory, source))?;

        let stats = self.session.stats_mut();
        stats.wasteland_trips += 1;
        stats.items_found += u32::try_from(trip.encounter.items_gained().len()).unwrap_or(u32::MAX);
        if trip.encounter.creature_defeated() {
            stats.creatures_defeated += 1;
        }
        if matches!(trip.encounter, Encounter::CreatureAppease { .. }) {
            stats.supplies_consumed += 1;
        }
        events.push(TurnEvent::RadiationExposure {
            gain: trip.exposure,
        });
        events.push(TurnEvent::Encounter(trip.encounter));
        Ok(())
    }

    fn rest(
        &mut self,
        source: &mut (impl ChoiceSource + ?Sized),
        events: &mut Vec<TurnEvent>,
    ) -> Result<(), ActionError> {
        self.state = MachineState::Resting;
        let report: RestReport = self
            .session
            .with_parts_mut(|ledger, inventory, _| rest(ledger, inventory, source))?;
        let stats = self.session.stats_mut();
        stats.rests += 1;
        stats.supplies_consumed += report.items_consumed();
        events.push(TurnEvent::Rested(report));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{ResourceLedger, ResourceLevels};
    use crate::session::PlayerId;
    use crate::snapshot::{from_snapshot, to_snapshot};

    fn machine(seed: u64) -> ActionStateMachine<ChaCha20Rng> {
        ActionStateMachine::seeded(GameSession::new("Ada", PlayerId::derive("Ada", seed)), seed)
    }

    fn session_with(levels: ResourceLevels, inventory: Vec<ItemKind>) -> GameSession {
        let mut record = to_snapshot(&GameSession::new("Ada", PlayerId::derive("Ada", 0)));
        record.health = levels.health;
        record.food = levels.food;
        record.water = levels.water;
        record.radiation = levels.radiation;
        record.inventory = inventory;
        from_snapshot(&record).unwrap()
    }

    #[test]
    fn actions_parse_from_tokens_and_names() {
        for action in Action::ALL {
            assert_eq!(action.token().parse::<Action>(), Ok(action));
            assert_eq!(action.key().parse::<Action>(), Ok(action));
        }
        assert_eq!(" REST ".parse::<Action>(), Ok(Action::Rest));
        assert!(matches!(
            "6".parse::<Action>(),
            Err(ActionError::InvalidChoice { .. })
        ));
    }

    #[test]
    fn invalid_tokens_leave_everything_untouched() {
        let mut machine = machine(1);
        let before = machine.clone();
        let err = machine.step(&mut ScriptedChoices::new(["dance"])).unwrap_err();
        assert_eq!(
            err,
            ActionError::InvalidChoice {
                token: "dance".into()
            }
        );
        assert_eq!(machine.session(), before.session());
        assert_eq!(machine.state(), MachineState::AwaitingAction);

        // The rng was not touched either, so both machines keep agreeing.
        let mut again = before;
        let a = machine.step(&mut ScriptedChoices::new(["2", "y", "1"])).unwrap();
        let b = again.step(&mut ScriptedChoices::new(["2", "y", "1"])).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn exit_is_voluntary_and_final() {
        let mut machine = machine(2);
        let report = machine.step(&mut ScriptedChoices::new(["5"])).unwrap();
        assert_eq!(report.ending, Some(TerminalReason::Voluntary));
        assert!(report.events.contains(&TurnEvent::Ended {
            reason: TerminalReason::Voluntary
        }));
        assert_eq!(machine.state(), MachineState::Terminal);
        assert_eq!(
            machine.step(&mut ScriptedChoices::new(["4"])),
            Err(ActionError::SessionOver {
                reason: TerminalReason::Voluntary
            })
        );
    }

    #[test]
    fn bunker_withdrawal_moves_items() {
        let mut machine = machine(3);
        let report = machine
            .step(&mut ScriptedChoices::new(["1", "med_kit"]))
            .unwrap();
        assert!(report.events.contains(&TurnEvent::BunkerWithdrawal {
            kind: ItemKind::MedKit,
            remaining: 1
        }));
        assert_eq!(machine.session().inventory().items(), &[ItemKind::MedKit]);
        assert_eq!(machine.session().stats().bunker_withdrawals, 1);

        let report = machine.step(&mut ScriptedChoices::new(["1", "none"])).unwrap();
        assert!(report.events.contains(&TurnEvent::BunkerDeclined));
    }

    #[test]
    fn bunker_rejections_do_not_mutate() {
        let mut machine = machine(4);
        let before = machine.session().clone();
        let err = machine
            .step(&mut ScriptedChoices::new(["1", "rad_pills"]))
            .unwrap_err();
        assert!(matches!(err, ActionError::InvalidChoice { .. }));
        assert_eq!(machine.session(), &before);
        assert_eq!(machine.state(), MachineState::AwaitingAction);
    }

    #[test]
    fn empty_shelf_is_refused_while_others_are_stocked() {
        let mut record = to_snapshot(&GameSession::new("Ada", PlayerId::derive("Ada", 0)));
        record.bunker.insert(ItemKind::MedKit, 0);
        let session = from_snapshot(&record).unwrap();
        let mut machine = ActionStateMachine::seeded(session.clone(), 11);
        let untouched = machine.clone();

        let err = machine
            .step(&mut ScriptedChoices::new(["1", "med_kit"]))
            .unwrap_err();
        assert_eq!(
            err,
            ActionError::InsufficientStock {
                kind: ItemKind::MedKit
            }
        );
        assert_eq!(machine.session(), &session);
        assert_eq!(machine.state(), MachineState::AwaitingAction);

        // The refusal drew nothing, so the next turn matches a machine that
        // never saw it.
        let mut fresh = untouched;
        let script = ["1", "canned_food"];
        let a = machine.step(&mut ScriptedChoices::new(script)).unwrap();
        let b = fresh.step(&mut ScriptedChoices::new(script)).unwrap();
        assert_eq!(a, b);
        assert!(a.events.contains(&TurnEvent::BunkerWithdrawal {
            kind: ItemKind::CannedFood,
            remaining: 4
        }));
    }

    #[test]
    fn achievements_are_announced_once() {
        let mut record = to_snapshot(&GameSession::new("Ada", PlayerId::derive("Ada", 0)));
        record.day = 9;
        record.stats.creatures_defeated = 5;
        let mut machine = ActionStateMachine::seeded(from_snapshot(&record).unwrap(), 12);

        let report = machine.step(&mut ScriptedChoices::new(["3"])).unwrap();
        assert_eq!(report.day, 10);
        let earned: Vec<Achievement> = report
            .events
            .iter()
            .filter_map(|event| match event {
                TurnEvent::Achievement { achievement } => Some(*achievement),
                _ => None,
            })
            .collect();
        assert_eq!(earned, vec![Achievement::Survivor, Achievement::Hunter]);

        let report = machine.step(&mut ScriptedChoices::new(["4"])).unwrap();
        assert!(
            !report
                .events
                .iter()
                .any(|event| matches!(event, TurnEvent::Achievement { .. }))
        );
        assert_eq!(machine.session().achievements().len(), 2);
    }

    #[test]
    fn depleted_bunker_reports_and_changes_nothing() {
        let mut record = to_snapshot(&GameSession::new("Ada", PlayerId::derive("Ada", 0)));
        for count in record.bunker.values_mut() {
            *count = 0;
        }
        let session = from_snapshot(&record).unwrap();
        let mut machine = ActionStateMachine::seeded(session.clone(), 5);
        let mut source = ScriptedChoices::new(["1", "canned_food"]);
        let report = machine.step(&mut source).unwrap();
        assert!(report.events.contains(&TurnEvent::BunkerDepleted));
        assert_eq!(machine.session(), &session);
        assert_eq!(source.remaining(), 1, "no withdrawal prompt on an empty bunker");
    }

    #[test]
    fn radiation_check_is_read_only() {
        let session = session_with(
            ResourceLevels {
                health: 80,
                food: 40,
                water: 40,
                radiation: 55,
            },
            Vec::new(),
        );
        let mut machine = ActionStateMachine::seeded(session.clone(), 6);
        let report = machine.step(&mut ScriptedChoices::new(["4"])).unwrap();
        assert!(report.events.contains(&TurnEvent::RadiationReading {
            level: 55,
            band: RadiationBand::Dangerous
        }));
        assert_eq!(machine.session(), &session);
    }

    #[test]
    fn rest_reports_and_advances_the_day() {
        let session = session_with(
            ResourceLevels {
                health: 60,
                food: 5,
                water: 0,
                radiation: 0,
            },
            vec![ItemKind::CannedFood, ItemKind::WaterBottles],
        );
        let mut machine = ActionStateMachine::seeded(session, 7);
        let report = machine.step(&mut ScriptedChoices::new(["3"])).unwrap();
        let rested = report
            .events
            .iter()
            .find_map(|event| match event {
                TurnEvent::Rested(rest) => Some(rest.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!((rested.after_rest.food, rested.after_rest.water), (30, 25));
        assert_eq!(report.day, 2);
        let ledger = machine.session().ledger();
        assert_eq!((ledger.food(), ledger.water()), (25, 17));
        assert_eq!(machine.session().stats().supplies_consumed, 2);
        assert_eq!(machine.session().stats().rests, 1);
    }

    #[test]
    fn terminal_ledger_closes_on_next_step() {
        let session = session_with(
            ResourceLevels {
                health: 0,
                food: 0,
                water: 0,
                radiation: 100,
            },
            Vec::new(),
        );
        let mut machine = ActionStateMachine::seeded(session, 8);
        assert_eq!(machine.pending_terminal(), Some(TerminalReason::Injury));
        let mut source = ScriptedChoices::new(["2"]);
        let report = machine.step(&mut source).unwrap();
        assert_eq!(report.action, None);
        assert_eq!(report.ending, Some(TerminalReason::Injury));
        assert_eq!(source.remaining(), 1, "no action prompt once terminal");
        assert_eq!(machine.session().ending(), Some(TerminalReason::Injury));
    }

    #[test]
    fn wasteland_trip_records_exposure_and_encounter() {
        let mut machine = machine(9);
        let report = machine
            .step(&mut ScriptedChoices::new(["2", "y", "1"]))
            .unwrap();
        let exposure = report.events.iter().find_map(|event| match event {
            TurnEvent::RadiationExposure { gain } => Some(*gain),
            _ => None,
        });
        assert!(exposure.is_some_and(|gain| (5..=15).contains(&gain)));
        assert!(
            report
                .events
                .iter()
                .any(|event| matches!(event, TurnEvent::Encounter(_)))
        );
        assert_eq!(report.day, 1, "wasteland trips do not advance the day");
        assert_eq!(machine.session().stats().wasteland_trips, 1);
        assert!(machine.session().ledger().radiation() >= 5);
    }

    #[test]
    fn restart_gives_a_fresh_run() {
        let mut machine = machine(10);
        machine.step(&mut ScriptedChoices::new(["3"])).unwrap();
        machine.step(&mut ScriptedChoices::new(["5"])).unwrap();
        machine.restart();
        assert_eq!(machine.state(), MachineState::AwaitingAction);
        assert_eq!(machine.session().ledger(), &ResourceLedger::new());
        assert!(machine.session().ending().is_none());
    }
}
