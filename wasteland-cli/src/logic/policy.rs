use std::fmt;

use clap::ValueEnum;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use wasteland_game::{
    Action, BunkerStock, ChoiceSource, CreatureTactic, EncounterDecisions, GameSession, Inventory,
    ItemKind, RestDecisions, SoundResponse,
};

/// Autoplay interface: answers every prompt from visible session state.
pub trait PlayerPolicy: ChoiceSource {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;
}

/// Built-in gameplay strategies for automated runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum)]
pub enum GameplayStrategy {
    Cautious,
    Reckless,
    Balanced,
    Random,
}

impl GameplayStrategy {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            GameplayStrategy::Cautious => "Cautious",
            GameplayStrategy::Reckless => "Reckless",
            GameplayStrategy::Balanced => "Balanced",
            GameplayStrategy::Random => "Random",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn PlayerPolicy + Send> {
        match self {
            GameplayStrategy::Cautious => Box::new(CautiousPolicy::default()),
            GameplayStrategy::Reckless => Box::new(RecklessPolicy),
            GameplayStrategy::Balanced => Box::new(BalancedPolicy::default()),
            GameplayStrategy::Random => Box::new(RandomPolicy::new(seed)),
        }
    }
}

impl fmt::Display for GameplayStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Thresholds below which a policy goes to the bunker stores for help.
#[derive(Debug, Clone, Copy)]
struct Floors {
    health: i32,
    food: i32,
    water: i32,
}

/// First supply the session is short of that the bunker can still provide.
fn needed_supply(session: &GameSession, floors: Floors) -> Option<ItemKind> {
    let ledger = session.ledger();
    let inventory = session.inventory();
    let wants = [
        (ItemKind::MedKit, ledger.health() < floors.health),
        (ItemKind::CannedFood, ledger.food() < floors.food),
        (ItemKind::WaterBottles, ledger.water() < floors.water),
    ];
    wants
        .into_iter()
        .filter(|(kind, short)| *short && !inventory.contains(*kind))
        .map(|(kind, _)| kind)
        .find(|kind| session.bunker().count(*kind) > 0)
}

fn token(action: Action) -> String {
    action.token().to_string()
}

fn withdrawal_token(wanted: Option<ItemKind>) -> String {
    wanted.map_or_else(|| "none".to_string(), |kind| kind.key().to_string())
}

/// Keeps stores topped up, rests early and avoids every fight.
#[derive(Debug, Default)]
struct CautiousPolicy {
    wanted: Option<ItemKind>,
}

impl PlayerPolicy for CautiousPolicy {
    fn name(&self) -> &'static str {
        "cautious"
    }
}

impl ChoiceSource for CautiousPolicy {
    fn next_action(&mut self, session: &GameSession) -> String {
        let floors = Floors {
            health: 70,
            food: 60,
            water: 60,
        };
        self.wanted = needed_supply(session, floors);
        if self.wanted.is_some() {
            return token(Action::InspectBunker);
        }
        let ledger = session.ledger();
        let pills = session.inventory().contains(ItemKind::RadPills);
        if ledger.food() < 50
            || ledger.water() < 50
            || ledger.health() < 70
            || (ledger.radiation() >= 40 && pills)
        {
            token(Action::Rest)
        } else {
            token(Action::EnterWasteland)
        }
    }

    fn bunker_withdrawal(&mut self, _bunker: &BunkerStock) -> String {
        withdrawal_token(self.wanted.take())
    }
}

impl EncounterDecisions for CautiousPolicy {
    fn investigate_sound(&mut self, _sound: &str) -> SoundResponse {
        SoundResponse::Ignore
    }

    fn creature_tactic(&mut self, _creature: &str, inventory: &Inventory) -> Option<CreatureTactic> {
        if inventory.contains(ItemKind::CannedFood) {
            Some(CreatureTactic::Appease)
        } else {
            Some(CreatureTactic::Flee)
        }
    }
}

impl RestDecisions for CautiousPolicy {
    fn use_med_kit(&mut self, health: i32) -> bool {
        health < 70
    }

    fn take_rad_pills(&mut self, radiation: i32) -> bool {
        radiation >= 30
    }
}

/// Lives in the wasteland and fights everything it meets.
struct RecklessPolicy;

impl PlayerPolicy for RecklessPolicy {
    fn name(&self) -> &'static str {
        "reckless"
    }
}

impl ChoiceSource for RecklessPolicy {
    fn next_action(&mut self, session: &GameSession) -> String {
        if session.ledger().health() < 25 {
            token(Action::Rest)
        } else {
            token(Action::EnterWasteland)
        }
    }

    fn bunker_withdrawal(&mut self, _bunker: &BunkerStock) -> String {
        withdrawal_token(None)
    }
}

impl EncounterDecisions for RecklessPolicy {
    fn investigate_sound(&mut self, _sound: &str) -> SoundResponse {
        SoundResponse::Investigate
    }

    fn creature_tactic(&mut self, _creature: &str, _inventory: &Inventory) -> Option<CreatureTactic> {
        Some(CreatureTactic::Fight)
    }
}

impl RestDecisions for RecklessPolicy {
    fn use_med_kit(&mut self, _health: i32) -> bool {
        true
    }

    fn take_rad_pills(&mut self, _radiation: i32) -> bool {
        true
    }
}

/// Takes risks while healthy and plays safe once hurt.
#[derive(Debug, Default)]
struct BalancedPolicy {
    wanted: Option<ItemKind>,
    health: i32,
}

impl PlayerPolicy for BalancedPolicy {
    fn name(&self) -> &'static str {
        "balanced"
    }
}

impl ChoiceSource for BalancedPolicy {
    fn next_action(&mut self, session: &GameSession) -> String {
        let ledger = session.ledger();
        self.health = ledger.health();
        let floors = Floors {
            health: 50,
            food: 40,
            water: 40,
        };
        self.wanted = needed_supply(session, floors);
        if self.wanted.is_some() {
            return token(Action::InspectBunker);
        }
        let pills = session.inventory().contains(ItemKind::RadPills);
        if ledger.food() < 35
            || ledger.water() < 35
            || ledger.health() < 50
            || (ledger.radiation() >= 50 && pills)
        {
            token(Action::Rest)
        } else {
            token(Action::EnterWasteland)
        }
    }

    fn bunker_withdrawal(&mut self, _bunker: &BunkerStock) -> String {
        withdrawal_token(self.wanted.take())
    }
}

impl EncounterDecisions for BalancedPolicy {
    fn investigate_sound(&mut self, _sound: &str) -> SoundResponse {
        if self.health > 60 {
            SoundResponse::Investigate
        } else {
            SoundResponse::Ignore
        }
    }

    fn creature_tactic(&mut self, _creature: &str, inventory: &Inventory) -> Option<CreatureTactic> {
        if self.health > 60 {
            Some(CreatureTactic::Fight)
        } else if inventory.contains(ItemKind::CannedFood) {
            Some(CreatureTactic::Appease)
        } else {
            Some(CreatureTactic::Flee)
        }
    }
}

impl RestDecisions for BalancedPolicy {
    fn use_med_kit(&mut self, health: i32) -> bool {
        health < 60
    }

    fn take_rad_pills(&mut self, radiation: i32) -> bool {
        radiation >= 40
    }
}

/// Uniform answers to every prompt. Never exits on its own.
struct RandomPolicy {
    rng: ChaCha20Rng,
}

impl RandomPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed ^ 0x00C0_FFEE),
        }
    }
}

impl PlayerPolicy for RandomPolicy {
    fn name(&self) -> &'static str {
        "random"
    }
}

impl ChoiceSource for RandomPolicy {
    fn next_action(&mut self, _session: &GameSession) -> String {
        let playable = &Action::ALL[..Action::ALL.len() - 1];
        token(playable[self.rng.gen_range(0..playable.len())])
    }

    fn bunker_withdrawal(&mut self, _bunker: &BunkerStock) -> String {
        // Any item key, including ones the bunker never stocks.
        let pick = self.rng.gen_range(0..=ItemKind::ALL.len());
        withdrawal_token(ItemKind::ALL.get(pick).copied())
    }
}

impl EncounterDecisions for RandomPolicy {
    fn investigate_sound(&mut self, _sound: &str) -> SoundResponse {
        if self.rng.gen_bool(0.5) {
            SoundResponse::Investigate
        } else {
            SoundResponse::Ignore
        }
    }

    fn creature_tactic(&mut self, _creature: &str, _inventory: &Inventory) -> Option<CreatureTactic> {
        let pick = self.rng.gen_range(0..=CreatureTactic::ALL.len());
        CreatureTactic::ALL.get(pick).copied()
    }
}

impl RestDecisions for RandomPolicy {
    fn use_med_kit(&mut self, _health: i32) -> bool {
        self.rng.gen_bool(0.5)
    }

    fn take_rad_pills(&mut self, _radiation: i32) -> bool {
        self.rng.gen_bool(0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasteland_game::{PlayerId, SnapshotRecord, from_snapshot, to_snapshot};

    fn session_with(edit: impl FnOnce(&mut SnapshotRecord)) -> GameSession {
        let mut record = to_snapshot(&GameSession::new("Bot", PlayerId::derive("Bot", 0)));
        edit(&mut record);
        from_snapshot(&record).unwrap()
    }

    #[test]
    fn labels_and_names_line_up() {
        for &strategy in GameplayStrategy::value_variants() {
            let policy = strategy.create_policy(1);
            assert_eq!(policy.name(), strategy.label().to_ascii_lowercase());
            assert_eq!(strategy.to_string(), strategy.label());
        }
    }

    #[test]
    fn cautious_fetches_what_it_lacks_from_the_bunker() {
        let session = session_with(|record| record.food = 30);
        let mut policy = GameplayStrategy::Cautious.create_policy(1);
        assert_eq!(policy.next_action(&session), "1");
        assert_eq!(policy.bunker_withdrawal(session.bunker()), "canned_food");
        assert_eq!(policy.bunker_withdrawal(session.bunker()), "none");
    }

    #[test]
    fn cautious_rests_once_the_bunker_cannot_help() {
        let session = session_with(|record| {
            record.food = 30;
            record.bunker.values_mut().for_each(|count| *count = 0);
        });
        let mut policy = GameplayStrategy::Cautious.create_policy(1);
        assert_eq!(policy.next_action(&session), "3");
    }

    #[test]
    fn reckless_fights_and_explores() {
        let session = GameSession::new("Bot", PlayerId::derive("Bot", 0));
        let mut policy = GameplayStrategy::Reckless.create_policy(1);
        assert_eq!(policy.next_action(&session), "2");
        assert_eq!(
            policy.creature_tactic("rat", &Inventory::new()),
            Some(CreatureTactic::Fight)
        );
        assert_eq!(policy.investigate_sound("growl"), SoundResponse::Investigate);
    }

    #[test]
    fn balanced_turns_careful_when_hurt() {
        let session = session_with(|record| record.health = 40);
        let mut policy = GameplayStrategy::Balanced.create_policy(1);
        policy.next_action(&session);
        let fed = Inventory::from_items(vec![ItemKind::CannedFood]);
        assert_eq!(
            policy.creature_tactic("rat", &fed),
            Some(CreatureTactic::Appease)
        );
        assert_eq!(policy.investigate_sound("growl"), SoundResponse::Ignore);
    }

    #[test]
    fn random_never_exits() {
        let session = GameSession::new("Bot", PlayerId::derive("Bot", 0));
        let mut policy = GameplayStrategy::Random.create_policy(7);
        for _ in 0..200 {
            assert_ne!(policy.next_action(&session), Action::Exit.token());
        }
    }
}
