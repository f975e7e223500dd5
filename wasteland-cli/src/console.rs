//! Terminal front end for `wasteland play`.
use colored::Colorize;
use std::io::{self, BufRead, Write};

use wasteland_game::{
    Action, BunkerStock, ChoiceSource, CreatureTactic, Encounter, EncounterDecisions, FightResult,
    GameSession, Inventory, ItemKind, RadiationBand, RestDecisions, RestReport, RunSummary,
    SessionStart, SoundOutcome, SoundResponse, TurnEvent, TurnReport, is_yes,
};

/// Reads answers from `input` and narrates to `output`.
///
/// Closed input reads as empty answers, and an empty action answer exits,
/// so a run always finishes once the stream ends.
pub struct ConsoleChoices<R, W> {
    input: R,
    output: W,
    closed: bool,
    error: Option<io::Error>,
}

impl<R: BufRead, W: Write> ConsoleChoices<R, W> {
    pub const fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            closed: false,
            error: None,
        }
    }

    pub fn out(&mut self) -> &mut W {
        &mut self.output
    }

    /// First I/O error hit while prompting, if any.
    pub fn take_error(&mut self) -> io::Result<()> {
        self.error.take().map_or(Ok(()), Err)
    }

    /// Print `prompt` and read one trimmed line.
    pub fn ask(&mut self, prompt: &str) -> String {
        let written = write!(self.output, "{} ", prompt.bold());
        let flushed = written.and_then(|()| self.output.flush());
        self.check(flushed);
        if self.closed {
            return String::new();
        }
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => {
                self.closed = true;
                String::new()
            }
            Ok(_) => line.trim().to_string(),
            Err(err) => {
                self.closed = true;
                self.record(err);
                String::new()
            }
        }
    }

    fn ask_yes(&mut self, prompt: &str) -> bool {
        is_yes(&self.ask(prompt))
    }

    fn say(&mut self, text: &str) {
        let result = writeln!(self.output, "{text}");
        self.check(result);
    }

    fn check(&mut self, result: io::Result<()>) {
        if let Err(err) = result {
            self.record(err);
        }
    }

    fn record(&mut self, err: io::Error) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }
}

impl<R: BufRead, W: Write> EncounterDecisions for ConsoleChoices<R, W> {
    fn investigate_sound(&mut self, sound: &str) -> SoundResponse {
        self.say(&format!("🔊 You hear something: {}", sound.italic()));
        if self.ask_yes("Investigate? (y/n):") {
            SoundResponse::Investigate
        } else {
            SoundResponse::Ignore
        }
    }

    fn creature_tactic(&mut self, creature: &str, inventory: &Inventory) -> Option<CreatureTactic> {
        self.say(&format!("{} {}", "⚠️ Creature:".red().bold(), creature));
        self.say("  1. Fight");
        self.say("  2. Flee");
        let appease = if inventory.contains(ItemKind::CannedFood) {
            "  3. Appease (costs one canned food)"
        } else {
            "  3. Appease (you have no canned food)"
        };
        self.say(appease);
        CreatureTactic::from_token(&self.ask("What do you do?"))
    }
}

impl<R: BufRead, W: Write> RestDecisions for ConsoleChoices<R, W> {
    fn use_med_kit(&mut self, health: i32) -> bool {
        self.ask_yes(&format!("Health is {health}. Use a med kit? (y/n):"))
    }

    fn take_rad_pills(&mut self, radiation: i32) -> bool {
        self.ask_yes(&format!("Radiation is {radiation}. Take rad pills? (y/n):"))
    }
}

impl<R: BufRead, W: Write> ChoiceSource for ConsoleChoices<R, W> {
    fn next_action(&mut self, session: &GameSession) -> String {
        let result = render_status(&mut self.output, session);
        self.check(result);
        if self.closed {
            return Action::Exit.token().to_string();
        }
        let answer = self.ask("Choose an action (1-5):");
        if answer.is_empty() && self.closed {
            return Action::Exit.token().to_string();
        }
        answer
    }

    fn bunker_withdrawal(&mut self, bunker: &BunkerStock) -> String {
        self.say(&"📦 Bunker stores".bright_blue().bold().to_string());
        for (kind, count) in bunker.entries() {
            self.say(&format!("  {:15} {count}", kind.key()));
        }
        self.ask("Take which item? (name, or 'none'):")
    }
}

fn inventory_line(inventory: &Inventory) -> String {
    if inventory.is_empty() {
        return "empty".to_string();
    }
    ItemKind::ALL
        .into_iter()
        .filter(|kind| inventory.contains(*kind))
        .map(|kind| format!("{} x{}", kind.label(), inventory.count_of(kind)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn item_list(items: &[ItemKind]) -> String {
    items
        .iter()
        .map(|kind| kind.label())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Day header, resource levels, inventory and the action menu.
pub fn render_status(out: &mut dyn Write, session: &GameSession) -> io::Result<()> {
    let ledger = session.ledger();
    writeln!(out)?;
    writeln!(
        out,
        "{}",
        format!("=== Day {} ===", ledger.day()).bright_yellow().bold()
    )?;
    writeln!(
        out,
        "Health: {}  Food: {}  Water: {}  Radiation: {}",
        ledger.health(),
        ledger.food(),
        ledger.water(),
        ledger.radiation()
    )?;
    writeln!(out, "Inventory: {}", inventory_line(session.inventory()))?;
    for action in Action::ALL {
        writeln!(out, "  {}. {}", action.token(), action.label())?;
    }
    Ok(())
}

pub fn render_welcome(out: &mut dyn Write, start: &SessionStart) -> io::Result<()> {
    let session = &start.session;
    writeln!(out, "{}", "☢️  WASTELAND  ☢️".bright_green().bold())?;
    writeln!(out, "{}", "==============".green())?;
    writeln!(out, "Welcome, {}.", session.player_name().bold())?;
    writeln!(out, "Player id: {}", session.player_id())?;
    if start.resumed {
        writeln!(out, "Resuming your run on day {}.", session.ledger().day())?;
    }
    render_claimed(out, &start.claimed)
}

pub fn render_claimed(out: &mut dyn Write, claimed: &[String]) -> io::Result<()> {
    for bundle in claimed {
        writeln!(out, "{} {bundle}", "🎁 Claimed".bright_magenta())?;
    }
    Ok(())
}

/// Narrate every event of a finished turn.
pub fn render_report(out: &mut dyn Write, report: &TurnReport) -> io::Result<()> {
    for event in &report.events {
        match event {
            TurnEvent::RadioBroadcast { message } => {
                writeln!(out, "{}", format!("📻 {message}").dimmed())?;
            }
            TurnEvent::BunkerDepleted => writeln!(out, "The bunker shelves are bare.")?,
            TurnEvent::BunkerWithdrawal { kind, remaining } => writeln!(
                out,
                "You take {} from the bunker ({remaining} left).",
                kind.label()
            )?,
            TurnEvent::BunkerDeclined => writeln!(out, "You leave the bunker stores alone.")?,
            TurnEvent::RadiationExposure { gain } => writeln!(
                out,
                "{}",
                format!("☢️ The wasteland air adds {gain} radiation.").yellow()
            )?,
            TurnEvent::Encounter(encounter) => writeln!(out, "{}", describe_encounter(encounter))?,
            TurnEvent::Rested(rest) => render_rest(out, rest)?,
            TurnEvent::RadiationReading { level, band } => {
                let reading = format!("Geiger counter: {level} ({})", band.key());
                let reading = match band {
                    RadiationBand::Safe => reading.green(),
                    RadiationBand::Elevated => reading.yellow(),
                    RadiationBand::Dangerous | RadiationBand::Critical => reading.red(),
                };
                writeln!(out, "{reading}")?;
            }
            TurnEvent::Achievement { achievement } => writeln!(
                out,
                "{}",
                format!("🏆 {}", achievement.announcement()).bright_green().bold()
            )?,
            TurnEvent::Ended { .. } => {}
        }
    }
    Ok(())
}

#[must_use]
pub fn describe_encounter(encounter: &Encounter) -> String {
    match encounter {
        Encounter::ScavengeFound { location, items } => {
            format!("🔎 You search a {location} and find {}.", item_list(items))
        }
        Encounter::ScavengeEmpty { location } => {
            format!("🔎 You search a {location}, but it has been picked clean.")
        }
        Encounter::SoundInvestigated { outcome, .. } => match outcome {
            SoundOutcome::Cache { items } => {
                format!("You follow the sound to a hidden cache: {}.", item_list(items))
            }
            SoundOutcome::Attacked { damage } => {
                format!("Something lunges out of the dark! You lose {damage} health.")
            }
        },
        Encounter::SoundIgnored { .. } => "You keep your distance.".to_string(),
        Encounter::SupplyCache { items } => {
            format!("📦 A supply cache! You gain {}.", item_list(items))
        }
        Encounter::RadiationStorm { gain, masked } => {
            let cover = if *masked {
                "Your gas mask filters the worst of it."
            } else {
                "You have no gas mask."
            };
            format!("🌪️ A radiation storm rolls in. {cover} Radiation +{gain}.")
        }
        Encounter::CreatureFight { creature, result } => match result {
            FightResult::Won { loot } => {
                format!("You defeat the {creature} and carve off a {}.", loot.label())
            }
            FightResult::Wounded { damage } => {
                format!("The {creature} mauls you. You lose {damage} health.")
            }
        },
        Encounter::CreatureFlee { creature, damage } => {
            format!("You escape the {creature}, losing {damage} health.")
        }
        Encounter::CreatureAppease { creature } => {
            format!("You toss canned food to the {creature} and slip away.")
        }
        Encounter::CreatureBlunder { creature, damage } => {
            format!("You hesitate and the {creature} strikes. You lose {damage} health.")
        }
    }
}

fn render_rest(out: &mut dyn Write, rest: &RestReport) -> io::Result<()> {
    writeln!(out, "{}", "😴 You rest in the bunker.".bright_blue())?;
    if rest.ate_canned_food {
        writeln!(out, "  You eat a can of food.")?;
    }
    if rest.drank_water {
        writeln!(out, "  You drink a bottle of water.")?;
    }
    if rest.used_med_kit {
        writeln!(out, "  You patch yourself up with a med kit.")?;
    }
    if rest.took_rad_pills {
        writeln!(out, "  You swallow rad pills.")?;
    }
    let levels = rest.after_rest;
    writeln!(
        out,
        "  Health {} (+{})  Food {}  Water {}  Radiation {}",
        levels.health, rest.health_regenerated, levels.food, levels.water, levels.radiation
    )?;
    let advance = rest.advance;
    if advance.food_drained > 0 || advance.water_drained > 0 {
        writeln!(
            out,
            "  Day {} dawns. Spoilage costs {} food and {} water.",
            advance.day, advance.food_drained, advance.water_drained
        )?;
    } else {
        writeln!(out, "  Day {} dawns.", advance.day)?;
    }
    Ok(())
}

/// Game-over screen.
pub fn render_summary(out: &mut dyn Write, summary: &RunSummary) -> io::Result<()> {
    writeln!(out)?;
    let headline = if summary.reason.is_death() {
        format!("💀 {}", summary.headline).red().bold()
    } else {
        format!("🚶 {}", summary.headline).yellow().bold()
    };
    writeln!(out, "{headline}")?;
    writeln!(out, "{}", summary.epilogue.italic())?;
    writeln!(out)?;
    writeln!(out, "{}", "📊 Run Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "==============".cyan())?;
    writeln!(out, "Days survived: {}", summary.days_survived)?;
    writeln!(out, "Wasteland trips: {}", summary.stats.wasteland_trips)?;
    writeln!(out, "Creatures defeated: {}", summary.stats.creatures_defeated)?;
    writeln!(out, "Items found: {}", summary.stats.items_found)?;
    writeln!(out, "Supplies consumed: {}", summary.stats.supplies_consumed)?;
    let levels = summary.final_levels;
    writeln!(
        out,
        "Final state: Health {}  Food {}  Water {}  Radiation {}",
        levels.health, levels.food, levels.water, levels.radiation
    )?;
    if !summary.achievements.is_empty() {
        writeln!(out, "{}", "🏆 Achievements:".bright_green())?;
        for achievement in &summary.achievements {
            writeln!(out, "  🎖️ {}", achievement.label())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasteland_game::{Achievement, ActionStateMachine, PlayerId, ScriptedChoices, run_summary};

    fn console(input: &str) -> ConsoleChoices<&[u8], Vec<u8>> {
        ConsoleChoices::new(input.as_bytes(), Vec::new())
    }

    fn text(console: &ConsoleChoices<&[u8], Vec<u8>>) -> String {
        String::from_utf8_lossy(&console.output).into_owned()
    }

    #[test]
    fn closed_input_exits() {
        let session = GameSession::new("Ada", PlayerId::derive("Ada", 1));
        let mut console = console("");
        assert_eq!(console.next_action(&session), Action::Exit.token());
        assert_eq!(console.next_action(&session), Action::Exit.token());
        assert!(text(&console).contains("=== Day 1 ==="));
    }

    #[test]
    fn answers_are_read_line_by_line() {
        let mut console = console(" 2 \ny\n3\nno\n");
        let session = GameSession::new("Ada", PlayerId::derive("Ada", 1));
        assert_eq!(console.next_action(&session), "2");
        assert_eq!(console.investigate_sound("clicks"), SoundResponse::Investigate);
        assert_eq!(
            console.creature_tactic("rat", &Inventory::new()),
            Some(CreatureTactic::Appease)
        );
        assert!(!console.use_med_kit(40));
        assert!(text(&console).contains("you have no canned food"));
        console.take_error().unwrap();
    }

    #[test]
    fn voluntary_exit_renders_a_summary() {
        let session = GameSession::new("Ada", PlayerId::derive("Ada", 1));
        let mut machine = ActionStateMachine::seeded(session, 1);
        let mut console = console("5\n");
        let report = machine.step(&mut console).unwrap();
        render_report(console.out(), &report).unwrap();
        let summary = run_summary(machine.session()).unwrap();
        render_summary(console.out(), &summary).unwrap();
        let output = text(&console);
        assert!(output.contains("Ada has left the wasteland..."));
        assert!(output.contains("Days survived: 1"));
        assert!(!output.contains("Achievements"));
    }

    #[test]
    fn achievements_are_announced_and_summarized() {
        let report = TurnReport {
            day: 10,
            action: Some(Action::Rest),
            events: vec![TurnEvent::Achievement {
                achievement: Achievement::Survivor,
            }],
            ending: None,
        };
        let mut console = console("");
        render_report(console.out(), &report).unwrap();

        let session = GameSession::new("Ada", PlayerId::derive("Ada", 1));
        let mut machine = ActionStateMachine::seeded(session, 1);
        machine.step(&mut ScriptedChoices::new(["5"])).unwrap();
        let mut summary = run_summary(machine.session()).unwrap();
        summary.achievements = vec![Achievement::Hunter];
        render_summary(console.out(), &summary).unwrap();

        let output = text(&console);
        assert!(output.contains("SURVIVOR: Survived 10 days!"));
        assert!(output.contains("Hunter (5 kills)"));
    }

    #[test]
    fn encounters_read_naturally() {
        let storm = Encounter::RadiationStorm {
            gain: 12,
            masked: true,
        };
        assert!(describe_encounter(&storm).contains("gas mask filters"));
        let empty = Encounter::ScavengeEmpty {
            location: "ruined gas station",
        };
        assert!(describe_encounter(&empty).contains("picked clean"));
    }
}
