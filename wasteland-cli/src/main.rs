mod console;
mod logic;
mod util;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use console::ConsoleChoices;
use logic::{DEFAULT_MAX_TURNS, GameplayStrategy, SimulationPlan, run_simulation};
use util::{clock_seed, parse_seeds};
use wasteland_game::{
    ActionError, ActionStateMachine, BundleCatalog, EntitlementGateway, JsonFileEntitlements,
    JsonFileStore, MemoryEntitlements, MemoryStore, PersistenceGateway, PlayerId, STARTER_PACK,
    SurvivalEngine, is_yes, run_summary,
};

#[derive(Debug, Parser)]
#[command(name = "wasteland", version)]
#[command(about = "Turn-based wasteland survival: play in the terminal or run seeded autoplay sweeps")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Play interactively on stdin/stdout
    Play(PlayArgs),
    /// Run automated strategies over a set of seeds
    Simulate(SimulateArgs),
    /// Record a bundle purchase for a player
    Grant(GrantArgs),
}

#[derive(Debug, Args)]
struct PlayArgs {
    /// Survivor name (prompted for when omitted)
    #[arg(long)]
    name: Option<String>,

    /// Seed for the game's random source (defaults to the clock)
    #[arg(long)]
    seed: Option<u64>,

    /// Directory for saves and purchases; play is not persisted without it
    #[arg(long)]
    save_dir: Option<PathBuf>,

    /// Save slot to resume and autosave into
    #[arg(long, default_value = "default")]
    session: String,
}

#[derive(Debug, Args)]
struct SimulateArgs {
    /// Seeds to run (comma-separated)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Runs per seed; iteration `i` plays seed + i
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Autoplay strategy
    #[arg(long, value_enum, default_value_t = GameplayStrategy::Balanced)]
    strategy: GameplayStrategy,

    /// Turns after which a run is halted
    #[arg(long, default_value_t = DEFAULT_MAX_TURNS)]
    max_turns: usize,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Output file (defaults to stdout)
    #[arg(long)]
    output: Option<PathBuf>,

    /// List every run in the console report
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Args)]
struct GrantArgs {
    /// Directory holding saves and purchases
    #[arg(long)]
    save_dir: PathBuf,

    /// Player id, as printed when a game starts
    #[arg(long)]
    player: String,

    /// Bundle to grant
    #[arg(long, default_value = STARTER_PACK)]
    bundle: String,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Play(args) => run_play(&args),
        Command::Simulate(args) => run_simulate(&args),
        Command::Grant(args) => run_grant(&args),
    }
}

fn run_play(args: &PlayArgs) -> Result<()> {
    let stdin = io::stdin();
    let mut console = ConsoleChoices::new(stdin.lock(), stdout());
    let seed = args.seed.unwrap_or_else(clock_seed);
    let name = match &args.name {
        Some(name) => name.clone(),
        None => console.ask("Enter your name, survivor:"),
    };
    console.take_error()?;

    if let Some(dir) = &args.save_dir {
        let saves = JsonFileStore::open(dir.join("saves"))
            .with_context(|| format!("failed to open saves under {}", dir.display()))?;
        let premium = JsonFileEntitlements::open(dir.join("premium"))
            .with_context(|| format!("failed to open purchases under {}", dir.display()))?;
        play_session(
            &SurvivalEngine::new(saves, premium),
            &mut console,
            &args.session,
            &name,
            seed,
        )
    } else {
        play_session(
            &SurvivalEngine::new(MemoryStore::new(), MemoryEntitlements::new()),
            &mut console,
            &args.session,
            &name,
            seed,
        )
    }
}

fn play_session<P, E, R, W>(
    engine: &SurvivalEngine<P, E>,
    console: &mut ConsoleChoices<R, W>,
    session_id: &str,
    name: &str,
    seed: u64,
) -> Result<()>
where
    P: PersistenceGateway,
    E: EntitlementGateway,
    R: BufRead,
    W: Write,
{
    let start = engine
        .start_session(session_id, name, seed)
        .with_context(|| format!("failed to start session '{session_id}'"))?;
    console::render_welcome(console.out(), &start)?;
    let mut machine = ActionStateMachine::seeded(start.session, seed);

    loop {
        match machine.step(&mut *console) {
            Ok(report) => {
                console::render_report(console.out(), &report)?;
                if report.ending.is_none() {
                    if let Err(err) = engine.save_session(session_id, machine.session()) {
                        writeln!(console.out(), "{}", format!("⚠️ Autosave failed: {err}").yellow())?;
                    }
                } else {
                    engine
                        .clear_session(session_id)
                        .with_context(|| format!("failed to clear session '{session_id}'"))?;
                    if let Some(summary) = run_summary(machine.session()) {
                        console::render_summary(console.out(), &summary)?;
                    }
                    if !is_yes(&console.ask("Play again? (y/n):")) {
                        break;
                    }
                    machine.restart();
                    let claimed = engine
                        .claim_owned_bundles(machine.session_mut())
                        .context("failed to read purchases")?;
                    console::render_claimed(console.out(), &claimed)?;
                }
            }
            Err(ActionError::SessionOver { .. }) => break,
            Err(err) => writeln!(console.out(), "{}", format!("⚠️ {err}").yellow())?,
        }
        console.take_error()?;
    }

    console.take_error()?;
    writeln!(console.out(), "Goodbye.")?;
    console.out().flush()?;
    Ok(())
}

fn run_simulate(args: &SimulateArgs) -> Result<()> {
    let seeds = parse_seeds(&args.seeds)?;
    let plan = SimulationPlan::new(args.strategy, seeds)
        .with_iterations(args.iterations)
        .with_max_turns(args.max_turns);

    if args.report == "console" {
        announce_banner();
        println!(
            "🧪 {} strategy over {} seeds x {} iterations",
            plan.strategy,
            plan.seeds.len(),
            plan.iterations
        );
    }
    let start_time = Instant::now();
    let summary = run_simulation(&plan);

    let mut output_target = OutputTarget::new(args.output.clone())?;
    match args.report.as_str() {
        "json" => logic::reports::generate_json_report(&mut output_target, &summary)?,
        "markdown" => logic::reports::generate_markdown_report(&mut output_target, &summary)?,
        _ => logic::reports::generate_console_report(
            &mut output_target,
            &summary,
            start_time.elapsed(),
            args.verbose,
        )?,
    }
    output_target.flush_inner()?;
    Ok(())
}

fn run_grant(args: &GrantArgs) -> Result<()> {
    let gateway = JsonFileEntitlements::open(args.save_dir.join("premium")).with_context(|| {
        format!(
            "failed to open purchases under {}",
            args.save_dir.display()
        )
    })?;
    if !BundleCatalog::default().contains(&args.bundle) {
        log::warn!("bundle '{}' has no catalog grant", args.bundle);
        println!(
            "{}",
            format!("⚠️ '{}' grants no items yet", args.bundle).yellow()
        );
    }
    let player = PlayerId::from_raw(args.player.as_str());
    let granted = gateway
        .grant_entitlement(&player, &args.bundle)
        .with_context(|| format!("failed to grant '{}' to {player}", args.bundle))?;
    if granted {
        println!("{} {} to {player}", "✅ Granted".green(), args.bundle);
    } else {
        println!("{player} already owns {}", args.bundle);
    }
    Ok(())
}

fn announce_banner() {
    println!("{}", "☢️  Wasteland Autoplay".bright_cyan().bold());
    println!("{}", "======================".cyan());
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
