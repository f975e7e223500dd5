use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::io::Write;
use std::time::Duration;

use super::simulation::{RunRecord, SimulationSummary};

fn share(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let (count, total) = (count as f64, total as f64);
    count / total * 100.0
}

pub fn generate_console_report(
    out: &mut dyn Write,
    summary: &SimulationSummary,
    total_duration: Duration,
    verbose: bool,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Autoplay Results Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "===========================".cyan())?;

    let total_runs = summary.runs.len();
    writeln!(out, "Strategy: {}", summary.strategy)?;
    writeln!(out, "Total runs: {total_runs}")?;
    writeln!(out, "Average days survived: {:.1}", summary.average_days())?;
    if let Some(best) = summary.longest_run() {
        writeln!(
            out,
            "Longest run: {} days (seed {})",
            best.days_survived.to_string().green(),
            best.seed
        )?;
    }
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;

    writeln!(out, "{}", "🏁 Endings".bright_yellow().bold())?;
    writeln!(out, "{}", "==========".yellow())?;
    for (ending, count) in summary.ending_distribution() {
        writeln!(
            out,
            "{ending:10} {count:5} ({:.1}%)",
            share(count, total_runs)
        )?;
    }
    writeln!(out)?;

    let violations = summary.violation_count();
    if violations == 0 {
        writeln!(out, "{}", "✅ No invariant violations".green())?;
    } else {
        writeln!(
            out,
            "{}",
            format!("❌ {violations} invariant violations").red()
        )?;
        for run in summary.runs.iter().filter(|run| !run.violations.is_empty()) {
            for violation in &run.violations {
                writeln!(out, "   • seed {}: {}", run.seed, violation.red())?;
            }
        }
    }

    if verbose {
        writeln!(out)?;
        for run in &summary.runs {
            write_run_line(out, run)?;
        }
    }
    Ok(())
}

fn write_run_line(out: &mut dyn Write, run: &RunRecord) -> Result<()> {
    let outcome = match run.ending {
        Some(reason) if reason.is_death() => run.outcome_key().red(),
        Some(_) => run.outcome_key().yellow(),
        None => run.outcome_key().dimmed(),
    };
    writeln!(
        out,
        "seed {:>6} #{}: {outcome} on day {} after {} turns ({} trips, {} rests)",
        run.seed,
        run.iteration,
        run.days_survived,
        run.turns,
        run.stats.wasteland_trips,
        run.stats.rests
    )?;
    Ok(())
}

#[derive(Serialize)]
struct JsonReport<'a> {
    strategy: &'static str,
    max_turns: usize,
    total_runs: usize,
    average_days: f64,
    endings: Vec<JsonEnding>,
    runs: &'a [RunRecord],
}

#[derive(Serialize)]
struct JsonEnding {
    ending: &'static str,
    count: usize,
}

pub fn generate_json_report(out: &mut dyn Write, summary: &SimulationSummary) -> Result<()> {
    let report = JsonReport {
        strategy: summary.strategy,
        max_turns: summary.max_turns,
        total_runs: summary.runs.len(),
        average_days: summary.average_days(),
        endings: summary
            .ending_distribution()
            .into_iter()
            .map(|(ending, count)| JsonEnding { ending, count })
            .collect(),
        runs: &summary.runs,
    };
    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)?;
    Ok(())
}

pub fn generate_markdown_report(out: &mut dyn Write, summary: &SimulationSummary) -> Result<()> {
    writeln!(out, "# Wasteland Autoplay Results\n")?;

    let total_runs = summary.runs.len();
    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Strategy**: {}", summary.strategy)?;
    writeln!(out, "- **Total runs**: {total_runs}")?;
    writeln!(out, "- **Turn cap**: {}", summary.max_turns)?;
    writeln!(
        out,
        "- **Average days survived**: {:.1}",
        summary.average_days()
    )?;
    writeln!(
        out,
        "- **Invariant violations**: {}\n",
        summary.violation_count()
    )?;

    writeln!(out, "## Endings\n")?;
    writeln!(out, "| Ending | Runs | Share |")?;
    writeln!(out, "| --- | ---: | ---: |")?;
    for (ending, count) in summary.ending_distribution() {
        writeln!(
            out,
            "| {ending} | {count} | {:.1}% |",
            share(count, total_runs)
        )?;
    }
    writeln!(out)?;

    writeln!(out, "## Runs\n")?;
    writeln!(out, "| Seed | Iteration | Ending | Days | Turns | Trips | Rests |")?;
    writeln!(out, "| ---: | ---: | --- | ---: | ---: | ---: | ---: |")?;
    for run in &summary.runs {
        writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} | {} |",
            run.seed,
            run.iteration,
            run.outcome_key(),
            run.days_survived,
            run.turns,
            run.stats.wasteland_trips,
            run.stats.rests
        )?;
    }
    Ok(())
}
