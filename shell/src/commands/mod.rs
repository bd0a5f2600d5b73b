//! Stdin command surface.

pub mod grid;
pub mod status;

use anyhow::{bail, Context, Result};
use viewport::{Applied, ControlEvent, GridDimensions, Outcome};

use crate::state::AppState;

pub const HELP: &str = "commands: height N | width N | pop N | lifespan N | genes N | \
generations N | mute P | mate P | start | stop | wait | show | status | failures | help | quit";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Control(ControlEvent),
    Show,
    Status,
    Failures,
    Wait,
    Help,
    Quit,
}

/// Parse one input line. Blank lines parse to `None`.
pub fn parse(line: &str) -> Result<Option<Command>> {
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else {
        return Ok(None);
    };
    let argument = words.next();
    if let Some(extra) = words.next() {
        bail!("unexpected argument `{extra}`");
    }

    let command = match name.to_ascii_lowercase().as_str() {
        "height" => Command::Control(ControlEvent::GridHeight(number(name, argument)?)),
        "width" => Command::Control(ControlEvent::GridWidth(number(name, argument)?)),
        "pop" => Command::Control(ControlEvent::PopulationSize(number(name, argument)?)),
        "lifespan" => Command::Control(ControlEvent::Lifespan(number(name, argument)?)),
        "genes" => Command::Control(ControlEvent::NumGenes(number(name, argument)?)),
        "generations" => Command::Control(ControlEvent::NumGenerations(number(name, argument)?)),
        "mute" => Command::Control(ControlEvent::MuteProbability(probability(name, argument)?)),
        "mate" => Command::Control(ControlEvent::MateProbability(probability(name, argument)?)),
        "start" => Command::Control(ControlEvent::Start),
        "stop" => Command::Control(ControlEvent::Stop),
        "wait" => Command::Wait,
        "show" => Command::Show,
        "status" => Command::Status,
        "failures" => Command::Failures,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => bail!("unknown command `{other}`; try `help`"),
    };
    Ok(Some(command))
}

fn number(name: &str, argument: Option<&str>) -> Result<u32> {
    let raw = argument.with_context(|| format!("`{name}` needs a value"))?;
    raw.parse()
        .with_context(|| format!("`{name}` expects a non-negative integer, got `{raw}`"))
}

fn probability(name: &str, argument: Option<&str>) -> Result<f64> {
    let raw = argument.with_context(|| format!("`{name}` needs a value"))?;
    let value: f64 = raw
        .parse()
        .with_context(|| format!("`{name}` expects a number, got `{raw}`"))?;
    if !(0.0..=1.0).contains(&value) {
        bail!("`{name}` must be between 0 and 1");
    }
    Ok(value)
}

pub async fn run(app: &mut AppState, command: Command) {
    match command {
        Command::Control(event) => {
            let outcome = app.controller.handle(event).await;
            if let Outcome::EvolutionStopped(Some(report)) = &outcome {
                app.last_report = Some(report.clone());
            }
            print_outcome(&outcome);
        }
        Command::Wait => match app.controller.wait_for_evolution().await {
            Some(report) => {
                println!(
                    "evolution finished: {} dispatched, {} painted, {} stale, {} failed",
                    report.dispatched, report.painted, report.stale, report.failed
                );
                app.last_report = Some(report);
            }
            None => println!("no evolution run in progress"),
        },
        Command::Show => {
            let shared = app.controller.viewport();
            let frame = grid::render(&viewport::lock_viewport(&shared), app.plain);
            print!("{frame}");
        }
        Command::Status => println!("{}", status::describe(&app.status(), app.last_report.as_ref())),
        Command::Failures => print!("{}", status::describe_failures(&app.failures.records())),
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
}

pub fn print_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Rebuilt(dimensions) => println!("grid rebuilt: {dimensions}"),
        Outcome::Applied(Applied::Painted(report)) => {
            println!(
                "painted {} individuals ({} outside the grid)",
                report.painted,
                report.skipped.len()
            )
        }
        Outcome::Applied(Applied::Stale { ticket, latest }) => {
            println!("response #{} ignored, #{} already shown", ticket.0, latest.0)
        }
        Outcome::Acknowledged(ack) => println!("service: {ack}"),
        Outcome::EvolutionStarted => println!("evolution started"),
        Outcome::EvolutionStopped(Some(report)) => {
            println!("evolution stopped after {} steps", report.dispatched)
        }
        Outcome::EvolutionStopped(None) => println!("no evolution run in progress"),
        Outcome::Rejected(dimensions) => {
            println!("grid {dimensions} is too large (max {} cells)", GridDimensions::MAX_CELLS)
        }
        Outcome::Failed(err) => println!("request failed: {err}"),
    }
}
