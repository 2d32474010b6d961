//! Skirmish demo binary.
//!
//! Runs one encounter end to end with every combatant driven by the tactical
//! AI and prints the event stream as it happens.
//!
//! ```bash
//! # Built-in encounter, random seed
//! cargo run -p skirmish
//!
//! # Replay a scenario file with a fixed seed
//! COMBAT_SEED=7 SKIRMISH_SCENARIO=crates/client/scenarios/ambush.ron cargo run -p skirmish
//! ```
mod presentation;

use anyhow::{Context, Result};
use combat_core::{EncounterBuilder, EntitySpec, Position};
use combat_runtime::{AiProvider, ProviderKind, Runtime, RuntimeConfig, Scenario};

use presentation::EventPrinter;

const SCENARIO_VAR: &str = "SKIRMISH_SCENARIO";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = RuntimeConfig::from_env();
    let scenario = match std::env::var(SCENARIO_VAR) {
        Ok(path) => Scenario::load(&path).with_context(|| format!("loading scenario {path}"))?,
        Err(_) => default_scenario(),
    };
    tracing::info!(scenario = %scenario.name, "starting skirmish");

    let mut runtime = Runtime::builder()
        .config(config)
        .scenario(scenario)
        .provider(ProviderKind::Npc, AiProvider::default())
        .build()
        .context("building runtime")?;

    let printer = EventPrinter::new(runtime.state());
    let printing = tokio::spawn(printer.run(runtime.subscribe_all()));

    println!("seed {}", runtime.seed());
    let summary = runtime.run().await.context("running encounter")?;
    drop(runtime);
    printing.await.context("event printer stopped")?;

    println!(
        "{} after {} round(s): {} turns, {} actions, {} rejected",
        summary.phase, summary.rounds, summary.turns, summary.actions, summary.rejected
    );
    Ok(())
}

fn default_scenario() -> Scenario {
    let encounter = EncounterBuilder::new("crossroads")
        .size(12, 8)
        .entity(EntitySpec::new("fighter", Position::new(2, 3)))
        .entity(EntitySpec::new("rogue", Position::new(1, 5)))
        .entity(EntitySpec::new("cleric", Position::new(0, 4)))
        .entity(EntitySpec::new("goblin", Position::new(9, 2)))
        .entity(EntitySpec::new("goblin", Position::new(10, 6)))
        .entity(EntitySpec::new("wolf", Position::new(8, 4)));
    Scenario::new("crossroads", encounter)
}
