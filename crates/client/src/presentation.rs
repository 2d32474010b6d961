//! Plain-text rendering of the runtime event stream.

use std::collections::HashMap;

use combat_core::{ActionOutcome, AttackOutcome, CombatState, DamageReport, EntityId};
use combat_runtime::{ActionEvent, CombatEvent, Event, TurnEvent};
use tokio::sync::broadcast::{Receiver, error::RecvError};

/// Prints events with combatant names resolved from the opening state.
pub struct EventPrinter {
    names: HashMap<EntityId, String>,
}

impl EventPrinter {
    pub fn new(state: &CombatState) -> Self {
        let names = state
            .combatants()
            .map(|c| (c.id, format!("{} {}", c.name, c.id)))
            .collect();
        Self { names }
    }

    /// Prints until every sender is gone.
    pub async fn run(self, mut events: Receiver<Event>) {
        loop {
            match events.recv().await {
                Ok(event) => println!("{}", self.render(&event)),
                Err(RecvError::Lagged(missed)) => println!("  ... {missed} event(s) dropped"),
                Err(RecvError::Closed) => break,
            }
        }
    }

    fn name(&self, id: EntityId) -> &str {
        self.names.get(&id).map_or("someone", String::as_str)
    }

    fn render(&self, event: &Event) -> String {
        match event {
            Event::Combat(CombatEvent::Started {
                encounter,
                combatants,
            }) => format!("== {encounter}: {combatants} combatants =="),
            Event::Combat(CombatEvent::Ended { phase, rounds }) => {
                format!("== {phase} after {rounds} round(s) ==")
            }
            Event::Turn(TurnEvent::RoundAdvanced { round }) => format!("-- round {round} --"),
            Event::Turn(TurnEvent::Started { entity, .. }) => format!("{}:", self.name(*entity)),
            Event::Turn(TurnEvent::Skipped { entity, .. }) => {
                format!("{} cannot act", self.name(*entity))
            }
            Event::Action(ActionEvent::Resolved { outcome, .. }) => self.outcome(outcome),
            Event::Action(ActionEvent::Rejected { action, error, .. }) => {
                format!("  rejected {action}: {error}")
            }
        }
    }

    fn outcome(&self, outcome: &ActionOutcome) -> String {
        match outcome {
            ActionOutcome::Attack(attack) => format!("  {}", self.attack(attack)),
            ActionOutcome::Movement(movement) => {
                let mut line = format!(
                    "  moves {} -> {} ({} squares)",
                    movement.from, movement.to, movement.cost
                );
                for attack in &movement.opportunity_attacks {
                    line.push_str(&format!("\n    opportunity: {}", self.attack(attack)));
                }
                if !movement.completed {
                    line.push_str("\n    falls before getting away");
                }
                line
            }
            ActionOutcome::Spell(spell) => {
                let mut line = format!("  casts {}", spell.spell);
                if let Some(slot) = spell.slot {
                    line.push_str(&format!(" (level {slot} slot)"));
                }
                for target in &spell.targets {
                    line.push_str(&format!("\n    {}", self.name(target.target)));
                    if let Some(damage) = &target.damage {
                        line.push_str(&format!(": {}", self.damage(damage)));
                    } else if target.healed > 0 {
                        line.push_str(&format!(": healed {}", target.healed));
                    } else if let Some(condition) = target.condition {
                        line.push_str(&format!(": {condition:?}"));
                    } else {
                        line.push_str(": unharmed");
                    }
                }
                line
            }
            ActionOutcome::Standard(standard) => {
                let mut line = format!("  {}", standard.action);
                if let Some(target) = standard.target {
                    line.push_str(&format!(" {}", self.name(target)));
                }
                if let Some(attack) = &standard.attack {
                    line.push_str(&format!(": {}", self.attack(attack)));
                } else if standard.healed > 0 {
                    line.push_str(&format!(": healed {}", standard.healed));
                } else if !standard.success {
                    line.push_str(" (failed)");
                }
                line
            }
        }
    }

    fn attack(&self, attack: &AttackOutcome) -> String {
        let roll = &attack.roll;
        let verdict = match &attack.damage {
            Some(damage) => self.damage(damage),
            None => "miss".to_string(),
        };
        format!(
            "{} -> {} [{} vs AC {}] {}",
            attack.source,
            self.name(attack.target),
            roll.total,
            roll.armor_class,
            verdict
        )
    }

    fn damage(&self, damage: &DamageReport) -> String {
        let mut text = format!("{} damage, {} hp left", damage.amount, damage.remaining_hp);
        if damage.killed {
            text.push_str(&format!(", {} falls", self.name(damage.target)));
        }
        if damage.concentration_lost {
            text.push_str(", concentration broken");
        }
        text
    }
}
