//! High-level runtime orchestrator.
//!
//! The runtime owns the encounter, the dice stream and the provider registry.
//! Each turn it asks the acting combatant's provider for requests, resolves
//! them, and publishes what happened on the [`EventBus`].

use std::str::FromStr;
use std::time::Duration;

use combat_core::{
    ActionOutcome, ActionResolver, Catalog, CombatState, EncounterBuilder, EntityId, PcgDice,
    Phase,
};
use tokio::sync::broadcast;

use crate::api::{
    ActionProvider, ProviderKind, ProviderRegistry, Result, RuntimeError, TurnCommand, TurnRequest,
};
use crate::events::{ActionEvent, CombatEvent, Event, EventBus, Topic, TurnEvent};
use crate::scenario::Scenario;

/// Runtime configuration shared by the orchestrator and its providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Dice seed; a random one is drawn when unset.
    pub seed: Option<u64>,
    /// Pause before each NPC turn so a viewer can follow along.
    pub ai_turn_delay: Duration,
    /// The encounter stops after this many rounds even without a winner.
    pub max_rounds: u32,
    /// Upper bound on requests taken from a provider within one turn.
    pub max_actions_per_turn: usize,
    /// Per-topic event buffer.
    pub event_capacity: usize,
}

impl RuntimeConfig {
    pub const DEFAULT_MAX_ROUNDS: u32 = 50;
    pub const DEFAULT_MAX_ACTIONS_PER_TURN: usize = 8;

    /// Defaults overridden by `COMBAT_SEED`, `AI_TURN_DELAY_MS`,
    /// `MAX_ROUNDS`, `MAX_ACTIONS_PER_TURN` and `EVENT_CAPACITY`.
    ///
    /// Unset or unparsable variables keep their default.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(seed) = read_env::<u64>("COMBAT_SEED") {
            config.seed = Some(seed);
        }
        if let Some(millis) = read_env::<u64>("AI_TURN_DELAY_MS") {
            config.ai_turn_delay = Duration::from_millis(millis);
        }
        if let Some(rounds) = read_env("MAX_ROUNDS") {
            config.max_rounds = rounds;
        }
        if let Some(actions) = read_env("MAX_ACTIONS_PER_TURN") {
            config.max_actions_per_turn = actions;
        }
        if let Some(capacity) = read_env("EVENT_CAPACITY") {
            config.event_capacity = capacity;
        }

        config
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_ai_turn_delay(mut self, delay: Duration) -> Self {
        self.ai_turn_delay = delay;
        self
    }

    pub fn with_max_rounds(mut self, rounds: u32) -> Self {
        self.max_rounds = rounds;
        self
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            seed: None,
            ai_turn_delay: Duration::ZERO,
            max_rounds: Self::DEFAULT_MAX_ROUNDS,
            max_actions_per_turn: Self::DEFAULT_MAX_ACTIONS_PER_TURN,
            event_capacity: EventBus::DEFAULT_CAPACITY,
        }
    }
}

fn read_env<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.trim().parse().ok()
}

/// What happened during one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnSummary {
    pub entity: EntityId,
    pub round: u32,
    /// `None` when the combatant was skipped.
    pub provider: Option<ProviderKind>,
    pub outcomes: Vec<ActionOutcome>,
    pub rejected: usize,
}

impl TurnSummary {
    pub fn skipped(&self) -> bool {
        self.provider.is_none()
    }
}

/// Final tally of [`Runtime::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombatSummary {
    /// `Active` when the round limit stopped the encounter.
    pub phase: Phase,
    pub rounds: u32,
    pub turns: usize,
    pub actions: usize,
    pub rejected: usize,
    pub seed: u64,
}

/// Main runtime that drives an encounter to its end.
pub struct Runtime {
    state: CombatState,
    catalog: Catalog,
    registry: ProviderRegistry,
    bus: EventBus,
    dice: PcgDice,
    seed: u64,
    config: RuntimeConfig,
}

impl Runtime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    pub fn state(&self) -> &CombatState {
        &self.state
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Seed of the dice stream; replaying with it reproduces the encounter.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// A handle to the bus; clones share the same channels.
    pub fn events(&self) -> EventBus {
        self.bus.clone()
    }

    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.bus.subscribe(topic)
    }

    /// Every event in publication order.
    pub fn subscribe_all(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe_all()
    }

    pub fn registry_mut(&mut self) -> &mut ProviderRegistry {
        &mut self.registry
    }

    /// Plays the current combatant's turn and advances the turn pointer.
    ///
    /// Dead or inactive combatants are passed over without consulting a
    /// provider.
    pub async fn play_turn(&mut self) -> Result<TurnSummary> {
        let entity = self
            .state
            .current_entity()
            .ok_or(RuntimeError::NoActiveEntities)?;
        let round = self.state.round();
        let mut summary = TurnSummary {
            entity,
            round,
            provider: None,
            outcomes: Vec::new(),
            rejected: 0,
        };

        let combatant = self.state.get(entity)?;
        if combatant.is_standing() {
            let (kind, provider) = self.registry.provider_for(combatant)?;
            tracing::info!(%entity, name = %combatant.name, round, provider = %kind, "turn started");
            self.bus.publish(TurnEvent::Started { entity, round });

            if kind == ProviderKind::Npc && !self.config.ai_turn_delay.is_zero() {
                tokio::time::sleep(self.config.ai_turn_delay).await;
            }
            summary.provider = Some(kind);
            self.drive_turn(provider.as_ref(), &mut summary).await?;
        } else {
            tracing::debug!(%entity, round, "skipping combatant that cannot act");
            self.bus.publish(TurnEvent::Skipped { entity, round });
        }

        self.finish_turn()?;
        Ok(summary)
    }

    async fn drive_turn(
        &mut self,
        provider: &dyn ActionProvider,
        summary: &mut TurnSummary,
    ) -> Result<()> {
        let entity = summary.entity;
        let env = self.catalog.env();
        let resolver = ActionResolver::new(env);

        for _ in 0..self.config.max_actions_per_turn {
            let request = TurnRequest {
                entity,
                state: &self.state,
                env,
                taken: &summary.outcomes,
            };
            let action = match provider.provide_action(request).await? {
                TurnCommand::EndTurn => break,
                TurnCommand::Act(action) => action,
            };
            if action.actor() != entity {
                return Err(RuntimeError::InvalidActionActor {
                    expected: entity,
                    provided: action.actor(),
                });
            }

            let round = self.state.round();
            match resolver.resolve(&self.state, &mut self.dice, &action) {
                Ok(resolution) => {
                    tracing::info!(%entity, %action, "action resolved");
                    self.state = resolution.state.check_combat_end();
                    self.bus.publish(ActionEvent::Resolved {
                        action,
                        outcome: Box::new(resolution.outcome.clone()),
                        round,
                    });
                    summary.outcomes.push(resolution.outcome);
                }
                Err(error) => {
                    tracing::warn!(%entity, %action, %error, "action rejected");
                    self.bus.publish(ActionEvent::Rejected {
                        kind: error.kind(),
                        error: error.to_string(),
                        action,
                        round,
                    });
                    summary.rejected += 1;
                }
            }

            if self.state.phase().is_terminal() || !self.state.get(entity)?.is_standing() {
                break;
            }
        }
        Ok(())
    }

    fn finish_turn(&mut self) -> Result<()> {
        if self.state.phase() != Phase::Active {
            return Ok(());
        }
        let round = self.state.round();
        self.state = self.state.advance_turn()?;
        if self.state.round() != round {
            tracing::info!(round = self.state.round(), "round advanced");
            self.bus.publish(TurnEvent::RoundAdvanced {
                round: self.state.round(),
            });
        }
        Ok(())
    }

    /// Drives turns until one side wins or `max_rounds` have been played.
    pub async fn run(&mut self) -> Result<CombatSummary> {
        self.bus.publish(CombatEvent::Started {
            encounter: self.state.id().to_string(),
            combatants: self.state.combatants().count(),
        });

        let mut summary = CombatSummary {
            phase: self.state.phase(),
            rounds: self.state.round(),
            turns: 0,
            actions: 0,
            rejected: 0,
            seed: self.seed,
        };

        while self.state.phase() == Phase::Active && self.state.round() <= self.config.max_rounds {
            let turn = self.play_turn().await?;
            if !turn.skipped() {
                summary.turns += 1;
            }
            summary.actions += turn.outcomes.len();
            summary.rejected += turn.rejected;
        }

        summary.phase = self.state.phase();
        summary.rounds = self.state.round().min(self.config.max_rounds);
        if summary.phase == Phase::Active {
            tracing::warn!(rounds = summary.rounds, "round limit reached without a winner");
        } else {
            tracing::info!(phase = %summary.phase, rounds = summary.rounds, "combat ended");
        }
        self.bus.publish(CombatEvent::Ended {
            phase: summary.phase,
            rounds: summary.rounds,
        });
        Ok(summary)
    }
}

enum Encounter {
    State(CombatState),
    Builder(EncounterBuilder),
}

/// Builder for [`Runtime`].
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    catalog: Option<Catalog>,
    encounter: Option<Encounter>,
    scenario_seed: Option<u64>,
    registry: ProviderRegistry,
}

impl RuntimeBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            catalog: None,
            encounter: None,
            scenario_seed: None,
            registry: ProviderRegistry::new(),
        }
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Defaults to [`Catalog::standard`].
    pub fn catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Starts from an existing state; a setup-phase state is started on build.
    pub fn initial_state(mut self, state: CombatState) -> Self {
        self.encounter = Some(Encounter::State(state));
        self
    }

    /// Spawns the encounter on build, rolling initiative with the runtime dice.
    pub fn encounter(mut self, encounter: EncounterBuilder) -> Self {
        self.encounter = Some(Encounter::Builder(encounter));
        self
    }

    /// Like [`RuntimeBuilder::encounter`]; the scenario seed applies when
    /// the configuration does not fix one.
    pub fn scenario(mut self, scenario: Scenario) -> Self {
        self.scenario_seed = scenario.seed;
        self.encounter(scenario.encounter)
    }

    pub fn provider(mut self, kind: ProviderKind, provider: impl ActionProvider + 'static) -> Self {
        self.registry.register(kind, provider);
        self
    }

    pub fn bind_entity(mut self, entity: EntityId, kind: ProviderKind) -> Self {
        self.registry.bind_entity(entity, kind);
        self
    }

    pub fn registry(mut self, registry: ProviderRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn build(self) -> Result<Runtime> {
        let catalog = self.catalog.unwrap_or_else(Catalog::standard);
        let seed = self
            .config
            .seed
            .or(self.scenario_seed)
            .unwrap_or_else(rand::random);
        let mut dice = PcgDice::new(seed);

        let state = match self.encounter.ok_or(RuntimeError::MissingEncounter)? {
            Encounter::Builder(builder) => {
                let scenario = Scenario::new(builder.id.to_string(), builder);
                scenario.create_initial_state(catalog.env(), &mut dice)?
            }
            Encounter::State(state) if state.phase() == Phase::Setup => state.start_combat()?,
            Encounter::State(state) => state,
        };
        if state.phase() != Phase::Active {
            return Err(RuntimeError::NotActive(state.phase()));
        }
        state.validate()?;

        tracing::info!(
            encounter = %state.id(),
            seed,
            combatants = state.combatants().count(),
            "runtime ready"
        );

        Ok(Runtime {
            state,
            bus: EventBus::with_capacity(self.config.event_capacity),
            catalog,
            registry: self.registry,
            dice,
            seed,
            config: self.config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_are_bounded() {
        let config = RuntimeConfig::default();
        assert_eq!(config.seed, None);
        assert!(config.ai_turn_delay.is_zero());
        assert_eq!(config.max_rounds, RuntimeConfig::DEFAULT_MAX_ROUNDS);
        assert!(config.max_actions_per_turn > 0);
    }

    #[test]
    fn builder_requires_an_encounter() {
        assert!(matches!(
            Runtime::builder().build(),
            Err(RuntimeError::MissingEncounter)
        ));
    }
}
