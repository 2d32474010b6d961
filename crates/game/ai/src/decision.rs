//! AI decision maker.
//!
//! Builds a [`CombatContext`] for the combatant whose turn it is, asks the
//! prioritizer for the best legal request, and hands it to the resolver.

use combat_core::{
    ActionOutcome, ActionResolver, CombatEnv, CombatState, DiceRoller, EntityId, Faction,
    Resolution,
};

use crate::behavior::{BehaviorCatalog, select_intent};
use crate::context::CombatContext;
use crate::error::{AiError, Result};
use crate::prioritizer::{PrioritizedAction, PriorityCriteria, prioritize};

/// Upper bound on requests chained within one turn.
pub const MAX_STEPS_PER_TURN: usize = 6;

/// Everything an AI-controlled combatant did during one turn.
#[derive(Clone, Debug, PartialEq)]
pub struct TurnReport {
    pub state: CombatState,
    pub decisions: Vec<PrioritizedAction>,
    pub outcomes: Vec<ActionOutcome>,
}

/// Stateless decision maker over a behavior catalog.
#[derive(Clone, Debug, Default)]
pub struct DecisionMaker {
    behaviors: BehaviorCatalog,
    criteria: PriorityCriteria,
}

impl DecisionMaker {
    pub fn new(behaviors: BehaviorCatalog, criteria: PriorityCriteria) -> Self {
        Self {
            behaviors,
            criteria,
        }
    }

    pub fn criteria(&self) -> &PriorityCriteria {
        &self.criteria
    }

    pub fn behaviors(&self) -> &BehaviorCatalog {
        &self.behaviors
    }

    /// Best legal request for `entity`, or `None` when nothing is worth doing.
    pub fn decide(
        &self,
        state: &CombatState,
        env: CombatEnv<'_>,
        entity: EntityId,
    ) -> Result<Option<PrioritizedAction>> {
        self.decide_step(state, env, entity, true)
    }

    /// Like [`DecisionMaker::decide`], optionally leaving movement out of the
    /// candidate set. Callers chaining requests use this to avoid two moves in
    /// a row.
    pub fn decide_step(
        &self,
        state: &CombatState,
        env: CombatEnv<'_>,
        entity: EntityId,
        include_movement: bool,
    ) -> Result<Option<PrioritizedAction>> {
        let ctx = self.context(state, env, entity)?;
        let pattern = self.behaviors.resolve(ctx.actor);

        let (intent, score) = select_intent(&ctx, &pattern);
        tracing::debug!(
            %entity,
            archetype = %pattern.archetype,
            %intent,
            %score,
            "leading intent"
        );

        let best = prioritize(&ctx, &pattern, &self.criteria, include_movement)
            .into_iter()
            .next()
            .filter(|choice| choice.priority > 0.0);
        match &best {
            Some(choice) => tracing::debug!(
                %entity,
                action = %choice.action,
                intent = %choice.intent,
                priority = choice.priority,
                confidence = choice.confidence(),
                "decision"
            ),
            None => tracing::debug!(%entity, "no decision available"),
        }
        Ok(best)
    }

    /// Decides and resolves one request. `None` leaves the state untouched.
    pub fn act(
        &self,
        state: &CombatState,
        env: CombatEnv<'_>,
        dice: &mut dyn DiceRoller,
        entity: EntityId,
    ) -> Result<Option<(PrioritizedAction, Resolution)>> {
        let Some(choice) = self.decide(state, env, entity)? else {
            return Ok(None);
        };
        let resolution = ActionResolver::new(env).resolve(state, dice, &choice.action)?;
        Ok(Some((choice, resolution)))
    }

    /// Plays `entity`'s whole turn without ending it.
    ///
    /// Requests are chained until nothing positive remains, the combatant
    /// drops, combat ends, or [`MAX_STEPS_PER_TURN`] is reached. At most one
    /// move is taken between two other requests.
    pub fn take_turn(
        &self,
        state: &CombatState,
        env: CombatEnv<'_>,
        dice: &mut dyn DiceRoller,
        entity: EntityId,
    ) -> Result<TurnReport> {
        let resolver = ActionResolver::new(env);
        let mut report = TurnReport {
            state: state.clone(),
            decisions: Vec::new(),
            outcomes: Vec::new(),
        };
        let mut moved = false;

        for _ in 0..MAX_STEPS_PER_TURN {
            if report.state.phase().is_terminal() || !report.state.get(entity)?.is_standing() {
                break;
            }
            let Some(choice) = self.decide_step(&report.state, env, entity, !moved)? else {
                break;
            };
            let resolution = resolver.resolve(&report.state, dice, &choice.action)?;
            moved = choice.action.is_movement();
            tracing::info!(%entity, action = %choice.action, "ai acted");

            report.state = resolution.state.check_combat_end();
            report.outcomes.push(resolution.outcome);
            report.decisions.push(choice);
        }
        Ok(report)
    }

    fn context<'s>(
        &self,
        state: &'s CombatState,
        env: CombatEnv<'s>,
        entity: EntityId,
    ) -> Result<CombatContext<'s>> {
        let actor = state.get(entity)?;
        if actor.faction == Faction::Player {
            return Err(AiError::NotAiControlled {
                entity,
                faction: actor.faction,
            });
        }
        let current = state.current_entity();
        if current != Some(entity) {
            return Err(AiError::NotCurrentTurn {
                expected: current,
                provided: entity,
            });
        }
        CombatContext::new(state, env, entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use combat_core::{Catalog, EncounterBuilder, EntitySpec, Faction, Position, ScriptedDice};

    fn standoff(catalog: &Catalog, gap: i32) -> CombatState {
        EncounterBuilder::new("decision")
            .entity(EntitySpec::new("orc", Position::new(0, 0)).initiative(15))
            .entity(EntitySpec::new("fighter", Position::new(gap, 0)).initiative(5))
            .start(catalog.env(), &mut ScriptedDice::new([]))
            .unwrap()
    }

    #[test]
    fn rejects_player_and_out_of_turn_requests() {
        let catalog = Catalog::standard();
        let ai = DecisionMaker::default();

        let state = standoff(&catalog, 1);
        assert_eq!(
            ai.decide(&state, catalog.env(), EntityId(2)),
            Err(AiError::NotCurrentTurn {
                expected: Some(EntityId(1)),
                provided: EntityId(2),
            })
        );

        let player = EncounterBuilder::new("decision")
            .entity(
                EntitySpec::new("fighter", Position::new(0, 0))
                    .faction(Faction::Player)
                    .initiative(15),
            )
            .entity(EntitySpec::new("orc", Position::new(1, 0)).initiative(5))
            .start(catalog.env(), &mut ScriptedDice::new([]))
            .unwrap();
        assert!(matches!(
            ai.decide(&player, catalog.env(), EntityId(1)),
            Err(AiError::NotAiControlled { .. })
        ));
    }

    #[test]
    fn decide_does_not_touch_state() {
        let catalog = Catalog::standard();
        let ai = DecisionMaker::default();
        let state = standoff(&catalog, 1);
        let before = state.clone();
        let choice = ai.decide(&state, catalog.env(), EntityId(1)).unwrap();
        assert!(choice.is_some());
        assert_eq!(state, before);
    }

    #[test]
    fn turn_closes_distance_then_attacks() {
        let catalog = Catalog::standard();
        let ai = DecisionMaker::default();
        let state = standoff(&catalog, 5);
        let mut dice = ScriptedDice::new([]).with_fallback(15);

        let report = ai.take_turn(&state, catalog.env(), &mut dice, EntityId(1)).unwrap();
        assert!(matches!(report.outcomes.first(), Some(ActionOutcome::Movement(m)) if m.completed));
        assert!(
            report
                .outcomes
                .iter()
                .any(|o| matches!(o, ActionOutcome::Attack(_)))
        );
        let orc = report.state.combatant(EntityId(1)).unwrap();
        assert!(!orc.budget.action);
        assert!(report.outcomes.len() <= MAX_STEPS_PER_TURN);
    }
}
