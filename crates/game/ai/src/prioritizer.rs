//! Action prioritizer.
//!
//! Enumerates every request the actor could legally make right now, predicts
//! what each would achieve with the same formulas the resolver rolls, and
//! folds intent score and prediction into one priority under caller-supplied
//! [`PriorityCriteria`].
//!
//! Legality is decided by the resolver itself: each candidate is dry-run
//! against the current state with fixed dice and dropped if it is rejected.
//! The dry-run result is discarded apart from which combatants it touched.

use combat_core::rules::attack::{
    AttackMode, best_physical_ability, expected_hit_damage, hit_probability, weapon_attack_bonus,
    weapon_damage,
};
use combat_core::rules::spell::{
    damage_formula, expected_damage_fraction, healing_formula, save_bonus,
    save_failure_probability, spell_attack_bonus,
};
use combat_core::{
    Ability, ActionCategory, ActionDefinition, ActionOutcome, ActionResolver, Advantage,
    CombatAction, CombatConfig, Combatant, Conditions, Cover, EntityId, Position, ScriptedDice,
    SpellDefinition, SpellResolution, Target, distance,
};

use crate::behavior::{BehaviorPattern, Intent, score_intent};
use crate::context::CombatContext;
use crate::scoring::{Score, percent};
use crate::threat::{positional_hit_chance, threat_at};

/// Face the dry-run dice return for every roll.
const DRY_RUN_FACE: u32 = 10;

/// Expected damage or healing that saturates the 0-100 outcome scale.
const POINTS_PER_OUTCOME: f32 = 8.0;

/// How much each kind of gain or cost counts toward priority.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PriorityCriteria {
    pub maximize_damage: f32,
    pub minimize_risk: f32,
    pub conserve_resources: f32,
    pub tactical_advantage: f32,
    pub support_allies: f32,
    pub control_battlefield: f32,
}

impl Default for PriorityCriteria {
    fn default() -> Self {
        Self {
            maximize_damage: 1.0,
            minimize_risk: 0.5,
            conserve_resources: 0.3,
            tactical_advantage: 0.6,
            support_allies: 0.8,
            control_battlefield: 0.5,
        }
    }
}

/// Expected result of one candidate, before any die is rolled.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Prediction {
    /// Net expected damage; friendly fire counts against it.
    pub expected_damage: f32,
    pub expected_healing: f32,
    /// 0-100.
    pub tactical: u32,
    /// Conditions expected to land on hostiles, 0-100.
    pub control: u32,
    /// 0-100.
    pub risk: u32,
    /// 0-100.
    pub resource_cost: u32,
    /// Probability the action does what it is meant to, 0-1.
    pub confidence: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PrioritizedAction {
    pub action: CombatAction,
    pub intent: Intent,
    pub intent_score: Score,
    pub prediction: Prediction,
    pub priority: f32,
}

impl PrioritizedAction {
    pub fn confidence(&self) -> f32 {
        self.prediction.confidence
    }
}

impl PriorityCriteria {
    /// Combines an intent score and a prediction into one priority.
    pub fn priority(&self, intent: &Score, prediction: &Prediction) -> f32 {
        let damage = (prediction.expected_damage * POINTS_PER_OUTCOME).clamp(-100.0, 100.0);
        let healing = (prediction.expected_healing * POINTS_PER_OUTCOME).min(100.0);
        intent.value() as f32 * 0.5
            + self.maximize_damage * damage
            + self.support_allies * healing
            + self.tactical_advantage * prediction.tactical as f32
            + self.control_battlefield * prediction.control as f32
            - self.minimize_risk * prediction.risk as f32
            - self.conserve_resources * prediction.resource_cost as f32
    }
}

/// Ranked legal candidates for the context's actor, best first.
///
/// Ties on priority go to the higher confidence, then to enumeration order.
/// With `include_movement` false no movement candidates are produced.
pub fn prioritize(
    ctx: &CombatContext<'_>,
    pattern: &BehaviorPattern,
    criteria: &PriorityCriteria,
    include_movement: bool,
) -> Vec<PrioritizedAction> {
    let resolver = ActionResolver::new(ctx.env);
    let mut ranked = Vec::new();

    for (action, intent) in candidates(ctx, include_movement) {
        let intent_score = score_intent(intent, ctx, pattern);
        if !intent_score.is_possible {
            continue;
        }
        let mut dice = ScriptedDice::new([]).with_fallback(DRY_RUN_FACE);
        let outcome = match resolver.resolve(ctx.state, &mut dice, &action) {
            Ok(resolution) => resolution.outcome,
            Err(err) => {
                tracing::trace!(%action, %err, "candidate rejected");
                continue;
            }
        };
        let prediction = predict(ctx, &action, &outcome);
        let priority = criteria.priority(&intent_score, &prediction);
        tracing::debug!(
            %action,
            %intent,
            intent_score = intent_score.value(),
            damage = prediction.expected_damage,
            healing = prediction.expected_healing,
            priority,
            "candidate scored"
        );
        ranked.push(PrioritizedAction {
            action,
            intent,
            intent_score,
            prediction,
            priority,
        });
    }

    ranked.sort_by(|a, b| {
        b.priority
            .total_cmp(&a.priority)
            .then(b.confidence().total_cmp(&a.confidence()))
    });
    ranked
}

// ============================================================================
// Candidate enumeration
// ============================================================================

fn candidates(ctx: &CombatContext<'_>, include_movement: bool) -> Vec<(CombatAction, Intent)> {
    let me = ctx.entity();
    let mut out = Vec::new();

    for weapon in ctx.weapons() {
        for enemy in ctx.enemies() {
            let dist = distance(ctx.position(), enemy.position);
            if dist > weapon.max_range() {
                continue;
            }
            let intent = if weapon.is_ranged_at(dist) {
                Intent::AttackRanged
            } else {
                Intent::AttackMelee
            };
            out.push((
                CombatAction::WeaponAttack {
                    attacker: me,
                    weapon: weapon.id.clone(),
                    target: enemy.id,
                },
                intent,
            ));
        }
    }

    for (spell, slot) in ctx.castable_spells() {
        let intent = if spell.is_healing() {
            Intent::CastHeal
        } else {
            Intent::CastDamage
        };
        for target in spell_targets(ctx, spell) {
            out.push((
                CombatAction::CastSpell {
                    caster: me,
                    spell: spell.id.clone(),
                    level: slot,
                    target,
                },
                intent,
            ));
        }
    }

    let known = ctx.actor.actions.iter().filter_map(|id| ctx.env.action(id).ok());
    let universal = ctx.env.actions().universal_actions();
    for definition in known.chain(universal) {
        out.extend(action_candidates(ctx, definition));
    }

    if include_movement {
        out.extend(movement_candidates(ctx));
    }
    out
}

/// Aim options for a spell; the resolver discards the ones that miss range.
fn spell_targets(ctx: &CombatContext<'_>, spell: &SpellDefinition) -> Vec<Option<Target>> {
    let patients = || {
        std::iter::once(ctx.actor)
            .chain(ctx.allies())
            .filter(|c| c.hp < c.base.max_hp)
    };
    match spell.area {
        Some(shape) if !shape.emanates() && spell.range == 0 => vec![None],
        Some(_) if spell.is_healing() => patients().map(|c| Some(Target::Point(c.position))).collect(),
        Some(_) => ctx.enemies().map(|e| Some(Target::Point(e.position))).collect(),
        None if spell.is_healing() => patients().map(|c| Some(Target::Entity(c.id))).collect(),
        None if spell.targets_creature() => ctx
            .enemies()
            .filter(|e| distance(ctx.position(), e.position) <= spell.range)
            .map(|e| Some(Target::Entity(e.id)))
            .collect(),
        None => vec![None],
    }
}

fn action_candidates(ctx: &CombatContext<'_>, definition: &ActionDefinition) -> Vec<(CombatAction, Intent)> {
    let me = ctx.entity();
    let perform = |target| CombatAction::Perform {
        actor: me,
        action: definition.id.clone(),
        target,
    };

    match definition.category {
        ActionCategory::Attack if definition.damage.is_some() => {
            let range = definition.range.max(CombatConfig::MELEE_REACH);
            ctx.enemies()
                .filter(|e| distance(ctx.position(), e.position) <= range)
                .map(|e| {
                    let intent = if distance(ctx.position(), e.position) > CombatConfig::MELEE_REACH {
                        Intent::AttackRanged
                    } else {
                        Intent::AttackMelee
                    };
                    (perform(Some(e.id)), intent)
                })
                .collect()
        }
        _ if definition.healing.is_some() => std::iter::once(ctx.actor)
            .chain(ctx.allies())
            .filter(|c| c.hp < c.base.max_hp)
            .map(|c| {
                let target = (c.id != me).then_some(c.id);
                (perform(target), Intent::CastHeal)
            })
            .collect(),
        ActionCategory::Dodge => vec![(perform(None), Intent::Dodge)],
        ActionCategory::Dash => vec![(perform(None), Intent::Dash)],
        ActionCategory::Disengage => vec![(perform(None), Intent::MoveAway)],
        ActionCategory::Hide => vec![(perform(None), Intent::Hide)],
        ActionCategory::Help => ctx
            .allies()
            .filter(|a| distance(ctx.position(), a.position) <= definition.range.max(1))
            .map(|a| (perform(Some(a.id)), Intent::ProtectAlly))
            .collect(),
        _ => Vec::new(),
    }
}

/// One destination per movement intent: the closest approach, the safest
/// retreat and the best cover against the nearest hostile.
fn movement_candidates(ctx: &CombatContext<'_>) -> Vec<(CombatAction, Intent)> {
    let Some((nearest, current)) = ctx.nearest_enemy() else {
        return Vec::new();
    };
    let from = ctx.position();
    let grid = ctx.state.grid();
    let budget = ctx.actor.budget.movement;

    let reachable: Vec<Position> = grid
        .positions_in_radius(from, budget)
        .into_iter()
        .filter(|&p| p != from && grid.is_cell_free(p))
        .filter(|&p| grid.movement_cost(from, p).is_some_and(|cost| cost <= budget))
        .filter(|&p| ctx.state.check_path(ctx.actor.id, p).is_ok())
        .collect();
    let gap = |p: Position| ctx.enemies().map(|e| distance(p, e.position)).min().unwrap_or(u32::MAX);
    let danger = |p: Position| threat_at(ctx.state, ctx.env, ctx.actor, p);

    let closer = reachable
        .iter()
        .copied()
        .filter(|&p| distance(p, nearest.position) < current)
        .min_by_key(|&p| (distance(p, nearest.position), danger(p), grid.movement_cost(from, p), p.y, p.x));
    let away = reachable
        .iter()
        .copied()
        .filter(|&p| gap(p) > current)
        .min_by_key(|&p| (std::cmp::Reverse(gap(p)), danger(p), p.y, p.x));
    let cover = reachable
        .iter()
        .copied()
        .filter(|&p| grid.cover_between(nearest.position, p) > grid.cover_between(nearest.position, from))
        .min_by_key(|&p| (std::cmp::Reverse(grid.cover_between(nearest.position, p)), danger(p), p.y, p.x));

    let me = ctx.entity();
    [
        (closer, Intent::MoveCloser),
        (away, Intent::MoveAway),
        (cover, Intent::TakeCover),
    ]
    .into_iter()
    .filter_map(|(to, intent)| to.map(|to| (CombatAction::Move { entity: me, to }, intent)))
    .collect()
}

// ============================================================================
// Outcome prediction
// ============================================================================

fn predict(ctx: &CombatContext<'_>, action: &CombatAction, outcome: &ActionOutcome) -> Prediction {
    match (action, outcome) {
        (CombatAction::WeaponAttack { weapon, target, .. }, _) => {
            let (Ok(weapon), Some(victim)) = (ctx.env.weapon(weapon), ctx.state.combatant(*target))
            else {
                return Prediction::default();
            };
            let dist = distance(ctx.position(), victim.position);
            let chance = positional_hit_chance(
                ctx.state,
                ctx.env,
                ctx.actor,
                victim,
                weapon_attack_bonus(ctx.actor, weapon),
                AttackMode::weapon(weapon, dist),
            );
            let formula = weapon_damage(ctx.actor, weapon);
            let hit = expected_hit_damage(&formula, ctx.env.rules());
            strike_prediction(ctx, victim, chance, hit, weapon.is_ranged_at(dist), false)
        }
        (CombatAction::CastSpell { spell, level, .. }, ActionOutcome::Spell(cast)) => {
            let Ok(spell) = ctx.env.spell(spell) else {
                return Prediction::default();
            };
            let affected = cast.targets.iter().filter_map(|t| ctx.state.combatant(t.target));
            spell_prediction(ctx, spell, *level, cast.replaced_concentration.is_some(), affected)
        }
        (CombatAction::Perform { action, target, .. }, _) => {
            let Ok(definition) = ctx.env.action(action) else {
                return Prediction::default();
            };
            action_prediction(ctx, definition, *target)
        }
        (CombatAction::Move { to, .. }, ActionOutcome::Movement(moved)) => {
            movement_prediction(ctx, *to, moved.cost, moved.opportunity_attacks.len())
        }
        _ => Prediction::default(),
    }
}

fn strike_prediction(
    ctx: &CombatContext<'_>,
    victim: &Combatant,
    chance: f32,
    hit_damage: f32,
    ranged: bool,
    provokes: bool,
) -> Prediction {
    let expected = chance * hit_damage.min(victim.hp as f32);
    let lethal = if hit_damage >= victim.hp as f32 { 40.0 * chance } else { 0.0 };
    let advantage = ctx
        .actor
        .conditions()
        .intersects(Conditions::HIDDEN | Conditions::HELPED | Conditions::INVISIBLE);
    let tactical = percent(
        lethal + (1.0 - victim.hp_fraction()) * 30.0 + if advantage { 20.0 } else { 0.0 },
    );
    let threatened = ctx.in_danger();
    let mut risk = 0;
    if ranged && threatened {
        risk += 25;
    }
    if provokes && threatened {
        risk += 20;
    }
    Prediction {
        expected_damage: expected,
        tactical,
        risk,
        confidence: chance,
        ..Prediction::default()
    }
}

fn spell_prediction<'s>(
    ctx: &CombatContext<'s>,
    spell: &SpellDefinition,
    slot: u8,
    replaces_concentration: bool,
    affected: impl Iterator<Item = &'s Combatant>,
) -> Prediction {
    let caster = ctx.actor;
    let damage = damage_formula(spell, caster, slot).map(|f| f.expected());
    let healing = healing_formula(spell, caster, slot).map(|f| f.expected());

    let mut prediction = Prediction {
        resource_cost: u32::from(slot) * 12 + if replaces_concentration { 20 } else { 0 },
        ..Prediction::default()
    };
    let mut kills = 0u32;
    let mut chances = Vec::new();
    for target in affected {
        let hostile = target.is_hostile_to(caster);
        let chance = match spell.effect.resolution {
            SpellResolution::AttackRoll => positional_hit_chance(
                ctx.state,
                ctx.env,
                caster,
                target,
                spell_attack_bonus(caster),
                AttackMode::reach(spell.range, distance(caster.position, target.position)),
            ),
            SpellResolution::Save { ability, .. } => {
                save_failure_probability(save_bonus(target, ability), caster.base.spell_save_dc())
            }
            SpellResolution::Automatic => 1.0,
        };

        if let Some(full) = damage {
            let fraction = expected_damage_fraction(spell, caster, target, chance);
            let dealt = (full * fraction).min(target.hp as f32);
            if hostile {
                prediction.expected_damage += dealt;
                if full * fraction >= target.hp as f32 {
                    kills += 1;
                }
            } else {
                prediction.expected_damage -= dealt * 1.5;
            }
        }
        if let Some(amount) = healing.filter(|_| !hostile) {
            prediction.expected_healing += amount.min((target.base.max_hp - target.hp) as f32);
        }
        if spell.effect.condition.is_some() && hostile {
            prediction.control += percent(chance * 50.0);
        }
        if hostile || healing.is_some() {
            chances.push(chance);
        }
    }

    prediction.control = prediction.control.min(100);
    prediction.tactical = (kills * 40).min(100);
    prediction.confidence = if chances.is_empty() {
        0.0
    } else {
        chances.iter().sum::<f32>() / chances.len() as f32
    };
    prediction
}

fn action_prediction(
    ctx: &CombatContext<'_>,
    definition: &ActionDefinition,
    target: Option<EntityId>,
) -> Prediction {
    let actor = ctx.actor;
    let certain = |tactical: u32| Prediction {
        tactical,
        confidence: 1.0,
        ..Prediction::default()
    };

    let victim = target.and_then(|id| ctx.state.combatant(id));
    if let (Some(formula), Some(victim)) = (definition.damage, victim) {
        let modifier = actor.modifier(best_physical_ability(actor));
        let dist = distance(actor.position, victim.position);
        let range = definition.range.max(CombatConfig::MELEE_REACH);
        let chance = positional_hit_chance(
            ctx.state,
            ctx.env,
            actor,
            victim,
            modifier + actor.base.proficiency_bonus,
            AttackMode::reach(range, dist),
        );
        let hit = expected_hit_damage(&formula.plus(modifier), ctx.env.rules());
        let ranged = range > CombatConfig::MELEE_REACH && dist > CombatConfig::MELEE_REACH;
        return strike_prediction(ctx, victim, chance, hit, ranged, definition.provokes_opportunity);
    }

    if let Some(formula) = definition.healing {
        let patient = target
            .and_then(|id| ctx.state.combatant(id))
            .unwrap_or(actor);
        let missing = (patient.base.max_hp - patient.hp) as f32;
        return Prediction {
            expected_healing: formula.expected().max(0.0).min(missing),
            confidence: 1.0,
            ..Prediction::default()
        };
    }

    match definition.category {
        ActionCategory::Dodge => certain(if ctx.in_danger() { 60 } else { 5 }),
        ActionCategory::Disengage => certain(if ctx.in_danger() { 50 } else { 0 }),
        ActionCategory::Dash => {
            let far = ctx
                .distance_to_nearest_enemy()
                .is_some_and(|d| d > actor.budget.movement + CombatConfig::MELEE_REACH);
            certain(if far { 30 } else { 0 })
        }
        ActionCategory::Hide => {
            let dc = ctx
                .enemies()
                .filter(|e| ctx.state.grid().has_line_of_sight(e.position, actor.position))
                .map(|e| e.base.passive_perception())
                .max()
                .unwrap_or(10);
            let chance = hit_probability(actor.modifier(Ability::Dexterity), dc, Advantage::Normal);
            Prediction {
                tactical: percent(chance * 60.0),
                confidence: chance,
                ..Prediction::default()
            }
        }
        ActionCategory::Help => {
            let pressed = target
                .and_then(|id| ctx.state.combatant(id))
                .is_some_and(|ally| ctx.enemies_within(ally.position, CombatConfig::MELEE_REACH) > 0);
            certain(if pressed { 40 } else { 10 })
        }
        _ => Prediction::default(),
    }
}

fn movement_prediction(ctx: &CombatContext<'_>, to: Position, cost: u32, provoked: usize) -> Prediction {
    let here = threat_at(ctx.state, ctx.env, ctx.actor, ctx.position());
    let there = threat_at(ctx.state, ctx.env, ctx.actor, to);
    let grid = ctx.state.grid();

    let mut tactical = here.saturating_sub(there);
    if let Some((nearest, gap)) = ctx.nearest_enemy() {
        let closing = gap.saturating_sub(distance(to, nearest.position));
        let engages = distance(to, nearest.position) <= CombatConfig::MELEE_REACH
            && ctx.weapons().any(|w| w.is_melee());
        tactical += if engages { 50 } else { closing * 8 };
        tactical += match grid.cover_between(nearest.position, to) {
            Cover::None => 0,
            Cover::Half => 30,
            Cover::ThreeQuarters => 50,
            Cover::Full => 60,
        };
    }

    Prediction {
        tactical: tactical.min(100),
        risk: (there.saturating_sub(here) + 20 * provoked as u32).min(100),
        resource_cost: (cost * 2).min(100),
        confidence: 1.0,
        ..Prediction::default()
    }
}
