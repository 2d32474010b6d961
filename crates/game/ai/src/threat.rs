//! Threat assessment.
//!
//! Pure functions over a [`CombatState`]: how dangerous a combatant is to a
//! given perspective, how safe each nearby cell is, how exposed a combatant
//! stands, and which hostiles deserve attention first.

use combat_core::rules::attack::{
    AttackGeometry, AttackMode, attack_advantage, best_physical_ability, effective_armor_class,
    expected_hit_damage, hit_probability, weapon_attack_bonus, weapon_damage,
};
use combat_core::rules::spell::{damage_formula, expected_damage_fraction, spell_attack_bonus};
use combat_core::{
    Advantage, CombatConfig, CombatEnv, CombatError, CombatState, Combatant, Conditions, Cover,
    EntityId, Position, distance,
};

use crate::scoring::percent;

/// Relative weight of each threat component. Weights sum to one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThreatWeights {
    pub damage: f32,
    pub position: f32,
    pub abilities: f32,
    pub resources: f32,
    pub support: f32,
}

impl ThreatWeights {
    pub const DEFAULT_DAMAGE: f32 = 0.40;
    pub const DEFAULT_POSITION: f32 = 0.25;
    pub const DEFAULT_ABILITIES: f32 = 0.20;
    pub const DEFAULT_RESOURCES: f32 = 0.10;
    pub const DEFAULT_SUPPORT: f32 = 0.05;
}

impl Default for ThreatWeights {
    fn default() -> Self {
        Self {
            damage: Self::DEFAULT_DAMAGE,
            position: Self::DEFAULT_POSITION,
            abilities: Self::DEFAULT_ABILITIES,
            resources: Self::DEFAULT_RESOURCES,
            support: Self::DEFAULT_SUPPORT,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ThreatLevel {
    Minimal,
    Low,
    Moderate,
    High,
    Critical,
}

impl ThreatLevel {
    pub fn from_score(score: u32) -> Self {
        match score {
            0..20 => ThreatLevel::Minimal,
            20..40 => ThreatLevel::Low,
            40..60 => ThreatLevel::Moderate,
            60..80 => ThreatLevel::High,
            _ => ThreatLevel::Critical,
        }
    }
}

/// How dangerous `threat` is to `perspective`. Every component is 0-100.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThreatAnalysis {
    pub threat: EntityId,
    pub perspective: EntityId,
    pub damage: u32,
    pub position: u32,
    pub abilities: u32,
    pub resources: u32,
    pub support: u32,
    pub overall: u32,
    /// Overall scaled by how soon the threat can reach the perspective.
    pub immediate: u32,
    /// Overall scaled by mobility and remaining resources.
    pub potential: u32,
    pub level: ThreatLevel,
}

/// Threat and safety of one cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AreaThreat {
    pub position: Position,
    pub threat: u32,
    /// `100 - threat`.
    pub safety: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DefensiveAssessment {
    pub entity: EntityId,
    /// Worst cover against any hostile with line of sight.
    pub cover: Cover,
    pub hp_fraction: f32,
    pub conditions: Conditions,
    /// 0-100; higher is more exposed.
    pub vulnerability: u32,
    /// Rounds the combatant is expected to last against every hostile at once.
    pub survival_rounds: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PriorityTarget {
    pub entity: EntityId,
    pub priority: u32,
    pub distance: u32,
    pub hp_fraction: f32,
    pub threat: ThreatAnalysis,
}

/// Best expected damage `attacker` can deal `victim` in one action,
/// ignoring positions.
pub fn damage_per_action(env: CombatEnv<'_>, attacker: &Combatant, victim: &Combatant) -> f32 {
    let rules = env.rules();
    let ac = victim.base.armor_class;

    let weapons = attacker.weapons.iter().filter_map(|id| env.weapon(id).ok()).map(|w| {
        let chance = hit_probability(weapon_attack_bonus(attacker, w), ac, Advantage::Normal);
        chance * expected_hit_damage(&weapon_damage(attacker, w), rules)
    });

    let spells = attacker.spells.iter().filter_map(|id| env.spell(id).ok()).filter_map(|s| {
        let slot = if s.is_cantrip() {
            0
        } else {
            attacker.slots.lowest_available(s.level)?
        };
        let formula = damage_formula(s, attacker, slot)?;
        let chance = hit_probability(spell_attack_bonus(attacker), ac, Advantage::Normal);
        Some(formula.expected() * expected_damage_fraction(s, attacker, victim, chance))
    });

    let actions = attacker
        .actions
        .iter()
        .filter_map(|id| env.action(id).ok())
        .filter_map(|a| {
            let modifier = attacker.modifier(best_physical_ability(attacker));
            let formula = a.damage?.plus(modifier);
            let chance = hit_probability(
                modifier + attacker.base.proficiency_bonus,
                ac,
                Advantage::Normal,
            );
            Some(chance * expected_hit_damage(&formula, rules))
        });

    weapons.chain(spells).chain(actions).fold(0.0, f32::max)
}

/// Longest distance at which `combatant` can hurt someone.
pub fn attack_range(env: CombatEnv<'_>, combatant: &Combatant) -> u32 {
    let weapons = combatant
        .weapons
        .iter()
        .filter_map(|id| env.weapon(id).ok())
        .map(|w| w.max_range());
    let spells = combatant
        .spells
        .iter()
        .filter_map(|id| env.spell(id).ok())
        .filter(|s| s.effect.is_harmful())
        .map(|s| s.range);
    let actions = combatant
        .actions
        .iter()
        .filter_map(|id| env.action(id).ok())
        .filter(|a| a.damage.is_some())
        .map(|a| a.range.max(CombatConfig::MELEE_REACH));
    weapons.chain(spells).chain(actions).max().unwrap_or(CombatConfig::MELEE_REACH)
}

pub fn analyze_threat(
    state: &CombatState,
    env: CombatEnv<'_>,
    threat: EntityId,
    perspective: EntityId,
    weights: &ThreatWeights,
) -> Result<ThreatAnalysis, CombatError> {
    let source = state.get(threat)?;
    let target = state.get(perspective)?;
    let dist = distance(source.position, target.position);

    let damage = if source.is_standing() {
        percent(100.0 * damage_per_action(env, source, target) / target.base.max_hp.max(1) as f32)
    } else {
        0
    };

    let proximity = 100u32.saturating_sub(dist * 10);
    let sight = if state.grid().has_line_of_sight(source.position, target.position) {
        30
    } else {
        0
    };
    let flanking = state
        .allies_of(threat)
        .any(|a| distance(a.position, target.position) <= CombatConfig::MELEE_REACH);
    let position = percent(proximity as f32 * 0.6 + sight as f32 + if flanking { 10.0 } else { 0.0 });

    let mut abilities = (source.base.level * 5).min(50) + if source.spells.is_empty() { 0 } else { 20 };
    if source
        .conditions()
        .intersects(Conditions::HIDDEN | Conditions::INVISIBLE | Conditions::HELPED)
    {
        abilities += 30;
    }
    let abilities = abilities.min(100);

    let resources = if source.slots.total_maximum() > 0 {
        let slots = 100 * source.slots.total_remaining() / source.slots.total_maximum();
        (source.hp_percent() + slots) / 2
    } else {
        source.hp_percent()
    };

    let support = (state
        .allies_of(threat)
        .filter(|a| distance(a.position, source.position) <= 3)
        .count() as u32
        * 25)
        .min(100);

    let overall = percent(
        damage as f32 * weights.damage
            + position as f32 * weights.position
            + abilities as f32 * weights.abilities
            + resources as f32 * weights.resources
            + support as f32 * weights.support,
    );

    let reach = source.base.speed + attack_range(env, source);
    let immediate = if dist <= reach {
        overall
    } else {
        percent(overall as f32 * reach as f32 / dist as f32)
    };
    let mobility = (source.base.speed as f32 / 6.0).min(1.0);
    let potential = percent(overall as f32 * (0.5 + 0.25 * mobility + 0.25 * resources as f32 / 100.0));

    Ok(ThreatAnalysis {
        threat,
        perspective,
        damage,
        position,
        abilities,
        resources,
        support,
        overall,
        immediate,
        potential,
        level: ThreatLevel::from_score(overall),
    })
}

/// Threat a single hostile projects onto `cell` for `perspective`.
fn cell_threat(env: CombatEnv<'_>, hostile: &Combatant, perspective: &Combatant, cell: Position) -> f32 {
    let dist = distance(hostile.position, cell);
    let range = attack_range(env, hostile);
    let falloff = if dist <= range {
        1.0
    } else if dist <= range + hostile.base.speed {
        0.5
    } else {
        0.0
    };
    if falloff == 0.0 {
        return 0.0;
    }
    100.0 * damage_per_action(env, hostile, perspective) / perspective.base.max_hp.max(1) as f32 * falloff
}

/// Threat and safety of every in-bounds cell within `radius` of `center`.
pub fn assess_area_threats(
    state: &CombatState,
    env: CombatEnv<'_>,
    perspective: EntityId,
    center: Position,
    radius: u32,
) -> Result<Vec<AreaThreat>, CombatError> {
    let viewer = state.get(perspective)?;
    let hostiles: Vec<&Combatant> = state.hostiles_of(perspective).collect();
    Ok(state
        .grid()
        .positions_in_radius(center, radius)
        .into_iter()
        .map(|position| {
            let threat = percent(
                hostiles
                    .iter()
                    .map(|h| cell_threat(env, h, viewer, position))
                    .sum(),
            );
            AreaThreat {
                position,
                threat,
                safety: 100 - threat,
            }
        })
        .collect())
}

/// Threat at one cell, for scoring a single destination.
pub fn threat_at(state: &CombatState, env: CombatEnv<'_>, perspective: &Combatant, cell: Position) -> u32 {
    percent(
        state
            .hostiles_of(perspective.id)
            .map(|h| cell_threat(env, h, perspective, cell))
            .sum(),
    )
}

pub fn assess_defenses(
    state: &CombatState,
    env: CombatEnv<'_>,
    entity: EntityId,
) -> Result<DefensiveAssessment, CombatError> {
    let subject = state.get(entity)?;
    let hostiles: Vec<&Combatant> = state.hostiles_of(entity).collect();

    let cover = hostiles
        .iter()
        .map(|h| state.grid().cover_between(h.position, subject.position))
        .filter(|&c| c != Cover::Full)
        .min()
        .unwrap_or(Cover::Full);

    let threatened = hostiles
        .iter()
        .filter(|h| distance(h.position, subject.position) <= CombatConfig::MELEE_REACH)
        .count() as u32;
    let exposed = subject
        .conditions()
        .intersects(Conditions::EXPOSED | Conditions::PRONE);
    let cover_term = match cover {
        Cover::None => 20,
        Cover::Half => 10,
        Cover::ThreeQuarters => 5,
        Cover::Full => 0,
    };
    let vulnerability = percent(
        (1.0 - subject.hp_fraction()) * 50.0
            + if exposed { 20.0 } else { 0.0 }
            + cover_term as f32
            + threatened as f32 * 10.0
            + (20 - subject.base.armor_class.clamp(10, 20)) as f32,
    );

    let incoming: f32 = hostiles
        .iter()
        .filter(|h| distance(h.position, subject.position) <= attack_range(env, h) + h.base.speed)
        .map(|h| {
            let geometry = AttackGeometry::between(state, h, subject);
            let ac = effective_armor_class(subject, geometry.cover, env.rules());
            ac.map_or(0.0, |_| damage_per_action(env, h, subject))
        })
        .sum();
    let survival_rounds = if incoming > 0.0 {
        (subject.hp as f32 / incoming).min(10.0)
    } else {
        10.0
    };

    Ok(DefensiveAssessment {
        entity,
        cover,
        hp_fraction: subject.hp_fraction(),
        conditions: subject.conditions(),
        vulnerability,
        survival_rounds,
    })
}

/// Living hostiles of `perspective`, most urgent first.
///
/// Priority blends missing HP (40%), proximity (30%) and overall threat (30%).
pub fn identify_priority_targets(
    state: &CombatState,
    env: CombatEnv<'_>,
    perspective: EntityId,
    weights: &ThreatWeights,
) -> Result<Vec<PriorityTarget>, CombatError> {
    let viewer = state.get(perspective)?;
    let mut targets = state
        .hostiles_of(perspective)
        .map(|h| {
            let threat = analyze_threat(state, env, h.id, perspective, weights)?;
            let dist = distance(viewer.position, h.position);
            let proximity = 100u32.saturating_sub(dist * 10);
            let priority = percent(
                (1.0 - h.hp_fraction()) * 100.0 * 0.4
                    + proximity as f32 * 0.3
                    + threat.overall as f32 * 0.3,
            );
            Ok(PriorityTarget {
                entity: h.id,
                priority,
                distance: dist,
                hp_fraction: h.hp_fraction(),
                threat,
            })
        })
        .collect::<Result<Vec<_>, CombatError>>()?;
    targets.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.entity.cmp(&b.entity)));
    Ok(targets)
}

/// Chance that a specific attack from `attacker` lands on `target` from the
/// current positions, for confidence reporting.
pub(crate) fn positional_hit_chance(
    state: &CombatState,
    env: CombatEnv<'_>,
    attacker: &Combatant,
    target: &Combatant,
    bonus: i32,
    mode: AttackMode,
) -> f32 {
    let geometry = AttackGeometry::between(state, attacker, target);
    match effective_armor_class(target, geometry.cover, env.rules()) {
        Some(ac) => hit_probability(bonus, ac, attack_advantage(attacker, target, &geometry, mode)),
        None => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use combat_core::{Catalog, EncounterBuilder, EntitySpec, ScriptedDice};

    fn skirmish(catalog: &Catalog) -> CombatState {
        EncounterBuilder::new("threat")
            .entity(EntitySpec::new("fighter", Position::new(1, 1)).initiative(10))
            .entity(EntitySpec::new("ogre", Position::new(2, 1)).initiative(9))
            .entity(EntitySpec::new("goblin", Position::new(10, 6)).initiative(8))
            .start(catalog.env(), &mut ScriptedDice::new([]))
            .unwrap()
    }

    #[test]
    fn adjacent_brute_outranks_distant_skirmisher() {
        let catalog = Catalog::standard();
        let state = skirmish(&catalog);
        let weights = ThreatWeights::default();
        let ogre = analyze_threat(&state, catalog.env(), EntityId(2), EntityId(1), &weights).unwrap();
        let goblin = analyze_threat(&state, catalog.env(), EntityId(3), EntityId(1), &weights).unwrap();
        assert!(ogre.overall > goblin.overall);
        assert!(ogre.immediate >= goblin.immediate);
        assert!(ogre.position > goblin.position);

        let ranked = identify_priority_targets(&state, catalog.env(), EntityId(1), &weights).unwrap();
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].entity, EntityId(2));
    }

    #[test]
    fn threat_levels_follow_score_bands() {
        assert_eq!(ThreatLevel::from_score(0), ThreatLevel::Minimal);
        assert_eq!(ThreatLevel::from_score(45), ThreatLevel::Moderate);
        assert_eq!(ThreatLevel::from_score(100), ThreatLevel::Critical);
    }

    #[test]
    fn cells_far_from_hostiles_are_safe() {
        let catalog = Catalog::standard();
        let state = skirmish(&catalog);
        let cells = assess_area_threats(&state, catalog.env(), EntityId(3), Position::new(10, 6), 1).unwrap();
        assert!(!cells.is_empty());
        for cell in &cells {
            assert_eq!(cell.safety, 100 - cell.threat);
        }
        let goblin = state.combatant(EntityId(3)).unwrap();
        assert!(threat_at(&state, catalog.env(), goblin, Position::new(2, 2)) > 0);
    }

    #[test]
    fn defenses_report_exposure() {
        let catalog = Catalog::standard();
        let state = skirmish(&catalog);
        let fighter = assess_defenses(&state, catalog.env(), EntityId(1)).unwrap();
        assert_eq!(fighter.cover, Cover::None);
        assert!(fighter.survival_rounds > 0.0);
        let wounded = state.apply_damage(EntityId(1), 20).unwrap();
        let after = assess_defenses(&wounded, catalog.env(), EntityId(1)).unwrap();
        assert!(after.vulnerability > fighter.vulnerability);
        assert!(after.survival_rounds < fighter.survival_rounds);
    }
}
