//! Behavior patterns and intent scoring.
//!
//! A [`BehaviorPattern`] is a set of dispositions (aggressiveness, risk
//! tolerance, teamwork, preferred range and HP thresholds). Each [`Intent`] is
//! scored against the live [`CombatContext`] through the pattern, producing a
//! structured [`Score`] the prioritizer folds into every candidate action.

use std::collections::HashMap;

use combat_core::{CombatConfig, Combatant, Conditions, Cover, Faction, distance};

use crate::context::CombatContext;
use crate::scoring::Score;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Archetype {
    Aggressive,
    Defensive,
    Tactical,
    Berserker,
    Support,
    Skirmisher,
    Cowardly,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum EngagementRange {
    Melee,
    Ranged,
    Mixed,
}

/// Dispositions of one archetype. Traits are 0-10, thresholds are HP percent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BehaviorPattern {
    pub archetype: Archetype,
    pub aggressiveness: u32,
    pub risk_tolerance: u32,
    pub teamwork: u32,
    pub preferred_range: EngagementRange,
    /// Below this the combatant tries to get away.
    pub retreat_threshold: u32,
    /// Below this the combatant favors dodging and cover.
    pub defensive_threshold: u32,
    /// Allies below this are worth healing.
    pub heal_threshold: u32,
}

impl BehaviorPattern {
    pub const fn preset(archetype: Archetype) -> Self {
        use EngagementRange::*;
        let (aggressiveness, risk_tolerance, teamwork, preferred_range, retreat, defensive, heal) =
            match archetype {
                Archetype::Aggressive => (8, 7, 4, Melee, 15, 25, 30),
                Archetype::Defensive => (4, 3, 7, Mixed, 30, 50, 50),
                Archetype::Tactical => (6, 5, 6, Ranged, 25, 40, 40),
                Archetype::Berserker => (10, 10, 1, Melee, 0, 10, 20),
                Archetype::Support => (3, 4, 10, Ranged, 30, 45, 60),
                Archetype::Skirmisher => (6, 6, 4, Ranged, 30, 40, 30),
                Archetype::Cowardly => (3, 1, 3, Ranged, 50, 60, 40),
            };
        Self {
            archetype,
            aggressiveness,
            risk_tolerance,
            teamwork,
            preferred_range,
            retreat_threshold: retreat,
            defensive_threshold: defensive,
            heal_threshold: heal,
        }
    }

    pub fn prefers_melee(&self) -> bool {
        self.preferred_range == EngagementRange::Melee
    }

    pub fn prefers_ranged(&self) -> bool {
        self.preferred_range == EngagementRange::Ranged
    }

    /// Caution on a 0-10 scale.
    fn caution(&self) -> u32 {
        10 - self.risk_tolerance.min(10)
    }
}

/// Named behavior patterns, keyed by the tag combatants carry.
#[derive(Clone, Debug)]
pub struct BehaviorCatalog {
    patterns: HashMap<String, BehaviorPattern>,
}

impl BehaviorCatalog {
    pub const ARCHETYPES: [Archetype; 7] = [
        Archetype::Aggressive,
        Archetype::Defensive,
        Archetype::Tactical,
        Archetype::Berserker,
        Archetype::Support,
        Archetype::Skirmisher,
        Archetype::Cowardly,
    ];

    pub fn empty() -> Self {
        Self {
            patterns: HashMap::new(),
        }
    }

    /// The seven stock archetypes under their snake_case names.
    pub fn standard() -> Self {
        let mut catalog = Self::empty();
        for archetype in Self::ARCHETYPES {
            catalog.insert(archetype.to_string(), BehaviorPattern::preset(archetype));
        }
        catalog
    }

    pub fn insert(&mut self, name: impl Into<String>, pattern: BehaviorPattern) {
        self.patterns.insert(name.into(), pattern);
    }

    pub fn get(&self, name: &str) -> Option<&BehaviorPattern> {
        self.patterns.get(name)
    }

    /// Pattern for a combatant: its behavior tag, else a faction default.
    pub fn resolve(&self, combatant: &Combatant) -> BehaviorPattern {
        if let Some(tag) = combatant.behavior.as_deref() {
            if let Some(pattern) = self.get(tag) {
                return *pattern;
            }
            tracing::warn!(
                entity = %combatant.id,
                behavior = tag,
                "unknown behavior pattern, using faction default"
            );
        }
        BehaviorPattern::preset(match combatant.faction {
            Faction::Enemy => Archetype::Aggressive,
            Faction::Ally | Faction::Player => Archetype::Tactical,
        })
    }
}

impl Default for BehaviorCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

/// What a combatant wants to accomplish with an action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Intent {
    AttackMelee,
    AttackRanged,
    CastDamage,
    CastHeal,
    MoveCloser,
    MoveAway,
    TakeCover,
    ProtectAlly,
    Dash,
    Dodge,
    Hide,
}

impl Intent {
    pub const fn all() -> [Intent; 11] {
        [
            Intent::AttackMelee,
            Intent::AttackRanged,
            Intent::CastDamage,
            Intent::CastHeal,
            Intent::MoveCloser,
            Intent::MoveAway,
            Intent::TakeCover,
            Intent::ProtectAlly,
            Intent::Dash,
            Intent::Dodge,
            Intent::Hide,
        ]
    }
}

/// Scores `intent` for the context's actor under `pattern`.
pub fn score_intent(intent: Intent, ctx: &CombatContext<'_>, pattern: &BehaviorPattern) -> Score {
    match intent {
        Intent::AttackMelee => attack_melee(ctx, pattern),
        Intent::AttackRanged => attack_ranged(ctx, pattern),
        Intent::CastDamage => cast_damage(ctx, pattern),
        Intent::CastHeal => cast_heal(ctx, pattern),
        Intent::MoveCloser => move_closer(ctx, pattern),
        Intent::MoveAway => move_away(ctx, pattern),
        Intent::TakeCover => take_cover(ctx, pattern),
        Intent::ProtectAlly => protect_ally(ctx, pattern),
        Intent::Dash => dash(ctx, pattern),
        Intent::Dodge => dodge(ctx, pattern),
        Intent::Hide => hide(ctx, pattern),
    }
}

/// Highest-scoring intent; ties keep the earlier intent in [`Intent::all`].
pub fn select_intent(ctx: &CombatContext<'_>, pattern: &BehaviorPattern) -> (Intent, Score) {
    let mut best = (Intent::Dodge, Score::impossible());
    for intent in Intent::all() {
        let score = score_intent(intent, ctx, pattern);
        tracing::debug!(entity = %ctx.entity(), %intent, %score, "intent scored");
        if score.value() > best.1.value() {
            best = (intent, score);
        }
    }
    best
}

/// HP modifier shared by the offensive intents.
fn wounded_modifier(ctx: &CombatContext<'_>, pattern: &BehaviorPattern) -> u32 {
    let hp = ctx.hp_percent();
    if hp < pattern.retreat_threshold {
        40
    } else if hp < pattern.defensive_threshold {
        80
    } else {
        100
    }
}

/// Melee attack intent.
///
/// - **is_possible**: carries a melee weapon and a hostile is reachable this turn
/// - **situation**: adjacent 100, then falling with distance
/// - **personality**: aggressiveness, shifted by preferred range
/// - **modifier**: HP penalty below the retreat/defensive thresholds
fn attack_melee(ctx: &CombatContext<'_>, pattern: &BehaviorPattern) -> Score {
    let has_melee = ctx.weapons().any(|w| w.is_melee());
    let Some(dist) = ctx.distance_to_nearest_enemy() else {
        return Score::impossible();
    };
    let reach = CombatConfig::MELEE_REACH + ctx.actor.budget.movement;
    if !has_melee || dist > reach {
        return Score::impossible();
    }

    let situation = match dist {
        0..=1 => 100,
        2 => 85,
        3 => 70,
        _ => 55,
    };
    let personality = match pattern.preferred_range {
        EngagementRange::Melee => (pattern.aggressiveness * 10).min(100),
        EngagementRange::Mixed => pattern.aggressiveness * 8,
        EngagementRange::Ranged => pattern.aggressiveness * 5,
    };

    Score::new(true, situation, personality, wounded_modifier(ctx, pattern))
}

/// Ranged weapon attack intent.
///
/// Adjacent hostiles impose disadvantage, so the situation drops when one is
/// in reach.
fn attack_ranged(ctx: &CombatContext<'_>, pattern: &BehaviorPattern) -> Score {
    let has_ranged = ctx.weapons().any(|w| w.max_range() > CombatConfig::MELEE_REACH);
    if !has_ranged || ctx.nearest_enemy().is_none() {
        return Score::impossible();
    }

    let situation = if ctx.in_danger() { 40 } else { 90 };
    let personality = match pattern.preferred_range {
        EngagementRange::Ranged => (pattern.aggressiveness * 10 + 20).min(100),
        EngagementRange::Mixed => pattern.aggressiveness * 8,
        EngagementRange::Melee => pattern.aggressiveness * 4,
    };

    Score::new(true, situation, personality, wounded_modifier(ctx, pattern))
}

/// Offensive spell intent.
///
/// Clustered hostiles raise the situation: area spells pay off more.
fn cast_damage(ctx: &CombatContext<'_>, pattern: &BehaviorPattern) -> Score {
    if !ctx.has_damage_spell() {
        return Score::impossible();
    }
    let Some((nearest, _)) = ctx.nearest_enemy() else {
        return Score::impossible();
    };

    let clustered = ctx.enemies_within(nearest.position, 2) as u32;
    let situation = (60 + 15 * clustered.saturating_sub(1)).min(100);
    let personality = match pattern.preferred_range {
        EngagementRange::Melee => pattern.aggressiveness * 6,
        _ => (pattern.aggressiveness * 8 + 30).min(100),
    };

    Score::new(true, situation, personality, wounded_modifier(ctx, pattern))
}

/// Healing intent: someone on the team is below the heal threshold.
fn cast_heal(ctx: &CombatContext<'_>, pattern: &BehaviorPattern) -> Score {
    if !ctx.has_healing() {
        return Score::impossible();
    }
    let Some(patient) = ctx.wounded_ally(pattern.heal_threshold) else {
        return Score::impossible();
    };

    let situation = 100 - patient.hp_percent().min(100);
    let personality = (pattern.teamwork * 10).max(30);
    // Keeping oneself up matters more than topping off others.
    let modifier = if patient.id == ctx.entity() { 130 } else { 100 };

    Score::new(true, situation, personality, modifier)
}

/// Approach intent.
fn move_closer(ctx: &CombatContext<'_>, pattern: &BehaviorPattern) -> Score {
    let Some(dist) = ctx.distance_to_nearest_enemy() else {
        return Score::impossible();
    };
    if ctx.actor.budget.movement == 0 || dist <= CombatConfig::MELEE_REACH {
        return Score::impossible();
    }

    let situation = (40 + dist * 10).min(100);
    let personality = match pattern.preferred_range {
        EngagementRange::Melee => (pattern.aggressiveness * 10).min(100),
        EngagementRange::Mixed => pattern.aggressiveness * 6,
        EngagementRange::Ranged if ctx.has_ranged_option() => pattern.aggressiveness * 2,
        EngagementRange::Ranged => pattern.aggressiveness * 6,
    };

    Score::new(true, situation, personality, wounded_modifier(ctx, pattern))
}

/// Retreat intent.
///
/// - **situation**: in melee danger or badly hurt
/// - **personality**: caution
/// - **modifier**: boosted below the retreat threshold, or when a ranged
///   combatant is caught in melee
fn move_away(ctx: &CombatContext<'_>, pattern: &BehaviorPattern) -> Score {
    if ctx.actor.budget.movement == 0 || ctx.nearest_enemy().is_none() {
        return Score::impossible();
    }

    let hp = ctx.hp_percent();
    let situation = if hp < pattern.retreat_threshold {
        100
    } else if ctx.in_danger() {
        70
    } else {
        20
    };
    let personality = (pattern.caution() * 10).max(10);
    let modifier = if hp < pattern.retreat_threshold {
        150
    } else if pattern.prefers_ranged() && ctx.in_danger() {
        120
    } else {
        60
    };

    Score::new(true, situation, personality, modifier)
}

fn take_cover(ctx: &CombatContext<'_>, pattern: &BehaviorPattern) -> Score {
    let Some((nearest, _)) = ctx.nearest_enemy() else {
        return Score::impossible();
    };
    if ctx.actor.budget.movement == 0 {
        return Score::impossible();
    }

    let exposed = ctx.state.grid().cover_between(nearest.position, ctx.position())
        == Cover::None;
    let situation = if exposed { 70 } else { 20 };
    let personality = (pattern.caution() * 6 + if pattern.prefers_ranged() { 30 } else { 0 }).min(100);
    let modifier = if ctx.hp_percent() < pattern.defensive_threshold {
        130
    } else {
        80
    };

    Score::new(true, situation, personality, modifier)
}

/// Shield an ally that is standing next to a hostile.
fn protect_ally(ctx: &CombatContext<'_>, pattern: &BehaviorPattern) -> Score {
    let pressed = ctx
        .allies()
        .filter(|a| ctx.enemies_within(a.position, CombatConfig::MELEE_REACH) > 0)
        .min_by_key(|a| (a.hp_percent(), a.id));
    let Some(ally) = pressed else {
        return Score::impossible();
    };

    let situation = (100 - ally.hp_percent().min(100)).max(30);
    let personality = pattern.teamwork * 10;
    let modifier = if distance(ally.position, ctx.position()) <= CombatConfig::MELEE_REACH {
        110
    } else {
        90
    };

    Score::new(true, situation, personality, modifier)
}

/// Dash when the nearest hostile is out of reach this turn.
fn dash(ctx: &CombatContext<'_>, pattern: &BehaviorPattern) -> Score {
    let Some(dist) = ctx.distance_to_nearest_enemy() else {
        return Score::impossible();
    };
    if !ctx.actor.budget.action {
        return Score::impossible();
    }

    let reach = ctx.actor.budget.movement + CombatConfig::MELEE_REACH;
    let fleeing = ctx.hp_percent() < pattern.retreat_threshold && ctx.in_danger();
    let situation = if fleeing {
        80
    } else if dist > reach && !ctx.has_ranged_option() {
        80
    } else {
        10
    };
    let personality = if fleeing {
        pattern.caution() * 10
    } else {
        pattern.aggressiveness * 6
    };

    Score::new(true, situation, personality.max(10), 100)
}

fn dodge(ctx: &CombatContext<'_>, pattern: &BehaviorPattern) -> Score {
    if !ctx.actor.budget.action || ctx.nearest_enemy().is_none() {
        return Score::impossible();
    }

    let situation = match (ctx.in_danger(), ctx.hp_percent() < pattern.defensive_threshold) {
        (true, true) => 90,
        (true, false) => 40,
        (false, _) => 5,
    };
    let personality = (pattern.caution() * 10).max(10);

    Score::new(true, situation, personality, 100)
}

fn hide(ctx: &CombatContext<'_>, pattern: &BehaviorPattern) -> Score {
    if !ctx.actor.budget.action
        || ctx.nearest_enemy().is_none()
        || ctx.actor.conditions().contains(Conditions::HIDDEN)
    {
        return Score::impossible();
    }

    let situation = if ctx.in_danger() { 15 } else { 50 };
    let personality = match pattern.archetype {
        Archetype::Skirmisher | Archetype::Cowardly => 80,
        _ => pattern.caution() * 4,
    };

    Score::new(true, situation, personality, 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use combat_core::{Catalog, EncounterBuilder, EntityId, EntitySpec, Position, ScriptedDice};

    fn duel(
        catalog: &Catalog,
        attacker: &str,
        defender: &str,
        gap: i32,
    ) -> combat_core::CombatState {
        EncounterBuilder::new("behavior")
            .entity(EntitySpec::new(attacker, Position::new(0, 0)).initiative(10))
            .entity(EntitySpec::new(defender, Position::new(gap, 0)).initiative(5))
            .start(catalog.env(), &mut ScriptedDice::new([]))
            .unwrap()
    }

    #[test]
    fn catalog_resolves_tags_and_faction_defaults() {
        let catalog = BehaviorCatalog::standard();
        assert_eq!(catalog.get("berserker").map(|p| p.archetype), Some(Archetype::Berserker));
        assert_eq!("skirmisher".parse::<Archetype>(), Ok(Archetype::Skirmisher));

        let templates = Catalog::standard();
        let orc = duel(&templates, "orc", "fighter", 1);
        let orc = orc.combatant(EntityId(1)).unwrap();
        assert_eq!(catalog.resolve(orc).archetype, Archetype::Aggressive);

        let mut untagged = orc.clone();
        untagged.behavior = Some("mystery".into());
        assert_eq!(catalog.resolve(&untagged).archetype, Archetype::Aggressive);
    }

    #[test]
    fn adjacent_brute_prefers_melee() {
        let catalog = Catalog::standard();
        let state = duel(&catalog, "orc", "fighter", 1);
        let ctx = CombatContext::new(&state, catalog.env(), EntityId(1)).unwrap();
        let pattern = BehaviorPattern::preset(Archetype::Aggressive);

        let (intent, score) = select_intent(&ctx, &pattern);
        assert_eq!(intent, Intent::AttackMelee);
        assert_eq!(score.situation, 100);
        assert!(!score_intent(Intent::MoveCloser, &ctx, &pattern).is_possible);
    }

    #[test]
    fn badly_hurt_coward_wants_out() {
        let catalog = Catalog::standard();
        let state = duel(&catalog, "goblin", "fighter", 1)
            .apply_damage(EntityId(1), 6)
            .unwrap();
        let ctx = CombatContext::new(&state, catalog.env(), EntityId(1)).unwrap();
        let pattern = BehaviorPattern::preset(Archetype::Cowardly);

        let away = score_intent(Intent::MoveAway, &ctx, &pattern);
        let melee = score_intent(Intent::AttackMelee, &ctx, &pattern);
        assert!(away.value() > melee.value());
    }

    #[test]
    fn healing_needs_a_wounded_ally() {
        let catalog = Catalog::standard();
        let state = duel(&catalog, "cleric", "goblin", 4);
        let pattern = BehaviorPattern::preset(Archetype::Support);
        let ctx = CombatContext::new(&state, catalog.env(), EntityId(1)).unwrap();
        assert!(!score_intent(Intent::CastHeal, &ctx, &pattern).is_possible);

        let hurt = state.apply_damage(EntityId(1), 18).unwrap();
        let ctx = CombatContext::new(&hurt, catalog.env(), EntityId(1)).unwrap();
        let heal = score_intent(Intent::CastHeal, &ctx, &pattern);
        assert!(heal.is_possible);
        assert_eq!(heal.modifier, 130);
    }
}
