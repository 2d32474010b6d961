//! Deterministic tactical combat rules and data types.
//!
//! `combat-core` defines the canonical combat model (state, grid, rules,
//! resolver) and exposes pure APIs reused by the AI, the runtime and offline
//! tools. Every state change flows through [`CombatState`] transitions, which
//! return a new value and leave the receiver untouched; every die is rolled
//! through an injected [`DiceRoller`].
pub mod action;
pub mod config;
pub mod dice;
pub mod env;
pub mod error;
pub mod grid;
pub mod initiative;
pub mod rules;
pub mod setup;
pub mod state;

pub use action::{
    AbilityCheck, ActionOutcome, ActionResolver, AttackOutcome, AttackRoll, CombatAction,
    DamageReport, MovementOutcome, Resolution, SpellOutcome, SpellTargetOutcome, StandardOutcome,
    Target,
};
pub use config::CombatConfig;
pub use dice::{Advantage, D20Roll, DiceRoller, PcgDice, ScriptedDice, ability_modifier};
pub use env::{
    ActionCategory, ActionDefinition, ActionOracle, CastingTime, Catalog, CombatEnv,
    CombatantTemplate, Components, DamageType, Env, SpellDefinition, SpellDuration, SpellEffect,
    SpellOracle, SpellResolution, SpellSchool, TemplateOracle, WeaponDefinition, WeaponKind,
    WeaponOracle, WeaponProperties,
};
pub use error::{CombatError, ErrorKind, ErrorSeverity, GameError};
pub use grid::{AreaShape, Cell, CellOverride, Cover, TacticalGrid, Terrain, distance};
pub use rules::{DiceFormula, FormulaError};
pub use setup::{EncounterBuilder, EntitySpec};
pub use state::{
    Ability, AbilityScores, ActionBudget, ActionCost, ActionId, BaseStats, CombatSnapshot,
    CombatState, Combatant, CombatantStatus, Conditions, EncounterId, EntityId, Faction, Phase,
    Position, SpellId, SpellSlots, TemplateId, WeaponId,
};
