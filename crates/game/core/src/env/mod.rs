//! Traits describing read-only catalog data.
//!
//! Oracles expose weapon, spell, action and combatant-template definitions.
//! The [`Env`] aggregate bundles them with the rule configuration so the
//! resolver and the AI can reach everything they need without hard coupling
//! to a concrete store.
mod actions;
mod catalog;
mod spells;
mod templates;
mod weapons;

pub use actions::{ActionCategory, ActionDefinition, ActionOracle};
pub use catalog::Catalog;
pub use spells::{
    CastingTime, Components, SpellDefinition, SpellDuration, SpellEffect, SpellOracle,
    SpellResolution, SpellSchool,
};
pub use templates::{CombatantTemplate, TemplateOracle};
pub use weapons::{DamageType, WeaponDefinition, WeaponKind, WeaponOracle, WeaponProperties};

use crate::config::CombatConfig;
use crate::error::CombatError;
use crate::state::{ActionId, SpellId, TemplateId, WeaponId};

/// Aggregates read-only oracles required by the resolver and the AI.
pub struct Env<'a, W, S, A, T>
where
    W: WeaponOracle + ?Sized,
    S: SpellOracle + ?Sized,
    A: ActionOracle + ?Sized,
    T: TemplateOracle + ?Sized,
{
    weapons: &'a W,
    spells: &'a S,
    actions: &'a A,
    templates: &'a T,
    rules: &'a CombatConfig,
}

pub type CombatEnv<'a> = Env<
    'a,
    dyn WeaponOracle + 'a,
    dyn SpellOracle + 'a,
    dyn ActionOracle + 'a,
    dyn TemplateOracle + 'a,
>;

impl<W, S, A, T> Clone for Env<'_, W, S, A, T>
where
    W: WeaponOracle + ?Sized,
    S: SpellOracle + ?Sized,
    A: ActionOracle + ?Sized,
    T: TemplateOracle + ?Sized,
{
    fn clone(&self) -> Self {
        *self
    }
}

impl<W, S, A, T> Copy for Env<'_, W, S, A, T>
where
    W: WeaponOracle + ?Sized,
    S: SpellOracle + ?Sized,
    A: ActionOracle + ?Sized,
    T: TemplateOracle + ?Sized,
{
}

impl<'a, W, S, A, T> Env<'a, W, S, A, T>
where
    W: WeaponOracle + ?Sized,
    S: SpellOracle + ?Sized,
    A: ActionOracle + ?Sized,
    T: TemplateOracle + ?Sized,
{
    pub fn new(
        weapons: &'a W,
        spells: &'a S,
        actions: &'a A,
        templates: &'a T,
        rules: &'a CombatConfig,
    ) -> Self {
        Self {
            weapons,
            spells,
            actions,
            templates,
            rules,
        }
    }

    pub fn weapons(&self) -> &'a W {
        self.weapons
    }

    pub fn spells(&self) -> &'a S {
        self.spells
    }

    pub fn actions(&self) -> &'a A {
        self.actions
    }

    pub fn templates(&self) -> &'a T {
        self.templates
    }

    pub fn rules(&self) -> &'a CombatConfig {
        self.rules
    }

    /// Looks up a weapon.
    ///
    /// # Errors
    ///
    /// Returns `CombatError::UnknownWeapon` if the catalog has no such id.
    pub fn weapon(&self, id: &WeaponId) -> Result<&'a WeaponDefinition, CombatError> {
        self.weapons
            .weapon(id)
            .ok_or_else(|| CombatError::UnknownWeapon(id.clone()))
    }

    /// Looks up a spell.
    ///
    /// # Errors
    ///
    /// Returns `CombatError::UnknownSpell` if the catalog has no such id.
    pub fn spell(&self, id: &SpellId) -> Result<&'a SpellDefinition, CombatError> {
        self.spells
            .spell(id)
            .ok_or_else(|| CombatError::UnknownSpell(id.clone()))
    }

    /// Looks up an action.
    ///
    /// # Errors
    ///
    /// Returns `CombatError::UnknownAction` if the catalog has no such id.
    pub fn action(&self, id: &ActionId) -> Result<&'a ActionDefinition, CombatError> {
        self.actions
            .action(id)
            .ok_or_else(|| CombatError::UnknownAction(id.clone()))
    }

    /// Looks up a combatant template.
    ///
    /// # Errors
    ///
    /// Returns `CombatError::UnknownTemplate` if the catalog has no such id.
    pub fn template(&self, id: &TemplateId) -> Result<&'a CombatantTemplate, CombatError> {
        self.templates
            .template(id)
            .ok_or_else(|| CombatError::UnknownTemplate(id.clone()))
    }
}

impl<'a, W, S, A, T> Env<'a, W, S, A, T>
where
    W: WeaponOracle + 'a,
    S: SpellOracle + 'a,
    A: ActionOracle + 'a,
    T: TemplateOracle + 'a,
{
    /// Converts this environment into the trait-object based [`CombatEnv`].
    pub fn as_combat_env(&self) -> CombatEnv<'a> {
        Env::new(
            self.weapons as &'a dyn WeaponOracle,
            self.spells as &'a dyn SpellOracle,
            self.actions as &'a dyn ActionOracle,
            self.templates as &'a dyn TemplateOracle,
            self.rules,
        )
    }
}
