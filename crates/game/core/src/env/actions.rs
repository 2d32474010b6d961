//! Action catalog interface.

use crate::rules::DiceFormula;
use crate::state::{ActionCost, ActionId};

/// Oracle resolving action ids to definitions.
pub trait ActionOracle: Send + Sync {
    fn action(&self, id: &ActionId) -> Option<&ActionDefinition>;

    /// Actions every combatant may take without knowing them explicitly.
    fn universal_actions(&self) -> Vec<&ActionDefinition>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActionCategory {
    Attack,
    Dodge,
    Dash,
    Disengage,
    Hide,
    Help,
    Heal,
    Utility,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionDefinition {
    pub id: ActionId,
    pub name: String,
    pub category: ActionCategory,
    pub cost: ActionCost,
    pub damage: Option<DiceFormula>,
    pub healing: Option<DiceFormula>,
    /// Range in squares.
    pub range: u32,
    pub requires_target: bool,
    /// Taking this action next to a hostile invites an opportunity attack.
    pub provokes_opportunity: bool,
    /// Available to every combatant.
    pub universal: bool,
}

impl ActionDefinition {
    pub fn new(id: impl Into<ActionId>, name: &str, category: ActionCategory) -> Self {
        Self {
            id: id.into(),
            name: name.to_owned(),
            category,
            cost: ActionCost::Action,
            damage: None,
            healing: None,
            range: 0,
            requires_target: false,
            provokes_opportunity: false,
            universal: false,
        }
    }

    /// One of the standard actions every combatant knows.
    pub fn standard(id: impl Into<ActionId>, name: &str, category: ActionCategory) -> Self {
        let mut def = Self::new(id, name, category);
        def.universal = true;
        if category == ActionCategory::Help {
            def.range = 1;
            def.requires_target = true;
        }
        def
    }

    pub fn costing(mut self, cost: ActionCost) -> Self {
        self.cost = cost;
        self
    }

    pub fn dealing(mut self, damage: DiceFormula, range: u32) -> Self {
        self.damage = Some(damage);
        self.range = range;
        self.requires_target = true;
        self
    }

    pub fn healing(mut self, healing: DiceFormula, range: u32) -> Self {
        self.healing = Some(healing);
        self.range = range;
        self
    }

    pub fn provoking(mut self) -> Self {
        self.provokes_opportunity = true;
        self
    }
}
