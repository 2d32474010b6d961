//! Error infrastructure for the combat core.
//!
//! Every public transition and resolver operation returns
//! `Result<_, CombatError>`. Expected failures (unknown ids, dead targets,
//! exhausted resources, range problems, wrong phase) are ordinary values that
//! the caller inspects; they never leave a state partially mutated because
//! transitions build a new state rather than editing the receiver.
//!
//! Only [`CombatError::InvariantViolation`] signals a programming defect. The
//! code paths that produce it also `debug_assert!`, so development builds fail
//! loudly while release builds surface the error to the caller.

use crate::state::{ActionCost, EntityId, Phase, Position};
use crate::state::{ActionId, SpellId, TemplateId, WeaponId};

/// Severity level of an error, used for categorization and recovery strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Can retry with the same or an alternative action (out of range, no slot).
    Recoverable,

    /// Invalid input; retrying unchanged will fail again (unknown id).
    Validation,

    /// State inconsistency; indicates a bug.
    Internal,
}

impl ErrorSeverity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
        }
    }

    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal)
    }
}

/// The five failure categories every [`CombatError`] falls into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorKind {
    NotFound,
    IllegalState,
    InsufficientResource,
    OutOfRange,
    InvariantViolation,
}

/// Common trait for errors raised by the combat crates.
pub trait GameError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns a static identifier for this error variant.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

/// Errors returned by combat transitions and the action resolver.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CombatError {
    #[error("combatant {0} not found")]
    UnknownCombatant(EntityId),

    #[error("weapon '{0}' not found in catalog")]
    UnknownWeapon(WeaponId),

    #[error("spell '{0}' not found in catalog")]
    UnknownSpell(SpellId),

    #[error("action '{0}' not found in catalog")]
    UnknownAction(ActionId),

    #[error("template '{0}' not found in catalog")]
    UnknownTemplate(TemplateId),

    #[error("combatant {entity} does not carry weapon '{weapon}'")]
    WeaponNotCarried { entity: EntityId, weapon: WeaponId },

    #[error("combatant {caster} does not know spell '{spell}'")]
    SpellNotKnown { caster: EntityId, spell: SpellId },

    #[error("combatant {entity} does not know action '{action}'")]
    ActionNotKnown { entity: EntityId, action: ActionId },

    #[error("{operation} requires phase {expected:?}, encounter is {actual:?}")]
    WrongPhase {
        operation: &'static str,
        expected: Phase,
        actual: Phase,
    },

    #[error("combat cannot start without combatants")]
    NoCombatants,

    #[error("combatant {0} already exists")]
    DuplicateCombatant(EntityId),

    #[error("combatant {0} is dead")]
    CombatantDead(EntityId),

    #[error("target {0} is dead")]
    TargetDead(EntityId),

    #[error("combatant {0} is not active")]
    CombatantInactive(EntityId),

    #[error("invalid target: {0}")]
    InvalidTarget(&'static str),

    #[error("spell '{spell}' cannot be cast at slot level {level}")]
    InvalidSlotLevel { spell: SpellId, level: u8 },

    #[error("combatant {entity} has no {cost} available")]
    ActionUnavailable { entity: EntityId, cost: ActionCost },

    #[error("combatant {caster} has no level {level} spell slot left")]
    NoSpellSlot { caster: EntityId, level: u8 },

    #[error("combatant {entity} needs {required} movement but has {remaining}")]
    InsufficientMovement {
        entity: EntityId,
        required: u32,
        remaining: u32,
    },

    #[error("target at distance {distance} is beyond range {range}")]
    OutOfRange { distance: u32, range: u32 },

    #[error("no line of sight from {from} to {to}")]
    NoLineOfSight { from: Position, to: Position },

    #[error("position {0} is outside the grid")]
    OutOfBounds(Position),

    #[error("position {0} cannot be entered")]
    Impassable(Position),

    #[error("position {position} is occupied by {occupant}")]
    CellOccupied {
        position: Position,
        occupant: EntityId,
    },

    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl CombatError {
    /// Maps this error onto the failure taxonomy.
    pub fn kind(&self) -> ErrorKind {
        use CombatError::*;
        match self {
            UnknownCombatant(_)
            | UnknownWeapon(_)
            | UnknownSpell(_)
            | UnknownAction(_)
            | UnknownTemplate(_)
            | WeaponNotCarried { .. }
            | SpellNotKnown { .. }
            | ActionNotKnown { .. } => ErrorKind::NotFound,

            WrongPhase { .. }
            | NoCombatants
            | DuplicateCombatant(_)
            | CombatantDead(_)
            | TargetDead(_)
            | CombatantInactive(_)
            | InvalidTarget(_)
            | InvalidSlotLevel { .. }
            | CellOccupied { .. } => ErrorKind::IllegalState,

            ActionUnavailable { .. } | NoSpellSlot { .. } | InsufficientMovement { .. } => {
                ErrorKind::InsufficientResource
            }

            OutOfRange { .. } | NoLineOfSight { .. } | OutOfBounds(_) | Impassable(_) => {
                ErrorKind::OutOfRange
            }

            InvariantViolation(_) => ErrorKind::InvariantViolation,
        }
    }

    /// Builds an invariant violation, asserting in debug builds.
    #[track_caller]
    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        let message = message.into();
        debug_assert!(false, "invariant violated: {message}");
        Self::InvariantViolation(message)
    }
}

impl GameError for CombatError {
    fn severity(&self) -> ErrorSeverity {
        match self.kind() {
            ErrorKind::NotFound => ErrorSeverity::Validation,
            ErrorKind::IllegalState => ErrorSeverity::Validation,
            ErrorKind::InsufficientResource | ErrorKind::OutOfRange => {
                ErrorSeverity::Recoverable
            }
            ErrorKind::InvariantViolation => ErrorSeverity::Internal,
        }
    }

    fn error_code(&self) -> &'static str {
        use CombatError::*;
        match self {
            UnknownCombatant(_) => "COMBAT_UNKNOWN_COMBATANT",
            UnknownWeapon(_) => "COMBAT_UNKNOWN_WEAPON",
            UnknownSpell(_) => "COMBAT_UNKNOWN_SPELL",
            UnknownAction(_) => "COMBAT_UNKNOWN_ACTION",
            UnknownTemplate(_) => "COMBAT_UNKNOWN_TEMPLATE",
            WeaponNotCarried { .. } => "COMBAT_WEAPON_NOT_CARRIED",
            SpellNotKnown { .. } => "COMBAT_SPELL_NOT_KNOWN",
            ActionNotKnown { .. } => "COMBAT_ACTION_NOT_KNOWN",
            WrongPhase { .. } => "COMBAT_WRONG_PHASE",
            NoCombatants => "COMBAT_NO_COMBATANTS",
            DuplicateCombatant(_) => "COMBAT_DUPLICATE_COMBATANT",
            CombatantDead(_) => "COMBAT_COMBATANT_DEAD",
            TargetDead(_) => "COMBAT_TARGET_DEAD",
            CombatantInactive(_) => "COMBAT_COMBATANT_INACTIVE",
            InvalidTarget(_) => "COMBAT_INVALID_TARGET",
            InvalidSlotLevel { .. } => "COMBAT_INVALID_SLOT_LEVEL",
            ActionUnavailable { .. } => "COMBAT_ACTION_UNAVAILABLE",
            NoSpellSlot { .. } => "COMBAT_NO_SPELL_SLOT",
            InsufficientMovement { .. } => "COMBAT_INSUFFICIENT_MOVEMENT",
            OutOfRange { .. } => "COMBAT_OUT_OF_RANGE",
            NoLineOfSight { .. } => "COMBAT_NO_LINE_OF_SIGHT",
            OutOfBounds(_) => "COMBAT_OUT_OF_BOUNDS",
            Impassable(_) => "COMBAT_IMPASSABLE",
            CellOccupied { .. } => "COMBAT_CELL_OCCUPIED",
            InvariantViolation(_) => "COMBAT_INVARIANT_VIOLATION",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_errors_are_recoverable() {
        let err = CombatError::NoSpellSlot {
            caster: EntityId(3),
            level: 3,
        };
        assert_eq!(err.kind(), ErrorKind::InsufficientResource);
        assert!(err.severity().is_recoverable());
        assert_eq!(err.error_code(), "COMBAT_NO_SPELL_SLOT");
    }

    #[test]
    fn phase_errors_are_illegal_state() {
        let err = CombatError::WrongPhase {
            operation: "add_entity",
            expected: Phase::Setup,
            actual: Phase::Active,
        };
        assert_eq!(err.kind(), ErrorKind::IllegalState);
        assert_eq!(err.severity(), ErrorSeverity::Validation);
    }
}
