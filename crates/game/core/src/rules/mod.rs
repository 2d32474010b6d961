//! Rule formulas shared by the action resolver and outcome prediction.
//!
//! Everything here is a pure function of combatants and catalog entries.
//! The resolver rolls against these numbers; the AI takes their expectation.
pub mod attack;
mod formula;
pub mod spell;

pub use formula::{DiceFormula, FormulaError};
