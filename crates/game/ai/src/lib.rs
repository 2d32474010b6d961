//! Tactical AI for non-player combatants.
//!
//! Every entry point is a function of an explicit [`combat_core::CombatState`];
//! nothing here holds on to the encounter between calls.
//!
//! # Pipeline
//!
//! ```text
//! CombatContext (blackboard for one decision)
//!   -> Threat assessment (who is dangerous, which cells are safe)
//!   -> Behavior pattern scores each Intent
//!   -> Prioritizer enumerates legal requests, predicts their outcome,
//!      and ranks them under PriorityCriteria
//!   -> DecisionMaker resolves the winner
//! ```
pub mod behavior;
pub mod context;
pub mod decision;
pub mod error;
pub mod prioritizer;
pub mod scoring;
pub mod threat;

pub use behavior::{
    Archetype, BehaviorCatalog, BehaviorPattern, EngagementRange, Intent, score_intent,
    select_intent,
};
pub use context::CombatContext;
pub use decision::{DecisionMaker, MAX_STEPS_PER_TURN, TurnReport};
pub use error::{AiError, Result};
pub use prioritizer::{PrioritizedAction, Prediction, PriorityCriteria, prioritize};
pub use scoring::Score;
pub use threat::{
    AreaThreat, DefensiveAssessment, PriorityTarget, ThreatAnalysis, ThreatLevel, ThreatWeights,
    analyze_threat, assess_area_threats, assess_defenses, identify_priority_targets,
};
