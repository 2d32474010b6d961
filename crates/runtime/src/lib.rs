//! Encounter orchestration for the combat engine.
//!
//! This crate wires the rules of `combat-core` and the tactical AI of
//! `combat-ai` into an async turn loop. Consumers build a [`Runtime`], plug
//! in an [`ActionProvider`] per controller kind, subscribe to events, and
//! drive the encounter with [`Runtime::run`] or one turn at a time.
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the orchestrator, its builder and configuration
//! - [`api`] exposes the types downstream clients interact with
//! - [`events`] provides topic-based event bus for flexible event routing
//! - [`providers`] ships AI, scripted and channel-fed providers
//! - [`scenario`] loads encounters from RON files
pub mod api;
pub mod events;
pub mod providers;
pub mod runtime;
pub mod scenario;

pub use api::{
    ActionProvider, EndTurnProvider, ProviderKind, ProviderRegistry, Result, RuntimeError,
    TurnCommand, TurnRequest,
};
pub use events::{ActionEvent, CombatEvent, Event, EventBus, Topic, TurnEvent};
pub use providers::{AiProvider, ChannelProvider, CommandSender, ScriptedProvider};
pub use runtime::{CombatSummary, Runtime, RuntimeBuilder, RuntimeConfig, TurnSummary};
pub use scenario::Scenario;
