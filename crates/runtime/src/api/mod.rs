//! Public runtime API surface.
//!
//! This module gathers the types exposed to consumers of the runtime crate so
//! the orchestrator can stay focused on driving turns.

pub mod errors;
pub mod providers;
pub mod registry;

pub use errors::{ProviderKind, Result, RuntimeError};
pub use providers::{ActionProvider, EndTurnProvider, TurnCommand, TurnRequest};
pub use registry::ProviderRegistry;
