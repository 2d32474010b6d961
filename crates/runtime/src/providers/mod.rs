//! Action provider implementations for different combatant controllers.

pub mod ai;
pub mod channel;
pub mod scripted;

pub use ai::AiProvider;
pub use channel::{ChannelProvider, CommandSender};
pub use scripted::ScriptedProvider;
