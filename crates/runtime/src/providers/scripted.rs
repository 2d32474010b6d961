//! Replays a fixed queue of commands.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::api::{ActionProvider, Result, TurnCommand, TurnRequest};

/// Hands out queued commands in order; ends every turn once the queue is
/// drained.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    queue: Mutex<VecDeque<TurnCommand>>,
}

impl ScriptedProvider {
    pub fn new(commands: impl IntoIterator<Item = TurnCommand>) -> Self {
        Self {
            queue: Mutex::new(commands.into_iter().collect()),
        }
    }

    pub async fn push(&self, command: TurnCommand) {
        self.queue.lock().await.push_back(command);
    }

    pub async fn remaining(&self) -> usize {
        self.queue.lock().await.len()
    }
}

#[async_trait]
impl ActionProvider for ScriptedProvider {
    async fn provide_action(&self, _request: TurnRequest<'_>) -> Result<TurnCommand> {
        Ok(self
            .queue
            .lock()
            .await
            .pop_front()
            .unwrap_or(TurnCommand::EndTurn))
    }
}
