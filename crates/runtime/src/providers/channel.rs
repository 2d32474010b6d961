//! Player input delivered over a channel.

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use crate::api::{ActionProvider, Result, RuntimeError, TurnCommand, TurnRequest};

pub type CommandSender = mpsc::Sender<TurnCommand>;

/// Waits for the frontend to send the next command.
///
/// Frontends learn whose turn it is from [`crate::TurnEvent::Started`].
pub struct ChannelProvider {
    rx: Mutex<mpsc::Receiver<TurnCommand>>,
}

impl ChannelProvider {
    pub fn new(buffer: usize) -> (Self, CommandSender) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { rx: Mutex::new(rx) }, tx)
    }
}

#[async_trait]
impl ActionProvider for ChannelProvider {
    async fn provide_action(&self, request: TurnRequest<'_>) -> Result<TurnCommand> {
        tracing::debug!(entity = %request.entity, "waiting for player command");
        self.rx
            .lock()
            .await
            .recv()
            .await
            .ok_or(RuntimeError::ActionProviderChannelClosed)
    }
}
