//! Tactical AI action provider.

use async_trait::async_trait;
use combat_ai::{BehaviorCatalog, DecisionMaker, PriorityCriteria};

use crate::api::{ActionProvider, Result, TurnCommand, TurnRequest};

/// Asks the [`DecisionMaker`] for one request at a time.
///
/// Movement is left out of the candidates right after a move, so a turn never
/// chains two moves back to back. When nothing scores above zero the
/// combatant ends its turn.
#[derive(Debug, Clone, Default)]
pub struct AiProvider {
    decisions: DecisionMaker,
}

impl AiProvider {
    pub fn new(behaviors: BehaviorCatalog, criteria: PriorityCriteria) -> Self {
        Self {
            decisions: DecisionMaker::new(behaviors, criteria),
        }
    }

    pub fn decisions(&self) -> &DecisionMaker {
        &self.decisions
    }
}

#[async_trait]
impl ActionProvider for AiProvider {
    async fn provide_action(&self, request: TurnRequest<'_>) -> Result<TurnCommand> {
        let choice = self.decisions.decide_step(
            request.state,
            request.env,
            request.entity,
            !request.just_moved(),
        )?;

        Ok(match choice {
            Some(choice) => {
                tracing::debug!(
                    entity = %request.entity,
                    action = %choice.action,
                    priority = choice.priority,
                    "ai request"
                );
                TurnCommand::Act(choice.action)
            }
            None => {
                if request.taken.is_empty() {
                    tracing::warn!(
                        entity = %request.entity,
                        "no worthwhile request found, ending turn"
                    );
                }
                TurnCommand::EndTurn
            }
        })
    }
}
