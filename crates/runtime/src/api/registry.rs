//! Provider registry for managing action providers.
//!
//! Provider instances are stored by [`ProviderKind`] and shared across
//! entities. A combatant resolves to a kind through, in order:
//!
//! ```text
//! entity binding -> faction binding -> Player faction => Player, else Npc
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use combat_core::{Combatant, EntityId, Faction};

use super::{ActionProvider, ProviderKind, Result, RuntimeError};

#[derive(Default)]
pub struct ProviderRegistry {
    /// Uses Arc so providers can be awaited without borrowing the registry.
    providers: HashMap<ProviderKind, Arc<dyn ActionProvider>>,
    entity_mappings: HashMap<EntityId, ProviderKind>,
    faction_mappings: HashMap<Faction, ProviderKind>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider for a specific kind, replacing any previous one.
    pub fn register(&mut self, kind: ProviderKind, provider: impl ActionProvider + 'static) {
        self.providers.insert(kind, Arc::new(provider));
    }

    pub fn register_shared(&mut self, kind: ProviderKind, provider: Arc<dyn ActionProvider>) {
        self.providers.insert(kind, provider);
    }

    /// Bind an entity to a specific provider kind.
    pub fn bind_entity(&mut self, entity: EntityId, kind: ProviderKind) {
        self.entity_mappings.insert(entity, kind);
    }

    /// Returns the previous binding, if any.
    pub fn unbind_entity(&mut self, entity: EntityId) -> Option<ProviderKind> {
        self.entity_mappings.remove(&entity)
    }

    /// Route every member of `faction` without an entity binding to `kind`.
    pub fn bind_faction(&mut self, faction: Faction, kind: ProviderKind) {
        self.faction_mappings.insert(faction, kind);
    }

    pub fn kind_for(&self, combatant: &Combatant) -> ProviderKind {
        if let Some(kind) = self.entity_mappings.get(&combatant.id) {
            return *kind;
        }
        if let Some(kind) = self.faction_mappings.get(&combatant.faction) {
            return *kind;
        }
        match combatant.faction {
            Faction::Player => ProviderKind::Player,
            Faction::Ally | Faction::Enemy => ProviderKind::Npc,
        }
    }

    /// Provider for `combatant`, with the kind it resolved to.
    pub fn provider_for(
        &self,
        combatant: &Combatant,
    ) -> Result<(ProviderKind, Arc<dyn ActionProvider>)> {
        let kind = self.kind_for(combatant);
        Ok((kind, self.get(kind)?))
    }

    /// # Errors
    ///
    /// Returns `RuntimeError::ProviderNotSet` if no provider is registered for this kind.
    pub fn get(&self, kind: ProviderKind) -> Result<Arc<dyn ActionProvider>> {
        self.providers
            .get(&kind)
            .cloned()
            .ok_or(RuntimeError::ProviderNotSet { kind })
    }

    pub fn has(&self, kind: ProviderKind) -> bool {
        self.providers.contains_key(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::EndTurnProvider;
    use combat_core::{Catalog, Position};

    fn spawn(template: &str, id: u32, faction: Option<Faction>) -> Combatant {
        let catalog = Catalog::standard();
        let template = catalog.env().template(&template.into()).unwrap();
        template.spawn(EntityId(id), None, faction, Position::new(0, 0))
    }

    #[test]
    fn factions_route_to_default_kinds() {
        let registry = ProviderRegistry::new();
        let hero = spawn("fighter", 1, Some(Faction::Player));
        let goblin = spawn("goblin", 2, None);
        assert_eq!(registry.kind_for(&hero), ProviderKind::Player);
        assert_eq!(registry.kind_for(&goblin), ProviderKind::Npc);
    }

    #[test]
    fn entity_binding_wins_over_faction_binding() {
        let mut registry = ProviderRegistry::new();
        let hero = spawn("fighter", 1, Some(Faction::Player));
        registry.bind_faction(Faction::Player, ProviderKind::Npc);
        assert_eq!(registry.kind_for(&hero), ProviderKind::Npc);

        registry.bind_entity(hero.id, ProviderKind::Player);
        assert_eq!(registry.kind_for(&hero), ProviderKind::Player);
        assert_eq!(registry.unbind_entity(hero.id), Some(ProviderKind::Player));
    }

    #[test]
    fn missing_provider_is_reported() {
        let mut registry = ProviderRegistry::new();
        registry.register(ProviderKind::Npc, EndTurnProvider);
        assert!(registry.has(ProviderKind::Npc));
        assert!(matches!(
            registry.get(ProviderKind::Player),
            Err(RuntimeError::ProviderNotSet {
                kind: ProviderKind::Player
            })
        ));
    }
}
