//! Per-bot entity factory: the identity map for one entity kind.

use dashmap::DashMap;
use futures::future::try_join_all;
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

use super::{Entity, EntityKind};
use crate::context::BotContext;
use crate::error::{BotError, Result};

/// Maps backend ids to the single live entity for that id within one bot.
///
/// Insert-or-get is atomic on the underlying map, so concurrent `load` calls for the same id
/// always observe the same `Arc`.
pub struct EntityFactory<K: EntityKind> {
    ctx: Weak<BotContext>,
    cache: DashMap<String, Arc<Entity<K>>>,
}

impl<K: EntityKind> EntityFactory<K> {
    pub(crate) fn new(ctx: Weak<BotContext>) -> Self {
        Self {
            ctx,
            cache: DashMap::new(),
        }
    }

    /// Returns the entity for `id`, creating and caching a stub on first use. Never fetches.
    pub fn load(&self, id: &str) -> Result<Arc<Entity<K>>> {
        if id.trim().is_empty() {
            return Err(BotError::InvalidId { kind: K::NAME });
        }
        let entry = self.cache.entry(id.to_string()).or_insert_with(|| {
            debug!(kind = K::NAME, id = %id, "stub created");
            Arc::new(Entity::stub(id.to_string(), self.ctx.clone()))
        });
        Ok(Arc::clone(entry.value()))
    }

    /// `load` followed by `ready`.
    pub async fn find(&self, id: &str) -> Result<Arc<Entity<K>>> {
        let entity = self.load(id)?;
        entity.ready().await?;
        Ok(entity)
    }

    /// Loads and hydrates every id concurrently; the first failure fails the whole call.
    pub async fn find_all(&self, ids: &[String]) -> Result<Vec<Arc<Entity<K>>>> {
        try_join_all(ids.iter().map(|id| self.find(id))).await
    }

    /// Loads and hydrates every id concurrently, skipping (and logging) the ones that fail.
    pub async fn find_all_lossy(&self, ids: &[String]) -> Vec<Arc<Entity<K>>> {
        let results = futures::future::join_all(ids.iter().map(|id| self.find(id))).await;
        results
            .into_iter()
            .zip(ids)
            .filter_map(|(result, id)| match result {
                Ok(entity) => Some(entity),
                Err(e) => {
                    warn!(kind = K::NAME, id = %id, error = %e, "skipping entity that failed to hydrate");
                    None
                }
            })
            .collect()
    }

    /// Cached entity for `id`, without creating one.
    pub fn get(&self, id: &str) -> Option<Arc<Entity<K>>> {
        self.cache.get(id).map(|e| Arc::clone(e.value()))
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
