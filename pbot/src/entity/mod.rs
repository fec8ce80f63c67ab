//! Identity map entities.
//!
//! Every backend id maps to exactly one [`Entity`] per bot, created as a stub by
//! [`EntityFactory::load`] and hydrated lazily by [`Entity::ready`]. Hydration state is an
//! explicit field: reading attributes of an entity that never reached Ready yields
//! [`BotError::NotReady`] instead of empty values.

mod contact;
mod factory;
mod friendship;
mod message;
mod post;
mod room;
mod room_invitation;

pub use contact::{Contact, ContactKind};
pub use factory::EntityFactory;
pub use friendship::{Friendship, FriendshipKind};
pub use message::{Message, MessageKind};
pub use post::{Post, PostKind};
pub use room::{Room, RoomKind};
pub use room_invitation::{RoomInvitation, RoomInvitationKind};

use futures::future::{BoxFuture, FutureExt, Shared};
use pbot_core::{Puppet, PuppetResult};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::context::BotContext;
use crate::error::{BotError, Result};
use crate::events::Listeners;

/// Binds an entity type to its payload, its scoped event type and the backend call that
/// fetches it.
pub trait EntityKind: Send + Sync + 'static {
    type Payload: Clone + Send + Sync + 'static;
    type Event: Send + Sync + 'static;

    /// Kind name used in logs and errors.
    const NAME: &'static str;

    fn fetch(puppet: Arc<dyn Puppet>, id: String) -> BoxFuture<'static, PuppetResult<Self::Payload>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum HydrationState {
    /// Created by `load`, never fetched.
    Stub,
    Hydrating,
    Ready,
    Failed,
}

type Hydration<P> = Shared<BoxFuture<'static, Result<P>>>;

struct Slot<P> {
    state: HydrationState,
    payload: Option<P>,
    /// In-flight fetch tagged with the generation that started it.
    inflight: Option<(u64, Hydration<P>)>,
    dirty: bool,
    generation: u64,
}

/// A cached, lazily hydrated domain object owned by one bot.
pub struct Entity<K: EntityKind> {
    id: String,
    ctx: Weak<BotContext>,
    slot: Mutex<Slot<K::Payload>>,
    events: Listeners<K::Event>,
}

impl<K: EntityKind> Entity<K> {
    pub(crate) fn stub(id: String, ctx: Weak<BotContext>) -> Self {
        Self {
            id,
            ctx,
            slot: Mutex::new(Slot {
                state: HydrationState::Stub,
                payload: None,
                inflight: None,
                dirty: false,
                generation: 0,
            }),
            events: Listeners::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn hydration_state(&self) -> HydrationState {
        self.lock().state
    }

    /// True once a payload is loaded and no invalidation is pending.
    pub fn is_ready(&self) -> bool {
        let slot = self.lock();
        slot.state == HydrationState::Ready && !slot.dirty
    }

    /// Hydrates the entity from the backend.
    ///
    /// Returns immediately when already Ready and not dirty. Otherwise the first caller starts
    /// the fetch and every concurrent caller awaits that same fetch, so the backend sees one
    /// request. Failures move the entity to Failed and are returned to every waiter; the next
    /// call retries.
    pub async fn ready(&self) -> Result<()> {
        let (generation, hydration) = {
            let mut slot = self.lock();
            if slot.state == HydrationState::Ready && !slot.dirty {
                return Ok(());
            }
            let inflight = slot
                .inflight
                .as_ref()
                .map(|(generation, hydration)| (*generation, hydration.clone()));
            match inflight {
                Some(joined) => joined,
                None => {
                    let puppet = self.puppet()?;
                    slot.generation += 1;
                    let generation = slot.generation;
                    let id = self.id.clone();
                    let hydration = K::fetch(puppet, id.clone())
                        .map(move |r| r.map_err(|e| BotError::hydration(K::NAME, id, e)))
                        .boxed()
                        .shared();
                    slot.inflight = Some((generation, hydration.clone()));
                    slot.state = HydrationState::Hydrating;
                    slot.dirty = false;
                    debug!(kind = K::NAME, id = %self.id, generation, "step: hydration started");
                    (generation, hydration)
                }
            }
        };

        let result = hydration.await;

        let mut slot = self.lock();
        let owns_inflight = matches!(&slot.inflight, Some((g, _)) if *g == generation);
        if owns_inflight {
            slot.inflight = None;
            match &result {
                Ok(payload) => {
                    slot.payload = Some(payload.clone());
                    slot.state = HydrationState::Ready;
                    debug!(kind = K::NAME, id = %self.id, "step: hydration done");
                }
                Err(e) => {
                    slot.state = HydrationState::Failed;
                    warn!(kind = K::NAME, id = %self.id, error = %e, "hydration failed");
                }
            }
        }
        result.map(|_| ())
    }

    /// Marks the cached payload stale; the next [`Entity::ready`] re-fetches. The stale payload
    /// stays readable until then.
    pub fn invalidate(&self) {
        self.lock().dirty = true;
        debug!(kind = K::NAME, id = %self.id, "payload marked dirty");
    }

    /// Clone of the current payload.
    pub fn payload(&self) -> Result<K::Payload> {
        self.with_payload(Clone::clone)
    }

    /// Reads the payload without cloning it; fails with `NotReady` before the first hydration.
    pub fn with_payload<R>(&self, f: impl FnOnce(&K::Payload) -> R) -> Result<R> {
        let slot = self.lock();
        slot.payload.as_ref().map(f).ok_or_else(|| BotError::NotReady {
            kind: K::NAME,
            id: self.id.clone(),
        })
    }

    /// Registers a listener for events scoped to this entity.
    pub fn on(&self, listener: impl Fn(&K::Event) + Send + Sync + 'static) {
        self.events.add(listener);
    }

    pub(crate) fn emit(&self, event: &K::Event) {
        self.events.emit(event);
    }

    pub(crate) fn context(&self) -> Result<Arc<BotContext>> {
        self.ctx.upgrade().ok_or(BotError::InstanceDropped)
    }

    pub(crate) fn puppet(&self) -> Result<Arc<dyn Puppet>> {
        self.context()?.puppet()
    }

    fn lock(&self) -> MutexGuard<'_, Slot<K::Payload>> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<K: EntityKind> Entity<K>
where
    K::Event: Clone,
{
    /// Channel receiving every event scoped to this entity.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<K::Event> {
        self.events.subscribe()
    }
}

impl<K: EntityKind> fmt::Debug for Entity<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(K::NAME)
            .field("id", &self.id)
            .field("state", &self.hydration_state())
            .finish()
    }
}
