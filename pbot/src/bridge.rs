//! Puppet event bridge.
//!
//! Translates raw [`PuppetEvent`]s into hydrated [`BotEvent`]s plus room- and contact-scoped
//! events. Every referenced entity is hydrated before anything is emitted; when a hydration
//! fails the domain event for that occurrence is dropped and an `error` event is emitted
//! instead. Each backend event runs on its own task, so a slow hydration never blocks the
//! events behind it.

use futures::future::try_join;
use pbot_core::{timestamp_to_date, PuppetError, PuppetEvent};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::context::BotContext;
use crate::error::{BotError, Result};
use crate::events::{BotEvent, ContactEvent, RoomEvent};
use crate::state::{StateSwitch, SwitchState};

/// Starts forwarding backend events into `ctx`. Ends when the backend channel closes, the bot
/// is dropped, or the returned handle is aborted.
pub(crate) fn spawn(
    ctx: Weak<BotContext>,
    switch: Arc<StateSwitch>,
    mut events: broadcast::Receiver<PuppetEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let Some(ctx) = ctx.upgrade() else {
                        break;
                    };
                    let switch = Arc::clone(&switch);
                    tokio::spawn(async move { dispatch(&ctx, &switch, event).await });
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "bridge lagged behind the backend, events dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
        debug!("bridge stopped");
    })
}

/// Handles one backend event; failures become a bot-level `error` event.
pub(crate) async fn dispatch(ctx: &BotContext, switch: &StateSwitch, event: PuppetEvent) {
    let name = event.name();
    debug!(bot = %ctx.name, event = name, "bridge: backend event");
    if let Err(e) = handle(ctx, switch, event).await {
        error!(bot = %ctx.name, event = name, error = %e, "bridge: event dropped");
        ctx.emit(BotEvent::Error(e));
    }
}

async fn handle(ctx: &BotContext, switch: &StateSwitch, event: PuppetEvent) -> Result<()> {
    match event {
        PuppetEvent::Dong { data } => ctx.emit(BotEvent::Dong { data }),

        PuppetEvent::Error { data } => {
            ctx.emit(BotEvent::Error(BotError::Puppet(PuppetError::Protocol(data))))
        }

        PuppetEvent::Heartbeat { data } => ctx.emit(BotEvent::Heartbeat { data }),

        PuppetEvent::Friendship { friendship_id } => {
            let friendship = ctx.friendships.find(&friendship_id).await?;
            let contact = friendship.contact()?;
            ctx.emit(BotEvent::Friendship(Arc::clone(&friendship)));
            contact.emit(&ContactEvent::Friendship(friendship));
        }

        PuppetEvent::Login { contact_id, data } => {
            let contact = ctx.contacts.find(&contact_id).await?;
            info!(bot = %ctx.name, contact_id = %contact_id, data = ?data, "step: logged in");
            ctx.emit(BotEvent::Login(contact));
        }

        PuppetEvent::Logout { contact_id, data } => {
            let contact = ctx.contacts.find(&contact_id).await?;
            info!(bot = %ctx.name, contact_id = %contact_id, "step: logged out");
            ctx.emit(BotEvent::Logout {
                contact,
                reason: data,
            });
        }

        PuppetEvent::Message { message_id } => {
            let message = ctx.messages.find(&message_id).await?;
            let room = message.room()?;
            let talker = message.talker()?;
            match &room {
                Some(room) => {
                    try_join(talker.ready(), room.ready()).await?;
                }
                None => talker.ready().await?,
            }
            ctx.emit(BotEvent::Message(Arc::clone(&message)));
            if let Some(room) = room {
                room.emit(&RoomEvent::Message(message));
            }
        }

        PuppetEvent::Ready => {
            // A stop may have re-armed the ready axis while this event was in flight.
            let state = switch.current();
            if matches!(state, SwitchState::Off | SwitchState::PendingOff) {
                debug!(bot = %ctx.name, state = ?state, "ready ignored, bot is stopping");
                return Ok(());
            }
            ctx.emit(BotEvent::Ready);
            switch.set_ready(true);
            info!(bot = %ctx.name, "step: backend ready");
        }

        PuppetEvent::RoomInvite { room_invitation_id } => {
            let invitation = ctx.room_invitations.load(&room_invitation_id)?;
            ctx.emit(BotEvent::RoomInvite(invitation));
        }

        PuppetEvent::RoomJoin {
            room_id,
            invitee_ids,
            inviter_id,
            timestamp,
        } => {
            let room = ctx.rooms.load(&room_id)?;
            room.sync().await?;
            let (invitees, inviter) = try_join(
                ctx.contacts.find_all(&invitee_ids),
                ctx.contacts.find(&inviter_id),
            )
            .await?;
            let date = timestamp_to_date(timestamp);

            ctx.emit(BotEvent::RoomJoin {
                room: Arc::clone(&room),
                invitees: invitees.clone(),
                inviter: Arc::clone(&inviter),
                date,
            });
            room.emit(&RoomEvent::Join {
                invitees,
                inviter,
                date,
            });
        }

        PuppetEvent::RoomLeave {
            room_id,
            removee_ids,
            remover_id,
            timestamp,
        } => {
            let room = ctx.rooms.load(&room_id)?;
            room.sync().await?;
            let (leavers, remover) = try_join(
                ctx.contacts.find_all(&removee_ids),
                ctx.contacts.find(&remover_id),
            )
            .await?;
            let date = timestamp_to_date(timestamp);

            let self_left = ctx
                .puppet()?
                .self_id()
                .is_some_and(|self_id| removee_ids.contains(&self_id));
            if self_left {
                info!(bot = %ctx.name, room_id = %room_id, "step: removed from room, dropping cached room data");
                room.dirty().await?;
            }

            ctx.emit(BotEvent::RoomLeave {
                room: Arc::clone(&room),
                leavers: leavers.clone(),
                remover: Arc::clone(&remover),
                date,
            });
            room.emit(&RoomEvent::Leave {
                leavers,
                remover,
                date,
            });
        }

        PuppetEvent::RoomTopic {
            room_id,
            new_topic,
            old_topic,
            changer_id,
            timestamp,
        } => {
            let room = ctx.rooms.load(&room_id)?;
            room.sync().await?;
            let changer = ctx.contacts.find(&changer_id).await?;
            let date = timestamp_to_date(timestamp);

            ctx.emit(BotEvent::RoomTopic {
                room: Arc::clone(&room),
                new_topic: new_topic.clone(),
                old_topic: old_topic.clone(),
                changer: Arc::clone(&changer),
                date,
            });
            room.emit(&RoomEvent::Topic {
                new_topic,
                old_topic,
                changer,
                date,
            });
        }

        PuppetEvent::Scan {
            qrcode,
            status,
            data,
        } => ctx.emit(BotEvent::Scan {
            qrcode,
            status,
            data,
        }),

        PuppetEvent::Reset { data } => {
            debug!(bot = %ctx.name, reason = %data, "backend reset, not propagated");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Target;

    fn bot_events(ctx: &BotContext) -> tokio::sync::mpsc::UnboundedReceiver<BotEvent> {
        ctx.events.subscribe()
    }

    #[tokio::test]
    async fn test_ready_while_starting_marks_ready() {
        let ctx = BotContext::new("id".into(), "bot".into(), 10);
        let switch = StateSwitch::new();
        let mut events = bot_events(&ctx);
        switch.claim(Target::On);

        dispatch(&ctx, &switch, PuppetEvent::Ready).await;

        assert!(switch.is_ready());
        assert_eq!(events.try_recv().map(|e| e.name()), Ok("ready"));
    }

    #[tokio::test]
    async fn test_ready_after_stop_is_ignored() {
        let ctx = BotContext::new("id".into(), "bot".into(), 10);
        let switch = StateSwitch::new();
        let mut events = bot_events(&ctx);

        dispatch(&ctx, &switch, PuppetEvent::Ready).await;
        assert!(!switch.is_ready());

        switch.claim(Target::On);
        switch.settle(SwitchState::On);
        switch.claim(Target::Off);
        dispatch(&ctx, &switch, PuppetEvent::Ready).await;

        assert!(!switch.is_ready());
        assert!(events.try_recv().is_err());
    }
}
