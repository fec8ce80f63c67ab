//! # puppet-mock
//!
//! In-memory implementation of [`pbot_core::Puppet`]. Payloads are seeded by the caller, events
//! are pushed with [`MockPuppet::emit`], and every backend call is recorded so tests can assert
//! on fetch counts, dirty calls and posted moments without a real chat network.

use async_trait::async_trait;
use dashmap::DashMap;
use pbot_core::{
    ContactPayload, FileBox, FriendshipPayload, FriendshipType, MessagePayload, MessageType,
    MomentPayload, PaginationRequest, PaginationResponse, PostPayload, PostQuery, Puppet,
    PuppetError, PuppetEvent, PuppetResult, RoomInvitationPayload, RoomPayload, Sayable,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info};

const EVENT_CAPACITY: usize = 256;
const DEFAULT_PAGE_SIZE: usize = 10;

/// One recorded backend call: operation name plus its main argument (id, text, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub op: &'static str,
    pub arg: String,
}

/// In-memory backend. Cheap to share behind `Arc`.
pub struct MockPuppet {
    name: String,
    events: broadcast::Sender<PuppetEvent>,
    self_id: Mutex<Option<String>>,
    logged_in: AtomicBool,
    login_on_start: AtomicBool,
    contacts: DashMap<String, ContactPayload>,
    rooms: DashMap<String, RoomPayload>,
    messages: DashMap<String, MessagePayload>,
    friendships: DashMap<String, FriendshipPayload>,
    room_invitations: DashMap<String, RoomInvitationPayload>,
    posts: DashMap<String, PostPayload>,
    post_order: Mutex<Vec<String>>,
    failures: DashMap<String, PuppetError>,
    start_failure: Mutex<Option<PuppetError>>,
    latency: Mutex<Option<Duration>>,
    calls: Mutex<Vec<MockCall>>,
    signature: Mutex<Option<String>>,
    coverage: Mutex<Option<FileBox>>,
    seq: AtomicU64,
}

impl MockPuppet {
    pub fn new(name: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            name: name.into(),
            events,
            self_id: Mutex::new(None),
            logged_in: AtomicBool::new(false),
            login_on_start: AtomicBool::new(false),
            contacts: DashMap::new(),
            rooms: DashMap::new(),
            messages: DashMap::new(),
            friendships: DashMap::new(),
            room_invitations: DashMap::new(),
            posts: DashMap::new(),
            post_order: Mutex::new(Vec::new()),
            failures: DashMap::new(),
            start_failure: Mutex::new(None),
            latency: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            signature: Mutex::new(None),
            coverage: Mutex::new(None),
            seq: AtomicU64::new(0),
        }
    }

    /// A backend seeded with a self account, one friend and one room. `start()` logs in and
    /// reports ready, so a bot built on it reaches Ready without further scripting.
    pub fn demo() -> Self {
        let puppet = Self::new("mock");
        let me = ContactPayload::new("mock-self", "Mock Bot");
        let friend = ContactPayload::new("mock-friend", "Mock Friend");
        puppet.add_room(RoomPayload::new(
            "mock-room",
            "Mock Room",
            vec![me.id.clone(), friend.id.clone()],
        ));
        puppet.add_contact(friend);
        puppet.set_self(me);
        puppet.login_on_start.store(true, Ordering::SeqCst);
        puppet
    }

    // --- seeding ---

    /// Seeds the account the backend is logged in as (takes effect on `login` or `start`).
    pub fn set_self(&self, contact: ContactPayload) {
        self.lock_self().replace(contact.id.clone());
        self.add_contact(contact);
    }

    /// When set, `start()` emits `login` for the seeded self account followed by `ready`.
    pub fn set_login_on_start(&self, enabled: bool) {
        self.login_on_start.store(enabled, Ordering::SeqCst);
    }

    pub fn add_contact(&self, payload: ContactPayload) {
        self.contacts.insert(payload.id.clone(), payload);
    }

    pub fn add_room(&self, payload: RoomPayload) {
        self.rooms.insert(payload.id.clone(), payload);
    }

    pub fn add_message(&self, payload: MessagePayload) {
        self.messages.insert(payload.id.clone(), payload);
    }

    pub fn add_friendship(&self, payload: FriendshipPayload) {
        self.friendships.insert(payload.id.clone(), payload);
    }

    pub fn add_room_invitation(&self, payload: RoomInvitationPayload) {
        self.room_invitations.insert(payload.id.clone(), payload);
    }

    /// Seeds an existing post (appended to the listing order).
    pub fn add_post(&self, payload: PostPayload) {
        self.lock_order().push(payload.id.clone());
        self.posts.insert(payload.id.clone(), payload);
    }

    /// Makes every payload fetch for `id` fail with `error` until [`MockPuppet::clear_failure`].
    pub fn fail_payload(&self, id: impl Into<String>, error: PuppetError) {
        self.failures.insert(id.into(), error);
    }

    pub fn clear_failure(&self, id: &str) {
        self.failures.remove(id);
    }

    /// Makes the next `start()` fail with `error`.
    pub fn fail_next_start(&self, error: PuppetError) {
        *self.start_failure.lock().unwrap_or_else(|e| e.into_inner()) = Some(error);
    }

    /// Adds artificial latency to payload fetches and start.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock().unwrap_or_else(|e| e.into_inner()) = latency;
    }

    // --- scripting ---

    /// Pushes a raw backend event to all subscribers. Returns the number of receivers.
    pub fn emit(&self, event: PuppetEvent) -> usize {
        debug!(puppet = %self.name, event = event.name(), "mock emit");
        self.events.send(event).unwrap_or(0)
    }

    /// Marks `contact_id` as logged in and emits `login`.
    pub fn login(&self, contact_id: &str) {
        self.lock_self().replace(contact_id.to_string());
        self.logged_in.store(true, Ordering::SeqCst);
        self.emit(PuppetEvent::Login {
            contact_id: contact_id.to_string(),
            data: None,
        });
    }

    /// Seeds a text message and emits the `message` event for it.
    pub fn receive_text(
        &self,
        talker_id: &str,
        room_id: Option<&str>,
        text: &str,
    ) -> String {
        let id = self.next_id("msg");
        self.add_message(MessagePayload {
            id: id.clone(),
            talker_id: talker_id.to_string(),
            room_id: room_id.map(str::to_string),
            listener_id: match room_id {
                Some(_) => None,
                None => self.self_id(),
            },
            text: text.to_string(),
            message_type: MessageType::Text,
            timestamp: chrono::Utc::now().timestamp_millis(),
        });
        self.emit(PuppetEvent::Message {
            message_id: id.clone(),
        });
        id
    }

    // --- inspection ---

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self, op: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|c| c.op == op)
            .count()
    }

    pub fn was_called_with(&self, op: &str, arg: &str) -> bool {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|c| c.op == op && c.arg == arg)
    }

    pub fn post(&self, post_id: &str) -> Option<PostPayload> {
        self.posts.get(post_id).map(|p| p.value().clone())
    }

    pub fn friendship(&self, friendship_id: &str) -> Option<FriendshipPayload> {
        self.friendships.get(friendship_id).map(|p| p.value().clone())
    }

    pub fn message(&self, message_id: &str) -> Option<MessagePayload> {
        self.messages.get(message_id).map(|p| p.value().clone())
    }

    // --- internals ---

    fn record(&self, op: &'static str, arg: impl Into<String>) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(MockCall {
                op,
                arg: arg.into(),
            });
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}-{}", prefix, n)
    }

    fn lock_self(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.self_id.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_order(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.post_order.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn delay(&self) {
        let latency = *self.latency.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(d) = latency {
            tokio::time::sleep(d).await;
        }
    }

    async fn fetch<T: Clone + Send + Sync>(
        &self,
        op: &'static str,
        kind: &str,
        id: &str,
        map: &DashMap<String, T>,
    ) -> PuppetResult<T> {
        self.record(op, id);
        self.delay().await;
        if let Some(err) = self.failures.get(id) {
            return Err(err.value().clone());
        }
        map.get(id)
            .map(|p| p.value().clone())
            .ok_or_else(|| PuppetError::not_found(kind, id))
    }
}

#[async_trait]
impl Puppet for MockPuppet {
    fn name(&self) -> &str {
        &self.name
    }

    fn subscribe(&self) -> broadcast::Receiver<PuppetEvent> {
        self.events.subscribe()
    }

    async fn start(&self) -> PuppetResult<()> {
        self.record("start", "");
        self.delay().await;
        let failure = self
            .start_failure
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(err) = failure {
            return Err(err);
        }
        info!(puppet = %self.name, "mock puppet started");

        if self.login_on_start.load(Ordering::SeqCst) {
            if let Some(id) = self.self_id() {
                self.login(&id);
                self.emit(PuppetEvent::Ready);
            }
        }
        Ok(())
    }

    async fn stop(&self) -> PuppetResult<()> {
        self.record("stop", "");
        self.logged_in.store(false, Ordering::SeqCst);
        info!(puppet = %self.name, "mock puppet stopped");
        Ok(())
    }

    async fn logout(&self) -> PuppetResult<()> {
        self.record("logout", "");
        let id = self.self_id().ok_or(PuppetError::NotLoggedIn)?;
        self.logged_in.store(false, Ordering::SeqCst);
        self.emit(PuppetEvent::Logout {
            contact_id: id,
            data: Some("logout requested".to_string()),
        });
        Ok(())
    }

    fn logonoff(&self) -> bool {
        self.logged_in.load(Ordering::SeqCst)
    }

    fn self_id(&self) -> Option<String> {
        self.lock_self().clone()
    }

    async fn ding(&self, data: Option<String>) -> PuppetResult<()> {
        self.record("ding", data.clone().unwrap_or_default());
        self.emit(PuppetEvent::Dong { data });
        Ok(())
    }

    fn unref(&self) {
        self.record("unref", "");
    }

    async fn contact_payload(&self, contact_id: &str) -> PuppetResult<ContactPayload> {
        self.fetch("contact_payload", "contact", contact_id, &self.contacts)
            .await
    }

    async fn room_payload(&self, room_id: &str) -> PuppetResult<RoomPayload> {
        self.fetch("room_payload", "room", room_id, &self.rooms).await
    }

    async fn room_member_list(&self, room_id: &str) -> PuppetResult<Vec<String>> {
        self.fetch("room_member_list", "room", room_id, &self.rooms)
            .await
            .map(|room| room.member_ids)
    }

    async fn message_payload(&self, message_id: &str) -> PuppetResult<MessagePayload> {
        self.fetch("message_payload", "message", message_id, &self.messages)
            .await
    }

    async fn friendship_payload(&self, friendship_id: &str) -> PuppetResult<FriendshipPayload> {
        self.fetch(
            "friendship_payload",
            "friendship",
            friendship_id,
            &self.friendships,
        )
        .await
    }

    async fn room_invitation_payload(
        &self,
        room_invitation_id: &str,
    ) -> PuppetResult<RoomInvitationPayload> {
        self.fetch(
            "room_invitation_payload",
            "room-invitation",
            room_invitation_id,
            &self.room_invitations,
        )
        .await
    }

    async fn post_payload(&self, post_id: &str) -> PuppetResult<PostPayload> {
        self.fetch("post_payload", "post", post_id, &self.posts).await
    }

    async fn contact_payload_dirty(&self, contact_id: &str) -> PuppetResult<()> {
        self.record("contact_payload_dirty", contact_id);
        Ok(())
    }

    async fn room_payload_dirty(&self, room_id: &str) -> PuppetResult<()> {
        self.record("room_payload_dirty", room_id);
        Ok(())
    }

    async fn room_member_payload_dirty(&self, room_id: &str) -> PuppetResult<()> {
        self.record("room_member_payload_dirty", room_id);
        Ok(())
    }

    async fn message_send(
        &self,
        conversation_id: &str,
        sayable: &Sayable,
    ) -> PuppetResult<Option<String>> {
        self.record("message_send", conversation_id);
        let talker_id = self.self_id().ok_or(PuppetError::NotLoggedIn)?;
        let (text, message_type) = match sayable {
            Sayable::Text(text) => (text.clone(), MessageType::Text),
            Sayable::Image(file) => (file.name.clone(), MessageType::Image),
            Sayable::Video(file) => (file.name.clone(), MessageType::Video),
            Sayable::UrlLink(link) => (link.url.clone(), MessageType::Url),
            Sayable::MiniProgram(mp) => (mp.title.clone(), MessageType::MiniProgram),
        };
        let in_room = self.rooms.contains_key(conversation_id);
        let id = self.next_id("msg");
        self.add_message(MessagePayload {
            id: id.clone(),
            talker_id,
            room_id: in_room.then(|| conversation_id.to_string()),
            listener_id: (!in_room).then(|| conversation_id.to_string()),
            text,
            message_type,
            timestamp: chrono::Utc::now().timestamp_millis(),
        });
        Ok(Some(id))
    }

    async fn friendship_accept(&self, friendship_id: &str) -> PuppetResult<()> {
        self.record("friendship_accept", friendship_id);
        let mut friendship = self
            .friendships
            .get_mut(friendship_id)
            .ok_or_else(|| PuppetError::not_found("friendship", friendship_id))?;
        friendship.friendship_type = FriendshipType::Confirm;
        Ok(())
    }

    async fn room_invitation_accept(&self, room_invitation_id: &str) -> PuppetResult<()> {
        self.record("room_invitation_accept", room_invitation_id);
        if !self.room_invitations.contains_key(room_invitation_id) {
            return Err(PuppetError::not_found("room-invitation", room_invitation_id));
        }
        Ok(())
    }

    async fn moment_post(&self, moment: &MomentPayload) -> PuppetResult<Option<String>> {
        self.record(
            "moment_post",
            moment.parent_id.clone().unwrap_or_default(),
        );
        let contact_id = self.self_id().ok_or(PuppetError::NotLoggedIn)?;
        let id = self.next_id("post");
        self.add_post(PostPayload {
            id: id.clone(),
            contact_id,
            timestamp: chrono::Utc::now().timestamp_millis(),
            moment: moment.clone(),
        });
        Ok(Some(id))
    }

    async fn moment_list(
        &self,
        query: &PostQuery,
        pagination: &PaginationRequest,
    ) -> PuppetResult<PaginationResponse<String>> {
        self.record(
            "moment_list",
            pagination.page_token.clone().unwrap_or_default(),
        );
        let offset = match pagination.page_token.as_deref() {
            None => 0,
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| PuppetError::Protocol(format!("invalid page token: {}", token)))?,
        };
        let page_size = pagination.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);

        let matching: Vec<String> = self
            .lock_order()
            .iter()
            .filter(|id| {
                self.posts
                    .get(*id)
                    .map(|p| p.moment.parent_id == query.parent_id)
                    .unwrap_or(false)
            })
            .cloned()
            .collect();

        let end = (offset + page_size).min(matching.len());
        let response = matching.get(offset..end).unwrap_or_default().to_vec();
        let next_page_token = (end < matching.len()).then(|| end.to_string());

        Ok(PaginationResponse {
            response,
            next_page_token,
        })
    }

    async fn moment_signature(&self, text: Option<String>) -> PuppetResult<Option<String>> {
        self.record("moment_signature", text.clone().unwrap_or_default());
        let mut signature = self.signature.lock().unwrap_or_else(|e| e.into_inner());
        if text.is_some() {
            *signature = text;
        }
        Ok(signature.clone())
    }

    async fn moment_coverage(&self, cover: Option<FileBox>) -> PuppetResult<Option<FileBox>> {
        self.record(
            "moment_coverage",
            cover.as_ref().map(|c| c.name.clone()).unwrap_or_default(),
        );
        let mut coverage = self.coverage.lock().unwrap_or_else(|e| e.into_inner());
        if cover.is_some() {
            *coverage = cover;
        }
        Ok(coverage.clone())
    }

    async fn moment_remove(&self, post_id: &str) -> PuppetResult<bool> {
        self.record("moment_remove", post_id);
        let removed = self.posts.remove(post_id).is_some();
        self.lock_order().retain(|id| id != post_id);
        Ok(removed)
    }
}
