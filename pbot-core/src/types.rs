//! Core types: entity payloads, sayable content, moment structures and pagination.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Contact classification reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ContactType {
    #[default]
    Unknown,
    Individual,
    Official,
}

/// Contact attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactPayload {
    pub id: String,
    pub name: String,
    pub alias: Option<String>,
    pub contact_type: ContactType,
    pub avatar: Option<String>,
    pub friend: bool,
}

impl ContactPayload {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            alias: None,
            contact_type: ContactType::Individual,
            avatar: None,
            friend: true,
        }
    }
}

/// Room (group chat) attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomPayload {
    pub id: String,
    pub topic: String,
    pub owner_id: Option<String>,
    pub member_ids: Vec<String>,
    pub avatar: Option<String>,
}

impl RoomPayload {
    pub fn new(id: impl Into<String>, topic: impl Into<String>, member_ids: Vec<String>) -> Self {
        Self {
            id: id.into(),
            topic: topic.into(),
            owner_id: None,
            member_ids,
            avatar: None,
        }
    }
}

/// Message content kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MessageType {
    #[default]
    Unknown,
    Text,
    Image,
    Video,
    Url,
    MiniProgram,
}

/// Message attributes. Exactly one of `room_id` / `listener_id` is normally set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePayload {
    pub id: String,
    pub talker_id: String,
    pub room_id: Option<String>,
    pub listener_id: Option<String>,
    pub text: String,
    pub message_type: MessageType,
    /// Backend timestamp, seconds or milliseconds since epoch (see [`timestamp_to_date`]).
    pub timestamp: i64,
}

/// Friendship request kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FriendshipType {
    #[default]
    Unknown,
    /// Someone asked to become our friend.
    Receive,
    /// The friendship is established.
    Confirm,
    /// The other side requires verification.
    Verify,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendshipPayload {
    pub id: String,
    pub contact_id: String,
    pub hello: String,
    pub friendship_type: FriendshipType,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomInvitationPayload {
    pub id: String,
    pub inviter_id: String,
    pub topic: String,
    pub member_count: usize,
    pub receiver_id: Option<String>,
    pub timestamp: i64,
}

/// Opaque file carrier (url, uuid or inline data); the framework never looks inside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileBox {
    pub name: String,
    pub reference: String,
}

impl FileBox {
    pub fn from_url(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reference: url.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlLinkPayload {
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
}

impl UrlLinkPayload {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            description: None,
            thumbnail_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiniProgramPayload {
    pub app_id: String,
    pub title: String,
    pub page_path: String,
    pub description: Option<String>,
    pub thumb_url: Option<String>,
}

/// Anything that can be said in a conversation or composed into a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sayable {
    Text(String),
    Image(FileBox),
    Video(FileBox),
    UrlLink(UrlLinkPayload),
    MiniProgram(MiniProgramPayload),
}

impl Sayable {
    /// Short kind name, used in logs and validation messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Sayable::Text(_) => "text",
            Sayable::Image(_) => "image",
            Sayable::Video(_) => "video",
            Sayable::UrlLink(_) => "url-link",
            Sayable::MiniProgram(_) => "mini-program",
        }
    }
}

impl From<&str> for Sayable {
    fn from(s: &str) -> Self {
        Sayable::Text(s.to_string())
    }
}

impl From<String> for Sayable {
    fn from(s: String) -> Self {
        Sayable::Text(s)
    }
}

impl From<UrlLinkPayload> for Sayable {
    fn from(link: UrlLinkPayload) -> Self {
        Sayable::UrlLink(link)
    }
}

impl From<MiniProgramPayload> for Sayable {
    fn from(mp: MiniProgramPayload) -> Self {
        Sayable::MiniProgram(mp)
    }
}

/// Backend structure for posting a moment: content bucketed by kind, plus an optional parent
/// link that turns the moment into a comment on another post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MomentPayload {
    pub text: Option<String>,
    pub video: Option<FileBox>,
    pub images: Vec<FileBox>,
    pub url_link: Option<UrlLinkPayload>,
    pub parent_id: Option<String>,
}

impl MomentPayload {
    /// True when no content field is populated. The parent link alone is not content.
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.video.is_none() && self.images.is_empty() && self.url_link.is_none()
    }
}

/// A posted moment as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostPayload {
    pub id: String,
    pub contact_id: String,
    pub timestamp: i64,
    pub moment: MomentPayload,
}

/// Selects which posts a listing returns: top-level moments (`parent_id == None`) or the
/// direct children of one post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PostQuery {
    pub parent_id: Option<String>,
}

impl PostQuery {
    pub fn timeline() -> Self {
        Self { parent_id: None }
    }

    pub fn children_of(parent_id: impl Into<String>) -> Self {
        Self {
            parent_id: Some(parent_id.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PaginationRequest {
    pub page_size: Option<usize>,
    pub page_token: Option<String>,
}

impl PaginationRequest {
    pub fn first(page_size: usize) -> Self {
        Self {
            page_size: Some(page_size),
            page_token: None,
        }
    }

    pub fn next(page_size: usize, page_token: impl Into<String>) -> Self {
        Self {
            page_size: Some(page_size),
            page_token: Some(page_token.into()),
        }
    }
}

/// One page of results. `next_page_token == None` marks the final page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationResponse<T> {
    pub response: Vec<T>,
    pub next_page_token: Option<String>,
}

/// Backends report either seconds or milliseconds; anything below 1e11 is taken as seconds.
pub fn timestamp_to_date(timestamp: i64) -> DateTime<Utc> {
    let millis = if timestamp.abs() < 100_000_000_000 {
        timestamp.saturating_mul(1000)
    } else {
        timestamp
    };
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or_default()
}
