//! # pbot-core
//!
//! Core types and traits for the pbot framework: the [`Puppet`] backend contract, the closed
//! [`PuppetEvent`] set it emits, entity payloads, [`Sayable`] content, pagination types,
//! and tracing initialization. Backend-agnostic; used by `pbot` and every backend adapter.

pub mod error;
pub mod event;
pub mod logger;
pub mod puppet;
pub mod types;

pub use error::{PuppetError, PuppetResult};
pub use event::{PuppetEvent, ScanStatus};
pub use logger::init_tracing;
pub use puppet::Puppet;
pub use types::{
    timestamp_to_date, ContactPayload, ContactType, FileBox, FriendshipPayload, FriendshipType,
    MessagePayload, MessageType, MiniProgramPayload, MomentPayload, PaginationRequest,
    PaginationResponse, PostPayload, PostQuery, RoomInvitationPayload, RoomPayload, Sayable,
    UrlLinkPayload,
};
