//! The closed set of events a backend emits.

use serde::{Deserialize, Serialize};

/// Login QR-code scan progress. Carried on the wire as its numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(into = "u8", from = "u8")]
pub enum ScanStatus {
    #[default]
    Unknown,
    Cancel,
    Waiting,
    Scanned,
    Confirmed,
    Timeout,
}

impl ScanStatus {
    /// Numeric status code as carried on the wire.
    pub fn code(self) -> u8 {
        match self {
            ScanStatus::Unknown => 0,
            ScanStatus::Cancel => 1,
            ScanStatus::Waiting => 2,
            ScanStatus::Scanned => 3,
            ScanStatus::Confirmed => 4,
            ScanStatus::Timeout => 5,
        }
    }

    pub fn from_code(code: u8) -> Self {
        match code {
            1 => ScanStatus::Cancel,
            2 => ScanStatus::Waiting,
            3 => ScanStatus::Scanned,
            4 => ScanStatus::Confirmed,
            5 => ScanStatus::Timeout,
            _ => ScanStatus::Unknown,
        }
    }
}

impl From<ScanStatus> for u8 {
    fn from(status: ScanStatus) -> Self {
        status.code()
    }
}

impl From<u8> for ScanStatus {
    fn from(code: u8) -> Self {
        ScanStatus::from_code(code)
    }
}

/// Raw backend event. Entities are referenced by id only; the bridge hydrates them.
///
/// Serialized as `{"type": "room-join", "roomId": ..., ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum PuppetEvent {
    Dong {
        data: Option<String>,
    },
    Error {
        data: String,
    },
    Heartbeat {
        data: String,
    },
    Friendship {
        friendship_id: String,
    },
    Login {
        contact_id: String,
        data: Option<String>,
    },
    Logout {
        contact_id: String,
        data: Option<String>,
    },
    Message {
        message_id: String,
    },
    /// Initial data sync is complete.
    Ready,
    RoomInvite {
        room_invitation_id: String,
    },
    RoomJoin {
        room_id: String,
        #[serde(rename = "inviteeIdList")]
        invitee_ids: Vec<String>,
        inviter_id: String,
        timestamp: i64,
    },
    RoomLeave {
        room_id: String,
        #[serde(rename = "removeeIdList")]
        removee_ids: Vec<String>,
        remover_id: String,
        timestamp: i64,
    },
    RoomTopic {
        room_id: String,
        new_topic: String,
        old_topic: String,
        changer_id: String,
        timestamp: i64,
    },
    Scan {
        qrcode: Option<String>,
        status: ScanStatus,
        data: Option<String>,
    },
    Reset {
        data: String,
    },
}

impl PuppetEvent {
    /// Wire name of the event kind, e.g. `room-join`.
    pub fn name(&self) -> &'static str {
        match self {
            PuppetEvent::Dong { .. } => "dong",
            PuppetEvent::Error { .. } => "error",
            PuppetEvent::Heartbeat { .. } => "heartbeat",
            PuppetEvent::Friendship { .. } => "friendship",
            PuppetEvent::Login { .. } => "login",
            PuppetEvent::Logout { .. } => "logout",
            PuppetEvent::Message { .. } => "message",
            PuppetEvent::Ready => "ready",
            PuppetEvent::RoomInvite { .. } => "room-invite",
            PuppetEvent::RoomJoin { .. } => "room-join",
            PuppetEvent::RoomLeave { .. } => "room-leave",
            PuppetEvent::RoomTopic { .. } => "room-topic",
            PuppetEvent::Scan { .. } => "scan",
            PuppetEvent::Reset { .. } => "reset",
        }
    }
}
