//! Wire protocol: node roles, message tags, and inbound classification.
//!
//! The alphabet is four literal ASCII tags with no framing:
//!
//! | Tag         | Sent by | Meaning                                   |
//! |-------------|---------|-------------------------------------------|
//! | `A_trigger` | node A  | A's sensor fired, please actuate          |
//! | `A_ack`     | node A  | A actuated in response to `B_trigger`     |
//! | `B_trigger` | node B  | B's sensor fired, please actuate          |
//! | `B_ack`     | node B  | B actuated in response to `A_trigger`     |
//!
//! Equality on the raw bytes is the only semantics.  Broadcast sockets
//! deliver a node's own datagrams back to it, so every inbound payload is
//! classified relative to the receiving node's [`RoleTags`] before it is
//! acted on.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Identity of one of the two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    A,
    B,
}

impl Role {
    /// The other node.
    pub const fn peer(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    pub const fn letter(self) -> char {
        match self {
            Self::A => 'A',
            Self::B => 'B',
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// One of the four protocol messages, tagged with the role that sends it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Message {
    Trigger(Role),
    Ack(Role),
}

impl Message {
    /// Every message in the alphabet.
    pub const ALL: [Self; 4] = [
        Self::Trigger(Role::A),
        Self::Ack(Role::A),
        Self::Trigger(Role::B),
        Self::Ack(Role::B),
    ];

    /// Literal wire encoding.
    pub const fn as_bytes(self) -> &'static [u8] {
        match self {
            Self::Trigger(Role::A) => b"A_trigger",
            Self::Ack(Role::A) => b"A_ack",
            Self::Trigger(Role::B) => b"B_trigger",
            Self::Ack(Role::B) => b"B_ack",
        }
    }

    /// Exact match against the alphabet.  Anything else is `None`.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_bytes() == payload)
    }

    /// Role whose tag this message carries.
    pub const fn sender(self) -> Role {
        match self {
            Self::Trigger(role) | Self::Ack(role) => role,
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trigger(role) => write!(f, "{role}_trigger"),
            Self::Ack(role) => write!(f, "{role}_ack"),
        }
    }
}

/// What an inbound payload means to the receiving node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound {
    /// One of our own tags looped back by broadcast delivery.
    SelfEcho(Message),
    /// The peer asks us to actuate.
    PeerTrigger,
    /// The peer confirms it actuated.
    PeerAck,
    /// Not in the alphabet.
    Unknown,
}

/// Own/peer tag pair that parameterises a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleTags {
    pub own: Role,
    pub peer: Role,
}

impl RoleTags {
    pub const fn for_role(own: Role) -> Self {
        Self {
            own,
            peer: own.peer(),
        }
    }

    pub const fn own_trigger(&self) -> Message {
        Message::Trigger(self.own)
    }

    pub const fn own_ack(&self) -> Message {
        Message::Ack(self.own)
    }

    pub const fn peer_ack(&self) -> Message {
        Message::Ack(self.peer)
    }

    /// Classify a raw datagram payload.
    pub fn classify(&self, payload: &[u8]) -> Inbound {
        match Message::parse(payload) {
            None => Inbound::Unknown,
            Some(msg) if msg.sender() == self.own => Inbound::SelfEcho(msg),
            Some(Message::Trigger(_)) => Inbound::PeerTrigger,
            Some(Message::Ack(_)) => Inbound::PeerAck,
        }
    }
}
