//! Wire protocol.
//!
//! Every message is one JSON object tagged by its `type` field:
//! - server -> client: `OFFER`, `JOIN`, `DATA` (world snapshot)
//! - client -> server: `REQUEST`, `DATA` (input sample)
//!
//! Decoding is two-phase: the envelope is read first to learn the kind, then the
//! body is decoded for the kinds we understand. Unknown kinds are not errors.

use std::fmt;

use bitflags::bitflags;
use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::math::Vec2;

/// Identifies a participant for the lifetime of its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub u32);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

bitflags! {
    /// Keys held down in one input sample.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Keys: u8 {
        const SPACE = 1 << 0;
        const LEFT = 1 << 1;
        const UP = 1 << 2;
        const RIGHT = 1 << 3;
        const DOWN = 1 << 4;
    }
}

impl Keys {
    /// Unit movement per axis: x grows to the right, y grows downwards.
    ///
    /// Opposite keys cancel; perpendicular keys combine.
    pub fn direction(self) -> Vec2 {
        let mut dir = Vec2::ZERO;
        if self.contains(Keys::LEFT) {
            dir.x -= 1.0;
        }
        if self.contains(Keys::RIGHT) {
            dir.x += 1.0;
        }
        if self.contains(Keys::UP) {
            dir.y -= 1.0;
        }
        if self.contains(Keys::DOWN) {
            dir.y += 1.0;
        }
        dir
    }
}

/// Pointer position reported with an input sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Mouse {
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
}

/// One client input sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "InputRepr", into = "InputRepr")]
pub struct InputCommand {
    pub uid: ParticipantId,
    pub tick: u64,
    pub keys: Keys,
    pub mouse: Mouse,
}

#[derive(Serialize, Deserialize)]
struct InputRepr {
    uid: ParticipantId,
    #[serde(default)]
    tik: u64,
    #[serde(default)]
    keys: KeysRepr,
}

#[derive(Default, Serialize, Deserialize)]
struct KeysRepr {
    #[serde(default, deserialize_with = "de_flag", serialize_with = "ser_flag")]
    space: bool,
    #[serde(default, deserialize_with = "de_flag", serialize_with = "ser_flag")]
    left: bool,
    #[serde(default, deserialize_with = "de_flag", serialize_with = "ser_flag")]
    up: bool,
    #[serde(default, deserialize_with = "de_flag", serialize_with = "ser_flag")]
    right: bool,
    #[serde(default, deserialize_with = "de_flag", serialize_with = "ser_flag")]
    down: bool,
    #[serde(default)]
    mouse: Mouse,
}

impl From<InputRepr> for InputCommand {
    fn from(r: InputRepr) -> Self {
        let k = r.keys;
        let mut keys = Keys::empty();
        keys.set(Keys::SPACE, k.space);
        keys.set(Keys::LEFT, k.left);
        keys.set(Keys::UP, k.up);
        keys.set(Keys::RIGHT, k.right);
        keys.set(Keys::DOWN, k.down);
        Self {
            uid: r.uid,
            tick: r.tik,
            keys,
            mouse: k.mouse,
        }
    }
}

impl From<InputCommand> for InputRepr {
    fn from(c: InputCommand) -> Self {
        Self {
            uid: c.uid,
            tik: c.tick,
            keys: KeysRepr {
                space: c.keys.contains(Keys::SPACE),
                left: c.keys.contains(Keys::LEFT),
                up: c.keys.contains(Keys::UP),
                right: c.keys.contains(Keys::RIGHT),
                down: c.keys.contains(Keys::DOWN),
                mouse: c.mouse,
            },
        }
    }
}

/// Deployed clients send `0/1`; booleans are accepted too.
#[derive(Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
}

fn de_flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(match Flag::deserialize(d)? {
        Flag::Bool(b) => b,
        Flag::Int(n) => n != 0,
    })
}

fn ser_flag<S: Serializer>(v: &bool, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u8(u8::from(*v))
}

/// Replicated state of one entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    pub uid: ParticipantId,
    pub x: f32,
    pub y: f32,
}

impl EntityState {
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// Full world state at one tick, in broadcast order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub states: Vec<EntityState>,
}

impl Snapshot {
    pub fn find(&self, uid: ParticipantId) -> Option<&EntityState> {
        self.states.iter().find(|s| s.uid == uid)
    }
}

/// Server -> client messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum ServerMessage {
    /// Id assigned to a freshly connected session.
    Offer { uid: ParticipantId },
    /// Join acknowledged; the participant now has an entity.
    Join,
    /// World snapshot.
    Data(Snapshot),
}

/// Client -> server messages, as seen after decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// Ask to join with a previously offered id.
    Request { id: ParticipantId },
    /// Input sample for a tick.
    Data(InputCommand),
    /// Well-formed envelope with a kind this server does not handle.
    Unknown { kind: String },
}

/// Why an inbound payload could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("message has no `type` field")]
    MissingKind,
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct RequestBody {
    id: ParticipantId,
}

#[derive(Serialize)]
struct Empty {}

#[derive(Serialize)]
struct Tagged<'a, T> {
    #[serde(rename = "type")]
    kind: &'a str,
    #[serde(flatten)]
    body: T,
}

pub fn decode_client(b: &[u8]) -> Result<ClientMessage, DecodeError> {
    let envelope: Envelope = serde_json::from_slice(b)?;
    let kind = envelope.kind.ok_or(DecodeError::MissingKind)?;
    match kind.as_str() {
        "DATA" => Ok(ClientMessage::Data(serde_json::from_slice(b)?)),
        "REQUEST" => {
            let body: RequestBody = serde_json::from_slice(b)?;
            Ok(ClientMessage::Request { id: body.id })
        }
        _ => Ok(ClientMessage::Unknown { kind }),
    }
}

pub fn encode_client(msg: &ClientMessage) -> serde_json::Result<Bytes> {
    let payload = match msg {
        ClientMessage::Request { id } => serde_json::to_vec(&Tagged {
            kind: "REQUEST",
            body: RequestBody { id: *id },
        })?,
        ClientMessage::Data(cmd) => serde_json::to_vec(&Tagged {
            kind: "DATA",
            body: cmd,
        })?,
        ClientMessage::Unknown { kind } => serde_json::to_vec(&Tagged {
            kind: kind.as_str(),
            body: Empty {},
        })?,
    };
    Ok(Bytes::from(payload))
}

pub fn decode_server(b: &[u8]) -> Result<ServerMessage, DecodeError> {
    Ok(serde_json::from_slice(b)?)
}

pub fn encode_server(msg: &ServerMessage) -> serde_json::Result<Bytes> {
    Ok(Bytes::from(serde_json::to_vec(msg)?))
}
