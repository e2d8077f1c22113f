//! relay-core: the message distribution core shared by the relay server and client.
//!
//! Holds the wire types and line codec, the message log, connection registry,
//! broadcaster and the hub that serializes every mutation. No sockets here.

pub mod broadcast;
pub mod codec;
pub mod config;
pub mod error;
pub mod hub;
pub mod log;
pub mod registry;
pub mod types;
pub mod upload;
pub mod validate;

pub use config::Config;
pub use error::{RelayError, Result};
pub use hub::{Hub, HubHandle, HubStats};
pub use log::MessageLog;
pub use registry::{ConnectionId, ConnectionRegistry, Outbox};
pub use types::{Candidate, ClientEvent, FileDescriptor, Message, MessageKind, SendMessage, ServerEvent};
pub use validate::{Rejection, validate};
