//! Transport seam between the session and the IRC server.

use anyhow::Result;
use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Inbound protocol events the session reacts to. `prefix` is the raw
/// `nick!user@host` source.
pub enum TransportEvent {
    Registered,
    NickInUse { attempted: String },
    Ping { token: String },
    Message { prefix: String, target: String, text: String },
    Action { prefix: String, target: String, text: String },
    Join { prefix: String, channel: String },
    Part { prefix: String, channel: String },
    Quit { prefix: String, reason: String },
    NickChange { prefix: String, new_nick: String },
    Topic { prefix: String, channel: String, topic: String },
    Kick { prefix: String, channel: String, kicked: String, reason: String },
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundCommand {
    Nick(String),
    User { username: String, realname: String },
    Join(String),
    Privmsg { target: String, text: String },
    Notice { target: String, text: String },
    Pong(String),
    Quit(String),
}

#[async_trait]
/// One live connection. `next_event` must be cancel safe; it returns
/// `Ok(None)` once the server closes the stream.
pub trait Connection: Send {
    async fn next_event(&mut self) -> Result<Option<TransportEvent>>;
    async fn send(&mut self, command: OutboundCommand) -> Result<()>;
}

#[async_trait]
/// Opens connections to the configured server.
pub trait Transport: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn Connection>>;
}
