//! Connection lifecycle for the ichiryu channel bot.
//!
//! A [`Session`] drives one IRC connection from registration to disconnect,
//! logging channel activity and routing messages through the rule engine.
//! [`ReconnectSupervisor`] starts a fresh session whenever the previous one
//! ends, until the shutdown signal fires or a log write fails.

pub mod event_render;
pub mod irc_wire;
pub mod session;
pub mod supervisor;
pub mod tcp_transport;
pub mod transport;

pub use event_render::{nick_from_prefix, render_asctime, render_log_line};
pub use irc_wire::{event_from_line, parse_irc_line, render_command, IrcLine};
pub use session::{Session, SessionConfig, SessionEnd, SessionError, SessionState};
pub use supervisor::{ReconnectSupervisor, SupervisorReport};
pub use tcp_transport::TcpTransport;
pub use transport::{Connection, OutboundCommand, Transport, TransportEvent};
