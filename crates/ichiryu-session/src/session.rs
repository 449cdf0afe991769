use chrono::Local;
use ichiryu_external::ExternalRunner;
use ichiryu_logstore::LogStore;
use ichiryu_rules::{InboundMessage, Reply, RuleContext, RuleEngine};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};

use crate::event_render::{nick_from_prefix, render_asctime, render_log_line};
use crate::transport::{Connection, OutboundCommand, TransportEvent};

const QUIT_REASON: &str = "shutting down";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub channel: String,
    pub nickname: String,
    pub realname: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Joined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// How a session that did not fail came to an end.
pub enum SessionEnd {
    Closed,
    Shutdown,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("IRC transport failed: {0:#}")]
    Transport(anyhow::Error),
    #[error("failed to write channel log: {0:#}")]
    LogWrite(anyhow::Error),
}

/// One IRC connection: registers, joins the channel, logs every channel event
/// and answers through the rule engine until the connection ends.
pub struct Session<'a> {
    config: &'a SessionConfig,
    rules: &'a mut RuleEngine,
    logs: &'a mut LogStore,
    runner: ExternalRunner,
    nick: String,
    state: SessionState,
    jobs: JoinSet<String>,
}

impl<'a> Session<'a> {
    pub fn new(
        config: &'a SessionConfig,
        rules: &'a mut RuleEngine,
        logs: &'a mut LogStore,
        runner: ExternalRunner,
    ) -> Self {
        Self {
            nick: config.nickname.clone(),
            config,
            rules,
            logs,
            runner,
            state: SessionState::Disconnected,
            jobs: JoinSet::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Nick currently held on the server, including collision suffixes.
    pub fn nick(&self) -> &str {
        &self.nick
    }

    /// Drives `connection` until it closes, fails, or `shutdown` turns true.
    /// Pending external jobs are aborted when the session ends.
    pub async fn run(
        &mut self,
        connection: &mut dyn Connection,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<SessionEnd, SessionError> {
        let outcome = self.drive(connection, shutdown).await;
        self.jobs.abort_all();
        let closed = self.close_log();
        match (outcome, closed) {
            (Err(error), _) => Err(error),
            (Ok(_), Err(error)) => Err(error),
            (Ok(end), Ok(())) => Ok(end),
        }
    }

    async fn drive(
        &mut self,
        connection: &mut dyn Connection,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<SessionEnd, SessionError> {
        self.state = SessionState::Connecting;
        tracing::info!(nick = %self.nick, channel = %self.config.channel, "registering with IRC server");
        send(connection, OutboundCommand::Nick(self.nick.clone())).await?;
        send(
            connection,
            OutboundCommand::User {
                username: self.config.nickname.clone(),
                realname: self.config.realname.clone(),
            },
        )
        .await?;

        loop {
            if *shutdown.borrow_and_update() {
                let _ = connection
                    .send(OutboundCommand::Quit(QUIT_REASON.to_string()))
                    .await;
                return Ok(SessionEnd::Shutdown);
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        tracing::debug!("shutdown sender dropped; ending session");
                        return Ok(SessionEnd::Shutdown);
                    }
                }
                Some(joined) = self.jobs.join_next(), if !self.jobs.is_empty() => {
                    self.deliver_job_reply(connection, joined).await?;
                }
                event = connection.next_event() => {
                    match event {
                        Ok(Some(event)) => self.handle_event(connection, event).await?,
                        Ok(None) => {
                            tracing::info!("IRC server closed the connection");
                            return Ok(SessionEnd::Closed);
                        }
                        Err(error) => return Err(SessionError::Transport(error)),
                    }
                }
            }
        }
    }

    async fn handle_event(
        &mut self,
        connection: &mut dyn Connection,
        event: TransportEvent,
    ) -> Result<(), SessionError> {
        if let Some(line) = render_log_line(&event, &self.config.channel, &self.nick) {
            self.log(&line)?;
        }

        match event {
            TransportEvent::Registered => {
                self.state = SessionState::Joined;
                tracing::info!(nick = %self.nick, channel = %self.config.channel, "registered; joining channel");
                send(connection, OutboundCommand::Join(self.config.channel.clone())).await?;
                let marker = format!("[connected at {}]", render_asctime(&Local::now()));
                self.log(&marker)?;
            }
            TransportEvent::NickInUse { attempted } => {
                let retry = format!("{attempted}^");
                tracing::warn!(attempted = %attempted, retry = %retry, "nickname in use");
                self.nick = retry.clone();
                send(connection, OutboundCommand::Nick(retry)).await?;
            }
            TransportEvent::Ping { token } => {
                send(connection, OutboundCommand::Pong(token)).await?;
            }
            TransportEvent::NickChange { prefix, new_nick } => {
                if nick_from_prefix(&prefix).eq_ignore_ascii_case(&self.nick) {
                    self.nick = new_nick;
                }
            }
            TransportEvent::Message {
                prefix,
                target,
                text,
            } => {
                let message = InboundMessage::new(nick_from_prefix(&prefix), target, text);
                self.apply_rules(connection, &message).await?;
            }
            _ => {}
        }
        Ok(())
    }

    async fn apply_rules(
        &mut self,
        connection: &mut dyn Connection,
        message: &InboundMessage,
    ) -> Result<(), SessionError> {
        let log_link = self.logs.current_log_link(&self.config.channel);
        let context = RuleContext {
            own_nick: &self.nick,
            log_link: &log_link,
        };
        let outcome = self.rules.handle(message, context);

        for reply in outcome.replies {
            self.send_reply(connection, reply).await?;
        }
        for job in outcome.jobs {
            tracing::debug!(?job, "spawning external job");
            self.jobs.spawn(self.runner.clone().run(job));
        }
        Ok(())
    }

    async fn deliver_job_reply(
        &mut self,
        connection: &mut dyn Connection,
        joined: Result<String, JoinError>,
    ) -> Result<(), SessionError> {
        match joined {
            Ok(text) => self.send_reply(connection, Reply::Channel(text)).await,
            Err(error) => {
                tracing::warn!(error = %error, "external job task failed");
                Ok(())
            }
        }
    }

    async fn send_reply(
        &mut self,
        connection: &mut dyn Connection,
        reply: Reply,
    ) -> Result<(), SessionError> {
        match reply {
            Reply::Channel(text) => {
                for line in text.lines().filter(|line| !line.trim().is_empty()) {
                    send(
                        connection,
                        OutboundCommand::Privmsg {
                            target: self.config.channel.clone(),
                            text: line.to_string(),
                        },
                    )
                    .await?;
                    self.log(&format!("<{}> {}", self.nick, line))?;
                }
            }
            Reply::Private { nick, text } => {
                send(
                    connection,
                    OutboundCommand::Notice {
                        target: nick,
                        text: text.clone(),
                    },
                )
                .await?;
                self.log(&format!("<{}> {}", self.nick, text))?;
            }
        }
        Ok(())
    }

    fn log(&mut self, line: &str) -> Result<(), SessionError> {
        self.logs
            .append(&self.config.channel, line)
            .map_err(SessionError::LogWrite)
    }

    fn close_log(&mut self) -> Result<(), SessionError> {
        let was_joined = self.state == SessionState::Joined;
        self.state = SessionState::Disconnected;
        let logged = if was_joined {
            let marker = format!("[disconnected at {}]", render_asctime(&Local::now()));
            self.log(&marker)
        } else {
            Ok(())
        };
        self.logs.close(&self.config.channel);
        logged
    }
}

async fn send(connection: &mut dyn Connection, command: OutboundCommand) -> Result<(), SessionError> {
    connection
        .send(command)
        .await
        .map_err(SessionError::Transport)
}
