//! Reconnect loop around [`Session`].

use std::sync::Arc;
use std::time::Duration;

use ichiryu_external::ExternalRunner;
use ichiryu_logstore::LogStore;
use ichiryu_rules::RuleEngine;
use tokio::sync::watch;

use crate::session::{Session, SessionConfig, SessionEnd, SessionError};
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// Counters returned once the supervisor stops.
pub struct SupervisorReport {
    pub connection_attempts: u64,
    pub sessions: u64,
    pub failure_streak: u64,
}

/// Owns the state that outlives a single connection (rule memory, log store)
/// and starts a new [`Session`] every time the previous one ends. There is no
/// retry ceiling; only the shutdown signal or a log write failure stops it.
pub struct ReconnectSupervisor {
    transport: Arc<dyn Transport>,
    config: SessionConfig,
    rules: RuleEngine,
    logs: LogStore,
    runner: ExternalRunner,
    reconnect_delay: Duration,
}

impl ReconnectSupervisor {
    pub fn new(
        transport: Arc<dyn Transport>,
        config: SessionConfig,
        rules: RuleEngine,
        logs: LogStore,
        runner: ExternalRunner,
    ) -> Self {
        Self {
            transport,
            config,
            rules,
            logs,
            runner,
            reconnect_delay: Duration::ZERO,
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn rules(&self) -> &RuleEngine {
        &self.rules
    }

    /// Runs sessions until `shutdown` becomes true (or its sender is dropped).
    pub async fn run(
        &mut self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<SupervisorReport, SessionError> {
        let mut report = SupervisorReport::default();
        loop {
            if *shutdown.borrow_and_update() {
                tracing::info!("shutdown requested; supervisor stopping");
                return Ok(report);
            }

            report.connection_attempts = report.connection_attempts.saturating_add(1);
            tracing::info!(attempt = report.connection_attempts, "connecting to IRC server");
            let connected = tokio::select! {
                _ = wait_for_shutdown(&mut shutdown) => {
                    tracing::info!("shutdown requested while connecting");
                    return Ok(report);
                }
                connected = self.transport.connect() => connected,
            };

            match connected {
                Ok(mut connection) => {
                    report.sessions = report.sessions.saturating_add(1);
                    let mut session = Session::new(
                        &self.config,
                        &mut self.rules,
                        &mut self.logs,
                        self.runner.clone(),
                    );
                    match session.run(connection.as_mut(), &mut shutdown).await {
                        Ok(SessionEnd::Shutdown) => return Ok(report),
                        Ok(SessionEnd::Closed) => {
                            report.failure_streak = 0;
                            tracing::info!("session closed; reconnecting");
                        }
                        Err(SessionError::Transport(error)) => {
                            report.failure_streak = report.failure_streak.saturating_add(1);
                            tracing::warn!(
                                error = %format!("{error:#}"),
                                failure_streak = report.failure_streak,
                                "session transport failed; reconnecting"
                            );
                        }
                        Err(error @ SessionError::LogWrite(_)) => {
                            tracing::error!(error = %error, "log write failed; supervisor stopping");
                            return Err(error);
                        }
                    }
                }
                Err(error) => {
                    report.failure_streak = report.failure_streak.saturating_add(1);
                    tracing::warn!(
                        error = %format!("{error:#}"),
                        failure_streak = report.failure_streak,
                        "connection attempt failed"
                    );
                }
            }

            if self.reconnect_delay.is_zero() {
                tokio::task::yield_now().await;
                continue;
            }
            tokio::select! {
                _ = wait_for_shutdown(&mut shutdown) => {
                    tracing::info!("shutdown requested during reconnect delay");
                    return Ok(report);
                }
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }
    }
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}
