use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use ichiryu_external::{
    CodeExecutor, ExternalRunner, ExternalRunnerSettings, HttpPublisher, HttpPublisherConfig,
    Publisher, SandboxExecutor, Unconfigured,
};
use ichiryu_index::load_or_build_index;
use ichiryu_logstore::LogStore;
use ichiryu_rules::{RuleConfig, RuleEngine, TextArtCatalog};
use ichiryu_session::{ReconnectSupervisor, SessionConfig, TcpTransport};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::settings::BotSettings;

pub(crate) fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

/// A missing art file is not fatal: the bot runs without text art.
pub(crate) fn load_text_art(path: &Path) -> Result<TextArtCatalog> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "text-art catalog not found; continuing without art");
        return Ok(TextArtCatalog::default());
    }
    let catalog = TextArtCatalog::load(path)?;
    tracing::info!(path = %path.display(), entries = catalog.len(), "loaded text-art catalog");
    Ok(catalog)
}

pub(crate) fn build_external_runner(settings: &BotSettings) -> Result<ExternalRunner> {
    let mut runner_settings = ExternalRunnerSettings::default();

    let publisher: Arc<dyn Publisher> = match &settings.publish {
        Some(publish) => {
            runner_settings.publish_timeout = Duration::from_millis(publish.timeout_ms);
            let publisher = HttpPublisher::new(HttpPublisherConfig {
                endpoint: publish.endpoint.clone(),
                token: publish.token.clone(),
                profile_link: publish.profile_link.clone(),
                request_timeout_ms: publish.timeout_ms,
            })
            .context("failed to build publish client")?;
            Arc::new(publisher)
        }
        None => {
            tracing::info!("publishing not configured");
            Arc::new(Unconfigured)
        }
    };

    let executor: Arc<dyn CodeExecutor> = match &settings.sandbox {
        Some(sandbox) => {
            runner_settings.execution_timeout = Duration::from_millis(sandbox.timeout_ms);
            runner_settings.cpu_limit_marker = sandbox.cpu_limit_marker.clone();
            Arc::new(SandboxExecutor::new(sandbox.script.clone()))
        }
        None => {
            tracing::info!("code execution not configured");
            Arc::new(Unconfigured)
        }
    };

    Ok(ExternalRunner::new(publisher, executor, runner_settings))
}

/// Loads the index and art, then wires the rule engine, log store and
/// external runner into a supervisor for the configured server.
pub(crate) fn build_supervisor(settings: &BotSettings) -> Result<ReconnectSupervisor> {
    let index = load_or_build_index(&settings.cache_path, &settings.catalog_path)?;
    let art = load_text_art(&settings.art_path)?;

    let mut rule_config = RuleConfig::new(settings.channel.clone(), settings.aliases());
    if settings.sandbox.is_some() {
        rule_config = rule_config.with_code_prefix(settings.code_prefix.clone());
    }
    let rules = RuleEngine::new(rule_config, Arc::new(index), Arc::new(art))?;

    let logs = LogStore::new(settings.logroot.clone(), settings.log_link_base.clone());
    let runner = build_external_runner(settings)?;
    let transport = TcpTransport::new(settings.server.clone(), settings.port);

    Ok(ReconnectSupervisor::new(
        Arc::new(transport),
        SessionConfig {
            channel: settings.channel.clone(),
            nickname: settings.nickname.clone(),
            realname: settings.realname.clone(),
        },
        rules,
        logs,
        runner,
    )
    .with_reconnect_delay(settings.reconnect_delay()))
}
