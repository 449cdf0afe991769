//! Ordered response rules for one inbound message.

use std::sync::Arc;

use anyhow::Result;
use ichiryu_index::{normalize_name, NameIndex};

use crate::correction::{apply_correction, parse_correction, CorrectionMemory};
use crate::link_patterns::{LinkMatcher, CANONICAL_LINK};
use crate::text_art::TextArtCatalog;

pub const WHISPER_NOTICE: &str = "It isn't nice to whisper!  Play nice with the group.";
pub const DEFAULT_CODE_PREFIX: &str = "lua>";

const SUFFIX_TRIGGER: &str = "imo";
const SUFFIX_REPLY: &str = ".im";
const PUBLISH_MARKER: &str = "#thinkaboutitluse";
const PUBLISH_MAX_CHARS: usize = 140;
const ART_TRIGGER_PHRASE: &str = "ship it";
const ART_TRIGGER_NAME: &str = "ship";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Static rule settings derived from the bot settings file.
pub struct RuleConfig {
    pub channel: String,
    pub aliases: Vec<String>,
    /// Prefix that hands a message to the code executor; `None` when no
    /// executor is configured.
    pub code_prefix: Option<String>,
}

impl RuleConfig {
    pub fn new(channel: impl Into<String>, aliases: Vec<String>) -> Self {
        Self {
            channel: channel.into(),
            aliases,
            code_prefix: None,
        }
    }

    pub fn with_code_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.code_prefix = Some(prefix.into()).filter(|prefix: &String| !prefix.is_empty());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A `PRIVMSG` as seen by the rules: speaker nick, target (channel or our nick), text.
pub struct InboundMessage {
    pub speaker: String,
    pub target: String,
    pub text: String,
}

impl InboundMessage {
    pub fn new(
        speaker: impl Into<String>,
        target: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            speaker: speaker.into(),
            target: target.into(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
/// Per-message session facts the rules need.
pub struct RuleContext<'a> {
    pub own_nick: &'a str,
    pub log_link: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Channel(String),
    Private { nick: String, text: String },
}

impl Reply {
    pub fn text(&self) -> &str {
        match self {
            Self::Channel(text) => text,
            Self::Private { text, .. } => text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Work handed to external collaborators; each job yields exactly one reply.
pub enum ExternalJob {
    Publish { speaker: String, text: String },
    Execute { speaker: String, code: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleOutcome {
    pub replies: Vec<Reply>,
    pub jobs: Vec<ExternalJob>,
}

impl RuleOutcome {
    pub fn is_empty(&self) -> bool {
        self.replies.is_empty() && self.jobs.is_empty()
    }

    fn say(&mut self, text: impl Into<String>) {
        self.replies.push(Reply::Channel(text.into()));
    }
}

/// Evaluates the response rules and owns the correction memory they update.
pub struct RuleEngine {
    config: RuleConfig,
    index: Arc<NameIndex>,
    art: Arc<TextArtCatalog>,
    links: LinkMatcher,
    memory: CorrectionMemory,
}

impl RuleEngine {
    pub fn new(config: RuleConfig, index: Arc<NameIndex>, art: Arc<TextArtCatalog>) -> Result<Self> {
        Ok(Self {
            config,
            index,
            art,
            links: LinkMatcher::new()?,
            memory: CorrectionMemory::new(),
        })
    }

    pub fn memory(&self) -> &CorrectionMemory {
        &self.memory
    }

    pub fn config(&self) -> &RuleConfig {
        &self.config
    }

    /// Runs every rule against `message` in order.
    pub fn handle(&mut self, message: &InboundMessage, context: RuleContext<'_>) -> RuleOutcome {
        let mut outcome = RuleOutcome::default();

        if message.target.eq_ignore_ascii_case(context.own_nick) {
            outcome.replies.push(Reply::Private {
                nick: message.speaker.clone(),
                text: WHISPER_NOTICE.to_string(),
            });
            return outcome;
        }
        if !message.target.eq_ignore_ascii_case(&self.config.channel) {
            return outcome;
        }

        let speaker = message.speaker.as_str();
        let text = message.text.as_str();

        if let Some(code) = self
            .config
            .code_prefix
            .as_deref()
            .and_then(|prefix| text.strip_prefix(prefix))
        {
            outcome.jobs.push(ExternalJob::Execute {
                speaker: speaker.to_string(),
                code: code.to_string(),
            });
            return outcome;
        }

        self.apply_correction_rule(speaker, text, &mut outcome);

        let normalized = normalize_name(text, None);
        if normalized.ends_with(SUFFIX_TRIGGER) {
            outcome.say(SUFFIX_REPLY);
        }

        if text.contains(PUBLISH_MARKER) {
            if text.chars().count() > PUBLISH_MAX_CHARS {
                outcome.say(format!("I'm sorry {speaker}, that post is too long."));
            } else {
                outcome.jobs.push(ExternalJob::Publish {
                    speaker: speaker.to_string(),
                    text: text.to_string(),
                });
            }
        }

        if self.links.has_foreign_link(text) {
            outcome.say(format!("{speaker}: {CANONICAL_LINK}"));
        }

        if let Some(resource) = self.index.lookup_longest_suffix(text) {
            outcome.say(format!("{speaker}: {resource}"));
        }

        if normalized.ends_with(ART_TRIGGER_PHRASE) {
            match self.art.get(ART_TRIGGER_NAME) {
                Some(art) => outcome.say(art),
                None => tracing::warn!(name = ART_TRIGGER_NAME, "text art entry is missing"),
            }
        }

        if self
            .config
            .aliases
            .iter()
            .any(|alias| !alias.is_empty() && text.starts_with(alias.as_str()))
        {
            outcome.say(format!(
                "{speaker}: Logs can be found at {}",
                context.log_link
            ));
        }

        outcome
    }

    fn apply_correction_rule(&mut self, speaker: &str, text: &str, outcome: &mut RuleOutcome) {
        let Some(correction) = parse_correction(text, speaker) else {
            self.memory.remember(speaker, text);
            return;
        };
        let Some(previous) = self
            .memory
            .last_message(&correction.who)
            .filter(|previous| !previous.is_empty())
        else {
            return;
        };
        match apply_correction(previous, &correction) {
            Ok(rewritten) => {
                outcome.say(format!("{} meant to say: {rewritten}", correction.who));
                self.memory.remember(&correction.who, &rewritten);
            }
            Err(error) => {
                tracing::debug!(who = %correction.who, error = %error, "ignoring invalid correction pattern");
            }
        }
    }
}
