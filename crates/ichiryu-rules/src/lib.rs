//! Response rules for ichiryu channel messages.
//!
//! [`RuleEngine`] evaluates one inbound message against the ordered rule set
//! and returns the immediate replies plus any external jobs (publishing,
//! sandboxed code execution) that the session runs off the event path.

pub mod correction;
pub mod link_patterns;
pub mod rule_engine;
pub mod text_art;

pub use correction::{apply_correction, parse_correction, Correction, CorrectionMemory};
pub use link_patterns::{LinkMatcher, CANONICAL_LINK};
pub use rule_engine::{
    ExternalJob, InboundMessage, Reply, RuleConfig, RuleContext, RuleEngine, RuleOutcome,
    DEFAULT_CODE_PREFIX, WHISPER_NOTICE,
};
pub use text_art::{upsert_text_art, TextArtCatalog, TextArtRecord, UpsertOutcome};
