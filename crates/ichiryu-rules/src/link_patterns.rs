//! Duplicate image-host link detection.

use anyhow::{Context, Result};
use regex::Regex;

/// The one link the channel agreed to keep posting.
pub const CANONICAL_LINK: &str = "http://omploader.org/vMmhmZA";

const GENERIC_LINK_PATTERN: &str = r"http://ompl[a-z.]*\.org/[a-zA-Z0-9]{5,8}(?:$|[^a-zA-Z0-9])";
const CANONICAL_LINK_PATTERN: &str = r"http://ompl[a-z.]*\.org/vMmhmZA(?:$|[^a-zA-Z0-9])";

/// Counts image-host links against occurrences of [`CANONICAL_LINK`].
#[derive(Debug, Clone)]
pub struct LinkMatcher {
    generic: Regex,
    canonical: Regex,
}

impl LinkMatcher {
    pub fn new() -> Result<Self> {
        Ok(Self {
            generic: Regex::new(GENERIC_LINK_PATTERN).context("invalid generic link pattern")?,
            canonical: Regex::new(CANONICAL_LINK_PATTERN)
                .context("invalid canonical link pattern")?,
        })
    }

    pub fn generic_count(&self, text: &str) -> usize {
        self.generic.find_iter(text).count()
    }

    pub fn canonical_count(&self, text: &str) -> usize {
        self.canonical.find_iter(text).count()
    }

    /// True when `text` links somewhere on the host other than the canonical link.
    pub fn has_foreign_link(&self, text: &str) -> bool {
        self.generic_count(text) > self.canonical_count(text)
    }
}
