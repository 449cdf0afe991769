//! Suffix-matchable name index.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::catalog::CatalogRecord;
use crate::normalize::{normalize_name, parse_url_version};

/// Shortest suffix (in characters) that may match an index key.
pub const MIN_SUFFIX_CHARS: usize = 3;

#[derive(Debug, Clone)]
struct IndexEntry {
    resource_url: String,
    version: Option<u64>,
}

/// Immutable normalized-name → resource URL mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameIndex {
    max_key_length: usize,
    links: BTreeMap<String, String>,
}

impl NameIndex {
    /// Builds the index, keeping the highest-versioned URL per normalized
    /// name. URLs without a parsable version rank below every parsable one
    /// and ties keep the first record seen.
    pub fn build<'a>(records: impl IntoIterator<Item = &'a CatalogRecord>) -> Self {
        let mut entries: HashMap<String, IndexEntry> = HashMap::new();
        let mut max_key_length = 0;
        let mut skipped_empty = 0_usize;

        for record in records {
            let key = normalize_name(&record.name, None);
            if key.is_empty() {
                skipped_empty += 1;
                continue;
            }
            let version = parse_url_version(&record.img_url);
            let replace = match entries.get(&key) {
                Some(existing) => version > existing.version,
                None => true,
            };
            if replace {
                max_key_length = max_key_length.max(key.chars().count());
                entries.insert(
                    key,
                    IndexEntry {
                        resource_url: record.img_url.clone(),
                        version,
                    },
                );
            }
        }

        if skipped_empty > 0 {
            tracing::debug!(skipped_empty, "skipped catalog names without letters");
        }

        Self {
            max_key_length,
            links: entries
                .into_iter()
                .map(|(key, entry)| (key, entry.resource_url))
                .collect(),
        }
    }

    /// Returns the resource for the longest suffix (at least
    /// [`MIN_SUFFIX_CHARS`] characters) of the normalized message that is an
    /// index key.
    pub fn lookup_longest_suffix(&self, message: &str) -> Option<&str> {
        if self.links.is_empty() {
            return None;
        }
        let normalized = normalize_name(message, Some(self.max_key_length))
            .chars()
            .collect::<Vec<_>>();
        if normalized.len() < MIN_SUFFIX_CHARS {
            return None;
        }
        (0..=normalized.len() - MIN_SUFFIX_CHARS).find_map(|start| {
            let suffix = normalized[start..].iter().collect::<String>();
            self.links.get(&suffix).map(String::as_str)
        })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.links.get(key).map(String::as_str)
    }

    pub fn max_key_length(&self) -> usize {
        self.max_key_length
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}
