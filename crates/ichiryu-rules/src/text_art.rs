//! Named multi-line text blocks (ASCII art) and the offline upsert helper.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use ichiryu_core::write_text_atomic;
use ichiryu_index::normalize_name;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// One `{ name, text }` entry of the text-art catalog file.
pub struct TextArtRecord {
    pub name: String,
    pub text: String,
}

/// Read-only lookup of art text by normalized name.
#[derive(Debug, Clone, Default)]
pub struct TextArtCatalog {
    entries: HashMap<String, String>,
}

impl TextArtCatalog {
    pub fn from_records(records: impl IntoIterator<Item = TextArtRecord>) -> Self {
        let entries = records
            .into_iter()
            .map(|record| (normalize_name(&record.name, None), record.text))
            .collect();
        Self { entries }
    }

    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::from_records(read_records(path)?))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&normalize_name(name, None))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Replaced,
    Appended,
}

/// Replaces the text of the entry named exactly `name`, or appends a new
/// entry, then rewrites the whole catalog file. A missing catalog file is
/// treated as empty.
pub fn upsert_text_art(catalog_path: &Path, name: &str, text: &str) -> Result<UpsertOutcome> {
    let mut records = if catalog_path.exists() {
        read_records(catalog_path)?
    } else {
        Vec::new()
    };

    let outcome = match records.iter_mut().find(|record| record.name == name) {
        Some(existing) => {
            existing.text = text.to_string();
            UpsertOutcome::Replaced
        }
        None => {
            records.push(TextArtRecord {
                name: name.to_string(),
                text: text.to_string(),
            });
            UpsertOutcome::Appended
        }
    };

    let mut payload =
        serde_json::to_string_pretty(&records).context("failed to serialize text-art catalog")?;
    payload.push('\n');
    write_text_atomic(catalog_path, &payload)
        .with_context(|| format!("failed to write text-art catalog {}", catalog_path.display()))?;
    Ok(outcome)
}

fn read_records(path: &Path) -> Result<Vec<TextArtRecord>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read text-art catalog {}", path.display()))?;
    serde_json::from_str::<Vec<TextArtRecord>>(&raw)
        .with_context(|| format!("failed to parse text-art catalog {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::{upsert_text_art, TextArtCatalog, TextArtRecord, UpsertOutcome};

    #[test]
    fn unit_catalog_lookup_normalizes_names() {
        let catalog = TextArtCatalog::from_records(vec![TextArtRecord {
            name: "Ship!".to_string(),
            text: " _\n|_|\n".to_string(),
        }]);
        assert_eq!(catalog.get("ship"), Some(" _\n|_|\n"));
        assert_eq!(catalog.get("SHIP"), Some(" _\n|_|\n"));
        assert_eq!(catalog.get("boat"), None);
    }

    #[test]
    fn functional_upsert_appends_then_replaces_by_exact_name() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("ascii_art.json");
        std::fs::write(&path, r#"[{"name": "flip", "text": "(╯°□°)╯"}]"#).expect("seed");

        let outcome = upsert_text_art(&path, "ship", "~~boat~~\n").expect("append");
        assert_eq!(outcome, UpsertOutcome::Appended);
        let outcome = upsert_text_art(&path, "ship", "~~BOAT~~\n").expect("replace");
        assert_eq!(outcome, UpsertOutcome::Replaced);

        let catalog = TextArtCatalog::load(&path).expect("load");
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("ship"), Some("~~BOAT~~\n"));
        assert_eq!(catalog.get("flip"), Some("(╯°□°)╯"));
    }

    #[test]
    fn functional_upsert_creates_missing_catalog() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("ascii_art.json");
        assert_eq!(
            upsert_text_art(&path, "ship", "boat").expect("create"),
            UpsertOutcome::Appended
        );
        assert_eq!(TextArtCatalog::load(&path).expect("load").len(), 1);
    }

    #[test]
    fn regression_upsert_refuses_to_overwrite_unparsable_catalog() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("ascii_art.json");
        std::fs::write(&path, "{broken").expect("seed");
        assert!(upsert_text_art(&path, "ship", "boat").is_err());
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "{broken");
    }
}
