//! JSON source catalog loading.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::Value;

/// One usable `{ name, imgUrl }` record from the source catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRecord {
    pub name: String,
    pub img_url: String,
}

impl CatalogRecord {
    pub fn new(name: impl Into<String>, img_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            img_url: img_url.into(),
        }
    }
}

/// Reads and parses the catalog file at `path`.
pub fn load_catalog(path: &Path) -> Result<Vec<CatalogRecord>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog {}", path.display()))?;
    parse_catalog(&raw).with_context(|| format!("failed to parse catalog {}", path.display()))
}

/// Parses a catalog document. Records without string `name` and `imgUrl`
/// fields are skipped with a warning; a document that is not a JSON array
/// is an error.
pub fn parse_catalog(raw: &str) -> Result<Vec<CatalogRecord>> {
    let document: Value = serde_json::from_str(raw).context("catalog is not valid JSON")?;
    let Value::Array(entries) = document else {
        bail!("catalog root must be a JSON array");
    };

    let mut records = Vec::with_capacity(entries.len());
    for (position, entry) in entries.iter().enumerate() {
        let name = entry.get("name").and_then(Value::as_str);
        let img_url = entry.get("imgUrl").and_then(Value::as_str);
        match (name, img_url) {
            (Some(name), Some(img_url)) => records.push(CatalogRecord::new(name, img_url)),
            _ => {
                tracing::warn!(position, "skipping catalog record without string name/imgUrl");
            }
        }
    }
    Ok(records)
}
