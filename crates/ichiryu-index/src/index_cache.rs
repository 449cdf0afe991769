//! Binary cache for a built [`NameIndex`].
//!
//! The cache carries no checksum or catalog fingerprint. When the catalog
//! changes the operator deletes the cache file to force a rebuild.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ichiryu_core::write_bytes_atomic;
use thiserror::Error;

use crate::catalog::load_catalog;
use crate::name_index::NameIndex;

#[derive(Debug, Error)]
/// Enumerates reasons a cached index could not be used.
pub enum CacheLoadError {
    #[error("index cache {0} does not exist")]
    NotFound(PathBuf),
    #[error("failed to read index cache {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("index cache {path} is corrupt")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },
}

/// Loads a previously saved index.
pub fn load_index_cache(path: &Path) -> Result<NameIndex, CacheLoadError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            return Err(CacheLoadError::NotFound(path.to_path_buf()));
        }
        Err(source) => {
            return Err(CacheLoadError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    bincode::deserialize::<NameIndex>(&bytes).map_err(|source| CacheLoadError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes `index` to `path` atomically.
pub fn save_index_cache(path: &Path, index: &NameIndex) -> Result<()> {
    let bytes = bincode::serialize(index).context("failed to encode index cache")?;
    write_bytes_atomic(path, &bytes)
        .with_context(|| format!("failed to write index cache {}", path.display()))
}

/// Loads the cached index when usable, otherwise builds it from the catalog
/// and refreshes the cache. Failing to write the cache is only a warning.
pub fn load_or_build_index(cache_path: &Path, catalog_path: &Path) -> Result<NameIndex> {
    match load_index_cache(cache_path) {
        Ok(index) => {
            tracing::info!(
                path = %cache_path.display(),
                entries = index.len(),
                "loaded name index from cache; delete it to rebuild from the catalog"
            );
            return Ok(index);
        }
        Err(CacheLoadError::NotFound(_)) => {
            tracing::info!(path = %cache_path.display(), "no name index cache, building from catalog");
        }
        Err(error) => {
            tracing::warn!(error = %error, "ignoring unusable name index cache");
        }
    }

    let records = load_catalog(catalog_path)?;
    let index = NameIndex::build(&records);
    tracing::info!(
        catalog = %catalog_path.display(),
        records = records.len(),
        entries = index.len(),
        max_key_length = index.max_key_length(),
        "built name index"
    );
    if let Err(error) = save_index_cache(cache_path, &index) {
        tracing::warn!(error = %format!("{error:#}"), "failed to persist name index cache");
    }
    Ok(index)
}
