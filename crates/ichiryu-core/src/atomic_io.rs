use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{anyhow, bail, Context, Result};

static STAGING_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Replaces `path` with `content` via a synced sibling file and a rename, so
/// a crash leaves either the old file or the new one.
pub fn write_text_atomic(path: &Path, content: &str) -> Result<()> {
    write_bytes_atomic(path, content.as_bytes())
}

/// Byte variant of [`write_text_atomic`]; the name-index cache uses it.
pub fn write_bytes_atomic(path: &Path, content: &[u8]) -> Result<()> {
    if path.is_dir() {
        bail!("destination path '{}' is a directory", path.display());
    }
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("destination path '{}' has no file name", path.display()))?;
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(directory)
        .with_context(|| format!("failed to create directory {}", directory.display()))?;

    let staging = directory.join(format!(
        ".{file_name}.{}-{}.partial",
        std::process::id(),
        STAGING_SEQUENCE.fetch_add(1, Ordering::Relaxed)
    ));
    let replaced = stage(&staging, content).and_then(|()| {
        std::fs::rename(&staging, path).with_context(|| {
            format!(
                "failed to move {} into place at {}",
                staging.display(),
                path.display()
            )
        })
    });
    if replaced.is_err() {
        let _ = std::fs::remove_file(&staging);
    }
    replaced
}

fn stage(staging: &Path, content: &[u8]) -> Result<()> {
    let mut file = File::create(staging)
        .with_context(|| format!("failed to create {}", staging.display()))?;
    file.write_all(content)
        .with_context(|| format!("failed to write {}", staging.display()))?;
    file.sync_all()
        .with_context(|| format!("failed to sync {}", staging.display()))
}
