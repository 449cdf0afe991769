use std::path::Path;

use anyhow::{Context, Result};
use ichiryu_index::{load_catalog, save_index_cache, NameIndex};
use ichiryu_rules::{upsert_text_art, UpsertOutcome};
use tokio::sync::watch;

use crate::bootstrap::build_supervisor;
use crate::settings::BotSettings;

pub(crate) async fn run_bot(config_path: &Path) -> Result<()> {
    let settings = BotSettings::load(config_path)?;
    tracing::info!(
        server = %settings.server,
        port = settings.port,
        channel = %settings.channel,
        nick = %settings.nickname,
        "starting ichiryu"
    );
    let mut supervisor = build_supervisor(&settings)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("shutdown requested");
                let _ = signal_tx.send(true);
            }
            Err(error) => {
                tracing::warn!(error = %error, "failed to listen for ctrl-c; shutdown signal disabled");
            }
        }
    });

    let report = supervisor.run(shutdown_rx).await?;
    drop(shutdown_tx);
    tracing::info!(
        attempts = report.connection_attempts,
        sessions = report.sessions,
        "ichiryu stopped"
    );
    Ok(())
}

pub(crate) fn art_add(file: &Path, name: &str, catalog: &Path) -> Result<UpsertOutcome> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read text-art source {}", file.display()))?;
    let outcome = upsert_text_art(catalog, name, &text)?;
    tracing::info!(name, catalog = %catalog.display(), ?outcome, "text-art entry stored");
    Ok(outcome)
}

pub(crate) fn index_build(catalog: &Path, cache: &Path) -> Result<NameIndex> {
    let records = load_catalog(catalog)?;
    let index = NameIndex::build(&records);
    save_index_cache(cache, &index)?;
    tracing::info!(
        catalog = %catalog.display(),
        cache = %cache.display(),
        entries = index.len(),
        max_key_length = index.max_key_length(),
        "name index cache written"
    );
    Ok(index)
}

#[cfg(test)]
mod tests {
    use ichiryu_index::load_index_cache;
    use ichiryu_rules::{TextArtCatalog, UpsertOutcome};

    use super::{art_add, index_build};

    #[test]
    fn functional_art_add_appends_then_replaces_entry() {
        let temp = tempfile::tempdir().expect("tempdir");
        let source = temp.path().join("boat.txt");
        let catalog = temp.path().join("ascii_art.json");
        std::fs::write(&source, " _\n|_|\n").expect("write source");

        assert_eq!(
            art_add(&source, "ship", &catalog).expect("append"),
            UpsertOutcome::Appended
        );
        std::fs::write(&source, "~~~\n").expect("rewrite source");
        assert_eq!(
            art_add(&source, "ship", &catalog).expect("replace"),
            UpsertOutcome::Replaced
        );
        let loaded = TextArtCatalog::load(&catalog).expect("load");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.get("ship"), Some("~~~\n"));
    }

    #[test]
    fn regression_art_add_missing_source_names_the_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let error = art_add(
            &temp.path().join("nope.txt"),
            "ship",
            &temp.path().join("ascii_art.json"),
        )
        .expect_err("missing source");
        assert!(error.to_string().contains("nope.txt"));
        assert!(!temp.path().join("ascii_art.json").exists());
    }

    #[test]
    fn functional_index_build_writes_loadable_cache() {
        let temp = tempfile::tempdir().expect("tempdir");
        let catalog = temp.path().join("cards.json");
        let cache = temp.path().join("cards.cache");
        std::fs::write(
            &catalog,
            r#"[
                {"name": "Black Lotus", "imgUrl": "http://img.example/3_blacklotus.jpg"},
                {"name": "Black Lotus", "imgUrl": "http://img.example/600_blacklotus.jpg"},
                {"name": "Forest"}
            ]"#,
        )
        .expect("write catalog");

        let built = index_build(&catalog, &cache).expect("build");
        assert_eq!(built.len(), 1);
        let loaded = load_index_cache(&cache).expect("load cache");
        assert_eq!(loaded, built);
        assert_eq!(
            loaded.get("black lotus"),
            Some("http://img.example/600_blacklotus.jpg")
        );
    }
}
