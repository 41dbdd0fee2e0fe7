use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::catalog::{self, Catalog};
use crate::config::Config;
use crate::diff::{diff, ChangeSet};
use crate::error::{Result, LocsyncError};
use crate::ledger::{fingerprint_of, Ledger, SnapshotStore};
use crate::merge::apply;
use crate::translate::{Translator, TranslatorFactory};

/// File-change signal delivered by the host's change-signal source.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
}

/// Terminal state of one processed change signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Not a catalog file
    Skipped,
    /// Content identical to the last observed state, or no keys changed
    Unchanged,
    /// A target catalog was edited directly; its fingerprint was recorded
    TargetRecorded,
    /// Source changes were fanned out to every target
    Synced(ChangeSet),
}

/// Per-file comparison against the ledger, for the status report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Unchanged,
    Changed,
    Untracked,
}

/// Summary of one directory sweep.
#[derive(Debug, Default, Clone, Copy)]
pub struct SweepReport {
    pub synced: usize,
    pub recorded: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Hook invoked after a source sync is committed, with the source filename
/// and the propagated change set. Notification only; it cannot affect
/// synchronizer state.
pub type CompletionHook = Box<dyn Fn(&str, &ChangeSet) + Send + Sync>;

/// Drives a file-change signal through detection, delta computation,
/// per-target application, and fingerprint commit.
pub struct Synchronizer {
    config: Config,
    translator: Box<dyn Translator>,
    ledger: Ledger,
    snapshots: SnapshotStore,
    on_complete: Option<CompletionHook>,
}

impl Synchronizer {
    /// Create a synchronizer with the gateway selected by the configuration.
    pub async fn new(config: Config) -> Result<Self> {
        let translator = TranslatorFactory::create(&config.translate);
        Self::with_translator(config, translator).await
    }

    /// Create a synchronizer with an injected translation gateway.
    pub async fn with_translator(config: Config, translator: Box<dyn Translator>) -> Result<Self> {
        let dir = &config.catalog.dir;

        // An unusable catalog directory is the one fatal startup error
        std::fs::read_dir(dir).map_err(|e| {
            LocsyncError::Config(format!(
                "Catalog directory {} is not readable: {}", dir.display(), e
            ))
        })?;

        if config.catalog.target_languages.is_empty() {
            warn!("No target languages configured; source changes will only be fingerprinted");
        }

        let ledger = Ledger::load(dir).await;
        let snapshots = SnapshotStore::load(dir).await;

        Ok(Self {
            config,
            translator,
            ledger,
            snapshots,
            on_complete: None,
        })
    }

    /// Register a hook to run after each committed source sync.
    pub fn on_complete(mut self, hook: CompletionHook) -> Self {
        self.on_complete = Some(hook);
        self
    }

    /// Process one file-change signal to its terminal state.
    pub async fn handle_event(&mut self, event: &ChangeEvent) -> Result<SyncOutcome> {
        let filename = match event.path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => return Ok(SyncOutcome::Skipped),
        };

        if filename.starts_with('.') {
            return Ok(SyncOutcome::Skipped);
        }

        let tag = match catalog::language_tag(&filename) {
            Some(tag) => tag.to_string(),
            None => {
                debug!("Ignoring non-catalog file {}", filename);
                return Ok(SyncOutcome::Skipped);
            }
        };

        let current = catalog::load(&event.path).await;
        let fingerprint = fingerprint_of(&current)?;

        if self.ledger.get(&filename) == Some(fingerprint.as_str()) {
            debug!("{} unchanged since last sync", filename);
            return Ok(SyncOutcome::Unchanged);
        }

        if tag != self.config.catalog.source_language {
            // A target catalog edited directly. The edit is accepted as-is;
            // synchronization is one-directional, source to targets.
            info!("Recording direct edit of target catalog {}", filename);
            self.ledger.set(&filename, fingerprint);
            self.ledger.persist().await?;
            return Ok(SyncOutcome::TargetRecorded);
        }

        self.sync_source(&filename, current, fingerprint).await
    }

    /// Fan a source change out to every configured target, then commit the
    /// source fingerprint and snapshot.
    async fn sync_source(
        &mut self,
        filename: &str,
        current: Catalog,
        fingerprint: String,
    ) -> Result<SyncOutcome> {
        let empty = Catalog::new();
        let previous = self.snapshots.get(filename).unwrap_or(&empty);
        let changes = diff(previous, &current);

        if changes.is_empty() {
            debug!("{} changed on disk but no keys differ", filename);
            self.commit_source(filename, current, fingerprint).await?;
            return Ok(SyncOutcome::Unchanged);
        }

        info!("{}: {} changed key(s)", filename, changes.len());

        let source_lang = self.config.catalog.source_language.clone();
        let target_languages = self.config.catalog.target_languages.clone();
        let mut write_failure: Option<LocsyncError> = None;

        for target_lang in &target_languages {
            if *target_lang == source_lang {
                debug!("Skipping self-target {}", target_lang);
                continue;
            }

            let target_filename = catalog::catalog_filename(target_lang);
            let target_path = self.config.catalog.dir.join(&target_filename);
            let mut target = catalog::load(&target_path).await;

            let mut translated = ChangeSet::new();
            for (path, value) in &changes {
                let text = match self.translator.translate(value, &source_lang, target_lang).await {
                    Ok(translation) => translation,
                    Err(e) => {
                        warn!(
                            "Translation failed for {} key {}: {}; keeping source text",
                            target_filename, path, e
                        );
                        value.clone()
                    }
                };
                translated.insert(path.clone(), text);
            }

            apply(&mut target, &translated);

            match catalog::save(&target_path, &target).await {
                Ok(()) => {
                    self.ledger.set(&target_filename, fingerprint_of(&target)?);
                    self.ledger.persist().await?;
                    info!("Updated {}", target_filename);
                }
                Err(e) => {
                    // The stale ledger entry stays so the next signal
                    // retries this target
                    warn!("Failed to write {}: {}", target_filename, e);
                    if write_failure.is_none() {
                        write_failure = Some(e);
                    }
                }
            }
        }

        if let Some(e) = write_failure {
            // Source fingerprint is not committed either: the next change
            // signal reprocesses the whole fan-out
            return Err(e);
        }

        self.commit_source(filename, current, fingerprint).await?;

        if let Some(hook) = &self.on_complete {
            hook(filename, &changes);
        }

        Ok(SyncOutcome::Synced(changes))
    }

    async fn commit_source(
        &mut self,
        filename: &str,
        current: Catalog,
        fingerprint: String,
    ) -> Result<()> {
        self.ledger.set(filename, fingerprint);
        self.ledger.persist().await?;
        self.snapshots.set(filename, current);
        self.snapshots.persist().await?;
        Ok(())
    }

    /// Process every catalog file in the directory once, in filename order,
    /// then discard the fingerprint ledger so the next sweep re-validates
    /// everything from content.
    pub async fn sweep(&mut self) -> Result<SweepReport> {
        let filenames = self.catalog_filenames();

        info!(
            "Sweeping {} catalog file(s) in {}",
            filenames.len(),
            self.config.catalog.dir.display()
        );

        let mut report = SweepReport::default();
        for filename in filenames {
            let event = ChangeEvent {
                kind: ChangeKind::Modified,
                path: self.config.catalog.dir.join(&filename),
            };
            match self.handle_event(&event).await {
                Ok(SyncOutcome::Synced(_)) => report.synced += 1,
                Ok(SyncOutcome::TargetRecorded) => report.recorded += 1,
                Ok(SyncOutcome::Unchanged) => report.unchanged += 1,
                Ok(SyncOutcome::Skipped) => report.skipped += 1,
                Err(e) => {
                    warn!("Failed to sync {}: {}", filename, e);
                    report.failed += 1;
                }
            }
        }

        // Full-resync semantics: the next sweep starts from an empty ledger
        // and re-validates content instead of trusting stored fingerprints
        self.ledger.reset().await?;

        Ok(report)
    }

    /// Compare each catalog file's current content against the ledger
    /// without writing anything.
    pub async fn status(&self) -> Result<Vec<(String, FileStatus)>> {
        let mut rows = Vec::new();
        for filename in self.catalog_filenames() {
            let path = self.config.catalog.dir.join(&filename);
            let current = catalog::load(&path).await;
            let fingerprint = fingerprint_of(&current)?;

            let status = match self.ledger.get(&filename) {
                Some(stored) if stored == fingerprint => FileStatus::Unchanged,
                Some(_) => FileStatus::Changed,
                None => FileStatus::Untracked,
            };
            rows.push((filename, status));
        }
        Ok(rows)
    }

    /// Consume change signals until the channel closes. Signals are handled
    /// one at a time; a failed sync is logged and the loop continues.
    pub async fn run(&mut self, mut events: mpsc::Receiver<ChangeEvent>) -> Result<()> {
        while let Some(event) = events.recv().await {
            match self.handle_event(&event).await {
                Ok(outcome) => debug!("{}: {:?}", event.path.display(), outcome),
                Err(e) => warn!("Failed to process {}: {}", event.path.display(), e),
            }
        }
        Ok(())
    }

    /// Catalog filenames in the configured directory, sorted. Dotfiles and
    /// non-catalog files are excluded.
    fn catalog_filenames(&self) -> Vec<String> {
        let mut filenames = Vec::new();
        for entry in WalkDir::new(&self.config.catalog.dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') && catalog::language_tag(name).is_some() {
                    filenames.push(name.to_string());
                }
            }
        }
        filenames.sort();
        filenames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use serde_json::json;
    use tempfile::TempDir;

    use crate::config::{CatalogConfig, Config, GatewayMode, TranslateConfig};
    use crate::ledger::LEDGER_FILENAME;
    use crate::translate::MockTranslator;

    fn test_config(dir: &Path, targets: &[&str]) -> Config {
        Config {
            catalog: CatalogConfig {
                dir: dir.to_path_buf(),
                source_language: "en".to_string(),
                target_languages: targets.iter().map(|s| s.to_string()).collect(),
            },
            translate: TranslateConfig {
                mode: GatewayMode::Passthrough,
                endpoint: "http://localhost:11434".to_string(),
                model: "llama3.2:3b".to_string(),
                timeout_secs: 5,
            },
        }
    }

    fn write_catalog(dir: &Path, filename: &str, value: serde_json::Value) {
        let content = serde_json::to_string_pretty(&value).expect("serialize");
        std::fs::write(dir.join(filename), content).expect("write");
    }

    fn read_catalog(dir: &Path, filename: &str) -> serde_json::Value {
        let content = std::fs::read_to_string(dir.join(filename)).expect("read");
        serde_json::from_str(&content).expect("parse")
    }

    fn modified(dir: &Path, filename: &str) -> ChangeEvent {
        ChangeEvent {
            kind: ChangeKind::Modified,
            path: dir.join(filename),
        }
    }

    #[tokio::test]
    async fn test_changed_source_key_propagates_to_target() {
        let dir = TempDir::new().expect("tempdir");
        write_catalog(dir.path(), "en.json", json!({"a": {"b": "Cancel"}}));
        write_catalog(dir.path(), "es.json", json!({"existing": "Hola"}));

        let mut mock = MockTranslator::new();
        mock.expect_translate()
            .withf(|text, source, target| text == "Cancel" && source == "en" && target == "es")
            .times(1)
            .returning(|_, _, _| Ok("Cancelar".to_string()));
        mock.expect_translate()
            .withf(|text, source, target| text == "Save" && source == "en" && target == "es")
            .times(1)
            .returning(|_, _, _| Ok("Guardar".to_string()));

        let config = test_config(dir.path(), &["es"]);
        let mut sync = Synchronizer::with_translator(config, Box::new(mock))
            .await
            .expect("synchronizer");

        // First sync: no snapshot yet, every key counts as changed
        let outcome = sync
            .handle_event(&modified(dir.path(), "en.json"))
            .await
            .expect("first sync");
        assert!(matches!(outcome, SyncOutcome::Synced(_)));
        assert_eq!(read_catalog(dir.path(), "es.json")["a"]["b"], "Cancelar");

        // Edit one key in the source; only that key is re-translated
        write_catalog(dir.path(), "en.json", json!({"a": {"b": "Save"}}));
        let outcome = sync
            .handle_event(&modified(dir.path(), "en.json"))
            .await
            .expect("second sync");

        let SyncOutcome::Synced(changes) = outcome else {
            panic!("expected a synced outcome");
        };
        assert_eq!(changes.len(), 1);
        assert_eq!(changes.get("a.b"), Some(&"Save".to_string()));

        let es = read_catalog(dir.path(), "es.json");
        assert_eq!(es["a"]["b"], "Guardar");
        assert_eq!(es["existing"], "Hola");

        // Both files are tracked by the ledger now
        let ledger = Ledger::load(dir.path()).await;
        assert!(ledger.get("en.json").is_some());
        assert!(ledger.get("es.json").is_some());
    }

    #[tokio::test]
    async fn test_unchanged_source_is_a_no_op() {
        let dir = TempDir::new().expect("tempdir");
        write_catalog(dir.path(), "en.json", json!({"title": "Home"}));

        let mut mock = MockTranslator::new();
        mock.expect_translate()
            .times(1)
            .returning(|text, _, _| Ok(format!("{}!", text)));

        let config = test_config(dir.path(), &["es"]);
        let calls = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&calls);
        let mut sync = Synchronizer::with_translator(config, Box::new(mock))
            .await
            .expect("synchronizer")
            .on_complete(Box::new(move |filename, changes| {
                seen.lock()
                    .expect("lock")
                    .push((filename.to_string(), changes.clone()));
            }));

        let outcome = sync
            .handle_event(&modified(dir.path(), "en.json"))
            .await
            .expect("first sync");
        assert!(matches!(outcome, SyncOutcome::Synced(_)));

        // Same content again: no writes, no gateway calls, no callback
        let outcome = sync
            .handle_event(&modified(dir.path(), "en.json"))
            .await
            .expect("second sync");
        assert_eq!(outcome, SyncOutcome::Unchanged);

        let calls = calls.lock().expect("lock");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "en.json");
        assert_eq!(calls[0].1.get("title"), Some(&"Home".to_string()));
    }

    #[tokio::test]
    async fn test_non_catalog_files_are_ignored() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(dir.path().join("notes.txt"), "scratch").expect("write");

        let config = test_config(dir.path(), &["es"]);
        let mut sync = Synchronizer::with_translator(config, Box::new(MockTranslator::new()))
            .await
            .expect("synchronizer");

        let outcome = sync
            .handle_event(&modified(dir.path(), "notes.txt"))
            .await
            .expect("event");
        assert_eq!(outcome, SyncOutcome::Skipped);

        let ledger = Ledger::load(dir.path()).await;
        assert!(ledger.get("notes.txt").is_none());
    }

    #[tokio::test]
    async fn test_direct_target_edit_is_recorded_not_diffed() {
        let dir = TempDir::new().expect("tempdir");
        write_catalog(dir.path(), "es.json", json!({"title": "Inicio"}));

        // Any translate call would fail the test
        let config = test_config(dir.path(), &["es"]);
        let mut sync = Synchronizer::with_translator(config, Box::new(MockTranslator::new()))
            .await
            .expect("synchronizer");

        let outcome = sync
            .handle_event(&modified(dir.path(), "es.json"))
            .await
            .expect("event");
        assert_eq!(outcome, SyncOutcome::TargetRecorded);

        let ledger = Ledger::load(dir.path()).await;
        assert!(ledger.get("es.json").is_some());
        assert_eq!(read_catalog(dir.path(), "es.json")["title"], "Inicio");
    }

    #[tokio::test]
    async fn test_gateway_failure_falls_back_to_source_text() {
        let dir = TempDir::new().expect("tempdir");
        write_catalog(
            dir.path(),
            "en.json",
            json!({"ok": "Fine", "broken": "Oops"}),
        );

        let mut mock = MockTranslator::new();
        mock.expect_translate()
            .withf(|text, _, _| text == "Fine")
            .times(1)
            .returning(|_, _, _| Ok("Bien".to_string()));
        mock.expect_translate()
            .withf(|text, _, _| text == "Oops")
            .times(1)
            .returning(|_, _, _| {
                Err(LocsyncError::Translation("gateway timed out".to_string()))
            });

        let config = test_config(dir.path(), &["es"]);
        let mut sync = Synchronizer::with_translator(config, Box::new(mock))
            .await
            .expect("synchronizer");

        let outcome = sync
            .handle_event(&modified(dir.path(), "en.json"))
            .await
            .expect("sync");
        assert!(matches!(outcome, SyncOutcome::Synced(_)));

        // The failed key still lands in the target, untranslated
        let es = read_catalog(dir.path(), "es.json");
        assert_eq!(es["ok"], "Bien");
        assert_eq!(es["broken"], "Oops");
    }

    #[tokio::test]
    async fn test_source_language_in_targets_is_skipped() {
        let dir = TempDir::new().expect("tempdir");
        write_catalog(dir.path(), "en.json", json!({"title": "Home"}));

        let mut mock = MockTranslator::new();
        // Only the real target gets a gateway call
        mock.expect_translate()
            .withf(|_, _, target| target == "es")
            .times(1)
            .returning(|_, _, _| Ok("Inicio".to_string()));

        let config = test_config(dir.path(), &["en", "es"]);
        let mut sync = Synchronizer::with_translator(config, Box::new(mock))
            .await
            .expect("synchronizer");

        sync.handle_event(&modified(dir.path(), "en.json"))
            .await
            .expect("sync");

        assert_eq!(read_catalog(dir.path(), "es.json")["title"], "Inicio");
        // No en-targeted output was produced; en.json keeps source content
        assert_eq!(read_catalog(dir.path(), "en.json")["title"], "Home");
    }

    #[tokio::test]
    async fn test_sweep_processes_everything_and_resets_ledger() {
        let dir = TempDir::new().expect("tempdir");
        write_catalog(dir.path(), "en.json", json!({"title": "Home"}));
        write_catalog(dir.path(), "fr.json", json!({"title": "Accueil"}));
        std::fs::write(dir.path().join("notes.txt"), "scratch").expect("write");

        let mut mock = MockTranslator::new();
        mock.expect_translate()
            .returning(|text, _, _| Ok(text.to_string()));

        let config = test_config(dir.path(), &["fr"]);
        let mut sync = Synchronizer::with_translator(config, Box::new(mock))
            .await
            .expect("synchronizer");

        let report = sync.sweep().await.expect("sweep");
        // en.json fans out to fr.json, whose fingerprint is recorded at save
        // time; the sweep then sees fr.json as already up to date
        assert_eq!(report.synced, 1);
        assert_eq!(report.unchanged, 1);
        assert_eq!(report.recorded, 0);
        assert_eq!(report.failed, 0);
        assert_eq!(read_catalog(dir.path(), "fr.json")["title"], "Home");

        // Full-resync semantics: the ledger file is gone after the sweep
        assert!(!dir.path().join(LEDGER_FILENAME).exists());
    }

    #[tokio::test]
    async fn test_status_reports_changed_and_untracked_files() {
        let dir = TempDir::new().expect("tempdir");
        write_catalog(dir.path(), "en.json", json!({"title": "Home"}));
        write_catalog(dir.path(), "es.json", json!({"title": "Inicio"}));

        let mut mock = MockTranslator::new();
        mock.expect_translate()
            .returning(|text, _, _| Ok(text.to_string()));

        let config = test_config(dir.path(), &["es"]);
        let mut sync = Synchronizer::with_translator(config, Box::new(mock))
            .await
            .expect("synchronizer");

        sync.handle_event(&modified(dir.path(), "en.json"))
            .await
            .expect("sync");

        write_catalog(dir.path(), "en.json", json!({"title": "Start"}));
        write_catalog(dir.path(), "fr.json", json!({"title": "Accueil"}));

        let rows = sync.status().await.expect("status");
        let get = |name: &str| {
            rows.iter()
                .find(|(f, _)| f == name)
                .map(|(_, s)| *s)
                .expect("row")
        };
        assert_eq!(get("en.json"), FileStatus::Changed);
        assert_eq!(get("es.json"), FileStatus::Unchanged);
        assert_eq!(get("fr.json"), FileStatus::Untracked);
    }

    #[tokio::test]
    async fn test_unreadable_directory_is_fatal() {
        let dir = TempDir::new().expect("tempdir");
        let missing = dir.path().join("no-such-dir");

        let config = test_config(&missing, &["es"]);
        let result = Synchronizer::with_translator(config, Box::new(MockTranslator::new())).await;
        assert!(matches!(result, Err(LocsyncError::Config(_))));
    }

    #[tokio::test]
    async fn test_run_drains_events_until_channel_closes() {
        let dir = TempDir::new().expect("tempdir");
        write_catalog(dir.path(), "en.json", json!({"title": "Home"}));

        let mut mock = MockTranslator::new();
        mock.expect_translate()
            .returning(|text, _, _| Ok(text.to_string()));

        let config = test_config(dir.path(), &["es"]);
        let mut sync = Synchronizer::with_translator(config, Box::new(mock))
            .await
            .expect("synchronizer");

        let (tx, rx) = mpsc::channel(8);
        tx.send(modified(dir.path(), "en.json")).await.expect("send");
        tx.send(modified(dir.path(), "notes.txt")).await.expect("send");
        drop(tx);

        sync.run(rx).await.expect("run");
        assert_eq!(read_catalog(dir.path(), "es.json")["title"], "Home");
    }
}
