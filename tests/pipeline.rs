use std::sync::Mutex;

use podreader::cache::{ArtifactKind, ArtifactStore, FsArtifactStore, MemoryStore};
use podreader::error::PipelineError;
use podreader::label::backend::LabelingBackend;
use podreader::label::orchestrator::{produce_labeled, LabelingOptions};
use podreader::label::speaker::Language;
use podreader::pipeline::controller::{Controller, PipelineSettings};
use podreader::pipeline::state::{ArtifactState, LabeledOutcome};
use podreader::source::RawTranscriptSource;
use tempfile::TempDir;

const SOURCE_ID: &str = "dQw4w9WgXcQ";

struct StaticSource {
    text: String,
    fetches: Mutex<usize>,
}

impl StaticSource {
    fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            fetches: Mutex::new(0),
        }
    }

    fn fetches(&self) -> usize {
        *self.fetches.lock().unwrap()
    }
}

impl RawTranscriptSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    fn fetch_raw(&self, _source_id: &str) -> anyhow::Result<String> {
        *self.fetches.lock().unwrap() += 1;
        Ok(self.text.clone())
    }
}

/// What the fake backend does for a given chunk.
#[derive(Clone, Copy)]
enum Reply {
    /// Alternate INTERVIEWER/GUEST labels in front of the chunk text.
    Label,
    /// Return only whitespace.
    Blank,
    /// Return an error.
    Fail,
    /// Return the first half of the chunk, labeled.
    Truncate,
}

struct FakeBackend {
    script: fn(usize, usize) -> Reply,
    calls: Mutex<Vec<(usize, usize)>>,
}

impl FakeBackend {
    fn new(script: fn(usize, usize) -> Reply) -> Self {
        Self {
            script,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl LabelingBackend for FakeBackend {
    fn name(&self) -> &str {
        "fake"
    }

    fn label(&self, chunk_text: &str, index: usize, total: usize) -> anyhow::Result<String> {
        self.calls.lock().unwrap().push((index, total));
        let label = if index % 2 == 1 { "INTERVIEWER" } else { "GUEST" };
        match (self.script)(index, total) {
            Reply::Label => Ok(format!("{}\n{}", label, chunk_text)),
            Reply::Blank => Ok("  \n".to_string()),
            Reply::Fail => anyhow::bail!("backend unavailable"),
            Reply::Truncate => {
                let half: String = chunk_text.chars().take(chunk_text.chars().count() / 2).collect();
                Ok(format!("{}\n{}", label, half))
            }
        }
    }
}

fn settings(allow_raw_fallback: bool, max_chunk_chars: usize) -> PipelineSettings {
    PipelineSettings {
        allow_raw_fallback,
        labeling: LabelingOptions {
            max_chunk_chars,
            min_ratio: 0.85,
        },
        language: Language::English,
    }
}

fn long_transcript() -> String {
    "so tell me how you started the company well it began in a small garage "
        .repeat(30)
}

#[test]
fn test_reuse_is_idempotent_and_skips_backend() {
    let mut store = MemoryStore::new();
    let raw = long_transcript();
    let source = StaticSource::new(&raw);
    let backend = FakeBackend::new(|_, _| Reply::Label);

    let first = Controller::new(&mut store, &source, &backend, settings(false, 200))
        .run(SOURCE_ID)
        .unwrap();
    assert_eq!(first.labeled.outcome, LabeledOutcome::Regenerated);
    let calls_after_first = backend.call_count();
    assert!(calls_after_first > 1);

    let mut controller = Controller::new(&mut store, &source, &backend, settings(false, 200));
    let second = controller.run(SOURCE_ID).unwrap();
    assert_eq!(second.labeled.outcome, LabeledOutcome::Reused);
    assert_eq!(second.labeled.text, first.labeled.text);
    assert_eq!(backend.call_count(), calls_after_first);
    assert_eq!(source.fetches(), 1);
    assert_eq!(
        controller.history(),
        &[
            (ArtifactKind::Raw, ArtifactState::Ready),
            (ArtifactKind::Labeled, ArtifactState::Ready),
        ]
    );
}

#[test]
fn test_chunks_are_labeled_in_order_once_each() {
    let mut store = MemoryStore::new();
    let raw = long_transcript();
    let source = StaticSource::new(&raw);
    let backend = FakeBackend::new(|_, _| Reply::Label);

    Controller::new(&mut store, &source, &backend, settings(false, 150))
        .run(SOURCE_ID)
        .unwrap();

    let calls = backend.calls.lock().unwrap().clone();
    let total = calls.len();
    let expected: Vec<(usize, usize)> = (1..=total).map(|i| (i, total)).collect();
    assert_eq!(calls, expected);
}

#[test]
fn test_fallback_activation_returns_raw_verbatim() {
    let mut store = MemoryStore::new();
    let raw = long_transcript();
    let source = StaticSource::new(&raw);
    let backend = FakeBackend::new(|_, _| Reply::Fail);

    let mut controller = Controller::new(&mut store, &source, &backend, settings(true, 200));
    let output = controller.run(SOURCE_ID).unwrap();

    assert_eq!(output.labeled.text, raw);
    assert_eq!(output.labeled.source_ratio, 1.0);
    assert!(output.labeled.outcome.is_degraded());
    assert_eq!(
        controller.history().last(),
        Some(&(ArtifactKind::Labeled, ArtifactState::Ready))
    );
    drop(controller);
    assert!(!store.exists(ArtifactKind::Labeled, SOURCE_ID));
}

#[test]
fn test_fallback_suppression_is_fatal_and_caches_nothing() {
    let mut store = MemoryStore::new();
    let raw = long_transcript();
    let source = StaticSource::new(&raw);
    let backend = FakeBackend::new(|_, _| Reply::Fail);

    let err = Controller::new(&mut store, &source, &backend, settings(false, 200))
        .run(SOURCE_ID)
        .unwrap_err();

    assert!(matches!(err, PipelineError::Backend { .. }));
    assert!(!store.exists(ArtifactKind::Labeled, SOURCE_ID));
    // only the raw transcript was persisted
    assert_eq!(store.writes(), 1);
}

#[test]
fn test_half_ratio_cached_artifact_is_regenerated() {
    let mut store = MemoryStore::new();
    let raw = "x".repeat(100);
    store.write(ArtifactKind::Raw, SOURCE_ID, &raw).unwrap();
    let stale = format!("GUEST\n{}", "y".repeat(44));
    store.write(ArtifactKind::Labeled, SOURCE_ID, &stale).unwrap();

    let source = StaticSource::new(&raw);
    let backend = FakeBackend::new(|_, _| Reply::Label);
    let mut controller = Controller::new(&mut store, &source, &backend, settings(false, 1000));
    let output = controller.run(SOURCE_ID).unwrap();

    assert_eq!(output.labeled.outcome, LabeledOutcome::Regenerated);
    assert_ne!(output.labeled.text, stale);
    assert!(controller
        .history()
        .contains(&(ArtifactKind::Labeled, ArtifactState::Stale)));
    drop(controller);
    assert_eq!(store.get(ArtifactKind::Labeled, SOURCE_ID), Some(output.labeled.text.as_str()));
}

#[test]
fn test_half_ratio_regeneration_without_fallback_fails() {
    let mut store = MemoryStore::new();
    let raw = long_transcript();
    let source = StaticSource::new(&raw);
    let backend = FakeBackend::new(|_, _| Reply::Truncate);

    let err = Controller::new(&mut store, &source, &backend, settings(false, 200))
        .run(SOURCE_ID)
        .unwrap_err();
    match err {
        PipelineError::Backend { context } => assert!(context.contains("minimum 85.00%"), "{context}"),
        other => panic!("expected Backend error, got {other:?}"),
    }
    assert!(!store.exists(ArtifactKind::Labeled, SOURCE_ID));
}

#[test]
fn test_abc_scenario_orchestrator_and_controller() {
    let raw = "A B C";
    let second_blank: fn(usize, usize) -> Reply =
        |index, _| if index == 2 { Reply::Blank } else { Reply::Label };

    // Orchestrator alone
    let backend = FakeBackend::new(second_blank);
    let options = LabelingOptions {
        max_chunk_chars: 3,
        min_ratio: 0.85,
    };
    let err = produce_labeled(raw, &backend, &options).unwrap_err();
    assert!(matches!(err, PipelineError::Backend { .. }));
    assert_eq!(backend.calls.lock().unwrap().clone(), vec![(1, 2), (2, 2)]);

    // Controller without fallback
    let mut store = MemoryStore::new();
    let source = StaticSource::new(raw);
    let backend = FakeBackend::new(second_blank);
    let err = Controller::new(&mut store, &source, &backend, settings(false, 3))
        .run(SOURCE_ID)
        .unwrap_err();
    assert!(matches!(err, PipelineError::Backend { .. }));

    // Controller with fallback
    let mut store = MemoryStore::new();
    let backend = FakeBackend::new(second_blank);
    let output = Controller::new(&mut store, &source, &backend, settings(true, 3))
        .run(SOURCE_ID)
        .unwrap();
    assert_eq!(output.labeled.text, "A B C");
}

#[test]
fn test_edited_cache_without_labels_is_regenerated() {
    let mut store = MemoryStore::new();
    let raw = long_transcript();
    store.write(ArtifactKind::Raw, SOURCE_ID, &raw).unwrap();
    // Same length as raw but hand-edited to drop the speaker labels.
    store.write(ArtifactKind::Labeled, SOURCE_ID, &raw).unwrap();

    let source = StaticSource::new(&raw);
    let backend = FakeBackend::new(|_, _| Reply::Label);
    let output = Controller::new(&mut store, &source, &backend, settings(false, 200))
        .run(SOURCE_ID)
        .unwrap();

    assert_eq!(output.labeled.outcome, LabeledOutcome::Regenerated);
    assert!(output.labeled.text.contains("INTERVIEWER"));
    assert_eq!(source.fetches(), 0);
}

#[test]
fn test_fallback_enabled_reuses_nothing_it_did_not_validate() {
    // A degraded run must not poison the cache: the next run retries labeling.
    let mut store = MemoryStore::new();
    let raw = long_transcript();
    let source = StaticSource::new(&raw);

    let failing = FakeBackend::new(|_, _| Reply::Fail);
    let degraded = Controller::new(&mut store, &source, &failing, settings(true, 200))
        .run(SOURCE_ID)
        .unwrap();
    assert!(degraded.labeled.outcome.is_degraded());

    let working = FakeBackend::new(|_, _| Reply::Label);
    let recovered = Controller::new(&mut store, &source, &working, settings(true, 200))
        .run(SOURCE_ID)
        .unwrap();
    assert_eq!(recovered.labeled.outcome, LabeledOutcome::Regenerated);
    assert!(working.call_count() > 0);
}

#[test]
fn test_filesystem_store_round_trip_through_controller() {
    let tmp = TempDir::new().unwrap();
    let mut store = FsArtifactStore::new(tmp.path());
    let raw = long_transcript();
    let source = StaticSource::new(&raw);
    let backend = FakeBackend::new(|_, _| Reply::Label);

    let first = Controller::new(&mut store, &source, &backend, settings(false, 300))
        .run(SOURCE_ID)
        .unwrap();

    let labeled_path = store.path(ArtifactKind::Labeled, SOURCE_ID);
    assert_eq!(std::fs::read_to_string(&labeled_path).unwrap(), first.labeled.text);

    let mut reopened = FsArtifactStore::new(tmp.path());
    let second = Controller::new(&mut reopened, &source, &backend, settings(false, 300))
        .run(SOURCE_ID)
        .unwrap();
    assert_eq!(second.labeled.outcome, LabeledOutcome::Reused);
    assert_eq!(second.labeled.text, first.labeled.text);
}
