use std::cell::RefCell;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::cache::{ArtifactKind, ArtifactStore, FsArtifactStore};
use crate::config::Config;
use crate::error::PipelineError;
use crate::label::backend::LabelingBackend;
use crate::label::gemini::GeminiBackend;
use crate::pipeline::controller::{lookup_labeled, Controller, PipelineSettings, RawTranscript};
use crate::pipeline::state::LabeledLookup;
use crate::render;
use crate::source::timedtext::TimedTextSource;
use crate::source::video_id_from_url;

/// Command-line overrides for a single run.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub allow_raw_fallback: bool,
    pub min_ratio: Option<f64>,
}

/// Builds the Gemini client on first use, so runs that reuse a cached labeled
/// transcript never need an API key.
struct LazyGemini<'c> {
    config: &'c Config,
    inner: RefCell<Option<GeminiBackend>>,
}

impl<'c> LazyGemini<'c> {
    fn new(config: &'c Config) -> Self {
        Self {
            config,
            inner: RefCell::new(None),
        }
    }
}

impl LabelingBackend for LazyGemini<'_> {
    fn name(&self) -> &str {
        "gemini"
    }

    fn label(&self, chunk_text: &str, index: usize, total: usize) -> Result<String> {
        let mut slot = self.inner.borrow_mut();
        let backend = match slot.take() {
            Some(backend) => backend,
            None => GeminiBackend::from_config(self.config)?,
        };
        let result = backend.label(chunk_text, index, total);
        *slot = Some(backend);
        result
    }
}

/// Apply overrides and validate, before touching the network or the cache.
fn prepare(config: &Config, overrides: &RunOverrides) -> Result<Config> {
    let mut config = config.clone();
    if overrides.allow_raw_fallback {
        config.pipeline.allow_raw_fallback = true;
    }
    if let Some(ratio) = overrides.min_ratio {
        config.pipeline.min_ratio = ratio;
    }
    config.validate()?;
    Ok(config)
}

/// Full pipeline: raw transcript, labeled transcript, rendered document.
pub fn run_pipeline(
    config: &Config,
    locator: &str,
    title: &str,
    overrides: &RunOverrides,
) -> Result<PathBuf> {
    let config = prepare(config, overrides)?;
    let settings = PipelineSettings::from_config(&config.pipeline)?;
    let source_id = video_id_from_url(locator)?;

    tracing::info!(
        "Processing {} (fallback {}, min ratio {:.2})",
        source_id,
        if settings.allow_raw_fallback { "enabled" } else { "disabled" },
        settings.labeling.min_ratio
    );

    let mut store = FsArtifactStore::new(&config.cache.directory);
    let source = TimedTextSource::from_config(&config.source)?;
    let backend = LazyGemini::new(&config);

    let output = {
        let mut controller = Controller::new(&mut store, &source, &backend, settings);
        controller.run(&source_id).map_err(|e| match e {
            PipelineError::Backend { .. } => anyhow::Error::new(e).context(
                "Labeling failed and raw fallback is disabled; no document was generated \
                 (set PODREADER_ALLOW_RAW_FALLBACK=1 or pass --allow-raw-fallback to degrade)",
            ),
            PipelineError::QualityGate { .. } => anyhow::Error::new(e)
                .context("Labeled transcript failed the quality gate; no document was generated"),
            other => anyhow::Error::new(other).context(format!("Pipeline failed for {}", source_id)),
        })?
    };

    if output.labeled.outcome.is_degraded() {
        tracing::warn!("Document will contain the raw transcript without speaker labels");
    }

    let doc = render::render(&output.labeled.text, title, &config.render);
    let doc_path = render::write_document(&doc, &config.render.output_dir, &source_id)?;

    println!("Source:      {}", source_id);
    println!("Title:       {}", title);
    println!("Raw:         {}", store.describe(ArtifactKind::Raw, &source_id));
    println!("Labeled:     {}", cached_location(&store, ArtifactKind::Labeled, &source_id));
    println!("Outcome:     {}", output.labeled.outcome);
    println!("Ratio:       {:.2}%", output.labeled.source_ratio * 100.0);
    println!("Document:    {} ({} pages)", doc_path.display(), doc.page_count());

    Ok(doc_path)
}

/// Where an artifact is cached, or `not cached` when a degraded or rejected
/// result was never written.
fn cached_location(store: &dyn ArtifactStore, kind: ArtifactKind, source_id: &str) -> String {
    if store.exists(kind, source_id) {
        store.describe(kind, source_id)
    } else {
        "not cached".to_string()
    }
}

/// Describe what the cache holds for a source and whether it would be reused.
pub fn show_status(config: &Config, locator: &str) -> Result<()> {
    config.validate()?;
    let settings = PipelineSettings::from_config(&config.pipeline)?;
    let source_id = video_id_from_url(locator)?;
    let store = FsArtifactStore::new(&config.cache.directory);

    println!("Source: {}", source_id);
    println!("Cache:  {}", store.root().display());

    let raw_text = match store.read(ArtifactKind::Raw, &source_id) {
        Ok(Some(text)) if !text.trim().is_empty() => {
            println!("Raw:     ready ({} characters)", text.chars().count());
            Some(text)
        }
        Ok(Some(_)) => {
            println!("Raw:     stale (blank)");
            None
        }
        Ok(None) => {
            println!("Raw:     missing");
            None
        }
        Err(e) => {
            println!("Raw:     stale ({})", e);
            None
        }
    };

    let Some(raw_text) = raw_text else {
        let labeled_present = store.exists(ArtifactKind::Labeled, &source_id);
        println!(
            "Labeled: {}",
            if labeled_present { "unknown (raw transcript missing)" } else { "missing" }
        );
        return Ok(());
    };

    let raw = RawTranscript {
        source_id: source_id.clone(),
        text: raw_text,
    };
    let lookup = lookup_labeled(&store, &raw, &settings)?;
    match lookup {
        LabeledLookup::Ready { text, ratio } => println!(
            "Labeled: ready ({} characters, ratio {:.2}%)",
            text.chars().count(),
            ratio * 100.0
        ),
        LabeledLookup::Stale { reason } => println!("Labeled: stale ({})", reason),
        LabeledLookup::Missing => println!("Labeled: missing"),
    }
    Ok(())
}

/// Delete cached artifacts for a source.
pub fn clean(config: &Config, locator: &str) -> Result<()> {
    let source_id = video_id_from_url(locator)?;
    let store = FsArtifactStore::new(&config.cache.directory);
    let removed = store.remove_all(&source_id)?;
    println!("Removed {} cached artifact(s) for {}", removed, source_id);
    Ok(())
}

/// Write the commented default config to `path` (or the platform location).
pub fn init_config(path: Option<&Path>, force: bool) -> Result<PathBuf> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => Config::platform_config_path()
            .context("Could not determine the platform config directory")?,
    };
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists at {} (use --force to overwrite)",
            path.display()
        );
    }
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    std::fs::write(&path, Config::generate_default_commented())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote default config to {}", path.display());
    Ok(path)
}
