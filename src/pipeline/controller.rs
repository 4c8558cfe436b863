use crate::cache::{ArtifactKind, ArtifactStore};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::label::backend::LabelingBackend;
use crate::label::orchestrator::{self, LabelingOptions};
use crate::label::quality::{self, Acceptance};
use crate::label::speaker::Language;
use crate::pipeline::state::{ArtifactState, LabeledLookup, LabeledOutcome};
use crate::source::RawTranscriptSource;

/// Validated controller parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineSettings {
    pub allow_raw_fallback: bool,
    pub labeling: LabelingOptions,
    pub language: Language,
}

impl PipelineSettings {
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            allow_raw_fallback: config.allow_raw_fallback,
            labeling: config.labeling_options(),
            language: config.language()?,
        })
    }

    fn min_ratio(&self) -> f64 {
        self.labeling.min_ratio
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTranscript {
    pub source_id: String,
    pub text: String,
}

/// Labeled text handed downstream, with how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledArtifact {
    pub text: String,
    pub source_ratio: f64,
    pub outcome: LabeledOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub raw: RawTranscript,
    pub labeled: LabeledArtifact,
}

/// Read a cached artifact, treating undecodable entries as missing.
fn read_cached(
    store: &dyn ArtifactStore,
    kind: ArtifactKind,
    source_id: &str,
) -> Result<Option<String>> {
    match store.read(kind, source_id) {
        Ok(text) => Ok(text),
        Err(e @ PipelineError::CacheCorruption { .. }) => {
            tracing::warn!("{}; treating as missing", e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Classify the cached labeled artifact for `raw` without side effects.
pub fn lookup_labeled(
    store: &dyn ArtifactStore,
    raw: &RawTranscript,
    settings: &PipelineSettings,
) -> Result<LabeledLookup> {
    let Some(text) = read_cached(store, ArtifactKind::Labeled, &raw.source_id)? else {
        return Ok(LabeledLookup::Missing);
    };

    match quality::assess(&text, &raw.text, settings.language, settings.min_ratio()) {
        Acceptance::Accepted { ratio } => Ok(LabeledLookup::Ready { text, ratio }),
        rejected => Ok(LabeledLookup::Stale {
            reason: rejected.to_string(),
        }),
    }
}

/// Per-run state machine deciding, for each artifact, whether to reuse the
/// cached copy, regenerate it, fall back, or fail.
///
/// The controller is the only component that turns a labeling
/// [`PipelineError::Backend`] into a degraded success.
pub struct Controller<'a> {
    store: &'a mut dyn ArtifactStore,
    source: &'a dyn RawTranscriptSource,
    backend: &'a dyn LabelingBackend,
    settings: PipelineSettings,
    history: Vec<(ArtifactKind, ArtifactState)>,
}

impl<'a> Controller<'a> {
    pub fn new(
        store: &'a mut dyn ArtifactStore,
        source: &'a dyn RawTranscriptSource,
        backend: &'a dyn LabelingBackend,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            store,
            source,
            backend,
            settings,
            history: Vec::new(),
        }
    }

    /// Every state transition taken so far, in order.
    pub fn history(&self) -> &[(ArtifactKind, ArtifactState)] {
        &self.history
    }

    fn transition(&mut self, kind: ArtifactKind, state: ArtifactState) {
        tracing::debug!("{} artifact -> {}", kind, state);
        self.history.push((kind, state));
    }

    /// Run both stages for `source_id` and return text ready for rendering.
    pub fn run(&mut self, source_id: &str) -> Result<PipelineOutput> {
        let raw = self.ensure_raw(source_id)?;
        let labeled = self.ensure_labeled(&raw)?;
        if !self.settings.allow_raw_fallback {
            self.final_gate(&raw, &labeled)?;
        }
        Ok(PipelineOutput { raw, labeled })
    }

    /// Reuse a non-blank cached raw transcript, otherwise fetch and persist it.
    pub fn ensure_raw(&mut self, source_id: &str) -> Result<RawTranscript> {
        match read_cached(&*self.store, ArtifactKind::Raw, source_id)? {
            Some(text) if !text.trim().is_empty() => {
                tracing::info!(
                    "Raw transcript cached at {} ({} characters), reusing",
                    self.store.describe(ArtifactKind::Raw, source_id),
                    text.chars().count()
                );
                self.transition(ArtifactKind::Raw, ArtifactState::Ready);
                return Ok(RawTranscript {
                    source_id: source_id.to_string(),
                    text,
                });
            }
            Some(_) => {
                tracing::info!("Cached raw transcript for {} is blank, re-fetching", source_id);
                self.transition(ArtifactKind::Raw, ArtifactState::Stale);
            }
            None => self.transition(ArtifactKind::Raw, ArtifactState::Missing),
        }

        self.transition(ArtifactKind::Raw, ArtifactState::Producing);
        tracing::info!("Fetching raw transcript for {} via {}", source_id, self.source.name());

        let text = match self.source.fetch_raw(source_id) {
            Ok(text) => text,
            Err(e) => {
                self.transition(ArtifactKind::Raw, ArtifactState::Failed);
                return Err(PipelineError::Source {
                    source_id: source_id.to_string(),
                    message: format!("{:#}", e),
                });
            }
        };

        if text.trim().is_empty() {
            self.transition(ArtifactKind::Raw, ArtifactState::Failed);
            return Err(PipelineError::EmptyInput);
        }

        self.store.write(ArtifactKind::Raw, source_id, &text)?;
        tracing::info!(
            "Raw transcript saved to {} ({} characters)",
            self.store.describe(ArtifactKind::Raw, source_id),
            text.chars().count()
        );
        self.transition(ArtifactKind::Raw, ArtifactState::Ready);

        Ok(RawTranscript {
            source_id: source_id.to_string(),
            text,
        })
    }

    /// Obtain labeled text for a ready raw transcript.
    pub fn ensure_labeled(&mut self, raw: &RawTranscript) -> Result<LabeledArtifact> {
        let lookup = lookup_labeled(&*self.store, raw, &self.settings)?;
        self.transition(ArtifactKind::Labeled, lookup.state());

        match lookup {
            LabeledLookup::Ready { text, ratio } => {
                tracing::info!(
                    "Labeled transcript cached at {} (ratio {:.2}%), reusing",
                    self.store.describe(ArtifactKind::Labeled, &raw.source_id),
                    ratio * 100.0
                );
                return Ok(LabeledArtifact {
                    text,
                    source_ratio: ratio,
                    outcome: LabeledOutcome::Reused,
                });
            }
            LabeledLookup::Stale { reason } => {
                tracing::info!(
                    "Cached labeled transcript for {} looks incomplete ({}), regenerating",
                    raw.source_id,
                    reason
                );
            }
            LabeledLookup::Missing => {
                tracing::info!("No cached labeled transcript for {}", raw.source_id);
            }
        }

        self.transition(ArtifactKind::Labeled, ArtifactState::Producing);
        match orchestrator::produce_labeled(&raw.text, self.backend, &self.settings.labeling) {
            Ok(labeled) => {
                self.persist_if_accepted(raw, &labeled.text)?;
                self.transition(ArtifactKind::Labeled, ArtifactState::Ready);
                Ok(LabeledArtifact {
                    text: labeled.text,
                    source_ratio: labeled.source_ratio,
                    outcome: LabeledOutcome::Regenerated,
                })
            }
            Err(PipelineError::Backend { context }) if self.settings.allow_raw_fallback => {
                tracing::warn!(
                    "Labeling failed ({}); falling back to the raw transcript without speaker labels",
                    context
                );
                self.transition(ArtifactKind::Labeled, ArtifactState::Ready);
                Ok(LabeledArtifact {
                    text: raw.text.clone(),
                    source_ratio: 1.0,
                    outcome: LabeledOutcome::Degraded { reason: context },
                })
            }
            Err(e) => {
                self.transition(ArtifactKind::Labeled, ArtifactState::Failed);
                if matches!(e, PipelineError::Backend { .. }) {
                    tracing::error!(
                        "Labeling failed and raw fallback is disabled; no document will be produced"
                    );
                }
                Err(e)
            }
        }
    }

    /// Persist freshly labeled text only when it would pass the reuse check,
    /// so the cache never holds an artifact the next run would discard.
    fn persist_if_accepted(&mut self, raw: &RawTranscript, text: &str) -> Result<()> {
        let acceptance = quality::assess(
            text,
            &raw.text,
            self.settings.language,
            self.settings.min_ratio(),
        );
        if acceptance.is_accepted() {
            self.store.write(ArtifactKind::Labeled, &raw.source_id, text)?;
            tracing::info!(
                "Labeled transcript saved to {}",
                self.store.describe(ArtifactKind::Labeled, &raw.source_id)
            );
        } else {
            tracing::warn!(
                "Labeled transcript for {} not cached: {}",
                raw.source_id,
                acceptance
            );
        }
        Ok(())
    }

    /// Last check before downstream use when raw fallback is disabled: the
    /// text must carry speaker labels and meet the minimum ratio, regardless
    /// of how it was obtained.
    pub fn final_gate(&self, raw: &RawTranscript, labeled: &LabeledArtifact) -> Result<()> {
        match quality::assess(
            &labeled.text,
            &raw.text,
            self.settings.language,
            self.settings.min_ratio(),
        ) {
            Acceptance::Accepted { .. } => Ok(()),
            rejected => Err(PipelineError::QualityGate {
                reason: format!(
                    "{} artifact for {} ({}): {}",
                    ArtifactKind::Labeled,
                    raw.source_id,
                    labeled.outcome,
                    rejected
                ),
            }),
        }
    }
}
