use crate::composer::{combine_notes, AuditRequestComposer};
use crate::config::{AuditConfig, DocumentPolicy};
use crate::error::{AuditError, Result};
use crate::identifiers::{check_chronology, IdentifierExtractor};
use crate::metrics::compute_metrics;
use crate::preprocessors::DocumentExtractor;
use crate::render::{RenderedReport, ReportRenderer};
use crate::service::TextGenerationService;
use crate::types::*;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Captured intermediate outputs from each pipeline stage, up to and
/// including the composed request. Used for `--metrics-only`, stage dumps
/// and tests.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AuditStages {
    pub run_id: RunId,
    /// Notes in upload order, header-prefixed for multi-document runs
    pub notes: Vec<NoteAnalysis>,
    pub rejected: Vec<RejectedDocument>,
    pub chronology: ChronologyCheck,
    pub metrics: ClinicalMetrics,
    pub request: AuditRequest,
}

/// A finished run: the stages, the service's report and the rendered artifact
#[derive(Debug, Clone)]
pub struct AuditOutcome {
    pub stages: AuditStages,
    pub report: AuditReport,
    pub rendered: RenderedReport,
}

/// Simple profiler that collects timings for pipeline steps
pub struct StepProfiler {
    enabled: bool,
    timings: Vec<(String, Duration)>,
}

impl StepProfiler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            timings: Vec::new(),
        }
    }

    pub fn time_step<F, R>(&mut self, step_name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if !self.enabled {
            return f();
        }

        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        self.timings.push((step_name.to_string(), elapsed));
        tracing::info!(step = step_name, elapsed_ms = elapsed.as_millis() as u64, "step finished");

        result
    }

    pub fn timings(&self) -> &[(String, Duration)] {
        &self.timings
    }

    pub fn print_summary(&self) {
        if !self.enabled || self.timings.is_empty() {
            return;
        }

        let total: Duration = self.timings.iter().map(|(_, d)| *d).sum();
        for (step, duration) in &self.timings {
            let percentage = if total.is_zero() {
                0.0
            } else {
                (duration.as_secs_f64() / total.as_secs_f64()) * 100.0
            };
            tracing::info!(
                "   {:.<35} {:.0}ms ({:.1}%)",
                step,
                duration.as_millis(),
                percentage
            );
        }
        tracing::info!("   {:.<35} {:.0}ms", "Total", total.as_millis());
    }
}

/// Holds the in-progress flag up for the duration of the service call
struct InProgressGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InProgressGuard<'a> {
    fn engage(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self { flag }
    }
}

impl Drop for InProgressGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

pub struct AuditProcessor {
    config: AuditConfig,
    extractor: DocumentExtractor,
    identifier_extractor: IdentifierExtractor,
    renderer: ReportRenderer,
    service: Box<dyn TextGenerationService>,
    in_progress: Arc<AtomicBool>,
}

impl AuditProcessor {
    /// Create AuditProcessor with the built-in extractor
    pub fn new(config: AuditConfig, service: Box<dyn TextGenerationService>) -> anyhow::Result<Self> {
        Self::new_with_dependencies(config, DocumentExtractor::new(), service)
    }

    /// Create AuditProcessor with full dependency injection
    pub fn new_with_dependencies(
        config: AuditConfig,
        extractor: DocumentExtractor,
        service: Box<dyn TextGenerationService>,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self {
            identifier_extractor: IdentifierExtractor::new(&config.identifiers)?,
            renderer: ReportRenderer::new(config.render.clone()),
            extractor,
            service,
            in_progress: Arc::new(AtomicBool::new(false)),
            config,
        })
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    pub fn service_name(&self) -> &str {
        self.service.name()
    }

    /// Shared flag that is true only while the service call is running
    pub fn progress_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.in_progress)
    }

    pub fn is_in_progress(&self) -> bool {
        self.in_progress.load(Ordering::SeqCst)
    }

    /// Run every stage up to the composed request, without calling the service.
    /// `image` is the attached wound image's name, used only as an annotation flag.
    pub fn prepare(&self, documents: &[Document], image: Option<&str>) -> Result<AuditStages> {
        self.prepare_with_profiler(documents, image, &mut StepProfiler::new(false))
    }

    /// Full run: stages, one service call, report assembly and rendering
    pub fn run(&self, documents: &[Document], image: Option<&str>) -> Result<AuditOutcome> {
        self.run_with_profiling(documents, image, false)
    }

    pub fn run_with_profiling(
        &self,
        documents: &[Document],
        image: Option<&str>,
        enable_profiling: bool,
    ) -> Result<AuditOutcome> {
        let start_time = Instant::now();
        let mut profiler = StepProfiler::new(enable_profiling);

        let stages = self.prepare_with_profiler(documents, image, &mut profiler)?;

        let narrative = profiler.time_step("5. Service Call", || self.generate(&stages.request))?;

        let report = AuditReport {
            run_id: stages.run_id,
            title: self.config.framework.title.clone(),
            generated_at: Utc::now(),
            summary: stages.metrics.summary_lines(),
            narrative,
        };

        let rendered = profiler.time_step("6. Rendering", || self.renderer.render(&report))?;

        profiler.print_summary();
        tracing::info!(
            run_id = %stages.run_id,
            pages = rendered.page_count,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "audit run complete"
        );

        Ok(AuditOutcome {
            stages,
            report,
            rendered,
        })
    }

    /// Render an already-produced report with this processor's layout settings
    pub fn render(&self, report: &AuditReport) -> Result<RenderedReport> {
        self.renderer.render(report)
    }

    fn prepare_with_profiler(
        &self,
        documents: &[Document],
        image: Option<&str>,
        profiler: &mut StepProfiler,
    ) -> Result<AuditStages> {
        let run_id = Uuid::new_v4();

        // Stage 0: Input limits, checked before any extraction
        if documents.is_empty() {
            return Err(AuditError::NoDocuments);
        }
        if documents.len() > self.config.max_documents {
            return Err(AuditError::TooManyDocuments {
                count: documents.len(),
                max: self.config.max_documents,
            });
        }
        tracing::info!(run_id = %run_id, documents = documents.len(), "starting audit run");

        // Stage 1: Documents → NormalizedNotes
        let (notes, rejected) =
            profiler.time_step("1. Extraction", || self.extract_all(documents))?;
        let multi_document = documents.len() > 1;
        let notes: Vec<NormalizedNote> = notes
            .into_iter()
            .map(|note| if multi_document { note.with_header() } else { note })
            .collect();

        // Stage 2: Identifiers per note, then the chronology check
        let analyses = profiler.time_step("2. Identifiers", || {
            notes
                .iter()
                .map(|note| NoteAnalysis {
                    identifiers: self.identifier_extractor.extract(&note.text),
                    note: note.clone(),
                })
                .collect::<Vec<_>>()
        });
        let chronology = check_chronology(&analyses);
        if let ChronologyCheck::OutOfOrder { first_regression_at } = chronology {
            tracing::warn!(
                position = first_regression_at,
                "visit dates are out of upload order; notes are kept in upload order"
            );
        }

        // Stage 3: Metrics over the whole run's text
        let combined = combine_notes(&notes);
        let metrics = profiler.time_step("3. Metrics", || compute_metrics(&combined));
        tracing::info!(
            trajectory = %metrics.trajectory,
            risk = %metrics.risk_score,
            "computed clinical metrics"
        );

        // Stage 4: Request composition
        let image_context = image.map(|name| {
            tracing::debug!(image = name, "image attached");
            self.config.image_context.as_str()
        });
        let request = profiler.time_step("4. Composition", || {
            AuditRequestComposer::new(&self.config.framework)
                .include_metrics(self.config.include_metrics_in_request)
                .compose(run_id, &notes, image_context, Some(&metrics))
        });

        Ok(AuditStages {
            run_id,
            notes: analyses,
            rejected,
            chronology,
            metrics,
            request,
        })
    }

    /// Extract every document in upload order, applying the document policy
    fn extract_all(
        &self,
        documents: &[Document],
    ) -> Result<(Vec<NormalizedNote>, Vec<RejectedDocument>)> {
        let mut notes = Vec::with_capacity(documents.len());
        let mut rejected = Vec::new();
        let mut first_error = None;

        for (index, document) in documents.iter().enumerate() {
            let position = index + 1;
            match self.extractor.extract(position, document) {
                Ok(note) => notes.push(note),
                Err(e)
                    if e.is_document_error()
                        && self.config.document_policy == DocumentPolicy::SkipFailed =>
                {
                    tracing::warn!(document = document.name(), error = %e, "skipping document");
                    rejected.push(RejectedDocument {
                        position,
                        name: document.name().to_string(),
                        reason: e.to_string(),
                    });
                    first_error.get_or_insert(e);
                }
                Err(e) => return Err(e),
            }
        }

        if notes.is_empty() {
            return Err(first_error.unwrap_or(AuditError::NoDocuments));
        }
        Ok((notes, rejected))
    }

    /// The one blocking service call of a run. No retry.
    fn generate(&self, request: &AuditRequest) -> Result<String> {
        let _guard = InProgressGuard::engage(&self.in_progress);
        tracing::info!(service = self.service.name(), "requesting audit narrative");
        self.service.generate(request)
    }
}
