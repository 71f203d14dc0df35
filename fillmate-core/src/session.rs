use crate::catalog::PatternCatalog;
use crate::config::FillSettings;
use crate::error::{CatalogError, PassError, PassWarning};
use crate::fill::{FillEngine, FillPlan};
use crate::locator::FieldLocator;
use crate::matcher::TemplateMatcher;
use crate::snapshot::PageDocument;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Captured outputs of each pass stage, for dry runs and diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct PassStages {
    pub candidates: Vec<CandidateField>,
    pub template_matches: Vec<TemplateMatch>,
    pub plan: FillPlan,
}

/// Simple profiler that collects timings for pass steps
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
        self.record(step_name, start.elapsed());
        result
    }

    /// Record a step timed by the caller (async steps).
    pub fn record(&mut self, step_name: &str, elapsed: Duration) {
        if !self.enabled {
            return;
        }
        self.timings.push((step_name.to_string(), elapsed));
        tracing::debug!("⏱️  {}: {:.0}ms", step_name, elapsed.as_millis());
    }

    pub fn log_summary(&self) {
        if !self.enabled || self.timings.is_empty() {
            return;
        }

        let total: Duration = self.timings.iter().map(|(_, d)| *d).sum();
        for (step, duration) in &self.timings {
            tracing::debug!(step = %step, elapsed_ms = duration.as_millis() as u64, "📊 step timing");
        }
        tracing::debug!(total_ms = total.as_millis() as u64, "📊 pass total");
    }
}

/// Messages a page context accepts from the popup or a keyboard shortcut.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ContentRequest {
    FillForm,
    FillTemplate { template: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentResponse {
    pub success: bool,
    pub filled_count: usize,
    pub message: String,
}

impl ContentResponse {
    pub fn from_report(report: &FillReport) -> Self {
        let message = match report.warnings.first() {
            Some(warning) if report.filled_count == 0 => warning.clone(),
            _ => format!("Filled {} fields", report.filled_count),
        };
        Self {
            success: true,
            filled_count: report.filled_count,
            message,
        }
    }

    pub fn failure(message: impl ToString) -> Self {
        Self {
            success: false,
            filled_count: 0,
            message: message.to_string(),
        }
    }
}

/// Releases the in-progress flag when the pass ends, however it ends.
struct PassGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> PassGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, PassError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| PassError::AlreadyRunning)?;
        Ok(Self { flag })
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// One page context: the catalog and settings for that page, the
/// in-progress flag that keeps passes from overlapping, and the token that
/// navigation cancels.
///
/// Once `navigate_away` has been called the session stays cancelled; a new
/// page gets a new session.
pub struct FillSession {
    catalog: PatternCatalog,
    settings: FillSettings,
    in_progress: AtomicBool,
    cancel: CancellationToken,
    profiling: bool,
}

impl FillSession {
    pub fn new(settings: FillSettings) -> Result<Self, CatalogError> {
        let catalog = PatternCatalog::from_config(&settings.catalog)?;
        Ok(Self {
            catalog,
            settings,
            in_progress: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            profiling: false,
        })
    }

    pub fn with_profiling(mut self, enabled: bool) -> Self {
        self.profiling = enabled;
        self
    }

    pub fn settings(&self) -> &FillSettings {
        &self.settings
    }

    pub fn catalog(&self) -> &PatternCatalog {
        &self.catalog
    }

    pub fn is_running(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// The page is going away: abandon any pending fill step.
    pub fn navigate_away(&self) {
        tracing::info!("🚪 Page navigation, cancelling pending fills");
        self.cancel.cancel();
    }

    /// Token cancelled by `navigate_away`, for wiring to host signals.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Dry run: locate, match and plan without touching the document.
    pub fn plan(
        &self,
        document: &PageDocument,
        profile: Option<&Profile>,
        templates: &[Template],
    ) -> PassStages {
        self.plan_with_profiler(document, profile, templates, &mut StepProfiler::new(false))
    }

    fn plan_with_profiler(
        &self,
        document: &PageDocument,
        profile: Option<&Profile>,
        templates: &[Template],
        profiler: &mut StepProfiler,
    ) -> PassStages {
        let candidates = profiler.time_step("1. Locate fields", || {
            FieldLocator::new(&self.catalog).locate(document)
        });

        // Fields the profile will fill are not offered to templates
        let claimed: HashSet<ElementHandle> = match profile {
            Some(p) => candidates
                .iter()
                .filter(|c| p.value_for(c.field_type).is_some())
                .map(|c| c.handle)
                .collect(),
            None => HashSet::new(),
        };

        let template_matches = if self.settings.template_matching.enabled {
            profiler.time_step("2. Match templates", || {
                TemplateMatcher::new(self.settings.template_matching.context_max_chars)
                    .match_templates_excluding(document, templates, &claimed)
            })
        } else {
            Vec::new()
        };

        let plan = profiler.time_step("3. Build plan", || match profile {
            Some(p) => FillPlan::build(p, &candidates, &template_matches),
            None => FillPlan::new(),
        });

        PassStages {
            candidates,
            template_matches,
            plan,
        }
    }

    /// Run one fill pass over the document.
    ///
    /// Refuses to start while another pass on this session is running.
    /// "No profile" and "disabled" come back as warnings on an empty report.
    pub async fn run_pass(
        &self,
        document: &mut PageDocument,
        profile: Option<&Profile>,
        templates: &[Template],
    ) -> Result<FillReport, PassError> {
        let _guard = PassGuard::acquire(&self.in_progress)?;

        if !self.settings.enabled {
            tracing::warn!("⚠️  Autofill disabled in settings");
            return Ok(FillReport::with_warning(PassWarning::AutofillDisabled));
        }
        let Some(profile) = profile.filter(|p| p.is_usable()) else {
            tracing::warn!("⚠️  {}", PassWarning::NoProfileAvailable);
            return Ok(FillReport::with_warning(PassWarning::NoProfileAvailable));
        };

        let mut profiler = StepProfiler::new(self.profiling);
        let stages = self.plan_with_profiler(document, Some(profile), templates, &mut profiler);

        let engine = FillEngine::new(&self.settings);
        let start = Instant::now();
        let report = engine.apply(document, &stages.plan, &self.cancel).await;
        profiler.record("4. Apply plan", start.elapsed());
        profiler.log_summary();

        Ok(report)
    }

    /// Write a canned answer into the focused text field.
    pub fn fill_focused(&self, document: &mut PageDocument, text: &str) -> FillReport {
        let Some(handle) = document
            .focused()
            .filter(|h| document.field_kind(*h).is_some())
        else {
            tracing::warn!("⚠️  {}", PassWarning::NoFocusedField);
            return FillReport::with_warning(PassWarning::NoFocusedField);
        };

        let mut report = FillReport::empty();
        report.planned_count = 1;
        match FillEngine::new(&self.settings).write_field(document, handle, text) {
            Ok(()) => {
                report.filled_count = 1;
                report.filled.push(handle);
            }
            Err(e) => {
                tracing::warn!("❌ Could not fill {handle}: {e}");
                report.failures.push(FillFailure {
                    handle,
                    reason: e.to_string(),
                });
            }
        }
        report
    }

    /// Dispatch a content request against this page.
    pub async fn handle(
        &self,
        request: &ContentRequest,
        document: &mut PageDocument,
        profile: Option<&Profile>,
        templates: &[Template],
    ) -> ContentResponse {
        match request {
            ContentRequest::FillForm => match self.run_pass(document, profile, templates).await {
                Ok(report) => ContentResponse::from_report(&report),
                Err(e) => ContentResponse::failure(e),
            },
            ContentRequest::FillTemplate { template } => {
                ContentResponse::from_report(&self.fill_focused(document, template))
            }
        }
    }
}
