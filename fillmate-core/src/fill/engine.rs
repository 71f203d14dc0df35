use crate::config::FillSettings;
use crate::error::{FillError, PassWarning};
use crate::fill::plan::FillPlan;
use crate::fill::target::FillTarget;
use crate::snapshot::FieldEvent;
use crate::types::{CandidateField, ElementHandle, FillFailure, FillReport, Profile, TemplateMatch};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const CHANGE_EVENTS: [FieldEvent; 3] = [FieldEvent::Input, FieldEvent::Change, FieldEvent::Blur];

/// Applies a FillPlan one field at a time, pausing between successful fills.
///
/// The only suspension point is the inter-field delay. If the page goes
/// away while suspended (the token is cancelled) the remaining entries are
/// abandoned and the report comes back marked `cancelled` with whatever was
/// filled so far.
#[derive(Debug, Clone)]
pub struct FillEngine {
    fill_delay: Duration,
    highlight: Duration,
}

impl FillEngine {
    pub fn new(settings: &FillSettings) -> Self {
        Self {
            fill_delay: settings.fill_delay(),
            highlight: settings.highlight_duration(),
        }
    }

    pub fn with_timing(fill_delay: Duration, highlight: Duration) -> Self {
        Self {
            fill_delay,
            highlight,
        }
    }

    /// Resolve profile values and template answers into a plan, then apply it.
    pub async fn fill<T: FillTarget + ?Sized>(
        &self,
        target: &mut T,
        profile: Option<&Profile>,
        candidates: &[CandidateField],
        template_matches: &[TemplateMatch],
        cancel: &CancellationToken,
    ) -> FillReport {
        let Some(profile) = profile.filter(|p| p.is_usable()) else {
            tracing::warn!("⚠️  No usable profile, nothing will be filled");
            return FillReport::with_warning(PassWarning::NoProfileAvailable);
        };

        let plan = FillPlan::build(profile, candidates, template_matches);
        self.apply(target, &plan, cancel).await
    }

    pub async fn apply<T: FillTarget + ?Sized>(
        &self,
        target: &mut T,
        plan: &FillPlan,
        cancel: &CancellationToken,
    ) -> FillReport {
        let mut report = FillReport::empty();
        report.planned_count = plan.len();

        tracing::info!(
            pass_id = %report.pass_id,
            "✍️  Applying fill plan: {} fields, {}ms between fills",
            plan.len(),
            self.fill_delay.as_millis()
        );

        let entries = plan.entries();
        for (index, entry) in entries.iter().enumerate() {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            match self.write_field(target, entry.handle, &entry.value) {
                Ok(()) => {
                    report.filled_count += 1;
                    report.filled.push(entry.handle);
                }
                Err(e) => {
                    tracing::warn!("❌ Could not fill {}: {e}", entry.handle);
                    report.failures.push(FillFailure {
                        handle: entry.handle,
                        reason: e.to_string(),
                    });
                    continue;
                }
            }

            let more_to_go = index + 1 < entries.len();
            if more_to_go && !self.fill_delay.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        report.cancelled = true;
                        break;
                    }
                    _ = tokio::time::sleep(self.fill_delay) => {}
                }
            }
        }

        if report.cancelled {
            tracing::warn!(
                "⏹️  Pass cancelled after {} of {} fields",
                report.filled_count,
                report.planned_count
            );
            report.warnings.push(PassWarning::Cancelled.to_string());
        } else {
            tracing::info!(
                "✅ Filled {} of {} planned fields ({} failed)",
                report.filled_count,
                report.planned_count,
                report.failures.len()
            );
        }

        report
    }

    /// Focus, write, notify, highlight. `set_value` replaces the whole content
    /// in one step, so a failure later on never leaves the field blank. The
    /// value counts as written once the change events went out; a failed
    /// highlight is only logged.
    pub fn write_field<T: FillTarget + ?Sized>(
        &self,
        target: &mut T,
        handle: ElementHandle,
        value: &str,
    ) -> Result<(), FillError> {
        target.focus(handle)?;
        target.set_value(handle, value)?;
        for event in CHANGE_EVENTS {
            target.dispatch(handle, event)?;
        }
        if let Err(e) = target.highlight(handle, self.highlight) {
            tracing::debug!("Highlight skipped for {handle}: {e}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttributeBag, FillEntry, FillSource, SemanticFieldType};
    use std::collections::HashMap;

    /// Records writes; handles listed in `broken` fail like detached nodes,
    /// handles in `silent` accept values but reject event dispatch.
    #[derive(Default)]
    struct RecordingTarget {
        values: HashMap<ElementHandle, String>,
        writes: Vec<(ElementHandle, String)>,
        events: Vec<(ElementHandle, FieldEvent)>,
        broken: Vec<ElementHandle>,
        silent: Vec<ElementHandle>,
    }

    impl RecordingTarget {
        fn check(&self, handle: ElementHandle) -> Result<(), FillError> {
            if self.broken.contains(&handle) {
                Err(FillError::Detached(handle))
            } else {
                Ok(())
            }
        }
    }

    impl FillTarget for RecordingTarget {
        fn focus(&mut self, handle: ElementHandle) -> Result<(), FillError> {
            self.check(handle)?;
            self.events.push((handle, FieldEvent::Focus));
            Ok(())
        }

        fn set_value(&mut self, handle: ElementHandle, value: &str) -> Result<(), FillError> {
            self.check(handle)?;
            self.writes.push((handle, value.to_string()));
            self.values.insert(handle, value.to_string());
            Ok(())
        }

        fn dispatch(&mut self, handle: ElementHandle, event: FieldEvent) -> Result<(), FillError> {
            self.check(handle)?;
            if self.silent.contains(&handle) {
                return Err(FillError::NotEditable(handle));
            }
            self.events.push((handle, event));
            Ok(())
        }

        fn highlight(&mut self, handle: ElementHandle, _duration: Duration) -> Result<(), FillError> {
            self.check(handle)
        }
    }

    fn plan_of(values: &[(usize, &str)]) -> FillPlan {
        let mut plan = FillPlan::new();
        for (handle, value) in values {
            plan.push(FillEntry {
                handle: ElementHandle(*handle),
                value: value.to_string(),
                source: FillSource::Profile {
                    field_type: SemanticFieldType::Email,
                },
            });
        }
        plan
    }

    fn engine() -> FillEngine {
        FillEngine::with_timing(Duration::from_millis(100), Duration::from_millis(1000))
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_follow_write() {
        let mut target = RecordingTarget::default();
        let report = engine()
            .apply(&mut target, &plan_of(&[(1, "a@b.c")]), &CancellationToken::new())
            .await;
        assert_eq!(report.filled_count, 1);
        let events: Vec<FieldEvent> = target.events.iter().map(|(_, e)| *e).collect();
        assert_eq!(
            events,
            vec![FieldEvent::Focus, FieldEvent::Input, FieldEvent::Change, FieldEvent::Blur]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_does_not_abort_plan() {
        let mut target = RecordingTarget {
            broken: vec![ElementHandle(2)],
            ..Default::default()
        };
        let report = engine()
            .apply(
                &mut target,
                &plan_of(&[(1, "one"), (2, "two"), (3, "three")]),
                &CancellationToken::new(),
            )
            .await;
        assert_eq!(report.filled_count, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].handle, ElementHandle(2));
        assert_eq!(target.values.get(&ElementHandle(3)).map(String::as_str), Some("three"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_between_fills() {
        let mut target = RecordingTarget::default();
        let start = tokio::time::Instant::now();
        engine()
            .apply(
                &mut target,
                &plan_of(&[(1, "a"), (2, "b"), (3, "c")]),
                &CancellationToken::new(),
            )
            .await;
        // Two pauses: between the first/second and second/third fills
        assert_eq!(start.elapsed(), Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_start() {
        let mut target = RecordingTarget::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = engine()
            .apply(&mut target, &plan_of(&[(1, "a")]), &cancel)
            .await;
        assert!(report.cancelled);
        assert_eq!(report.filled_count, 0);
        assert!(target.values.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_notify_keeps_written_value() {
        let mut target = RecordingTarget {
            silent: vec![ElementHandle(1)],
            ..Default::default()
        };
        target.values.insert(ElementHandle(1), "old@b.c".to_string());

        let report = engine()
            .apply(&mut target, &plan_of(&[(1, "new@b.c")]), &CancellationToken::new())
            .await;
        assert_eq!(report.filled_count, 0);
        assert_eq!(report.failures.len(), 1);
        // One write, never an intermediate blank
        assert_eq!(target.writes, vec![(ElementHandle(1), "new@b.c".to_string())]);
        assert_eq!(target.values.get(&ElementHandle(1)).map(String::as_str), Some("new@b.c"));
    }

    fn candidate(handle: usize, field_type: SemanticFieldType) -> CandidateField {
        CandidateField {
            handle: ElementHandle(handle),
            attributes: AttributeBag::default(),
            label_text: None,
            field_type,
            confidence: 0.9,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fill_resolves_profile_values() {
        let profile = Profile {
            first_name: Some("Ada".to_string()),
            last_name: Some("Lovelace".to_string()),
            email: Some("ada@x.com".to_string()),
            ..Default::default()
        };
        let candidates = vec![
            candidate(1, SemanticFieldType::Email),
            candidate(2, SemanticFieldType::FullName),
            candidate(3, SemanticFieldType::Phone),
        ];
        let mut target = RecordingTarget::default();

        let report = engine()
            .fill(&mut target, Some(&profile), &candidates, &[], &CancellationToken::new())
            .await;
        assert_eq!(report.filled_count, 2);
        assert_eq!(report.planned_count, 2);
        assert_eq!(target.values.get(&ElementHandle(1)).map(String::as_str), Some("ada@x.com"));
        assert_eq!(target.values.get(&ElementHandle(2)).map(String::as_str), Some("Ada Lovelace"));
        // No phone in the profile, so the field is never touched
        assert!(!target.values.contains_key(&ElementHandle(3)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_profile_means_no_writes() {
        let mut target = RecordingTarget::default();
        let report = engine()
            .fill(&mut target, None, &[], &[], &CancellationToken::new())
            .await;
        assert_eq!(report.filled_count, 0);
        assert_eq!(report.warnings, vec!["No active profile found".to_string()]);
    }
}
