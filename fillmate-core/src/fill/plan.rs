use crate::types::{CandidateField, ElementHandle, FillEntry, FillSource, Profile, TemplateMatch};
use serde::Serialize;
use std::collections::HashSet;

/// Ordered (field, value) assignments for one pass. A field appears at most
/// once; the first entry for a handle wins.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FillPlan {
    entries: Vec<FillEntry>,
    #[serde(skip)]
    planned: HashSet<ElementHandle>,
}

impl FillPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Profile fields first (in the locator's confidence order), then
    /// template answers for fields the profile left untouched.
    pub fn build(
        profile: &Profile,
        candidates: &[CandidateField],
        template_matches: &[TemplateMatch],
    ) -> Self {
        let mut plan = Self::new();

        for field in candidates {
            match profile.value_for(field.field_type) {
                Some(value) => {
                    tracing::debug!("📝 Planning {} {} <- {:?}", field.field_type, field.handle, value);
                    plan.push(FillEntry {
                        handle: field.handle,
                        value,
                        source: FillSource::Profile {
                            field_type: field.field_type,
                        },
                    });
                }
                None => {
                    tracing::debug!("   ⏭️  No profile value for {} {}", field.field_type, field.handle);
                }
            }
        }

        for matched in template_matches {
            if matched.answer.trim().is_empty() {
                continue;
            }
            let added = plan.push(FillEntry {
                handle: matched.handle,
                value: matched.answer.clone(),
                source: FillSource::Template {
                    template_id: matched.template_id.clone(),
                },
            });
            if !added {
                tracing::debug!(
                    "   ⏭️  {} already planned from the profile, skipping template {}",
                    matched.handle,
                    matched.template_id
                );
            }
        }

        plan
    }

    /// Returns false (and drops the entry) when the field is already planned.
    pub fn push(&mut self, entry: FillEntry) -> bool {
        if !self.planned.insert(entry.handle) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn entries(&self) -> &[FillEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
