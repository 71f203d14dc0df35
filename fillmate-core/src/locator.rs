use crate::catalog::PatternCatalog;
use crate::classifier::FieldClassifier;
use crate::snapshot::PageDocument;
use crate::types::CandidateField;

/// Finds the fillable, classifiable fields on a page.
///
/// A candidate is a text-like `<input>` (text, email, tel, url or no type)
/// or a `<textarea>` that is rendered, enabled and writable. Fields the
/// classifier cannot place are dropped. Output is sorted by confidence,
/// highest first; equal scores keep document order.
#[derive(Debug, Clone, Copy)]
pub struct FieldLocator<'a> {
    classifier: FieldClassifier<'a>,
}

impl<'a> FieldLocator<'a> {
    pub fn new(catalog: &'a PatternCatalog) -> Self {
        Self {
            classifier: FieldClassifier::new(catalog),
        }
    }

    pub fn locate(&self, document: &PageDocument) -> Vec<CandidateField> {
        let fields = document.form_fields();
        let mut skipped = 0usize;
        let mut candidates = Vec::new();

        for (handle, _kind) in &fields {
            let handle = *handle;
            if !document.is_visible(handle) || !document.is_editable(handle) {
                skipped += 1;
                continue;
            }

            let attributes = document.attribute_bag(handle);
            let label_text = document.label_text(handle);
            let classification = self.classifier.classify(&attributes, label_text.as_deref());
            if classification.is_unknown() {
                tracing::debug!("   ❓ {handle} not recognised ({:?})", label_text);
                continue;
            }

            candidates.push(CandidateField {
                handle,
                attributes,
                label_text,
                field_type: classification.field_type,
                confidence: classification.confidence,
            });
        }

        // sort_by is stable, ties stay in document order
        candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        tracing::info!(
            "📋 Located {} candidate fields ({} form fields, {} hidden or read-only)",
            candidates.len(),
            fields.len(),
            skipped
        );

        candidates
    }
}
