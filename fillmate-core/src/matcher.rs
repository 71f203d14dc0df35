//! Template Matching
//!
//! Pairs empty free-text fields with stored question/answer templates.
//!
//! For each candidate field a context string is assembled from the label,
//! the placeholder and the text of the closest short ancestor (the nearest
//! container whose text is under `context_max_chars`). A template matches
//! when its normalized question is a substring of the normalized context.
//! Containment is the only rule; keyword extraction is used for diagnostics.
//!
//! Normalization is deliberately looser than ASCII `[^\w\s]` stripping:
//! letters and digits of any script survive and whitespace runs collapse to
//! one space, so "Warum  möchten Sie" still contains "warum möchten sie".

use crate::snapshot::PageDocument;
use crate::types::{ElementHandle, Template, TemplateMatch};
use std::collections::HashSet;

const STOP_WORDS: [&str; 21] = [
    "what", "how", "why", "when", "where", "the", "a", "an", "and", "or", "but", "for", "you",
    "your", "this", "that", "is", "are", "do", "does", "did",
];

/// Lowercase, keep letters, digits, `_` and whitespace, collapse whitespace.
pub fn normalize(text: &str) -> String {
    let kept: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Substring containment of the normalized question in the normalized context.
/// An empty question never matches.
pub fn matches_template(context: &str, question: &str) -> bool {
    let question = normalize(question);
    if question.is_empty() {
        return false;
    }
    normalize(context).contains(&question)
}

/// Meaningful words of a question or context: longer than two characters,
/// not a stop word, punctuation stripped.
pub fn extract_keywords(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .filter(|word| word.chars().count() > 2 && !STOP_WORDS.contains(word))
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric() || *c == '_')
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect()
}

#[derive(Debug, Clone)]
pub struct TemplateMatcher {
    context_max_chars: usize,
}

impl Default for TemplateMatcher {
    fn default() -> Self {
        Self::new(200)
    }
}

impl TemplateMatcher {
    pub fn new(context_max_chars: usize) -> Self {
        Self { context_max_chars }
    }

    /// Context for a field: label text, placeholder, then the first ancestor
    /// below `<body>` whose text length is in `1..context_max_chars`.
    pub fn field_context(&self, document: &PageDocument, handle: ElementHandle) -> String {
        let mut parts: Vec<String> = Vec::new();

        if let Some(label) = document.find_label(handle) {
            parts.push(document.text_content(label));
        }
        parts.push(document.attr(handle, "placeholder").unwrap_or_default().to_string());

        for ancestor in document.ancestors_within_body(handle) {
            let text = document.text_content(ancestor);
            let length = text.chars().count();
            if length > 0 && length < self.context_max_chars {
                parts.push(text);
                break;
            }
        }

        parts.join(" ").trim().to_lowercase()
    }

    pub fn match_templates(&self, document: &PageDocument, templates: &[Template]) -> Vec<TemplateMatch> {
        self.match_templates_excluding(document, templates, &HashSet::new())
    }

    /// Same as `match_templates`, but fields in `excluded` (already claimed
    /// by the profile) are neither matched nor allowed to use up a template.
    pub fn match_templates_excluding(
        &self,
        document: &PageDocument,
        templates: &[Template],
        excluded: &HashSet<ElementHandle>,
    ) -> Vec<TemplateMatch> {
        let usable: Vec<&Template> = templates.iter().filter(|t| is_usable(t)).collect();
        if usable.is_empty() {
            return Vec::new();
        }

        let mut used: HashSet<&str> = HashSet::new();
        let mut matches = Vec::new();

        for (handle, kind) in document.form_fields() {
            if excluded.contains(&handle)
                || !kind.accepts_free_text()
                || !document.is_visible(handle)
                || !document.is_editable(handle)
            {
                continue;
            }
            if !document.value(handle).trim().is_empty() {
                continue;
            }

            let context = self.field_context(document, handle);
            let found = usable
                .iter()
                .filter(|t| !used.contains(t.id.as_str()))
                .find(|t| matches_template(&context, &t.question));

            match found {
                Some(template) => {
                    let Some(answer) = template.default_answer() else {
                        continue;
                    };
                    tracing::info!("💬 Matched template {:?} for {handle}", template.question);
                    used.insert(template.id.as_str());
                    matches.push(TemplateMatch {
                        handle,
                        template_id: template.id.clone(),
                        question: template.question.clone(),
                        answer: answer.to_string(),
                    });
                }
                None => log_nearest(handle, &context, &usable),
            }
        }

        matches
    }
}

fn is_usable(template: &Template) -> bool {
    if normalize(&template.question).is_empty() {
        tracing::warn!("⚠️  Skipping template {}: question is empty", template.id);
        return false;
    }
    if template.answers.is_empty() {
        tracing::warn!("⚠️  Skipping template {}: no answers", template.id);
        return false;
    }
    true
}

fn log_nearest(handle: ElementHandle, context: &str, templates: &[&Template]) {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }
    let context_words: HashSet<String> = extract_keywords(context).into_iter().collect();
    if context_words.is_empty() {
        return;
    }
    let nearest = templates
        .iter()
        .map(|t| {
            let shared = extract_keywords(&t.question)
                .iter()
                .filter(|w| context_words.contains(*w))
                .count();
            (shared, t)
        })
        .filter(|(shared, _)| *shared > 0)
        .max_by_key(|(shared, _)| *shared);

    if let Some((shared, template)) = nearest {
        tracing::debug!(
            "   No template for {handle}; nearest is {:?} ({shared} shared keywords)",
            template.question
        );
    }
}
