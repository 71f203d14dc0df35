use crate::catalog::PatternCatalog;
use crate::types::{AttributeBag, Classification};

/// Assigns a semantic type to a field from its attributes and label.
///
/// Rules are walked in catalog order; for each rule every listed attribute
/// is tried as `"{value} {label}"` (lowercased, not trimmed) against every
/// pattern. With no label the string keeps its trailing space, so anchored
/// patterns such as `name$` only fire on label text. The first hit wins, so a later rule never overrides an earlier
/// one even with a higher confidence.
#[derive(Debug, Clone, Copy)]
pub struct FieldClassifier<'a> {
    catalog: &'a PatternCatalog,
}

impl<'a> FieldClassifier<'a> {
    pub fn new(catalog: &'a PatternCatalog) -> Self {
        Self { catalog }
    }

    pub fn classify(&self, attributes: &AttributeBag, label_text: Option<&str>) -> Classification {
        let label = label_text.unwrap_or("");

        for rule in self.catalog.rules() {
            for attribute in &rule.attributes {
                let combined = combined_text(attributes.get(*attribute), label);
                if combined.trim().is_empty() {
                    continue;
                }

                if let Some(pattern) = rule.patterns.iter().find(|p| p.is_match(&combined)) {
                    tracing::debug!(
                        "🔎 Detected {} via /{}/ on {:?}",
                        rule.field_type,
                        pattern.as_str(),
                        combined
                    );
                    return Classification {
                        field_type: rule.field_type,
                        confidence: rule.confidence,
                    };
                }
            }
        }

        Classification::unknown()
    }
}

fn combined_text(value: &str, label: &str) -> String {
    format!("{value} {label}").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SemanticFieldType;

    fn bag(name: &str) -> AttributeBag {
        AttributeBag {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    fn classify(attributes: &AttributeBag, label: Option<&str>) -> Classification {
        let catalog = PatternCatalog::default();
        FieldClassifier::new(&catalog).classify(attributes, label)
    }

    #[test]
    fn test_email_by_name_attribute() {
        let result = classify(&bag("email"), None);
        assert_eq!(result.field_type, SemanticFieldType::Email);
        assert_eq!(result.confidence, 0.95);
    }

    #[test]
    fn test_email_by_input_type() {
        let attributes = AttributeBag {
            name: Some("contact_1".to_string()),
            input_type: Some("email".to_string()),
            ..Default::default()
        };
        assert_eq!(classify(&attributes, None).field_type, SemanticFieldType::Email);
    }

    #[test]
    fn test_label_only_field() {
        let result = classify(&AttributeBag::default(), Some("First Name"));
        assert_eq!(result.field_type, SemanticFieldType::FirstName);
        assert_eq!(result.confidence, 0.9);
    }

    #[test]
    fn test_last_name_label_beats_full_name_suffix() {
        let result = classify(&AttributeBag::default(), Some("Last Name"));
        assert_eq!(result.field_type, SemanticFieldType::LastName);
    }

    #[test]
    fn test_localized_labels() {
        assert_eq!(
            classify(&AttributeBag::default(), Some("Vorname")).field_type,
            SemanticFieldType::FirstName
        );
        assert_eq!(
            classify(&AttributeBag::default(), Some("Фамилия")).field_type,
            SemanticFieldType::LastName
        );
        assert_eq!(
            classify(&AttributeBag::default(), Some("Correo electrónico")).field_type,
            SemanticFieldType::Email
        );
    }

    #[test]
    fn test_first_match_wins_over_confidence() {
        // "work email" hits Email (0.95) before Experience's "work" (0.7)
        let result = classify(&bag("work_email"), None);
        assert_eq!(result.field_type, SemanticFieldType::Email);
        // "your_name" hits FullName through your.?name, not the name$ suffix
        assert_eq!(classify(&bag("your_name"), None).field_type, SemanticFieldType::FullName);
    }

    #[test]
    fn test_name_suffix_without_label_is_unknown() {
        for name in ["username", "company_name", "pet_name"] {
            assert!(classify(&bag(name), None).is_unknown(), "name={name}");
        }
        // The same suffix in label text still reads as a full name
        assert_eq!(
            classify(&AttributeBag::default(), Some("Name")).field_type,
            SemanticFieldType::FullName
        );
    }

    #[test]
    fn test_unknown_has_zero_confidence() {
        let attributes = AttributeBag {
            name: Some("q17".to_string()),
            ..Default::default()
        };
        let result = classify(&attributes, Some("Favourite colour"));
        assert!(result.is_unknown());
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_empty_field_is_unknown() {
        assert!(classify(&AttributeBag::default(), None).is_unknown());
        assert!(classify(&AttributeBag::default(), Some("   ")).is_unknown());
    }

    #[test]
    fn test_gh_needs_word_boundary() {
        assert_eq!(classify(&bag("gh"), None).field_type, SemanticFieldType::GitHub);
        assert!(classify(&bag("high_score"), None).is_unknown());
    }
}
