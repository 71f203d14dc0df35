//! Pattern catalog: the static table of semantic field types and the
//! recognition patterns for each.
//!
//! Patterns are case-insensitive regexes tested against
//! `"{attribute value} {label text}"`. Each rule carries translated variants
//! of the same concept because target forms are not limited to one locale.
//! Rule order is significant: the classifier returns the first type with a
//! matching pattern, so the catalog is an ordered list, never a map.

use crate::config::{CatalogConfig, FieldRuleConfig};
use crate::error::CatalogError;
use crate::types::{FieldAttribute, SemanticFieldType};
use regex::{Regex, RegexBuilder};
use std::collections::HashSet;

const BASE_ATTRIBUTES: [FieldAttribute; 5] = [
    FieldAttribute::Name,
    FieldAttribute::Id,
    FieldAttribute::Placeholder,
    FieldAttribute::AriaLabel,
    FieldAttribute::Label,
];

// Email and phone also look at the input type ("email", "tel").
const TYPED_ATTRIBUTES: [FieldAttribute; 6] = [
    FieldAttribute::Name,
    FieldAttribute::Id,
    FieldAttribute::Placeholder,
    FieldAttribute::AriaLabel,
    FieldAttribute::Type,
    FieldAttribute::Label,
];

fn rule(
    field_type: SemanticFieldType,
    confidence: f32,
    attributes: &[FieldAttribute],
    patterns: &[&str],
) -> FieldRuleConfig {
    FieldRuleConfig {
        field_type,
        patterns: patterns.iter().map(|p| p.to_string()).collect(),
        attributes: attributes.to_vec(),
        confidence,
    }
}

/// Built-in rule table in declaration order.
///
/// The GitHub shorthand is deliberately bounded as `\bgh\b` instead of a
/// bare `gh`, which fires inside words like "high" or "weight" and would put
/// a GitHub URL into unrelated fields.
pub fn builtin_rules() -> Vec<FieldRuleConfig> {
    use SemanticFieldType::*;

    vec![
        rule(
            FirstName,
            0.9,
            &BASE_ATTRIBUTES,
            &[
                r"first.?name",
                r"fname",
                r"given.?name",
                r"forename",
                r"applicant.?first",
                r"applicant.?given",
                r"prénom",
                r"vorname",
                r"nombre",
                r"名",
                r"имя",
                r"nome",
                r"your.?first.?name",
            ],
        ),
        rule(
            LastName,
            0.9,
            &BASE_ATTRIBUTES,
            &[
                r"last.?name",
                r"lname",
                r"surname",
                r"family.?name",
                r"applicant.?last",
                r"applicant.?family",
                r"nachname",
                r"apellido",
                r"姓",
                r"фамилия",
                r"sobrenome",
                r"cognome",
            ],
        ),
        rule(
            FullName,
            0.9,
            &BASE_ATTRIBUTES,
            &[
                r"full.?name",
                r"your.?name",
                r"contact.?name",
                r"name$",
                r"name_field",
                r"nombre.?completo",
                r"nome.?completo",
                r"полное.?имя",
            ],
        ),
        rule(
            Email,
            0.95,
            &TYPED_ATTRIBUTES,
            &[
                r"email",
                r"e.?mail",
                r"mail",
                r"contact.?email",
                r"correo",
                r"courriel",
                r"e.?post",
                r"电子邮件",
                r"почта",
                r"メール",
            ],
        ),
        rule(
            Phone,
            0.9,
            &TYPED_ATTRIBUTES,
            &[
                r"phone",
                r"tel",
                r"mobile",
                r"contact.?phone",
                r"cell",
                r"cellular",
                r"telefono",
                r"telefon",
                r"电话",
                r"телефон",
                r"telefone",
                r"nummer",
                r"номер",
                r"mob",
                r"handy",
            ],
        ),
        rule(
            LinkedIn,
            0.95,
            &BASE_ATTRIBUTES,
            &[
                r"linkedin",
                r"linked.?in",
                r"lnkd",
                r"profile.?link",
                r"professional.?network",
            ],
        ),
        rule(
            GitHub,
            0.95,
            &BASE_ATTRIBUTES,
            &[
                r"github",
                r"git.?hub",
                r"\bgh\b",
                r"repo.?link",
                r"source.?code",
            ],
        ),
        rule(
            Website,
            0.8,
            &BASE_ATTRIBUTES,
            &[
                r"website",
                r"portfolio",
                r"url",
                r"site",
                r"web.?page",
                r"personal.?site",
                r"homepage",
                r"site.?web",
                r"webseite",
                r"web.?address",
            ],
        ),
        rule(
            Address,
            0.8,
            &BASE_ATTRIBUTES,
            &[
                r"address",
                r"location",
                r"city",
                r"state",
                r"zip",
                r"postal",
                r"postcode",
                r"street",
                r"country",
                r"direccion",
                r"adresse",
                r"plz",
                r"indirizzo",
                r"адрес",
                r"地址",
            ],
        ),
        rule(
            Education,
            0.8,
            &BASE_ATTRIBUTES,
            &[
                r"education",
                r"degree",
                r"university",
                r"college",
                r"school",
                r"studies",
                r"major",
                r"field.?of.?study",
                r"course",
                r"diploma",
                r"formation",
                r"ausbildung",
                r"学位",
                r"образование",
            ],
        ),
        rule(
            Experience,
            0.7,
            &BASE_ATTRIBUTES,
            &[
                r"experience",
                r"years",
                r"work",
                r"employment",
                r"expérience",
                r"berufserfahrung",
                r"experiencia",
                r"опыт",
                r"exp",
                r"background",
                r"职务",
            ],
        ),
    ]
}

/// Compiled recognition rule for one semantic type.
#[derive(Debug, Clone)]
pub struct PatternRule {
    pub field_type: SemanticFieldType,
    pub patterns: Vec<Regex>,
    pub attributes: Vec<FieldAttribute>,
    pub confidence: f32,
}

/// Immutable, ordered pattern table. Built once and shared by reference.
#[derive(Debug, Clone)]
pub struct PatternCatalog {
    rules: Vec<PatternRule>,
}

impl PatternCatalog {
    pub fn from_config(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        let mut rules = Vec::with_capacity(config.rules.len());

        for rule_config in &config.rules {
            let field_type = rule_config.field_type;
            if field_type == SemanticFieldType::Unknown {
                return Err(CatalogError::UnknownType);
            }
            if !seen.insert(field_type) {
                return Err(CatalogError::DuplicateType(field_type));
            }
            if rule_config.patterns.is_empty() {
                return Err(CatalogError::EmptyRule(field_type));
            }
            if !(0.0..=1.0).contains(&rule_config.confidence) {
                return Err(CatalogError::ConfidenceOutOfRange {
                    field_type,
                    confidence: rule_config.confidence,
                });
            }

            let mut patterns = Vec::with_capacity(rule_config.patterns.len());
            for pattern in &rule_config.patterns {
                let compiled = RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|source| CatalogError::InvalidPattern {
                        field_type,
                        pattern: pattern.clone(),
                        source,
                    })?;
                patterns.push(compiled);
            }

            rules.push(PatternRule {
                field_type,
                patterns,
                attributes: rule_config.attributes.clone(),
                confidence: rule_config.confidence,
            });
        }

        tracing::debug!("🗂️  Pattern catalog built with {} rules", rules.len());
        Ok(Self { rules })
    }

    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_config(&CatalogConfig::default())
    }

    pub fn patterns_for(&self, field_type: SemanticFieldType) -> Option<&PatternRule> {
        self.rules.iter().find(|r| r.field_type == field_type)
    }

    /// Types in evaluation order.
    pub fn all_types(&self) -> Vec<SemanticFieldType> {
        self.rules.iter().map(|r| r.field_type).collect()
    }

    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }
}

impl Default for PatternCatalog {
    fn default() -> Self {
        Self::builtin().expect("Failed to compile built-in pattern catalog")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_order_matches_declaration() {
        let catalog = PatternCatalog::default();
        assert_eq!(catalog.all_types(), SemanticFieldType::ORDERED.to_vec());
    }

    #[test]
    fn test_confidences_in_unit_range() {
        let catalog = PatternCatalog::default();
        for rule in catalog.rules() {
            assert!((0.0..=1.0).contains(&rule.confidence), "{}", rule.field_type);
        }
    }

    #[test]
    fn test_only_email_and_phone_check_type() {
        let catalog = PatternCatalog::default();
        for rule in catalog.rules() {
            let checks_type = rule.attributes.contains(&FieldAttribute::Type);
            let expected = matches!(
                rule.field_type,
                SemanticFieldType::Email | SemanticFieldType::Phone
            );
            assert_eq!(checks_type, expected, "{}", rule.field_type);
        }
    }

    #[test]
    fn test_patterns_are_case_insensitive() {
        let catalog = PatternCatalog::default();
        let rule = catalog.patterns_for(SemanticFieldType::LinkedIn).unwrap();
        assert!(rule.patterns.iter().any(|p| p.is_match("LinkedIn URL")));
    }

    #[test]
    fn test_rejects_bad_confidence() {
        let config = CatalogConfig {
            rules: vec![rule(
                SemanticFieldType::Email,
                1.5,
                &BASE_ATTRIBUTES,
                &["email"],
            )],
        };
        assert!(matches!(
            PatternCatalog::from_config(&config),
            Err(CatalogError::ConfidenceOutOfRange { .. })
        ));
    }

    #[test]
    fn test_rejects_duplicate_and_unknown_types() {
        let duplicate = CatalogConfig {
            rules: vec![
                rule(SemanticFieldType::Email, 0.9, &BASE_ATTRIBUTES, &["email"]),
                rule(SemanticFieldType::Email, 0.9, &BASE_ATTRIBUTES, &["mail"]),
            ],
        };
        assert!(matches!(
            PatternCatalog::from_config(&duplicate),
            Err(CatalogError::DuplicateType(SemanticFieldType::Email))
        ));

        let unknown = CatalogConfig {
            rules: vec![rule(SemanticFieldType::Unknown, 0.1, &BASE_ATTRIBUTES, &["x"])],
        };
        assert!(matches!(
            PatternCatalog::from_config(&unknown),
            Err(CatalogError::UnknownType)
        ));
    }

    #[test]
    fn test_rejects_invalid_regex() {
        let config = CatalogConfig {
            rules: vec![rule(SemanticFieldType::Phone, 0.9, &BASE_ATTRIBUTES, &["(tel"])],
        };
        assert!(matches!(
            PatternCatalog::from_config(&config),
            Err(CatalogError::InvalidPattern { .. })
        ));
    }
}
