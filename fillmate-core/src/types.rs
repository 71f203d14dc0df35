use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

// ===== FIELD IDENTITY =====
// An ElementHandle is an index into the caller's element table (a PageDocument
// arena here). The core never owns the element it points at; navigation can
// invalidate it mid-pass, so every write goes back through the owner.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementHandle(pub usize);

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Semantic meaning of a form field, independent of the page's language.
///
/// Declaration order here is the built-in catalog order, which decides
/// ties between ambiguous labels (e.g. "last name" also ends in "name").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SemanticFieldType {
    #[serde(rename = "firstName")]
    FirstName,
    #[serde(rename = "lastName")]
    LastName,
    #[serde(rename = "fullName")]
    FullName,
    #[serde(rename = "email")]
    Email,
    #[serde(rename = "phone")]
    Phone,
    #[serde(rename = "linkedin")]
    LinkedIn,
    #[serde(rename = "github")]
    GitHub,
    #[serde(rename = "website")]
    Website,
    #[serde(rename = "address")]
    Address,
    #[serde(rename = "education")]
    Education,
    #[serde(rename = "experience")]
    Experience,
    #[serde(rename = "unknown")]
    Unknown,
}

impl SemanticFieldType {
    /// Every classifiable type, in built-in catalog order (Unknown excluded).
    pub const ORDERED: [SemanticFieldType; 11] = [
        SemanticFieldType::FirstName,
        SemanticFieldType::LastName,
        SemanticFieldType::FullName,
        SemanticFieldType::Email,
        SemanticFieldType::Phone,
        SemanticFieldType::LinkedIn,
        SemanticFieldType::GitHub,
        SemanticFieldType::Website,
        SemanticFieldType::Address,
        SemanticFieldType::Education,
        SemanticFieldType::Experience,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticFieldType::FirstName => "firstName",
            SemanticFieldType::LastName => "lastName",
            SemanticFieldType::FullName => "fullName",
            SemanticFieldType::Email => "email",
            SemanticFieldType::Phone => "phone",
            SemanticFieldType::LinkedIn => "linkedin",
            SemanticFieldType::GitHub => "github",
            SemanticFieldType::Website => "website",
            SemanticFieldType::Address => "address",
            SemanticFieldType::Education => "education",
            SemanticFieldType::Experience => "experience",
            SemanticFieldType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SemanticFieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field attributes a pattern rule can be tested against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldAttribute {
    #[serde(rename = "name")]
    Name,
    #[serde(rename = "id")]
    Id,
    #[serde(rename = "placeholder")]
    Placeholder,
    #[serde(rename = "aria-label")]
    AriaLabel,
    #[serde(rename = "type")]
    Type,
    /// Derived: the resolved label text itself.
    #[serde(rename = "label")]
    Label,
}

/// Attribute bag extracted from one form field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeBag {
    pub name: Option<String>,
    pub id: Option<String>,
    pub placeholder: Option<String>,
    pub aria_label: Option<String>,
    pub input_type: Option<String>,
}

impl AttributeBag {
    /// Value of one attribute. `Label` is not part of the bag; it is always
    /// appended separately by the classifier, so it reads as empty here.
    pub fn get(&self, attribute: FieldAttribute) -> &str {
        let value = match attribute {
            FieldAttribute::Name => &self.name,
            FieldAttribute::Id => &self.id,
            FieldAttribute::Placeholder => &self.placeholder,
            FieldAttribute::AriaLabel => &self.aria_label,
            FieldAttribute::Type => &self.input_type,
            FieldAttribute::Label => return "",
        };
        value.as_deref().unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        [
            &self.name,
            &self.id,
            &self.placeholder,
            &self.aria_label,
            &self.input_type,
        ]
        .iter()
        .all(|v| v.as_deref().map(str::trim).unwrap_or("").is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub field_type: SemanticFieldType,
    pub confidence: f32,
}

impl Classification {
    pub fn unknown() -> Self {
        Self {
            field_type: SemanticFieldType::Unknown,
            confidence: 0.0,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.field_type == SemanticFieldType::Unknown
    }
}

/// One visible, editable field found during a scan. Lives for a single pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateField {
    pub handle: ElementHandle,
    pub attributes: AttributeBag,
    pub label_text: Option<String>,
    pub field_type: SemanticFieldType,
    pub confidence: f32,
}

// ===== KNOWLEDGE BASE =====

/// A stored question with its canned answers. `answers[0]` is the default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub question: String,
    pub answers: Vec<String>,
}

impl Template {
    pub fn new(question: &str, answer: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            question: question.trim().to_string(),
            answers: vec![answer.trim().to_string()],
        }
    }

    pub fn default_answer(&self) -> Option<&str> {
        self.answers.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateMatch {
    pub handle: ElementHandle,
    pub template_id: String,
    pub question: String,
    pub answer: String,
}

// ===== PROFILE =====

/// Personal data used to fill classified fields. Every field is optional;
/// an absent or blank value simply produces no fill for that type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub linkedin: Option<String>,
    #[serde(default)]
    pub github: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub education: Option<String>,
    #[serde(default)]
    pub experience: Option<String>,
    /// Anything else the profile editor stores (university, currentRole, ...).
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl Profile {
    /// Value for a semantic type. FullName falls back to "first last" when
    /// no explicit full name is stored and both halves are present.
    pub fn value_for(&self, field_type: SemanticFieldType) -> Option<String> {
        let value = match field_type {
            SemanticFieldType::FirstName => non_blank(&self.first_name),
            SemanticFieldType::LastName => non_blank(&self.last_name),
            SemanticFieldType::FullName => {
                if let Some(full) = non_blank(&self.full_name) {
                    Some(full)
                } else {
                    return match (non_blank(&self.first_name), non_blank(&self.last_name)) {
                        (Some(first), Some(last)) => Some(format!("{first} {last}")),
                        _ => None,
                    };
                }
            }
            SemanticFieldType::Email => non_blank(&self.email),
            SemanticFieldType::Phone => non_blank(&self.phone),
            SemanticFieldType::LinkedIn => non_blank(&self.linkedin),
            SemanticFieldType::GitHub => non_blank(&self.github),
            SemanticFieldType::Website => non_blank(&self.website),
            SemanticFieldType::Address => non_blank(&self.address),
            SemanticFieldType::Education => non_blank(&self.education),
            SemanticFieldType::Experience => non_blank(&self.experience),
            SemanticFieldType::Unknown => None,
        };
        value.map(str::to_string)
    }

    /// True when at least one mapped type resolves to a value.
    pub fn is_usable(&self) -> bool {
        SemanticFieldType::ORDERED
            .iter()
            .any(|t| self.value_for(*t).is_some())
    }
}

// ===== FILL PLAN & RESULT =====

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FillSource {
    Profile { field_type: SemanticFieldType },
    Template { template_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillEntry {
    pub handle: ElementHandle,
    pub value: String,
    pub source: FillSource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillFailure {
    pub handle: ElementHandle,
    pub reason: String,
}

/// Outcome of one fill pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillReport {
    pub pass_id: Uuid,
    pub filled_count: usize,
    pub planned_count: usize,
    pub filled: Vec<ElementHandle>,
    pub failures: Vec<FillFailure>,
    /// Set when the page went away before the plan finished.
    pub cancelled: bool,
    pub warnings: Vec<String>,
}

impl FillReport {
    pub fn empty() -> Self {
        Self {
            pass_id: Uuid::new_v4(),
            filled_count: 0,
            planned_count: 0,
            filled: Vec::new(),
            failures: Vec::new(),
            cancelled: false,
            warnings: Vec::new(),
        }
    }

    pub fn with_warning(warning: impl ToString) -> Self {
        let mut report = Self::empty();
        report.warnings.push(warning.to_string());
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name_synthesized_from_halves() {
        let profile = Profile {
            first_name: Some("Ada".to_string()),
            last_name: Some("Lovelace".to_string()),
            ..Default::default()
        };
        assert_eq!(
            profile.value_for(SemanticFieldType::FullName).as_deref(),
            Some("Ada Lovelace")
        );
    }

    #[test]
    fn test_explicit_full_name_wins() {
        let profile = Profile {
            first_name: Some("Ada".to_string()),
            last_name: Some("Lovelace".to_string()),
            full_name: Some("Augusta Ada King".to_string()),
            ..Default::default()
        };
        assert_eq!(
            profile.value_for(SemanticFieldType::FullName).as_deref(),
            Some("Augusta Ada King")
        );
    }

    #[test]
    fn test_full_name_needs_both_halves() {
        let profile = Profile {
            first_name: Some("Ada".to_string()),
            ..Default::default()
        };
        assert_eq!(profile.value_for(SemanticFieldType::FullName), None);
    }

    #[test]
    fn test_blank_values_are_absent() {
        let profile = Profile {
            email: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(profile.value_for(SemanticFieldType::Email), None);
        assert!(!profile.is_usable());
    }

    #[test]
    fn test_profile_reads_camel_case_and_keeps_extras() {
        let profile: Profile = serde_json::from_str(
            r#"{"firstName":"Ada","lastName":"Lovelace","university":"London"}"#,
        )
        .unwrap();
        assert_eq!(profile.first_name.as_deref(), Some("Ada"));
        assert_eq!(profile.extra["university"], "London");
    }

    #[test]
    fn test_field_type_serde_names() {
        let json = serde_json::to_string(&SemanticFieldType::LinkedIn).unwrap();
        assert_eq!(json, "\"linkedin\"");
        let parsed: SemanticFieldType = serde_json::from_str("\"fullName\"").unwrap();
        assert_eq!(parsed, SemanticFieldType::FullName);
    }
}
