use crate::types::{ElementHandle, SemanticFieldType};
use thiserror::Error;

/// A value could not be written to one element. Caught per element; the
/// rest of the plan still runs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FillError {
    #[error("element {0} is no longer attached to the document")]
    Detached(ElementHandle),
    #[error("element {0} does not exist in this document")]
    UnknownElement(ElementHandle),
    #[error("element {0} is not an editable text field")]
    NotEditable(ElementHandle),
}

/// User-visible outcomes that stop a pass without being faults.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PassWarning {
    #[error("No active profile found")]
    NoProfileAvailable,
    #[error("Autofill is disabled")]
    AutofillDisabled,
    #[error("Please click on a text field first")]
    NoFocusedField,
    #[error("Page changed before the fill finished")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum PassError {
    #[error("a fill pass is already running for this page")]
    AlreadyRunning,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid pattern {pattern:?} for {field_type}: {source}")]
    InvalidPattern {
        field_type: SemanticFieldType,
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("confidence {confidence} for {field_type} is outside [0, 1]")]
    ConfidenceOutOfRange {
        field_type: SemanticFieldType,
        confidence: f32,
    },
    #[error("{0} is declared more than once")]
    DuplicateType(SemanticFieldType),
    #[error("rule for {0} has no patterns")]
    EmptyRule(SemanticFieldType),
    #[error("the unknown type cannot carry patterns")]
    UnknownType,
}
