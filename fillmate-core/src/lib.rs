// FillMate Core Library
//
// Recognizes form fields on a page snapshot, pairs free-text questions with
// stored answers, and applies the resulting fill plan.
// Main interface for the browser host and the CLI.

pub mod types;
pub mod error;
pub mod config;
pub mod catalog;
pub mod classifier;
pub mod locator;
pub mod matcher;
pub mod fill;
pub mod snapshot;
pub mod session;
pub mod store;

// Re-export main types and functions for easy use
pub use types::*;
pub use error::{CatalogError, FillError, PassError, PassWarning};
pub use config::FillSettings;
pub use catalog::PatternCatalog;
pub use classifier::FieldClassifier;
pub use locator::FieldLocator;
pub use matcher::TemplateMatcher;
pub use fill::{FillEngine, FillPlan, FillTarget};
pub use snapshot::{parse_snapshot, PageDocument};
pub use session::{ContentRequest, ContentResponse, FillSession, PassStages};
pub use store::{DataStore, FileStore, MemoryStore, StoredData};
