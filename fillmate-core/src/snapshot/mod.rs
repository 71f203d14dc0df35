//! Page Snapshots
//!
//! This module provides the page model the fill pipeline reads from and
//! writes to. A snapshot is an arena of nodes addressed by `ElementHandle`,
//! so the core never holds references into a live DOM.
//!
//! ## Architecture
//!
//! ```text
//! Page markup (XHTML snapshot recorded by the content script)
//!     ↓
//! [parse_snapshot]
//!     ↓
//! PageDocument (arena + field state)
//!     ↓
//! [FieldLocator / TemplateMatcher]  (read-only)
//!     ↓
//! [FillEngine via FillTarget]       (writes values, events, highlights)
//! ```
//!
//! The recorder inlines what it measured in the live page: `style`
//! (display / visibility), `data-width` / `data-height` for the rendered
//! box, and `data-focused` for the active element.

pub mod document;
pub mod parser;

// Re-export main types
pub use document::{FieldEvent, FieldKind, PageDocument};
pub use parser::parse_snapshot;
