use crate::error::FillError;
use crate::snapshot::FieldEvent;
use crate::types::ElementHandle;
use std::time::Duration;

/// Write access to the document a pass runs against.
///
/// Implemented by whatever owns the page (an in-memory PageDocument here, a
/// DOM bridge in the extension host). Every call can fail independently
/// because the page may remove elements while a pass is suspended.
pub trait FillTarget {
    fn focus(&mut self, handle: ElementHandle) -> Result<(), FillError>;

    /// Replace the field's value wholesale.
    fn set_value(&mut self, handle: ElementHandle, value: &str) -> Result<(), FillError>;

    /// Dispatch a bubbling notification so framework listeners observe the change.
    fn dispatch(&mut self, handle: ElementHandle, event: FieldEvent) -> Result<(), FillError>;

    /// Transient visual feedback; the host reverts it once `duration` has passed.
    fn highlight(&mut self, handle: ElementHandle, duration: Duration) -> Result<(), FillError>;
}
