// Fill module - turns classified fields and template matches into writes.
// - plan.rs: FillPlan construction (profile lookup, template answers, dedup)
// - engine.rs: FillEngine, the paced and cancellable application loop
// - target.rs: FillTarget, the seam to whatever owns the live document

pub mod engine;
pub mod plan;
pub mod target;

pub use engine::FillEngine;
pub use plan::FillPlan;
pub use target::FillTarget;
