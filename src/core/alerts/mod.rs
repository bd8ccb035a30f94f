// Alert pipeline for spoken and haptic feedback.
//
// Architecture:
// - model.rs: Speech items, priorities, directions and their tuning
// - phrases.rs: Per-language, per-zone phrase templates
// - builder.rs: Turns a merged detection into an optional speech item
// - scheduler.rs: Dedup, suppression windows and priority ordering
// - dispatcher.rs: Single-slot state machine over the speech device

pub mod builder;
pub mod dispatcher;
pub mod model;
pub mod phrases;
pub mod scheduler;
