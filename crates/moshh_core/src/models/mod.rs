//! Data models shared across the generation pipeline.
//!
//! - `media`: source descriptors, decoded audio, resolved timeline windows
//! - `plan`: subclip specs and the compiled plan
//! - `enums`: progress stages and encoder presets

mod enums;
mod media;
mod plan;

pub use enums::{Preset, ProgressStage};
pub use media::{AudioSignal, EncodeProfile, GlobalOffset, MediaSource};
pub use plan::{CompilationPlan, PlannedSubclip, SubclipSpec};
