//! Generation stages, in execution order.

mod compile;
mod constellations;
mod extract_audio;
mod fade;
mod merge;
mod offsets;
mod overlay;

pub use compile::CompileVideoStep;
pub use constellations::ConstellationStep;
pub use extract_audio::ExtractAudioStep;
pub use fade::FadeAudioStep;
pub use merge::MergeAudioStep;
pub use offsets::OffsetStep;
pub use overlay::OverlayAudioStep;
