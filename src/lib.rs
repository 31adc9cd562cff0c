// A small step sequencer: a JSON pattern config goes in, scheduled sample
// voices come out of the default audio device.

pub mod audio;
pub mod audio_api;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod playback;
pub mod sequencer;
pub mod shared;

#[cfg(test)]
mod testutil;

pub use error::{EngineError, LoadError};
pub use pipeline::{AudioConfig, normalize};
pub use playback::{PlaybackEngine, TransportState};
