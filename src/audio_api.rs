use std::sync::Arc;

pub use crate::audio::{EffectChain, SampleBuffer};

// Everything the audio thread needs to play one hit. Times are on the output
// clock, in seconds.
#[derive(Debug)]
pub struct VoiceParams {
    pub buffer: Arc<SampleBuffer>,
    pub start_time: f64,
    pub stop_time: f64, // the source stops here; the chain may ring on after
    pub rate: f64,      // 1.0 = original pitch
    pub gain: f32,
    pub pan: f32,       // -1..1
    pub chain: EffectChain,
}

impl VoiceParams {
    // plain playback of a whole buffer; used for previews
    pub fn dry(buffer: Arc<SampleBuffer>, start_time: f64, tail: f64) -> Self {
        let stop_time = start_time + buffer.duration() + tail;
        Self {
            buffer,
            start_time,
            stop_time,
            rate: 1.0,
            gain: 1.0,
            pan: 0.0,
            chain: EffectChain::passthrough(),
        }
    }
}

#[derive(Debug)]
pub enum AudioCommand {
    // The engine can't load files (that would stall the callback), so voices
    // arrive with their buffers already decoded and their chains already built
    Play(VoiceParams),

    // drop every sounding voice; used on teardown
    Silence,
}
