use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};
use tracing::{error, info, warn};

use crate::audio_api::{AudioCommand, VoiceParams};
use crate::error::EngineError;
use crate::shared::{COMMAND_QUEUE, MAX_VOICES};

pub mod chain;
mod effect;
mod engine;
mod frame;
mod sample_buffer;
mod voice;

pub use chain::{EffectChain, build_chain};
pub use effect::{Biquad, Effect, FeedbackDelay, FilterKind, WaveShaper};
pub use engine::{Mixer, OutputClock};
pub use frame::StereoFrame;
pub use sample_buffer::SampleBuffer;
pub use voice::Voice;

#[cfg(test)]
pub(crate) use sample_buffer::tests::{aiff_bytes, wav_bytes};

/// Where voices go. Cheap to share with any task that wants to trigger sound.
pub trait VoiceSink: Send + Sync {
    /// Current time on the output clock, in seconds.
    fn now(&self) -> f64;
    fn sample_rate(&self) -> u32;
    fn play(&self, voice: VoiceParams);
}

/// An opened output device. Starts suspended; nothing is heard until `resume`.
pub trait OutputDevice {
    fn resume(&mut self) -> Result<(), EngineError>;
    fn sink(&self) -> Arc<dyn VoiceSink>;
    fn close(&mut self);
}

/// Something that can open an output device, e.g. the default cpal host.
pub trait AudioHost {
    fn open(&self) -> Result<Box<dyn OutputDevice>, EngineError>;
}

// The control side's end of the audio thread: a command queue, the clock, and
// the voices the mixer handed back for dropping.
pub struct AudioHandle {
    tx: Sender<AudioCommand>,
    retired: Receiver<Voice>,
    clock: Arc<OutputClock>,
}

impl AudioHandle {
    pub fn new(tx: Sender<AudioCommand>, retired: Receiver<Voice>, clock: Arc<OutputClock>) -> Self {
        Self { tx, retired, clock }
    }

    pub fn send(&self, cmd: AudioCommand) {
        self.drop_retired();
        if self.tx.try_send(cmd).is_err() {
            warn!("audio command queue full, dropping command");
        }
    }

    // free finished voices here rather than inside the output callback
    pub fn drop_retired(&self) -> usize {
        self.retired.try_iter().count()
    }
}

impl VoiceSink for AudioHandle {
    fn now(&self) -> f64 {
        self.clock.now()
    }

    fn sample_rate(&self) -> u32 {
        self.clock.sample_rate()
    }

    fn play(&self, voice: VoiceParams) {
        self.send(AudioCommand::Play(voice));
    }
}

// ── cpal ──────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default)]
pub struct CpalHost;

impl AudioHost for CpalHost {
    fn open(&self) -> Result<Box<dyn OutputDevice>, EngineError> {
        Ok(Box::new(start_audio()?))
    }
}

pub struct CpalDevice {
    handle: Arc<AudioHandle>,
    stream: Option<cpal::Stream>,
}

impl OutputDevice for CpalDevice {
    fn resume(&mut self) -> Result<(), EngineError> {
        let stream = self.stream.as_ref().ok_or(EngineError::Destroyed)?;
        stream
            .play()
            .map_err(|e| EngineError::Output(e.to_string()))
    }

    fn sink(&self) -> Arc<dyn VoiceSink> {
        self.handle.clone()
    }

    fn close(&mut self) {
        self.handle.send(AudioCommand::Silence);
        if let Some(stream) = self.stream.take() {
            let _ = stream.pause();
        }
    }
}

pub fn start_audio() -> Result<CpalDevice, EngineError> {
    let (tx, rx) = crossbeam_channel::bounded::<AudioCommand>(COMMAND_QUEUE);
    // every command retires at most one voice, Silence at most the whole pool
    let (retired_tx, retired_rx) = crossbeam_channel::bounded::<Voice>(COMMAND_QUEUE + MAX_VOICES);

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or(EngineError::NoOutputDevice)?;
    let config = device
        .default_output_config()
        .map_err(|e| EngineError::Output(e.to_string()))?;

    let sample_rate = config.sample_rate();
    let channels = config.channels() as usize;

    match config.sample_format() {
        cpal::SampleFormat::F32 => {
            let clock = Arc::new(OutputClock::new(sample_rate));
            let mixer = Mixer::new(clock.clone(), retired_tx);
            let stream = build_output_stream_f32(&device, &config.into(), rx, mixer, channels)?;
            // stay quiet until someone asks for sound
            let _ = stream.pause();
            info!(sample_rate, channels, "audio output opened");

            Ok(CpalDevice {
                handle: Arc::new(AudioHandle::new(tx, retired_rx, clock)),
                stream: Some(stream),
            })
        }
        other => Err(EngineError::UnsupportedFormat(format!("{other:?}"))),
    }
}

fn build_output_stream_f32(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    rx: Receiver<AudioCommand>,
    mut mixer: Mixer,
    channels: usize,
) -> Result<cpal::Stream, EngineError> {
    let mut scratch = vec![StereoFrame::zero(); 4096];

    let err_fn = |err| error!("audio output stream error: {err}");

    let stream = device
        .build_output_stream(
            config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                while let Ok(cmd) = rx.try_recv() {
                    mixer.handle_cmd(cmd);
                }

                // render through the scratch block, then spread onto the device's channels
                for chunk in data.chunks_mut(scratch.len() * channels.max(1)) {
                    let n_frames = chunk.len() / channels.max(1);
                    let frames = &mut scratch[..n_frames];
                    mixer.render_block(frames);
                    for (out, f) in chunk.chunks_exact_mut(channels.max(1)).zip(frames.iter()) {
                        match out {
                            [mono] => *mono = (f.left + f.right) * 0.5,
                            [left, right, rest @ ..] => {
                                *left = f.left;
                                *right = f.right;
                                rest.fill(0.0);
                            }
                            [] => {}
                        }
                    }
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| EngineError::Output(e.to_string()))?;

    Ok(stream)
}
