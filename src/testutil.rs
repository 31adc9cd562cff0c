// Test doubles: an in-memory fetcher and an output device that records what it's asked to play.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;

use crate::audio::{AudioHost, OutputDevice, VoiceSink, wav_bytes};
use crate::audio_api::VoiceParams;
use crate::error::{EngineError, LoadError};
use crate::loader::Fetch;

// a short rising ramp, so forward and reversed copies are easy to tell apart
pub fn tone_wav() -> Vec<u8> {
    let ramp: Vec<f32> = (0..441).map(|i| i as f32 / 500.0).collect();
    wav_bytes(44100, &[ramp])
}

#[derive(Default)]
pub struct MemoryFetcher {
    files: Mutex<HashMap<String, Vec<u8>>>,
    delays: Mutex<HashMap<String, Duration>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl MemoryFetcher {
    pub fn with_tone(uri: &str) -> Self {
        let fetcher = Self::default();
        fetcher.insert_tone(uri);
        fetcher
    }

    pub fn insert(&self, uri: &str, bytes: Vec<u8>) {
        self.files.lock().insert(uri.to_string(), bytes);
    }

    pub fn insert_tone(&self, uri: &str) {
        self.insert(uri, tone_wav());
    }

    pub fn set_delay(&self, uri: &str, delay: Duration) {
        self.delays.lock().insert(uri.to_string(), delay);
    }

    pub fn calls(&self, uri: &str) -> usize {
        self.calls.lock().get(uri).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }
}

impl Fetch for MemoryFetcher {
    fn fetch<'a>(&'a self, uri: &'a str) -> BoxFuture<'a, Result<Vec<u8>, LoadError>> {
        Box::pin(async move {
            *self.calls.lock().entry(uri.to_string()).or_default() += 1;
            let delay = self.delays.lock().get(uri).copied();
            match delay {
                Some(delay) => tokio::time::sleep(delay).await,
                None => tokio::task::yield_now().await,
            }
            let bytes = self.files.lock().get(uri).cloned();
            bytes.ok_or_else(|| {
                LoadError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, uri.to_string()))
            })
        })
    }
}

// what a recorded voice looked like, minus the parts that can't be compared
#[derive(Clone, Debug)]
pub struct PlayedVoice {
    pub start_time: f64,
    pub stop_time: f64,
    pub rate: f64,
    pub gain: f32,
    pub pan: f32,
    pub reversed: bool,
    pub duration: f64,
    pub chain_nodes: usize,
}

pub struct RecordingSink {
    origin: tokio::time::Instant,
    played: Mutex<Vec<PlayedVoice>>,
}

impl VoiceSink for RecordingSink {
    // follows tokio's clock, so paused-time tests see a deterministic "now"
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    fn sample_rate(&self) -> u32 {
        44100
    }

    fn play(&self, voice: VoiceParams) {
        let samples = voice.buffer.channels.first();
        let reversed = samples
            .and_then(|ch| Some(ch.first()? > ch.last()?))
            .unwrap_or(false);
        self.played.lock().push(PlayedVoice {
            start_time: voice.start_time,
            stop_time: voice.stop_time,
            rate: voice.rate,
            gain: voice.gain,
            pan: voice.pan,
            reversed,
            duration: voice.buffer.duration(),
            chain_nodes: voice.chain.len(),
        });
    }
}

#[derive(Clone)]
pub struct RecordingHost {
    sink: Arc<RecordingSink>,
    has_device: bool,
    fail_resume: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

impl Default for RecordingHost {
    fn default() -> Self {
        Self {
            sink: Arc::new(RecordingSink {
                origin: tokio::time::Instant::now(),
                played: Mutex::new(Vec::new()),
            }),
            has_device: true,
            fail_resume: Arc::default(),
            closed: Arc::default(),
        }
    }
}

impl RecordingHost {
    pub fn without_device() -> Self {
        Self {
            has_device: false,
            ..Self::default()
        }
    }

    pub fn fail_resume(&self, fail: bool) {
        self.fail_resume.store(fail, Ordering::SeqCst);
    }

    pub fn closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn played(&self) -> Vec<PlayedVoice> {
        self.sink.played.lock().clone()
    }

    // semitones back out of the playback rate
    pub fn played_pitches(&self) -> Vec<i32> {
        self.played()
            .iter()
            .map(|v| (12.0 * v.rate.log2()).round() as i32)
            .collect()
    }
}

impl AudioHost for RecordingHost {
    fn open(&self) -> Result<Box<dyn OutputDevice>, EngineError> {
        if !self.has_device {
            return Err(EngineError::NoOutputDevice);
        }
        Ok(Box::new(self.clone()))
    }
}

impl OutputDevice for RecordingHost {
    fn resume(&mut self) -> Result<(), EngineError> {
        if self.fail_resume.load(Ordering::SeqCst) {
            return Err(EngineError::Output("resume rejected".into()));
        }
        Ok(())
    }

    fn sink(&self) -> Arc<dyn VoiceSink> {
        self.sink.clone()
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
