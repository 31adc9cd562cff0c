// The playback engine: the one place with lifecycle state.
//
// It holds the current config snapshot, the sample cache and the output
// device, and runs the step scheduler as a single spawned task. That task's
// `JoinHandle` is the pending timer: stopping aborts it, nothing else.
//
// Every start and stop opens a new session. A step trigger that is still
// waiting on its sample when its session ends is dropped instead of playing
// late; the sample load itself carries on and fills the cache.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::audio::{AudioHost, OutputDevice, VoiceSink, build_chain};
use crate::audio_api::VoiceParams;
use crate::error::EngineError;
use crate::loader::{Fetch, SampleCache};
use crate::pipeline::{AudioConfig, Step, normalize};
use crate::sequencer::{Advance, cycle_length, plan_tick};
use crate::shared::{LOOKAHEAD, PREVIEW_DELAY, RELEASE_TAIL, START_EPSILON};

/// What the outside world gets to see.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransportState {
    pub is_playing: bool,
}

#[derive(Debug, Default)]
struct EngineState {
    is_playing: bool,
    step_index: usize,
    session: u64,
}

struct Shared {
    config: RwLock<Arc<AudioConfig>>,
    cache: SampleCache,
    state: Mutex<EngineState>,
}

impl Shared {
    fn snapshot(&self) -> Arc<AudioConfig> {
        self.config.read().clone()
    }

    fn session(&self) -> u64 {
        self.state.lock().session
    }

    // Resolve the step's sample and hand the audio thread a voice for it.
    // Empty slots and samples that won't load are silent.
    async fn play_step(
        &self,
        sink: &dyn VoiceSink,
        config: &AudioConfig,
        track_index: usize,
        step: &Step,
        nominal_start: f64,
        session: u64,
    ) {
        let Some(track) = config.tracks.get(track_index) else {
            return;
        };
        let Some(sample_id) = track.slot_sample_id(step.sample_slot as usize) else {
            return;
        };
        let Some(entry) = self.cache.resolve(sample_id).await else {
            return;
        };
        if self.session() != session {
            debug!(sample_id, "session ended while sample loaded, dropping trigger");
            return;
        }

        let buffer = entry.pick(step.reverse).clone();
        let rate = 2f64.powf(step.pitch as f64 / 12.0);
        let start_time = nominal_start.max(sink.now() + START_EPSILON);
        let stop_time = start_time + buffer.duration() / rate + RELEASE_TAIL;
        let chain = build_chain(step.modulation.modulation(), sink.sample_rate() as f32);

        sink.play(VoiceParams {
            buffer,
            start_time,
            stop_time,
            rate,
            gain: step.volume as f32,
            pan: step.pan as f32,
            chain,
        });
    }
}

// Puts the transport back to Idle if the scheduler task goes away while its
// session is still current. stop() and a finished pattern move the session
// on first, so those exits pass through untouched.
struct SessionGuard {
    shared: Arc<Shared>,
    session: u64,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock();
        if state.session == self.session && state.is_playing {
            state.is_playing = false;
            state.session += 1;
            warn!(session = self.session, "scheduler exited while playing, transport reset");
        }
    }
}

// a step too long for Duration never ends
fn step_sleep(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

// One tick per step until stopped (aborted) or a non-looping pattern ends.
async fn run_scheduler(shared: Arc<Shared>, sink: Arc<dyn VoiceSink>, session: u64) {
    let _guard = SessionGuard {
        shared: shared.clone(),
        session,
    };
    loop {
        let config = shared.snapshot();
        let tick = {
            let mut state = shared.state.lock();
            if state.session != session || !state.is_playing {
                return;
            }
            let tick = plan_tick(&config, state.step_index % cycle_length(&config));
            if let Advance::Next(next) = tick.advance {
                state.step_index = next;
            }
            tick
        };

        let start_time = sink.now() + LOOKAHEAD;
        for trigger in tick.triggers {
            let shared = shared.clone();
            let sink = sink.clone();
            let config = config.clone();
            tokio::spawn(async move {
                shared
                    .play_step(
                        sink.as_ref(),
                        &config,
                        trigger.track_index,
                        &trigger.step,
                        start_time,
                        session,
                    )
                    .await;
            });
        }

        tokio::time::sleep(step_sleep(tick.duration)).await;

        if tick.advance == Advance::Finish {
            let mut state = shared.state.lock();
            if state.session == session {
                state.is_playing = false;
                state.session += 1;
                info!(step = tick.step_index, "pattern finished");
            }
            return;
        }
    }
}

pub struct PlaybackEngine {
    shared: Arc<Shared>,
    host: Box<dyn AudioHost>,
    output: Option<Box<dyn OutputDevice>>,
    pending: Option<JoinHandle<()>>,
    destroyed: bool,
}

impl PlaybackEngine {
    pub fn new(initial: &Value, host: Box<dyn AudioHost>, fetcher: Arc<dyn Fetch>) -> Self {
        let config = normalize(initial);
        let cache = SampleCache::new(fetcher);
        cache.set_library(&config);
        Self {
            shared: Arc::new(Shared {
                config: RwLock::new(Arc::new(config)),
                cache,
                state: Mutex::new(EngineState::default()),
            }),
            host,
            output: None,
            pending: None,
            destroyed: false,
        }
    }

    pub fn config(&self) -> Arc<AudioConfig> {
        self.shared.snapshot()
    }

    pub fn get_state(&self) -> TransportState {
        TransportState {
            is_playing: self.shared.state.lock().is_playing,
        }
    }

    // open the device on first use, and make sure it's running
    fn ensure_output(&mut self) -> Result<Arc<dyn VoiceSink>, EngineError> {
        if self.destroyed {
            return Err(EngineError::Destroyed);
        }
        if self.output.is_none() {
            self.output = Some(self.host.open()?);
        }
        let Some(output) = self.output.as_mut() else {
            return Err(EngineError::NoOutputDevice);
        };
        output.resume()?;
        Ok(output.sink())
    }

    pub async fn start(&mut self) -> Result<(), EngineError> {
        if self.get_state().is_playing {
            return Ok(());
        }
        let sink = self.ensure_output().inspect_err(|e| {
            error!(error = %e, "unable to start audio engine");
        })?;

        let config = self.config();
        self.shared.cache.prepare_all(&config).await;

        let session = {
            let mut state = self.shared.state.lock();
            state.session += 1;
            state.step_index = 0;
            state.is_playing = true;
            state.session
        };
        info!(bpm = config.bpm, steps = config.steps_per_bar, "playback started");
        self.pending = Some(tokio::spawn(run_scheduler(self.shared.clone(), sink, session)));
        Ok(())
    }

    pub fn stop(&mut self) {
        {
            let mut state = self.shared.state.lock();
            if !state.is_playing {
                return;
            }
            state.is_playing = false;
            state.session += 1;
        }
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
        info!("playback stopped");
    }

    pub async fn toggle(&mut self) -> Result<(), EngineError> {
        if self.get_state().is_playing {
            self.stop();
            Ok(())
        } else {
            self.start().await
        }
    }

    /// Swap in a new config. While playing the cursor goes back to the top
    /// and any newly referenced samples start loading in the background.
    pub fn update_config(&mut self, next: &Value) {
        let config = Arc::new(normalize(next));
        self.shared.cache.set_library(&config);
        *self.shared.config.write() = config.clone();

        let playing = {
            let mut state = self.shared.state.lock();
            if state.is_playing {
                state.step_index = 0;
            }
            state.is_playing
        };
        if playing {
            let shared = self.shared.clone();
            tokio::spawn(async move {
                shared.cache.prepare_all(&config).await;
            });
        }
        debug!(playing, "config updated");
    }

    /// Audition a library sample once, dry and centred. Unknown ids are ignored.
    pub async fn preview_sample(&mut self, sample_id: &str) -> Result<(), EngineError> {
        let sink = self.ensure_output().inspect_err(|e| {
            error!(sample_id, error = %e, "unable to preview sample");
        })?;
        let Some(entry) = self.shared.cache.resolve(sample_id).await else {
            debug!(sample_id, "nothing to preview");
            return Ok(());
        };
        let start_time = sink.now() + PREVIEW_DELAY;
        sink.play(VoiceParams::dry(entry.buffer.clone(), start_time, RELEASE_TAIL));
        Ok(())
    }

    /// Stop, forget every cached sample and release the device. The engine
    /// refuses to start again afterwards.
    pub fn destroy(&mut self) {
        self.stop();
        self.shared.cache.clear();
        if let Some(mut output) = self.output.take() {
            output.close();
        }
        self.destroyed = true;
        info!("audio engine destroyed");
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
