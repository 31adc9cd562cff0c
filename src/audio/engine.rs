use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::Sender;

use super::frame::StereoFrame;
use super::voice::Voice;
use crate::audio_api::AudioCommand;
use crate::shared::{MASTER_GAIN, MAX_VOICES};

const SCRATCH_FRAMES: usize = 512;

// Frames rendered so far. The audio thread bumps it, anyone can read "now".
#[derive(Debug)]
pub struct OutputClock {
    frames: AtomicU64,
    sample_rate: u32,
}

impl OutputClock {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            frames: AtomicU64::new(0),
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    pub fn now(&self) -> f64 {
        self.frames() as f64 / self.sample_rate.max(1) as f64
    }

    fn advance(&self, frames: u64) {
        self.frames.fetch_add(frames, Ordering::AcqRel);
    }
}

// Lives inside the output callback: takes commands, sums voices, moves the clock.
// Built on the control side so the callback itself never allocates. Voices it is
// done with go back over `retired` and are dropped on the other end.
pub struct Mixer {
    clock: Arc<OutputClock>,
    voices: Vec<Voice>, // fixed capacity, see MAX_VOICES
    scratch: Vec<StereoFrame>,
    retired: Sender<Voice>,
    master_gain: f32,
}

impl Mixer {
    pub fn new(clock: Arc<OutputClock>, retired: Sender<Voice>) -> Self {
        Self {
            clock,
            voices: Vec::with_capacity(MAX_VOICES),
            scratch: vec![StereoFrame::zero(); SCRATCH_FRAMES],
            retired,
            master_gain: MASTER_GAIN,
        }
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    pub fn handle_cmd(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::Play(params) => {
                let voice = Voice::new(params, self.clock.sample_rate());
                if self.voices.len() < MAX_VOICES {
                    self.voices.push(voice);
                } else if let Some(slot) = self
                    .voices
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, v)| v.end_frame())
                    .map(|(i, _)| i)
                {
                    // full: steal whichever voice was going to finish first
                    let stolen = std::mem::replace(&mut self.voices[slot], voice);
                    self.retire(stolen);
                }
            }
            AudioCommand::Silence => {
                while let Some(voice) = self.voices.pop() {
                    self.retire(voice);
                }
            }
        }
    }

    // a full or closed queue means the voice is dropped right here after all
    fn retire(&self, voice: Voice) {
        let _ = self.retired.try_send(voice);
    }

    pub fn render_block(&mut self, out: &mut [StereoFrame]) {
        out.fill(StereoFrame::zero());
        let block_start = self.clock.frames();
        let mut i = 0;
        while i < self.voices.len() {
            self.voices[i].render_into(block_start, out, &mut self.scratch);
            if self.voices[i].active {
                i += 1;
            } else {
                let done = self.voices.swap_remove(i);
                self.retire(done);
            }
        }
        for f in out.iter_mut() {
            *f = f.scale(self.master_gain);
        }
        self.clock.advance(out.len() as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SampleBuffer;
    use crate::audio_api::VoiceParams;
    use crossbeam_channel::Receiver;

    fn mixer(clock: Arc<OutputClock>) -> (Mixer, Receiver<Voice>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Mixer::new(clock, tx), rx)
    }

    #[test]
    fn clock_follows_rendered_frames() {
        let clock = Arc::new(OutputClock::new(1000));
        let (mut mixer, _retired) = mixer(clock.clone());
        let mut out = vec![StereoFrame::zero(); 250];
        mixer.render_block(&mut out);
        mixer.render_block(&mut out);
        assert_eq!(clock.frames(), 500);
        assert_eq!(clock.now(), 0.5);
    }

    #[test]
    fn voices_retire_when_done() {
        let clock = Arc::new(OutputClock::new(1000));
        let (mut mixer, retired) = mixer(clock);
        let buffer = Arc::new(SampleBuffer::new(1000, vec![vec![0.5; 10]]));
        mixer.handle_cmd(AudioCommand::Play(VoiceParams::dry(buffer.clone(), 0.0, 0.0)));
        mixer.handle_cmd(AudioCommand::Play(VoiceParams::dry(buffer, 0.1, 0.0)));
        assert_eq!(mixer.active_voices(), 2);

        let mut out = vec![StereoFrame::zero(); 50];
        mixer.render_block(&mut out);
        assert!(out[0].left > 0.0);
        assert_eq!(mixer.active_voices(), 1);
        assert_eq!(retired.len(), 1);

        mixer.handle_cmd(AudioCommand::Silence);
        assert_eq!(mixer.active_voices(), 0);
        let ends: Vec<u64> = retired.try_iter().map(|v| v.end_frame()).collect();
        assert_eq!(ends, vec![10, 110]);
    }

    #[test]
    fn pool_never_grows_past_cap() {
        let (mut mixer, retired) = mixer(Arc::new(OutputClock::new(1000)));
        let buffer = Arc::new(SampleBuffer::new(1000, vec![vec![0.5; 10]]));
        for i in 0..MAX_VOICES + 5 {
            mixer.handle_cmd(AudioCommand::Play(VoiceParams::dry(buffer.clone(), i as f64, 0.0)));
        }
        assert_eq!(mixer.active_voices(), MAX_VOICES);
        // stolen voices go back, earliest finishers first
        let stolen: Vec<u64> = retired.try_iter().map(|v| v.end_frame()).collect();
        assert_eq!(stolen, vec![10, 1010, 2010, 3010, 4010]);
    }

    #[test]
    fn full_retire_queue_still_renders() {
        let (tx, rx) = crossbeam_channel::bounded(0);
        let mut mixer = Mixer::new(Arc::new(OutputClock::new(1000)), tx);
        let buffer = Arc::new(SampleBuffer::new(1000, vec![vec![0.5; 10]]));
        mixer.handle_cmd(AudioCommand::Play(VoiceParams::dry(buffer, 0.0, 0.0)));
        let mut out = vec![StereoFrame::zero(); 20];
        mixer.render_block(&mut out);
        assert!(out[0].left > 0.0);
        assert_eq!(mixer.active_voices(), 0);
        assert!(rx.try_recv().is_err());
    }
}
