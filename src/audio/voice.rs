use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;

use super::chain::EffectChain;
use super::frame::StereoFrame;
use super::sample_buffer::SampleBuffer;
use crate::audio_api::VoiceParams;

// One triggered sample. Knows when it starts and when it's done, and just
// goes inactive after that; nobody tracks or cancels voices individually.
pub struct Voice {
    buffer: Arc<SampleBuffer>,
    chain: EffectChain,
    pos: f64,       // read position in source frames
    increment: f64, // source frames per output frame
    gain: f32,
    pan: f32,
    start_frame: u64,
    source_end_frame: u64,
    end_frame: u64, // source end plus whatever the chain rings for
    pub active: bool,
}

impl Voice {
    pub fn new(params: VoiceParams, output_rate: u32) -> Self {
        let out_rate = output_rate.max(1) as f64;
        let to_frame = |t: f64| (t.max(0.0) * out_rate).round() as u64;
        let start_frame = to_frame(params.start_time);
        let source_end_frame = to_frame(params.stop_time).max(start_frame);
        let end_frame = source_end_frame + to_frame(params.chain.tail());

        let increment = params.rate.max(0.0) * params.buffer.sample_rate as f64 / out_rate;

        Self {
            buffer: params.buffer,
            chain: params.chain,
            pos: 0.0,
            increment,
            gain: params.gain,
            pan: params.pan.clamp(-1.0, 1.0),
            start_frame,
            source_end_frame,
            end_frame,
            active: true,
        }
    }

    pub fn end_frame(&self) -> u64 {
        self.end_frame
    }

    // mix this voice into `out`, whose first frame sits at `block_start` on the output clock.
    // `scratch` is working space owned by the caller; any length above zero works.
    pub fn render_into(&mut self, block_start: u64, out: &mut [StereoFrame], scratch: &mut [StereoFrame]) {
        if !self.active || scratch.is_empty() {
            return;
        }
        let block_end = block_start + out.len() as u64;
        if block_end <= self.start_frame {
            return; // not yet
        }
        if block_start >= self.end_frame {
            self.active = false;
            return;
        }

        let first = self.start_frame.saturating_sub(block_start) as usize;
        let last = (self.end_frame.min(block_end) - block_start) as usize;

        let mut offset = first;
        while offset < last {
            let n = (last - offset).min(scratch.len());
            let chunk = &mut scratch[..n];
            self.read_source(block_start + offset as u64, chunk);
            self.chain.process(chunk);
            for (o, s) in out[offset..offset + n].iter_mut().zip(chunk.iter()) {
                *o = o.add(self.place(*s));
            }
            offset += n;
        }

        if block_end >= self.end_frame {
            self.active = false;
        }
    }

    // fill `dst` with source audio, silence once the source has stopped
    fn read_source(&mut self, clock: u64, dst: &mut [StereoFrame]) {
        let len = self.buffer.len();
        for (i, frame) in dst.iter_mut().enumerate() {
            let frame_clock = clock + i as u64;
            if frame_clock >= self.source_end_frame || self.pos >= len as f64 {
                *frame = StereoFrame::zero();
                continue;
            }
            let idx = self.pos as usize;
            let frac = (self.pos - idx as f64) as f32;
            let s0 = self.buffer.frame(idx);
            let s1 = if idx + 1 < len { self.buffer.frame(idx + 1) } else { s0 };
            *frame = s0.lerp(s1, frac);
            self.pos += self.increment;
        }
    }

    // volume, then an equal-power stereo pan
    fn place(&self, s: StereoFrame) -> StereoFrame {
        let s = s.scale(self.gain);
        if self.buffer.channel_count() <= 1 {
            let x = (self.pan + 1.0) / 2.0 * FRAC_PI_2;
            return StereoFrame {
                left: s.left * x.cos(),
                right: s.left * x.sin(),
            };
        }
        if self.pan <= 0.0 {
            let x = (self.pan + 1.0) * FRAC_PI_2;
            StereoFrame {
                left: s.left + s.right * x.cos(),
                right: s.right * x.sin(),
            }
        } else {
            let x = self.pan * FRAC_PI_2;
            StereoFrame {
                left: s.left * x.cos(),
                right: s.right + s.left * x.sin(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::chain::build_chain;
    use crate::pipeline::Modulation;

    fn params(buffer: SampleBuffer, start_time: f64) -> VoiceParams {
        VoiceParams::dry(Arc::new(buffer), start_time, 0.0)
    }

    fn render(voice: &mut Voice, block_start: u64, out: &mut [StereoFrame]) {
        let mut scratch = vec![StereoFrame::zero(); 512];
        voice.render_into(block_start, out, &mut scratch);
    }

    fn ramp(len: usize) -> SampleBuffer {
        SampleBuffer::new(1000, vec![(0..len).map(|i| i as f32 / len as f32).collect()])
    }

    #[test]
    fn starts_on_its_frame_and_self_terminates() {
        let mut voice = Voice::new(params(SampleBuffer::new(1000, vec![vec![1.0; 4]]), 0.005), 1000);
        let mut out = vec![StereoFrame::zero(); 16];
        render(&mut voice, 0, &mut out);
        assert_eq!(out[4], StereoFrame::zero());
        assert!(out[5].left > 0.0);
        assert!(out[8].left > 0.0);
        assert_eq!(out[9], StereoFrame::zero());
        assert!(!voice.active);
    }

    #[test]
    fn waits_for_a_later_block() {
        let mut voice = Voice::new(params(ramp(8), 1.0), 1000);
        let mut out = vec![StereoFrame::zero(); 64];
        render(&mut voice, 0, &mut out);
        assert!(out.iter().all(|f| *f == StereoFrame::zero()));
        assert!(voice.active);
        render(&mut voice, 1000, &mut out);
        assert!(out[1].left > 0.0);
    }

    #[test]
    fn rate_doubles_read_speed() {
        let mut p = params(ramp(8), 0.0);
        p.rate = 2.0;
        p.stop_time = 0.004;
        let mut voice = Voice::new(p, 1000);
        let mut out = vec![StereoFrame::zero(); 16];
        render(&mut voice, 0, &mut out);
        // centre pan on a mono source is cos(pi/4) per side
        let g = (FRAC_PI_2 / 2.0).cos();
        assert!((out[1].left - 2.0 / 8.0 * g).abs() < 1e-6);
        assert!((out[3].left - 6.0 / 8.0 * g).abs() < 1e-6);
        assert_eq!(out[4], StereoFrame::zero());
    }

    #[test]
    fn hard_pan_mono() {
        let mut p = params(SampleBuffer::new(1000, vec![vec![1.0; 4]]), 0.0);
        p.pan = 1.0;
        let mut voice = Voice::new(p, 1000);
        let mut out = vec![StereoFrame::zero(); 4];
        render(&mut voice, 0, &mut out);
        assert!(out[0].left.abs() < 1e-6);
        assert!((out[0].right - 1.0).abs() < 1e-6);
    }

    #[test]
    fn small_scratch_renders_the_same() {
        let make = || {
            let mut p = params(ramp(40), 0.003);
            p.rate = 0.75;
            p.pan = -0.3;
            p.chain = build_chain(Modulation::Lpf, 1000.0);
            Voice::new(p, 1000)
        };
        let mut wide = vec![StereoFrame::zero(); 64];
        render(&mut make(), 0, &mut wide);

        let mut narrow = vec![StereoFrame::zero(); 64];
        let mut scratch = vec![StereoFrame::zero(); 3];
        make().render_into(0, &mut narrow, &mut scratch);
        assert_eq!(wide, narrow);
        assert!(wide[10].left > 0.0);
    }

    #[test]
    fn empty_scratch_renders_nothing() {
        let mut voice = Voice::new(params(ramp(8), 0.0), 1000);
        let mut out = vec![StereoFrame::zero(); 8];
        voice.render_into(0, &mut out, &mut []);
        assert!(out.iter().all(|f| *f == StereoFrame::zero()));
        assert!(voice.active);
    }

    #[test]
    fn chain_tail_outlives_source() {
        let mut p = params(SampleBuffer::new(1000, vec![vec![1.0; 2]]), 0.0);
        p.chain = build_chain(Modulation::Delay, 1000.0);
        let voice = Voice::new(p, 1000);
        assert!(voice.end_frame() > 280);
    }
}
