use std::f32::consts::PI;

use super::frame::StereoFrame;

// Effects run inside the audio callback, so all allocation happens in `new`.
pub trait Effect: Send {
    fn process(&mut self, buf: &mut [StereoFrame]);

    // seconds the effect keeps ringing after its input goes silent
    fn tail(&self) -> f64 {
        0.0
    }
}

// biquad

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterKind {
    LowPass,
    HighPass,
}

#[derive(Clone, Copy, Debug, Default)]
struct BiquadState {
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

pub struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    left: BiquadState,
    right: BiquadState,
}

impl Biquad {
    pub fn new(kind: FilterKind, cutoff: f32, q: f32, sample_rate: f32) -> Self {
        let cutoff = cutoff.clamp(10.0, sample_rate * 0.49);
        let omega = 2.0 * PI * cutoff / sample_rate;
        let (sin_omega, cos_omega) = omega.sin_cos();
        let alpha = sin_omega / (2.0 * q.max(0.0001));

        let (b0, b1, b2) = match kind {
            FilterKind::LowPass => (
                (1.0 - cos_omega) / 2.0,
                1.0 - cos_omega,
                (1.0 - cos_omega) / 2.0,
            ),
            FilterKind::HighPass => (
                (1.0 + cos_omega) / 2.0,
                -(1.0 + cos_omega),
                (1.0 + cos_omega) / 2.0,
            ),
        };
        let a0 = 1.0 + alpha;

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: (-2.0 * cos_omega) / a0,
            a2: (1.0 - alpha) / a0,
            left: BiquadState::default(),
            right: BiquadState::default(),
        }
    }

    #[inline]
    fn run(&self, s: &mut BiquadState, input: f32) -> f32 {
        let out = self.b0 * input + self.b1 * s.x1 + self.b2 * s.x2 - self.a1 * s.y1 - self.a2 * s.y2;
        s.x2 = s.x1;
        s.x1 = input;
        s.y2 = s.y1;
        s.y1 = out;
        out
    }
}

impl Effect for Biquad {
    fn process(&mut self, buf: &mut [StereoFrame]) {
        let mut left = self.left;
        let mut right = self.right;
        for f in buf.iter_mut() {
            f.left = self.run(&mut left, f.left);
            f.right = self.run(&mut right, f.right);
        }
        self.left = left;
        self.right = right;
    }
}

// waveshaper: a transfer curve over [-1, 1], looked up with linear interpolation

pub struct WaveShaper {
    curve: Vec<f32>,
    oversample: usize,
    prev: StereoFrame,
}

impl WaveShaper {
    pub fn new(curve: Vec<f32>, oversample: usize) -> Self {
        Self {
            curve,
            oversample: oversample.max(1),
            prev: StereoFrame::zero(),
        }
    }

    // a staircase with `levels` flat steps across the whole input range
    pub fn quantize_curve(levels: u32, points: usize) -> Vec<f32> {
        let steps = (levels.max(2) - 1) as f32;
        let last = (points.max(2) - 1) as f32;
        (0..points.max(2))
            .map(|i| {
                let x = i as f32 * 2.0 / last - 1.0;
                ((x + 1.0) / 2.0 * steps).round() / steps * 2.0 - 1.0
            })
            .collect()
    }

    pub fn shape(&self, x: f32) -> f32 {
        let n = self.curve.len();
        if n == 0 {
            return x;
        }
        let v = (n - 1) as f32 * (x + 1.0) / 2.0;
        if v <= 0.0 {
            return self.curve[0];
        }
        if v >= (n - 1) as f32 {
            return self.curve[n - 1];
        }
        let k = v as usize;
        let frac = v - k as f32;
        self.curve[k] * (1.0 - frac) + self.curve[k + 1] * frac
    }
}

impl Effect for WaveShaper {
    fn process(&mut self, buf: &mut [StereoFrame]) {
        // upsample by linear interpolation, shape, then average back down
        let os = self.oversample as f32;
        for f in buf.iter_mut() {
            let input = *f;
            let mut acc = StereoFrame::zero();
            for k in 1..=self.oversample {
                let x = self.prev.lerp(input, k as f32 / os);
                acc.left += self.shape(x.left);
                acc.right += self.shape(x.right);
            }
            self.prev = input;
            *f = acc.scale(1.0 / os);
        }
    }
}

// dry/wet split around a feedback delay line, summed back together

pub struct FeedbackDelay {
    dry: f32,
    wet: f32,
    feedback: f32,
    delay_secs: f64,
    line: Vec<StereoFrame>,
    pos: usize,
}

impl FeedbackDelay {
    pub fn new(delay_secs: f64, feedback: f32, dry: f32, wet: f32, sample_rate: f32) -> Self {
        let frames = ((delay_secs * sample_rate as f64).round() as usize).max(1);
        Self {
            dry,
            wet,
            feedback: feedback.clamp(0.0, 0.98),
            delay_secs,
            line: vec![StereoFrame::zero(); frames],
            pos: 0,
        }
    }
}

impl Effect for FeedbackDelay {
    fn process(&mut self, buf: &mut [StereoFrame]) {
        for f in buf.iter_mut() {
            let delayed = self.line[self.pos];
            self.line[self.pos] = f.add(delayed.scale(self.feedback));
            self.pos = (self.pos + 1) % self.line.len();
            *f = f.scale(self.dry).add(delayed.scale(self.wet));
        }
    }

    fn tail(&self) -> f64 {
        if self.feedback <= 0.0 {
            return self.delay_secs;
        }
        // repeats until the echo is ~60dB down
        let repeats = (1e-3f64).ln() / (self.feedback as f64).ln();
        self.delay_secs * (repeats.ceil() + 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn impulse(len: usize) -> Vec<StereoFrame> {
        let mut buf = vec![StereoFrame::zero(); len];
        buf[0] = StereoFrame::mono(1.0);
        buf
    }

    #[test]
    fn lowpass_passes_dc_and_highpass_blocks_it() {
        let mut lp = Biquad::new(FilterKind::LowPass, 1200.0, 0.7, 48000.0);
        let mut hp = Biquad::new(FilterKind::HighPass, 1000.0, 0.9, 48000.0);
        let mut a = vec![StereoFrame::mono(0.5); 4800];
        let mut b = a.clone();
        lp.process(&mut a);
        hp.process(&mut b);
        let last_lp = a.last().unwrap().left;
        let last_hp = b.last().unwrap().left;
        assert!((last_lp - 0.5).abs() < 1e-3, "lowpass settled at {last_lp}");
        assert!(last_hp.abs() < 1e-3, "highpass settled at {last_hp}");
    }

    #[test]
    fn quantize_curve_has_sixteen_levels() {
        let curve = WaveShaper::quantize_curve(16, 65536);
        assert_eq!(curve.len(), 65536);
        assert_eq!(curve[0], -1.0);
        assert_eq!(curve[65535], 1.0);
        let mut levels: Vec<i32> = curve.iter().map(|v| (v * 1000.0).round() as i32).collect();
        levels.dedup();
        assert_eq!(levels.len(), 16);
    }

    #[test]
    fn waveshaper_clamps_out_of_range_input() {
        let shaper = WaveShaper::new(WaveShaper::quantize_curve(16, 65536), 4);
        assert_eq!(shaper.shape(-4.0), -1.0);
        assert_eq!(shaper.shape(4.0), 1.0);
        assert!((shaper.shape(0.999) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn delay_echoes_after_delay_time() {
        // 10 frames of delay at 1kHz
        let mut delay = FeedbackDelay::new(0.01, 0.5, 0.9, 0.5, 1000.0);
        let mut buf = impulse(25);
        delay.process(&mut buf);
        assert!((buf[0].left - 0.9).abs() < 1e-6);
        assert!((buf[10].left - 0.5).abs() < 1e-6);
        assert!((buf[20].left - 0.25).abs() < 1e-6);
        assert_eq!(buf[5].left, 0.0);
        assert!(delay.tail() > 0.01);
    }
}
