// Per-trigger effect chains.
//
// Every triggered voice gets its own freshly built chain, so there is no
// state shared between two hits of the same step. The topologies and their
// parameters are fixed; the step only picks which one.

use super::effect::{Biquad, Effect, FeedbackDelay, FilterKind, WaveShaper};
use super::frame::StereoFrame;
use crate::pipeline::Modulation;

pub const LPF_CUTOFF: f32 = 1200.0;
pub const LPF_Q: f32 = 0.7;
pub const HPF_CUTOFF: f32 = 1000.0;
pub const HPF_Q: f32 = 0.9;
pub const BITCRUSH_LEVELS: u32 = 1 << 4;
pub const BITCRUSH_CURVE_POINTS: usize = 65536;
pub const BITCRUSH_OVERSAMPLE: usize = 4;

/// Delay-line parameters for the two "summed dry/wet" topologies.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DelayTopology {
    pub dry: f32,
    pub wet: f32,
    pub delay_secs: f64,
    pub feedback: f32,
}

pub const CHORUS: DelayTopology = DelayTopology {
    dry: 0.8,
    wet: 0.4,
    delay_secs: 0.020,
    feedback: 0.2,
};

pub const ECHO: DelayTopology = DelayTopology {
    dry: 0.9,
    wet: 0.5,
    delay_secs: 0.280,
    feedback: 0.35,
};

/// The processing between a voice's source and the output mix.
/// An empty chain is a straight pass-through.
#[derive(Default)]
pub struct EffectChain {
    nodes: Vec<Box<dyn Effect>>,
}

impl EffectChain {
    pub fn passthrough() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// How long the chain keeps sounding after the source stops.
    pub fn tail(&self) -> f64 {
        self.nodes.iter().map(|n| n.tail()).fold(0.0, f64::max)
    }

    pub fn process(&mut self, buf: &mut [StereoFrame]) {
        for node in &mut self.nodes {
            node.process(buf);
        }
    }
}

impl std::fmt::Debug for EffectChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectChain")
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

/// Builds the chain for one trigger. Total over every modulation kind.
pub fn build_chain(modulation: Modulation, sample_rate: f32) -> EffectChain {
    let node: Box<dyn Effect> = match modulation {
        Modulation::None => return EffectChain::passthrough(),
        Modulation::Lpf => Box::new(Biquad::new(
            FilterKind::LowPass,
            LPF_CUTOFF,
            LPF_Q,
            sample_rate,
        )),
        Modulation::Hpf => Box::new(Biquad::new(
            FilterKind::HighPass,
            HPF_CUTOFF,
            HPF_Q,
            sample_rate,
        )),
        Modulation::Bitcrush => Box::new(WaveShaper::new(
            WaveShaper::quantize_curve(BITCRUSH_LEVELS, BITCRUSH_CURVE_POINTS),
            BITCRUSH_OVERSAMPLE,
        )),
        Modulation::Chorus => Box::new(delay_node(CHORUS, sample_rate)),
        Modulation::Delay => Box::new(delay_node(ECHO, sample_rate)),
    };
    EffectChain { nodes: vec![node] }
}

fn delay_node(t: DelayTopology, sample_rate: f32) -> FeedbackDelay {
    FeedbackDelay::new(t.delay_secs, t.feedback, t.dry, t.wet, sample_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(modulation: Modulation, input: &[StereoFrame]) -> Vec<StereoFrame> {
        let mut chain = build_chain(modulation, 48000.0);
        let mut buf = input.to_vec();
        chain.process(&mut buf);
        buf
    }

    #[test]
    fn none_is_passthrough() {
        let chain = build_chain(Modulation::None, 48000.0);
        assert!(chain.is_empty());
        assert_eq!(chain.tail(), 0.0);
        let input: Vec<StereoFrame> = (0..64).map(|i| StereoFrame::mono(i as f32 / 64.0)).collect();
        assert_eq!(run(Modulation::None, &input), input);
    }

    #[test]
    fn every_kind_builds_one_node() {
        for m in Modulation::ALL.into_iter().filter(|m| *m != Modulation::None) {
            assert_eq!(build_chain(m, 44100.0).len(), 1, "{m:?}");
        }
    }

    #[test]
    fn chains_are_independent() {
        let mut first = build_chain(Modulation::Delay, 1000.0);
        let mut buf = vec![StereoFrame::mono(1.0); 10];
        first.process(&mut buf);

        // a second chain built for the same step has no echo of the first hit
        let out = run(Modulation::Delay, &[StereoFrame::zero(); 8]);
        assert!(out.iter().all(|f| *f == StereoFrame::zero()));
    }

    #[test]
    fn bitcrush_quantizes() {
        let input = vec![StereoFrame::mono(0.3); 32];
        let out = run(Modulation::Bitcrush, &input);
        // once the oversampler has settled, the value sits on a 16-level grid
        let v = out.last().unwrap().left;
        let grid = ((v + 1.0) / 2.0 * 15.0).round() / 15.0 * 2.0 - 1.0;
        assert!((v - grid).abs() < 1e-4, "{v} not on grid");
    }

    #[test]
    fn echo_rings_longer_than_chorus() {
        let echo = build_chain(Modulation::Delay, 48000.0).tail();
        let chorus = build_chain(Modulation::Chorus, 48000.0).tail();
        assert!(echo > chorus);
        assert!(chorus >= CHORUS.delay_secs);
    }

    #[test]
    fn chorus_sums_dry_and_wet() {
        let mut input = vec![StereoFrame::zero(); 2000];
        input[0] = StereoFrame::mono(1.0);
        let out = run(Modulation::Chorus, &input);
        assert!((out[0].left - CHORUS.dry).abs() < 1e-6);
        let echo_at = (CHORUS.delay_secs * 48000.0).round() as usize;
        assert!((out[echo_at].left - CHORUS.wet).abs() < 1e-6);
    }
}
