// Step timing. Everything here is plain math on a config snapshot.

use crate::pipeline::AudioConfig;
use crate::shared::MAX_SWING_FRACTION;

// where the scheduler cursor wraps; tracks with longer or shorter step lists
// wrap on their own
pub fn cycle_length(config: &AudioConfig) -> usize {
    config.steps_per_bar.max(1) as usize
}

pub fn swing_fraction(swing: f64) -> f64 {
    (swing / 100.0).clamp(0.0, MAX_SWING_FRACTION)
}

// seconds per step before swing; a bar is four beats
pub fn base_step_duration(bpm: f64, steps_per_bar: u32) -> f64 {
    let steps_per_beat = (steps_per_bar as f64 / 4.0).max(1.0);
    (60.0 / bpm) / steps_per_beat
}

// odd steps (by absolute index) get longer, even ones shorter
pub fn step_duration(config: &AudioConfig, step_index: usize) -> f64 {
    let base = base_step_duration(config.bpm, config.steps_per_bar);
    let fraction = swing_fraction(config.swing);
    if step_index % 2 == 1 {
        base * (1.0 + fraction)
    } else {
        base * (1.0 - fraction)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Advance {
    Next(usize),
    Finish, // non-looping pattern ran off the end
}

pub fn advance(step_index: usize, cycle: usize, looping: bool) -> Advance {
    let next = step_index + 1;
    if looping {
        Advance::Next(next % cycle.max(1))
    } else if next >= cycle {
        Advance::Finish
    } else {
        Advance::Next(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::normalize;
    use serde_json::json;

    fn config(bpm: f64, steps_per_bar: u32, swing: f64) -> AudioConfig {
        normalize(&json!({ "bpm": bpm, "stepsPerBar": steps_per_bar, "swing": swing }))
    }

    #[test]
    fn straight_eighths_at_120() {
        let c = config(120.0, 8, 0.0);
        for i in 0..8 {
            assert!((step_duration(&c, i) - 0.25).abs() < 1e-12);
        }
    }

    #[test]
    fn swing_lengthens_odd_steps() {
        for swing in [0.0, 10.0, 33.0, 45.0, 60.0, 100.0] {
            for (bpm, spb) in [(120.0, 8), (87.0, 16), (200.0, 3), (60.0, 1)] {
                let c = config(bpm, spb, swing);
                let base = base_step_duration(bpm, spb);
                let f = (swing / 100.0_f64).clamp(0.0, 0.45);
                assert!((step_duration(&c, 0) - base * (1.0 - f)).abs() < 1e-12);
                assert!((step_duration(&c, 1) - base * (1.0 + f)).abs() < 1e-12);
                assert!((step_duration(&c, 6) - base * (1.0 - f)).abs() < 1e-12);
                assert!((step_duration(&c, 7) - base * (1.0 + f)).abs() < 1e-12);
            }
        }
        assert_eq!(swing_fraction(80.0), 0.45);
    }

    #[test]
    fn short_bars_use_one_step_per_beat() {
        assert_eq!(base_step_duration(120.0, 2), 0.5);
        assert_eq!(base_step_duration(120.0, 4), 0.5);
        assert_eq!(base_step_duration(120.0, 16), 0.125);
    }

    #[test]
    fn cursor_wraps_or_finishes() {
        let seq: Vec<usize> = std::iter::successors(Some(0), |&i| match advance(i, 4, true) {
            Advance::Next(n) => Some(n),
            Advance::Finish => None,
        })
        .take(6)
        .collect();
        assert_eq!(seq, vec![0, 1, 2, 3, 0, 1]);

        assert_eq!(advance(2, 4, false), Advance::Next(3));
        assert_eq!(advance(3, 4, false), Advance::Finish);
        assert_eq!(advance(0, 1, false), Advance::Finish);
        assert_eq!(advance(0, 1, true), Advance::Next(0));
    }

    #[test]
    fn cycle_ignores_track_lengths() {
        let c = normalize(&json!({
            "stepsPerBar": 4,
            "tracks": [{ "steps": (0..12).map(|_| json!({})).collect::<Vec<_>>() }]
        }));
        assert_eq!(cycle_length(&c), 4);
    }
}
