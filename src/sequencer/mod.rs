pub mod timing;

use crate::pipeline::{AudioConfig, Step};

pub use timing::{Advance, advance, base_step_duration, cycle_length, step_duration, swing_fraction};

// one enabled step on one track that should sound this tick
#[derive(Clone, Debug, PartialEq)]
pub struct Trigger {
    pub track_index: usize,
    pub step: Step,
}

// what a single tick at `step_index` does: who fires, how long it lasts, where the cursor goes
#[derive(Clone, Debug, PartialEq)]
pub struct Tick {
    pub step_index: usize,
    pub triggers: Vec<Trigger>,
    pub duration: f64,
    pub advance: Advance,
}

pub fn plan_tick(config: &AudioConfig, step_index: usize) -> Tick {
    let triggers = config
        .tracks
        .iter()
        .enumerate()
        .filter(|(_, track)| !track.muted && !track.steps.is_empty())
        .filter_map(|(track_index, track)| {
            let step = &track.steps[step_index % track.steps.len()];
            step.enabled.then(|| Trigger {
                track_index,
                step: step.clone(),
            })
        })
        .collect();

    Tick {
        step_index,
        triggers,
        duration: step_duration(config, step_index),
        advance: advance(step_index, cycle_length(config), config.looping),
    }
}
