// Turns whatever json the caller hands us into a complete AudioConfig.
// Total and pure: bad shapes get defaults, numbers get clamped, nothing errors.

use serde_json::Value;

use super::project::{
    AudioConfig, ModSelector, Modulation, SampleDescriptor, SampleSlot, Step, Track,
};
use crate::shared::{
    DEFAULT_BPM, DEFAULT_LOOP, DEFAULT_SAMPLE_SLOTS, DEFAULT_STEPS_PER_BAR, MAX_SAMPLE_SLOTS,
    MAX_STEPS_PER_BAR,
};

pub fn normalize(input: &Value) -> AudioConfig {
    let bpm = number(input.get("bpm"))
        .filter(|bpm| *bpm > 0.0)
        .unwrap_or(DEFAULT_BPM);
    let swing = number(input.get("swing")).unwrap_or(0.0).clamp(0.0, 100.0);
    let steps_per_bar =
        positive_integer(input.get("stepsPerBar"), MAX_STEPS_PER_BAR).unwrap_or(DEFAULT_STEPS_PER_BAR);
    let looping = input
        .get("loop")
        .and_then(Value::as_bool)
        .unwrap_or(DEFAULT_LOOP);

    let sample_library = array(input.get("sampleLibrary"))
        .iter()
        .enumerate()
        .map(|(i, raw)| normalize_sample(i, raw))
        .collect();

    let tracks = array(input.get("tracks"))
        .iter()
        .enumerate()
        .map(|(i, raw)| normalize_track(i, raw, steps_per_bar))
        .collect();

    AudioConfig {
        bpm,
        swing,
        steps_per_bar,
        looping,
        sample_library,
        tracks,
    }
}

fn normalize_sample(index: usize, raw: &Value) -> SampleDescriptor {
    SampleDescriptor {
        id: string_or(raw.get("id"), || format!("sample-{index}")),
        name: string_or(raw.get("name"), || format!("Sample {}", index + 1)),
        description: string_or(raw.get("description"), String::new),
        category: string_or(raw.get("category"), String::new),
        root_note: string_or(raw.get("rootNote"), String::new),
        file: string_or(raw.get("file"), String::new),
        color: string_or(raw.get("color"), String::new),
    }
}

fn normalize_track(index: usize, raw: &Value, steps_per_bar: u32) -> Track {
    let id = string_or(raw.get("id"), || format!("track-{index}"));
    let max_sample_slots = number(raw.get("maxSampleSlots"))
        .map(|n| n.floor().clamp(1.0, MAX_SAMPLE_SLOTS as f64) as u32)
        .unwrap_or(DEFAULT_SAMPLE_SLOTS);

    // exactly max_sample_slots entries; supplied ids kept by index, extras dropped
    let supplied_slots = array(raw.get("sampleSlots"));
    let sample_slots = (0..max_sample_slots as usize)
        .map(|slot| {
            let supplied = supplied_slots.get(slot);
            SampleSlot {
                id: string_or(supplied.and_then(|s| s.get("id")), || {
                    format!("{id}-slot-{slot}")
                }),
                sample_id: supplied
                    .and_then(|s| s.get("sampleId"))
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            }
        })
        .collect();

    // a longer supplied pattern wins over steps_per_bar (extended patterns survive)
    let supplied_steps = array(raw.get("steps"));
    let step_count = supplied_steps
        .len()
        .max(steps_per_bar as usize)
        .min(MAX_STEPS_PER_BAR as usize);
    let steps = (0..step_count)
        .map(|i| match supplied_steps.get(i) {
            Some(raw_step) => normalize_step(raw_step, max_sample_slots),
            None => Step::default(),
        })
        .collect();

    Track {
        name: string_or(raw.get("name"), || format!("Track {}", index + 1)),
        color: string_or(raw.get("color"), String::new),
        muted: raw.get("muted").and_then(Value::as_bool).unwrap_or(false),
        id,
        max_sample_slots,
        sample_slots,
        steps,
    }
}

fn normalize_step(raw: &Value, max_sample_slots: u32) -> Step {
    let defaults = Step::default();
    let sample_slot = number(raw.get("sampleSlot"))
        .map(|n| n.floor().clamp(0.0, (max_sample_slots - 1) as f64) as u32)
        .unwrap_or(0);

    Step {
        enabled: raw.get("enabled").and_then(Value::as_bool).unwrap_or(false),
        sample_slot,
        pitch: number(raw.get("pitch")).map(|p| p.round() as i32).unwrap_or(0),
        volume: number(raw.get("volume"))
            .unwrap_or(defaults.volume)
            .clamp(0.0, 2.0),
        pan: number(raw.get("pan")).unwrap_or(defaults.pan).clamp(-1.0, 1.0),
        reverse: raw.get("reverse").and_then(Value::as_bool).unwrap_or(false),
        modulation: match raw.get("mod").and_then(Value::as_str) {
            Some(value) => ModSelector::from(value.to_string()),
            None => ModSelector::Kind(Modulation::None),
        },
    }
}

// finite numbers only; numeric strings count, like a form field would send them
fn number(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

// whole numbers >= 1, saturating at max
fn positive_integer(value: Option<&Value>, max: u32) -> Option<u32> {
    let n = number(value)?;
    (n >= 1.0 && n.fract() == 0.0).then(|| n.min(max as f64) as u32)
}

fn array(value: Option<&Value>) -> &[Value] {
    value
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn string_or(value: Option<&Value>, fallback: impl FnOnce() -> String) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => fallback(),
    }
}
