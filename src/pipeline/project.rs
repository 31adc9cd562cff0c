// the audio config data model; everything the sequencer reads on a tick lives here.
// built by normalize.rs, never mutated while a tick reads it (the engine swaps whole snapshots).

use serde::{Deserialize, Serialize};

use crate::shared::{DEFAULT_PATTERN_BLOCK, MAX_STEPS_PER_BAR};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioConfig {
    pub bpm: f64,
    pub swing: f64,       // percent, 0-100
    pub steps_per_bar: u32,
    #[serde(rename = "loop")]
    pub looping: bool,
    pub sample_library: Vec<SampleDescriptor>,
    pub tracks: Vec<Track>,
}

impl AudioConfig {
    pub fn sample(&self, id: &str) -> Option<&SampleDescriptor> {
        self.sample_library.iter().find(|s| s.id == id)
    }

    // distinct sample ids referenced by any track slot, in first-seen order
    pub fn referenced_sample_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for track in &self.tracks {
            for slot in &track.sample_slots {
                if let Some(id) = &slot.sample_id {
                    if !ids.contains(id) {
                        ids.push(id.clone());
                    }
                }
            }
        }
        ids
    }

    // "+8 steps": grow the bar and give every track empty steps to match
    pub fn extend_pattern(&mut self, block: u32) {
        let increment = block.max(1).min(MAX_STEPS_PER_BAR.saturating_sub(self.steps_per_bar));
        if self.tracks.is_empty() || increment == 0 {
            return;
        }
        self.steps_per_bar += increment;
        for track in &mut self.tracks {
            track
                .steps
                .extend(std::iter::repeat_n(Step::default(), increment as usize));
        }
    }

    pub fn extend_pattern_default(&mut self) {
        self.extend_pattern(DEFAULT_PATTERN_BLOCK);
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleDescriptor {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub root_note: String,
    pub file: String, // uri, local path or http(s)
    pub color: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub name: String,
    pub color: String,
    pub max_sample_slots: u32,
    pub sample_slots: Vec<SampleSlot>, // always exactly max_sample_slots long
    pub steps: Vec<Step>,
    pub muted: bool,
}

impl Track {
    pub fn slot_sample_id(&self, slot: usize) -> Option<&str> {
        self.sample_slots.get(slot)?.sample_id.as_deref()
    }

    // enabling a step points it at the first slot that actually has a sample
    pub fn toggle_step(&mut self, index: usize) {
        let default_slot = self
            .sample_slots
            .iter()
            .position(|slot| slot.sample_id.is_some());
        let Some(step) = self.steps.get_mut(index) else {
            return;
        };
        step.enabled = !step.enabled;
        if step.enabled {
            if let Some(slot) = default_slot {
                step.sample_slot = slot as u32;
            }
        }
    }

    pub fn slot_label(&self, config: &AudioConfig, slot: usize) -> String {
        let Some(entry) = self.sample_slots.get(slot) else {
            return format!("Slot {}", slot + 1);
        };
        match entry.sample_id.as_deref().and_then(|id| config.sample(id)) {
            Some(sample) => format!("Slot {}: {}", slot + 1, sample.name),
            None => format!("Slot {}: Empty", slot + 1),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleSlot {
    pub id: String,
    pub sample_id: Option<String>, // None = empty slot
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub enabled: bool,
    pub sample_slot: u32,
    pub pitch: i32,  // semitones
    pub volume: f64, // 0-2
    pub pan: f64,    // -1..1
    pub reverse: bool,
    #[serde(rename = "mod")]
    pub modulation: ModSelector,
}

impl Default for Step {
    fn default() -> Self {
        Self {
            enabled: false,
            sample_slot: 0,
            pitch: 0,
            volume: 1.0,
            pan: 0.0,
            reverse: false,
            modulation: ModSelector::Kind(Modulation::None),
        }
    }
}

// The six effect topologies a step can ask for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Modulation {
    #[default]
    None,
    Lpf,
    Hpf,
    Bitcrush,
    Chorus,
    Delay,
}

impl Modulation {
    pub const ALL: [Modulation; 6] = [
        Modulation::None,
        Modulation::Lpf,
        Modulation::Hpf,
        Modulation::Bitcrush,
        Modulation::Chorus,
        Modulation::Delay,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Modulation::None => "none",
            Modulation::Lpf => "lpf",
            Modulation::Hpf => "hpf",
            Modulation::Bitcrush => "bitcrush",
            Modulation::Chorus => "chorus",
            Modulation::Delay => "delay",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == value)
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|m| *m == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

/// The raw `mod` field of a step. Values outside the known set are kept
/// verbatim so a config survives a round trip, and play dry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ModSelector {
    Kind(Modulation),
    Unrecognized(String),
}

impl ModSelector {
    pub fn modulation(&self) -> Modulation {
        match self {
            ModSelector::Kind(m) => *m,
            ModSelector::Unrecognized(_) => Modulation::None,
        }
    }
}

impl From<Modulation> for ModSelector {
    fn from(value: Modulation) -> Self {
        ModSelector::Kind(value)
    }
}

impl From<String> for ModSelector {
    fn from(value: String) -> Self {
        match Modulation::parse(&value) {
            Some(m) => ModSelector::Kind(m),
            None => ModSelector::Unrecognized(value),
        }
    }
}

impl From<ModSelector> for String {
    fn from(value: ModSelector) -> Self {
        match value {
            ModSelector::Kind(m) => m.as_str().to_string(),
            ModSelector::Unrecognized(raw) => raw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::normalize::normalize;
    use serde_json::json;

    fn two_track_config() -> AudioConfig {
        normalize(&json!({
            "stepsPerBar": 4,
            "sampleLibrary": [{ "id": "kick", "name": "Kick", "file": "kick.wav" }],
            "tracks": [
                { "maxSampleSlots": 2, "sampleSlots": [{}, { "sampleId": "kick" }] },
                { "maxSampleSlots": 1, "sampleSlots": [{ "sampleId": "kick" }] }
            ]
        }))
    }

    #[test]
    fn extend_pattern_grows_every_track() {
        let mut config = two_track_config();
        config.extend_pattern_default();
        assert_eq!(config.steps_per_bar, 12);
        assert!(config.tracks.iter().all(|t| t.steps.len() == 12));
        assert!(config.tracks[0].steps[11] == Step::default());

        config.extend_pattern(0);
        assert_eq!(config.steps_per_bar, 13);
    }

    #[test]
    fn extend_pattern_stops_at_the_cap() {
        let mut config = two_track_config();
        config.steps_per_bar = MAX_STEPS_PER_BAR - 3;
        config.extend_pattern(8);
        assert_eq!(config.steps_per_bar, MAX_STEPS_PER_BAR);
        assert_eq!(config.tracks[0].steps.len(), 4 + 3);
        config.extend_pattern(8);
        assert_eq!(config.steps_per_bar, MAX_STEPS_PER_BAR);
        assert_eq!(config.tracks[0].steps.len(), 7);
    }

    #[test]
    fn extend_pattern_without_tracks_is_noop() {
        let mut config = normalize(&json!({ "stepsPerBar": 4 }));
        config.extend_pattern(8);
        assert_eq!(config.steps_per_bar, 4);
    }

    #[test]
    fn toggle_step_picks_first_assigned_slot() {
        let mut config = two_track_config();
        let track = &mut config.tracks[0];
        track.toggle_step(2);
        assert!(track.steps[2].enabled);
        assert_eq!(track.steps[2].sample_slot, 1);
        track.toggle_step(2);
        assert!(!track.steps[2].enabled);
        track.toggle_step(99);
    }

    #[test]
    fn slot_labels() {
        let config = two_track_config();
        let track = &config.tracks[0];
        assert_eq!(track.slot_label(&config, 0), "Slot 1: Empty");
        assert_eq!(track.slot_label(&config, 1), "Slot 2: Kick");
        assert_eq!(track.slot_label(&config, 5), "Slot 6");
    }

    #[test]
    fn referenced_ids_are_distinct() {
        assert_eq!(two_track_config().referenced_sample_ids(), vec!["kick"]);
    }

    #[test]
    fn mod_selector_keeps_unknown_values() {
        let step: Step = serde_json::from_value(json!({
            "enabled": true, "sampleSlot": 0, "pitch": 0, "volume": 1.0,
            "pan": 0.0, "reverse": false, "mod": "wobble"
        }))
        .unwrap();
        assert_eq!(step.modulation, ModSelector::Unrecognized("wobble".into()));
        assert_eq!(step.modulation.modulation(), Modulation::None);
        assert_eq!(serde_json::to_value(&step).unwrap()["mod"], "wobble");
    }
}
