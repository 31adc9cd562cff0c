// The layer between the TUI and the engine. Owns the config document and the
// selection, turns input events into config edits, and hands every edit to the
// engine as a fresh config. The TUI only renders what display_state() says.

use std::path::PathBuf;

use serde_json::{Value, json};
use tracing::{info, warn};

use trackerbox::pipeline::persistence::{audio_section, deep_merge, save_document};
use trackerbox::pipeline::AudioConfig;
use trackerbox::playback::PlaybackEngine;
use trackerbox::shared::{InputEvent, UI_MAX_BPM, UI_MIN_BPM, UI_PITCH_RANGE};

#[derive(Clone, Debug)]
pub struct DisplayState {
    pub title: String,
    pub config: AudioConfig,
    pub playing: bool,
    pub selected_track: usize,
    pub selected_step: usize,
    pub status: String,
}

pub struct Middle {
    doc: Value,
    engine: PlaybackEngine,
    config_path: PathBuf,
    selected_track: usize,
    selected_step: usize,
    status: String,
}

impl Middle {
    pub fn new(doc: Value, engine: PlaybackEngine, config_path: PathBuf) -> Self {
        Self {
            doc,
            engine,
            config_path,
            selected_track: 0,
            selected_step: 0,
            status: String::from("space: play/stop  q: quit"),
        }
    }

    pub fn display_state(&self) -> DisplayState {
        DisplayState {
            title: self
                .doc
                .get("groupName")
                .and_then(Value::as_str)
                .unwrap_or("Trackerbox")
                .to_string(),
            config: (*self.engine.config()).clone(),
            playing: self.engine.get_state().is_playing,
            selected_track: self.selected_track,
            selected_step: self.selected_step,
            status: self.status.clone(),
        }
    }

    // returns false once the user asked to quit
    pub async fn handle_input(&mut self, event: InputEvent) -> bool {
        match event {
            InputEvent::Quit => return false,
            InputEvent::TogglePlay => {
                // a failed start leaves the engine idle; just say why
                if let Err(e) = self.engine.toggle().await {
                    warn!(error = %e, "audio toggle failed");
                    self.status = format!("audio: {e}");
                }
            }
            InputEvent::Preview(index) => {
                let id = self
                    .engine
                    .config()
                    .sample_library
                    .get(index)
                    .map(|s| s.id.clone());
                if let Some(id) = id {
                    if let Err(e) = self.engine.preview_sample(&id).await {
                        self.status = format!("preview: {e}");
                    }
                }
            }
            InputEvent::MoveCursor { tracks, steps } => self.move_cursor(tracks, steps),
            InputEvent::Save => match save_document(&self.config_path, &self.doc) {
                Ok(()) => {
                    info!(path = %self.config_path.display(), "config saved");
                    self.status = format!("saved {}", self.config_path.display());
                }
                Err(e) => self.status = format!("save failed: {e}"),
            },
            edit => {
                let mut config = (*self.engine.config()).clone();
                if apply_edit(&mut config, &edit, self.selected_track, self.selected_step) {
                    self.commit(&config);
                }
            }
        }
        true
    }

    pub fn shutdown(&mut self) {
        self.engine.destroy();
    }

    fn move_cursor(&mut self, tracks: i32, steps: i32) {
        let config = self.engine.config();
        if config.tracks.is_empty() {
            return;
        }
        let track_count = config.tracks.len() as i32;
        self.selected_track = (self.selected_track as i32 + tracks).rem_euclid(track_count) as usize;
        let step_count = config.tracks[self.selected_track].steps.len().max(1) as i32;
        self.selected_step = (self.selected_step as i32 + steps).rem_euclid(step_count) as usize;
    }

    // edits go through the same door as any other partial update: merged into
    // the document, then the whole audio section is handed to the engine
    fn commit(&mut self, config: &AudioConfig) {
        let audio = match serde_json::to_value(config) {
            Ok(audio) => audio,
            Err(e) => {
                warn!(error = %e, "could not serialize config edit");
                return;
            }
        };
        if self.doc.get("audio").is_some_and(Value::is_object) {
            deep_merge(&mut self.doc, &json!({ "audio": audio }));
        } else {
            deep_merge(&mut self.doc, &audio);
        }
        let next = audio_section(&self.doc).clone();
        self.engine.update_config(&next);
        self.move_cursor(0, 0);
    }
}

// Apply one editing event to the selected track/step. False when nothing changed.
pub fn apply_edit(config: &mut AudioConfig, event: &InputEvent, track: usize, step: usize) -> bool {
    match event {
        InputEvent::AdjustBpm(delta) => {
            config.bpm = (config.bpm.round() + delta).clamp(UI_MIN_BPM, UI_MAX_BPM);
        }
        InputEvent::AdjustSwing(delta) => config.swing = (config.swing + delta).clamp(0.0, 100.0),
        InputEvent::ToggleLoop => config.looping = !config.looping,
        InputEvent::ExtendPattern => config.extend_pattern_default(),
        InputEvent::ToggleMute => {
            let Some(t) = config.tracks.get_mut(track) else {
                return false;
            };
            t.muted = !t.muted;
        }
        InputEvent::ToggleStep => {
            let Some(t) = config.tracks.get_mut(track) else {
                return false;
            };
            t.toggle_step(step);
        }
        _ => {
            let Some(t) = config.tracks.get_mut(track) else {
                return false;
            };
            let slots = t.sample_slots.len().max(1) as u32;
            let Some(s) = t.steps.get_mut(step) else {
                return false;
            };
            match event {
                InputEvent::AdjustPitch(delta) => {
                    s.pitch = (s.pitch + delta).clamp(-UI_PITCH_RANGE, UI_PITCH_RANGE);
                }
                InputEvent::AdjustVolume(delta) => s.volume = (s.volume + delta).clamp(0.0, 2.0),
                InputEvent::AdjustPan(delta) => s.pan = (s.pan + delta).clamp(-1.0, 1.0),
                InputEvent::ToggleReverse => s.reverse = !s.reverse,
                InputEvent::CycleMod => s.modulation = s.modulation.modulation().next().into(),
                InputEvent::CycleSlot => s.sample_slot = (s.sample_slot + 1) % slots,
                _ => return false,
            }
        }
    }
    true
}
