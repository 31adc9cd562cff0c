// Constants and the small types the TUI and the engine both talk in.
//
// Keys (see tui/input.rs):
//   Space             //  TogglePlay
//   arrows / hjkl     //  MoveCursor
//   Enter             //  ToggleStep (selected track + step)
//   m                 //  ToggleMute (selected track)
//   [ / ]             //  AdjustPitch(-1 / +1)
//   - / =             //  AdjustVolume(-0.1 / +0.1)
//   , / .             //  AdjustPan(-0.1 / +0.1)
//   r                 //  ToggleReverse
//   f                 //  CycleMod
//   s                 //  CycleSlot
//   < / >             //  AdjustBpm(-1 / +1)
//   { / }             //  AdjustSwing(-5 / +5)
//   o                 //  ToggleLoop
//   e                 //  ExtendPattern (+8 steps)
//   1..9              //  Preview(n) from the sample library
//   w                 //  Save
//   Esc / q           //  Quit
//   ?                 //  help overlay (tui only)

// config defaults, used by the normalizer
pub const DEFAULT_BPM: f64 = 120.0;
pub const DEFAULT_STEPS_PER_BAR: u32 = 8;
pub const DEFAULT_SAMPLE_SLOTS: u32 = 4;
pub const DEFAULT_LOOP: bool = true;
pub const DEFAULT_PATTERN_BLOCK: u32 = 8;
// larger values are clamped down to these
pub const MAX_STEPS_PER_BAR: u32 = 1024;
pub const MAX_SAMPLE_SLOTS: u32 = 64;

// scheduling, all in seconds
pub const LOOKAHEAD: f64 = 0.06; // trigger this far ahead of the output clock
pub const START_EPSILON: f64 = 0.005; // never start a voice in the past
pub const RELEASE_TAIL: f64 = 0.05;
pub const PREVIEW_DELAY: f64 = 0.05;

pub const MAX_SWING_FRACTION: f64 = 0.45;

// output
pub const MASTER_GAIN: f32 = 0.8;
pub const MAX_VOICES: usize = 64; // hard cap so the audio callback never grows the pool
pub const COMMAND_QUEUE: usize = 1024;

// front-end clamps; the normalizer doesn't enforce these
pub const UI_MIN_BPM: f64 = 40.0;
pub const UI_MAX_BPM: f64 = 200.0;
pub const UI_PITCH_RANGE: i32 = 24;

#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    TogglePlay,
    MoveCursor { tracks: i32, steps: i32 },
    ToggleStep,
    ToggleMute,
    AdjustPitch(i32),
    AdjustVolume(f64),
    AdjustPan(f64),
    ToggleReverse,
    CycleMod,
    CycleSlot,
    AdjustBpm(f64),
    AdjustSwing(f64),
    ToggleLoop,
    ExtendPattern,
    Preview(usize), // index into the sample library
    Save,
    Quit,
}
