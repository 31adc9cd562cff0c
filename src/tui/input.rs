use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use trackerbox::shared::InputEvent;

use super::mode::TuiState;

// drain whatever key presses are waiting and resolve them into input events;
// anything the tui handles on its own (help overlay) never leaves here
pub fn poll_input(timeout: Duration, ts: &mut TuiState) -> anyhow::Result<Vec<InputEvent>> {
    let mut events = Vec::new();
    let mut wait = timeout;
    while event::poll(wait)? {
        wait = Duration::ZERO;
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            events.extend(handle_key(key.code, ts));
        }
    }
    Ok(events)
}

fn handle_key(code: KeyCode, ts: &mut TuiState) -> Option<InputEvent> {
    let event = match code {
        KeyCode::Esc | KeyCode::Char('q') => InputEvent::Quit,
        KeyCode::Char('?') => {
            ts.show_help = !ts.show_help;
            return None;
        }
        KeyCode::Char(' ') => InputEvent::TogglePlay,
        KeyCode::Enter => InputEvent::ToggleStep,

        KeyCode::Up | KeyCode::Char('k') => InputEvent::MoveCursor { tracks: -1, steps: 0 },
        KeyCode::Down | KeyCode::Char('j') => InputEvent::MoveCursor { tracks: 1, steps: 0 },
        KeyCode::Left | KeyCode::Char('h') => InputEvent::MoveCursor { tracks: 0, steps: -1 },
        KeyCode::Right | KeyCode::Char('l') => InputEvent::MoveCursor { tracks: 0, steps: 1 },

        KeyCode::Char('m') => InputEvent::ToggleMute,
        KeyCode::Char('r') => InputEvent::ToggleReverse,
        KeyCode::Char('f') => InputEvent::CycleMod,
        KeyCode::Char('s') => InputEvent::CycleSlot,
        KeyCode::Char('o') => InputEvent::ToggleLoop,
        KeyCode::Char('e') => InputEvent::ExtendPattern,
        KeyCode::Char('w') => InputEvent::Save,

        // paired keys, left = down and right = up
        KeyCode::Char('[') => InputEvent::AdjustPitch(-1),
        KeyCode::Char(']') => InputEvent::AdjustPitch(1),
        KeyCode::Char('-') => InputEvent::AdjustVolume(-0.1),
        KeyCode::Char('=') => InputEvent::AdjustVolume(0.1),
        KeyCode::Char(',') => InputEvent::AdjustPan(-0.1),
        KeyCode::Char('.') => InputEvent::AdjustPan(0.1),
        KeyCode::Char('<') => InputEvent::AdjustBpm(-1.0),
        KeyCode::Char('>') => InputEvent::AdjustBpm(1.0),
        KeyCode::Char('{') => InputEvent::AdjustSwing(-5.0),
        KeyCode::Char('}') => InputEvent::AdjustSwing(5.0),

        // library entries are numbered from 1 on screen
        KeyCode::Char(c @ '1'..='9') => InputEvent::Preview(c as usize - '1' as usize),
        _ => return None,
    };
    Some(event)
}
