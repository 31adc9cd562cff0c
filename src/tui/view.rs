use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use super::grid::draw_step_grid;
use crate::middle::DisplayState;

const HELP: &[&str] = &[
    "space  play / stop        enter  toggle step",
    "arrows / hjkl  move       m  mute track",
    "[ ]  pitch   - =  volume  , .  pan",
    "r  reverse   f  mod       s  sample slot",
    "< >  bpm     { }  swing   o  loop",
    "e  extend pattern         1-9  preview sample",
    "w  save      ?  help      q / esc  quit",
];

pub fn render(frame: &mut Frame, area: Rect, state: &DisplayState, show_help: bool) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // transport
            Constraint::Min(4),    // step grid
            Constraint::Length(4), // selected step
            Constraint::Length(6), // library
            Constraint::Length(1), // status
        ])
        .split(area);

    draw_transport(frame, sections[0], state);
    let rows = sections[1].height.saturating_sub(2) as usize;
    // keep the selected track visible on short terminals
    let first = state.selected_track.saturating_sub(rows.saturating_sub(1));
    let tracks = state.config.tracks.get(first..).unwrap_or_default();
    draw_step_grid(
        frame,
        sections[1],
        tracks,
        state.config.steps_per_bar,
        (state.selected_track - first, state.selected_step),
    );
    draw_step_detail(frame, sections[2], state);
    draw_library(frame, sections[3], state);
    frame.render_widget(
        Paragraph::new(state.status.as_str()).style(Style::default().fg(Color::DarkGray)),
        sections[4],
    );

    if show_help {
        draw_help(frame, area);
    }
}

fn draw_transport(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let c = &state.config;
    let (label, color) = if state.playing {
        ("▶ playing", Color::Green)
    } else {
        ("■ stopped", Color::DarkGray)
    };
    let line = Line::from(vec![
        Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
        Span::raw(format!(
            "   {:.0} bpm   swing {:.0}%   {} steps/bar   {}",
            c.bpm,
            c.swing,
            c.steps_per_bar,
            if c.looping { "loop" } else { "one-shot" },
        )),
    ]);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", state.title));
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn draw_step_detail(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let block = Block::default().borders(Borders::ALL).title(" step ");
    let Some(track) = state.config.tracks.get(state.selected_track) else {
        frame.render_widget(Paragraph::new("no tracks").block(block), area);
        return;
    };
    let Some(step) = track.steps.get(state.selected_step) else {
        frame.render_widget(Paragraph::new("no steps").block(block), area);
        return;
    };
    let lines = vec![
        Line::from(format!(
            "{} / step {}   {}   slot {}",
            track.name,
            state.selected_step + 1,
            if step.enabled { "on" } else { "off" },
            track.slot_label(&state.config, step.sample_slot as usize),
        )),
        Line::from(format!(
            "pitch {:+}   vol {:.1}   pan {:+.1}   {}   mod {}",
            step.pitch,
            step.volume,
            step.pan,
            if step.reverse { "rev" } else { "fwd" },
            step.modulation.modulation().as_str(),
        )),
    ];
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_library(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let lines: Vec<Line> = state
        .config
        .sample_library
        .iter()
        .take(9)
        .enumerate()
        .map(|(i, sample)| {
            Line::from(vec![
                Span::styled(format!("{} ", i + 1), Style::default().fg(Color::Yellow)),
                Span::raw(format!("{:<16} {}", sample.name, sample.category)),
            ])
        })
        .collect();
    let block = Block::default().borders(Borders::ALL).title(" samples ");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_help(frame: &mut Frame, area: Rect) {
    let width = 48.min(area.width);
    let height = (HELP.len() as u16 + 2).min(area.height);
    let popup = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    };
    let lines: Vec<Line> = HELP.iter().map(|l| Line::from(*l)).collect();
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" keys ")),
        popup,
    );
}
