use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use trackerbox::pipeline::{Modulation, Track};

const NAME_WIDTH: usize = 12;

// one row per track: name, then a cell per step
pub fn draw_step_grid(
    frame: &mut Frame,
    area: Rect,
    tracks: &[Track],
    steps_per_bar: u32,
    selected: (usize, usize),
) {
    let lines: Vec<Line> = tracks
        .iter()
        .enumerate()
        .map(|(t, track)| track_line(track, t == selected.0, selected.1, steps_per_bar))
        .collect();
    let block = Block::default().borders(Borders::ALL).title(" pattern ");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn track_line(track: &Track, selected_row: bool, selected_step: usize, steps_per_bar: u32) -> Line<'static> {
    let name_style = match (selected_row, track.muted) {
        (_, true) => Style::default().fg(Color::DarkGray),
        (true, false) => Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        (false, false) => Style::default(),
    };
    let mut name: String = track.name.chars().take(NAME_WIDTH).collect();
    while name.chars().count() < NAME_WIDTH {
        name.push(' ');
    }
    let mut spans = vec![Span::styled(format!("{name} "), name_style)];

    let bar = steps_per_bar.max(1) as usize;
    for (i, step) in track.steps.iter().enumerate() {
        if i > 0 && i % bar == 0 {
            spans.push(Span::raw("│"));
        }
        let glyph = match (step.enabled, step.modulation.modulation()) {
            (false, _) => "·",
            (true, Modulation::None) => "■",
            (true, _) => "◆",
        };
        let mut style = if step.enabled && !track.muted {
            Style::default().fg(Color::LightMagenta)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        if selected_row && i == selected_step {
            style = style.bg(Color::Magenta).fg(Color::White);
        }
        spans.push(Span::styled(format!("{glyph} "), style));
    }
    Line::from(spans)
}
