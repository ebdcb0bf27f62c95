//! Rendering: transport bar, beat indicator, tempo gauge, help line.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame,
};

use clave::metronome::Metronome;
use clave::tempo::{MAX_BPM, MIN_BPM};

pub fn render(frame: &mut Frame, metronome: &Metronome, pulse_lit: bool) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Transport bar
            Constraint::Min(5),    // Beat indicator
            Constraint::Length(3), // Tempo gauge
            Constraint::Length(1), // Help bar
        ])
        .split(area);

    render_transport(frame, chunks[0], metronome);
    render_beat_indicator(frame, chunks[1], pulse_lit);
    render_tempo_gauge(frame, chunks[2], metronome);

    let help = Paragraph::new(" [Space] Start/Stop  [\u{2191}/\u{2193}] \u{00b1}1 BPM  [\u{2190}/\u{2192}] \u{00b1}5 BPM  [Q] Quit")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, chunks[3]);
}

fn render_transport(frame: &mut Frame, area: ratatui::layout::Rect, metronome: &Metronome) {
    let block = Block::default().title(" clave ").borders(Borders::ALL);

    let (symbol, label, color) = if metronome.is_playing() {
        ("\u{25b6}", "Playing", Color::Green)
    } else {
        ("\u{25a0}", "Stopped", Color::Yellow)
    };

    let line = Line::from(vec![
        Span::styled(
            format!(" BPM: {}  ", metronome.tempo()),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(format!("{symbol} {label}"), Style::default().fg(color)),
    ]);

    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn render_beat_indicator(frame: &mut Frame, area: ratatui::layout::Rect, lit: bool) {
    let block = Block::default().title(" Beat ").borders(Borders::ALL);

    let style = if lit {
        Style::default().bg(Color::Cyan).fg(Color::Black)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let body = if lit { "\u{25cf}" } else { "\u{25cb}" };

    let paragraph = Paragraph::new(body)
        .style(style)
        .alignment(Alignment::Center)
        .block(block);
    frame.render_widget(paragraph, area);
}

fn render_tempo_gauge(frame: &mut Frame, area: ratatui::layout::Rect, metronome: &Metronome) {
    let bpm = metronome.tempo();
    let ratio = (bpm - MIN_BPM) as f64 / (MAX_BPM - MIN_BPM) as f64;

    let gauge = Gauge::default()
        .block(Block::default().title(" Tempo ").borders(Borders::ALL))
        .gauge_style(Style::default().fg(Color::Cyan))
        .ratio(ratio)
        .label(format!("{bpm} BPM"));
    frame.render_widget(gauge, area);
}
