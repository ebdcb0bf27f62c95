//! Application state and event loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::DefaultTerminal;

use clave::dispatch::VisualSink;
use clave::metronome::Metronome;

use crate::ui;

/// Visual sink backed by a flag the UI polls each frame. Fire-and-forget on
/// the engine side; the UI repaints at ~60fps so a 150ms pulse is visible.
struct PulseFlag(Arc<AtomicBool>);

impl VisualSink for PulseFlag {
    fn pulse_on(&mut self) {
        self.0.store(true, Ordering::Release);
    }
    fn pulse_off(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct App {
    metronome: Metronome,
    pulse: Arc<AtomicBool>,
    should_quit: bool,
}

impl App {
    pub fn new() -> Self {
        let pulse = Arc::new(AtomicBool::new(false));
        let metronome = Metronome::builder()
            .bpm(120.0)
            .build(PulseFlag(pulse.clone()));
        Self {
            metronome,
            pulse,
            should_quit: false,
        }
    }

    /// Run the UI event loop.
    pub fn run(mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            let lit = self.pulse.load(Ordering::Acquire);
            terminal.draw(|frame| ui::render(frame, &self.metronome, lit))?;

            // Non-blocking input poll, ~60fps
            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char(' ') => self.metronome.toggle(),
            KeyCode::Up => self.nudge(1.0),
            KeyCode::Down => self.nudge(-1.0),
            KeyCode::Right => self.nudge(5.0),
            KeyCode::Left => self.nudge(-5.0),
            _ => {}
        }
    }

    /// Nudge the tempo; a committed change gets the dial-style detent click.
    fn nudge(&mut self, delta: f64) {
        let before = self.metronome.tempo();
        let after = self.metronome.set_tempo(before as f64 + delta);
        if after != before {
            self.metronome.detent_click();
        }
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}
