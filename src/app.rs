// ============================================================
//  app.rs — État de l'application & boucle principale
//
//  Un tick par période : lecture non bloquante d'au plus une
//  ligne, mise à jour de la session, nouveau tracé si un
//  audiogramme est complet.
// ============================================================

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use rand::{rngs::StdRng, SeedableRng};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
    io::{self, Stdout},
    thread,
    time::{Duration, Instant},
};
use tracing::info;

use crate::{
    audiogram::{Audiogram, FREQUENCIES_HZ},
    cli::Config,
    session::Session,
    transport::{self, LineSource, Poll, SerialSource, SimulatedSource},
    ui,
};

// ─── État ─────────────────────────────────────────────────────────────────────

pub struct AppState {
    pub session: Session,

    // Dernier audiogramme complet, celui qui est tracé
    pub audiogram: Option<Audiogram>,
    pub renders: u32,

    pub last_line: Option<String>,
    pub source_label: String,
    pub tick: Duration,
}

impl AppState {
    pub fn new(source_label: String, tick: Duration) -> Self {
        AppState {
            session: Session::new(),
            audiogram: None,
            renders: 0,
            last_line: None,
            source_label,
            tick,
        }
    }

    /// Un tick : au plus une ligne lue. Les erreurs de transport remontent.
    pub fn on_tick(&mut self, source: &mut dyn LineSource) -> Result<()> {
        if let Poll::Line { line, audiogram } = transport::poll_once(source, &mut self.session)? {
            self.last_line = Some(line);
            if let Some(audiogram) = audiogram {
                self.audiogram = Some(audiogram);
                self.renders += 1;
            }
        }
        Ok(())
    }

    /// Vide la session et efface le tracé.
    pub fn reset(&mut self) {
        self.session.reset();
        self.audiogram = None;
        self.last_line = None;
    }
}

/// Tableau texte fréquence / gauche / droite (mode headless).
pub fn format_table(audiogram: &Audiogram) -> String {
    let header = format!("{:>8} {:>8} {:>8}\n", "Hz", "G (dB)", "D (dB)");
    FREQUENCIES_HZ
        .iter()
        .enumerate()
        .map(|(i, hz)| format!("{:>8} {:>8.1} {:>8.1}\n", hz, audiogram.left[i], audiogram.right[i]))
        .fold(header, |out, row| out + &row)
}

fn open_source(config: &Config) -> Result<Box<dyn LineSource>> {
    if config.simulate {
        return Ok(Box::new(SimulatedSource::new(StdRng::from_entropy())));
    }
    Ok(Box::new(SerialSource::open(&config.port, config.baud)?))
}

// ─── Point d'entrée ───────────────────────────────────────────────────────────

pub struct App;

impl App {
    pub fn run(config: &Config) -> Result<()> {
        // Le port est ouvert avant de passer le terminal en mode brut
        let mut source = open_source(config)?;
        info!(source = %source.describe(), tick_ms = config.tick_ms, "starting");
        let mut state = AppState::new(source.describe(), config.tick());

        if config.headless {
            return Self::run_headless(&mut state, source.as_mut());
        }

        // Init terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = Self::event_loop(&mut terminal, &mut state, source.as_mut());

        // Restaure le terminal, même après une erreur de transport
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        info!(renders = state.renders, lines = state.session.lines_seen, "stopped");
        result
    }

    fn event_loop(
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
        state: &mut AppState,
        source: &mut dyn LineSource,
    ) -> Result<()> {
        let mut last_tick = Instant::now();

        loop {
            // Rendu
            terminal.draw(|f| ui::draw(f, state))?;

            // Gestion des événements clavier jusqu'au prochain tick
            let timeout = state.tick.checked_sub(last_tick.elapsed()).unwrap_or_default();
            if event::poll(timeout)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    match (key.code, key.modifiers) {
                        // Quitter
                        (KeyCode::Char('q'), _)
                        | (KeyCode::Char('c'), KeyModifiers::CONTROL) => return Ok(()),

                        // Réinitialiser
                        (KeyCode::Char('x') | KeyCode::Delete, _) => {
                            info!("session reset from keyboard");
                            state.reset();
                        }

                        _ => {}
                    }
                }
            }

            if last_tick.elapsed() >= state.tick {
                state.on_tick(source)?;
                last_tick = Instant::now();
            }
        }
    }

    fn run_headless(state: &mut AppState, source: &mut dyn LineSource) -> Result<()> {
        loop {
            let renders = state.renders;
            state.on_tick(source)?;
            if state.renders != renders {
                if let Some(audiogram) = &state.audiogram {
                    println!("Audiogramme #{}\n{}", state.renders, format_table(audiogram));
                }
            }
            thread::sleep(state.tick);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simulated_state() -> (AppState, SimulatedSource<StdRng>) {
        let source = SimulatedSource::new(StdRng::seed_from_u64(42));
        (AppState::new(source.describe(), Duration::from_millis(10)), source)
    }

    #[test]
    fn ticks_until_render_then_reset() {
        let (mut state, mut source) = simulated_state();

        state.on_tick(&mut source).unwrap();
        state.on_tick(&mut source).unwrap();
        assert!(state.audiogram.is_none());
        assert_eq!(state.session.left().len(), 7);

        state.on_tick(&mut source).unwrap();
        assert!(state.audiogram.is_some());
        assert_eq!(state.renders, 1);
        assert!(state.last_line.as_deref().is_some_and(|l| l.starts_with("Right Ear:")));

        state.reset();
        assert!(state.audiogram.is_none());
        assert!(state.session.left().is_empty());
    }

    #[test]
    fn next_sentinel_keeps_previous_chart() {
        let (mut state, mut source) = simulated_state();
        for _ in 0..4 {
            state.on_tick(&mut source).unwrap();
        }
        // La sentinelle vide la session mais pas le tracé affiché
        assert!(state.session.left().is_empty());
        assert!(state.audiogram.is_some());
    }

    #[test]
    fn table_lists_every_frequency() {
        let audiogram = Audiogram {
            left: [10.0, 15.0, 20.0, 25.0, 30.0, 35.0, 40.0],
            right: [5.0, 10.0, 15.0, 20.0, 25.0, 30.0, 35.0],
        };
        let table = format_table(&audiogram);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[1].split_whitespace().collect::<Vec<_>>(), ["125", "10.0", "5.0"]);
        assert_eq!(lines[7].split_whitespace().collect::<Vec<_>>(), ["8000", "40.0", "35.0"]);
    }
}
