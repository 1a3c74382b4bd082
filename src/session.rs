// ============================================================
//  session.rs — Accumulation des résultats d'un test
//
//  Cycle : sentinelle → série gauche / droite → 7 + 7 → tracé
//  Les séries restent en place après le tracé, jusqu'à la
//  prochaine sentinelle.
// ============================================================

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::audiogram::{self, Audiogram, Ear, ParseError, EXPECTED_POINTS, SENTINEL};

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("malformed line `{line}`: {source}")]
    Malformed {
        line: String,
        #[source]
        source: ParseError,
    },

    #[error("{ear} already holds {held} values, {incoming} more would overflow the series")]
    Overflow { ear: Ear, held: usize, incoming: usize },
}

#[derive(Debug, Default)]
pub struct Session {
    left: Vec<f64>,
    right: Vec<f64>,
    last_error: Option<SessionError>,
    pub lines_seen: u64,
    pub malformed_lines: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn left(&self) -> &[f64] {
        &self.left
    }

    pub fn right(&self) -> &[f64] {
        &self.right
    }

    pub fn series(&self, ear: Ear) -> &[f64] {
        match ear {
            Ear::Left => self.left(),
            Ear::Right => self.right(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.left.len() == EXPECTED_POINTS && self.right.len() == EXPECTED_POINTS
    }

    pub fn last_error(&self) -> Option<&SessionError> {
        self.last_error.as_ref()
    }

    /// Vide les deux séries (début d'un nouveau test).
    pub fn reset(&mut self) {
        self.left.clear();
        self.right.clear();
        self.last_error = None;
    }

    /// Traite une ligne reçue. Retourne l'audiogramme si les deux séries
    /// viennent d'atteindre leur taille complète.
    pub fn feed(&mut self, line: &str) -> Option<Audiogram> {
        self.lines_seen += 1;

        if line.contains(SENTINEL) {
            info!("new audiogram results, clearing series");
            self.reset();
            return None;
        }

        let parsed = match audiogram::parse_line(line) {
            Ok(parsed) => parsed,
            Err(source) => {
                self.malformed_lines += 1;
                self.record(SessionError::Malformed { line: line.to_string(), source });
                return None;
            }
        };

        if parsed.is_empty() {
            debug!(line, "ignoring line without ear data");
            return None;
        }

        // Une ligne qui ferait déborder sa série est rejetée en bloc
        for (ear, incoming) in [(Ear::Left, &parsed.left), (Ear::Right, &parsed.right)] {
            let held = self.series(ear).len();
            if held + incoming.len() > EXPECTED_POINTS {
                self.record(SessionError::Overflow { ear, held, incoming: incoming.len() });
                return None;
            }
        }

        self.left.extend_from_slice(&parsed.left);
        self.right.extend_from_slice(&parsed.right);
        self.last_error = None;
        debug!(left = self.left.len(), right = self.right.len(), "series updated");

        self.completed()
    }

    fn completed(&self) -> Option<Audiogram> {
        let left = self.left.as_slice().try_into().ok()?;
        let right = self.right.as_slice().try_into().ok()?;
        info!("audiogram complete");
        Some(Audiogram { left, right })
    }

    fn record(&mut self, err: SessionError) {
        warn!("{err}");
        self.last_error = Some(err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audiogram::format_line;

    const LEFT_LINE: &str = "Left Ear: 125Hz,10 db | 250Hz,15 db | 500Hz,20 db | 1000Hz,25 db | 2000Hz,30 db | 4000Hz,35 db | 8000Hz,40 db";
    const RIGHT_LINE: &str = "Right Ear: 125Hz,5 db | 250Hz,10 db | 500Hz,15 db | 1000Hz,20 db | 2000Hz,25 db | 4000Hz,30 db | 8000Hz,35 db";

    #[test]
    fn full_cycle_emits_audiogram() {
        let mut session = Session::new();
        assert_eq!(session.feed("Audiogram Results:"), None);
        assert_eq!(session.feed(LEFT_LINE), None);
        let audiogram = session.feed(RIGHT_LINE).expect("render event");
        assert_eq!(audiogram.left, [10.0, 15.0, 20.0, 25.0, 30.0, 35.0, 40.0]);
        assert_eq!(audiogram.right, [5.0, 10.0, 15.0, 20.0, 25.0, 30.0, 35.0]);
        // Les séries ne sont pas vidées après le tracé
        assert!(session.is_complete());
    }

    #[test]
    fn left_only_never_renders() {
        let mut session = Session::new();
        assert_eq!(session.feed(LEFT_LINE), None);
        assert_eq!(session.left().len(), 7);
        assert!(session.right().is_empty());
        assert!(!session.is_complete());
    }

    #[test]
    fn sentinel_clears_both_series() {
        let mut session = Session::new();
        session.feed(LEFT_LINE);
        session.feed(RIGHT_LINE);
        session.feed("  Audiogram Results: run 2");
        assert!(session.left().is_empty());
        assert!(session.right().is_empty());
    }

    #[test]
    fn render_waits_for_both_series() {
        let mut session = Session::new();
        let left: Vec<f64> = (0..7).map(|i| i as f64 * 10.0).collect();
        let right = left.clone();

        // Séries envoyées en plusieurs morceaux
        assert_eq!(session.feed(&format_line(Ear::Left, &left[..3])), None);
        assert_eq!(session.feed(&format_line(Ear::Right, &right)), None);
        let audiogram = session.feed(&format_line(Ear::Left, &left[3..]));
        assert!(audiogram.is_some());
    }

    #[test]
    fn malformed_line_keeps_existing_state() {
        let mut session = Session::new();
        session.feed(LEFT_LINE);
        assert_eq!(session.feed("Right Ear: 125Hz,5 db | 250Hz,oops db"), None);
        assert_eq!(session.left().len(), 7);
        assert!(session.right().is_empty());
        assert_eq!(session.malformed_lines, 1);
        assert!(matches!(session.last_error(), Some(SessionError::Malformed { .. })));
    }

    #[test]
    fn overflowing_line_is_rejected() {
        let mut session = Session::new();
        session.feed(LEFT_LINE);
        session.feed(RIGHT_LINE);
        assert_eq!(session.feed(LEFT_LINE), None);
        assert_eq!(session.left().len(), 7);
        assert_eq!(
            session.last_error(),
            Some(&SessionError::Overflow { ear: Ear::Left, held: 7, incoming: 7 })
        );
        assert_eq!(
            session.last_error().map(ToString::to_string).as_deref(),
            Some("left ear already holds 7 values, 7 more would overflow the series")
        );
    }

    #[test]
    fn successful_lines_clear_previous_error() {
        let mut session = Session::new();
        session.feed("Left Ear: 125Hz,x db");
        assert!(session.last_error().is_some());

        session.feed(LEFT_LINE);
        assert!(session.last_error().is_none());
        assert!(session.feed(RIGHT_LINE).is_some());
        assert!(session.last_error().is_none());
        assert_eq!(session.malformed_lines, 1);
    }

    #[test]
    fn unrelated_lines_are_ignored() {
        let mut session = Session::new();
        assert_eq!(session.feed("Press button to start"), None);
        assert_eq!(session.lines_seen, 1);
        assert_eq!(session.malformed_lines, 0);
        assert!(session.last_error().is_none());
    }
}
