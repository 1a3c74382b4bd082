// ============================================================
//  audiogram.rs — Modèle de données & analyse des lignes
//
//  Format émis par l'audiomètre (une ligne par oreille) :
//    Left Ear: 125Hz,10 db | 250Hz,15 db | … | 8000Hz,40 db
//    Right Ear: 125Hz,5 db | …
//  précédé d'une ligne sentinelle "Audiogram Results:".
// ============================================================

use std::fmt;
use std::num::ParseFloatError;

use thiserror::Error;

// ─── Constantes ───────────────────────────────────────────────────────────────

/// Fréquences testées, dans l'ordre d'émission.
pub const FREQUENCIES_HZ: [u32; 7] = [125, 250, 500, 1000, 2000, 4000, 8000];

/// Nombre de seuils attendus par oreille pour un audiogramme complet.
pub const EXPECTED_POINTS: usize = FREQUENCIES_HZ.len();

pub const SENTINEL: &str = "Audiogram Results:";
const LEFT_MARKER: &str = "Left Ear:";
const RIGHT_MARKER: &str = "Right Ear:";
const TOKEN_SEPARATOR: &str = " | ";
const FREQ_SEPARATOR: &str = "Hz,";
const DB_SUFFIX: &str = " db";

// ─── Types ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ear {
    Left,
    Right,
}

impl Ear {
    pub fn label(self) -> &'static str {
        match self {
            Ear::Left => "Oreille gauche",
            Ear::Right => "Oreille droite",
        }
    }
}

impl fmt::Display for Ear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Ear::Left => "left ear",
            Ear::Right => "right ear",
        })
    }
}

/// Résultat de l'analyse d'une ligne : au plus un côté est rempli.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedLine {
    pub left: Vec<f64>,
    pub right: Vec<f64>,
}

impl ParsedLine {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty() && self.right.is_empty()
    }
}

/// Audiogramme complet, prêt à être tracé.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Audiogram {
    pub left: [f64; EXPECTED_POINTS],
    pub right: [f64; EXPECTED_POINTS],
}

impl Audiogram {
    pub fn series(&self, ear: Ear) -> &[f64; EXPECTED_POINTS] {
        match ear {
            Ear::Left => &self.left,
            Ear::Right => &self.right,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("missing `Hz,` separator in token `{token}`")]
    MissingSeparator { token: String },

    #[error("invalid threshold in token `{token}`: {source}")]
    InvalidThreshold {
        token: String,
        #[source]
        source: ParseFloatError,
    },
}

// ─── Analyse ──────────────────────────────────────────────────────────────────

/// Analyse une ligne déjà décodée et nettoyée.
///
/// Une ligne sans marqueur d'oreille donne `ParsedLine::empty()`.
/// Le moindre jeton invalide rejette la ligne entière : jamais de liste partielle.
pub fn parse_line(line: &str) -> Result<ParsedLine, ParseError> {
    // "Left Ear:" est testé en premier, comme côté appareil
    let ear = if line.contains(LEFT_MARKER) {
        Ear::Left
    } else if line.contains(RIGHT_MARKER) {
        Ear::Right
    } else {
        return Ok(ParsedLine::empty());
    };

    let values = line
        .split(TOKEN_SEPARATOR)
        .map(parse_token)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(match ear {
        Ear::Left => ParsedLine { left: values, right: Vec::new() },
        Ear::Right => ParsedLine { left: Vec::new(), right: values },
    })
}

fn parse_token(token: &str) -> Result<f64, ParseError> {
    let raw = token
        .split(FREQ_SEPARATOR)
        .nth(1)
        .ok_or_else(|| ParseError::MissingSeparator { token: token.to_string() })?;

    raw.replace(DB_SUFFIX, "")
        .trim()
        .parse::<f64>()
        .map_err(|source| ParseError::InvalidThreshold { token: token.to_string(), source })
}

/// Formate une ligne au format de l'appareil (utilisé par le simulateur).
pub fn format_line(ear: Ear, thresholds: &[f64]) -> String {
    let marker = match ear {
        Ear::Left => LEFT_MARKER,
        Ear::Right => RIGHT_MARKER,
    };
    let tokens: Vec<String> = FREQUENCIES_HZ
        .iter()
        .zip(thresholds)
        .map(|(hz, db)| format!("{hz}{FREQ_SEPARATOR}{db}{DB_SUFFIX}"))
        .collect();
    format!("{marker} {}", tokens.join(TOKEN_SEPARATOR))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEFT_LINE: &str = "Left Ear: 125Hz,10 db | 250Hz,15 db | 500Hz,20 db | 1000Hz,25 db | 2000Hz,30 db | 4000Hz,35 db | 8000Hz,40 db";

    #[test]
    fn parses_left_line_in_token_order() {
        let parsed = parse_line(LEFT_LINE).unwrap();
        assert_eq!(parsed.left, vec![10.0, 15.0, 20.0, 25.0, 30.0, 35.0, 40.0]);
        assert!(parsed.right.is_empty());
    }

    #[test]
    fn parses_right_line_with_negative_and_high_values() {
        let line = "Right Ear: 125Hz,-10 db | 250Hz,-5 db | 500Hz,0 db | 1000Hz,12.5 db | 2000Hz,60 db | 4000Hz,110 db | 8000Hz,125 db";
        let parsed = parse_line(line).unwrap();
        assert!(parsed.left.is_empty());
        assert_eq!(parsed.right, vec![-10.0, -5.0, 0.0, 12.5, 60.0, 110.0, 125.0]);
    }

    #[test]
    fn unlabelled_line_is_empty() {
        assert_eq!(parse_line("Starting test...").unwrap(), ParsedLine::empty());
        assert_eq!(parse_line("").unwrap(), ParsedLine::empty());
        assert_eq!(parse_line("125Hz,10 db | 250Hz,15 db").unwrap(), ParsedLine::empty());
    }

    #[test]
    fn left_marker_wins_when_both_present() {
        let parsed = parse_line("Left Ear: Right Ear: 125Hz,10 db").unwrap();
        assert_eq!(parsed.left, vec![10.0]);
        assert!(parsed.right.is_empty());
    }

    #[test]
    fn missing_separator_rejects_whole_line() {
        let line = "Left Ear: 125Hz,10 db | 250 15 db | 500Hz,20 db";
        assert_eq!(
            parse_line(line),
            Err(ParseError::MissingSeparator { token: "250 15 db".to_string() })
        );
    }

    #[test]
    fn non_numeric_threshold_rejects_whole_line() {
        let err = parse_line("Right Ear: 125Hz,10 db | 250Hz,abc db").unwrap_err();
        assert!(matches!(err, ParseError::InvalidThreshold { ref token, .. } if token == "250Hz,abc db"));
    }

    #[test]
    fn format_line_is_parseable() {
        let thresholds = [5.0, 10.0, 15.0, 20.0, 25.0, 30.0, 35.0];
        let line = format_line(Ear::Right, &thresholds);
        assert!(line.starts_with("Right Ear: 125Hz,5 db | 250Hz,10 db"));
        assert_eq!(parse_line(&line).unwrap().right, thresholds.to_vec());
    }
}
