// ============================================================
//  transport.rs — Source des lignes de l'audiomètre
//
//  - Port série (serialport), lecture ligne par ligne
//  - Appareil simulé (rand) pour tester sans matériel
//  - poll_once : une vérification non bloquante, au plus une ligne
// ============================================================

use anyhow::{Context, Result};
use rand::Rng;
use serialport::SerialPort;
use std::collections::VecDeque;
use std::io::{BufRead, BufReader, ErrorKind};
use std::time::Duration;
use tracing::{debug, trace};

use crate::audiogram::{format_line, Audiogram, Ear, EXPECTED_POINTS, SENTINEL};
use crate::session::Session;

/// Délai max d'une lecture de ligne, comme un `readline` avec timeout.
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);

// ─── Interface ────────────────────────────────────────────────────────────────

pub trait LineSource {
    /// Nombre d'octets lisibles sans bloquer.
    fn bytes_available(&mut self) -> Result<usize>;

    /// Lit une ligne brute (terminaison incluse si reçue).
    fn read_line(&mut self) -> Result<String>;

    fn describe(&self) -> String;
}

/// Résultat d'un tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Poll {
    Idle,
    Line {
        line: String,
        audiogram: Option<Audiogram>,
    },
}

/// Un tick : si des octets sont disponibles, lit une ligne et la passe à la session.
pub fn poll_once<S: LineSource + ?Sized>(source: &mut S, session: &mut Session) -> Result<Poll> {
    if source.bytes_available()? == 0 {
        return Ok(Poll::Idle);
    }

    let raw = source.read_line()?;
    let line = raw.trim().to_string();
    trace!(%line, "line received");
    let audiogram = session.feed(&line);
    Ok(Poll::Line { line, audiogram })
}

// ─── Port série ───────────────────────────────────────────────────────────────

pub struct SerialSource {
    name: String,
    baud_rate: u32,
    reader: BufReader<Box<dyn SerialPort>>,
}

impl SerialSource {
    pub fn open(name: &str, baud_rate: u32) -> Result<Self> {
        let port = serialport::new(name, baud_rate)
            .timeout(READ_TIMEOUT)
            .open()
            .with_context(|| format!("Impossible d'ouvrir le port série {name} à {baud_rate} bauds"))?;
        debug!(port = name, baud_rate, "serial port opened");

        Ok(Self {
            name: name.to_string(),
            baud_rate,
            reader: BufReader::new(port),
        })
    }
}

impl LineSource for SerialSource {
    fn bytes_available(&mut self) -> Result<usize> {
        let pending = self
            .reader
            .get_ref()
            .bytes_to_read()
            .with_context(|| format!("Port série {} indisponible", self.name))?;
        Ok(available(&self.reader, pending as usize))
    }

    fn read_line(&mut self) -> Result<String> {
        read_line_from(&mut self.reader).with_context(|| format!("Lecture impossible sur {}", self.name))
    }

    fn describe(&self) -> String {
        format!("{} @ {} bauds", self.name, self.baud_rate)
    }
}

/// Octets lisibles : ceux déjà dans le tampon plus ceux en attente côté port.
fn available<R>(reader: &BufReader<R>, pending: usize) -> usize {
    reader.buffer().len() + pending
}

/// Lit jusqu'au `\n`. Une expiration garde la ligne partielle reçue.
fn read_line_from<R: BufRead>(reader: &mut R) -> Result<String> {
    let mut buf = Vec::new();
    match reader.read_until(b'\n', &mut buf) {
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::TimedOut => {
            debug!(bytes = buf.len(), "serial read timed out, using partial line");
        }
        Err(e) => return Err(e.into()),
    }
    String::from_utf8(buf).context("Ligne reçue non UTF-8")
}

// ─── Appareil simulé ──────────────────────────────────────────────────────────

/// Rejoue en boucle : sentinelle, oreille gauche, oreille droite,
/// avec des seuils aléatoires (multiples de 5 entre -10 et 90 dB).
pub struct SimulatedSource<R: Rng> {
    rng: R,
    pending: VecDeque<String>,
    cycles: u64,
}

impl<R: Rng> SimulatedSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng, pending: VecDeque::new(), cycles: 0 }
    }

    fn random_thresholds(&mut self) -> Vec<f64> {
        (0..EXPECTED_POINTS)
            .map(|_| self.rng.gen_range(-2..=18) as f64 * 5.0)
            .collect()
    }

    fn refill(&mut self) {
        let left = self.random_thresholds();
        let right = self.random_thresholds();
        self.pending.push_back(SENTINEL.to_string());
        self.pending.push_back(format_line(Ear::Left, &left));
        self.pending.push_back(format_line(Ear::Right, &right));
        self.cycles += 1;
        debug!(cycle = self.cycles, "simulated test queued");
    }
}

impl<R: Rng> LineSource for SimulatedSource<R> {
    fn bytes_available(&mut self) -> Result<usize> {
        if self.pending.is_empty() {
            self.refill();
        }
        Ok(self.pending.iter().map(|l| l.len() + 2).sum())
    }

    fn read_line(&mut self) -> Result<String> {
        if self.pending.is_empty() {
            self.refill();
        }
        let line = self.pending.pop_front().unwrap_or_default();
        Ok(format!("{line}\r\n"))
    }

    fn describe(&self) -> String {
        "appareil simulé".to_string()
    }
}
