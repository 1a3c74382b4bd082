// ============================================================
//  cli.rs — Paramètres de lancement
// ============================================================

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[cfg(windows)]
const DEFAULT_PORT: &str = "COM6";
#[cfg(not(windows))]
const DEFAULT_PORT: &str = "/dev/ttyACM0";

#[derive(Debug, Clone, Parser)]
#[command(name = "audiogram")]
#[command(about = "Affiche en temps réel l'audiogramme envoyé par un audiomètre série")]
pub struct Config {
    /// Port série de l'audiomètre
    #[arg(long, default_value = DEFAULT_PORT)]
    pub port: String,

    #[arg(long, default_value = "9600")]
    pub baud: u32,

    /// Période de lecture du port, en millisecondes
    #[arg(long, default_value = "1000", value_parser = clap::value_parser!(u64).range(1..))]
    pub tick_ms: u64,

    /// Remplace le port série par un appareil simulé
    #[arg(long)]
    pub simulate: bool,

    /// Pas d'interface : les audiogrammes complets sont écrits sur stdout
    #[arg(long)]
    pub headless: bool,

    /// Journal (mode TUI uniquement, le mode headless journalise sur stderr)
    #[arg(long, default_value = "audiogram.log")]
    pub log_file: PathBuf,

    #[arg(long, short, help = "Enable verbose output")]
    pub verbose: bool,
}

impl Config {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}
