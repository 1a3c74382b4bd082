// ============================================================
//  Audiogram — Affichage temps réel d'un audiomètre série
//
//  Dépendances :
//    serialport — liaison avec l'audiomètre
//    ratatui    — interface TUI (tracé de l'audiogramme)
//    crossterm  — terminal cross-platform
//    tracing    — journalisation
// ============================================================

mod app;
mod audiogram;
mod cli;
mod logging;
mod session;
mod transport;
mod ui;

use anyhow::Result;
use app::App;
use clap::Parser;
use cli::Config;

fn main() -> Result<()> {
    let config = Config::parse();

    if config.headless {
        logging::init_stderr_logger(config.verbose)?;
    } else {
        logging::init_file_logger(&config.log_file, config.verbose)?;
    }

    App::run(&config)
}
