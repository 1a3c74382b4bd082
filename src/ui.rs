// ============================================================
//  ui.rs — Interface TUI avec ratatui
//
//    - En-tête + source (port série ou simulateur)
//    - Audiogramme : axe dB inversé, -10 en haut, 120 en bas
//    - Progression des séries gauche / droite (n/7)
//    - Tableau des seuils, dernière ligne reçue, dernière erreur
//    - Aide clavier en bas
// ============================================================

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, Gauge, GraphType, Paragraph, Wrap},
};

use crate::{
    app::AppState,
    audiogram::{Ear, EXPECTED_POINTS, FREQUENCIES_HZ},
};

// ─── Palette ──────────────────────────────────────────────────────────────────

const RED: Color = Color::Rgb(255, 45, 85);
const BLUE: Color = Color::Rgb(60, 130, 255);
const GREEN: Color = Color::Rgb(0, 255, 135);
const YELLOW: Color = Color::Rgb(255, 214, 10);
const CYAN: Color = Color::Rgb(0, 204, 255);
const GRAY: Color = Color::Rgb(80, 80, 100);
const WHITE: Color = Color::Rgb(220, 220, 230);
const BORDER: Color = Color::Rgb(35, 35, 55);

// ─── Échelle ──────────────────────────────────────────────────────────────────

const DB_MIN: f64 = -10.0;
const DB_MAX: f64 = 120.0;
const DB_STEP: usize = 10;

fn ear_color(ear: Ear) -> Color {
    match ear {
        Ear::Left => RED,
        Ear::Right => BLUE,
    }
}

/// Points du graphe : x = position de la fréquence, y = -dB.
/// ratatui n'inverse pas les axes, on inverse donc les valeurs.
pub fn chart_points(thresholds: &[f64]) -> Vec<(f64, f64)> {
    thresholds
        .iter()
        .enumerate()
        .map(|(i, &db)| (i as f64, -db.clamp(DB_MIN, DB_MAX)))
        .collect()
}

/// Étiquettes de l'axe Y, du bas (120 dB) vers le haut (-10 dB).
pub fn y_labels() -> Vec<String> {
    (DB_MIN as i32..=DB_MAX as i32)
        .rev()
        .step_by(DB_STEP)
        .map(|db| db.to_string())
        .collect()
}

// ─── Point d'entrée du rendu ──────────────────────────────────────────────────

pub fn draw(f: &mut Frame, state: &AppState) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),  // Header
            Constraint::Min(16),    // Audiogramme + panneau
            Constraint::Length(2),  // Keyboard help
        ])
        .split(area);

    draw_header(f, chunks[0], state);

    let center = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(chunks[1]);

    draw_audiogram(f, center[0], state);
    draw_side_panel(f, center[1], state);

    draw_help(f, chunks[2]);
}

// ─── En-tête ──────────────────────────────────────────────────────────────────

fn draw_header(f: &mut Frame, area: Rect, state: &AppState) {
    let status = if state.session.last_error().is_some() {
        Span::styled("● LIGNE REJETÉE", Style::default().fg(YELLOW))
    } else if state.session.is_complete() {
        Span::styled("● RÉSULTATS", Style::default().fg(GREEN))
    } else if state.audiogram.is_some() {
        Span::styled("● NOUVEAU TEST", Style::default().fg(CYAN))
    } else {
        Span::styled("◌ EN ATTENTE", Style::default().fg(GRAY))
    };

    let title = Line::from(vec![
        Span::styled(
            "  Audiogram Interface  ",
            Style::default().fg(WHITE).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        status,
    ]);

    let source_line = Line::from(vec![
        Span::styled("  Source : ", Style::default().fg(GRAY)),
        Span::styled(&state.source_label, Style::default().fg(CYAN)),
        Span::styled(
            format!("   lecture toutes les {} ms", state.tick.as_millis()),
            Style::default().fg(GRAY),
        ),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(Color::Rgb(40, 40, 60)));

    f.render_widget(Paragraph::new(vec![title, source_line]).block(block), area);
}

// ─── Audiogramme ──────────────────────────────────────────────────────────────

fn draw_audiogram(f: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            " Audiogramme ",
            Style::default().fg(WHITE).add_modifier(Modifier::BOLD),
        ))
        .border_style(Style::default().fg(BORDER));

    let Some(audiogram) = &state.audiogram else {
        let para = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "  En attente d'un résultat complet (7 seuils par oreille)…",
                Style::default().fg(GRAY),
            )),
        ])
        .block(block);
        f.render_widget(para, area);
        return;
    };

    // Pré-alloue les données pour garantir leur durée de vie >= datasets
    let left_data = chart_points(audiogram.series(Ear::Left));
    let right_data = chart_points(audiogram.series(Ear::Right));

    let datasets = vec![
        Dataset::default()
            .name(Ear::Left.label())
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(ear_color(Ear::Left)))
            .data(&left_data),
        Dataset::default()
            .name(Ear::Right.label())
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(ear_color(Ear::Right)))
            .data(&right_data),
        // Points de mesure
        Dataset::default()
            .marker(symbols::Marker::Dot)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(ear_color(Ear::Left)).add_modifier(Modifier::BOLD))
            .data(&left_data),
        Dataset::default()
            .marker(symbols::Marker::Block)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(ear_color(Ear::Right)).add_modifier(Modifier::BOLD))
            .data(&right_data),
    ];

    let x_labels: Vec<Span> = FREQUENCIES_HZ
        .iter()
        .map(|hz| Span::styled(hz.to_string(), Style::default().fg(GRAY)))
        .collect();

    let db_labels: Vec<Span> = y_labels()
        .into_iter()
        .map(|l| Span::styled(l, Style::default().fg(GRAY)))
        .collect();

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .title(Span::styled("Fréquence (Hz)", Style::default().fg(GRAY)))
                .style(Style::default().fg(GRAY))
                .labels(x_labels)
                .bounds([0.0, (EXPECTED_POINTS - 1) as f64]),
        )
        .y_axis(
            Axis::default()
                .title(Span::styled("Seuil (dB)", Style::default().fg(GRAY)))
                .style(Style::default().fg(GRAY))
                .labels(db_labels)
                .bounds([-DB_MAX, -DB_MIN]),
        );

    f.render_widget(chart, area);
}

// ─── Panneau latéral ──────────────────────────────────────────────────────────

fn draw_side_panel(f: &mut Frame, area: Rect, state: &AppState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // Gauche n/7
            Constraint::Length(3),  // Droite n/7
            Constraint::Min(10),    // Seuils
            Constraint::Length(5),  // Dernière ligne / erreur
        ])
        .split(area);

    draw_series_gauge(f, rows[0], state, Ear::Left);
    draw_series_gauge(f, rows[1], state, Ear::Right);
    draw_thresholds(f, rows[2], state);
    draw_status(f, rows[3], state);
}

fn draw_series_gauge(f: &mut Frame, area: Rect, state: &AppState, ear: Ear) {
    let held = state.session.series(ear).len();
    let color = ear_color(ear);

    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(Span::styled(format!(" {} ", ear.label()), Style::default().fg(color)))
                .border_style(Style::default().fg(BORDER)),
        )
        .gauge_style(Style::default().fg(color).bg(Color::Rgb(10, 10, 20)))
        .ratio((held as f64 / EXPECTED_POINTS as f64).min(1.0))
        .label(format!("{held}/{EXPECTED_POINTS}"));

    f.render_widget(gauge, area);
}

fn draw_thresholds(f: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(" Seuils (dB) ", Style::default().fg(GRAY)))
        .border_style(Style::default().fg(BORDER));

    let Some(audiogram) = &state.audiogram else {
        let para = Paragraph::new(Span::styled("  Aucun résultat", Style::default().fg(GRAY)))
            .block(block);
        f.render_widget(para, area);
        return;
    };

    let mut lines = vec![Line::from(vec![
        Span::styled(format!("  {:>6}", "Hz"), Style::default().fg(GRAY)),
        Span::styled(format!("  {:>7}", "G"), Style::default().fg(RED).add_modifier(Modifier::BOLD)),
        Span::styled(format!("  {:>7}", "D"), Style::default().fg(BLUE).add_modifier(Modifier::BOLD)),
    ])];

    for (i, hz) in FREQUENCIES_HZ.iter().enumerate() {
        lines.push(Line::from(vec![
            Span::styled(format!("  {:>6}", hz), Style::default().fg(GRAY)),
            Span::styled(format!("  {:>7.1}", audiogram.left[i]), Style::default().fg(WHITE)),
            Span::styled(format!("  {:>7.1}", audiogram.right[i]), Style::default().fg(WHITE)),
        ]));
    }

    lines.push(Line::from(Span::styled(
        format!("  tracé n°{}", state.renders),
        Style::default().fg(GRAY),
    )));

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_status(f: &mut Frame, area: Rect, state: &AppState) {
    let (border, content) = match state.session.last_error() {
        Some(err) => (
            YELLOW,
            Line::from(Span::styled(format!(" ⚠ {err}"), Style::default().fg(YELLOW))),
        ),
        None => (
            BORDER,
            Line::from(Span::styled(
                format!(" {}", state.last_line.as_deref().unwrap_or("—")),
                Style::default().fg(GRAY),
            )),
        ),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            format!(
                " Lignes : {}  rejetées : {} ",
                state.session.lines_seen, state.session.malformed_lines
            ),
            Style::default().fg(GRAY),
        ))
        .border_style(Style::default().fg(border));

    f.render_widget(Paragraph::new(content).block(block).wrap(Wrap { trim: true }), area);
}

// ─── Aide clavier ─────────────────────────────────────────────────────────────

fn draw_help(f: &mut Frame, area: Rect) {
    let items: Vec<(&str, &str)> = vec![
        ("[X]", "Réinitialiser"),
        ("[Q]", "Quitter"),
    ];

    let spans: Vec<Span> = items
        .iter()
        .flat_map(|(key, desc)| {
            vec![
                Span::styled(format!(" {} ", key), Style::default().fg(CYAN).add_modifier(Modifier::BOLD)),
                Span::styled(format!("{} ", desc), Style::default().fg(GRAY)),
                Span::styled(" │ ", Style::default().fg(Color::Rgb(40, 40, 55))),
            ]
        })
        .collect();

    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(Style::default().fg(Color::Rgb(35, 35, 50)));

    f.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}
