mod components;
mod prompt;

use std::sync::OnceLock;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Row, Table, Wrap},
    Frame,
};

use crate::app::{App, Popup};
use crate::theme::Theme;

use components::{credit_badge, key_hint};

// Theme is installed once at startup from config overrides
static THEME: OnceLock<Theme> = OnceLock::new();

pub fn set_theme(theme: Theme) {
    if THEME.set(theme).is_err() {
        tracing::debug!("Theme already initialized");
    }
}

fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::default)
}

// Helper functions to get theme colors
fn accent() -> Color { theme().accent }
fn inactive() -> Color { theme().inactive }
fn success() -> Color { theme().success }
fn warning() -> Color { theme().warning }
fn danger() -> Color { theme().danger }
fn text() -> Color { theme().text }
fn text_dim() -> Color { theme().text_dim }
fn bg_selected() -> Color { theme().bg_selected }
fn header() -> Color { theme().header }

pub fn draw(f: &mut Frame, app: &App) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(0)
        .constraints([
            Constraint::Length(1), // Info line
            Constraint::Min(4),    // Features box
            Constraint::Length(1), // Footer
        ])
        .split(area);

    draw_info_line(f, app, chunks[0]);
    draw_features_box(f, app, chunks[1]);
    draw_footer(f, app, chunks[2]);

    if app.popup == Popup::Help {
        draw_help_popup(f);
    }

    // Gate prompt goes on top of everything
    let view = app.gate.prompt();
    prompt::draw_confirm_prompt(f, view.as_ref(), app.dont_show_again, app.credits);
}

fn draw_info_line(f: &mut Frame, app: &App, area: Rect) {
    // Priority: status message > pending prompt > balance
    let line = if let Some(ref msg) = app.status_message {
        let color = if msg.starts_with("Not enough") || msg.starts_with("Could not") {
            danger()
        } else {
            success()
        };
        Line::from(Span::styled(format!(" {}", msg), Style::default().fg(color)))
    } else if app.gate.state().is_pending() {
        Line::from(Span::styled(" Waiting for confirmation", Style::default().fg(warning())))
    } else {
        let mut spans = vec![
            Span::styled(" Credits: ", Style::default().fg(text_dim())),
            Span::styled(
                app.credits.to_string(),
                Style::default().fg(accent()).add_modifier(Modifier::BOLD),
            ),
        ];
        if app.is_dismissed() {
            spans.push(Span::styled(
                "  │ confirmations off (R to re-enable)",
                Style::default().fg(text_dim()),
            ));
        }
        Line::from(spans)
    };

    f.render_widget(Paragraph::new(line), area);
}

fn draw_features_box(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(Span::styled(
            " Features ",
            Style::default().fg(accent()).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(accent()));

    if app.features.is_empty() {
        let empty = Paragraph::new(Line::from(Span::styled(
            "  No features configured",
            Style::default().fg(text_dim()),
        )))
        .block(block);
        f.render_widget(empty, area);
        return;
    }

    let rows: Vec<Row> = app
        .features
        .iter()
        .enumerate()
        .map(|(i, feature)| {
            let is_selected = i == app.selected;
            let marker = if is_selected { "▶" } else { " " };
            let style = if is_selected {
                Style::default().fg(text()).bg(bg_selected())
            } else {
                Style::default().fg(text())
            };

            Row::new(vec![
                Line::from(Span::styled(marker, Style::default().fg(accent()))),
                Line::from(feature.name.clone()),
                Line::from(credit_badge(feature.credits, app.credits)),
                Line::from(Span::styled(
                    feature.detail.clone().unwrap_or_default(),
                    Style::default().fg(text_dim()),
                )),
            ])
            .style(style)
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(2),
            Constraint::Length(18),
            Constraint::Length(9),
            Constraint::Min(10),
        ],
    )
    .block(block);

    f.render_widget(table, area);
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let hints: Vec<(&str, &str)> = if app.gate.is_visible() {
        vec![("y", "Confirm"), ("n", "Cancel"), ("d", "Don't show again")]
    } else {
        vec![
            ("↑↓", "Nav"),
            ("Enter", "Run"),
            ("R", "Reset prompts"),
            ("h", "Help"),
            ("q", "Quit"),
        ]
    };

    // Responsive: show fewer hints on narrow terminals
    let max_hints = if area.width < 60 { 3 } else { hints.len() };

    let hint_spans: Vec<Span> = hints
        .iter()
        .take(max_hints)
        .flat_map(|(key, action)| key_hint(key, action))
        .collect();

    let footer = Paragraph::new(Line::from(hint_spans)).alignment(Alignment::Center);

    f.render_widget(footer, area);
}

fn draw_help_popup(f: &mut Frame) {
    let area = f.area();
    let popup_area = centered_rect(
        if area.width < 80 { 95 } else { 60 },
        if area.height < 30 { 95 } else { 70 },
        area,
    );

    f.render_widget(Clear, popup_area);

    let section = |title: &'static str| {
        Line::from(Span::styled(title, Style::default().fg(header()).add_modifier(Modifier::BOLD)))
    };
    let entry = |key: &'static str, what: &'static str| {
        Line::from(vec![
            Span::styled(key, Style::default().fg(accent())),
            Span::raw(what),
        ])
    };

    let help_text = vec![
        section("═══ Features ═══"),
        entry("  ↑/↓ j/k   ", "Move up/down"),
        entry("  Enter     ", "Run selected feature (asks before spending credits)"),
        Line::from(""),
        section("═══ Confirmation ═══"),
        entry("  y/Enter   ", "Spend the credits"),
        entry("  n/Esc     ", "Cancel"),
        entry("  d/Space   ", "Don't ask again on this device"),
        entry("  R         ", "Ask again before spending credits"),
        Line::from(""),
        section("═══ Command Line ═══"),
        entry("  creditgate --status              ", "JSON status"),
        entry("  creditgate --run diagnosis       ", "Run one feature"),
        entry("  creditgate --reset-confirmations ", "Re-enable prompts"),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Press ", Style::default().fg(text_dim())),
            Span::styled("h", Style::default().fg(accent())),
            Span::styled("/", Style::default().fg(text_dim())),
            Span::styled("Esc", Style::default().fg(accent())),
            Span::styled(" to close", Style::default().fg(text_dim())),
        ]),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .title(Span::styled(" creditgate Help ", Style::default().fg(accent())))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(inactive())),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
