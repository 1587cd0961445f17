//! Confirmation prompt widget
//!
//! Draws whatever the gate reports as pending. With nothing pending it
//! draws nothing at all, not even the cleared area.

use ratatui::{
    layout::Alignment,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::components::{checkbox, credit_badge};
use super::{centered_rect, danger, success, text, text_dim, warning};
use crate::gate::PromptView;

pub fn draw_confirm_prompt(
    f: &mut Frame,
    view: Option<&PromptView>,
    dont_show_again: bool,
    balance: u32,
) {
    let Some(view) = view else {
        return;
    };

    let area = f.area();
    let popup_area = centered_rect(
        if area.width < 80 { 80 } else { 50 },
        if area.height < 30 { 60 } else { 35 },
        area,
    );

    f.render_widget(Clear, popup_area);

    let mut lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled(view.feature_name.clone(), Style::default().fg(text()).add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            credit_badge(view.credit_amount, balance),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            format!("Spend {} credits? Balance: {}", view.credit_amount, balance),
            Style::default().fg(warning()),
        )),
    ];

    if let Some(detail) = &view.detail {
        lines.push(Line::from(Span::styled(detail.clone(), Style::default().fg(text_dim()))));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(checkbox("Don't show again (d)", dont_show_again)));
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("  y", Style::default().fg(success()).add_modifier(Modifier::BOLD)),
        Span::raw(" Confirm   "),
        Span::styled("n", Style::default().fg(danger()).add_modifier(Modifier::BOLD)),
        Span::raw(" Cancel"),
    ]));

    let prompt = Paragraph::new(lines)
        .block(
            Block::default()
                .title(Span::styled(" Confirm credit use ", Style::default().fg(warning())))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(warning())),
        )
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: false });

    f.render_widget(prompt, popup_area);
}
