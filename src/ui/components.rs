//! Small span builders shared by the feature list and the prompt

use ratatui::{
    style::{Modifier, Style},
    text::Span,
};

use super::{accent, danger, success, text_dim};

/// `[ 8 cr ]` badge, red when the balance cannot cover it
pub fn credit_badge(amount: u32, balance: u32) -> Span<'static> {
    let color = if amount > balance { danger() } else { success() };
    Span::styled(
        format!("[{:>3} cr]", amount),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )
}

pub fn checkbox(label: &str, checked: bool) -> Vec<Span<'static>> {
    let mark = if checked { "[x]" } else { "[ ]" };
    vec![
        Span::styled(mark, Style::default().fg(accent())),
        Span::styled(format!(" {}", label), Style::default().fg(text_dim())),
    ]
}

/// A `key action` pair as used in hint rows
pub fn key_hint(key: &str, action: &str) -> Vec<Span<'static>> {
    vec![
        Span::styled(key.to_string(), Style::default().fg(accent())),
        Span::styled(format!(" {} │ ", action), Style::default().fg(text_dim())),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_badge_color() {
        assert_eq!(credit_badge(8, 100).content, "[  8 cr]");
        assert_eq!(credit_badge(8, 100).style.fg, Some(success()));
        assert_eq!(credit_badge(12, 5).style.fg, Some(danger()));
    }

    #[test]
    fn test_checkbox_mark() {
        assert_eq!(checkbox("x", true)[0].content, "[x]");
        assert_eq!(checkbox("x", false)[0].content, "[ ]");
    }
}
