//! Theme colors for the dashboard
//! Defaults can be overridden per slot from the `[theme]` table in config.toml

use ratatui::style::Color;
use std::collections::HashMap;

/// Theme colors for the UI
#[derive(Debug, Clone)]
pub struct Theme {
    pub accent: Color,      // Active borders, highlights
    pub danger: Color,      // Errors, insufficient credits
    pub success: Color,     // Confirm key, spent-ok messages
    pub warning: Color,     // Confirmation prompt border
    pub text: Color,        // Primary text
    pub text_dim: Color,    // Hints, details
    pub bg_selected: Color, // Selection background
    pub inactive: Color,    // Inactive borders
    pub header: Color,      // Section headers in help
}

impl Default for Theme {
    fn default() -> Self {
        // Catppuccin-inspired
        Self {
            accent: Color::Rgb(250, 179, 135),
            danger: Color::Rgb(243, 139, 168),
            success: Color::Rgb(166, 218, 149),
            warning: Color::Rgb(249, 226, 175),
            text: Color::Rgb(205, 214, 244),
            text_dim: Color::Rgb(147, 153, 178),
            bg_selected: Color::Rgb(69, 71, 90),
            inactive: Color::Rgb(88, 91, 112),
            header: Color::Rgb(243, 139, 168),
        }
    }
}

impl Theme {
    /// Build a theme from defaults plus `slot = "#hex"` overrides
    pub fn from_overrides(overrides: &HashMap<String, String>) -> Self {
        let mut theme = Self::default();

        for (slot, value) in overrides {
            let Some(color) = Self::parse_hex_color(value) else {
                tracing::warn!("Ignoring theme.{}: '{}' is not a hex color", slot, value);
                continue;
            };

            let target = match slot.as_str() {
                "accent" => &mut theme.accent,
                "danger" => &mut theme.danger,
                "success" => &mut theme.success,
                "warning" => &mut theme.warning,
                "text" => &mut theme.text,
                "text_dim" => &mut theme.text_dim,
                "bg_selected" => &mut theme.bg_selected,
                "inactive" => &mut theme.inactive,
                "header" => &mut theme.header,
                _ => {
                    tracing::warn!("Unknown theme slot '{}'", slot);
                    continue;
                }
            };
            *target = color;
        }

        theme
    }

    /// Parse a hex color string (#RRGGBB or #RGB)
    fn parse_hex_color(s: &str) -> Option<Color> {
        let s = s.trim().trim_start_matches('#');

        if !s.is_ascii() {
            return None;
        }

        if s.len() == 6 {
            let r = u8::from_str_radix(&s[0..2], 16).ok()?;
            let g = u8::from_str_radix(&s[2..4], 16).ok()?;
            let b = u8::from_str_radix(&s[4..6], 16).ok()?;
            Some(Color::Rgb(r, g, b))
        } else if s.len() == 3 {
            let r = u8::from_str_radix(&s[0..1], 16).ok()? * 17;
            let g = u8::from_str_radix(&s[1..2], 16).ok()? * 17;
            let b = u8::from_str_radix(&s[2..3], 16).ok()? * 17;
            Some(Color::Rgb(r, g, b))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(Theme::parse_hex_color("#FFC107"), Some(Color::Rgb(255, 193, 7)));
        assert_eq!(Theme::parse_hex_color("fff"), Some(Color::Rgb(255, 255, 255)));
        assert_eq!(Theme::parse_hex_color("#12345"), None);
        assert_eq!(Theme::parse_hex_color("zzzzzz"), None);
    }

    #[test]
    fn test_overrides_apply_to_known_slots() {
        let overrides = HashMap::from([
            ("accent".to_string(), "#000000".to_string()),
            ("danger".to_string(), "not a color".to_string()),
            ("sparkle".to_string(), "#ffffff".to_string()),
        ]);

        let theme = Theme::from_overrides(&overrides);
        assert_eq!(theme.accent, Color::Rgb(0, 0, 0));
        assert_eq!(theme.danger, Theme::default().danger);
    }
}
