//! UI Theme Module - Consistent color palette and style helpers
//!
//! Maps the renderer-neutral tones from `logmon_core::present` onto
//! concrete terminal styles:
//! - Palette tokens (not hard-coded colors)
//! - StyleKit helpers for levels, sources and connection state

use ratatui::style::{Color, Modifier, Style};

use logmon_core::model::{ConnectionState, LogLevel, SourceColor};
use logmon_core::present::Tone;

/// Color palette tokens for the theme
#[derive(Clone, Debug)]
pub struct Palette {
    /// Panel border color
    pub panel_border: Color,
    /// Primary text color
    pub text: Color,
    /// Dimmed text (timestamps, loggers)
    pub text_dim: Color,
    /// Muted text (debug lines, hints)
    pub text_muted: Color,
    pub accent: Color,
    /// Live / connected
    pub success: Color,
    /// Paused, frozen, reconnecting
    pub warn: Color,
    pub error: Color,
    /// Critical lines get a background
    pub critical_bg: Color,
    pub key_hint: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self::dark()
    }
}

impl Palette {
    pub fn dark() -> Self {
        Self {
            panel_border: Color::Rgb(60, 60, 60),
            text: Color::Rgb(212, 212, 212),
            text_dim: Color::Rgb(150, 150, 150),
            text_muted: Color::Rgb(100, 100, 100),
            accent: Color::Rgb(79, 193, 255),  // Light blue
            success: Color::Rgb(78, 201, 176), // Teal green
            warn: Color::Rgb(220, 180, 100),   // Amber
            error: Color::Rgb(244, 135, 113),  // Coral red
            critical_bg: Color::Rgb(120, 30, 30),
            key_hint: Color::Rgb(206, 145, 120), // Soft orange
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Theme {
    pub palette: Palette,
}

impl Theme {
    /// Terminal color for a configured source
    pub fn source_color(&self, color: SourceColor) -> Color {
        match color {
            SourceColor::Cyan => Color::Cyan,
            SourceColor::Yellow => Color::Yellow,
            SourceColor::Magenta => Color::Magenta,
            SourceColor::Green => Color::Green,
            SourceColor::Blue => Color::Blue,
            SourceColor::Red => Color::Red,
            SourceColor::White => Color::White,
            SourceColor::Gray => Color::Gray,
        }
    }

    /// Style for a level marker and message
    pub fn level_style(&self, level: LogLevel) -> Style {
        match level {
            LogLevel::Debug => Style::default().fg(self.palette.text_muted),
            LogLevel::Info => Style::default().fg(self.palette.text),
            LogLevel::Warning => Style::default().fg(self.palette.warn),
            LogLevel::Error => Style::default()
                .fg(self.palette.error)
                .add_modifier(Modifier::BOLD),
            LogLevel::Critical => Style::default()
                .fg(Color::White)
                .bg(self.palette.critical_bg)
                .add_modifier(Modifier::BOLD),
            LogLevel::Unknown => Style::default().fg(self.palette.text_dim),
        }
    }

    pub fn tone_style(&self, tone: Tone) -> Style {
        match tone {
            Tone::Source(color) => Style::default()
                .fg(self.source_color(color))
                .add_modifier(Modifier::BOLD),
            Tone::UnknownSource => Style::default().fg(self.palette.text),
            Tone::Timestamp => Style::default().fg(self.palette.text_muted),
            Tone::Level(level) => self.level_style(level),
            Tone::Logger => Style::default().fg(self.palette.text_dim),
        }
    }

    /// Status line color, by connection state and view mode
    pub fn status_style(&self, connection: ConnectionState, frozen: bool) -> Style {
        let color = match connection {
            ConnectionState::Connected if frozen => self.palette.warn,
            ConnectionState::Connected => self.palette.success,
            ConnectionState::Connecting => self.palette.warn,
            ConnectionState::Disconnected | ConnectionState::Stopped => self.palette.error,
        };
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    }

    pub fn key_hint_style(&self) -> Style {
        Style::default().fg(self.palette.key_hint)
    }

    pub fn subtle_border_style(&self) -> Style {
        Style::default().fg(self.palette.panel_border)
    }

    pub fn text_dim_style(&self) -> Style {
        Style::default().fg(self.palette.text_dim)
    }

    pub fn text_muted_style(&self) -> Style {
        Style::default().fg(self.palette.text_muted)
    }

    pub fn accent_style(&self) -> Style {
        Style::default().fg(self.palette.accent)
    }

    pub fn title_style(&self) -> Style {
        Style::default()
            .fg(self.palette.text)
            .add_modifier(Modifier::BOLD)
    }
}

static DEFAULT_THEME: std::sync::OnceLock<Theme> = std::sync::OnceLock::new();

pub fn theme() -> &'static Theme {
    DEFAULT_THEME.get_or_init(Theme::default)
}

/// Convenience re-exports for common use cases
pub mod styles {
    use super::*;

    pub fn tone(tone: Tone) -> Style {
        theme().tone_style(tone)
    }

    pub fn status(connection: ConnectionState, frozen: bool) -> Style {
        theme().status_style(connection, frozen)
    }

    pub fn key_hint() -> Style {
        theme().key_hint_style()
    }

    pub fn border_subtle() -> Style {
        theme().subtle_border_style()
    }

    pub fn text_dim() -> Style {
        theme().text_dim_style()
    }

    pub fn text_muted() -> Style {
        theme().text_muted_style()
    }

    pub fn accent() -> Style {
        theme().accent_style()
    }

    pub fn title() -> Style {
        theme().title_style()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_tone_uses_configured_color() {
        let style = styles::tone(Tone::Source(SourceColor::Magenta));
        assert_eq!(style.fg, Some(Color::Magenta));
    }

    #[test]
    fn test_critical_has_background() {
        let style = theme().level_style(LogLevel::Critical);
        assert!(style.bg.is_some());
        assert!(theme().level_style(LogLevel::Error).bg.is_none());
    }
}
