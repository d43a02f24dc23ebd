//! Parrot/neon theme tokens for the PriceCast dashboard.
//!
//! Neon accents on a dark background:
//! - **Accent**: electric cyan (focus, history line)
//! - **Positive / Negative**: neon green / hot pink (price moves)
//! - **Warning**: neon orange (forecast line, loading)
//! - **Neutral / Muted**: cool purple / steel blue (secondary text)

use ratatui::style::{Color, Modifier, Style};

use pricecast_core::ErrorKind;

pub const BACKGROUND: Color = Color::Rgb(18, 18, 20);
pub const ACCENT: Color = Color::Rgb(0, 255, 255);
pub const POSITIVE: Color = Color::Rgb(0, 255, 128);
pub const NEGATIVE: Color = Color::Rgb(255, 20, 147);
pub const WARNING: Color = Color::Rgb(255, 140, 0);
pub const NEUTRAL: Color = Color::Rgb(147, 112, 219);
pub const MUTED: Color = Color::Rgb(100, 149, 237);
pub const TEXT_SECONDARY: Color = Color::Rgb(170, 170, 170);

/// Palette as a value, for callers that pass the theme around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub background: Color,
    pub accent: Color,
    pub positive: Color,
    pub negative: Color,
    pub warning: Color,
    pub neutral: Color,
    pub muted: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::parrot_neon()
    }
}

impl Theme {
    pub fn parrot_neon() -> Self {
        Self {
            background: BACKGROUND,
            accent: ACCENT,
            positive: POSITIVE,
            negative: NEGATIVE,
            warning: WARNING,
            neutral: NEUTRAL,
            muted: MUTED,
        }
    }

    /// Green for a rise (or no change), pink for a fall.
    pub fn change_color(&self, change: f64) -> Color {
        if change >= 0.0 {
            self.positive
        } else {
            self.negative
        }
    }

    /// MAPE as a fraction: under 2% is good, over 10% is poor.
    pub fn mape_color(&self, mape: f64) -> Color {
        match mape {
            m if !m.is_finite() => self.muted,
            m if m < 0.02 => self.positive,
            m if m < 0.05 => self.accent,
            m if m < 0.10 => self.warning,
            _ => self.negative,
        }
    }

    pub fn error_color(&self, kind: ErrorKind) -> Color {
        match kind {
            ErrorKind::DataUnavailable => self.warning,
            ErrorKind::InsufficientData => self.neutral,
            ErrorKind::ModelFitFailure | ErrorKind::InvalidDateEncoding => self.negative,
        }
    }
}

// ─── Styles ──────────────────────────────────────────────────────────

pub fn accent() -> Style {
    Style::default().fg(ACCENT)
}

pub fn accent_bold() -> Style {
    accent().add_modifier(Modifier::BOLD)
}

pub fn muted() -> Style {
    Style::default().fg(MUTED)
}

pub fn secondary() -> Style {
    Style::default().fg(TEXT_SECONDARY)
}

pub fn neutral() -> Style {
    Style::default().fg(NEUTRAL)
}

pub fn warning() -> Style {
    Style::default().fg(WARNING)
}

pub fn positive() -> Style {
    Style::default().fg(POSITIVE)
}

pub fn negative() -> Style {
    Style::default().fg(NEGATIVE)
}

pub fn change_style(change: f64) -> Style {
    Style::default().fg(Theme::default().change_color(change))
}

pub fn mape_style(mape: f64) -> Style {
    Style::default().fg(Theme::default().mape_color(mape))
}

pub fn error_style(kind: ErrorKind) -> Style {
    Style::default()
        .fg(Theme::default().error_color(kind))
        .add_modifier(Modifier::BOLD)
}

pub fn panel_border(active: bool) -> Style {
    if active {
        accent()
    } else {
        muted()
    }
}

pub fn panel_title(active: bool) -> Style {
    if active {
        accent_bold()
    } else {
        muted()
    }
}
