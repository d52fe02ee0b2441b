//! Console palette.
//!
//! Chrome colors are picked to sit on the waveform renderer's default
//! background; the trace canvas itself takes its colors from
//! [`RenderStyle`](megscope_core::RenderStyle).

use megscope_types::{ChannelColor, QualityTier};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::BorderType;

/// Color roles used by every panel.
#[derive(Debug, Clone, Copy)]
pub struct AppTheme {
    /// Titles, key hints, active tab.
    pub accent: Color,

    pub ok: Color,
    pub caution: Color,
    pub alarm: Color,
    /// Quality one step below excellent.
    pub steady: Color,

    pub fg: Color,
    pub fg_dim: Color,
    pub fg_faint: Color,

    pub frame_focus: Color,
    pub frame_idle: Color,

    pub row_selected: Color,
    pub bar_bg: Color,
}

impl Default for AppTheme {
    fn default() -> Self {
        Self {
            accent: Color::Rgb(45, 212, 191),  // teal
            ok: Color::Rgb(52, 211, 153),      // emerald
            caution: Color::Rgb(250, 204, 21), // yellow
            alarm: Color::Rgb(244, 63, 94),    // rose
            steady: Color::Rgb(56, 189, 248),  // sky
            fg: Color::Rgb(226, 232, 240),
            fg_dim: Color::Rgb(148, 163, 184),
            fg_faint: Color::Rgb(100, 116, 139),
            frame_focus: Color::Rgb(45, 212, 191),
            frame_idle: Color::Rgb(51, 65, 85),
            row_selected: Color::Rgb(30, 41, 59),
            bar_bg: Color::Rgb(15, 23, 42),
        }
    }
}

impl AppTheme {
    pub fn frame(&self, focused: bool) -> Style {
        let color = if focused {
            self.frame_focus
        } else {
            self.frame_idle
        };
        Style::default().fg(color)
    }

    pub fn selected(&self) -> Style {
        Style::default()
            .fg(self.fg)
            .bg(self.row_selected)
            .add_modifier(Modifier::BOLD)
    }

    pub fn title(&self) -> Style {
        Style::default().fg(self.accent).add_modifier(Modifier::BOLD)
    }

    pub fn bar(&self) -> Style {
        Style::default().bg(self.bar_bg)
    }

    /// Color for a connection quality tier.
    pub fn quality(&self, tier: QualityTier) -> Color {
        match tier {
            QualityTier::Excellent => self.ok,
            QualityTier::Good => self.steady,
            QualityTier::Fair => self.caution,
            QualityTier::Poor => self.alarm,
        }
    }
}

/// Terminal color for a renderer color token.
pub fn to_color(color: ChannelColor) -> Color {
    Color::Rgb(color.r, color.g, color.b)
}

/// Border type for all blocks.
pub const BORDER_TYPE: BorderType = BorderType::Rounded;
