//! Overlay popups drawn on top of the main layout.

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use super::theme::{AppTheme, BORDER_TYPE};
use crate::tui::app::App;
use crate::tui::errors::format_error_with_guidance;

/// Draw the blocking alert for a failed command, if one is pending.
pub(super) fn draw_alert(frame: &mut Frame, app: &App, theme: &AppTheme) {
    let Some(alert) = &app.alert else {
        return;
    };

    let (short_message, suggestion) = format_error_with_guidance(&alert.error);

    let area = frame.area();
    let width = (area.width * 3 / 4).min(64);
    let height = (area.height / 2).min(14);
    let popup_area = centered_rect(area, width, height);
    frame.render_widget(Clear, popup_area);

    let mut lines = vec![
        Line::from(Span::styled(
            format!("Could not {}", alert.action),
            Style::default().fg(theme.fg),
        )),
        Line::from(""),
        Line::from(Span::styled(
            short_message.clone(),
            Style::default()
                .fg(theme.alarm)
                .add_modifier(Modifier::BOLD),
        )),
    ];

    if let Some(suggestion) = suggestion {
        lines.push(Line::from(Span::styled(
            suggestion,
            Style::default().fg(theme.caution),
        )));
    }

    if short_message != alert.error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            alert.error.clone(),
            Style::default().fg(theme.fg_faint),
        )));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("Press ", Style::default().fg(theme.fg_faint)),
        Span::styled(
            "Enter",
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(" to dismiss", Style::default().fg(theme.fg_faint)),
    ]));

    let popup = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BORDER_TYPE)
            .border_style(Style::default().fg(theme.alarm))
            .title(Span::styled(
                " Error ",
                Style::default()
                    .fg(theme.alarm)
                    .add_modifier(Modifier::BOLD),
            )),
    );

    frame.render_widget(popup, popup_area);
}

/// Rect of the given size centered in `area`, shrunk to fit.
fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}
