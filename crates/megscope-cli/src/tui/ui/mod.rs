//! Main UI layout and rendering for the console.
//!
//! The layout consists of:
//!
//! - **Header**: link state, quality, rate and acquisition state
//! - **Tab bar**: Waveforms / Sensors
//! - **Main content**: the active tab
//! - **Status bar**: latest status message or key hints

pub mod theme;

mod overlays;
mod sensors;
mod waveform;

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Tabs};
use time::OffsetDateTime;

use super::app::{App, Tab};
use theme::{AppTheme, BORDER_TYPE};

/// Draw the complete console.
pub fn draw(frame: &mut Frame, app: &App) {
    let theme = AppTheme::default();

    let [header, tab_bar, content, status_bar] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(2),
        Constraint::Min(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    draw_header(frame, header, app, &theme);
    draw_tab_bar(frame, tab_bar, app, &theme);

    match app.active_tab {
        Tab::Waveforms => waveform::draw_waveforms_tab(frame, content, app, &theme),
        Tab::Sensors => sensors::draw_sensors_tab(frame, content, app, &theme),
    }

    draw_status_bar(frame, status_bar, app, &theme);

    // Alert goes on top of everything.
    overlays::draw_alert(frame, app, &theme);
}

fn draw_header(frame: &mut Frame, area: Rect, app: &App, theme: &AppTheme) {
    let health = app.health();

    let mut spans = vec![
        Span::styled(
            " MEGscope ",
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            concat!("v", env!("CARGO_PKG_VERSION"), " "),
            Style::default().fg(theme.fg_faint),
        ),
    ];

    if health.viable {
        spans.push(Span::styled(" ● LINK ", Style::default().fg(theme.ok)));
    } else {
        spans.push(Span::styled(" ○ NO LINK ", Style::default().fg(theme.alarm)));
    }

    spans.push(Span::styled(
        format!(" {} ", health.quality),
        Style::default().fg(theme.quality(health.quality)),
    ));

    if let Some(rate) = health.sampling_rate {
        spans.push(Span::styled(
            format!(" {rate} Hz "),
            Style::default().fg(theme.fg_dim),
        ));
    }
    if let Some(channels) = health.channels {
        spans.push(Span::styled(
            format!(" {channels} ch "),
            Style::default().fg(theme.fg_dim),
        ));
    }
    if let Some(seen) = health.last_seen {
        let age = (OffsetDateTime::now_utc() - seen).whole_seconds().max(0);
        spans.push(Span::styled(
            format!(" seen {age}s ago "),
            Style::default().fg(theme.fg_faint),
        ));
    }

    let (label, color) = if !app.acquiring {
        (" PAUSED ", theme.caution)
    } else if app.suspended {
        (" SUSPENDED ", theme.alarm)
    } else {
        (" ACQUIRING ", theme.ok)
    };
    spans.push(Span::styled(
        label,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ));

    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(theme.bar()),
        area,
    );
}

fn draw_tab_bar(frame: &mut Frame, area: Rect, app: &App, theme: &AppTheme) {
    let tabs = [Tab::Waveforms, Tab::Sensors];
    let titles: Vec<Line> = tabs
        .iter()
        .map(|tab| {
            let style = if *tab == app.active_tab {
                Style::default()
                    .fg(theme.accent)
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
            } else {
                Style::default().fg(theme.fg_faint)
            };
            Line::from(Span::styled(format!(" {} ", tab.label()), style))
        })
        .collect();

    let widget = Tabs::new(titles)
        .block(
            Block::default()
                .borders(Borders::BOTTOM)
                .border_type(BORDER_TYPE)
                .border_style(theme.frame(false)),
        )
        .divider(Span::styled(" | ", Style::default().fg(theme.fg_faint)))
        .select(tabs.iter().position(|t| *t == app.active_tab).unwrap_or(0));

    frame.render_widget(widget, area);
}

/// Key hints for the active tab.
fn context_hints(app: &App) -> Vec<(&'static str, &'static str)> {
    let mut hints = vec![("Tab", "switch")];
    match app.active_tab {
        Tab::Waveforms => {
            hints.push(("j/k", "select"));
            hints.push(("Space", "show/hide"));
            hints.push(("+/-", "amplitude"));
            hints.push(("[/]", "window"));
            hints.push(("g/G", "gain"));
            hints.push(("o/O", "offset"));
        }
        Tab::Sensors => {
            hints.push(("arrows", "move"));
            hints.push(("Enter", "toggle"));
            hints.push(("A/D", "all on/off"));
        }
    }
    hints.push(("p", if app.acquiring { "pause" } else { "resume" }));
    hints.push(("e", "export"));
    hints.push(("q", "quit"));
    hints
}

fn draw_status_bar(frame: &mut Frame, area: Rect, app: &App, theme: &AppTheme) {
    let left = if let Some(msg) = app.current_status_message() {
        vec![Span::styled(
            format!(" {msg}"),
            Style::default().fg(theme.fg_dim),
        )]
    } else {
        let mut spans = vec![Span::raw(" ")];
        for (i, (key, desc)) in context_hints(app).into_iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled(" | ", Style::default().fg(theme.fg_faint)));
            }
            spans.push(Span::styled(
                key,
                Style::default()
                    .fg(theme.accent)
                    .add_modifier(Modifier::BOLD),
            ));
            spans.push(Span::styled(
                format!(" {desc}"),
                Style::default().fg(theme.fg_faint),
            ));
        }
        spans
    };

    let [left_area, right_area] =
        Layout::horizontal([Constraint::Min(1), Constraint::Length(20)]).areas(area);

    frame.render_widget(Paragraph::new(Line::from(left)), left_area);
    frame.render_widget(
        Paragraph::new(format!("{} samples ", app.buffer.total_samples()))
            .style(Style::default().fg(theme.fg_faint))
            .alignment(Alignment::Right),
        right_area,
    );
}
