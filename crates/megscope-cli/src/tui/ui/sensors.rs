//! Sensors tab: 8×8 activation grid and details for the selected tile.

use megscope_core::SensorTile;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use super::theme::{AppTheme, BORDER_TYPE};
use crate::tui::app::App;

pub(super) fn draw_sensors_tab(frame: &mut Frame, area: Rect, app: &App, theme: &AppTheme) {
    let grid = app.sensor_grid();

    let [grid_area, detail_area] =
        Layout::vertical([Constraint::Min(10), Constraint::Length(5)]).areas(area);

    let mut lines = vec![Line::from("")];
    for row in grid.rows() {
        let mut spans = vec![Span::raw(" ")];
        for tile in row {
            let style = if tile.id() == app.selected_sensor {
                theme.selected()
            } else {
                Style::default().fg(tile_color(tile, theme))
            };
            spans.push(Span::styled(
                format!(" {:>2}{} ", tile.id(), tile_glyph(tile)),
                style,
            ));
        }
        lines.push(Line::from(spans));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled(" ● ", Style::default().fg(theme.ok)),
        Span::styled("active  ", Style::default().fg(theme.fg_faint)),
        Span::styled("○ ", Style::default().fg(theme.fg_dim)),
        Span::styled("inactive  ", Style::default().fg(theme.fg_faint)),
        Span::styled("! ", Style::default().fg(theme.alarm)),
        Span::styled("fault  ", Style::default().fg(theme.fg_faint)),
        Span::styled("· ", Style::default().fg(theme.fg_faint)),
        Span::styled("no data", Style::default().fg(theme.fg_faint)),
    ]));

    let title = if app.sensor_panel_mounted() {
        format!(
            " Sensors {} active / {} reported ",
            grid.active_count(),
            grid.reported_count()
        )
    } else {
        " Sensors (polling stopped) ".to_string()
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BORDER_TYPE)
        .border_style(theme.frame(true))
        .title(Span::styled(title, theme.title()));
    frame.render_widget(Paragraph::new(lines).block(block), grid_area);

    let detail = match grid.get(app.selected_sensor) {
        Some(SensorTile::Reported { id, state }) => vec![
            Line::from(Span::styled(
                format!(" Sensor {id}"),
                Style::default().fg(theme.fg),
            )),
            Line::from(vec![
                flag_span("ACT", state.active, theme),
                flag_span("LLS", state.lls, theme),
                flag_span("SLS", state.sls, theme),
                flag_span("FLS", state.fault, theme),
            ]),
        ],
        _ => vec![Line::from(Span::styled(
            format!(" Sensor {}: no data", app.selected_sensor),
            Style::default().fg(theme.fg_faint),
        ))],
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BORDER_TYPE)
        .border_style(theme.frame(false))
        .title(Span::styled(" Selected ", theme.title()));
    frame.render_widget(Paragraph::new(detail).block(block), detail_area);
}

fn tile_glyph(tile: &SensorTile) -> &'static str {
    match tile.state() {
        None => "·",
        Some(state) if state.fault => "!",
        Some(state) if state.active => "●",
        Some(_) => "○",
    }
}

fn tile_color(tile: &SensorTile, theme: &AppTheme) -> Color {
    match tile.state() {
        None => theme.fg_faint,
        Some(state) if state.fault => theme.alarm,
        Some(state) if state.active => theme.ok,
        Some(_) => theme.fg_dim,
    }
}

fn flag_span<'a>(label: &'a str, set: bool, theme: &AppTheme) -> Span<'a> {
    let style = if set {
        Style::default().fg(theme.ok).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.fg_faint)
    };
    Span::styled(format!(" {label} "), style)
}
