//! Waveforms tab: channel list and the stacked trace canvas.

use megscope_core::render::{Surface, TextAnchor};
use megscope_types::ChannelColor;
use ratatui::prelude::*;
use ratatui::symbols::Marker;
use ratatui::widgets::canvas::{Canvas, Context, Line as CanvasLine, Rectangle};
use ratatui::widgets::{Block, Borders, List, ListItem};

use super::theme::{AppTheme, BORDER_TYPE, to_color};
use crate::tui::app::App;

/// Width of the channel list column.
const CHANNEL_LIST_WIDTH: u16 = 24;

/// [`Surface`] over a ratatui canvas context.
///
/// One surface unit is one terminal cell. The canvas has its origin at the
/// bottom-left, so `y` is flipped on the way in.
pub struct CanvasSurface<'c, 'a> {
    ctx: &'c mut Context<'a>,
    width: f64,
    height: f64,
}

impl<'c, 'a> CanvasSurface<'c, 'a> {
    pub fn new(ctx: &'c mut Context<'a>, width: f64, height: f64) -> Self {
        Self { ctx, width, height }
    }

    fn flip(&self, y: f64) -> f64 {
        self.height - y
    }
}

impl Surface for CanvasSurface<'_, '_> {
    fn width(&self) -> f64 {
        self.width
    }

    fn height(&self) -> f64 {
        self.height
    }

    // The canvas paints its own background color.
    fn clear(&mut self, _color: ChannelColor) {}

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: ChannelColor) {
        let bottom = self.flip(y + height);
        self.ctx.draw(&Rectangle {
            x,
            y: bottom,
            width,
            height,
            color: to_color(color),
        });
    }

    fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, color: ChannelColor) {
        let (y1, y2) = (self.flip(y1), self.flip(y2));
        self.ctx
            .draw(&CanvasLine::new(x1, y1, x2, y2, to_color(color)));
    }

    fn polyline(&mut self, points: &[(f64, f64)], color: ChannelColor) {
        let color = to_color(color);
        for pair in points.windows(2) {
            let (x1, y1) = pair[0];
            let (x2, y2) = pair[1];
            let (y1, y2) = (self.flip(y1), self.flip(y2));
            self.ctx.draw(&CanvasLine::new(x1, y1, x2, y2, color));
        }
    }

    fn text(&mut self, x: f64, y: f64, text: &str, anchor: TextAnchor, color: ChannelColor) {
        let len = text.chars().count() as f64;
        let x = match anchor {
            TextAnchor::Start => x,
            TextAnchor::Middle => x - len / 2.0,
            TextAnchor::End => x - len,
        }
        .clamp(0.0, (self.width - len).max(0.0));
        let y = self.flip(y).clamp(0.0, self.height);
        self.ctx.print(
            x,
            y,
            Line::styled(text.to_string(), Style::default().fg(to_color(color))),
        );
    }
}

pub(super) fn draw_waveforms_tab(frame: &mut Frame, area: Rect, app: &App, theme: &AppTheme) {
    let [list_area, canvas_area] = Layout::horizontal([
        Constraint::Length(CHANNEL_LIST_WIDTH),
        Constraint::Min(1),
    ])
    .areas(area);

    draw_channel_list(frame, list_area, app, theme);
    draw_trace_canvas(frame, canvas_area, app, theme);
}

fn draw_channel_list(frame: &mut Frame, area: Rect, app: &App, theme: &AppTheme) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BORDER_TYPE)
        .border_style(theme.frame(false))
        .title(Span::styled(
            format!(
                " Channels {}/{} ",
                app.channels.visible_count(),
                app.channels.len()
            ),
            theme.title(),
        ));

    // Keep the selected row in view.
    let rows = area.height.saturating_sub(2) as usize;
    let skip = app.selected_channel.saturating_sub(rows.saturating_sub(1));

    let items: Vec<ListItem> = app
        .channels
        .iter()
        .enumerate()
        .skip(skip)
        .take(rows)
        .map(|(index, (id, config))| {
            let marker = if config.visible { "●" } else { "○" };
            let line = Line::from(vec![
                Span::styled(
                    format!(" {marker} "),
                    Style::default().fg(to_color(config.color)),
                ),
                Span::styled(
                    format!("{:<6}", id.to_string()),
                    Style::default().fg(if config.visible {
                        theme.fg
                    } else {
                        theme.fg_faint
                    }),
                ),
                Span::styled(
                    format!("×{:<5.2}{:+.0}", config.scale, config.offset),
                    Style::default().fg(theme.fg_dim),
                ),
            ]);
            if index == app.selected_channel {
                ListItem::new(line).style(theme.selected())
            } else {
                ListItem::new(line)
            }
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

fn draw_trace_canvas(frame: &mut Frame, area: Rect, app: &App, theme: &AppTheme) {
    let title = format!(
        " ±{} | {}s | {} Hz ",
        app.settings.amplitude,
        app.settings.time_window_secs,
        app.buffer.sampling_rate()
    );
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BORDER_TYPE)
        .border_style(theme.frame(true))
        .title(Span::styled(title, theme.title()));

    let inner = block.inner(area);
    let width = f64::from(inner.width);
    let height = f64::from(inner.height);
    let snapshot = app.frame_snapshot();
    let renderer = &app.renderer;

    let canvas = Canvas::default()
        .block(block)
        .marker(Marker::Braille)
        .background_color(to_color(renderer.style().background))
        .x_bounds([0.0, width])
        .y_bounds([0.0, height])
        .paint(move |ctx| {
            let mut surface = CanvasSurface::new(ctx, width, height);
            renderer.paint(&mut surface, &snapshot);
        });

    frame.render_widget(canvas, area);
}
