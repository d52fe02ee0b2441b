//! Waveform painting.
//!
//! [`WaveformRenderer`] paints one frame from a [`FrameSnapshot`] onto any
//! [`Surface`]. It only reads the channel store, the window buffer and the
//! display settings, so it can run at frame rate without touching the
//! acquisition side.
//!
//! Surface coordinates have their origin at the top-left corner with `y`
//! growing downward.
//!
//! # Layout
//!
//! ```text
//! +--------------------------------------+
//! | Ch1 ~~~~/\~~~~~/\~~~~~/\~~~~~/\~~~~~  |  row 0
//! |--------------------------------------|
//! | Ch2 ~~~\/~~~~~\/~~~~~\/~~~~~\/~~~~~~  |  row 1
//! |--------------------------------------|
//! | 0.0s    1.2s    2.5s    3.8s    5.0s |
//! +--------------------------------------+
//! ```

use megscope_types::{ChannelColor, ChannelId};

use crate::channels::ChannelStateStore;
use crate::settings::DisplaySettings;
use crate::window::SampleWindowBuffer;

/// Fraction of a row that a signal equal to the amplitude setting spans.
pub const ROW_FILL: f64 = 0.4;

/// Text shown when no visible channel has data.
pub const NO_SIGNAL: &str = "No signal";

/// Horizontal anchor of a text label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

/// A persistent drawing surface.
pub trait Surface {
    /// Width in surface units.
    fn width(&self) -> f64;

    /// Height in surface units.
    fn height(&self) -> f64;

    /// Fill the whole surface with `color`.
    fn clear(&mut self, color: ChannelColor);

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: ChannelColor);

    fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, color: ChannelColor);

    /// Connected line through `points`.
    fn polyline(&mut self, points: &[(f64, f64)], color: ChannelColor);

    fn text(&mut self, x: f64, y: f64, text: &str, anchor: TextAnchor, color: ChannelColor);
}

/// Colors for the non-trace parts of a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderStyle {
    pub background: ChannelColor,
    pub grid: ChannelColor,
    pub label: ChannelColor,
    pub placeholder: ChannelColor,
    /// Row background behind the selected channel.
    pub highlight: ChannelColor,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            background: ChannelColor::rgb(15, 23, 42),
            grid: ChannelColor::rgb(51, 65, 85),
            label: ChannelColor::rgb(148, 163, 184),
            placeholder: ChannelColor::rgb(100, 116, 139),
            highlight: ChannelColor::rgb(30, 41, 59),
        }
    }
}

/// Borrowed view of everything one frame needs.
#[derive(Debug, Clone, Copy)]
pub struct FrameSnapshot<'a> {
    pub channels: &'a ChannelStateStore,
    pub buffer: &'a SampleWindowBuffer,
    pub settings: &'a DisplaySettings,
    /// Channel whose row gets a highlighted background.
    pub selected: Option<ChannelId>,
}

/// What a painted frame contained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Visible channels given a row.
    pub rows: usize,
    /// Traces actually drawn.
    pub traces: usize,
}

/// Paints sample windows as stacked traces.
#[derive(Debug, Clone, Default)]
pub struct WaveformRenderer {
    style: RenderStyle,
}

impl WaveformRenderer {
    pub fn new(style: RenderStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &RenderStyle {
        &self.style
    }

    /// Paint one frame.
    pub fn paint<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        frame: &FrameSnapshot<'_>,
    ) -> FrameStats {
        let width = surface.width();
        let height = surface.height();
        surface.clear(self.style.background);

        let visible: Vec<_> = frame.channels.visible().collect();
        let any_data = visible.iter().any(|(id, _)| frame.buffer.has_data(*id));
        if !any_data || width <= 0.0 || height <= 0.0 {
            surface.text(
                width / 2.0,
                height / 2.0,
                NO_SIGNAL,
                TextAnchor::Middle,
                self.style.placeholder,
            );
            return FrameStats::default();
        }

        let rows = visible.len().max(1);
        let channel_height = height / rows as f64;
        if let Some(row) = frame
            .selected
            .and_then(|selected| visible.iter().position(|(id, _)| *id == selected))
        {
            surface.fill_rect(
                0.0,
                row as f64 * channel_height,
                width,
                channel_height,
                self.style.highlight,
            );
        }
        self.paint_grid(surface, rows, channel_height, frame.settings.grid_columns);

        let window_len = frame.settings.window_len(frame.buffer.sampling_rate());
        let x_step = width / window_len.saturating_sub(1).max(1) as f64;
        let amplitude = if frame.settings.amplitude > 0.0 {
            frame.settings.amplitude
        } else {
            1.0
        };

        let mut traces = 0;
        let mut points = Vec::with_capacity(window_len);
        for (row, (id, config)) in visible.iter().enumerate() {
            let row_top = row as f64 * channel_height;
            surface.text(
                2.0,
                row_top + 1.0,
                &id.to_string(),
                TextAnchor::Start,
                self.style.label,
            );

            let window = frame.buffer.window_for(*id);
            let take = window.len().min(window_len);
            if take < 2 {
                continue;
            }

            let row_center = row_top + channel_height / 2.0;
            let scale = (channel_height * ROW_FILL / amplitude) * config.scale;
            points.clear();
            points.extend(
                window
                    .range(window.len() - take..)
                    .enumerate()
                    .map(|(i, v)| (i as f64 * x_step, row_center - v * scale + config.offset)),
            );
            surface.polyline(&points, config.color);
            traces += 1;
        }

        self.paint_time_axis(surface, frame.settings);
        FrameStats {
            rows: visible.len(),
            traces,
        }
    }

    fn paint_grid<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        rows: usize,
        channel_height: f64,
        columns: usize,
    ) {
        let width = surface.width();
        let height = surface.height();
        for row in 1..=rows {
            let y = row as f64 * channel_height;
            surface.line(0.0, y, width, y, self.style.grid);
        }
        for col in 0..columns {
            let x = col as f64 * width / columns as f64;
            surface.line(x, 0.0, x, height, self.style.grid);
        }
    }

    fn paint_time_axis<S: Surface + ?Sized>(&self, surface: &mut S, settings: &DisplaySettings) {
        let ticks = settings.time_ticks;
        if ticks == 0 {
            return;
        }
        let width = surface.width();
        let height = surface.height();
        let spans = ticks.saturating_sub(1).max(1) as f64;
        for tick in 0..ticks {
            let fraction = tick as f64 / spans;
            let anchor = match tick {
                0 => TextAnchor::Start,
                t if t + 1 == ticks => TextAnchor::End,
                _ => TextAnchor::Middle,
            };
            let label = format!("{:.1}s", fraction * settings.time_window_secs);
            surface.text(fraction * width, height, &label, anchor, self.style.label);
        }
    }
}

/// One recorded draw call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Clear(ChannelColor),
    FillRect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        color: ChannelColor,
    },
    Line {
        from: (f64, f64),
        to: (f64, f64),
        color: ChannelColor,
    },
    Polyline {
        points: Vec<(f64, f64)>,
        color: ChannelColor,
    },
    Text {
        x: f64,
        y: f64,
        text: String,
        anchor: TextAnchor,
        color: ChannelColor,
    },
}

/// Surface that records draw calls instead of drawing.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    width: f64,
    height: f64,
    ops: Vec<DrawOp>,
}

impl RecordingSurface {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ops: Vec::new(),
        }
    }

    /// Every recorded call, in order.
    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Recorded polylines with their colors.
    pub fn polylines(&self) -> Vec<(&[(f64, f64)], ChannelColor)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Polyline { points, color } => Some((points.as_slice(), *color)),
                _ => None,
            })
            .collect()
    }

    /// Recorded text labels.
    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn line_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Line { .. }))
            .count()
    }
}

impl Surface for RecordingSurface {
    fn width(&self) -> f64 {
        self.width
    }

    fn height(&self) -> f64 {
        self.height
    }

    fn clear(&mut self, color: ChannelColor) {
        self.ops.clear();
        self.ops.push(DrawOp::Clear(color));
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: ChannelColor) {
        self.ops.push(DrawOp::FillRect {
            x,
            y,
            width,
            height,
            color,
        });
    }

    fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, color: ChannelColor) {
        self.ops.push(DrawOp::Line {
            from: (x1, y1),
            to: (x2, y2),
            color,
        });
    }

    fn polyline(&mut self, points: &[(f64, f64)], color: ChannelColor) {
        self.ops.push(DrawOp::Polyline {
            points: points.to_vec(),
            color,
        });
    }

    fn text(&mut self, x: f64, y: f64, text: &str, anchor: TextAnchor, color: ChannelColor) {
        self.ops.push(DrawOp::Text {
            x,
            y,
            text: text.to_string(),
            anchor,
            color,
        });
    }
}
