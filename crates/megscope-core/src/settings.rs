//! Display settings shared by the window buffer and the renderer.

/// Full-scale amplitude steps, smallest (most zoomed in) first.
pub const AMPLITUDE_STEPS: &[f64] = &[0.01, 0.1, 0.5, 1.0, 5.0, 10.0, 50.0, 100.0, 500.0, 1000.0];

/// Time window steps in seconds.
pub const TIME_WINDOW_STEPS: &[f64] = &[1.0, 2.0, 5.0, 10.0, 20.0, 30.0];

/// Display settings for one waveform view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplaySettings {
    /// Span of the visible window in seconds.
    pub time_window_secs: f64,
    /// Signal value that maps to 40% of a channel row.
    pub amplitude: f64,
    /// Vertical grid lines per frame.
    pub grid_columns: usize,
    /// Labels on the time axis.
    pub time_ticks: usize,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            time_window_secs: 5.0,
            amplitude: 1.0,
            grid_columns: 10,
            time_ticks: 5,
        }
    }
}

impl DisplaySettings {
    /// Create settings with the given window span and amplitude.
    pub fn new(time_window_secs: f64, amplitude: f64) -> Self {
        Self {
            time_window_secs: sanitize_positive(time_window_secs, 5.0),
            amplitude: sanitize_positive(amplitude, 1.0),
            ..Default::default()
        }
    }

    /// Samples kept per channel: `round(time_window_secs × sampling_rate)`.
    ///
    /// Returns 0 while the sampling rate is unknown.
    ///
    /// # Examples
    ///
    /// ```
    /// use megscope_core::DisplaySettings;
    ///
    /// let settings = DisplaySettings::default();
    /// assert_eq!(settings.window_len(0.0), 0);
    /// assert_eq!(settings.window_len(375.0), 1875);
    /// ```
    #[must_use]
    pub fn window_len(&self, rate: f64) -> usize {
        if !rate.is_finite() || rate <= 0.0 {
            return 0;
        }
        (self.time_window_secs * rate).round().max(0.0) as usize
    }

    /// Zoom in one amplitude step (traces get taller).
    pub fn amplitude_down(&mut self) {
        self.amplitude = step_down(AMPLITUDE_STEPS, self.amplitude);
    }

    /// Zoom out one amplitude step.
    pub fn amplitude_up(&mut self) {
        self.amplitude = step_up(AMPLITUDE_STEPS, self.amplitude);
    }

    /// Shorten the time window by one step.
    pub fn window_down(&mut self) {
        self.time_window_secs = step_down(TIME_WINDOW_STEPS, self.time_window_secs);
    }

    /// Lengthen the time window by one step.
    pub fn window_up(&mut self) {
        self.time_window_secs = step_up(TIME_WINDOW_STEPS, self.time_window_secs);
    }
}

fn sanitize_positive(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        fallback
    }
}

fn step_up(steps: &[f64], current: f64) -> f64 {
    steps
        .iter()
        .copied()
        .find(|&s| s > current)
        .unwrap_or_else(|| steps.last().copied().unwrap_or(current))
}

fn step_down(steps: &[f64], current: f64) -> f64 {
    steps
        .iter()
        .rev()
        .copied()
        .find(|&s| s < current)
        .unwrap_or_else(|| steps.first().copied().unwrap_or(current))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_len_rounds() {
        let settings = DisplaySettings {
            time_window_secs: 2.0,
            ..Default::default()
        };
        assert_eq!(settings.window_len(256.4), 513);
    }

    #[test]
    fn test_window_len_zero_without_rate() {
        let settings = DisplaySettings::default();
        assert_eq!(settings.window_len(f64::NAN), 0);
        assert_eq!(settings.window_len(-1.0), 0);
    }

    #[test]
    fn test_new_rejects_non_positive() {
        let settings = DisplaySettings::new(0.0, -1.0);
        assert_eq!(settings.time_window_secs, 5.0);
        assert_eq!(settings.amplitude, 1.0);
    }

    #[test]
    fn test_amplitude_steps_clamp() {
        let mut settings = DisplaySettings::default();
        settings.amplitude_up();
        assert_eq!(settings.amplitude, 5.0);
        for _ in 0..20 {
            settings.amplitude_up();
        }
        assert_eq!(settings.amplitude, 1000.0);
        for _ in 0..20 {
            settings.amplitude_down();
        }
        assert_eq!(settings.amplitude, 0.01);
    }

    #[test]
    fn test_off_grid_value_snaps_to_neighbor() {
        let mut settings = DisplaySettings::new(7.0, 1.0);
        settings.window_up();
        assert_eq!(settings.time_window_secs, 10.0);

        let mut settings = DisplaySettings::new(7.0, 1.0);
        settings.window_down();
        assert_eq!(settings.time_window_secs, 5.0);
    }
}
