//! Per-channel display state.
//!
//! [`ChannelStateStore`] is a dense arena of [`ChannelConfig`] indexed by
//! [`ChannelId::index`]. Configured order is id order; initialization assigns
//! palette colors cyclically and makes every channel visible.

use megscope_types::{ChannelColor, ChannelConfig, ChannelId};
use tracing::debug;

/// Offset step applied by [`ChannelStateStore::nudge_offset`], in surface units.
pub const OFFSET_STEP: f64 = 1.0;

/// Gain step factor applied by [`ChannelStateStore::adjust_scale`].
pub const SCALE_FACTOR: f64 = 1.25;

/// Ordered set of channel configurations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelStateStore {
    channels: Vec<ChannelConfig>,
}

impl ChannelStateStore {
    /// Store with `count` visible channels, ids 1..=count.
    pub fn new(count: usize) -> Self {
        let mut store = Self::default();
        store.init(count);
        store
    }

    /// Replace every configuration with fresh defaults for `count` channels.
    pub fn init(&mut self, count: usize) {
        self.channels = (0..count)
            .map(|index| ChannelConfig::new(ChannelColor::for_index(index)))
            .collect();
        debug!(count, "Channel set initialized");
    }

    /// Re-initialize only if the channel count changed.
    ///
    /// Returns `true` when the set was replaced.
    pub fn ensure_count(&mut self, count: usize) -> bool {
        if count == 0 || count == self.channels.len() {
            return false;
        }
        self.init(count);
        true
    }

    /// Number of configured channels.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Whether `id` is configured.
    pub fn contains(&self, id: ChannelId) -> bool {
        id.index() < self.channels.len()
    }

    pub fn get(&self, id: ChannelId) -> Option<&ChannelConfig> {
        self.channels.get(id.index())
    }

    pub fn get_mut(&mut self, id: ChannelId) -> Option<&mut ChannelConfig> {
        self.channels.get_mut(id.index())
    }

    /// All channels in configured order.
    pub fn iter(&self) -> impl Iterator<Item = (ChannelId, &ChannelConfig)> {
        self.channels
            .iter()
            .enumerate()
            .map(|(index, config)| (ChannelId::from_index(index), config))
    }

    /// Visible channels in configured order.
    pub fn visible(&self) -> impl Iterator<Item = (ChannelId, &ChannelConfig)> {
        self.iter().filter(|(_, config)| config.visible)
    }

    /// Number of visible channels.
    pub fn visible_count(&self) -> usize {
        self.channels.iter().filter(|c| c.visible).count()
    }

    /// Flip visibility of `id`. Returns the new state, or `None` if unknown.
    pub fn toggle_visible(&mut self, id: ChannelId) -> Option<bool> {
        let config = self.get_mut(id)?;
        config.visible = !config.visible;
        Some(config.visible)
    }

    /// Make every channel visible.
    pub fn show_all(&mut self) {
        for config in &mut self.channels {
            config.visible = true;
        }
    }

    /// Show only `id`, hiding every other channel.
    pub fn solo(&mut self, id: ChannelId) {
        for (index, config) in self.channels.iter_mut().enumerate() {
            config.visible = index == id.index();
        }
    }

    /// Multiply the gain of `id` by `SCALE_FACTOR` (`up`) or divide it.
    pub fn adjust_scale(&mut self, id: ChannelId, up: bool) -> Option<f64> {
        let config = self.get_mut(id)?;
        let next = if up {
            config.scale * SCALE_FACTOR
        } else {
            config.scale / SCALE_FACTOR
        };
        config.set_scale(next);
        Some(config.scale)
    }

    /// Shift `id` by `OFFSET_STEP` times `steps`.
    pub fn nudge_offset(&mut self, id: ChannelId, steps: f64) -> Option<f64> {
        let config = self.get_mut(id)?;
        config.offset += steps * OFFSET_STEP;
        Some(config.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u32) -> ChannelId {
        ChannelId::new(n).unwrap()
    }

    #[test]
    fn test_init_assigns_palette_and_visibility() {
        let store = ChannelStateStore::new(10);
        assert_eq!(store.len(), 10);
        assert_eq!(store.visible_count(), 10);
        assert_eq!(store.get(id(1)).unwrap().color, ChannelColor::for_index(0));
        assert_eq!(store.get(id(9)).unwrap().color, ChannelColor::for_index(0));
        assert!(store.get(id(11)).is_none());
    }

    #[test]
    fn test_toggle_visible() {
        let mut store = ChannelStateStore::new(3);
        assert_eq!(store.toggle_visible(id(2)), Some(false));
        let visible: Vec<u32> = store.visible().map(|(id, _)| id.get()).collect();
        assert_eq!(visible, vec![1, 3]);
        assert_eq!(store.toggle_visible(id(2)), Some(true));
        assert_eq!(store.toggle_visible(id(4)), None);
    }

    #[test]
    fn test_show_all_and_solo() {
        let mut store = ChannelStateStore::new(4);
        store.solo(id(3));
        assert_eq!(store.visible_count(), 1);
        assert!(store.get(id(3)).unwrap().visible);
        store.show_all();
        assert_eq!(store.visible_count(), 4);
    }

    #[test]
    fn test_reinit_replaces_wholesale() {
        let mut store = ChannelStateStore::new(4);
        store.toggle_visible(id(1));
        store.nudge_offset(id(2), 3.0);

        assert!(!store.ensure_count(4));
        assert!(!store.get(id(1)).unwrap().visible);

        assert!(store.ensure_count(6));
        assert_eq!(store.len(), 6);
        assert!(store.get(id(1)).unwrap().visible);
        assert_eq!(store.get(id(2)).unwrap().offset, 0.0);
    }

    #[test]
    fn test_ensure_count_ignores_zero() {
        let mut store = ChannelStateStore::new(4);
        assert!(!store.ensure_count(0));
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_adjust_scale_and_offset() {
        let mut store = ChannelStateStore::new(1);
        assert_eq!(store.adjust_scale(id(1), true), Some(1.25));
        assert_eq!(store.adjust_scale(id(1), false), Some(1.0));
        assert_eq!(store.nudge_offset(id(1), -2.0), Some(-2.0));
    }
}
