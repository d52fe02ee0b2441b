//! Sensor activation panel state.
//!
//! The panel shows all [`SENSOR_COUNT`] sensor positions as a fixed 8×8 grid.
//! [`SensorPoller`] refreshes the snapshot about once a second while the panel
//! is mounted; dropping the poller stops the refresh. Commands never update
//! the grid locally; the next poll is the source of truth.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use megscope_types::{SENSOR_COUNT, SensorSnapshot, SensorState};

use crate::error::{Error, Result};
use crate::timer::TimerHandle;
use crate::traits::{AcquisitionService, SharedService};

/// Tiles per grid row.
pub const GRID_COLUMNS: usize = 8;

/// Default time between snapshot polls.
pub const DEFAULT_SENSOR_INTERVAL: Duration = Duration::from_secs(1);

/// One sensor position on the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorTile {
    /// The last snapshot did not mention this sensor.
    NoData { id: u16 },
    /// The last snapshot reported this sensor.
    Reported { id: u16, state: SensorState },
}

impl SensorTile {
    pub fn id(&self) -> u16 {
        match self {
            Self::NoData { id } | Self::Reported { id, .. } => *id,
        }
    }

    /// ACT flag, `None` without data.
    pub fn is_active(&self) -> Option<bool> {
        match self {
            Self::NoData { .. } => None,
            Self::Reported { state, .. } => Some(state.active),
        }
    }

    pub fn state(&self) -> Option<&SensorState> {
        match self {
            Self::NoData { .. } => None,
            Self::Reported { state, .. } => Some(state),
        }
    }
}

/// Fixed grid of every sensor position, ids 1..=64 in row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorGrid {
    tiles: Vec<SensorTile>,
}

impl Default for SensorGrid {
    fn default() -> Self {
        Self::from_snapshot(&SensorSnapshot::default())
    }
}

impl SensorGrid {
    /// Build all tiles from a snapshot. Ids missing from it become `NoData`.
    ///
    /// # Examples
    ///
    /// ```
    /// use megscope_core::{SensorGrid, SensorTile};
    /// use megscope_types::SensorSnapshot;
    ///
    /// let grid = SensorGrid::from_snapshot(&SensorSnapshot::default());
    /// assert_eq!(grid.tiles().len(), 64);
    /// assert!(matches!(grid.get(1), Some(SensorTile::NoData { id: 1 })));
    /// ```
    pub fn from_snapshot(snapshot: &SensorSnapshot) -> Self {
        let tiles = (1..=SENSOR_COUNT)
            .map(|id| match snapshot.get(id) {
                Some(state) => SensorTile::Reported { id, state: *state },
                None => SensorTile::NoData { id },
            })
            .collect();
        Self { tiles }
    }

    pub fn tiles(&self) -> &[SensorTile] {
        &self.tiles
    }

    /// Tile for sensor `id` (1-based).
    pub fn get(&self, id: u16) -> Option<&SensorTile> {
        let index = usize::from(id).checked_sub(1)?;
        self.tiles.get(index)
    }

    /// Tiles grouped into rows of [`GRID_COLUMNS`].
    pub fn rows(&self) -> impl Iterator<Item = &[SensorTile]> {
        self.tiles.chunks(GRID_COLUMNS)
    }

    /// Number of reported sensors with ACT set.
    pub fn active_count(&self) -> usize {
        self.tiles
            .iter()
            .filter(|tile| tile.is_active() == Some(true))
            .count()
    }

    /// Number of tiles with data.
    pub fn reported_count(&self) -> usize {
        self.tiles
            .iter()
            .filter(|tile| matches!(tile, SensorTile::Reported { .. }))
            .count()
    }

    /// Command that inverts sensor `id`'s activation.
    ///
    /// Returns `None` for unknown ids and `NoData` tiles.
    pub fn toggle_command(&self, id: u16) -> Option<SensorCommand> {
        let active = self.get(id)?.is_active()?;
        Some(SensorCommand::Toggle {
            id,
            activate: !active,
        })
    }
}

/// A user command against the sensor array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorCommand {
    /// Set one sensor's streaming state.
    Toggle { id: u16, activate: bool },
    /// Set every sensor's streaming state with one aggregate request.
    SetAll { activate: bool },
}

impl SensorCommand {
    /// Short description for status lines and alerts.
    pub fn describe(&self) -> String {
        match self {
            Self::Toggle { id, activate: true } => format!("activate sensor {id}"),
            Self::Toggle { id, activate: false } => format!("deactivate sensor {id}"),
            Self::SetAll { activate: true } => "activate all sensors".to_string(),
            Self::SetAll { activate: false } => "deactivate all sensors".to_string(),
        }
    }

    /// Send the command. Failures are logged and returned.
    pub async fn execute(self, service: &dyn AcquisitionService) -> Result<()> {
        let result = match self {
            Self::Toggle { id, activate } => service.set_sensor_active(id, activate).await,
            Self::SetAll { activate } => service.set_all_sensors(activate).await,
        };
        match &result {
            Ok(()) => info!(command = %self.describe(), "Sensor command accepted"),
            Err(e) => error!(command = %self.describe(), error = %e, "Sensor command failed"),
        }
        result
    }
}

/// Background poller for sensor snapshots.
///
/// Publishes `None` until the first poll succeeds.
#[derive(Debug)]
pub struct SensorPoller {
    receiver: watch::Receiver<Option<SensorSnapshot>>,
    timer: TimerHandle,
}

impl SensorPoller {
    /// Start polling every `interval`.
    pub fn start(service: SharedService, interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(Error::InvalidConfig("sensor interval must be > 0".to_string()));
        }

        let (sender, receiver) = watch::channel(None);
        let timer = TimerHandle::spawn("sensors", move |token| {
            sensor_loop(service, interval, sender, token)
        });
        Ok(Self { receiver, timer })
    }

    /// Latest snapshot, if any poll succeeded.
    pub fn latest(&self) -> Option<SensorSnapshot> {
        self.receiver.borrow().clone()
    }

    /// Grid for the latest snapshot (all `NoData` before the first poll).
    pub fn grid(&self) -> SensorGrid {
        match &*self.receiver.borrow() {
            Some(snapshot) => SensorGrid::from_snapshot(snapshot),
            None => SensorGrid::default(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<SensorSnapshot>> {
        self.receiver.clone()
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_active()
    }
}

async fn sensor_loop(
    service: SharedService,
    interval: Duration,
    sender: watch::Sender<Option<SensorSnapshot>>,
    token: CancellationToken,
) {
    debug!(interval_ms = interval.as_millis() as u64, "Sensor polling started");
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let result = tokio::select! {
            _ = token.cancelled() => break,
            result = service.sensor_status() => result,
        };

        match result {
            Ok(snapshot) => {
                debug!(
                    sensors = snapshot.len(),
                    active = snapshot.active_count(),
                    "Sensor snapshot"
                );
                sender.send_replace(Some(snapshot));
            }
            // Keep showing the previous snapshot.
            Err(e) => warn!(error = %e, "Sensor status poll failed"),
        }
    }

    debug!("Sensor polling stopped");
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use super::*;
    use crate::mock::MockService;

    fn state(active: bool) -> SensorState {
        SensorState {
            active,
            lls: true,
            sls: false,
            fault: false,
        }
    }

    #[test]
    fn test_missing_sensor_is_no_data() {
        let sensors: BTreeMap<u16, SensorState> = (1..=64)
            .filter(|id| *id != 37)
            .map(|id| (id, state(true)))
            .collect();
        let grid = SensorGrid::from_snapshot(&SensorSnapshot { sensors });

        assert_eq!(grid.tiles().len(), 64);
        assert_eq!(grid.get(37), Some(&SensorTile::NoData { id: 37 }));
        assert_eq!(grid.reported_count(), 63);
        assert_eq!(grid.active_count(), 63);
    }

    #[test]
    fn test_grid_ignores_ids_outside_panel() {
        let mut sensors = BTreeMap::new();
        sensors.insert(65, state(true));
        sensors.insert(3, state(false));
        let grid = SensorGrid::from_snapshot(&SensorSnapshot { sensors });

        assert_eq!(grid.tiles().len(), 64);
        assert_eq!(grid.reported_count(), 1);
        assert!(grid.get(0).is_none());
        assert!(grid.get(65).is_none());
    }

    #[test]
    fn test_rows_are_eight_wide() {
        let grid = SensorGrid::default();
        let rows: Vec<_> = grid.rows().collect();
        assert_eq!(rows.len(), 8);
        assert!(rows.iter().all(|row| row.len() == GRID_COLUMNS));
        assert_eq!(rows[1][0].id(), 9);
    }

    #[test]
    fn test_toggle_inverts_current_flag() {
        let mut sensors = BTreeMap::new();
        sensors.insert(1, state(true));
        sensors.insert(2, state(false));
        let grid = SensorGrid::from_snapshot(&SensorSnapshot { sensors });

        assert_eq!(
            grid.toggle_command(1),
            Some(SensorCommand::Toggle {
                id: 1,
                activate: false
            })
        );
        assert_eq!(
            grid.toggle_command(2),
            Some(SensorCommand::Toggle {
                id: 2,
                activate: true
            })
        );
        assert_eq!(grid.toggle_command(3), None);
    }

    #[tokio::test]
    async fn test_command_does_not_touch_grid() {
        let service = MockService::builder().sensors_active(false).build();
        let grid = SensorGrid::from_snapshot(&service.sensor_status().await.unwrap());

        let command = grid.toggle_command(5).unwrap();
        command.execute(&service).await.unwrap();

        assert_eq!(grid.get(5).unwrap().is_active(), Some(false));
        let refreshed = SensorGrid::from_snapshot(&service.sensor_status().await.unwrap());
        assert_eq!(refreshed.get(5).unwrap().is_active(), Some(true));
    }

    #[tokio::test]
    async fn test_bulk_command_is_single_request() {
        let service = MockService::builder().sensors_active(false).build();
        SensorCommand::SetAll { activate: true }
            .execute(&service)
            .await
            .unwrap();

        assert_eq!(service.command_count(), 1);
        assert_eq!(service.sensor_status().await.unwrap().active_count(), 64);
    }

    #[tokio::test]
    async fn test_command_failure_is_returned() {
        let service = MockService::default();
        service.set_should_fail(true, Some("refused")).await;

        let err = SensorCommand::SetAll { activate: false }
            .execute(&service)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("refused"));
    }

    #[test]
    fn test_describe() {
        assert_eq!(
            SensorCommand::Toggle {
                id: 4,
                activate: true
            }
            .describe(),
            "activate sensor 4"
        );
        assert_eq!(
            SensorCommand::SetAll { activate: false }.describe(),
            "deactivate all sensors"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_publishes_and_stops_on_drop() {
        let service = Arc::new(MockService::default());
        let poller = SensorPoller::start(service.clone(), DEFAULT_SENSOR_INTERVAL).unwrap();
        assert!(poller.latest().is_none());
        assert_eq!(poller.grid().reported_count(), 0);

        let mut rx = poller.subscribe();
        rx.changed().await.unwrap();
        assert_eq!(poller.grid().reported_count(), 64);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(service.sensor_count(), 3);

        drop(poller);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(service.sensor_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_failure_keeps_previous_snapshot() {
        let service = Arc::new(MockService::default());
        let poller = SensorPoller::start(service.clone(), DEFAULT_SENSOR_INTERVAL).unwrap();
        let mut rx = poller.subscribe();
        rx.changed().await.unwrap();

        service.set_should_fail(true, None).await;
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(poller.grid().reported_count(), 64);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let service = Arc::new(MockService::default());
        assert!(SensorPoller::start(service, Duration::ZERO).is_err());
    }
}
