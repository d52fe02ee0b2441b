//! Sensors command implementation.

use std::fmt::Write as _;

use anyhow::{Context, Result};
use megscope_core::sensors::GRID_COLUMNS;
use megscope_core::{AcquisitionService, SensorGrid, SensorTile};

use crate::cli::OutputFormat;

pub async fn cmd_sensors(service: &dyn AcquisitionService, format: OutputFormat) -> Result<()> {
    let snapshot = service
        .sensor_status()
        .await
        .context("Failed to read sensor status")?;

    let content = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&snapshot)? + "\n",
        OutputFormat::Text => format_grid(&SensorGrid::from_snapshot(&snapshot)),
    };
    print!("{content}");
    Ok(())
}

/// One cell per sensor: `+` active, `-` inactive, `!` fault, `?` no data.
fn tile_cell(tile: &SensorTile) -> String {
    let flag = match tile {
        SensorTile::NoData { .. } => '?',
        SensorTile::Reported { state, .. } if state.fault => '!',
        SensorTile::Reported { state, .. } if state.active => '+',
        SensorTile::Reported { .. } => '-',
    };
    format!("{:>2}{flag}", tile.id())
}

fn format_grid(grid: &SensorGrid) -> String {
    let mut out = String::new();
    for row in grid.rows() {
        let cells: Vec<String> = row.iter().map(tile_cell).collect();
        let _ = writeln!(out, "{}", cells.join(" "));
    }
    let _ = writeln!(
        out,
        "\n{} of {} sensors reporting, {} active ({} per row; + active, - inactive, ! fault, ? no data)",
        grid.reported_count(),
        grid.tiles().len(),
        grid.active_count(),
        GRID_COLUMNS
    );
    out
}
