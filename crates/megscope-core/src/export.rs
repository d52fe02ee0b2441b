//! Delimited-text export of the buffered window.

use std::io;

use time::OffsetDateTime;

use crate::channels::ChannelStateStore;
use crate::error::{Error, Result};
use crate::window::SampleWindowBuffer;

/// Render the current windows as delimited text.
///
/// The header is `sample,time_s,ch1,...` over every configured channel that
/// holds data. Rows are aligned to the newest sample; shorter windows leave
/// their leading cells empty. `time_s` is the row index divided by the
/// sampling rate.
///
/// # Examples
///
/// ```
/// use megscope_core::{ChannelStateStore, DisplaySettings, SampleWindowBuffer, export};
/// use megscope_types::SampleBatch;
///
/// let channels = ChannelStateStore::new(1);
/// let mut buffer = SampleWindowBuffer::new();
/// let batch = SampleBatch { samples: vec![vec![0.5]], sampling_rate: 10.0, channel_count: 1 };
/// buffer.ingest(&batch, &channels, &DisplaySettings::default());
///
/// let text = export::export_window(&buffer, &channels, b',').unwrap();
/// assert_eq!(text, "sample,time_s,ch1\n0,0,0.5\n");
/// ```
pub fn export_window(
    buffer: &SampleWindowBuffer,
    channels: &ChannelStateStore,
    delimiter: u8,
) -> Result<String> {
    let columns: Vec<_> = channels
        .iter()
        .map(|(id, _)| (id, buffer.window_for(id)))
        .filter(|(_, window)| !window.is_empty())
        .collect();
    let rows = columns.iter().map(|(_, w)| w.len()).max().unwrap_or(0);
    let rate = buffer.sampling_rate();

    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    let mut header = vec!["sample".to_string(), "time_s".to_string()];
    header.extend(columns.iter().map(|(id, _)| format!("ch{}", id.get())));
    writer.write_record(&header)?;

    for row in 0..rows {
        let mut record = Vec::with_capacity(columns.len() + 2);
        record.push(row.to_string());
        record.push(if rate > 0.0 {
            (row as f64 / rate).to_string()
        } else {
            String::new()
        });
        for (_, window) in &columns {
            let lead = rows - window.len();
            record.push(match row.checked_sub(lead).and_then(|i| window.get(i)) {
                Some(value) => value.to_string(),
                None => String::new(),
            });
        }
        writer.write_record(&record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| Error::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| Error::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
}

/// File name for an export taken at `now`, e.g. `megscope-20260101-120000.csv`.
pub fn export_file_name(now: OffsetDateTime, extension: &str) -> String {
    format!(
        "megscope-{:04}{:02}{:02}-{:02}{:02}{:02}.{}",
        now.year(),
        u8::from(now.month()),
        now.day(),
        now.hour(),
        now.minute(),
        now.second(),
        extension
    )
}
