//! Status command implementation.

use std::fmt::Write as _;

use anyhow::Result;
use megscope_core::health::probe;
use megscope_core::{AcquisitionService, ConnectionHealth};
use serde::Serialize;
use time::format_description::well_known::Rfc3339;

use crate::cli::OutputFormat;

#[derive(Debug, Serialize)]
struct StatusReport<'a> {
    service: &'a str,
    #[serde(flatten)]
    health: &'a ConnectionHealth,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub async fn cmd_status(
    service: &dyn AcquisitionService,
    service_label: &str,
    format: OutputFormat,
) -> Result<()> {
    let (health, error) = probe(service, None).await;
    let error = error.map(|e| e.to_string());

    let content = match format {
        OutputFormat::Json => {
            let report = StatusReport {
                service: service_label,
                health: &health,
                error,
            };
            serde_json::to_string_pretty(&report)? + "\n"
        }
        OutputFormat::Text => format_status_text(service_label, &health, error.as_deref()),
    };

    print!("{content}");
    Ok(())
}

/// Format a health snapshot as aligned `key: value` lines
fn format_status_text(service: &str, health: &ConnectionHealth, error: Option<&str>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Service:   {service}");

    if let Some(error) = error {
        let _ = writeln!(out, "Status:    unreachable");
        let _ = writeln!(out, "Error:     {error}");
        return out;
    }

    let _ = writeln!(
        out,
        "Status:    {}",
        if health.viable { "viable" } else { "not viable" }
    );
    let _ = writeln!(out, "Quality:   {}", health.quality);
    if let Some(rate) = health.sampling_rate {
        let _ = writeln!(out, "Rate:      {rate} Hz");
    }
    if let Some(channels) = health.channels {
        let _ = writeln!(out, "Channels:  {channels}");
    }
    if let Some(seen) = health.last_seen.and_then(|t| t.format(&Rfc3339).ok()) {
        let _ = writeln!(out, "Checked:   {seen}");
    }
    out
}

#[cfg(test)]
mod tests {
    use megscope_core::MockService;
    use megscope_types::QualityTier;

    use super::*;

    #[test]
    fn test_format_viable() {
        let health = ConnectionHealth {
            viable: true,
            quality: QualityTier::Excellent,
            last_seen: None,
            sampling_rate: Some(375.0),
            channels: Some(192),
        };
        let text = format_status_text("http://localhost:8000", &health, None);
        assert!(text.contains("Status:    viable"));
        assert!(text.contains("Rate:      375 Hz"));
        assert!(text.contains("Channels:  192"));
    }

    #[test]
    fn test_format_unreachable() {
        let health = ConnectionHealth::unreachable(None);
        let text = format_status_text("http://localhost:8000", &health, Some("refused"));
        assert!(text.contains("unreachable"));
        assert!(text.contains("Error:     refused"));
        assert!(!text.contains("Quality"));
    }

    #[test]
    fn test_json_report_flattens_health() {
        let health = ConnectionHealth::default();
        let report = StatusReport {
            service: "mock",
            health: &health,
            error: None,
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["service"], "mock");
        assert_eq!(value["viable"], false);
        assert!(value.get("error").is_none());
    }

    #[tokio::test]
    async fn test_cmd_status_against_mock() {
        let service = MockService::default();
        cmd_status(&service, "mock", OutputFormat::Text).await.unwrap();
        assert_eq!(service.status_count(), 1);
    }
}
