//! Alert text for failed commands.
//!
//! Raw service and transport errors are matched by substring and turned into
//! a short headline plus an optional next step for the operator.

/// Returns `(headline, suggestion)` for a raw error string.
///
/// Unrecognized errors come back unchanged with no suggestion.
pub fn format_error_with_guidance(error: &str) -> (String, Option<String>) {
    let error_lower = error.to_lowercase();

    // Sensor ids outside the array, or an older service without the endpoint
    if error_lower.contains("(404)") || error_lower.contains("not found") {
        return (
            "Not found".to_string(),
            Some("The sensor or endpoint does not exist on this service version.".to_string()),
        );
    }

    if error_lower.contains("timed out") || error_lower.contains("timeout") {
        return (
            "Request timed out".to_string(),
            Some(
                "The service is slow to respond. Check the device link and try again."
                    .to_string(),
            ),
        );
    }

    if error_lower.contains("not reachable")
        || error_lower.contains("connection refused")
        || error_lower.contains("error sending request")
    {
        return (
            "Service not reachable".to_string(),
            Some(
                "Check that the acquisition service is running and that service_url in config.toml is correct."
                    .to_string(),
            ),
        );
    }

    if error_lower.contains("already connected") {
        return (
            "Device already connected".to_string(),
            Some("Disconnect first (d) if you need to change device parameters.".to_string()),
        );
    }

    if error_lower.contains("not connected") {
        return (
            "Device not connected".to_string(),
            Some("Connect the device (c) before changing sensor state.".to_string()),
        );
    }

    if error_lower.contains("invalid url") || error_lower.contains("invalid configuration") {
        return (
            "Invalid configuration".to_string(),
            Some("Run `megscope config show` and fix the reported value.".to_string()),
        );
    }

    if error_lower.contains("invalid response") || error_lower.contains("decod") {
        return (
            "Unexpected response".to_string(),
            Some("The service returned data in an unknown format. Check its version.".to_string()),
        );
    }

    if error_lower.contains("(5") {
        return (
            "Service error".to_string(),
            Some("The service failed to handle the request. Check its logs.".to_string()),
        );
    }

    (error.to_string(), None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_sensor() {
        let (msg, suggestion) = format_error_with_guidance("API error (404): Sensor 99 not found");
        assert_eq!(msg, "Not found");
        assert!(suggestion.unwrap().contains("sensor"));
    }

    #[test]
    fn test_unreachable() {
        let (msg, suggestion) = format_error_with_guidance(
            "Service not reachable at http://localhost:8000: connection refused",
        );
        assert_eq!(msg, "Service not reachable");
        assert!(suggestion.unwrap().contains("service_url"));
    }

    #[test]
    fn test_timeout() {
        let (msg, suggestion) = format_error_with_guidance("operation timed out");
        assert_eq!(msg, "Request timed out");
        assert!(suggestion.is_some());
    }

    #[test]
    fn test_device_state_conflicts() {
        let (msg, _) = format_error_with_guidance("API error (409): MEG already connected");
        assert_eq!(msg, "Device already connected");

        let (msg, _) = format_error_with_guidance("API error (400): MEG not connected");
        assert_eq!(msg, "Device not connected");
    }

    #[test]
    fn test_invalid_response() {
        let (msg, _) = format_error_with_guidance("Invalid response: error decoding response body");
        assert_eq!(msg, "Unexpected response");
    }

    #[test]
    fn test_server_error() {
        let (msg, suggestion) = format_error_with_guidance("API error (500): Internal Server Error");
        assert_eq!(msg, "Service error");
        assert!(suggestion.unwrap().contains("logs"));
    }

    #[test]
    fn test_unrecognized_error_passes_through() {
        let (msg, suggestion) = format_error_with_guidance("channel map mismatch");
        assert_eq!(msg, "channel map mismatch");
        assert!(suggestion.is_none());
    }

    #[test]
    fn test_case_insensitivity() {
        let (msg, _) = format_error_with_guidance("CONNECTION REFUSED");
        assert_eq!(msg, "Service not reachable");
    }
}
