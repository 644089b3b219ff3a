//! HTTP client for the BitAxe (AxeOS) system-info endpoint.

use std::time::Duration;

use serde_json::Value;

use crate::bitaxe::{BITAXE_FIELDS, BitaxeTelemetry};
use crate::config::HttpTimeouts;
use crate::error::FetchError;
use crate::lenient::normalize_object;

/// Path of the info endpoint on the device.
pub const INFO_PATH: &str = "/api/system/info";

/// Single-attempt client for one BitAxe. No retries.
#[derive(Debug, Clone)]
pub struct AxeOsClient {
    host: String,
    timeout: Duration,
    http: reqwest::Client,
}

impl AxeOsClient {
    /// `host` may carry a port (`10.0.0.5:8080`).
    pub fn new(host: impl Into<String>, timeouts: HttpTimeouts) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(timeouts.request)
            .build()?;
        Ok(Self {
            host: host.into(),
            timeout: timeouts.request,
            http,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn info_url(&self) -> String {
        format!("http://{}{INFO_PATH}", self.host)
    }

    /// GET the info endpoint and decode it into an (underived) record.
    pub async fn fetch(&self) -> Result<BitaxeTelemetry, FetchError> {
        let url = self.info_url();

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::InvalidResponse {
                target: url,
                reason: format!("HTTP {status}"),
            });
        }

        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        decode_info(&url, &body)
    }

    fn transport_error(&self, e: reqwest::Error) -> FetchError {
        let target = self.info_url();
        if e.is_timeout() {
            FetchError::Timeout {
                target,
                after: self.timeout,
            }
        } else {
            FetchError::Unreachable {
                target,
                source: Box::new(e),
            }
        }
    }
}

/// Validate the body shape, then normalize and decode it.
///
/// A body that is blank or not wrapped in `{...}` is rejected before any
/// parse is attempted.
pub fn decode_info(target: &str, body: &str) -> Result<BitaxeTelemetry, FetchError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(FetchError::InvalidResponse {
            target: target.to_string(),
            reason: "empty body".to_string(),
        });
    }
    if !(trimmed.starts_with('{') && trimmed.ends_with('}')) {
        return Err(FetchError::InvalidResponse {
            target: target.to_string(),
            reason: "body is not a JSON object".to_string(),
        });
    }

    let decode_error = |reason: String| FetchError::DecodeError {
        target: target.to_string(),
        reason,
    };
    let canonical = normalize_object(trimmed, BITAXE_FIELDS).map_err(|e| decode_error(e.reason))?;
    serde_json::from_value(Value::Object(canonical)).map_err(|e| decode_error(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorClass;

    const TARGET: &str = "http://bitaxe/api/system/info";

    #[test]
    fn minimal_body_leaves_other_fields_at_defaults() {
        let record = decode_info(TARGET, r#"{"power":15.2,"temp":61.0}"#).unwrap();
        assert_eq!(record.power, 15.2);
        assert_eq!(record.temperature, 61.0);
        assert_eq!(record.hash_rate, 0.0);
        assert_eq!(record.hostname, "");
        assert_eq!(record.shares_accepted, 0);
    }

    #[test]
    fn firmware_quirks_are_tolerated() {
        let body = r#"{
            // build 2.4.1
            "Power": "14.9",
            "hashRate": 1100.5,
            "FANSPEED": "80",
            "stratumURL": "public-pool.io",
            "unknownField": [1, 2, 3],
        }"#;
        let record = decode_info(TARGET, body).unwrap();
        assert_eq!(record.power, 14.9);
        assert_eq!(record.hash_rate, 1100.5);
        assert_eq!(record.fan_speed, 80);
        assert_eq!(record.stratum_url, "public-pool.io");
    }

    #[test]
    fn non_object_bodies_are_invalid_responses() {
        for body in ["", "   ", "<html>oops</html>", "[1,2]", "null"] {
            let err = decode_info(TARGET, body).unwrap_err();
            assert!(
                matches!(err, FetchError::InvalidResponse { .. }),
                "{body:?} gave {err}"
            );
        }
    }

    #[test]
    fn bad_field_types_are_decode_errors() {
        let err = decode_info(TARGET, r#"{"power": "lots"}"#).unwrap_err();
        assert!(matches!(err, FetchError::DecodeError { .. }));
        assert_eq!(err.class(), ErrorClass::MalformedResponse);

        let err = decode_info(TARGET, r#"{"power": 1, oops}"#).unwrap_err();
        assert!(matches!(err, FetchError::DecodeError { .. }));
    }

    #[test]
    fn info_url_uses_host_verbatim() {
        let client = AxeOsClient::new("10.0.0.5:8080", HttpTimeouts::default()).unwrap();
        assert_eq!(client.info_url(), "http://10.0.0.5:8080/api/system/info");
        assert_eq!(client.host(), "10.0.0.5:8080");
    }
}
