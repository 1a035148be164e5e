use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::HostContext;
use crate::error::BridgeError;

/// Which scanning mechanism a session uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScanBackend {
    /// Foreground capture activity, result via the activity-result channel
    SoftCapture,
    /// Persistent hardware decoder session
    HardDecoder,
}

impl ScanBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SoftCapture => "SoftCapture",
            Self::HardDecoder => "HardDecoder",
        }
    }
}

/// How a hard decoder session delivers data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecodeMode {
    /// Every payload is pushed to the event stream
    Streaming,
    /// The caller pulls records with `readWithFormat`
    Polling,
}

/// A decoded scan result pushed by the hardware backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanEvent {
    pub payload: Vec<u8>,
    pub timestamp: DateTime<Utc>,
}

impl ScanEvent {
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            payload,
            timestamp: Utc::now(),
        }
    }

    /// Payload decoded as text, replacing invalid UTF-8
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// Tagged record returned by a polling read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRecord {
    #[serde(rename = "type")]
    pub kind: u8,
    pub length: u8,
    pub data: String,
}

impl ScanRecord {
    /// Parse a raw read buffer: byte 0 is the type tag, byte 1 the payload
    /// length, bytes `[2, 2 + length)` the payload. Trailing bytes are ignored.
    pub fn parse(buffer: &[u8]) -> Result<Self, BridgeError> {
        let [kind, length, rest @ ..] = buffer else {
            return Err(BridgeError::InvalidScanResult);
        };
        let payload = rest
            .get(..usize::from(*length))
            .ok_or(BridgeError::InvalidScanResult)?;

        Ok(Self {
            kind: *kind,
            length: *length,
            data: String::from_utf8_lossy(payload).into_owned(),
        })
    }
}

/// What the foreground capture activity is asked to scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureTarget {
    Barcode,
    QrCode,
}

/// A launch request handed to the capture launcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    pub request_code: i32,
    pub target: CaptureTarget,
    pub context: HostContext,
}

/// Outcome disposition of a foreground capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Disposition {
    Ok,
    Canceled,
}

/// Completion notification for a foreground capture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityResult {
    pub request_code: i32,
    pub disposition: Disposition,
    #[serde(default)]
    pub payload: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well_formed_buffer() {
        let record = ScanRecord::parse(&[0x01, 0x03, b'A', b'B', b'C']).unwrap();
        assert_eq!(
            record,
            ScanRecord {
                kind: 1,
                length: 3,
                data: "ABC".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_short_buffer_fails() {
        assert_eq!(
            ScanRecord::parse(&[0x01, 0x05, b'A', b'B']),
            Err(BridgeError::InvalidScanResult)
        );
        assert_eq!(ScanRecord::parse(&[0x01]), Err(BridgeError::InvalidScanResult));
        assert_eq!(ScanRecord::parse(&[]), Err(BridgeError::InvalidScanResult));
    }

    #[test]
    fn test_parse_ignores_trailing_bytes() {
        let record = ScanRecord::parse(&[0x02, 0x01, b'Z', 0x00, 0x00]).unwrap();
        assert_eq!(record.data, "Z");
        assert_eq!(record.kind, 2);
    }

    #[test]
    fn test_parse_empty_payload() {
        let record = ScanRecord::parse(&[0x07, 0x00]).unwrap();
        assert_eq!(record.length, 0);
        assert!(record.data.is_empty());
    }

    #[test]
    fn test_scan_record_serializes_type_field() {
        let record = ScanRecord::parse(&[0x01, 0x02, b'O', b'K']).unwrap();
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["type"], 1);
        assert_eq!(value["length"], 2);
        assert_eq!(value["data"], "OK");
    }

    #[test]
    fn test_activity_result_from_host_json() {
        let result: ActivityResult = serde_json::from_str(
            r#"{"requestCode": 292, "disposition": "ok", "payload": "4006381333931"}"#,
        )
        .unwrap();
        assert_eq!(result.request_code, 0x124);
        assert_eq!(result.disposition, Disposition::Ok);
        assert_eq!(result.payload.as_deref(), Some("4006381333931"));
    }
}
