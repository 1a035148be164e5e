use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PrinterError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Write failed: {0}")]
    WriteFailed(String),
    #[error("Not connected")]
    NotConnected,
    #[error("No paper")]
    NoPaper,
    #[error("Printer overheated")]
    Overheat,
    #[error("Device error code {0}")]
    Device(i32),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

/// One element of a print job. The bridge core never inspects these;
/// only printer drivers render them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PrintElement {
    Text {
        data: String,
        #[serde(default)]
        alignment: Alignment,
        #[serde(default, rename = "fontSize")]
        font_size: Option<u8>,
        #[serde(default, rename = "isBold")]
        bold: bool,
    },
    QrCode {
        data: String,
        #[serde(default = "default_qr_size")]
        size: u8,
        #[serde(default)]
        alignment: Alignment,
    },
    Space {
        #[serde(default = "default_space_lines")]
        lines: u8,
    },
    WalkPaper {
        #[serde(default = "default_walk_steps")]
        steps: u8,
    },
}

fn default_qr_size() -> u8 {
    6
}
fn default_space_lines() -> u8 {
    1
}
fn default_walk_steps() -> u8 {
    2
}

/// An ordered sequence of print elements submitted as a unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintJob {
    pub id: Uuid,
    pub elements: Vec<PrintElement>,
}

impl PrintJob {
    pub fn new(elements: Vec<PrintElement>) -> Self {
        Self {
            id: Uuid::new_v4(),
            elements,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Device-level printer status as reported by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrinterStatus {
    Ok,
    NoPaper,
    Overheat,
    CacheFull,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub status: PrinterStatus,
    pub low_battery: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_print_elements_from_host_payload() {
        let payload = json!([
            {"type": "text", "data": "Hello", "alignment": "center", "isBold": true},
            {"type": "qrCode", "data": "https://example.com"},
            {"type": "space"},
            {"type": "walkPaper", "steps": 4}
        ]);

        let elements: Vec<PrintElement> = serde_json::from_value(payload).unwrap();
        assert_eq!(elements.len(), 4);
        assert_eq!(
            elements[0],
            PrintElement::Text {
                data: "Hello".to_string(),
                alignment: Alignment::Center,
                font_size: None,
                bold: true,
            }
        );
        assert!(matches!(elements[1], PrintElement::QrCode { size: 6, .. }));
        assert_eq!(elements[2], PrintElement::Space { lines: 1 });
        assert_eq!(elements[3], PrintElement::WalkPaper { steps: 4 });
    }

    #[test]
    fn test_status_report_serialization() {
        let report = StatusReport {
            status: PrinterStatus::NoPaper,
            low_battery: true,
        };
        let value = serde_json::to_value(report).unwrap();
        assert_eq!(value, json!({"status": "NO_PAPER", "lowBattery": true}));
    }

    #[test]
    fn test_each_job_gets_unique_id() {
        let a = PrintJob::new(vec![]);
        let b = PrintJob::new(vec![]);
        assert_ne!(a.id, b.id);
        assert!(a.is_empty());
    }
}
