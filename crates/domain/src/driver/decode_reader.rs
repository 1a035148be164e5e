use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::DriverCode;

/// Receives payloads from an open decoder. Called from the driver's own
/// thread, so implementations must only hand the data off.
pub trait ScanListener: Send + Sync {
    fn on_data(&self, data: Vec<u8>);
}

/// Hardware barcode decoder attached over a serial line
#[async_trait]
pub trait DecodeReader: Send + Sync {
    /// Open a persistent decoder session at the given baud rate
    async fn open(&mut self, baud_rate: u32) -> Result<(), DriverCode>;

    /// Install or remove the payload listener
    fn set_listener(&mut self, listener: Option<Arc<dyn ScanListener>>);

    /// Read one formatted buffer `[type, length, payload..]`, waiting at most `timeout`.
    /// Returns `Ok(None)` when nothing was decoded in time.
    async fn read_with_format(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, DriverCode>;

    /// Close the decoder session
    async fn close(&mut self) -> Result<(), DriverCode>;
}
