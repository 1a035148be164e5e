use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use domain::DriverCode;
use domain::driver::{DecodeReader, ScanListener};
use serde::Deserialize;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep};
use tokio_util::sync::CancellationToken;

use super::{ERR_ALREADY_OPEN, ERR_NOT_OPEN, format_record};

#[derive(Debug, Deserialize, Clone)]
pub struct SimulatorConfig {
    pub interval_ms: u64,
    pub samples: Vec<String>,
    #[serde(default = "default_record_type")]
    pub record_type: u8,
}

fn default_record_type() -> u8 {
    1
}

type SharedListener = Arc<RwLock<Option<Arc<dyn ScanListener>>>>;

/// Decoder that "scans" a fixed list of codes on a timer
pub struct SimulatedDecodeReader {
    config: SimulatorConfig,
    listener: SharedListener,
    session: Option<(CancellationToken, JoinHandle<()>)>,
    cursor: usize,
}

impl SimulatedDecodeReader {
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            config,
            listener: Arc::new(RwLock::new(None)),
            session: None,
            cursor: 0,
        }
    }

    fn next_sample(&mut self) -> Option<Vec<u8>> {
        let sample = self.config.samples.get(self.cursor % self.config.samples.len().max(1))?;
        self.cursor += 1;
        Some(sample.as_bytes().to_vec())
    }

    fn period(&self) -> Duration {
        Duration::from_millis(self.config.interval_ms.max(1))
    }
}

#[async_trait]
impl DecodeReader for SimulatedDecodeReader {
    async fn open(&mut self, baud_rate: u32) -> Result<(), DriverCode> {
        if self.session.is_some() {
            return Err(DriverCode(ERR_ALREADY_OPEN));
        }

        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();
        let listener = self.listener.clone();
        let samples = self.config.samples.clone();
        let mut timer = interval(self.period());

        let task = tokio::spawn(async move {
            // First tick completes immediately
            timer.tick().await;
            for sample in samples.iter().cycle() {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = timer.tick() => {
                        let current = listener.read().ok().and_then(|l| l.clone());
                        if let Some(listener) = current {
                            listener.on_data(sample.as_bytes().to_vec());
                        }
                    }
                }
            }
        });

        self.session = Some((cancel_token, task));
        tracing::info!(baud_rate, interval_ms = self.config.interval_ms, "Simulated decoder opened");
        Ok(())
    }

    fn set_listener(&mut self, listener: Option<Arc<dyn ScanListener>>) {
        if let Ok(mut slot) = self.listener.write() {
            *slot = listener;
        }
    }

    async fn read_with_format(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, DriverCode> {
        if self.session.is_none() {
            return Err(DriverCode(ERR_NOT_OPEN));
        }

        let period = self.period();
        if period > timeout {
            sleep(timeout).await;
            return Ok(None);
        }
        sleep(period).await;

        let record_type = self.config.record_type;
        Ok(self
            .next_sample()
            .map(|sample| format_record(record_type, &sample)))
    }

    async fn close(&mut self) -> Result<(), DriverCode> {
        if let Some((token, task)) = self.session.take() {
            token.cancel();
            let _ = task.await;
            tracing::info!("Simulated decoder closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Collect(Mutex<Vec<Vec<u8>>>);

    impl ScanListener for Collect {
        fn on_data(&self, data: Vec<u8>) {
            self.0.lock().unwrap().push(data);
        }
    }

    fn config(interval_ms: u64) -> SimulatorConfig {
        SimulatorConfig {
            interval_ms,
            samples: vec!["AAA".to_string(), "BB".to_string()],
            record_type: 1,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_streams_samples_to_listener() {
        let mut reader = SimulatedDecodeReader::new(config(100));
        let collect = Arc::new(Collect(Mutex::new(Vec::new())));

        reader.open(115_200).await.unwrap();
        reader.set_listener(Some(collect.clone() as Arc<dyn ScanListener>));
        sleep(Duration::from_millis(250)).await;
        reader.close().await.unwrap();

        let seen = collect.0.lock().unwrap().clone();
        assert_eq!(seen, vec![b"AAA".to_vec(), b"BB".to_vec()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_reads_formatted_records() {
        let mut reader = SimulatedDecodeReader::new(config(10));
        reader.open(9600).await.unwrap();

        let first = reader.read_with_format(Duration::from_millis(50)).await.unwrap();
        assert_eq!(first, Some(vec![1, 3, b'A', b'A', b'A']));
        let second = reader.read_with_format(Duration::from_millis(50)).await.unwrap();
        assert_eq!(second, Some(vec![1, 2, b'B', b'B']));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_times_out_when_slower_than_timeout() {
        let mut reader = SimulatedDecodeReader::new(config(1000));
        reader.open(9600).await.unwrap();
        assert_eq!(reader.read_with_format(Duration::from_millis(50)).await, Ok(None));
    }

    #[tokio::test]
    async fn test_double_open_and_closed_read() {
        let mut reader = SimulatedDecodeReader::new(config(1000));
        assert_eq!(
            reader.read_with_format(Duration::from_millis(1)).await,
            Err(DriverCode(ERR_NOT_OPEN))
        );
        reader.open(9600).await.unwrap();
        assert_eq!(reader.open(9600).await, Err(DriverCode(ERR_ALREADY_OPEN)));
        reader.close().await.unwrap();
    }
}
