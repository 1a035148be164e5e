mod common;

use application::{Bridge, BridgeDrivers, BridgeSettings};
use async_trait::async_trait;
use common::{Harness, ManualPower, ScriptedDecoder, discharging};
use domain::driver::PrinterDriver;
use domain::{
    Alignment, BatteryStatus, BridgeError, PowerNotification, PrintElement, PrintJob,
    PrinterError, PrinterStatus,
};
use mockall::mock;
use tokio::sync::mpsc;

mock! {
    pub Printer {}

    #[async_trait]
    impl PrinterDriver for Printer {
        async fn open(&mut self) -> Result<(), PrinterError>;
        async fn close(&mut self) -> Result<(), PrinterError>;
        fn is_open(&self) -> bool;
        async fn check_status(&mut self) -> Result<PrinterStatus, PrinterError>;
        async fn print(&mut self, job: &PrintJob) -> Result<(), PrinterError>;
    }
}

fn receipt() -> Vec<PrintElement> {
    vec![
        PrintElement::Text {
            data: "ORDER #1042".to_string(),
            alignment: Alignment::Center,
            font_size: Some(2),
            bold: true,
        },
        PrintElement::Space { lines: 1 },
        PrintElement::QrCode {
            data: "https://example.com/o/1042".to_string(),
            size: 6,
            alignment: Alignment::Center,
        },
        PrintElement::WalkPaper { steps: 2 },
    ]
}

#[tokio::test]
async fn test_low_battery_print_never_reaches_driver() {
    let mut printer = MockPrinter::new();
    printer.expect_open().times(1).returning(|| Ok(()));
    printer.expect_close().returning(|| Ok(()));
    printer.expect_is_open().return_const(true);
    printer.expect_print().never();

    let power = ManualPower::default();
    let (launches, _rx) = mpsc::unbounded_channel();
    let drivers = BridgeDrivers {
        printer: Box::new(printer),
        decoder: Box::new(ScriptedDecoder::default()),
        launcher: Box::new(common::ChannelLauncher {
            launches,
            installed: true,
        }),
        power: Box::new(power.clone()),
    };
    let (bridge, task) = Bridge::spawn(drivers, BridgeSettings::default());

    assert!(bridge.connect().await.unwrap());
    power.notify(discharging(15, 100));
    assert!(bridge.snapshot().await.unwrap().low_battery);

    assert_eq!(bridge.print(receipt()).await, Err(BridgeError::LowBattery));

    // Mock expectations are verified when the bridge drops the driver
    bridge.shutdown();
    task.await.unwrap();
}

#[tokio::test]
async fn test_print_admitted_when_battery_ok() {
    let h = Harness::start();
    h.bridge.connect().await.unwrap();
    h.power.notify(discharging(80, 100));
    h.settle().await;

    h.bridge.print(receipt()).await.unwrap();

    let jobs = h.printer.jobs.lock().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].elements, receipt());
}

#[tokio::test]
async fn test_print_while_disconnected_is_unavailable() {
    let h = Harness::start();

    assert_eq!(
        h.bridge.print(receipt()).await,
        Err(BridgeError::DeviceUnavailable)
    );
    assert!(h.printer.jobs.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_battery_threshold_through_bridge() {
    let h = Harness::start();
    h.bridge.connect().await.unwrap();

    h.power.notify(discharging(20, 100));
    assert!(h.settle().await.low_battery, "20% is at the threshold");

    h.power.notify(discharging(21, 100));
    assert!(!h.settle().await.low_battery);

    h.power.notify(PowerNotification::CapacityEvent {
        event_status: 0,
        level: 0,
    });
    assert!(h.settle().await.low_battery);

    h.power.notify(PowerNotification::BatteryChanged {
        status: BatteryStatus::Charging,
        level: 100,
        scale: 100,
    });
    assert!(
        h.settle().await.low_battery,
        "charging notifications leave the flag as it was"
    );

    let report = h.bridge.check_status().await.unwrap();
    assert!(report.low_battery);
}

#[tokio::test]
async fn test_low_battery_flag_survives_reconnect() {
    let h = Harness::start();
    h.bridge.connect().await.unwrap();
    h.power.notify(discharging(1, 100));
    h.settle().await;

    h.bridge.disconnect().await.unwrap();
    h.bridge.connect().await.unwrap();

    assert_eq!(h.bridge.print(receipt()).await, Err(BridgeError::LowBattery));
    assert!(h.printer.jobs.lock().unwrap().is_empty());
}
