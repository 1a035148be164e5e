pub mod escpos;
pub mod file_printer;
pub mod mock_printer;
pub mod network_printer;

pub use escpos::EscPosBuilder;
pub use file_printer::FilePrinter;
pub use mock_printer::MockPrinter;
pub use network_printer::NetworkPrinter;
