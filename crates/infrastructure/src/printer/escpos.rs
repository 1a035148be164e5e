use domain::{Alignment, PrintElement, PrintJob};

const ESC: u8 = 0x1B;
const GS: u8 = 0x1D;
const LF: u8 = 0x0A;

/// Builds an ESC/POS byte stream
#[derive(Debug, Default)]
pub struct EscPosBuilder {
    buffer: Vec<u8>,
}

impl EscPosBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initialize(mut self) -> Self {
        // ESC @
        self.buffer.extend_from_slice(&[ESC, 0x40]);
        self
    }

    pub fn align(mut self, alignment: Alignment) -> Self {
        // ESC a n: 0 left, 1 center, 2 right
        let n = match alignment {
            Alignment::Left => 0,
            Alignment::Center => 1,
            Alignment::Right => 2,
        };
        self.buffer.extend_from_slice(&[ESC, 0x61, n]);
        self
    }

    pub fn bold(mut self, on: bool) -> Self {
        // ESC E n
        self.buffer.extend_from_slice(&[ESC, 0x45, u8::from(on)]);
        self
    }

    /// Character magnification, 1..=8 in both directions
    pub fn size(mut self, scale: u8) -> Self {
        let n = scale.clamp(1, 8) - 1;
        // GS ! n: high nibble width, low nibble height
        self.buffer.extend_from_slice(&[GS, 0x21, (n << 4) | n]);
        self
    }

    pub fn text_line(mut self, text: &str) -> Self {
        self.buffer.extend_from_slice(text.as_bytes());
        self.buffer.push(LF);
        self
    }

    pub fn empty_lines(mut self, n: u8) -> Self {
        self.buffer
            .extend(std::iter::repeat_n(LF, usize::from(n)));
        self
    }

    pub fn feed(mut self, n: u8) -> Self {
        // ESC d n: print and feed n lines
        self.buffer.extend_from_slice(&[ESC, 0x64, n]);
        self
    }

    /// Model 2 QR code with module size `size` (1..=16)
    pub fn qr_code(mut self, data: &str, size: u8) -> Self {
        let bytes = data.as_bytes();
        // Symbol storage holds at most 7089 bytes
        let len = bytes.len().min(7089) + 3;
        let [pl, ph, ..] = (len as u32).to_le_bytes();

        // GS ( k: select model 2
        self.buffer
            .extend_from_slice(&[GS, 0x28, 0x6B, 0x04, 0x00, 0x31, 0x41, 0x32, 0x00]);
        // module size
        self.buffer
            .extend_from_slice(&[GS, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x43, size.clamp(1, 16)]);
        // error correction level M
        self.buffer
            .extend_from_slice(&[GS, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x45, 0x31]);
        // store data
        self.buffer
            .extend_from_slice(&[GS, 0x28, 0x6B, pl, ph, 0x31, 0x50, 0x30]);
        self.buffer.extend_from_slice(&bytes[..len - 3]);
        // print symbol
        self.buffer
            .extend_from_slice(&[GS, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x51, 0x30]);
        self.buffer.push(LF);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.buffer
    }
}

/// Render a complete job. Formatting is reset after every element.
pub fn encode(job: &PrintJob) -> Vec<u8> {
    job.elements
        .iter()
        .fold(EscPosBuilder::new().initialize(), |builder, element| {
            let builder = match element {
                PrintElement::Text {
                    data,
                    alignment,
                    font_size,
                    bold,
                } => builder
                    .align(*alignment)
                    .bold(*bold)
                    .size(font_size.unwrap_or(1))
                    .text_line(data)
                    .bold(false)
                    .size(1),
                PrintElement::QrCode {
                    data,
                    size,
                    alignment,
                } => builder.align(*alignment).qr_code(data, *size),
                PrintElement::Space { lines } => builder.empty_lines(*lines),
                PrintElement::WalkPaper { steps } => builder.feed(*steps),
            };
            builder.align(Alignment::Left)
        })
        .build()
}
