/// Raw card data handed back by the reader on a successful scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardData {
    /// UID bytes as reported by the tag (4, 7 or 10 bytes for MIFARE)
    pub uid: Vec<u8>,
    /// Human-readable PICC type label (e.g. "MIFARE 1KB")
    pub card_type: String,
}

/// Polled RFID reader hardware behind a narrow seam.
///
/// The access-control store consumes presence events from this trait and
/// never drives the radio itself. Implementations are expected to be
/// non-blocking; `card_present` is polled from the main control loop.
pub trait CardReader {
    /// True when a new card has entered the field since the last poll
    fn card_present(&mut self) -> bool;

    /// Read the UID of the present card; `None` when the serial read fails
    fn read_card(&mut self) -> Option<CardData>;

    /// Put the current card to sleep so the next poll does not re-read it
    fn halt_card(&mut self);

    /// Run the hardware self test
    fn self_test(&mut self) -> bool;

    /// Soft-reset the reader chip
    fn reset(&mut self);

    /// Raw contents of the firmware version register
    fn version_register(&mut self) -> u8;
}

/// Describe a raw version-register value.
///
/// Genuine MFRC522 chips report 0x91 or 0x92; 0x88 is a known clone
/// signature, and 0x00/0xFF mean the SPI link itself is dead.
pub fn describe_version(raw: u8) -> &'static str {
    match raw {
        0x91 => "v1.0",
        0x92 => "v2.0",
        0x88 => "clone",
        0x00 | 0xFF => "communication failure",
        _ => "unknown",
    }
}
