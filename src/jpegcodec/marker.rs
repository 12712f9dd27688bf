/// jpegcodec/marker.rs — JPEG marker constants
///
/// Only the markers the parser must understand by name are listed;
/// everything else (APPn, COM, DQT, ...) is passed through verbatim.

/// Start of image.
pub const SOI: u8 = 0xD8;
/// End of image.
pub const EOI: u8 = 0xD9;
/// Start of scan.
pub const SOS: u8 = 0xDA;
/// Define number of lines (post-scan height patch, unsupported).
pub const DNL: u8 = 0xDC;
/// Define restart interval.
pub const DRI: u8 = 0xDD;
/// Define Huffman tables.
pub const DHT: u8 = 0xC4;
/// Define arithmetic conditioning (arithmetic coding, unsupported).
pub const DAC: u8 = 0xCC;
/// Baseline sequential DCT frame.
pub const SOF0: u8 = 0xC0;
/// Extended sequential DCT frame, Huffman coded.
pub const SOF1: u8 = 0xC1;
/// Progressive DCT frame (unsupported).
pub const SOF2: u8 = 0xC2;

/// Any SOFn marker. DHT (0xC4), JPG (0xC8) and DAC (0xCC) share the
/// 0xC0 block but are not frame markers.
pub fn is_sof(m: u8) -> bool {
    (0xC0..=0xCF).contains(&m) && m != DHT && m != 0xC8 && m != DAC
}

/// RST0..RST7 — restart markers inside entropy-coded data.
pub fn is_rst(m: u8) -> bool {
    (0xD0..=0xD7).contains(&m)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sof_classification() {
        assert!(is_sof(SOF0));
        assert!(is_sof(SOF1));
        assert!(is_sof(SOF2));
        assert!(!is_sof(DHT));
        assert!(!is_sof(DAC));
        assert!(!is_sof(SOS));
    }

    #[test]
    fn test_rst_range() {
        assert!(is_rst(0xD0));
        assert!(is_rst(0xD7));
        assert!(!is_rst(SOI));
        assert!(!is_rst(EOI));
    }
}
