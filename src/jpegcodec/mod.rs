/// jpegcodec/ — Coefficient-level JPEG transcoding
///
/// Gives the carrier engine read/write access to a JPEG's quantised
/// DCT coefficients without ever round-tripping through pixels:
///
///   bytes → parse → huffman-decode scan → planes → edit LSBs
///         → huffman-encode scan (same tables) → bytes
///
/// Re-quantisation never happens, so a decode/encode cycle with no
/// edits reproduces every coefficient exactly, and the output differs
/// from the input only inside the entropy-coded segment.
pub mod huffman;
pub mod marker;
pub mod parser;
pub mod scan;
pub mod writer;

pub use parser::{parse_jpeg, JpegSegments};
pub use scan::{decode_scan, encode_scan, CoeffPlane};
pub use writer::write_jpeg;

use crate::error::Result;
use std::fs;
use std::path::Path;

/// A parsed JPEG with its coefficient planes decoded and every
/// non-scan byte retained for pass-through.
pub struct Jpeg {
    segments: JpegSegments,
    /// One plane per colour component, natural sample order.
    pub planes: Vec<CoeffPlane>,
}

impl Jpeg {
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let segments = parse_jpeg(data)?;
        let planes = decode_scan(&segments)?;
        Ok(Self { segments, planes })
    }

    pub fn read(path: &Path) -> Result<Self> {
        Self::from_bytes(&fs::read(path)?)
    }

    /// Serialise with the current planes re-encoded through the
    /// file's original Huffman tables.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let new_scan = encode_scan(&self.planes, &self.segments)?;
        Ok(write_jpeg(&self.segments, &new_scan))
    }
}
