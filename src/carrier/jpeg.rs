/// carrier/jpeg.rs — DCT-domain embedding for JPEG covers
///
/// Bits live in the magnitude LSBs of quantised DCT coefficients.
/// Coefficients in {-1, 0, 1} are skipped on both sides: zeros and
/// ones dominate the coefficient distribution, and touching them
/// would shift values into or out of the skip set and desynchronise
/// the extract-time traversal. Writing the magnitude LSB (sign kept)
/// means an eligible coefficient always stays eligible: ±2 flips to
/// ±3, never to ∓1.
///
/// Eligibility is purely value-based; DC coefficients participate
/// like any other. A DC edit shifts two delta-coded differences, and
/// in the rare cover whose DC table lacks a code for the new
/// difference category the re-encode fails cleanly in
/// `HuffmanEncoder::emit` rather than corrupting the scan.
///
/// Traversal is plane-major, then row-major, then column-major — no
/// permutation. The output file keeps every non-scan byte of the
/// cover verbatim.
use crate::bits::{bits_to_bytes, bytes_to_bits, bits_to_uint, uint_to_bits, LEN_HEADER_BITS};
use crate::error::{Result, StegError};
use crate::jpegcodec::{CoeffPlane, Jpeg};
use std::fs;
use std::path::Path;

#[inline]
fn eligible(c: i16) -> bool {
    !(-1..=1).contains(&c)
}

/// Set the magnitude LSB of a coefficient, preserving its sign.
fn with_lsb(c: i16, bit: u8) -> i16 {
    let mag = (i32::from(c).abs() & !1) | i32::from(bit);
    if c < 0 {
        (-mag) as i16
    } else {
        mag as i16
    }
}

fn eligible_count(planes: &[CoeffPlane]) -> usize {
    let mut count = 0;
    for plane in planes {
        for r in 0..plane.rows {
            for c in 0..plane.cols {
                if eligible(plane.get(r, c)) {
                    count += 1;
                }
            }
        }
    }
    count
}

pub(crate) fn embed(cover: &Path, payload: &[u8], output: &Path) -> Result<()> {
    let mut jpeg = Jpeg::read(cover)?;

    let len = u32::try_from(payload.len()).map_err(|_| {
        StegError::InvalidArgument("payload exceeds the 32-bit length header".into())
    })?;
    let mut stream = uint_to_bits(len, LEN_HEADER_BITS);
    stream.extend(bytes_to_bits(payload));

    let capacity = eligible_count(&jpeg.planes);
    if stream.len() > capacity {
        return Err(StegError::InsufficientCapacity {
            available: capacity.saturating_sub(LEN_HEADER_BITS) / 8,
            required: payload.len(),
        });
    }

    let mut bit_idx = 0usize;
    'planes: for plane in &mut jpeg.planes {
        for r in 0..plane.rows {
            for c in 0..plane.cols {
                if bit_idx >= stream.len() {
                    break 'planes;
                }
                let v = plane.get(r, c);
                if !eligible(v) {
                    continue;
                }
                plane.set(r, c, with_lsb(v, stream[bit_idx]));
                bit_idx += 1;
            }
        }
    }

    let bytes = jpeg.to_bytes()?;
    if let Err(e) = fs::write(output, &bytes) {
        let _ = fs::remove_file(output);
        return Err(e.into());
    }
    Ok(())
}

pub(crate) fn extract(stego: &Path) -> Result<Vec<u8>> {
    let jpeg = Jpeg::read(stego)?;

    let mut bits = Vec::new();
    for plane in &jpeg.planes {
        for r in 0..plane.rows {
            for c in 0..plane.cols {
                let v = plane.get(r, c);
                if eligible(v) {
                    bits.push((v & 1) as u8);
                }
            }
        }
    }

    if bits.len() < LEN_HEADER_BITS {
        return Err(StegError::NoPayloadDetected);
    }
    let payload_len = bits_to_uint(&bits[..LEN_HEADER_BITS])? as usize;
    let max_len = (bits.len() - LEN_HEADER_BITS) / 8;
    if payload_len == 0 || payload_len > max_len {
        return Err(StegError::NoPayloadDetected);
    }

    let payload_bits = &bits[LEN_HEADER_BITS..LEN_HEADER_BITS + payload_len * 8];
    Ok(bits_to_bytes(payload_bits))
}

pub(crate) fn capacity(path: &Path) -> Result<usize> {
    let jpeg = Jpeg::read(path)?;
    Ok(eligible_count(&jpeg.planes).saturating_sub(LEN_HEADER_BITS) / 8)
}
