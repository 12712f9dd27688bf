/// carrier/audio.rs — WAV sample LSB embedding
///
/// The carrier is the raw PCM frame buffer: every byte of every
/// sample, little-endian within a sample, is one slot. Bits go into
/// byte LSBs in natural order with the usual 32-bit length header.
/// The WAV header (sample rate, channel count, sample width) is
/// carried over to the output verbatim.
///
/// Integer PCM at 8, 16, 24 and 32 bits per sample is supported.
/// Floating-point WAV is rejected: bit-twiddled float samples can
/// denormalise audibly and some writers renormalise them on save.
use crate::bits::{bits_to_bytes, bytes_to_bits, bits_to_uint, uint_to_bits, LEN_HEADER_BITS};
use crate::error::{Result, StegError};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::fs;
use std::path::Path;

pub(crate) struct WavMedium {
    pub spec: WavSpec,
    /// Raw frame bytes, little-endian per sample.
    pub frames: Vec<u8>,
}

pub(crate) fn load(path: &Path) -> Result<WavMedium> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();

    if spec.sample_format == SampleFormat::Float {
        return Err(StegError::UnsupportedFormat(
            "floating-point WAV covers are not supported; use integer PCM".into(),
        ));
    }

    let mut frames = Vec::new();
    match spec.bits_per_sample {
        8 => {
            for sample in reader.samples::<i8>() {
                frames.push(sample? as u8);
            }
        }
        16 => {
            for sample in reader.samples::<i16>() {
                frames.extend_from_slice(&sample?.to_le_bytes());
            }
        }
        24 => {
            for sample in reader.samples::<i32>() {
                frames.extend_from_slice(&sample?.to_le_bytes()[..3]);
            }
        }
        32 => {
            for sample in reader.samples::<i32>() {
                frames.extend_from_slice(&sample?.to_le_bytes());
            }
        }
        other => {
            return Err(StegError::UnsupportedFormat(format!(
                "{other}-bit PCM is not supported"
            )))
        }
    }

    Ok(WavMedium { spec, frames })
}

fn save(medium: &WavMedium, output: &Path) -> Result<()> {
    let mut writer = WavWriter::create(output, medium.spec)?;
    match medium.spec.bits_per_sample {
        8 => {
            for &b in &medium.frames {
                writer.write_sample(b as i8)?;
            }
        }
        16 => {
            for chunk in medium.frames.chunks_exact(2) {
                writer.write_sample(i16::from_le_bytes([chunk[0], chunk[1]]))?;
            }
        }
        24 => {
            for chunk in medium.frames.chunks_exact(3) {
                let v = (i32::from(chunk[2] as i8) << 16)
                    | (i32::from(chunk[1]) << 8)
                    | i32::from(chunk[0]);
                writer.write_sample(v)?;
            }
        }
        32 => {
            for chunk in medium.frames.chunks_exact(4) {
                writer.write_sample(i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))?;
            }
        }
        other => {
            return Err(StegError::UnsupportedFormat(format!(
                "{other}-bit PCM is not supported"
            )))
        }
    }
    writer.finalize()?;
    Ok(())
}

pub(crate) fn embed(cover: &Path, payload: &[u8], output: &Path) -> Result<()> {
    let mut medium = load(cover)?;

    let len = u32::try_from(payload.len()).map_err(|_| {
        StegError::InvalidArgument("payload exceeds the 32-bit length header".into())
    })?;
    let mut stream = uint_to_bits(len, LEN_HEADER_BITS);
    stream.extend(bytes_to_bits(payload));

    if stream.len() > medium.frames.len() {
        return Err(StegError::InsufficientCapacity {
            available: medium.frames.len().saturating_sub(LEN_HEADER_BITS) / 8,
            required: payload.len(),
        });
    }

    for (byte, &bit) in medium.frames.iter_mut().zip(stream.iter()) {
        *byte = (*byte & 0xFE) | bit;
    }

    if let Err(e) = save(&medium, output) {
        let _ = fs::remove_file(output);
        return Err(e);
    }
    Ok(())
}

pub(crate) fn extract(stego: &Path) -> Result<Vec<u8>> {
    let medium = load(stego)?;
    let frames = &medium.frames;

    if frames.len() < LEN_HEADER_BITS {
        return Err(StegError::NoPayloadDetected);
    }
    let header: Vec<u8> = frames[..LEN_HEADER_BITS].iter().map(|b| b & 1).collect();
    let payload_len = bits_to_uint(&header)? as usize;
    let max_len = (frames.len() - LEN_HEADER_BITS) / 8;
    if payload_len == 0 || payload_len > max_len {
        return Err(StegError::NoPayloadDetected);
    }

    let payload_bits: Vec<u8> = frames[LEN_HEADER_BITS..LEN_HEADER_BITS + payload_len * 8]
        .iter()
        .map(|b| b & 1)
        .collect();
    Ok(bits_to_bytes(&payload_bits))
}

pub(crate) fn capacity(path: &Path) -> Result<usize> {
    let medium = load(path)?;
    Ok(medium.frames.len().saturating_sub(LEN_HEADER_BITS) / 8)
}
