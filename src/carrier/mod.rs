/// carrier/ — Format routing and the embedding engine's public face
///
/// The carrier family is detected from the file extension and routed
/// to the matching engine:
///
///   .png .bmp   lossless raster — adaptive or sequential LSB
///   .jpg .jpeg  JPEG — DCT-coefficient LSB
///   .wav        PCM audio — frame-byte LSB
///
/// Output extensions are checked against the cover family before any
/// work happens: writing a JPEG cover to a PNG would discard the
/// edited coefficient tables, and writing a raster cover to a JPEG
/// would destroy the LSBs in recompression. Both are hard errors.
pub(crate) mod audio;
pub(crate) mod jpeg;
pub(crate) mod raster;

use crate::error::{Result, StegError};
use crate::shuffle::PARTITION_SEED_LEN;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// The three carrier families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarrierKind {
    LosslessRaster,
    Jpeg,
    PcmAudio,
}

/// Embedding algorithm, as recorded in the key file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StegMode {
    Adaptive,
    Sequential,
    Dct,
}

impl StegMode {
    pub fn name(self) -> &'static str {
        match self {
            StegMode::Adaptive => "adaptive",
            StegMode::Sequential => "sequential",
            StegMode::Dct => "dct",
        }
    }
}

impl fmt::Display for StegMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StegMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s.to_ascii_lowercase().as_str() {
            "adaptive" => Ok(StegMode::Adaptive),
            "sequential" => Ok(StegMode::Sequential),
            "dct" => Ok(StegMode::Dct),
            other => Err(format!(
                "unknown mode '{other}'. Supported: adaptive, sequential, dct"
            )),
        }
    }
}

/// Capacity report for a cover file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacity {
    pub available_bytes: usize,
    pub mode: StegMode,
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Classify a carrier by its extension (case-insensitive).
pub fn detect(path: &Path) -> Result<CarrierKind> {
    match extension_of(path).as_str() {
        "png" | "bmp" => Ok(CarrierKind::LosslessRaster),
        "jpg" | "jpeg" => Ok(CarrierKind::Jpeg),
        "wav" => Ok(CarrierKind::PcmAudio),
        other => Err(StegError::UnsupportedFormat(format!(
            "unsupported carrier extension '.{other}'. Supported: .png, .bmp, .jpg, .jpeg, .wav"
        ))),
    }
}

fn validate_output(kind: CarrierKind, output: &Path) -> Result<()> {
    let ext = extension_of(output);
    let ok = match kind {
        CarrierKind::LosslessRaster => matches!(ext.as_str(), "png" | "bmp"),
        CarrierKind::Jpeg => matches!(ext.as_str(), "jpg" | "jpeg"),
        CarrierKind::PcmAudio => ext == "wav",
    };
    if ok {
        return Ok(());
    }
    let reason = match kind {
        CarrierKind::LosslessRaster => {
            "a lossless cover must be written as .png or .bmp — lossy re-encoding would destroy the embedded LSBs"
        }
        CarrierKind::Jpeg => {
            "a JPEG cover must be written as .jpg or .jpeg — any other format would discard the modified DCT coefficients"
        }
        CarrierKind::PcmAudio => "a WAV cover must be written as .wav",
    };
    Err(StegError::UnsupportedFormat(format!(
        "output '{}': {reason}",
        output.display()
    )))
}

/// Embed `payload` into the cover at `cover`, writing the stego file
/// to `output`. The payload is treated as opaque bytes — callers that
/// want confidentiality encrypt before embedding.
///
/// `key` seeds the slot permutation and is required for adaptive
/// mode; sequential, DCT and audio embedding ignore it.
pub fn embed(
    cover: &Path,
    payload: &[u8],
    output: &Path,
    key: Option<&[u8]>,
    mode: StegMode,
) -> Result<PathBuf> {
    let kind = detect(cover)?;
    validate_output(kind, output)?;

    match kind {
        CarrierKind::LosslessRaster => raster::embed(cover, payload, output, key, mode)?,
        CarrierKind::Jpeg => jpeg::embed(cover, payload, output)?,
        CarrierKind::PcmAudio => audio::embed(cover, payload, output)?,
    }
    Ok(output.to_path_buf())
}

/// Recover the payload bytes from a stego file.
pub fn extract(stego: &Path, key: Option<&[u8]>, mode: StegMode) -> Result<Vec<u8>> {
    match detect(stego)? {
        CarrierKind::LosslessRaster => raster::extract(stego, key, mode),
        CarrierKind::Jpeg => jpeg::extract(stego),
        CarrierKind::PcmAudio => audio::extract(stego),
    }
}

/// Embed two independent payloads into one adaptive raster cover.
///
/// The eligible slots are split into two disjoint halves by the
/// partition seed; each payload is then spread over its own half by
/// its own key. Both key files carry the same seed, so either key
/// alone reconstructs its half — and only its half.
pub fn embed_deniable(
    cover: &Path,
    real_payload: &[u8],
    decoy_payload: &[u8],
    output: &Path,
    real_key: &[u8],
    decoy_key: &[u8],
    partition_seed: &[u8; PARTITION_SEED_LEN],
) -> Result<PathBuf> {
    let kind = detect(cover)?;
    if kind != CarrierKind::LosslessRaster {
        return Err(StegError::UnsupportedFormat(
            "deniable embedding requires a lossless raster cover (.png or .bmp)".into(),
        ));
    }
    validate_output(kind, output)?;

    raster::embed_deniable(
        cover,
        real_payload,
        decoy_payload,
        output,
        real_key,
        decoy_key,
        partition_seed,
    )?;
    Ok(output.to_path_buf())
}

/// Recover one half of a deniable embed.
pub fn extract_deniable(
    stego: &Path,
    key: &[u8],
    partition_seed: &[u8; PARTITION_SEED_LEN],
    partition_half: u8,
) -> Result<Vec<u8>> {
    if detect(stego)? != CarrierKind::LosslessRaster {
        return Err(StegError::UnsupportedFormat(
            "deniable extraction requires a lossless raster stego file".into(),
        ));
    }
    raster::extract_deniable(stego, key, partition_seed, partition_half)
}

/// How many payload bytes a cover can hold in the given mode.
///
/// The mode is advisory for JPEG and WAV covers, whose algorithms are
/// fixed; the returned mode reflects what an embed would actually use.
pub fn get_capacity(path: &Path, mode: StegMode) -> Result<Capacity> {
    use crate::bits::LEN_HEADER_BITS;
    match detect(path)? {
        CarrierKind::LosslessRaster => {
            let img = raster::load_rgb(path)?;
            let slots = raster::slot_count(&img, mode);
            Ok(Capacity {
                available_bytes: slots.saturating_sub(LEN_HEADER_BITS) / 8,
                mode,
            })
        }
        CarrierKind::Jpeg => Ok(Capacity {
            available_bytes: jpeg::capacity(path)?,
            mode: StegMode::Dct,
        }),
        CarrierKind::PcmAudio => Ok(Capacity {
            available_bytes: audio::capacity(path)?,
            mode: StegMode::Sequential,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{self, CipherSuite};
    use image::{ImageBuffer, Rgb, RgbImage};
    use rand::RngCore;
    use tempfile::tempdir;

    fn solid_gray(w: u32, h: u32) -> RgbImage {
        ImageBuffer::from_pixel(w, h, Rgb([128u8, 128, 128]))
    }

    fn noise_image(w: u32, h: u32, mut state: u64) -> RgbImage {
        ImageBuffer::from_fn(w, h, |x, y| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(u64::from(x) * 31 + u64::from(y) * 17 + 1);
            Rgb([(state >> 33) as u8, (state >> 41) as u8, (state >> 25) as u8])
        })
    }

    fn noise_payload(n: usize, mut state: u64) -> Vec<u8> {
        (0..n)
            .map(|_| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                (state >> 33) as u8
            })
            .collect()
    }

    #[test]
    fn test_detect_is_case_insensitive() {
        assert_eq!(detect(Path::new("a.PNG")).unwrap(), CarrierKind::LosslessRaster);
        assert_eq!(detect(Path::new("a.Jpeg")).unwrap(), CarrierKind::Jpeg);
        assert_eq!(detect(Path::new("a.WAV")).unwrap(), CarrierKind::PcmAudio);
        assert!(matches!(
            detect(Path::new("a.gif")),
            Err(StegError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            detect(Path::new("noext")),
            Err(StegError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_raster_cover_rejects_jpeg_output() {
        let dir = tempdir().unwrap();
        let cover = dir.path().join("cover.png");
        solid_gray(16, 16).save(&cover).unwrap();

        let err = embed(&cover, b"x", &dir.path().join("out.jpg"), None, StegMode::Sequential)
            .unwrap_err();
        assert!(matches!(err, StegError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_jpeg_cover_rejects_png_output() {
        let err = embed(
            Path::new("cover.jpg"),
            b"x",
            Path::new("out.png"),
            None,
            StegMode::Dct,
        )
        .unwrap_err();
        // The output check fires before the cover is even opened
        assert!(matches!(err, StegError::UnsupportedFormat(_)));
    }

    // Scenario: sequential round-trip through the full pipeline on a
    // flat gray cover, the smallest end-to-end configuration.
    #[test]
    fn test_pipeline_sequential_roundtrip() {
        let dir = tempdir().unwrap();
        let cover = dir.path().join("cover.png");
        let stego = dir.path().join("stego.png");
        solid_gray(64, 64).save(&cover).unwrap();

        let enc = crypto::encrypt(b"hello", "pw", CipherSuite::Ascon128).unwrap();
        embed(&cover, &enc.ciphertext, &stego, None, StegMode::Sequential).unwrap();

        let ciphertext = extract(&stego, None, StegMode::Sequential).unwrap();
        assert_eq!(ciphertext, enc.ciphertext);

        let plaintext =
            crypto::decrypt(&ciphertext, "pw", CipherSuite::Ascon128, &enc.nonce, &enc.salt)
                .unwrap();
        assert_eq!(plaintext, b"hello");
    }

    // Scenario: adaptive round-trip on a textured cover with a 1 KiB
    // random payload.
    #[test]
    fn test_pipeline_adaptive_roundtrip() {
        let dir = tempdir().unwrap();
        let cover = dir.path().join("cover.png");
        let stego = dir.path().join("stego.png");
        noise_image(256, 256, 42).save(&cover).unwrap();

        let payload = noise_payload(1024, 7);
        let passphrase = "correct horse battery staple";
        let enc = crypto::encrypt(&payload, passphrase, CipherSuite::ChaCha20Poly1305).unwrap();

        embed(&cover, &enc.ciphertext, &stego, Some(&enc.key), StegMode::Adaptive).unwrap();

        let key = crypto::derive_key(passphrase, &enc.salt, CipherSuite::ChaCha20Poly1305).unwrap();
        assert_eq!(key, enc.key);

        let ciphertext = extract(&stego, Some(&key), StegMode::Adaptive).unwrap();
        let plaintext = crypto::decrypt(
            &ciphertext,
            passphrase,
            CipherSuite::ChaCha20Poly1305,
            &enc.nonce,
            &enc.salt,
        )
        .unwrap();
        assert_eq!(plaintext, payload);
    }

    // Scenario: wrong passphrase. The bad key either derives a slot
    // order whose header fails the length check, or (vanishingly
    // rarely) yields bytes the AEAD then rejects. Never a payload.
    #[test]
    fn test_pipeline_wrong_passphrase_fails() {
        let dir = tempdir().unwrap();
        let cover = dir.path().join("cover.png");
        let stego = dir.path().join("stego.png");
        noise_image(256, 256, 43).save(&cover).unwrap();

        let passphrase = "correct horse battery staple";
        let enc = crypto::encrypt(&noise_payload(1024, 3), passphrase, CipherSuite::Ascon128)
            .unwrap();
        embed(&cover, &enc.ciphertext, &stego, Some(&enc.key), StegMode::Adaptive).unwrap();

        let wrong = "correct horse battery stapl3";
        let bad_key = crypto::derive_key(wrong, &enc.salt, CipherSuite::Ascon128).unwrap();
        let result = extract(&stego, Some(&bad_key), StegMode::Adaptive).and_then(|ct| {
            crypto::decrypt(&ct, wrong, CipherSuite::Ascon128, &enc.nonce, &enc.salt)
        });
        assert!(matches!(
            result.unwrap_err(),
            StegError::BadCredentials | StegError::NoPayloadDetected
        ));
    }

    // Scenario: capacity rejection on a tiny cover.
    #[test]
    fn test_pipeline_capacity_rejection() {
        let dir = tempdir().unwrap();
        let cover = dir.path().join("tiny.png");
        solid_gray(8, 8).save(&cover).unwrap();

        let err = embed(
            &cover,
            &noise_payload(1024, 9),
            &dir.path().join("out.png"),
            None,
            StegMode::Sequential,
        )
        .unwrap_err();
        assert!(matches!(err, StegError::InsufficientCapacity { .. }));
    }

    // Scenario: JPEG round-trip through the full pipeline, with the
    // stego file re-opened by the strict coefficient reader.
    #[test]
    fn test_pipeline_jpeg_roundtrip() {
        use jpeg_encoder::{ColorType, Encoder, SamplingFactor};

        let dir = tempdir().unwrap();
        let cover = dir.path().join("cover.jpg");
        let stego = dir.path().join("stego.jpg");

        let mut encoder = Encoder::new_file(&cover, 90).unwrap();
        encoder.set_sampling_factor(SamplingFactor::F_2_2);
        let pixels = noise_payload(96 * 96 * 3, 31);
        encoder.encode(&pixels, 96, 96, ColorType::Rgb).unwrap();

        let enc = crypto::encrypt(b"secret", "jpg pass", CipherSuite::Aes256Gcm).unwrap();
        embed(&cover, &enc.ciphertext, &stego, None, StegMode::Dct).unwrap();

        crate::jpegcodec::Jpeg::read(&stego).unwrap();

        let ciphertext = extract(&stego, None, StegMode::Dct).unwrap();
        let plaintext = crypto::decrypt(
            &ciphertext,
            "jpg pass",
            CipherSuite::Aes256Gcm,
            &enc.nonce,
            &enc.salt,
        )
        .unwrap();
        assert_eq!(plaintext, b"secret");
    }

    // Scenario: deniable dual payload — disjoint recovery with both
    // keys, failure with a wrong key against either half.
    #[test]
    fn test_pipeline_deniable_recovery() {
        let dir = tempdir().unwrap();
        let cover = dir.path().join("cover.png");
        let stego = dir.path().join("stego.png");
        noise_image(512, 512, 99).save(&cover).unwrap();

        let real_pass = "the real passphrase";
        let decoy_pass = "the harmless passphrase";
        let enc_real = crypto::encrypt(b"real", real_pass, CipherSuite::Ascon128).unwrap();
        let enc_decoy = crypto::encrypt(b"decoy", decoy_pass, CipherSuite::Ascon128).unwrap();

        let mut seed = [0u8; PARTITION_SEED_LEN];
        rand::thread_rng().fill_bytes(&mut seed);

        embed_deniable(
            &cover,
            &enc_real.ciphertext,
            &enc_decoy.ciphertext,
            &stego,
            &enc_real.key,
            &enc_decoy.key,
            &seed,
        )
        .unwrap();

        let ct_real = extract_deniable(&stego, &enc_real.key, &seed, 0).unwrap();
        let plain_real = crypto::decrypt(
            &ct_real,
            real_pass,
            CipherSuite::Ascon128,
            &enc_real.nonce,
            &enc_real.salt,
        )
        .unwrap();
        assert_eq!(plain_real, b"real");

        let ct_decoy = extract_deniable(&stego, &enc_decoy.key, &seed, 1).unwrap();
        let plain_decoy = crypto::decrypt(
            &ct_decoy,
            decoy_pass,
            CipherSuite::Ascon128,
            &enc_decoy.nonce,
            &enc_decoy.salt,
        )
        .unwrap();
        assert_eq!(plain_decoy, b"decoy");

        // Wrong key against either half never yields a payload
        let wrong_pass = "not either passphrase";
        let wrong_key =
            crypto::derive_key(wrong_pass, &enc_real.salt, CipherSuite::Ascon128).unwrap();
        let result = extract_deniable(&stego, &wrong_key, &seed, 0).and_then(|ct| {
            crypto::decrypt(
                &ct,
                wrong_pass,
                CipherSuite::Ascon128,
                &enc_real.nonce,
                &enc_real.salt,
            )
        });
        assert!(matches!(
            result.unwrap_err(),
            StegError::BadCredentials | StegError::NoPayloadDetected
        ));
    }

    #[test]
    fn test_deniable_rejects_non_raster_cover() {
        let err = embed_deniable(
            Path::new("cover.wav"),
            b"a",
            b"b",
            Path::new("out.wav"),
            &[1u8; 32],
            &[2u8; 32],
            &[0u8; PARTITION_SEED_LEN],
        )
        .unwrap_err();
        assert!(matches!(err, StegError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_capacity_modes() {
        let dir = tempdir().unwrap();
        let flat = dir.path().join("flat.png");
        let noisy = dir.path().join("noisy.png");
        solid_gray(64, 64).save(&flat).unwrap();
        noise_image(64, 64, 12).save(&noisy).unwrap();

        let seq = get_capacity(&flat, StegMode::Sequential).unwrap();
        assert_eq!(seq.available_bytes, (64 * 64 * 3 - 32) / 8);
        assert_eq!(seq.mode, StegMode::Sequential);

        // Flat cover has no textured pixels at all
        let flat_adaptive = get_capacity(&flat, StegMode::Adaptive).unwrap();
        assert_eq!(flat_adaptive.available_bytes, 0);

        let noisy_adaptive = get_capacity(&noisy, StegMode::Adaptive).unwrap();
        assert!(noisy_adaptive.available_bytes > 1000);
    }

    #[test]
    fn test_capacity_forces_carrier_mode() {
        use jpeg_encoder::{ColorType, Encoder, SamplingFactor};

        let dir = tempdir().unwrap();
        let cover = dir.path().join("cover.jpg");
        let mut encoder = Encoder::new_file(&cover, 90).unwrap();
        encoder.set_sampling_factor(SamplingFactor::F_2_2);
        let pixels = noise_payload(64 * 64 * 3, 8);
        encoder.encode(&pixels, 64, 64, ColorType::Rgb).unwrap();

        let cap = get_capacity(&cover, StegMode::Adaptive).unwrap();
        assert_eq!(cap.mode, StegMode::Dct);
        assert!(cap.available_bytes > 0);
    }
}
