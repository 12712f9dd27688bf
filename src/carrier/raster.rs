/// carrier/raster.rs — Lossless raster (PNG/BMP) LSB embedding
///
/// Two modes. Sequential writes the bit stream into every channel LSB
/// in natural order. Adaptive restricts slots to channels of textured
/// pixels and visits them in a key-seeded pseudorandom order, so the
/// payload is spread across the image and slot selection is bound to
/// the passphrase.
///
/// The adaptive mask is computed on an LSB-zeroed copy of the pixels.
/// That makes it invariant under the embedding itself: the mask
/// derived from the stego image is byte-identical to the mask derived
/// from the cover, which is the sole reason extraction can rebuild
/// the same slot sequence from the stego file alone.
///
/// Pixels are always decoded into an independently owned RGB buffer
/// before mutation and saved from that same buffer. The decoder
/// handle is released at the end of `load_rgb`; no view into decoder
/// state outlives it.
use crate::bits::{bits_to_bytes, bytes_to_bits, bits_to_uint, uint_to_bits, LEN_HEADER_BITS};
use crate::error::{Result, StegError};
use crate::shuffle;
use crate::carrier::StegMode;
use image::RgbImage;
use std::fs;
use std::path::Path;

/// 3×3 local variance above this marks a pixel as textured.
const VARIANCE_THRESHOLD: f64 = 10.0;

/// Decode any supported raster file into an owned RGB8 buffer.
pub(crate) fn load_rgb(path: &Path) -> Result<RgbImage> {
    let decoded = image::open(path)?;
    Ok(decoded.to_rgb8())
}

// ── adaptive embedding mask ──────────────────────────────────────────

/// Reflect an out-of-range window coordinate back into `0..n`,
/// mirroring around the edge without repeating it.
fn reflect(i: isize, n: usize) -> usize {
    let n = n as isize;
    let mut i = i;
    if i < 0 {
        i = -i;
    }
    if i >= n {
        i = 2 * n - 2 - i;
    }
    i.clamp(0, n - 1) as usize
}

/// Per-pixel eligibility mask for adaptive mode, row-major.
///
/// All channel LSBs are zeroed before the grayscale conversion, so
/// one-bit embedding can never flip a pixel's mask entry.
pub(crate) fn compute_mask(img: &RgbImage) -> Vec<bool> {
    let (w, h) = (img.width() as usize, img.height() as usize);
    let px: &[u8] = img;

    let mut gray = vec![0f64; w * h];
    for (i, g) in gray.iter_mut().enumerate() {
        let r = px[3 * i] & 0xFE;
        let g_ch = px[3 * i + 1] & 0xFE;
        let b = px[3 * i + 2] & 0xFE;
        *g = (f64::from(r) + f64::from(g_ch) + f64::from(b)) / 3.0;
    }

    let mut mask = vec![false; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut sum = 0f64;
            let mut sum_sq = 0f64;
            for dy in -1isize..=1 {
                for dx in -1isize..=1 {
                    let yy = reflect(y as isize + dy, h);
                    let xx = reflect(x as isize + dx, w);
                    let v = gray[yy * w + xx];
                    sum += v;
                    sum_sq += v * v;
                }
            }
            let mean = sum / 9.0;
            let variance = sum_sq / 9.0 - mean * mean;
            mask[y * w + x] = variance > VARIANCE_THRESHOLD;
        }
    }
    mask
}

/// Flat channel indices of every masked pixel, natural order.
fn eligible_channels(mask: &[bool]) -> Vec<usize> {
    let mut indices = Vec::new();
    for (p, &textured) in mask.iter().enumerate() {
        if textured {
            indices.extend_from_slice(&[3 * p, 3 * p + 1, 3 * p + 2]);
        }
    }
    indices
}

// ── slot sequences ───────────────────────────────────────────────────

/// The ordered slot addresses an embed or extract will touch.
/// Sequential mode is the identity and never materialises a vector.
pub(crate) enum SlotSeq {
    Natural(usize),
    Permuted(Vec<usize>),
}

impl SlotSeq {
    pub(crate) fn len(&self) -> usize {
        match self {
            SlotSeq::Natural(n) => *n,
            SlotSeq::Permuted(v) => v.len(),
        }
    }

    #[inline]
    fn index(&self, i: usize) -> usize {
        match self {
            SlotSeq::Natural(_) => i,
            SlotSeq::Permuted(v) => v[i],
        }
    }
}

fn slot_sequence(img: &RgbImage, key: Option<&[u8]>, mode: StegMode) -> Result<SlotSeq> {
    match mode {
        StegMode::Sequential => Ok(SlotSeq::Natural(img.as_raw().len())),
        StegMode::Adaptive => {
            let key = key.ok_or(StegError::MissingKey)?;
            let mut indices = eligible_channels(&compute_mask(img));
            let mut rng = shuffle::rng_from_key(key);
            shuffle::shuffle(&mut indices, &mut rng);
            Ok(SlotSeq::Permuted(indices))
        }
        StegMode::Dct => Err(StegError::InvalidArgument(
            "mode 'dct' applies to JPEG covers only".into(),
        )),
    }
}

/// Slot sequence for one half of a deniable partition.
fn deniable_slots(
    img: &RgbImage,
    key: &[u8],
    partition_seed: &[u8; shuffle::PARTITION_SEED_LEN],
    half: u8,
) -> Vec<usize> {
    let indices = eligible_channels(&compute_mask(img));
    let (half_0, half_1) = shuffle::split_halves(indices, partition_seed);
    let mut chosen = if half == 0 { half_0 } else { half_1 };
    let mut rng = shuffle::rng_from_key(key);
    shuffle::shuffle(&mut chosen, &mut rng);
    chosen
}

// ── bit-level read/write ─────────────────────────────────────────────

fn write_bits(px: &mut [u8], slots: &SlotSeq, bits: &[u8]) {
    for (i, &bit) in bits.iter().enumerate() {
        let s = slots.index(i);
        px[s] = (px[s] & 0xFE) | bit;
    }
}

fn read_bits(px: &[u8], slots: &SlotSeq, offset: usize, n: usize) -> Vec<u8> {
    (offset..offset + n).map(|i| px[slots.index(i)] & 1).collect()
}

fn build_stream(payload: &[u8]) -> Result<Vec<u8>> {
    let len = u32::try_from(payload.len()).map_err(|_| {
        StegError::InvalidArgument("payload exceeds the 32-bit length header".into())
    })?;
    let mut stream = uint_to_bits(len, LEN_HEADER_BITS);
    stream.extend(bytes_to_bits(payload));
    Ok(stream)
}

fn read_payload(px: &[u8], slots: &SlotSeq) -> Result<Vec<u8>> {
    if slots.len() < LEN_HEADER_BITS {
        return Err(StegError::NoPayloadDetected);
    }
    let header = read_bits(px, slots, 0, LEN_HEADER_BITS);
    let payload_len = bits_to_uint(&header)? as usize;
    let max_len = (slots.len() - LEN_HEADER_BITS) / 8;
    if payload_len == 0 || payload_len > max_len {
        return Err(StegError::NoPayloadDetected);
    }
    let payload_bits = read_bits(px, slots, LEN_HEADER_BITS, payload_len * 8);
    Ok(bits_to_bytes(&payload_bits))
}

fn save_or_cleanup(img: &RgbImage, output: &Path) -> Result<()> {
    if let Err(e) = img.save(output) {
        let _ = fs::remove_file(output);
        return Err(e.into());
    }
    Ok(())
}

// ── embed / extract ──────────────────────────────────────────────────

pub(crate) fn embed(
    cover: &Path,
    payload: &[u8],
    output: &Path,
    key: Option<&[u8]>,
    mode: StegMode,
) -> Result<()> {
    let mut img = load_rgb(cover)?;
    let slots = slot_sequence(&img, key, mode)?;
    let stream = build_stream(payload)?;

    if stream.len() > slots.len() {
        return Err(StegError::InsufficientCapacity {
            available: slots.len().saturating_sub(LEN_HEADER_BITS) / 8,
            required: payload.len(),
        });
    }

    write_bits(&mut img, &slots, &stream);
    save_or_cleanup(&img, output)
}

pub(crate) fn extract(stego: &Path, key: Option<&[u8]>, mode: StegMode) -> Result<Vec<u8>> {
    let img = load_rgb(stego)?;
    let slots = slot_sequence(&img, key, mode)?;
    read_payload(&img, &slots)
}

pub(crate) fn embed_deniable(
    cover: &Path,
    real_payload: &[u8],
    decoy_payload: &[u8],
    output: &Path,
    real_key: &[u8],
    decoy_key: &[u8],
    partition_seed: &[u8; shuffle::PARTITION_SEED_LEN],
) -> Result<()> {
    let mut img = load_rgb(cover)?;

    let real_slots = SlotSeq::Permuted(deniable_slots(&img, real_key, partition_seed, 0));
    let decoy_slots = SlotSeq::Permuted(deniable_slots(&img, decoy_key, partition_seed, 1));

    let real_stream = build_stream(real_payload)?;
    let decoy_stream = build_stream(decoy_payload)?;

    if real_stream.len() > real_slots.len() {
        return Err(StegError::InsufficientCapacity {
            available: real_slots.len().saturating_sub(LEN_HEADER_BITS) / 8,
            required: real_payload.len(),
        });
    }
    if decoy_stream.len() > decoy_slots.len() {
        return Err(StegError::InsufficientCapacity {
            available: decoy_slots.len().saturating_sub(LEN_HEADER_BITS) / 8,
            required: decoy_payload.len(),
        });
    }

    // The halves are disjoint, so the write order is irrelevant.
    write_bits(&mut img, &real_slots, &real_stream);
    write_bits(&mut img, &decoy_slots, &decoy_stream);
    save_or_cleanup(&img, output)
}

pub(crate) fn extract_deniable(
    stego: &Path,
    key: &[u8],
    partition_seed: &[u8; shuffle::PARTITION_SEED_LEN],
    half: u8,
) -> Result<Vec<u8>> {
    let img = load_rgb(stego)?;
    let slots = SlotSeq::Permuted(deniable_slots(&img, key, partition_seed, half));
    read_payload(&img, &slots)
}

/// Slot count for capacity reporting.
pub(crate) fn slot_count(img: &RgbImage, mode: StegMode) -> usize {
    match mode {
        StegMode::Adaptive => compute_mask(img).iter().filter(|&&m| m).count() * 3,
        _ => img.as_raw().len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use tempfile::tempdir;

    fn solid_gray(w: u32, h: u32) -> RgbImage {
        ImageBuffer::from_pixel(w, h, Rgb([128u8, 128, 128]))
    }

    fn noise_image(w: u32, h: u32, mut state: u64) -> RgbImage {
        ImageBuffer::from_fn(w, h, |x, y| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(u64::from(x) * 31 + u64::from(y) * 17 + 1);
            let r = (state >> 33) as u8;
            let g = (state >> 41) as u8;
            let b = (state >> 25) as u8;
            Rgb([r, g, b])
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
    fn test_mask_is_invariant_under_embedding() {
        let dir = tempdir().unwrap();
        let cover_path = dir.path().join("cover.png");
        let stego_path = dir.path().join("stego.png");

        let cover = noise_image(64, 64, 3);
        cover.save(&cover_path).unwrap();

        let key = [0xC4u8; 32];
        embed(&cover_path, &noise_payload(200, 9), &stego_path, Some(&key), StegMode::Adaptive)
            .unwrap();

        let stego = load_rgb(&stego_path).unwrap();
        assert_eq!(compute_mask(&cover), compute_mask(&stego));
    }

    #[test]
    fn test_mask_empty_on_flat_image() {
        let mask = compute_mask(&solid_gray(16, 16));
        assert!(mask.iter().all(|&m| !m));
    }

    #[test]
    fn test_mask_mostly_true_on_noise() {
        let mask = compute_mask(&noise_image(64, 64, 5));
        let textured = mask.iter().filter(|&&m| m).count();
        assert!(textured > mask.len() * 9 / 10);
    }

    #[test]
    fn test_sequential_roundtrip() {
        let dir = tempdir().unwrap();
        let cover_path = dir.path().join("cover.png");
        let stego_path = dir.path().join("stego.png");
        solid_gray(64, 64).save(&cover_path).unwrap();

        let payload = b"hello".to_vec();
        embed(&cover_path, &payload, &stego_path, None, StegMode::Sequential).unwrap();
        let recovered = extract(&stego_path, None, StegMode::Sequential).unwrap();
        assert_eq!(recovered, payload);
    }

    #[test]
    fn test_sequential_roundtrip_bmp() {
        let dir = tempdir().unwrap();
        let cover_path = dir.path().join("cover.bmp");
        let stego_path = dir.path().join("stego.bmp");
        solid_gray(32, 32).save(&cover_path).unwrap();

        let payload = noise_payload(64, 21);
        embed(&cover_path, &payload, &stego_path, None, StegMode::Sequential).unwrap();
        assert_eq!(extract(&stego_path, None, StegMode::Sequential).unwrap(), payload);
    }

    #[test]
    fn test_adaptive_roundtrip() {
        let dir = tempdir().unwrap();
        let cover_path = dir.path().join("cover.png");
        let stego_path = dir.path().join("stego.png");
        noise_image(128, 128, 77).save(&cover_path).unwrap();

        let key = [0x11u8; 32];
        let payload = noise_payload(1024, 4);
        embed(&cover_path, &payload, &stego_path, Some(&key), StegMode::Adaptive).unwrap();
        let recovered = extract(&stego_path, Some(&key), StegMode::Adaptive).unwrap();
        assert_eq!(recovered, payload);
    }

    #[test]
    fn test_adaptive_requires_key() {
        let dir = tempdir().unwrap();
        let cover_path = dir.path().join("cover.png");
        noise_image(32, 32, 2).save(&cover_path).unwrap();

        let err = embed(
            &cover_path,
            b"data",
            &dir.path().join("out.png"),
            None,
            StegMode::Adaptive,
        )
        .unwrap_err();
        assert!(matches!(err, StegError::MissingKey));
    }

    #[test]
    fn test_capacity_rejection() {
        let dir = tempdir().unwrap();
        let cover_path = dir.path().join("tiny.png");
        solid_gray(8, 8).save(&cover_path).unwrap();

        let err = embed(
            &cover_path,
            &noise_payload(1024, 1),
            &dir.path().join("out.png"),
            None,
            StegMode::Sequential,
        )
        .unwrap_err();
        match err {
            StegError::InsufficientCapacity { available, required } => {
                assert_eq!(available, (8 * 8 * 3 - 32) / 8);
                assert_eq!(required, 1024);
            }
            other => panic!("expected InsufficientCapacity, got {other:?}"),
        }
    }

    #[test]
    fn test_adaptive_flat_cover_has_no_slots() {
        let dir = tempdir().unwrap();
        let cover_path = dir.path().join("flat.png");
        solid_gray(64, 64).save(&cover_path).unwrap();

        let err = embed(
            &cover_path,
            b"x",
            &dir.path().join("out.png"),
            Some(&[1u8; 32]),
            StegMode::Adaptive,
        )
        .unwrap_err();
        assert!(matches!(err, StegError::InsufficientCapacity { .. }));
    }

    #[test]
    fn test_extract_with_wrong_key_finds_no_payload() {
        let dir = tempdir().unwrap();
        let cover_path = dir.path().join("cover.png");
        let stego_path = dir.path().join("stego.png");
        noise_image(96, 96, 13).save(&cover_path).unwrap();

        embed(&cover_path, b"hidden", &stego_path, Some(&[1u8; 32]), StegMode::Adaptive).unwrap();

        // A wrong key derives a different slot order; the header bits
        // come back as noise and the length check rejects them. A
        // one-in-four-billion collision would instead surface as
        // BadCredentials at the crypto layer.
        match extract(&stego_path, Some(&[2u8; 32]), StegMode::Adaptive) {
            Err(StegError::NoPayloadDetected) => {}
            Ok(garbage) => assert_ne!(garbage, b"hidden"),
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_deniable_roundtrip_disjoint() {
        let dir = tempdir().unwrap();
        let cover_path = dir.path().join("cover.png");
        let stego_path = dir.path().join("stego.png");
        noise_image(128, 128, 55).save(&cover_path).unwrap();

        let real_key = [0xAAu8; 32];
        let decoy_key = [0xBBu8; 32];
        let seed = [0x5Cu8; shuffle::PARTITION_SEED_LEN];

        embed_deniable(
            &cover_path,
            b"real payload",
            b"decoy payload",
            &stego_path,
            &real_key,
            &decoy_key,
            &seed,
        )
        .unwrap();

        assert_eq!(
            extract_deniable(&stego_path, &real_key, &seed, 0).unwrap(),
            b"real payload"
        );
        assert_eq!(
            extract_deniable(&stego_path, &decoy_key, &seed, 1).unwrap(),
            b"decoy payload"
        );
    }

    #[test]
    fn test_deniable_halves_never_overlap() {
        let img = noise_image(64, 64, 8);
        let seed = [9u8; shuffle::PARTITION_SEED_LEN];
        let a = deniable_slots(&img, &[1u8; 32], &seed, 0);
        let b = deniable_slots(&img, &[2u8; 32], &seed, 1);
        let set_a: std::collections::HashSet<usize> = a.into_iter().collect();
        assert!(b.iter().all(|s| !set_a.contains(s)));
    }

    #[test]
    fn test_deniable_capacity_is_per_half() {
        let dir = tempdir().unwrap();
        let cover_path = dir.path().join("cover.png");
        noise_image(32, 32, 6).save(&cover_path).unwrap();

        // ~32*32*3 = 3072 slots total, ~1536 per half → ~188 bytes max
        let err = embed_deniable(
            &cover_path,
            &noise_payload(400, 2),
            b"decoy",
            &dir.path().join("out.png"),
            &[1u8; 32],
            &[2u8; 32],
            &[3u8; shuffle::PARTITION_SEED_LEN],
        )
        .unwrap_err();
        assert!(matches!(err, StegError::InsufficientCapacity { .. }));
    }

    #[test]
    fn test_reflect_padding() {
        assert_eq!(reflect(-1, 5), 1);
        assert_eq!(reflect(0, 5), 0);
        assert_eq!(reflect(4, 5), 4);
        assert_eq!(reflect(5, 5), 3);
        assert_eq!(reflect(-1, 1), 0);
        assert_eq!(reflect(1, 1), 0);
    }
}
