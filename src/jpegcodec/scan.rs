/// jpegcodec/scan.rs — Entropy-coded scan ↔ coefficient planes
///
/// Decoding produces one plane of quantised DCT coefficients per
/// colour component. A plane is a dense i16 grid in natural (row,
/// column) sample order: the block at block-coordinates (br, bc)
/// occupies rows `br*8..br*8+8` and columns `bc*8..bc*8+8`, with the
/// DC coefficient at the block's top-left corner. Plane dimensions
/// cover the full MCU grid, so partial edge blocks are materialised
/// exactly as they were coded.
///
/// Re-encoding walks the identical traversal with the cover's own
/// Huffman tables. That is coefficient-exact as long as every symbol
/// the new scan needs exists in those tables. LSB edits on AC values
/// outside {-1, 0, 1} never change a magnitude category or the
/// zero/non-zero structure, so their symbols always exist; DC edits
/// shift the delta-coded differences, and a difference category the
/// table never defined surfaces as an emit error, not a corrupt scan.
use crate::error::{Result, StegError};
use crate::jpegcodec::huffman::{
    category, extend, magnitude_bits, BitReader, BitWriter, HuffmanDecoder, HuffmanEncoder,
};
use crate::jpegcodec::parser::JpegSegments;

/// Natural-order index of the k-th coefficient in zigzag order.
pub const DEZIGZAG: [usize; 64] = [
    0, 1, 8, 16, 9, 2, 3, 10, 17, 24, 32, 25, 18, 11, 4, 5, 12, 19, 26, 33, 40, 48, 41, 34, 27,
    20, 13, 6, 7, 14, 21, 28, 35, 42, 49, 56, 57, 50, 43, 36, 29, 22, 15, 23, 30, 37, 44, 51, 58,
    59, 52, 45, 38, 31, 39, 46, 53, 60, 61, 54, 47, 55, 62, 63,
];

/// A component's quantised DCT coefficients in natural sample order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoeffPlane {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<i16>,
}

impl CoeffPlane {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0; rows * cols],
        }
    }

    #[inline]
    pub fn get(&self, r: usize, c: usize) -> i16 {
        self.data[r * self.cols + c]
    }

    #[inline]
    pub fn set(&mut self, r: usize, c: usize, v: i16) {
        self.data[r * self.cols + c] = v;
    }
}

/// MCU traversal geometry shared by decode and encode.
struct Traversal {
    mcus_x: usize,
    mcus_y: usize,
    /// Blocks per MCU in (horizontal, vertical) per component.
    factors: Vec<(usize, usize)>,
    /// Plane size in blocks per component.
    block_dims: Vec<(usize, usize)>,
}

fn traversal(seg: &JpegSegments) -> Traversal {
    let frame = &seg.frame;
    if frame.components.len() == 1 {
        // Single-component scans have no MCU interleaving: one block
        // per MCU regardless of the declared sampling factors.
        let bw = (frame.width + 7) / 8;
        let bh = (frame.height + 7) / 8;
        Traversal {
            mcus_x: bw,
            mcus_y: bh,
            factors: vec![(1, 1)],
            block_dims: vec![(bh, bw)],
        }
    } else {
        let mcu_w = 8 * frame.h_max as usize;
        let mcu_h = 8 * frame.v_max as usize;
        let mcus_x = (frame.width + mcu_w - 1) / mcu_w;
        let mcus_y = (frame.height + mcu_h - 1) / mcu_h;
        let factors: Vec<(usize, usize)> = frame
            .components
            .iter()
            .map(|c| (c.h as usize, c.v as usize))
            .collect();
        let block_dims = factors
            .iter()
            .map(|&(h, v)| (mcus_y * v, mcus_x * h))
            .collect();
        Traversal {
            mcus_x,
            mcus_y,
            factors,
            block_dims,
        }
    }
}

fn component_decoders(seg: &JpegSegments) -> Result<Vec<(HuffmanDecoder, HuffmanDecoder)>> {
    seg.frame
        .components
        .iter()
        .map(|comp| {
            let dc = seg.dc_specs[comp.dc_table]
                .as_ref()
                .ok_or_else(|| StegError::InvalidJpeg("missing DC huffman table".into()))?;
            let ac = seg.ac_specs[comp.ac_table]
                .as_ref()
                .ok_or_else(|| StegError::InvalidJpeg("missing AC huffman table".into()))?;
            Ok((HuffmanDecoder::new(dc), HuffmanDecoder::new(ac)))
        })
        .collect()
}

fn component_encoders(seg: &JpegSegments) -> Result<Vec<(HuffmanEncoder, HuffmanEncoder)>> {
    seg.frame
        .components
        .iter()
        .map(|comp| {
            let dc = seg.dc_specs[comp.dc_table]
                .as_ref()
                .ok_or_else(|| StegError::InvalidJpeg("missing DC huffman table".into()))?;
            let ac = seg.ac_specs[comp.ac_table]
                .as_ref()
                .ok_or_else(|| StegError::InvalidJpeg("missing AC huffman table".into()))?;
            Ok((HuffmanEncoder::new(dc), HuffmanEncoder::new(ac)))
        })
        .collect()
}

/// Decode the entropy-coded scan into coefficient planes.
pub fn decode_scan(seg: &JpegSegments) -> Result<Vec<CoeffPlane>> {
    let tv = traversal(seg);
    let decoders = component_decoders(seg)?;

    let mut planes: Vec<CoeffPlane> = tv
        .block_dims
        .iter()
        .map(|&(bh, bw)| CoeffPlane::new(bh * 8, bw * 8))
        .collect();

    let mut reader = BitReader::new(&seg.scan_data);
    let mut preds = vec![0i32; planes.len()];
    let mut mcus_seen = 0usize;

    for my in 0..tv.mcus_y {
        for mx in 0..tv.mcus_x {
            if seg.restart_interval > 0 && mcus_seen > 0 && mcus_seen % seg.restart_interval == 0 {
                reader.align_to_restart()?;
                preds.iter_mut().for_each(|p| *p = 0);
            }
            for ci in 0..planes.len() {
                let (h_eff, v_eff) = tv.factors[ci];
                for by in 0..v_eff {
                    for bx in 0..h_eff {
                        let zz =
                            decode_block(&mut reader, &decoders[ci].0, &decoders[ci].1, &mut preds[ci])?;
                        place_block(&mut planes[ci], my * v_eff + by, mx * h_eff + bx, &zz);
                    }
                }
            }
            mcus_seen += 1;
        }
    }

    Ok(planes)
}

/// Re-encode coefficient planes into a new entropy-coded scan using
/// the cover's own Huffman tables.
pub fn encode_scan(planes: &[CoeffPlane], seg: &JpegSegments) -> Result<Vec<u8>> {
    let tv = traversal(seg);
    let encoders = component_encoders(seg)?;

    let mut writer = BitWriter::new();
    let mut preds = vec![0i32; planes.len()];
    let mut mcus_seen = 0usize;
    let mut restarts = 0usize;

    for my in 0..tv.mcus_y {
        for mx in 0..tv.mcus_x {
            if seg.restart_interval > 0 && mcus_seen > 0 && mcus_seen % seg.restart_interval == 0 {
                writer.restart_marker((restarts & 7) as u8);
                restarts += 1;
                preds.iter_mut().for_each(|p| *p = 0);
            }
            for ci in 0..planes.len() {
                let (h_eff, v_eff) = tv.factors[ci];
                for by in 0..v_eff {
                    for bx in 0..h_eff {
                        let zz = take_block(&planes[ci], my * v_eff + by, mx * h_eff + bx);
                        encode_block(&mut writer, &encoders[ci].0, &encoders[ci].1, &mut preds[ci], &zz)?;
                    }
                }
            }
            mcus_seen += 1;
        }
    }

    Ok(writer.into_bytes())
}

fn place_block(plane: &mut CoeffPlane, block_row: usize, block_col: usize, zz: &[i16; 64]) {
    for (k, &v) in zz.iter().enumerate() {
        let n = DEZIGZAG[k];
        plane.set(block_row * 8 + n / 8, block_col * 8 + n % 8, v);
    }
}

fn take_block(plane: &CoeffPlane, block_row: usize, block_col: usize) -> [i16; 64] {
    let mut zz = [0i16; 64];
    for (k, slot) in zz.iter_mut().enumerate() {
        let n = DEZIGZAG[k];
        *slot = plane.get(block_row * 8 + n / 8, block_col * 8 + n % 8);
    }
    zz
}

fn decode_block(
    reader: &mut BitReader,
    dc: &HuffmanDecoder,
    ac: &HuffmanDecoder,
    pred: &mut i32,
) -> Result<[i16; 64]> {
    let mut zz = [0i16; 64];

    let t = dc.decode(reader)?;
    if t > 11 {
        return Err(StegError::InvalidJpeg("DC category out of range".into()));
    }
    let diff = if t == 0 {
        0
    } else {
        extend(reader.receive(t)?, t)
    };
    *pred += diff;
    zz[0] = *pred as i16;

    let mut k = 1usize;
    while k < 64 {
        let rs = ac.decode(reader)?;
        let run = (rs >> 4) as usize;
        let size = rs & 0x0F;
        if size == 0 {
            if run == 15 {
                // ZRL: sixteen zeros
                k += 16;
                continue;
            }
            break; // EOB
        }
        k += run;
        if k > 63 {
            return Err(StegError::InvalidJpeg("AC coefficient index overflow".into()));
        }
        zz[k] = extend(reader.receive(size)?, size) as i16;
        k += 1;
    }

    Ok(zz)
}

fn encode_block(
    writer: &mut BitWriter,
    dc: &HuffmanEncoder,
    ac: &HuffmanEncoder,
    pred: &mut i32,
    zz: &[i16; 64],
) -> Result<()> {
    let value = i32::from(zz[0]);
    let diff = value - *pred;
    *pred = value;
    let s = category(diff);
    dc.emit(s, writer)?;
    if s > 0 {
        writer.put_bits(magnitude_bits(diff, s), s);
    }

    let mut run = 0usize;
    for &coeff in &zz[1..] {
        let v = i32::from(coeff);
        if v == 0 {
            run += 1;
            continue;
        }
        while run >= 16 {
            ac.emit(0xF0, writer)?;
            run -= 16;
        }
        let s = category(v);
        ac.emit(((run as u8) << 4) | s, writer)?;
        writer.put_bits(magnitude_bits(v, s), s);
        run = 0;
    }
    if run > 0 {
        ac.emit(0x00, writer)?;
    }
    Ok(())
}
