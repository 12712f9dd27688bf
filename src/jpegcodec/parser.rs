/// jpegcodec/parser.rs — JPEG segment walk
///
/// Splits a JPEG file into three byte ranges and the decoded side
/// tables the scan codec needs:
///
///   head        SOI through the end of the SOS header — every
///               segment byte-identical to the input, so quantisation
///               tables, APPn metadata and comments survive untouched
///   scan_data   the entropy-coded segment, RSTn markers included
///   trailer     EOI and anything after it
///
/// Only baseline and extended sequential Huffman frames (SOF0/SOF1)
/// with a single scan are accepted. Progressive, arithmetic-coded,
/// multi-scan and DNL files are rejected up front — their scans
/// cannot be re-encoded coefficient-exactly by this codec.
use crate::error::{Result, StegError};
use crate::jpegcodec::huffman::HuffmanSpec;
use crate::jpegcodec::marker;

/// One colour component of the frame, with the entropy tables the
/// scan header assigned to it.
#[derive(Debug, Clone)]
pub struct Component {
    pub id: u8,
    pub h: u8,
    pub v: u8,
    pub dc_table: usize,
    pub ac_table: usize,
}

#[derive(Debug, Clone)]
pub struct FrameInfo {
    pub width: usize,
    pub height: usize,
    pub components: Vec<Component>,
    pub h_max: u8,
    pub v_max: u8,
}

pub struct JpegSegments {
    pub head: Vec<u8>,
    pub frame: FrameInfo,
    pub dc_specs: [Option<HuffmanSpec>; 4],
    pub ac_specs: [Option<HuffmanSpec>; 4],
    pub restart_interval: usize,
    pub scan_data: Vec<u8>,
    pub trailer: Vec<u8>,
}

pub fn parse_jpeg(data: &[u8]) -> Result<JpegSegments> {
    if data.len() < 4 || data[0] != 0xFF || data[1] != marker::SOI {
        return Err(StegError::InvalidJpeg("missing SOI marker".into()));
    }

    let mut pos = 2usize;
    let mut frame: Option<FrameInfo> = None;
    let mut dc_specs: [Option<HuffmanSpec>; 4] = Default::default();
    let mut ac_specs: [Option<HuffmanSpec>; 4] = Default::default();
    let mut restart_interval = 0usize;

    loop {
        if pos + 2 > data.len() {
            return Err(StegError::InvalidJpeg("truncated before scan".into()));
        }
        if data[pos] != 0xFF {
            return Err(StegError::InvalidJpeg(format!(
                "expected marker at offset {pos}"
            )));
        }
        // 0xFF fill bytes before a marker are legal
        let mut m = data[pos + 1];
        pos += 2;
        while m == 0xFF {
            m = *data
                .get(pos)
                .ok_or_else(|| StegError::InvalidJpeg("truncated marker".into()))?;
            pos += 1;
        }

        match m {
            marker::SOS => {
                let seg = read_segment(data, &mut pos)?;
                let mut f = frame
                    .take()
                    .ok_or_else(|| StegError::InvalidJpeg("SOS before SOF".into()))?;
                parse_sos(seg, &mut f)?;

                let head = data[..pos].to_vec();
                let (scan_data, trailer) = split_scan(data, pos)?;
                return Ok(JpegSegments {
                    head,
                    frame: f,
                    dc_specs,
                    ac_specs,
                    restart_interval,
                    scan_data,
                    trailer,
                });
            }
            marker::EOI => {
                return Err(StegError::InvalidJpeg("no scan data before EOI".into()));
            }
            marker::DAC => {
                return Err(StegError::UnsupportedFormat(
                    "arithmetic-coded JPEG is not supported".into(),
                ));
            }
            m if marker::is_sof(m) => {
                let seg = read_segment(data, &mut pos)?;
                match m {
                    marker::SOF0 | marker::SOF1 => frame = Some(parse_sof(seg)?),
                    marker::SOF2 => {
                        return Err(StegError::UnsupportedFormat(
                            "progressive JPEG is not supported; transcode the cover to baseline first"
                                .into(),
                        ))
                    }
                    other => {
                        return Err(StegError::UnsupportedFormat(format!(
                            "JPEG frame type 0x{other:02X} is not supported"
                        )))
                    }
                }
            }
            marker::DHT => {
                let seg = read_segment(data, &mut pos)?;
                parse_dht(seg, &mut dc_specs, &mut ac_specs)?;
            }
            marker::DRI => {
                let seg = read_segment(data, &mut pos)?;
                if seg.len() != 2 {
                    return Err(StegError::InvalidJpeg("bad DRI length".into()));
                }
                restart_interval = u16::from_be_bytes([seg[0], seg[1]]) as usize;
            }
            m if marker::is_rst(m) || m == 0x01 => {
                return Err(StegError::InvalidJpeg(format!(
                    "unexpected standalone marker 0x{m:02X} before scan"
                )));
            }
            // APPn, COM, DQT and friends: keep the raw bytes, no parsing
            _ => {
                read_segment(data, &mut pos)?;
            }
        }
    }
}

/// Read a length-prefixed segment payload and advance the cursor past it.
fn read_segment<'a>(data: &'a [u8], pos: &mut usize) -> Result<&'a [u8]> {
    if *pos + 2 > data.len() {
        return Err(StegError::InvalidJpeg("truncated segment length".into()));
    }
    let len = u16::from_be_bytes([data[*pos], data[*pos + 1]]) as usize;
    if len < 2 || *pos + len > data.len() {
        return Err(StegError::InvalidJpeg("segment length out of range".into()));
    }
    let payload = &data[*pos + 2..*pos + len];
    *pos += len;
    Ok(payload)
}

fn parse_sof(seg: &[u8]) -> Result<FrameInfo> {
    if seg.len() < 6 {
        return Err(StegError::InvalidJpeg("truncated SOF".into()));
    }
    let precision = seg[0];
    if precision != 8 {
        return Err(StegError::UnsupportedFormat(format!(
            "{precision}-bit JPEG samples are not supported"
        )));
    }
    let height = u16::from_be_bytes([seg[1], seg[2]]) as usize;
    let width = u16::from_be_bytes([seg[3], seg[4]]) as usize;
    let ncomp = seg[5] as usize;
    if width == 0 || height == 0 {
        return Err(StegError::InvalidJpeg("zero frame dimensions".into()));
    }
    if !(1..=4).contains(&ncomp) || seg.len() < 6 + 3 * ncomp {
        return Err(StegError::InvalidJpeg("bad SOF component count".into()));
    }

    let mut components = Vec::with_capacity(ncomp);
    let mut h_max = 1u8;
    let mut v_max = 1u8;
    for i in 0..ncomp {
        let base = 6 + 3 * i;
        let id = seg[base];
        let hv = seg[base + 1];
        let h = hv >> 4;
        let v = hv & 0x0F;
        if !(1..=4).contains(&h) || !(1..=4).contains(&v) {
            return Err(StegError::InvalidJpeg("bad sampling factors".into()));
        }
        h_max = h_max.max(h);
        v_max = v_max.max(v);
        components.push(Component {
            id,
            h,
            v,
            dc_table: 0,
            ac_table: 0,
        });
    }

    Ok(FrameInfo {
        width,
        height,
        components,
        h_max,
        v_max,
    })
}

fn parse_sos(seg: &[u8], frame: &mut FrameInfo) -> Result<()> {
    if seg.is_empty() {
        return Err(StegError::InvalidJpeg("empty SOS".into()));
    }
    let ns = seg[0] as usize;
    if ns != frame.components.len() {
        return Err(StegError::UnsupportedFormat(
            "multi-scan JPEG is not supported".into(),
        ));
    }
    if seg.len() < 1 + 2 * ns + 3 {
        return Err(StegError::InvalidJpeg("truncated SOS".into()));
    }

    for i in 0..ns {
        let cs = seg[1 + 2 * i];
        let tables = seg[2 + 2 * i];
        let comp = frame
            .components
            .iter_mut()
            .find(|c| c.id == cs)
            .ok_or_else(|| StegError::InvalidJpeg("SOS references unknown component".into()))?;
        comp.dc_table = (tables >> 4) as usize;
        comp.ac_table = (tables & 0x0F) as usize;
        if comp.dc_table > 3 || comp.ac_table > 3 {
            return Err(StegError::InvalidJpeg("SOS table id out of range".into()));
        }
    }

    let ss = seg[1 + 2 * ns];
    let se = seg[2 + 2 * ns];
    let ahal = seg[3 + 2 * ns];
    if ss != 0 || se != 63 || ahal != 0 {
        return Err(StegError::UnsupportedFormat(
            "non-sequential spectral selection is not supported".into(),
        ));
    }
    Ok(())
}

fn parse_dht(
    seg: &[u8],
    dc: &mut [Option<HuffmanSpec>; 4],
    ac: &mut [Option<HuffmanSpec>; 4],
) -> Result<()> {
    let mut pos = 0usize;
    while pos < seg.len() {
        if pos + 17 > seg.len() {
            return Err(StegError::InvalidJpeg("truncated DHT".into()));
        }
        let tc = seg[pos] >> 4;
        let th = (seg[pos] & 0x0F) as usize;
        if tc > 1 || th > 3 {
            return Err(StegError::InvalidJpeg("bad DHT class or id".into()));
        }
        let mut counts = [0u8; 16];
        counts.copy_from_slice(&seg[pos + 1..pos + 17]);
        let total: usize = counts.iter().map(|&c| c as usize).sum();
        if pos + 17 + total > seg.len() {
            return Err(StegError::InvalidJpeg("truncated DHT values".into()));
        }
        let values = seg[pos + 17..pos + 17 + total].to_vec();
        let spec = HuffmanSpec { counts, values };
        if tc == 0 {
            dc[th] = Some(spec);
        } else {
            ac[th] = Some(spec);
        }
        pos += 17 + total;
    }
    Ok(())
}

/// Locate the end of the entropy-coded segment. Stuffed 0xFF 0x00 pairs
/// and RSTn markers belong to the scan; any other marker terminates it.
fn split_scan(data: &[u8], start: usize) -> Result<(Vec<u8>, Vec<u8>)> {
    let mut i = start;
    while i + 1 < data.len() {
        if data[i] == 0xFF {
            let b = data[i + 1];
            if b == 0x00 || marker::is_rst(b) {
                i += 2;
                continue;
            }
            if b == marker::SOS {
                return Err(StegError::UnsupportedFormat(
                    "multi-scan JPEG is not supported".into(),
                ));
            }
            if b == marker::DNL {
                return Err(StegError::UnsupportedFormat(
                    "JPEG with DNL segment is not supported".into(),
                ));
            }
            break;
        }
        i += 1;
    }
    let scan_end = if i + 1 < data.len() { i } else { data.len() };
    Ok((data[start..scan_end].to_vec(), data[scan_end..].to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_jpeg() {
        assert!(parse_jpeg(b"\x89PNG\r\n\x1a\n").is_err());
        assert!(parse_jpeg(&[]).is_err());
    }

    #[test]
    fn test_rejects_headerless_soi() {
        // SOI + EOI with no frame or scan
        assert!(parse_jpeg(&[0xFF, 0xD8, 0xFF, 0xD9]).is_err());
    }

    #[test]
    fn test_dht_multiple_tables_in_one_segment() {
        let mut seg = Vec::new();
        // DC table 0: single code, value 3
        seg.push(0x00);
        let mut counts = [0u8; 16];
        counts[0] = 1;
        seg.extend_from_slice(&counts);
        seg.push(0x03);
        // AC table 1: two codes of length 2, values 1 and 2
        seg.push(0x11);
        let mut counts = [0u8; 16];
        counts[1] = 2;
        seg.extend_from_slice(&counts);
        seg.extend_from_slice(&[0x01, 0x02]);

        let mut dc: [Option<HuffmanSpec>; 4] = Default::default();
        let mut ac: [Option<HuffmanSpec>; 4] = Default::default();
        parse_dht(&seg, &mut dc, &mut ac).unwrap();

        assert_eq!(dc[0].as_ref().unwrap().values, vec![0x03]);
        assert_eq!(ac[1].as_ref().unwrap().values, vec![0x01, 0x02]);
        assert!(dc[1].is_none());
    }

    #[test]
    fn test_split_scan_keeps_stuffing_and_restarts() {
        // scan bytes: AA FF00 BB FFD0 CC, then EOI
        let data = [0xAA, 0xFF, 0x00, 0xBB, 0xFF, 0xD0, 0xCC, 0xFF, 0xD9];
        let (scan, trailer) = split_scan(&data, 0).unwrap();
        assert_eq!(scan, &data[..7]);
        assert_eq!(trailer, &[0xFF, 0xD9]);
    }

    #[test]
    fn test_split_scan_rejects_second_sos() {
        let data = [0xAA, 0xFF, 0xDA, 0x00];
        assert!(split_scan(&data, 0).is_err());
    }
}
