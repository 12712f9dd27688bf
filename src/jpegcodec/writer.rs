/// jpegcodec/writer.rs — Reassemble a JPEG from its preserved parts
use crate::jpegcodec::marker;
use crate::jpegcodec::parser::JpegSegments;

/// Concatenate the untouched head, the new entropy-coded scan, and
/// the untouched trailer. Everything outside the scan — quantisation
/// tables, Huffman tables, APPn metadata, comments — is byte-identical
/// to the input file.
pub fn write_jpeg(seg: &JpegSegments, new_scan: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(seg.head.len() + new_scan.len() + seg.trailer.len() + 2);
    out.extend_from_slice(&seg.head);
    out.extend_from_slice(new_scan);
    if seg.trailer.is_empty() {
        out.extend_from_slice(&[0xFF, marker::EOI]);
    } else {
        out.extend_from_slice(&seg.trailer);
    }
    out
}
