use thiserror::Error;

const MARKER_PREFIX: u8 = 0xFF;
const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;
const APP0: u8 = 0xE0;
const APP1: u8 = 0xE1;
const TEM: u8 = 0x01;
const RST0: u8 = 0xD0;
const RST7: u8 = 0xD7;

pub const EXIF_ID: &[u8] = b"Exif\0\0";

/// Largest TIFF payload an APP1 segment can carry after the length field and `Exif\0\0`.
pub const MAX_EXIF_PAYLOAD: usize = u16::MAX as usize - 2 - EXIF_ID.len();

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JpegError {
    #[error("JPEGファイルではありません")]
    NotJpeg,
    #[error("JPEGのセグメントが途中で切れています (offset {0})")]
    Truncated(usize),
    #[error("EXIFが大きすぎてAPP1セグメントに収まりません: {0} bytes")]
    ExifTooLarge(usize),
}

pub fn is_jpeg(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[0] == MARKER_PREFIX && bytes[1] == SOI
}

/// Rebuilds the header segments of `jpeg` with `tiff` as its only EXIF block.
/// Everything from SOS onwards is copied untouched.
pub fn replace_exif_segment(jpeg: &[u8], tiff: &[u8]) -> Result<Vec<u8>, JpegError> {
    if !is_jpeg(jpeg) {
        return Err(JpegError::NotJpeg);
    }
    let app1 = build_exif_segment(tiff)?;

    let mut out = Vec::with_capacity(jpeg.len() + app1.len());
    out.extend_from_slice(&jpeg[..2]);

    let mut inserted = false;
    let mut pos = 2usize;
    loop {
        if pos >= jpeg.len() {
            return Err(JpegError::Truncated(pos));
        }
        if jpeg[pos] != MARKER_PREFIX {
            return Err(JpegError::Truncated(pos));
        }

        // 0xFF fill bytes may precede a marker code.
        let mut code_at = pos + 1;
        while code_at < jpeg.len() && jpeg[code_at] == MARKER_PREFIX {
            code_at += 1;
        }
        let Some(&code) = jpeg.get(code_at) else {
            return Err(JpegError::Truncated(pos));
        };

        match code {
            SOS | EOI => {
                if !inserted {
                    out.extend_from_slice(&app1);
                }
                out.extend_from_slice(&jpeg[pos..]);
                return Ok(out);
            }
            TEM | SOI | RST0..=RST7 => {
                out.extend_from_slice(&jpeg[pos..=code_at]);
                pos = code_at + 1;
                continue;
            }
            _ => {}
        }

        let length_at = code_at + 1;
        if length_at + 2 > jpeg.len() {
            return Err(JpegError::Truncated(pos));
        }
        let length = u16::from_be_bytes([jpeg[length_at], jpeg[length_at + 1]]) as usize;
        let end = length_at + length;
        if length < 2 || end > jpeg.len() {
            return Err(JpegError::Truncated(pos));
        }

        let payload = &jpeg[length_at + 2..end];
        if code == APP1 && payload.starts_with(EXIF_ID) {
            if !inserted {
                out.extend_from_slice(&app1);
                inserted = true;
            }
        } else {
            if !inserted && code != APP0 {
                out.extend_from_slice(&app1);
                inserted = true;
            }
            out.extend_from_slice(&jpeg[pos..end]);
        }
        pos = end;
    }
}

fn build_exif_segment(tiff: &[u8]) -> Result<Vec<u8>, JpegError> {
    if tiff.len() > MAX_EXIF_PAYLOAD {
        return Err(JpegError::ExifTooLarge(tiff.len()));
    }
    let length = (2 + EXIF_ID.len() + tiff.len()) as u16;
    let mut segment = Vec::with_capacity(2 + length as usize);
    segment.extend_from_slice(&[MARKER_PREFIX, APP1]);
    segment.extend_from_slice(&length.to_be_bytes());
    segment.extend_from_slice(EXIF_ID);
    segment.extend_from_slice(tiff);
    Ok(segment)
}
