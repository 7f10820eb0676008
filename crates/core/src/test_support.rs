use exif::experimental::Writer;
use exif::{Field, In, Tag, Value};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

pub const APP0_JFIF: &[u8] = &[
    0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01, 0x01, 0x00, 0x00, 0x01, 0x00,
    0x01, 0x00, 0x00,
];

const THUMBNAIL_JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xD9];

/// SOS header, a few bytes of entropy-coded data and EOI.
pub fn scan_tail() -> Vec<u8> {
    vec![
        0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3F, 0x00, 0x12, 0x34, 0x56, 0xFF, 0xD9,
    ]
}

pub fn jpeg_bytes(tiff: Option<Vec<u8>>) -> Vec<u8> {
    let mut out = vec![0xFF, 0xD8];
    out.extend_from_slice(APP0_JFIF);
    if let Some(tiff) = tiff {
        let length = (2 + 6 + tiff.len()) as u16;
        out.extend_from_slice(&[0xFF, 0xE1]);
        out.extend_from_slice(&length.to_be_bytes());
        out.extend_from_slice(b"Exif\0\0");
        out.extend_from_slice(&tiff);
    }
    out.extend_from_slice(&scan_tail());
    out
}

fn ascii(tag: Tag, ifd_num: In, text: &str) -> Field {
    Field {
        tag,
        ifd_num,
        value: Value::Ascii(vec![text.as_bytes().to_vec()]),
    }
}

fn date_fields(original: Option<&str>, digitized: Option<&str>) -> Vec<Field> {
    let mut fields = vec![ascii(Tag::Make, In::PRIMARY, "FUJIFILM")];
    if let Some(value) = original {
        fields.push(ascii(Tag::DateTimeOriginal, In::PRIMARY, value));
    }
    if let Some(value) = digitized {
        fields.push(ascii(Tag::DateTimeDigitized, In::PRIMARY, value));
    }
    fields
}

pub fn tiff_with_dates(original: Option<&str>, digitized: Option<&str>) -> Vec<u8> {
    let fields = date_fields(original, digitized);
    let mut writer = Writer::new();
    for field in &fields {
        writer.push_field(field);
    }
    let mut buf = Cursor::new(Vec::new());
    writer.write(&mut buf, false).expect("write tiff");
    buf.into_inner()
}

pub fn tiff_with_thumbnail(original: Option<&str>) -> Vec<u8> {
    let mut fields = date_fields(original, original);
    fields.push(Field {
        tag: Tag::Compression,
        ifd_num: In::THUMBNAIL,
        value: Value::Short(vec![6]),
    });
    let mut writer = Writer::new();
    for field in &fields {
        writer.push_field(field);
    }
    writer.set_jpeg(THUMBNAIL_JPEG, In::THUMBNAIL);
    let mut buf = Cursor::new(Vec::new());
    writer.write(&mut buf, false).expect("write tiff");
    buf.into_inner()
}

/// Points the big-endian JPEGInterchangeFormatLength entry far past the buffer.
pub fn corrupt_thumbnail_length(mut tiff: Vec<u8>) -> Vec<u8> {
    let entry = [0x02, 0x02, 0x00, 0x04, 0x00, 0x00, 0x00, 0x01];
    let at = tiff
        .windows(entry.len())
        .position(|w| w == &entry[..])
        .expect("thumbnail length entry");
    let value_at = at + entry.len();
    tiff[value_at..value_at + 4].copy_from_slice(&0x00FF_FFFFu32.to_be_bytes());
    tiff
}

/// Dates plus an ExposureProgram entry retagged with an undefined field type,
/// which reads back as `Value::Unknown` and cannot be written again.
pub fn tiff_with_unknown_type_field(original: Option<&str>) -> Vec<u8> {
    let mut fields = date_fields(original, original);
    fields.push(Field {
        tag: Tag::ExposureProgram,
        ifd_num: In::PRIMARY,
        value: Value::Short(vec![1]),
    });
    let mut writer = Writer::new();
    for field in &fields {
        writer.push_field(field);
    }
    let mut buf = Cursor::new(Vec::new());
    writer.write(&mut buf, false).expect("write tiff");
    let mut tiff = buf.into_inner();

    let entry = [0x88, 0x22, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01];
    let at = tiff
        .windows(entry.len())
        .position(|w| w == &entry[..])
        .expect("exposure program entry");
    tiff[at + 2..at + 4].copy_from_slice(&[0x00, 0x20]);
    tiff
}

pub fn jpeg_with_dates(original: Option<&str>, digitized: Option<&str>) -> Vec<u8> {
    jpeg_bytes(Some(tiff_with_dates(original, digitized)))
}

pub fn write_file(dir: &Path, relative: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create fixture dir");
    }
    fs::write(&path, bytes).expect("write fixture");
    path
}
