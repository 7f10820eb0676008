use crate::timestamp::{format_exif_date_time, parse_exif_date_time, TimestampError};
use chrono::NaiveDateTime;
use exif::experimental::Writer;
use exif::{Context, Field, In, Reader, Tag, Value};
use std::io::Cursor;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExifTagsError {
    #[error("EXIFがありません")]
    Missing,
    #[error("EXIFを解析できませんでした: {0}")]
    Malformed(String),
    #[error("EXIFを書き出せませんでした: {0}")]
    Encode(String),
}

/// Tag groups as laid out in the TIFF structure of an EXIF block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagGroup {
    Zeroth,
    Exif,
    Gps,
    Interop,
    First,
    Thumbnail,
    /// Tags from contexts this crate does not name; carried through untouched.
    Other,
}

impl TagGroup {
    pub fn name(self) -> &'static str {
        match self {
            TagGroup::Zeroth => "0th",
            TagGroup::Exif => "Exif",
            TagGroup::Gps => "GPS",
            TagGroup::Interop => "Interop",
            TagGroup::First => "1st",
            TagGroup::Thumbnail => "thumbnail",
            TagGroup::Other => "other",
        }
    }

    fn of(field: &Field) -> TagGroup {
        if field.ifd_num == In::THUMBNAIL {
            return TagGroup::First;
        }
        match field.tag.context() {
            Context::Tiff => TagGroup::Zeroth,
            Context::Exif => TagGroup::Exif,
            Context::Gps => TagGroup::Gps,
            Context::Interop => TagGroup::Interop,
            _ => TagGroup::Other,
        }
    }
}

/// The two capture timestamps this crate rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateTag {
    Original,
    Digitized,
}

impl DateTag {
    pub fn tag(self) -> Tag {
        match self {
            DateTag::Original => Tag::DateTimeOriginal,
            DateTag::Digitized => Tag::DateTimeDigitized,
        }
    }
}

/// Decoded EXIF block. Only the date tags are interpreted; every other field
/// is carried through to `encode` as-is.
#[derive(Debug, Clone)]
pub struct ExifTags {
    fields: Vec<Field>,
    little_endian: bool,
    raw: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct EncodedExif {
    pub tiff: Vec<u8>,
    pub dropped_thumbnail: bool,
}

impl ExifTags {
    pub fn read_from_jpeg(bytes: &[u8]) -> Result<Self, ExifTagsError> {
        let exif = Reader::new()
            .read_from_container(&mut Cursor::new(bytes))
            .map_err(|err| match err {
                exif::Error::NotFound(_) => ExifTagsError::Missing,
                other => ExifTagsError::Malformed(other.to_string()),
            })?;

        Ok(Self {
            fields: exif.fields().cloned().collect(),
            little_endian: exif.little_endian(),
            raw: exif.buf().to_vec(),
        })
    }

    pub fn has_group(&self, group: TagGroup) -> bool {
        match group {
            TagGroup::Thumbnail => self
                .field(Tag::JPEGInterchangeFormat, In::THUMBNAIL)
                .is_some(),
            _ => self.fields.iter().any(|field| TagGroup::of(field) == group),
        }
    }

    pub fn groups(&self) -> Vec<TagGroup> {
        [
            TagGroup::Zeroth,
            TagGroup::Exif,
            TagGroup::Gps,
            TagGroup::Interop,
            TagGroup::First,
            TagGroup::Thumbnail,
            TagGroup::Other,
        ]
        .into_iter()
        .filter(|group| self.has_group(*group))
        .collect()
    }

    /// `None` when the tag is absent; `Some(Err)` when it is present but not
    /// in the EXIF date-time layout.
    pub fn date_time(&self, tag: DateTag) -> Option<Result<NaiveDateTime, TimestampError>> {
        let field = self.field(tag.tag(), In::PRIMARY)?;
        let text = match &field.value {
            Value::Ascii(parts) => parts
                .first()
                .map(|raw| String::from_utf8_lossy(raw).into_owned())
                .unwrap_or_default(),
            other => format!("{other:?}"),
        };
        Some(parse_exif_date_time(&text))
    }

    pub fn with_date_time(&self, tag: DateTag, value: NaiveDateTime) -> Self {
        let replacement = Field {
            tag: tag.tag(),
            ifd_num: In::PRIMARY,
            value: Value::Ascii(vec![format_exif_date_time(&value).into_bytes()]),
        };

        let mut next = self.clone();
        match next
            .fields
            .iter_mut()
            .find(|field| field.tag == replacement.tag && field.ifd_num == In::PRIMARY)
        {
            Some(existing) => *existing = replacement,
            None => next.fields.push(replacement),
        }
        next
    }

    /// Drops the `1st` IFD together with the thumbnail image it points to.
    pub fn without_thumbnail(&self) -> Self {
        let mut next = self.clone();
        next.fields.retain(|field| field.ifd_num != In::THUMBNAIL);
        next
    }

    pub fn encode(&self) -> Result<Vec<u8>, ExifTagsError> {
        let thumbnail = self.thumbnail()?;

        let mut writer = Writer::new();
        for field in &self.fields {
            writer.push_field(field);
        }
        if let Some(jpeg) = thumbnail {
            writer.set_jpeg(jpeg, In::THUMBNAIL);
        }

        let mut buf = Cursor::new(Vec::new());
        writer
            .write(&mut buf, self.little_endian)
            .map_err(|err| ExifTagsError::Encode(err.to_string()))?;
        Ok(buf.into_inner())
    }

    /// Encodes once as-is and, on failure, once more without the thumbnail groups.
    pub fn encode_with_fallback(&self) -> Result<EncodedExif, ExifTagsError> {
        match self.encode() {
            Ok(tiff) => Ok(EncodedExif {
                tiff,
                dropped_thumbnail: false,
            }),
            Err(_) => Ok(EncodedExif {
                tiff: self.without_thumbnail().encode()?,
                dropped_thumbnail: true,
            }),
        }
    }

    fn field(&self, tag: Tag, ifd_num: In) -> Option<&Field> {
        self.fields
            .iter()
            .find(|field| field.tag == tag && field.ifd_num == ifd_num)
    }

    fn thumbnail(&self) -> Result<Option<&[u8]>, ExifTagsError> {
        let Some(offset) = self
            .field(Tag::JPEGInterchangeFormat, In::THUMBNAIL)
            .and_then(|field| field.value.get_uint(0))
        else {
            return Ok(None);
        };
        let length = self
            .field(Tag::JPEGInterchangeFormatLength, In::THUMBNAIL)
            .and_then(|field| field.value.get_uint(0))
            .ok_or_else(|| ExifTagsError::Encode("サムネイルの長さがありません".to_string()))?;

        let start = offset as usize;
        start
            .checked_add(length as usize)
            .and_then(|end| self.raw.get(start..end))
            .map(Some)
            .ok_or_else(|| {
                ExifTagsError::Encode(format!(
                    "サムネイルの範囲が不正です: offset={offset} length={length}"
                ))
            })
    }
}
