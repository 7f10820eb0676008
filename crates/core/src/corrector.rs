use crate::config::CorrectionJob;
use crate::discovery::read_file_list;
use crate::exif_tags::{DateTag, ExifTags, ExifTagsError, TagGroup};
use crate::jpeg::{is_jpeg, replace_exif_segment, JpegError};
use crate::timestamp::{correct_timestamp, format_exif_date_time, to_system_time};
use anyhow::Result;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;
use std::fs::{self, File, FileTimes};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use tracing::{debug, warn};

/// Failures that abort the whole run. Per-file problems the run can step over
/// are reported as a [`FileOutcome`] instead.
#[derive(Debug, Error)]
pub enum CorrectionError {
    #[error("画像を読めませんでした: {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("出力フォルダを作成できませんでした: {}", .path.display())]
    CreateOutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("EXIFを再構築できませんでした: {}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: ExifTagsError,
    },
    #[error("JPEGにEXIFを埋め込めませんでした: {}", .path.display())]
    Embed {
        path: PathBuf,
        #[source]
        source: JpegError,
    },
    #[error("補正済みファイルを書き込めませんでした: {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixedFile {
    pub source: PathBuf,
    pub target: PathBuf,
    pub label: String,
    pub date_time_original: String,
    pub date_time_digitized: Option<String>,
    pub dropped_thumbnail: bool,
    /// The target is the matched file itself (a rerun over `output/` without a prefix).
    pub in_place: bool,
    pub written: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Fixed(FixedFile),
    MissingExif { path: PathBuf },
    Corrupted { path: PathBuf, reason: String },
    Unsupported { path: PathBuf },
}

impl fmt::Display for FileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileOutcome::Fixed(fixed) => write!(
                f,
                "Fixing {}->{} {}",
                fixed.source.display(),
                fixed.target.display(),
                fixed.label
            ),
            FileOutcome::MissingExif { path } => write!(f, "EXIF is missing {}", path.display()),
            FileOutcome::Corrupted { path, .. } => write!(f, "Corrupted {}", path.display()),
            FileOutcome::Unsupported { path } => write!(f, "Unsupported {}", path.display()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum RunEvent<'a> {
    NothingToFix(&'a Path),
    File(&'a FileOutcome),
    Finished { processed: usize },
}

impl fmt::Display for RunEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunEvent::NothingToFix(path) => write!(f, "Nothing to fix in{}", path.display()),
            RunEvent::File(outcome) => fmt::Display::fmt(outcome, f),
            RunEvent::Finished { processed } => {
                write!(f, "Finished, {processed} files were processed")
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub source: PathBuf,
    /// Files attempted, whether or not they were fixed.
    pub processed: usize,
    pub fixed: usize,
    pub skipped: usize,
    pub outcomes: Vec<FileOutcome>,
}

impl RunReport {
    fn new(source: &Path, outcomes: Vec<FileOutcome>) -> Self {
        let fixed = outcomes
            .iter()
            .filter(|outcome| matches!(outcome, FileOutcome::Fixed(_)))
            .count();
        Self {
            source: source.to_path_buf(),
            processed: outcomes.len(),
            fixed,
            skipped: outcomes.len() - fixed,
            outcomes,
        }
    }
}

pub fn fix_files<F>(job: &CorrectionJob, mut on_event: F) -> Result<RunReport>
where
    F: FnMut(&RunEvent<'_>),
{
    let files = read_file_list(job)?;
    if files.is_empty() {
        on_event(&RunEvent::NothingToFix(&job.source));
        return Ok(RunReport::new(&job.source, Vec::new()));
    }

    let total = files.len();
    let mut outcomes = Vec::with_capacity(total);
    for (index, path) in files.iter().enumerate() {
        let label = format!("({}/{})", index + 1, total);
        let outcome = fix_file(job, path, &label)?;
        on_event(&RunEvent::File(&outcome));
        outcomes.push(outcome);
    }
    on_event(&RunEvent::Finished { processed: total });

    Ok(RunReport::new(&job.source, outcomes))
}

pub fn fix_file(
    job: &CorrectionJob,
    path: &Path,
    label: &str,
) -> Result<FileOutcome, CorrectionError> {
    let bytes = fs::read(path).map_err(|source| CorrectionError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if !is_jpeg(&bytes) {
        return Ok(FileOutcome::Unsupported {
            path: path.to_path_buf(),
        });
    }

    let tags = match ExifTags::read_from_jpeg(&bytes) {
        Ok(tags) => tags,
        Err(ExifTagsError::Missing) => {
            return Ok(FileOutcome::MissingExif {
                path: path.to_path_buf(),
            })
        }
        Err(err) => return Ok(corrupted(path, err.to_string())),
    };
    debug!(path = %path.display(), groups = ?tags.groups(), "exif loaded");

    if !tags.has_group(TagGroup::Exif) {
        return Ok(corrupted(path, "Exifグループがありません".to_string()));
    }
    let Some(original) = tags.date_time(DateTag::Original) else {
        return Ok(corrupted(path, "DateTimeOriginalがありません".to_string()));
    };

    let correct = |value: NaiveDateTime| correct_timestamp(value, job.fixed_date, job.shift);
    let original = match original.and_then(correct) {
        Ok(value) => value,
        Err(err) => return Ok(corrupted(path, err.to_string())),
    };
    let digitized = match tags.date_time(DateTag::Digitized) {
        Some(value) => match value.and_then(correct) {
            Ok(value) => Some(value),
            Err(err) => return Ok(corrupted(path, err.to_string())),
        },
        None => None,
    };

    let mut updated = tags.with_date_time(DateTag::Original, original);
    if let Some(value) = digitized {
        updated = updated.with_date_time(DateTag::Digitized, value);
    }

    let target = job.output_path_for(path);
    let in_place = target.as_path() == path;
    if in_place {
        warn!(path = %path.display(), "matched file is its own output and will be overwritten");
    }
    let mut fixed = FixedFile {
        source: path.to_path_buf(),
        target: target.clone(),
        label: label.to_string(),
        date_time_original: format_exif_date_time(&original),
        date_time_digitized: digitized.as_ref().map(format_exif_date_time),
        dropped_thumbnail: false,
        in_place,
        written: false,
    };
    if job.dry_run {
        return Ok(FileOutcome::Fixed(fixed));
    }

    let output_dir = job.output_dir();
    fs::create_dir_all(&output_dir).map_err(|source| CorrectionError::CreateOutputDir {
        path: output_dir.clone(),
        source,
    })?;

    let encoded = updated
        .encode_with_fallback()
        .map_err(|source| CorrectionError::Encode {
            path: path.to_path_buf(),
            source,
        })?;
    if encoded.dropped_thumbnail {
        warn!(path = %path.display(), "thumbnail groups dropped to re-encode EXIF");
    }
    let output =
        replace_exif_segment(&bytes, &encoded.tiff).map_err(|source| CorrectionError::Embed {
            path: path.to_path_buf(),
            source,
        })?;

    let file_time = to_system_time(&digitized.unwrap_or(original));
    write_with_times(&target, &output, file_time).map_err(|source| CorrectionError::Write {
        path: target.clone(),
        source,
    })?;

    fixed.dropped_thumbnail = encoded.dropped_thumbnail;
    fixed.written = true;
    Ok(FileOutcome::Fixed(fixed))
}

fn corrupted(path: &Path, reason: String) -> FileOutcome {
    debug!(path = %path.display(), %reason, "skipping file");
    FileOutcome::Corrupted {
        path: path.to_path_buf(),
        reason,
    }
}

fn write_with_times(path: &Path, bytes: &[u8], time: SystemTime) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.set_times(FileTimes::new().set_accessed(time).set_modified(time))
}
