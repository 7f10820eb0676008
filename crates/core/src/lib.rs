mod config;
mod corrector;
mod discovery;
mod exif_tags;
mod jpeg;
mod timestamp;

#[cfg(test)]
mod test_support;

pub use config::{
    load_config, load_config_from, AppConfig, CorrectionJob, DEFAULT_NAME_TEMPLATE,
    OUTPUT_DIR_NAME,
};
pub use corrector::{
    fix_file, fix_files, CorrectionError, FileOutcome, FixedFile, RunEvent, RunReport,
};
pub use discovery::read_file_list;
pub use exif_tags::{DateTag, EncodedExif, ExifTags, ExifTagsError, TagGroup};
pub use jpeg::{is_jpeg, replace_exif_segment, JpegError};
pub use timestamp::{
    correct_timestamp, format_exif_date_time, parse_exif_date_time, parse_fixed_date,
    to_system_time, TimestampError, EXIF_DATE_FORMAT, EXIF_DATE_TIME_FORMAT,
};
