use crate::config::CorrectionJob;
use anyhow::{Context, Result};
use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use tracing::debug;
use walkdir::WalkDir;

/// Files under `job.source` (at any depth) matching `job.template`, in walk order
/// (entries of one folder sorted by name).
/// A missing source folder is not an error and yields an empty list.
pub fn read_file_list(job: &CorrectionJob) -> Result<Vec<PathBuf>> {
    let root = job.source.as_path();
    if !root.exists() {
        debug!(path = %root.display(), "source folder does not exist");
        return Ok(Vec::new());
    }

    let matcher = NameMatcher::new(&job.template, job.include_hidden)?;
    let include_hidden = job.include_hidden;
    let mut out = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            include_hidden
                || entry.depth() == 0
                || !(entry.file_type().is_dir() && is_hidden(entry.path()))
        });
    for entry in walker {
        let entry =
            entry.with_context(|| format!("フォルダ走査に失敗しました: {}", root.display()))?;
        if entry.depth() == 0 || !entry.path().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        if matcher.matches(relative) {
            out.push(entry.into_path());
        }
    }

    debug!(path = %root.display(), matched = out.len(), "file list ready");
    Ok(out)
}

struct NameMatcher {
    pattern: Pattern,
    by_relative_path: bool,
    options: MatchOptions,
}

impl NameMatcher {
    fn new(template: &str, include_hidden: bool) -> Result<Self> {
        let by_relative_path = template.contains('/') || template.contains(MAIN_SEPARATOR);
        let source = if by_relative_path {
            format!("**/{}", template.trim_start_matches(['/', MAIN_SEPARATOR]))
        } else {
            template.to_string()
        };
        let pattern = Pattern::new(&source)
            .with_context(|| format!("ファイル名テンプレートが不正です: {template}"))?;

        Ok(Self {
            pattern,
            by_relative_path,
            options: MatchOptions {
                case_sensitive: true,
                require_literal_separator: true,
                require_literal_leading_dot: !include_hidden,
            },
        })
    }

    fn matches(&self, relative: &Path) -> bool {
        if self.by_relative_path {
            return self.pattern.matches_path_with(relative, self.options);
        }
        relative
            .file_name()
            .map(|name| {
                self.pattern
                    .matches_with(&name.to_string_lossy(), self.options)
            })
            .unwrap_or(false)
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}
