mod logging;

use anyhow::{Context, Result};
use chrono::{NaiveDate, TimeDelta};
use clap::{Parser, ValueEnum};
use date_corrector_core::{fix_files, load_config, parse_fixed_date, CorrectionJob, RunEvent};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "date-corrector-cli")]
#[command(about = "JPG写真のEXIF撮影日時を一括補正し、output フォルダへ書き出します")]
struct Cli {
    /// 写真フォルダ
    #[arg(short, long)]
    path: PathBuf,
    /// 出力ファイル名の接頭辞 (省略時は設定ファイルの値)
    #[arg(short = 'x', long)]
    prefix: Option<String>,
    /// 補正する時間 (分、負数可)
    #[arg(short, long, allow_negative_numbers = true)]
    shift: i64,
    /// ファイル名パターン (例: *.jpg)
    #[arg(short, long)]
    template: String,
    /// 固定する日付 (YYYY:MM:DD)
    #[arg(short, long, value_parser = parse_date_arg)]
    date: Option<NaiveDate>,
    #[arg(long, default_value_t = false)]
    include_hidden: bool,
    #[arg(long, default_value_t = false)]
    dry_run: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn parse_date_arg(value: &str) -> Result<NaiveDate, String> {
    parse_fixed_date(value).map_err(|err| err.to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = load_config()?;
    let shift = TimeDelta::try_minutes(cli.shift)
        .with_context(|| format!("補正時間が大きすぎます: {}分", cli.shift))?;

    let mut job = CorrectionJob::new(cli.path, shift);
    job.prefix = cli.prefix.unwrap_or(config.prefix);
    job.template = cli.template;
    job.fixed_date = cli.date;
    job.include_hidden = cli.include_hidden || config.include_hidden;
    job.dry_run = cli.dry_run;

    match cli.output {
        OutputFormat::Text => {
            fix_files(&job, |event: &RunEvent<'_>| println!("{event}"))?;
            if job.dry_run {
                eprintln!("dry-runモード: ファイルは書き出していません。");
            }
        }
        OutputFormat::Json => {
            let report = fix_files(&job, |_: &RunEvent<'_>| {})?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
