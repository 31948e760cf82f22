//! Monthly trip archive downloads.
//!
//! Archives are published as `YYYYMM-divvy-tripdata.zip` in a public S3
//! bucket. Each archive holds one CSV (plus macOS metadata in some
//! months), which is extracted as `YYYYMM-divvy-tripdata.csv`.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek};
use std::path::Path;

use bikeshare_ingest_models::DownloadReport;
use bikeshare_source::progress::ProgressCallback;
use tokio::io::AsyncWriteExt as _;
use zip::ZipArchive;

use crate::IngestError;

/// Public bucket holding the monthly archives.
pub const ARCHIVE_BASE_URL: &str = "https://divvy-tripdata.s3.amazonaws.com";

/// Returns the file stem for one month, e.g. `202406-divvy-tripdata`.
#[must_use]
pub fn archive_stem(year: i32, month: u32) -> String {
    format!("{year:04}{month:02}-divvy-tripdata")
}

/// Lists the months to fetch: one month, or all twelve of `year`.
///
/// # Errors
///
/// Returns [`IngestError::Configuration`] if `month` is not 1-12.
pub fn months(year: i32, month: Option<u32>) -> Result<Vec<(i32, u32)>, IngestError> {
    match month {
        Some(m) if (1..=12).contains(&m) => Ok(vec![(year, m)]),
        Some(m) => Err(IngestError::Configuration {
            message: format!("Month must be between 1 and 12, got {m}"),
        }),
        None => Ok((1..=12).map(|m| (year, m)).collect()),
    }
}

/// Extracts the first CSV entry of a zip archive to `dest`. Directory
/// entries and `__MACOSX/` metadata are ignored. Returns `false` if the
/// archive holds no CSV.
///
/// The entry is written to a `.part` sibling and renamed into place once
/// its checksum verifies, so `dest` never holds a partial file.
///
/// # Errors
///
/// Returns [`IngestError`] if the archive is unreadable or `dest` cannot
/// be written.
pub fn extract_first_csv<R: Read + Seek>(reader: R, dest: &Path) -> Result<bool, IngestError> {
    let mut archive = ZipArchive::new(reader)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();

        if entry.is_dir()
            || name.starts_with("__MACOSX")
            || !name.to_ascii_lowercase().ends_with(".csv")
        {
            continue;
        }

        let part = dest.with_extension("csv.part");
        let copied = File::create(&part).and_then(|mut out| std::io::copy(&mut entry, &mut out));
        let bytes = match copied {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("Discarding partial {}: {e}", part.display());
                remove_if_exists(&part);
                return Err(e.into());
            }
        };
        std::fs::rename(&part, dest)?;

        log::info!("Extracted {name} to {} ({bytes} bytes)", dest.display());
        return Ok(true);
    }

    Ok(false)
}

fn remove_if_exists(path: &Path) {
    if let Err(e) = std::fs::remove_file(path)
        && e.kind() != ErrorKind::NotFound
    {
        log::warn!("Failed to remove {}: {e}", path.display());
    }
}

/// Streams the archive at `url` into `path`, returning its size.
async fn fetch_archive(
    client: &reqwest::Client,
    url: &str,
    path: &Path,
) -> Result<u64, IngestError> {
    let mut resp = client.get(url).send().await?;
    if !resp.status().is_success() {
        return Err(IngestError::Download {
            url: url.to_string(),
            message: format!("status {}", resp.status()),
        });
    }

    let mut file = tokio::fs::File::create(path).await?;
    let mut bytes = 0u64;
    while let Some(chunk) = resp.chunk().await? {
        file.write_all(&chunk).await?;
        bytes += chunk.len() as u64;
    }
    file.flush().await?;

    Ok(bytes)
}

/// Outcome of one month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthOutcome {
    /// Archive fetched and CSV extracted.
    Downloaded,
    /// CSV already present and `force` not set.
    Skipped,
}

/// Downloads and extracts one month into `csv_dir`.
///
/// # Errors
///
/// Returns [`IngestError`] if the request fails, the server answers with a
/// non-success status, or the archive cannot be extracted.
pub async fn download_month(
    client: &reqwest::Client,
    base_url: &str,
    csv_dir: &Path,
    (year, month): (i32, u32),
    force: bool,
) -> Result<MonthOutcome, IngestError> {
    let stem = archive_stem(year, month);
    let dest = csv_dir.join(format!("{stem}.csv"));

    if dest.exists() && !force {
        log::info!("Skipping {stem}: {} already exists", dest.display());
        return Ok(MonthOutcome::Skipped);
    }

    let url = format!("{}/{stem}.zip", base_url.trim_end_matches('/'));
    log::info!("Downloading {url}");

    let archive_path = csv_dir.join(format!("{stem}.zip.part"));
    let extracted = fetch_archive(client, &url, &archive_path)
        .await
        .and_then(|size| {
            log::debug!("Fetched {stem}.zip ({size} bytes)");
            let file = File::open(&archive_path)?;
            extract_first_csv(BufReader::new(file), &dest)
        });
    remove_if_exists(&archive_path);

    if !extracted? {
        return Err(IngestError::Download {
            url,
            message: "archive contains no CSV file".to_string(),
        });
    }

    Ok(MonthOutcome::Downloaded)
}

/// Downloads every month in `months`. A failed month is recorded and the
/// rest still run.
///
/// # Errors
///
/// Returns [`IngestError::Io`] if `csv_dir` cannot be created.
pub async fn download_archives(
    base_url: &str,
    csv_dir: &Path,
    months: &[(i32, u32)],
    force: bool,
    progress: &dyn ProgressCallback,
) -> Result<DownloadReport, IngestError> {
    std::fs::create_dir_all(csv_dir)?;

    let client = reqwest::Client::new();
    let mut report = DownloadReport::default();
    progress.set_total(months.len() as u64);

    for &(year, month) in months {
        let label = format!("{year:04}{month:02}");
        progress.set_message(label.clone());

        match download_month(&client, base_url, csv_dir, (year, month), force).await {
            Ok(MonthOutcome::Downloaded) => report.downloaded.push(label),
            Ok(MonthOutcome::Skipped) => report.skipped.push(label),
            Err(e) => {
                log::error!("Failed to download {label}: {e}");
                report.failed.push((label, e.to_string()));
            }
        }
        progress.inc(1);
    }

    progress.finish(format!(
        "{} downloaded, {} skipped, {} failed",
        report.downloaded.len(),
        report.skipped.len(),
        report.failed.len()
    ));

    Ok(report)
}
