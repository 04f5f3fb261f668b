//! Archive normalizer: zip with one CSV in, gzip-compressed CSV out
//!
//! The monthly archive is fully extracted under the workspace, the result must
//! contain exactly one `.csv` file, and that file is re-compressed with gzip so
//! it can be staged as a single stream-friendly object. Extracted files are not
//! cleaned up individually; they go away with the workspace.

use crate::error::{IngestError, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};
use zip::result::ZipError;
use zip::ZipArchive;

const EXTRACT_DIR: &str = "extracted";

/// The single tabular file, gzip-compressed and ready to stage
#[derive(Debug, Clone)]
pub struct NormalizedArtifact {
    pub path: PathBuf,
    /// Name of the CSV inside the archive
    pub source_name: String,
    pub raw_bytes: u64,
    pub compressed_bytes: u64,
}

/// Async wrapper running [`normalize_blocking`] on the blocking pool
pub async fn normalize(archive: &Path, dest_dir: &Path) -> Result<NormalizedArtifact> {
    let archive = archive.to_path_buf();
    let dest_dir = dest_dir.to_path_buf();

    tokio::task::spawn_blocking(move || normalize_blocking(&archive, &dest_dir))
        .await
        .map_err(|e| IngestError::Io(io::Error::other(e)))?
}

#[instrument(skip_all)]
pub fn normalize_blocking(archive_path: &Path, dest_dir: &Path) -> Result<NormalizedArtifact> {
    let extract_dir = dest_dir.join(EXTRACT_DIR);
    fs::create_dir_all(&extract_dir)?;

    extract_all(archive_path, &extract_dir)?;

    let mut tabular = find_tabular_files(&extract_dir)?;
    if tabular.len() != 1 {
        return Err(IngestError::UnexpectedArchiveLayout(format!(
            "expected exactly one .csv file, found {}",
            tabular.len()
        )));
    }
    let csv_path = tabular.remove(0);
    let source_name = csv_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let raw_bytes = fs::metadata(&csv_path)?.len();
    if raw_bytes == 0 {
        return Err(IngestError::UnexpectedArchiveLayout(format!(
            "{} is empty",
            source_name
        )));
    }

    let output = dest_dir.join(format!("{}.gz", source_name));
    gzip_file(&csv_path, &output, raw_bytes)?;

    let compressed_bytes = fs::metadata(&output)?.len();
    if compressed_bytes == 0 {
        return Err(IngestError::Io(io::Error::other("gzip output is empty")));
    }

    info!(
        source = %source_name,
        raw_bytes,
        compressed_bytes,
        "Repackaged archive as gzip"
    );

    Ok(NormalizedArtifact {
        path: output,
        source_name,
        raw_bytes,
        compressed_bytes,
    })
}

fn extract_all(archive_path: &Path, extract_dir: &Path) -> Result<()> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(BufReader::new(file)).map_err(zip_error)?;

    debug!(entries = archive.len(), "Extracting archive");

    archive.extract(extract_dir).map_err(zip_error)
}

/// Corrupt or unreadable archives signal a source format change; plain IO
/// failures (disk full, permissions) stay IO errors.
fn zip_error(err: ZipError) -> IngestError {
    match err {
        ZipError::Io(e) => IngestError::Io(e),
        other => IngestError::UnexpectedArchiveLayout(format!("unreadable zip archive: {}", other)),
    }
}

fn find_tabular_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        for entry in fs::read_dir(&current)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                pending.push(path);
            } else if is_tabular(&path) {
                found.push(path);
            }
        }
    }

    found.sort();
    Ok(found)
}

fn is_tabular(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

fn gzip_file(input: &Path, output: &Path, expected_bytes: u64) -> Result<()> {
    let mut reader = BufReader::new(File::open(input)?);
    let writer = BufWriter::new(File::create(output)?);
    let mut encoder = GzEncoder::new(writer, Compression::default());

    let copied = io::copy(&mut reader, &mut encoder)?;
    if copied != expected_bytes {
        return Err(IngestError::Io(io::Error::other(format!(
            "compressed {} of {} bytes",
            copied, expected_bytes
        ))));
    }

    let mut writer = encoder.finish()?;
    writer.flush()?;
    writer.get_ref().sync_all()?;

    Ok(())
}
