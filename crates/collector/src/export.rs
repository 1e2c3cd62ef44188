//! CSV and JSON export of a ledger.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use vcevidence_common::{hash, Error, Result, Timestamp};
use vcevidence_schema::{EvidenceRecord, Ledger};

/// CSV header, one column per record field in export order.
pub const CSV_HEADER: [&str; 8] = [
    "Timestamp",
    "Category",
    "Scope",
    "Ref",
    "Key",
    "Value",
    "Severity",
    "Notes",
];

/// Files written by one export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub csv: PathBuf,
    pub json: PathBuf,
    pub checksums: PathBuf,
}

fn export_error(path: &Path, err: impl std::fmt::Display) -> Error {
    Error::Export(format!("{}: {}", path.display(), err))
}

/// Replace anything outside `[A-Za-z0-9._-]` so the target can be used in
/// a file name.
pub fn sanitize_target(target: &str) -> String {
    let cleaned: String = target
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}

/// `<prefix>-<target>-<YYYYMMDD-HHmmss>`
pub fn file_stem(prefix: &str, target: &str, stamp: &Timestamp) -> String {
    format!(
        "{}-{}-{}",
        prefix,
        sanitize_target(target),
        stamp.to_file_stamp()
    )
}

pub fn write_csv(records: &[EvidenceRecord], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| export_error(path, e))?;
    if records.is_empty() {
        writer
            .write_record(CSV_HEADER)
            .map_err(|e| export_error(path, e))?;
    }
    for record in records {
        writer.serialize(record).map_err(|e| export_error(path, e))?;
    }
    writer.flush().map_err(|e| export_error(path, e))?;
    Ok(())
}

pub fn write_json(records: &[EvidenceRecord], path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|e| export_error(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, records).map_err(|e| export_error(path, e))?;
    writer.flush().map_err(|e| export_error(path, e))?;
    Ok(())
}

pub fn read_json(path: &Path) -> Result<Vec<EvidenceRecord>> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

pub fn read_csv(path: &Path) -> Result<Vec<EvidenceRecord>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| export_error(path, e))?;
    reader
        .deserialize()
        .map(|row| row.map_err(|e| export_error(path, e)))
        .collect()
}

/// Write the ledger in display order as CSV and JSON under `out_folder`,
/// plus a `.sha256` file listing both digests.
pub fn export_ledger(
    ledger: &Ledger,
    out_folder: &Path,
    prefix: &str,
    target: &str,
    stamp: &Timestamp,
) -> Result<ExportPaths> {
    std::fs::create_dir_all(out_folder).map_err(|e| export_error(out_folder, e))?;

    let stem = file_stem(prefix, target, stamp);
    let paths = ExportPaths {
        csv: out_folder.join(format!("{}.csv", stem)),
        json: out_folder.join(format!("{}.json", stem)),
        checksums: out_folder.join(format!("{}.sha256", stem)),
    };

    let records = ledger.display_order();
    write_csv(&records, &paths.csv)?;
    write_json(&records, &paths.json)?;

    let mut listing = String::new();
    for path in [&paths.csv, &paths.json] {
        let digest = hash::sha256_file(path).map_err(|e| export_error(path, e))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        listing.push_str(&hash::listing_line(&digest, &name));
    }
    std::fs::write(&paths.checksums, listing).map_err(|e| export_error(&paths.checksums, e))?;

    info!(
        "Exported {} records to {} and {}",
        records.len(),
        paths.csv.display(),
        paths.json.display()
    );
    Ok(paths)
}

/// Check an export against the digest listed in its `.sha256` companion.
///
/// Returns `Ok(None)` when there is no companion file.
pub fn verify_checksum(path: &Path) -> Result<Option<bool>> {
    let companion = path.with_extension("sha256");
    if !companion.exists() {
        return Ok(None);
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let listing = std::fs::read_to_string(&companion)?;
    let expected = hash::listed_digest(&listing, &name)
        .ok_or_else(|| export_error(&companion, format!("no digest listed for {}", name)))?;

    let actual = hash::sha256_file(path)?;
    Ok(Some(actual == expected))
}
