//! Load/store for the master dataset and review batches. The master file is a
//! CSV workbook with the fixed six-column schema; writes go through a sibling
//! temp file and an atomic rename so readers never observe a half-written
//! dataset.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{Error, Result};
use crate::models::{ContactRecord, MasterRow};

pub const MASTER_COLUMNS: [&str; 6] = ["Name", "WhatsApp", "Phone", "Email", "Website", "City"];

const DIAGNOSTIC_COLUMNS: [&str; 2] = ["Address", "SourceId"];

pub fn load_master(path: &Path) -> Result<Vec<MasterRow>> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers != MASTER_COLUMNS {
        return Err(Error::MergeIntegrity {
            reason: format!("unexpected master schema: {headers:?}"),
            backup: None,
        });
    }
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        let row: MasterRow = row.map_err(|e| Error::MergeIntegrity {
            reason: format!("corrupt master row: {e}"),
            backup: None,
        })?;
        rows.push(row);
    }
    Ok(rows)
}

/// Atomic replace: serialize next to the target, then rename over it.
pub fn write_master(path: &Path, rows: &[MasterRow]) -> Result<()> {
    let tmp = temp_sibling(path);
    {
        let mut writer = csv::Writer::from_path(&tmp)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("master.csv");
    path.with_file_name(format!(".{name}.tmp"))
}

/// Writes the reviewable output batch. With diagnostics enabled the six-column
/// template gains Address and SourceId columns for manual triage.
pub fn write_batch(
    path: &Path,
    records: &[ContactRecord],
    include_diagnostics: bool,
) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    if include_diagnostics {
        let header: Vec<&str> = MASTER_COLUMNS
            .iter()
            .chain(DIAGNOSTIC_COLUMNS.iter())
            .copied()
            .collect();
        writer.write_record(&header)?;
        for record in records {
            writer.write_record([
                record.name.as_str(),
                record.whatsapp.as_str(),
                record.phone.as_str(),
                record.email.as_deref().unwrap_or(""),
                record.website.as_str(),
                record.city.as_str(),
                record.address.as_str(),
                record.source_id.as_deref().unwrap_or(""),
            ])?;
        }
    } else {
        for record in records {
            writer.serialize(batch_row(record))?;
        }
    }
    writer.flush()?;
    info!("review batch written: {} ({} records)", path.display(), records.len());
    Ok(())
}

/// Reads a reviewed batch back. Diagnostic columns, when present, are ignored
/// beyond the Address/SourceId passthrough.
pub fn read_batch(path: &Path) -> Result<Vec<ContactRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.len() < MASTER_COLUMNS.len() || headers[..6] != MASTER_COLUMNS {
        return Err(Error::Config(format!(
            "batch file {} does not follow the review template",
            path.display()
        )));
    }
    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let get = |i: usize| row.get(i).unwrap_or("").trim().to_string();
        let email = get(3);
        let record = ContactRecord {
            name: get(0),
            whatsapp: get(1),
            phone: get(2),
            email: if email.is_empty() { None } else { Some(email) },
            website: get(4),
            city: get(5),
            address: get(6),
            source_id: {
                let id = get(7);
                if id.is_empty() {
                    None
                } else {
                    Some(id)
                }
            },
            verified: false,
        };
        let verified = record.has_contact();
        records.push(ContactRecord { verified, ..record });
    }
    Ok(records)
}

fn batch_row(record: &ContactRecord) -> MasterRow {
    MasterRow {
        name: record.name.clone(),
        whatsapp: record.whatsapp.clone(),
        phone: record.phone.clone(),
        email: record.email.clone().unwrap_or_default(),
        website: record.website.clone(),
        city: record.city.clone(),
    }
}
