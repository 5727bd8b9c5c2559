use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use tracing::{info, warn};

use crate::backup::{BackupManager, BackupRef};
use crate::dataset::{load_master, write_master};
use crate::dedup::MasterIndex;
use crate::error::{Error, Result};
use crate::models::{ContactRecord, MasterRow};
use crate::phone::{classify, PhoneClass};

/// Outcome of a merge. Ephemeral; counts are also logged.
#[derive(Debug)]
pub struct MergeReport {
    pub added: usize,
    pub updated: usize,
    pub skipped: usize,
    pub backup: BackupRef,
}

/// Reconciles reviewed batches into the master dataset. The master file is
/// only ever touched after a successful backup, and the final write is an
/// atomic replace, so a failed merge leaves the file exactly as it was.
pub struct MergeEngine {
    backups: BackupManager,
}

// Merges against the same path must not interleave backup+write. One lock per
// canonical path; single-writer discipline within the process.
fn path_lock(path: &Path) -> Arc<Mutex<()>> {
    static LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();
    let locks = LOCKS.get_or_init(|| Mutex::new(HashMap::new()));
    let mut map = locks.lock().unwrap_or_else(|e| e.into_inner());
    map.entry(path.to_path_buf()).or_default().clone()
}

impl MergeEngine {
    pub fn new(backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            backups: BackupManager::new(backup_dir),
        }
    }

    pub fn merge(&self, batch: &[ContactRecord], master_path: &Path) -> Result<MergeReport> {
        let lock = path_lock(master_path);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let backup = self.backups.backup(master_path)?;
        let mut rows = load_master(master_path).map_err(|e| attach_backup(e, &backup))?;
        let mut index = MasterIndex::build(&rows);

        let (mut added, mut updated, mut skipped) = (0usize, 0usize, 0usize);
        for record in batch {
            let incoming = classified_row(record);
            match index.lookup(&incoming.name, &incoming.website) {
                Some(hit) => {
                    if hit.ambiguous {
                        warn!(
                            "ambiguous duplicate for '{}': several master rows match, updating the first",
                            incoming.name
                        );
                    }
                    if fill_row(&mut rows[hit.master_index], &incoming) {
                        updated += 1;
                    } else {
                        skipped += 1;
                    }
                }
                None => {
                    index.insert(rows.len(), &incoming);
                    rows.push(incoming);
                    added += 1;
                }
            }
        }

        write_master(master_path, &rows).map_err(|e| attach_backup(e, &backup))?;
        info!(
            "merge complete: {} added, {} updated, {} skipped ({} rows total)",
            added,
            updated,
            skipped,
            rows.len()
        );
        Ok(MergeReport {
            added,
            updated,
            skipped,
            backup,
        })
    }
}

fn attach_backup(error: Error, backup: &BackupRef) -> Error {
    match error {
        Error::MergeIntegrity { reason, .. } => Error::MergeIntegrity {
            reason,
            backup: Some(backup.path.clone()),
        },
        other => other,
    }
}

/// Re-runs phone classification on the reviewed record so a hand-edited batch
/// still lands mobiles in WhatsApp and landlines in Phone.
fn classified_row(record: &ContactRecord) -> MasterRow {
    let raw = if !record.whatsapp.trim().is_empty() {
        record.whatsapp.as_str()
    } else {
        record.phone.as_str()
    };
    let (class, number) = classify(raw);
    let (whatsapp, phone) = match class {
        PhoneClass::Mobile => (number, String::new()),
        PhoneClass::Landline => (String::new(), number),
        PhoneClass::Unknown => (String::new(), String::new()),
    };
    MasterRow {
        name: record.name.trim().to_string(),
        whatsapp,
        phone,
        email: record.email.clone().unwrap_or_default(),
        website: record.website.trim().to_string(),
        city: record.city.trim().to_string(),
    }
}

/// Incoming non-empty values fill empty master cells. Existing master values
/// always win; a row where nothing changed counts as skipped.
fn fill_row(row: &mut MasterRow, incoming: &MasterRow) -> bool {
    let mut changed = false;
    let pairs = [
        (&mut row.whatsapp, &incoming.whatsapp),
        (&mut row.phone, &incoming.phone),
        (&mut row.email, &incoming.email),
        (&mut row.website, &incoming.website),
        (&mut row.city, &incoming.city),
    ];
    for (cell, value) in pairs {
        if cell.trim().is_empty() && !value.trim().is_empty() {
            *cell = value.clone();
            changed = true;
        }
    }
    changed
}
