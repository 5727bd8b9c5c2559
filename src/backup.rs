use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;

use crate::error::{Error, Result};

/// Reference to a snapshot taken before a mutation. Backups are never deleted
/// by the pipeline.
#[derive(Debug, Clone)]
pub struct BackupRef {
    pub path: PathBuf,
}

pub struct BackupManager {
    backup_dir: PathBuf,
}

impl BackupManager {
    pub fn new(backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            backup_dir: backup_dir.into(),
        }
    }

    /// Copies the dataset byte-for-byte into the backup directory as
    /// `{stem}_backup_{YYYYMMDD_HHMMSS}.{ext}`. A missing source or a failed
    /// write surfaces as [`Error::Backup`]; callers must not mutate the
    /// dataset after that.
    pub fn backup(&self, dataset_path: &Path) -> Result<BackupRef> {
        if !dataset_path.is_file() {
            return Err(Error::Backup(io::Error::new(
                io::ErrorKind::NotFound,
                format!("master dataset not found: {}", dataset_path.display()),
            )));
        }
        fs::create_dir_all(&self.backup_dir).map_err(Error::Backup)?;

        let stem = dataset_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("master");
        let ext = dataset_path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("csv");
        let stamp = Local::now().format("%Y%m%d_%H%M%S");

        let mut candidate = self.backup_dir.join(format!("{stem}_backup_{stamp}.{ext}"));
        let mut n = 1;
        // Same-second collisions get a numeric suffix instead of overwriting.
        while candidate.exists() {
            candidate = self
                .backup_dir
                .join(format!("{stem}_backup_{stamp}_{n}.{ext}"));
            n += 1;
        }

        fs::copy(dataset_path, &candidate).map_err(Error::Backup)?;
        info!("backup written: {}", candidate.display());
        Ok(BackupRef { path: candidate })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn backup_is_a_byte_identical_timestamped_copy() {
        let tmp = TempDir::new().unwrap();
        let master = tmp.path().join("master.csv");
        fs::write(&master, "Name,WhatsApp,Phone,Email,Website,City\n").unwrap();

        let manager = BackupManager::new(tmp.path().join("backups"));
        let backup = manager.backup(&master).unwrap();

        let name = backup.path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("master_backup_"));
        assert!(name.ends_with(".csv"));
        assert_eq!(
            fs::read(&master).unwrap(),
            fs::read(&backup.path).unwrap()
        );
    }

    #[test]
    fn repeated_backups_never_overwrite() {
        let tmp = TempDir::new().unwrap();
        let master = tmp.path().join("master.csv");
        fs::write(&master, "Name,WhatsApp,Phone,Email,Website,City\n").unwrap();

        let manager = BackupManager::new(tmp.path().join("backups"));
        let first = manager.backup(&master).unwrap();
        let second = manager.backup(&master).unwrap();
        assert_ne!(first.path, second.path);
        assert!(first.path.exists());
        assert!(second.path.exists());
    }

    #[test]
    fn missing_source_fails_loudly() {
        let tmp = TempDir::new().unwrap();
        let manager = BackupManager::new(tmp.path().join("backups"));
        let result = manager.backup(&tmp.path().join("missing.csv"));
        assert!(matches!(result, Err(Error::Backup(_))));
    }
}
