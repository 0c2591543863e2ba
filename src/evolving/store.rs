//! Binary file holding the evaluation table.
//!
//! Layout: 33-byte header, 4-byte version (all zero), then the table bytes.
//! Unreadable or foreign files are never overwritten: they are renamed to the first
//! free `<path>.<n>.unsupported-file-backup` and a neutral table takes their place.

use super::{EvaluationTable, TABLE_SIZE};
use crate::error::StoreError;
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const FILE_HEADER: &[u8; 33] = b"\xFFReminimalism.Reversi.EvolvingAI\xFF";
pub const FILE_VERSION: [u8; 4] = [0, 0, 0, 0];

const PAYLOAD_OFFSET: usize = FILE_HEADER.len() + FILE_VERSION.len();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupKind {
    /// The file could not be used.
    Unsupported,
    /// Administrative reset.
    Reset,
}

impl BackupKind {
    fn suffix(self) -> &'static str {
        match self {
            BackupKind::Unsupported => "unsupported-file-backup",
            BackupKind::Reset => "backup",
        }
    }
}

enum Contents {
    Table(EvaluationTable),
    Unsupported(&'static str),
}

fn parse(bytes: Vec<u8>) -> Contents {
    if bytes.len() < PAYLOAD_OFFSET || &bytes[..FILE_HEADER.len()] != FILE_HEADER {
        return Contents::Unsupported("bad header");
    }
    if bytes[FILE_HEADER.len()..PAYLOAD_OFFSET] != FILE_VERSION {
        return Contents::Unsupported("unknown version");
    }
    let payload = &bytes[PAYLOAD_OFFSET..];
    if payload.len() < TABLE_SIZE {
        return Contents::Unsupported("truncated table");
    }
    if payload.len() > TABLE_SIZE {
        warn!(extra = payload.len() - TABLE_SIZE, "ignoring trailing bytes after table");
    }
    match EvaluationTable::from_bytes(payload[..TABLE_SIZE].to_vec()) {
        Ok(table) => Contents::Table(table),
        Err(_) => Contents::Unsupported("truncated table"),
    }
}

/// Reads the table at `path`, creating a neutral one if the file is missing and
/// replacing it (after a backup) if it is unusable.
pub fn load(path: &Path) -> Result<EvaluationTable, StoreError> {
    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!(path = %path.display(), "no table file, starting fresh");
            let table = EvaluationTable::new();
            save(path, &table)?;
            return Ok(table);
        }
        Err(e) => return Err(StoreError::io(path, e)),
    };

    if meta.is_dir() {
        return recover(path, "path is a directory");
    }

    let bytes = fs::read(path).map_err(|e| StoreError::io(path, e))?;
    match parse(bytes) {
        Contents::Table(table) => {
            info!(path = %path.display(), "loaded table");
            Ok(table)
        }
        Contents::Unsupported(reason) => recover(path, reason),
    }
}

fn recover(path: &Path, reason: &str) -> Result<EvaluationTable, StoreError> {
    let backup = rename_to_backup(path, BackupKind::Unsupported)?;
    warn!(
        path = %path.display(),
        backup = %backup.display(),
        reason,
        "unsupported table file moved aside"
    );
    let table = EvaluationTable::new();
    save(path, &table)?;
    Ok(table)
}

/// Writes header, version and table to `<path>.tmp`, then renames it over `path`.
pub fn save(path: &Path, table: &EvaluationTable) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }

    let mut buf = Vec::with_capacity(PAYLOAD_OFFSET + TABLE_SIZE);
    buf.extend_from_slice(FILE_HEADER);
    buf.extend_from_slice(&FILE_VERSION);
    buf.extend_from_slice(table.as_bytes());

    let tmp = with_suffix(path, ".tmp");
    fs::write(&tmp, &buf).map_err(|e| StoreError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| StoreError::io(path, e))?;
    Ok(())
}

/// Moves the current file aside as `<path>.<n>.backup` and writes a neutral table.
pub fn reset(path: &Path) -> Result<EvaluationTable, StoreError> {
    if fs::symlink_metadata(path).is_ok() {
        let backup = rename_to_backup(path, BackupKind::Reset)?;
        info!(path = %path.display(), backup = %backup.display(), "table reset");
    }
    let table = EvaluationTable::new();
    save(path, &table)?;
    Ok(table)
}

/// Renames `path` to the first free `<path>.<n>.<suffix>`, n counting from 0.
pub fn rename_to_backup(path: &Path, kind: BackupKind) -> Result<PathBuf, StoreError> {
    let mut n = 0u32;
    let backup = loop {
        let candidate = with_suffix(path, &format!(".{n}.{}", kind.suffix()));
        if fs::symlink_metadata(&candidate).is_err() {
            break candidate;
        }
        n += 1;
    };
    fs::rename(path, &backup).map_err(|e| StoreError::io(path, e))?;
    Ok(backup)
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn scratch(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let dir = std::env::temp_dir().join(format!(
            "reversi-store-{name}-{}-{nanos}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_header_layout() {
        assert_eq!(FILE_HEADER.len(), 33);
        assert_eq!(FILE_HEADER[0], 0xFF);
        assert_eq!(FILE_HEADER[32], 0xFF);
        assert_eq!(&FILE_HEADER[1..32], b"Reminimalism.Reversi.EvolvingAI");
    }

    #[test]
    fn test_missing_file_is_created() {
        let dir = scratch("missing");
        let path = dir.join("nested").join("table.dat");
        let table = load(&path).unwrap();
        assert_eq!(table, EvaluationTable::new());
        let bytes = fs::read(&path).unwrap();
        assert_eq!(bytes.len(), PAYLOAD_OFFSET + TABLE_SIZE);
        assert!(!with_suffix(&path, ".tmp").exists());
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_save_then_load() {
        let dir = scratch("roundtrip");
        let path = dir.join("table.dat");
        let mut table = EvaluationTable::new();
        table.set(0, 0);
        table.set(TABLE_SIZE - 1, 255);
        save(&path, &table).unwrap();
        assert_eq!(load(&path).unwrap(), table);
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_bad_header_is_backed_up() {
        let dir = scratch("header");
        let path = dir.join("table.dat");
        fs::write(&path, b"not a table").unwrap();
        let table = load(&path).unwrap();
        assert_eq!(table, EvaluationTable::new());

        let backup = dir.join("table.dat.0.unsupported-file-backup");
        assert_eq!(fs::read(&backup).unwrap(), b"not a table");

        // A second bad file takes the next free slot.
        fs::write(&path, b"still not a table").unwrap();
        load(&path).unwrap();
        assert!(dir.join("table.dat.1.unsupported-file-backup").exists());
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_unknown_version_is_backed_up() {
        let dir = scratch("version");
        let path = dir.join("table.dat");
        let mut bytes = FILE_HEADER.to_vec();
        bytes.extend_from_slice(&[1, 0, 0, 0]);
        bytes.extend(std::iter::repeat_n(7u8, TABLE_SIZE));
        fs::write(&path, &bytes).unwrap();
        assert_eq!(load(&path).unwrap(), EvaluationTable::new());
        assert!(dir.join("table.dat.0.unsupported-file-backup").exists());
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_truncated_table_is_backed_up() {
        let dir = scratch("short");
        let path = dir.join("table.dat");
        let mut bytes = FILE_HEADER.to_vec();
        bytes.extend_from_slice(&FILE_VERSION);
        bytes.extend_from_slice(&[9; 100]);
        fs::write(&path, &bytes).unwrap();
        assert_eq!(load(&path).unwrap(), EvaluationTable::new());
        assert!(dir.join("table.dat.0.unsupported-file-backup").exists());
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_reset_names_backup() {
        let dir = scratch("reset");
        let path = dir.join("table.dat");
        let mut table = EvaluationTable::new();
        table.set(3, 200);
        save(&path, &table).unwrap();

        let fresh = reset(&path).unwrap();
        assert_eq!(fresh, EvaluationTable::new());
        let backup = dir.join("table.dat.0.backup");
        assert_eq!(load(&backup).unwrap(), table);
        assert_eq!(load(&path).unwrap(), EvaluationTable::new());
        fs::remove_dir_all(dir).unwrap();
    }
}
