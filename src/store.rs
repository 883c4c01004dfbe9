//! Ledger persistence.
//!
//! The ledger is a single pretty-printed JSON document. Saves go through
//! a sibling temp file and a rename, so the file on disk is always either
//! the previous complete ledger or the new one, never a partial write.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use crate::model::Ledger;

/// Errors that can occur loading or saving the ledger.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, StoreError>;

/// Loads the ledger at `path`.
///
/// A missing file is an empty ledger, not an error: it is the first run.
/// A file that exists but does not parse is fatal.
pub fn load(path: &Path) -> Result<Ledger> {
    let json = match fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Ledger::default()),
        Err(e) => return Err(e.into()),
    };
    Ok(serde_json::from_str(&json)?)
}

/// Saves the full ledger to `path`, atomically.
///
/// The document is written to `<path>.tmp` and renamed into place. If
/// anything fails before the rename, the previous ledger is untouched
/// and the temp file is removed.
pub fn save(ledger: &Ledger, path: &Path) -> Result<()> {
    let mut json = serde_json::to_string_pretty(ledger)?;
    json.push('\n');

    let tmp = temp_path(path);
    let written = fs::write(&tmp, &json).and_then(|()| fs::rename(&tmp, path));
    if written.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    Ok(written?)
}

/// Sibling temp path: `db.json` saves through `db.json.tmp`.
fn temp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}
