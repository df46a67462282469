//! Text and CSV file output.
//!
//! Every writer creates its output directory first (parents included) and
//! overwrites the target file. Existing files in the directory are left alone.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::constants::CSV_DELIMITER;
use crate::core::types::Record;
use crate::error::{FileError, Result};

/// Create `dir` and any missing parents.
pub(crate) fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|source| FileError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Write `content` to `dir/name`.
///
/// # Errors
///
/// Returns `FileError::CreateDir` or `FileError::Write` with the failing path.
pub fn write_txt(dir: impl AsRef<Path>, name: &str, content: &[u8]) -> Result<PathBuf> {
    let dir = dir.as_ref();
    ensure_dir(dir)?;

    let path = dir.join(name);
    debug!(path = %path.display(), len = content.len(), "writing text file");
    fs::write(&path, content).map_err(|source| FileError::Write {
        path: path.clone(),
        source,
    })?;

    Ok(path)
}

/// Write `rows` to `dir/name` as `|`-delimited records, one per line.
///
/// No header row is written. The writer is flushed before returning.
///
/// # Errors
///
/// Returns a `FileError` naming the path if the directory or file cannot be
/// created or a record cannot be written.
pub fn write_csv<R, F>(dir: impl AsRef<Path>, name: &str, rows: R) -> Result<PathBuf>
where
    R: IntoIterator,
    R::Item: IntoIterator<Item = F>,
    F: AsRef<[u8]>,
{
    let dir = dir.as_ref();
    ensure_dir(dir)?;

    let path = dir.join(name);
    let csv_err = |source| FileError::Csv {
        path: path.clone(),
        source,
    };

    let mut writer = csv::WriterBuilder::new()
        .delimiter(CSV_DELIMITER)
        .has_headers(false)
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_path(&path)
        .map_err(csv_err)?;

    let mut count = 0usize;
    for row in rows {
        writer.write_record(row).map_err(csv_err)?;
        count += 1;
    }
    writer.flush().map_err(|source| FileError::Write {
        path: path.clone(),
        source,
    })?;

    debug!(path = %path.display(), records = count, "wrote csv file");
    Ok(path)
}

/// Read a `|`-delimited file back into records.
///
/// Records may have differing field counts.
pub fn read_csv(path: impl AsRef<Path>) -> Result<Vec<Record>> {
    let path = path.as_ref();
    let csv_err = |source| FileError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(CSV_DELIMITER)
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(csv_err)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(rows)
}
