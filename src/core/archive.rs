//! ZIP archive assembly.
//!
//! Entries are named `<archive base name>/<relative name>`, where the base
//! name is the archive file name without its extension. Source files are
//! resolved relative to the output directory.
//!
//! The encrypted variant uses the legacy ZipCrypto scheme. It is readable by
//! common archive tools but much weaker than OpenPGP.

use std::fs::{self, File};
use std::io::{self, Cursor, Read, Seek, Write};
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Datelike, Local, Timelike};
use tracing::{debug, trace};
use zip::result::ZipError;
use zip::write::{FileOptions, SimpleFileOptions};
use zip::unstable::write::FileOptionsExt;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::core::types::EntryName;
use crate::core::writer::ensure_dir;
use crate::error::{ArchiveError, FileError, Result};

/// Write `files` (relative to `dir`) into `dir/zip_name`.
///
/// Entries are streamed to disk as they are added. If any source file cannot
/// be opened or copied the call fails and a partial archive may remain.
pub fn write_zip<S: AsRef<str>>(dir: impl AsRef<Path>, zip_name: &str, files: &[S]) -> Result<PathBuf> {
    let dir = dir.as_ref();
    ensure_dir(dir)?;

    let zip_path = dir.join(zip_name);
    debug!(path = %zip_path.display(), entries = files.len(), "writing zip");

    let file = File::create(&zip_path).map_err(|source| FileError::Write {
        path: zip_path.clone(),
        source,
    })?;
    let mut zip = ZipWriter::new(file);
    let base = archive_base(zip_name);

    for name in files {
        let name = name.as_ref();
        let source_path = dir.join(name);
        let source = open_source(&source_path)?;
        let options = entry_options(&source, &source_path)?;
        add_entry(&mut zip, &base, name, source, options)?;
    }

    zip.finish().map_err(|source| ArchiveError::Entry {
        name: zip_name.to_string(),
        source,
    })?;

    Ok(zip_path)
}

/// Write `files` into `dir/zip_name` with every entry encrypted by `password`.
///
/// The archive is built in memory and moved into place in one step, so a
/// failure never leaves a partial archive. All source files are opened before
/// anything is written.
pub fn write_encrypted_zip<S: AsRef<str>>(
    dir: impl AsRef<Path>,
    zip_name: &str,
    files: &[S],
    password: &str,
) -> Result<PathBuf> {
    let dir = dir.as_ref();
    ensure_dir(dir)?;

    let zip_path = dir.join(zip_name);
    debug!(path = %zip_path.display(), entries = files.len(), "writing encrypted zip");

    let mut sources = Vec::with_capacity(files.len());
    for name in files {
        let name = name.as_ref();
        let source_path = dir.join(name);
        let source = open_source(&source_path)?;
        let options = entry_options(&source, &source_path)?;
        sources.push((name, source, options));
    }

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let base = archive_base(zip_name);

    for (name, source, options) in sources {
        let options = options.with_deprecated_encryption(password.as_bytes());
        add_entry(&mut zip, &base, name, source, options)?;
    }

    let buffer = zip
        .finish()
        .map_err(|source| ArchiveError::Entry {
            name: zip_name.to_string(),
            source,
        })?
        .into_inner();

    let partial = dir.join(format!(".{}.partial", zip_name));
    write_synced(&partial, &buffer).map_err(|source| {
        let _ = fs::remove_file(&partial);
        FileError::Write {
            path: partial.clone(),
            source,
        }
    })?;
    replace_file(&partial, &zip_path).map_err(|source| FileError::Write {
        path: zip_path.clone(),
        source,
    })?;

    trace!(bytes = buffer.len(), "encrypted zip flushed");
    Ok(zip_path)
}

fn write_synced(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data)?;
    file.sync_all()
}

/// Move `from` over `to`, removing `to` first where rename cannot replace.
///
/// `from` is removed if the move fails.
fn replace_file(from: &Path, to: &Path) -> io::Result<()> {
    if fs::rename(from, to).is_err() {
        let _ = fs::remove_file(to);
        fs::rename(from, to).map_err(|err| {
            let _ = fs::remove_file(from);
            err
        })?;
    }
    Ok(())
}

/// Names of all entries in `archive`, in archive order.
pub fn list_entries(archive: impl AsRef<Path>) -> Result<Vec<EntryName>> {
    let archive = open_archive(archive.as_ref())?;
    Ok(archive.file_names().map(str::to_string).collect())
}

/// Extract the bytes of entry `name` from `archive`.
///
/// Encrypted entries need `password`. A wrong password fails either on the
/// password check or on the entry checksum; it never yields data.
pub fn read_entry(archive: impl AsRef<Path>, name: &str, password: Option<&str>) -> Result<Vec<u8>> {
    let mut archive = open_archive(archive.as_ref())?;

    let entry = match password {
        Some(password) => archive.by_name_decrypt(name, password.as_bytes()),
        None => archive.by_name(name),
    };
    let mut entry = entry.map_err(|err| match err {
        ZipError::FileNotFound => ArchiveError::NotFound(name.to_string()),
        ZipError::InvalidPassword => ArchiveError::WrongPassword(name.to_string()),
        source => ArchiveError::Entry {
            name: name.to_string(),
            source,
        },
    })?;

    let mut data = Vec::new();
    entry
        .read_to_end(&mut data)
        .map_err(|source| match password {
            Some(_) => ArchiveError::WrongPassword(name.to_string()),
            None => ArchiveError::Corrupted {
                name: name.to_string(),
                source,
            },
        })?;

    Ok(data)
}

fn open_archive(path: &Path) -> Result<ZipArchive<File>> {
    let file = File::open(path).map_err(|source| FileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let archive = ZipArchive::new(file).map_err(|source| ArchiveError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(archive)
}

fn open_source(path: &Path) -> Result<File> {
    let file = File::open(path).map_err(|source| ArchiveError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(file)
}

/// Archive file name without its final extension.
fn archive_base(zip_name: &str) -> String {
    Path::new(zip_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| zip_name.to_string())
}

/// Full entry name for `name` inside the archive.
///
/// Rejects absolute paths and parent-directory components.
fn entry_name(base: &str, name: &str) -> Result<String> {
    let mut parts = Vec::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().to_string()),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(ArchiveError::InvalidName {
                    name: name.to_string(),
                    reason: "contains '..'",
                }
                .into())
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(ArchiveError::InvalidName {
                    name: name.to_string(),
                    reason: "must be relative",
                }
                .into())
            }
        }
    }

    if parts.is_empty() {
        return Err(ArchiveError::InvalidName {
            name: name.to_string(),
            reason: "empty",
        }
        .into());
    }

    Ok(format!("{}/{}", base, parts.join("/")))
}

/// Entry options carrying the source file's modification time and mode.
fn entry_options(file: &File, path: &Path) -> Result<SimpleFileOptions> {
    let metadata = file.metadata().map_err(|source| ArchiveError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    if let Some(modified) = metadata.modified().ok().and_then(zip_time) {
        options = options.last_modified_time(modified);
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        options = options.unix_permissions(metadata.permissions().mode() & 0o777);
    }

    Ok(options)
}

/// Convert a filesystem timestamp to ZIP's DOS time, if it is in range.
fn zip_time(time: std::time::SystemTime) -> Option<zip::DateTime> {
    let local: DateTime<Local> = time.into();
    let year = u16::try_from(local.year()).ok()?;
    zip::DateTime::from_date_and_time(
        year,
        local.month() as u8,
        local.day() as u8,
        local.hour() as u8,
        local.minute() as u8,
        local.second() as u8,
    )
    .ok()
}

fn add_entry<W, T>(
    zip: &mut ZipWriter<W>,
    base: &str,
    name: &str,
    mut source: File,
    options: FileOptions<'_, T>,
) -> Result<()>
where
    W: Write + Seek,
    T: zip::write::FileOptionExtension,
{
    let entry = entry_name(base, name)?;
    trace!(entry = %entry, "adding zip entry");

    zip.start_file(entry.as_str(), options)
        .map_err(|source| ArchiveError::Entry {
            name: entry.clone(),
            source,
        })?;
    io::copy(&mut source, zip).map_err(|source| ArchiveError::Entry {
        name: entry.clone(),
        source: ZipError::Io(source),
    })?;

    Ok(())
}
