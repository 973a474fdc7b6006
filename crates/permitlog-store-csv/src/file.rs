//! Blocking file primitives: tolerant reads and staged temp-then-rename
//! writes.

use std::{
  ffi::OsString,
  fs::{self, File, OpenOptions},
  io::{self, Read, Seek, SeekFrom, Write},
  path::{Path, PathBuf},
};

use serde::{Serialize, de::DeserializeOwned};

use crate::{Error, Result};

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> Error + '_ {
  move |source| Error::Io {
    path: path.to_path_buf(),
    source,
  }
}

fn csv_error(path: &Path) -> impl FnOnce(csv::Error) -> Error + '_ {
  move |source| Error::Csv {
    path: path.to_path_buf(),
    source,
  }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
  let mut name = OsString::from(path.as_os_str());
  name.push(suffix);
  PathBuf::from(name)
}

/// `<path>.tmp`, next to the target so the rename stays on one filesystem.
pub fn temp_path(path: &Path) -> PathBuf { sibling(path, ".tmp") }

/// `<path>.bak`, the previous version held while a staging set is published.
pub fn backup_path(path: &Path) -> PathBuf { sibling(path, ".bak") }

/// Read every row of `path`, decoding each with `decode`. A missing file
/// reads as no rows.
pub fn read_rows<T, U>(
  path: &Path,
  decode: impl Fn(T) -> permitlog_core::Result<U>,
) -> Result<Vec<U>>
where
  T: DeserializeOwned,
{
  let file = match File::open(path) {
    Ok(file) => file,
    Err(e) if e.kind() == io::ErrorKind::NotFound => {
      tracing::debug!(path = %path.display(), "file absent, reading as empty");
      return Ok(Vec::new());
    }
    Err(e) => return Err(io_error(path)(e)),
  };

  let mut reader = csv::Reader::from_reader(file);
  let headers = reader.headers().map_err(csv_error(path))?.clone();
  let mut record = csv::StringRecord::new();
  let mut rows = Vec::new();
  while reader.read_record(&mut record).map_err(csv_error(path))? {
    let line = record.position().map_or(0, |p| p.line());
    let row: T = record
      .deserialize(Some(&headers))
      .map_err(csv_error(path))?;
    let row = decode(row).map_err(|source| Error::InvalidRow {
      path: path.to_path_buf(),
      line,
      source,
    })?;
    rows.push(row);
  }
  Ok(rows)
}

fn finish(mut writer: csv::Writer<File>, path: &Path) -> Result<()> {
  writer.flush().map_err(io_error(path))?;
  let file = writer
    .into_inner()
    .map_err(|e| io_error(path)(e.into_error()))?;
  file.sync_all().map_err(io_error(path))
}

fn write_records<T: Serialize>(
  writer: &mut csv::Writer<File>,
  path: &Path,
  rows: impl IntoIterator<Item = T>,
) -> Result<usize> {
  let mut written = 0;
  for row in rows {
    writer.serialize(row).map_err(csv_error(path))?;
    written += 1;
  }
  Ok(written)
}

fn ends_with_newline(file: &mut File) -> io::Result<bool> {
  let len = file.metadata()?.len();
  if len == 0 {
    return Ok(true);
  }
  file.seek(SeekFrom::Start(len - 1))?;
  let mut last = [0u8];
  file.read_exact(&mut last)?;
  Ok(last[0] == b'\n')
}

// ─── Staging ─────────────────────────────────────────────────────────────────

/// A set of files written to their temp paths and published together.
///
/// Nothing touches a target until [`Staging::publish`]. If publishing fails
/// partway, targets already swapped in are restored from their backups.
/// Unpublished temp files are removed on drop.
#[derive(Debug, Default)]
pub struct Staging {
  targets: Vec<PathBuf>,
}

impl Staging {
  pub fn new() -> Self { Self::default() }

  fn stage(&mut self, path: &Path, write: impl FnOnce(&Path) -> Result<()>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    self.targets.push(path.to_path_buf());
    write(&temp_path(path))
  }

  /// Stage `path` as `header` followed by `rows`.
  pub fn replace_rows<T: Serialize>(
    &mut self,
    path: &Path,
    header: &[&str],
    rows: impl IntoIterator<Item = T>,
  ) -> Result<usize> {
    let mut written = 0;
    self.stage(path, |tmp| {
      let file = File::create(tmp).map_err(io_error(tmp))?;
      let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
      writer.write_record(header).map_err(csv_error(tmp))?;
      written = write_records(&mut writer, tmp, rows)?;
      finish(writer, tmp)
    })?;
    Ok(written)
  }

  /// Stage `path` as its current content followed by `rows`. A missing or
  /// empty file starts with `header`.
  pub fn append_rows<T: Serialize>(
    &mut self,
    path: &Path,
    header: &[&str],
    rows: impl IntoIterator<Item = T>,
  ) -> Result<usize> {
    let mut written = 0;
    self.stage(path, |tmp| {
      match fs::copy(path, tmp) {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
          File::create(tmp).map_err(io_error(tmp))?;
        }
        Err(e) => return Err(io_error(path)(e)),
      }
      let mut file = OpenOptions::new()
        .read(true)
        .append(true)
        .open(tmp)
        .map_err(io_error(tmp))?;
      let empty = file.metadata().map_err(io_error(tmp))?.len() == 0;
      if !ends_with_newline(&mut file).map_err(io_error(tmp))? {
        file.write_all(b"\n").map_err(io_error(tmp))?;
      }

      let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
      if empty {
        writer.write_record(header).map_err(csv_error(tmp))?;
      }
      written = write_records(&mut writer, tmp, rows)?;
      finish(writer, tmp)
    })?;
    Ok(written)
  }

  /// Rename every staged file over its target, in staging order.
  pub fn publish(mut self) -> Result<()> {
    let targets = std::mem::take(&mut self.targets);
    let mut swapped: Vec<(&Path, Option<PathBuf>)> = Vec::with_capacity(targets.len());
    for target in &targets {
      match swap_in(target) {
        Ok(backup) => swapped.push((target.as_path(), backup)),
        Err(err) => {
          roll_back(swapped);
          for target in &targets {
            let _ = fs::remove_file(temp_path(target));
          }
          return Err(err);
        }
      }
    }
    for (_, backup) in swapped {
      if let Some(backup) = backup {
        let _ = fs::remove_file(backup);
      }
    }
    Ok(())
  }
}

impl Drop for Staging {
  fn drop(&mut self) {
    for target in &self.targets {
      let _ = fs::remove_file(temp_path(target));
    }
  }
}

/// Keep the current `target` as `<target>.bak` and rename the temp file over
/// it. Returns the backup, if there was a previous file.
fn swap_in(target: &Path) -> Result<Option<PathBuf>> {
  let backup = backup_path(target);
  let _ = fs::remove_file(&backup);
  let backup = match fs::hard_link(target, &backup) {
    Ok(()) => Some(backup),
    Err(e) if e.kind() == io::ErrorKind::NotFound => None,
    Err(_) => {
      fs::copy(target, &backup).map_err(io_error(target))?;
      Some(backup)
    }
  };
  if let Err(e) = fs::rename(temp_path(target), target) {
    if let Some(backup) = &backup {
      let _ = fs::remove_file(backup);
    }
    return Err(io_error(target)(e));
  }
  Ok(backup)
}

fn roll_back(swapped: Vec<(&Path, Option<PathBuf>)>) {
  for (target, backup) in swapped.into_iter().rev() {
    let restored = match backup {
      Some(backup) => fs::rename(&backup, target),
      None => fs::remove_file(target),
    };
    if let Err(error) = restored {
      tracing::error!(path = %target.display(), %error, "failed to restore previous file");
    }
  }
}
