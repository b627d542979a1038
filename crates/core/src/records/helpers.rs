//! Filesystem helpers shared by the record types.

use crate::{RecordError, RecordResult};
use homecare_uuid::RecordId;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::{
    fs,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};

/// Creates a unique sharded directory within `base_dir`.
///
/// Identifiers come from `id_source`. A collision with an existing directory is retried up to
/// five times with a fresh identifier.
///
/// # Errors
///
/// Returns [`RecordError::RecordDirCreation`] if directory creation fails or no free
/// identifier was found after five attempts.
pub(crate) fn create_unique_sharded_dir(
    base_dir: &Path,
    mut id_source: impl FnMut() -> RecordId,
) -> RecordResult<(RecordId, PathBuf)> {
    for _attempt in 0..5 {
        let id = id_source();
        let candidate = id.sharded_dir(base_dir);

        if candidate.exists() {
            continue;
        }

        if let Some(parent) = candidate.parent() {
            fs::create_dir_all(parent).map_err(RecordError::RecordDirCreation)?;
        }

        match fs::create_dir(&candidate) {
            Ok(()) => return Ok((id, candidate)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(RecordError::RecordDirCreation(e)),
        }
    }

    Err(RecordError::RecordDirCreation(io::Error::new(
        ErrorKind::AlreadyExists,
        "failed to allocate a unique record directory after 5 attempts",
    )))
}

/// Removes a freshly created record directory after a failed write, keeping both errors if the
/// cleanup itself fails.
pub(crate) fn cleanup_after_failed_create(dir: &Path, create_error: RecordError) -> RecordError {
    match fs::remove_dir_all(dir) {
        Ok(()) => create_error,
        Err(cleanup_error) => RecordError::CleanupAfterCreateFailed {
            path: dir.to_path_buf(),
            create_error: Box::new(create_error),
            cleanup_error,
        },
    }
}

/// Serialises `value` to YAML and writes it via a temporary file plus rename, so readers never
/// observe a half-written record.
pub(crate) fn write_yaml<T: Serialize>(path: &Path, value: &T) -> RecordResult<()> {
    let yaml = serde_yaml::to_string(value).map_err(RecordError::YamlSerialization)?;
    let tmp = path.with_extension("yaml.tmp");
    fs::write(&tmp, yaml).map_err(RecordError::FileWrite)?;
    fs::rename(&tmp, path).map_err(RecordError::FileWrite)
}

pub(crate) fn read_yaml<T: DeserializeOwned>(path: &Path) -> RecordResult<T> {
    let contents = fs::read_to_string(path).map_err(RecordError::FileRead)?;
    serde_yaml::from_str(&contents).map_err(RecordError::YamlDeserialization)
}

/// Reads every `<base_dir>/<s1>/<s2>/<id>/<filename>` record.
///
/// A missing `base_dir` yields an empty list. Files that cannot be read or parsed are logged
/// and skipped so one damaged record does not hide the rest.
pub(crate) fn read_sharded_records<T: DeserializeOwned>(
    base_dir: &Path,
    filename: &str,
) -> RecordResult<Vec<T>> {
    let mut records = Vec::new();

    let s1_iter = match fs::read_dir(base_dir) {
        Ok(it) => it,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(records),
        Err(e) => return Err(RecordError::FileRead(e)),
    };

    for s1 in s1_iter.flatten() {
        let s1_path = s1.path();
        if !s1_path.is_dir() {
            continue;
        }

        let s2_iter = match fs::read_dir(&s1_path) {
            Ok(it) => it,
            Err(_) => continue,
        };

        for s2 in s2_iter.flatten() {
            let s2_path = s2.path();
            if !s2_path.is_dir() {
                continue;
            }

            let id_iter = match fs::read_dir(&s2_path) {
                Ok(it) => it,
                Err(_) => continue,
            };

            for id_ent in id_iter.flatten() {
                let record_path = id_ent.path().join(filename);
                if !record_path.is_file() {
                    continue;
                }

                match read_yaml::<T>(&record_path) {
                    Ok(record) => records.push(record),
                    Err(e) => {
                        tracing::warn!(
                            "failed to read {}: {} - {}",
                            filename,
                            record_path.display(),
                            e
                        );
                    }
                }
            }
        }
    }

    Ok(records)
}
