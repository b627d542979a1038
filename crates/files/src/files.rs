//! Record-scoped attachment storage.
//!
//! [`AttachmentStore`] stores uploaded bytes for a single patient record. Files are written
//! once under their SHA-256 digest and never modified; the YAML record keeps the returned
//! [`FileMetadata`] as its reference.
//!
//! # Storage Layout
//!
//! ```text
//! <record_dir>/files/sha256/<h[0..2]>/<h[2..4]>/<h>
//! ```
//!
//! # Validation
//!
//! Each upload is checked against the rules for its [`AttachmentKind`] before anything is
//! written:
//!
//! - profile images must be PNG or JPEG (detected from content, not the filename) and at
//!   most [`MAX_PROFILE_IMAGE_BYTES`]
//! - DICOM files must be at most [`MAX_DICOM_BYTES`]; a missing `DICM` marker is logged but
//!   accepted

use crate::constants::{
    DICOM_MEDIA_TYPE, FILES_FOLDER_NAME, MAX_DICOM_BYTES, MAX_PROFILE_IMAGE_BYTES,
    PROFILE_IMAGE_MEDIA_TYPES,
};
use crate::FilesError;
use chrono::{DateTime, Utc};
use homecare_types::NonEmptyText;
use homecare_uuid::{RecordId, Sha256Hash};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Offset of the `DICM` marker in a DICOM part 10 file (after the 128-byte preamble).
const DICOM_MARKER_OFFSET: usize = 128;
const DICOM_MARKER: &[u8; 4] = b"DICM";

/// What an uploaded file is for. Determines validation rules and size limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    /// A patient's profile photo.
    ProfileImage,
    /// A DICOM imaging file.
    Dicom,
}

impl AttachmentKind {
    pub fn max_bytes(self) -> u64 {
        match self {
            AttachmentKind::ProfileImage => MAX_PROFILE_IMAGE_BYTES,
            AttachmentKind::Dicom => MAX_DICOM_BYTES,
        }
    }
}

impl fmt::Display for AttachmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttachmentKind::ProfileImage => f.write_str("profile image"),
            AttachmentKind::Dicom => f.write_str("DICOM file"),
        }
    }
}

/// Metadata for a stored file
///
/// Serialised into the owning record's YAML. It carries no patient identifiers of its own.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct FileMetadata {
    /// Hashing algorithm used (always "sha256")
    pub hash_algorithm: NonEmptyText,

    /// Hexadecimal digest of the file content
    pub hash: Sha256Hash,

    /// Path relative to the record directory where the file is stored
    pub relative_path: NonEmptyText,

    pub size_bytes: u64,

    /// Detected media type, best-effort
    pub media_type: Option<NonEmptyText>,

    /// Filename supplied with the upload
    pub original_filename: NonEmptyText,

    pub kind: AttachmentKind,

    pub stored_at: DateTime<Utc>,
}

/// Attachment storage bound to one record directory.
///
/// Construction validates that the record exists; nothing is created until the first
/// upload.
#[derive(Debug)]
pub struct AttachmentStore {
    /// Canonicalised directory containing all records of this type
    root_directory: PathBuf,

    record_id: RecordId,
}

impl AttachmentStore {
    /// Creates a store for the record `record_id` under `root_directory`.
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if:
    /// - the root directory does not exist or is not a directory
    /// - the record directory does not exist or is not a directory
    pub fn new(root_directory: &Path, record_id: RecordId) -> Result<Self, FilesError> {
        if !root_directory.is_dir() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Directory does not exist: {}",
                root_directory.display()
            )));
        }

        let root_directory = root_directory.canonicalize().map_err(|e| {
            FilesError::InvalidRootDirectory(format!(
                "Cannot canonicalize path {}: {}",
                root_directory.display(),
                e
            ))
        })?;

        let record_root = record_id.sharded_dir(&root_directory);
        if !record_root.is_dir() {
            return Err(FilesError::RecordNotFound(format!(
                "Record directory does not exist: {}",
                record_root.display()
            )));
        }

        Ok(Self {
            root_directory,
            record_id,
        })
    }

    /// Validates and stores an uploaded file.
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if:
    /// - the upload is empty or over the size limit for `kind`
    /// - a profile image is not PNG or JPEG
    /// - the same content is already stored for this record
    /// - directory creation or the write fails
    pub fn add_bytes(
        &self,
        kind: AttachmentKind,
        original_filename: &str,
        bytes: &[u8],
    ) -> Result<FileMetadata, FilesError> {
        let media_type = validate_upload(kind, original_filename, bytes)?;

        let digest: [u8; 32] = Sha256::digest(bytes).into();
        let hash = Sha256Hash::from_bytes(&digest);

        let storage_path = self.compute_storage_path(&hash);
        if storage_path.exists() {
            return Err(FilesError::FileAlreadyExists(hash.to_string()));
        }

        if let Some(parent) = storage_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                FilesError::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create storage directory {}: {}",
                        parent.display(),
                        e
                    ),
                ))
            })?;
        }

        fs::write(&storage_path, bytes).map_err(|e| {
            FilesError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write file to {}: {}", storage_path.display(), e),
            ))
        })?;

        tracing::debug!(
            record = %self.record_id,
            %hash,
            size = bytes.len(),
            "stored {}",
            kind
        );

        let original_filename = NonEmptyText::new(original_filename)
            .or_else(|_| NonEmptyText::new("unknown"))
            .expect("fallback filename is non-empty");

        Ok(FileMetadata {
            hash_algorithm: NonEmptyText::new("sha256").expect("sha256 is non-empty"),
            relative_path: self.compute_relative_path(&hash),
            hash,
            size_bytes: bytes.len() as u64,
            media_type: media_type.and_then(|m| NonEmptyText::new(m).ok()),
            original_filename,
            kind,
            stored_at: Utc::now(),
        })
    }

    /// Returns the bytes stored under `hash`.
    pub fn read(&self, hash: &Sha256Hash) -> Result<Vec<u8>, FilesError> {
        let storage_path = self.compute_storage_path(hash);
        if !storage_path.is_file() {
            return Err(FilesError::FileNotFound(hash.to_string()));
        }

        fs::read(&storage_path).map_err(|e| {
            FilesError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read file from {}: {}", storage_path.display(), e),
            ))
        })
    }

    pub fn record_id(&self) -> &RecordId {
        &self.record_id
    }

    fn compute_storage_path(&self, hash: &Sha256Hash) -> PathBuf {
        self.record_root()
            .join(self.compute_relative_path(hash).as_str())
    }

    /// `files/sha256/<h[0..2]>/<h[2..4]>/<h>`
    fn compute_relative_path(&self, hash: &Sha256Hash) -> NonEmptyText {
        let hex = hash.as_str();
        NonEmptyText::new(format!(
            "{}/sha256/{}/{}/{}",
            FILES_FOLDER_NAME,
            &hex[0..2],
            &hex[2..4],
            hex
        ))
        .expect("computed path is non-empty")
    }

    fn record_root(&self) -> PathBuf {
        self.record_id.sharded_dir(&self.root_directory)
    }
}

/// Checks an upload against the rules for `kind`, returning the detected media type.
fn validate_upload(
    kind: AttachmentKind,
    original_filename: &str,
    bytes: &[u8],
) -> Result<Option<&'static str>, FilesError> {
    if bytes.is_empty() {
        return Err(FilesError::EmptyUpload);
    }

    let size_bytes = bytes.len() as u64;
    if size_bytes > kind.max_bytes() {
        return Err(FilesError::TooLarge {
            kind,
            size_bytes,
            limit_bytes: kind.max_bytes(),
        });
    }

    let detected = infer::get(bytes).map(|t| t.mime_type());

    match kind {
        AttachmentKind::ProfileImage => match detected {
            Some(mime) if PROFILE_IMAGE_MEDIA_TYPES.contains(&mime) => Ok(Some(mime)),
            other => Err(FilesError::UnsupportedMediaType {
                kind,
                detected: other.unwrap_or("unknown").to_owned(),
            }),
        },
        AttachmentKind::Dicom => {
            if has_dicom_marker(bytes) {
                Ok(Some(DICOM_MEDIA_TYPE))
            } else {
                tracing::warn!(
                    filename = original_filename,
                    detected = detected.unwrap_or("unknown"),
                    "DICOM upload has no DICM marker, storing anyway"
                );
                Ok(detected)
            }
        }
    }
}

fn has_dicom_marker(bytes: &[u8]) -> bool {
    bytes
        .get(DICOM_MARKER_OFFSET..DICOM_MARKER_OFFSET + DICOM_MARKER.len())
        .is_some_and(|m| m == DICOM_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PNG_HEADER: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    const JPEG_HEADER: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xE0];

    fn create_record(root: &Path, id: &RecordId) -> PathBuf {
        let dir = id.sharded_dir(root);
        fs::create_dir_all(&dir).expect("Failed to create record directory");
        fs::write(dir.join("patient.yaml"), "name: test\n").expect("Failed to write record");
        dir
    }

    fn setup() -> (TempDir, AttachmentStore) {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("patients");
        fs::create_dir_all(&root).unwrap();
        let id = RecordId::new();
        create_record(&root, &id);
        let store = AttachmentStore::new(&root, id).unwrap();
        (temp, store)
    }

    fn dicom_bytes(payload: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0u8; DICOM_MARKER_OFFSET];
        bytes.extend_from_slice(DICOM_MARKER);
        bytes.extend_from_slice(payload);
        bytes
    }

    #[test]
    fn test_new_rejects_missing_root() {
        let temp = TempDir::new().unwrap();
        let result = AttachmentStore::new(&temp.path().join("missing"), RecordId::new());
        assert!(matches!(result, Err(FilesError::InvalidRootDirectory(_))));
    }

    #[test]
    fn test_new_rejects_root_that_is_a_file() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("file.txt");
        fs::write(&root, "not a directory").unwrap();
        let result = AttachmentStore::new(&root, RecordId::new());
        assert!(matches!(result, Err(FilesError::InvalidRootDirectory(_))));
    }

    #[test]
    fn test_new_rejects_unknown_record() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("patients");
        fs::create_dir_all(&root).unwrap();
        let result = AttachmentStore::new(&root, RecordId::new());
        assert!(matches!(result, Err(FilesError::RecordNotFound(_))));
    }

    #[test]
    fn test_add_png_profile_image() {
        let (_temp, store) = setup();
        let mut bytes = PNG_HEADER.to_vec();
        bytes.extend_from_slice(&[0u8; 64]);

        let meta = store
            .add_bytes(AttachmentKind::ProfileImage, "me.png", &bytes)
            .unwrap();

        assert_eq!(meta.hash_algorithm.as_str(), "sha256");
        assert_eq!(meta.size_bytes, 72);
        assert_eq!(meta.kind, AttachmentKind::ProfileImage);
        assert_eq!(meta.original_filename.as_str(), "me.png");
        assert_eq!(meta.media_type.as_ref().map(|m| m.as_str()), Some("image/png"));
        assert!(meta
            .relative_path
            .as_str()
            .starts_with(&format!("files/sha256/{}/", &meta.hash.as_str()[0..2])));
        assert_eq!(store.read(&meta.hash).unwrap(), bytes);
    }

    #[test]
    fn test_add_jpeg_profile_image() {
        let (_temp, store) = setup();
        let mut bytes = JPEG_HEADER.to_vec();
        bytes.extend_from_slice(b"JFIF rest of image");

        let meta = store
            .add_bytes(AttachmentKind::ProfileImage, "me.jpg", &bytes)
            .unwrap();
        assert_eq!(meta.media_type.as_ref().map(|m| m.as_str()), Some("image/jpeg"));
    }

    #[test]
    fn test_profile_image_rejects_non_image_content() {
        let (_temp, store) = setup();
        let result = store.add_bytes(AttachmentKind::ProfileImage, "me.png", b"plain text");
        assert!(matches!(
            result,
            Err(FilesError::UnsupportedMediaType {
                kind: AttachmentKind::ProfileImage,
                ..
            })
        ));
    }

    #[test]
    fn test_profile_image_size_limit() {
        let (_temp, store) = setup();
        let mut bytes = PNG_HEADER.to_vec();
        bytes.resize(MAX_PROFILE_IMAGE_BYTES as usize + 1, 0);

        let result = store.add_bytes(AttachmentKind::ProfileImage, "big.png", &bytes);
        assert!(matches!(
            result,
            Err(FilesError::TooLarge { limit_bytes, .. }) if limit_bytes == MAX_PROFILE_IMAGE_BYTES
        ));
    }

    #[test]
    fn test_empty_upload_rejected() {
        let (_temp, store) = setup();
        let result = store.add_bytes(AttachmentKind::Dicom, "empty.dcm", &[]);
        assert!(matches!(result, Err(FilesError::EmptyUpload)));
    }

    #[test]
    fn test_add_dicom_with_marker() {
        let (_temp, store) = setup();
        let bytes = dicom_bytes(b"dataset");

        let meta = store.add_bytes(AttachmentKind::Dicom, "ct.dcm", &bytes).unwrap();
        assert_eq!(meta.kind, AttachmentKind::Dicom);
        assert_eq!(
            meta.media_type.as_ref().map(|m| m.as_str()),
            Some(DICOM_MEDIA_TYPE)
        );
    }

    #[test]
    fn test_add_dicom_without_marker_is_accepted() {
        let (_temp, store) = setup();
        let meta = store
            .add_bytes(AttachmentKind::Dicom, "raw.dcm", b"raw dataset bytes")
            .unwrap();
        assert_eq!(meta.size_bytes, 17);
        assert!(meta.media_type.is_none());
    }

    #[test]
    fn test_add_is_immutable() {
        let (_temp, store) = setup();
        let bytes = dicom_bytes(b"same");

        store.add_bytes(AttachmentKind::Dicom, "a.dcm", &bytes).unwrap();
        let second = store.add_bytes(AttachmentKind::Dicom, "b.dcm", &bytes);
        assert!(matches!(second, Err(FilesError::FileAlreadyExists(_))));
    }

    #[test]
    fn test_read_unknown_hash() {
        let (_temp, store) = setup();
        let hash = Sha256Hash::from_bytes(&[7u8; 32]);
        assert!(matches!(store.read(&hash), Err(FilesError::FileNotFound(_))));
    }

    #[test]
    fn test_records_are_isolated() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("patients");
        fs::create_dir_all(&root).unwrap();
        let (a, b) = (RecordId::new(), RecordId::new());
        create_record(&root, &a);
        create_record(&root, &b);

        let store_a = AttachmentStore::new(&root, a).unwrap();
        let store_b = AttachmentStore::new(&root, b).unwrap();

        let meta = store_a
            .add_bytes(AttachmentKind::Dicom, "a.dcm", &dicom_bytes(b"a"))
            .unwrap();
        assert_eq!(store_a.read(&meta.hash).unwrap(), dicom_bytes(b"a"));
        assert!(matches!(
            store_b.read(&meta.hash),
            Err(FilesError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_file_metadata_serialization() {
        let (_temp, store) = setup();
        let meta = store
            .add_bytes(AttachmentKind::Dicom, "ct.dcm", &dicom_bytes(b"x"))
            .unwrap();

        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains("\"kind\":\"dicom\""));
        assert!(json.contains(meta.hash.as_str()));

        let back: FileMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back, meta);
    }
}
