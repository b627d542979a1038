/// Directory inside a record directory that holds stored attachments.
pub const FILES_FOLDER_NAME: &str = "files";

/// Largest accepted profile image (1000 KiB).
pub const MAX_PROFILE_IMAGE_BYTES: u64 = 1000 * 1024;

/// Largest accepted DICOM upload (50 MiB).
pub const MAX_DICOM_BYTES: u64 = 50 * 1024 * 1024;

/// Media types accepted for profile images.
pub const PROFILE_IMAGE_MEDIA_TYPES: &[&str] = &["image/png", "image/jpeg"];

/// Media type recorded for files carrying the DICOM part 10 marker.
pub const DICOM_MEDIA_TYPE: &str = "application/dicom";
