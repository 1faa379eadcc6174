//! Configuration constants and validation functions for the exporter.
//!
//! The folder-name markers below are the de facto wire format between this
//! tool and the naming discipline of the people assembling scenes. All
//! matching is case-insensitive substring containment.

use std::path::Path;

use crate::error::{ExportError, Result};

/// Prime modulus for hash-based identifiers (largest prime below 10^9 used
/// by the historical archives; changing it breaks id compatibility).
pub const HASH_MODULUS: u64 = 999_999_937;

/// Content-reference marker for segmentation objects.
pub const SEGMENTATION_REF_MARKER: &str = "segmentationnode";

/// Content-reference marker for landmark (fiducial markup) objects.
pub const LANDMARK_REF_MARKER: &str = "markupsfiducialnode";

/// Name marker for transform nodes (never exported).
pub const TRANSFORM_MARKER: &str = "transform";

/// Folder-name marker for landmark folders.
pub const LANDMARK_MARKER: &str = "landmark";

/// Folder-name marker for annotation folders (segmentations live here).
pub const ANNOTATION_MARKER: &str = "annotation";

/// File name used for exported landmark sets.
pub const LANDMARKS_FILE_NAME: &str = "landmarks.json";

/// Suffixes stripped from display names by the loading pass.
pub const LOAD_ARTIFACT_SUFFIXES: &[&str] = &[".nii.gz", ".nii", ".json"];

/// Case-insensitive substring containment, the matching primitive for all
/// folder-name conventions.
#[must_use]
pub fn name_contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// Check whether a folder name denotes pre-operative imaging
/// (contains both "pre" and "op").
///
/// # Examples
/// ```
/// use scenetree_exporter::config::is_pre_op_name;
///
/// assert!(is_pre_op_name("Pre-op MR"));
/// assert!(is_pre_op_name("PREOP imaging"));
/// assert!(!is_pre_op_name("Intra-op US"));
/// ```
#[must_use]
pub fn is_pre_op_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("pre") && lower.contains("op") && !lower.contains("intra")
}

/// Strip a single load artefact suffix (`.nii.gz`, `.nii`, `.json`) from a
/// display name.
///
/// # Examples
/// ```
/// use scenetree_exporter::config::clean_display_name;
///
/// assert_eq!(clean_display_name("tumor_t2.nii"), "tumor_t2");
/// assert_eq!(clean_display_name("landmarks.json"), "landmarks");
/// assert_eq!(clean_display_name("Ax T2"), "Ax T2");
/// ```
#[must_use]
pub fn clean_display_name(name: &str) -> String {
    for suffix in LOAD_ARTIFACT_SUFFIXES {
        if name.to_lowercase().ends_with(suffix) {
            return name[..name.len() - suffix.len()].to_string();
        }
    }
    name.to_string()
}

/// Validate that an output directory exists and is a directory.
pub fn validate_output_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(ExportError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Output directory does not exist: {}", path.display()),
        )));
    }
    if !path.is_dir() {
        return Err(ExportError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("Output path is not a directory: {}", path.display()),
        )));
    }
    Ok(())
}
