//! Deterministic identifier synthesis for export plans.
//!
//! The same logical (patient, study, series) triple must synthesise to the
//! same identifier on every export run, on every platform, so repeated
//! exports of the same scene land in the same DICOM patient/study/series.
//! That is achieved by hashing *stable semantic strings* (display names),
//! never volatile internal ids.

use sha1::{Digest, Sha1};

use crate::config::HASH_MODULUS;

/// Hash an arbitrary string into a short decimal identifier.
///
/// SHA-1 of the UTF-8 bytes, hex digest read as a base-16 integer, reduced
/// modulo [`HASH_MODULUS`]. Deterministic across runs and platforms.
///
/// Known weakness: the reduced range is only ~30 bits, so collisions are
/// possible (birthday bound reaches ~1% around 4500 distinct inputs). No
/// runtime collision guard exists; see the property tests for the
/// guarantees that *are* held.
///
/// # Examples
/// ```
/// use scenetree_exporter::ids::hash_id;
///
/// assert_eq!(hash_id("case01"), "592885353");
/// assert_eq!(hash_id("case01"), hash_id("case01"));
/// ```
#[must_use]
pub fn hash_id(input: &str) -> String {
    let digest = Sha1::digest(input.as_bytes());
    let hex_string = hex::encode(digest);

    // Reduce the 160-bit digest digit by digit; the accumulator stays below
    // 16 * HASH_MODULUS, which fits comfortably in a u64.
    let mut acc: u64 = 0;
    for c in hex_string.bytes() {
        let digit = u64::from(match c {
            b'0'..=b'9' => c - b'0',
            _ => c - b'a' + 10,
        });
        acc = (acc * 16 + digit) % HASH_MODULUS;
    }

    acc.to_string()
}

/// Return a source label unchanged.
///
/// This is the non-de-identified path: a policy switch, not a security
/// boundary. Privacy of the label is the caller's responsibility.
#[must_use]
pub fn passthrough_id(source_label: &str) -> String {
    source_label.to_string()
}

/// How patient-identifying strings are synthesised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdPolicy {
    /// Hash the subject name into a synthetic id.
    Deidentify,
    /// Keep the source scene's own label (e.g. its file name without
    /// extension) as the patient id.
    Passthrough {
        /// Label taken from the scene source; when empty the subject node's
        /// display name is used instead.
        source_label: String,
    },
}

impl IdPolicy {
    /// Synthesise the patient id for a subject.
    #[must_use]
    pub fn patient_id(&self, subject_name: &str) -> String {
        match self {
            Self::Deidentify => hash_id(subject_name),
            Self::Passthrough { source_label } => {
                if source_label.is_empty() {
                    passthrough_id(subject_name)
                } else {
                    passthrough_id(source_label)
                }
            }
        }
    }
}

/// Study instance UID for a study folder within a subject.
///
/// Always hashed, regardless of the patient-id policy: study grouping must
/// stay stable across export runs even for non-de-identified exports.
#[must_use]
pub fn study_instance_uid(study_name: &str, subject_name: &str) -> String {
    hash_id(&format!("{study_name}{subject_name}"))
}

/// Series instance UID: the study UID with the series counter appended.
///
/// The plain string concatenation is deliberate; it guarantees per-series
/// uniqueness within one study without further hashing, and existing
/// archives were written with exactly this suffixing convention.
#[must_use]
pub fn series_instance_uid(study_uid: &str, series_number: u32) -> String {
    format!("{study_uid}{series_number}")
}

/// Frame-of-reference UID: the study UID with the series counter appended
/// twice, keeping it distinct from the series UID of the same series.
#[must_use]
pub fn frame_of_reference_uid(study_uid: &str, series_number: u32) -> String {
    format!("{study_uid}{series_number}{series_number}")
}
