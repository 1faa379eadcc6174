//! JSON manifest writer for export plans.
//!
//! Plans are written as a single JSON document with a generation timestamp,
//! so a host can inspect (or replay) exactly what was planned.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::dicom::DicomPlan;
use crate::error::Result;
use crate::nifti::NiftiPlan;

/// Envelope written around a plan.
#[derive(Debug, Serialize)]
struct Manifest<'a, T: Serialize> {
    generated: DateTime<Utc>,
    #[serde(flatten)]
    plan: &'a T,
}

/// Save a DICOM plan manifest under `output_dir`.
///
/// # Returns
/// Path to the saved file
pub fn save_dicom_manifest(plan: &DicomPlan, output_dir: &Path) -> Result<PathBuf> {
    save_manifest(plan, output_dir, &format!("{}_dicom.json", plan.patient_id))
}

/// Save a NIfTI plan manifest under `output_dir`.
///
/// # Returns
/// Path to the saved file
pub fn save_nifti_manifest(plan: &NiftiPlan, output_dir: &Path) -> Result<PathBuf> {
    save_manifest(plan, output_dir, &format!("{}_nifti.json", plan.patient_id))
}

/// Write a manifest atomically: temp file, sync, rename.
///
/// A crash mid-write never leaves a truncated manifest behind.
fn save_manifest<T: Serialize>(plan: &T, output_dir: &Path, file_name: &str) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)?;

    let output_file = output_dir.join(file_name);
    let temp_file = output_dir.join(format!(".{file_name}.tmp"));

    let manifest = Manifest {
        generated: Utc::now(),
        plan,
    };
    let content = serde_json::to_string_pretty(&manifest)?;

    {
        let mut file = File::create(&temp_file)?;
        file.write_all(content.as_bytes())?;
        file.write_all(b"\n")?;
        file.sync_all()?;
    }

    // On Windows, rename fails if the destination already exists
    #[cfg(target_os = "windows")]
    if output_file.exists() {
        fs::remove_file(&output_file)?;
    }

    fs::rename(&temp_file, &output_file)?;

    Ok(output_file)
}
