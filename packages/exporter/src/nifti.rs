//! NIfTI export layout: a flat folder per study under the subject folder.
//!
//! The layout mirrors the hierarchy only one level deep:
//! `<patient_id>/<study folder>/<leaf>.nii`, plus a single
//! `<patient_id>/landmarks.json` for all fiducial sets. Transforms are
//! never exported.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::classify::{classify_node, NodeClass};
use crate::config::LANDMARKS_FILE_NAME;
use crate::error::Result;
use crate::ids::IdPolicy;
use crate::scene::BuiltScene;

/// One file of the NIfTI layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NiftiEntry {
    /// Display name of the hierarchy node.
    pub name: String,
    /// Export category (volume or segmentation).
    pub class: NodeClass,
    /// Content reference handed to the external writer.
    pub content_ref: String,
    /// Output path relative to the export root.
    pub output_path: PathBuf,
}

/// Complete NIfTI export plan for one scene.
#[derive(Debug, Clone, Serialize)]
pub struct NiftiPlan {
    pub subject: String,
    pub patient_id: String,
    /// Image files, in BFS order.
    pub entries: Vec<NiftiEntry>,
    /// Landmark sets merged into one sidecar file.
    pub landmark_refs: Vec<String>,
    /// Path of the landmark sidecar; present only when landmarks exist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub landmarks_path: Option<PathBuf>,
}

/// Build the NIfTI layout plan for a built scene.
#[must_use]
pub fn build_nifti_plan(built: &BuiltScene, policy: &IdPolicy) -> NiftiPlan {
    let tree = &built.tree;
    let subject = tree.node(tree.root()).name().to_string();
    let patient_id = policy.patient_id(&subject);

    let mut entries = Vec::new();
    let mut landmark_refs = Vec::new();

    for id in tree.bfs(tree.root()) {
        let node = tree.node(id);
        match classify_node(tree, id) {
            NodeClass::Volume | NodeClass::Segmentation => {
                let Some(parent) = node.parent() else {
                    continue;
                };
                let folder = tree.node(parent).name();
                entries.push(NiftiEntry {
                    name: node.name().to_string(),
                    class: classify_node(tree, id),
                    content_ref: node.external_ref().to_string(),
                    output_path: Path::new(&patient_id)
                        .join(folder)
                        .join(format!("{}.nii", node.name())),
                });
            }
            NodeClass::Landmark => {
                landmark_refs.push(node.external_ref().to_string());
            }
            NodeClass::Transform | NodeClass::Folder => {}
        }
    }

    let landmarks_path = if landmark_refs.is_empty() {
        None
    } else {
        Some(Path::new(&patient_id).join(LANDMARKS_FILE_NAME))
    };

    NiftiPlan {
        subject,
        patient_id,
        entries,
        landmark_refs,
        landmarks_path,
    }
}

impl NiftiPlan {
    /// Create every directory of the layout under `output_dir`.
    ///
    /// Existing directories are left alone, so re-exports into the same
    /// root overwrite files in place.
    pub fn create_output_layout(&self, output_dir: &Path) -> Result<()> {
        for entry in &self.entries {
            if let Some(parent) = entry.output_path.parent() {
                let dir = output_dir.join(parent);
                fs::create_dir_all(&dir)?;
                debug!(dir = %dir.display(), "prepared output directory");
            }
        }
        if self.landmarks_path.is_some() {
            fs::create_dir_all(output_dir.join(&self.patient_id))?;
        }
        Ok(())
    }
}
