//! DICOM export plan: one tag set per exportable series.
//!
//! The plan is consumed by an external DICOM writer; nothing here touches
//! pixel data. The referential-consistency invariant lives here: every
//! segmentation entry carries the memoised SeriesInstanceUID of its resolved
//! reference volume, so the written DICOM SEG points at the right series.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::warn;

use crate::classify::{classify_node, modality, Modality, NodeClass};
use crate::ids::{frame_of_reference_uid, IdPolicy};
use crate::planner::{plan_series_numbers, resolve_segmentation_parent, PlanFailure};
use crate::scene::BuiltScene;
use crate::tree::NodeId;

/// The tag set handed to the external DICOM writer for one series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DicomTagSet {
    pub patient_id: String,
    pub patient_name: String,
    pub study_description: String,
    pub study_instance_uid: String,
    pub series_instance_uid: String,
    pub frame_of_reference_uid: String,
    pub study_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modality: Option<Modality>,
    pub series_description: String,
    pub series_number: u32,
}

/// One exportable series of the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DicomSeriesEntry {
    /// Display name of the hierarchy node.
    pub name: String,
    /// Export category (volume or segmentation).
    pub class: NodeClass,
    /// Content reference handed to the external writer.
    pub content_ref: String,
    /// DICOM tags for the series.
    pub tags: DicomTagSet,
    /// Series UID of the reference volume; segmentations only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_series_uid: Option<String>,
}

/// A landmark set routed to a JSON sidecar file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LandmarkEntry {
    pub name: String,
    pub content_ref: String,
    /// Output path relative to the export root.
    pub output_path: String,
}

/// Complete DICOM export plan for one scene.
#[derive(Debug, Clone, Serialize)]
pub struct DicomPlan {
    pub subject: String,
    pub patient_id: String,
    /// Series grouped by study folder name, in encounter order.
    pub studies: IndexMap<String, Vec<DicomSeriesEntry>>,
    /// Landmark sets exported alongside the DICOM files.
    pub landmarks: Vec<LandmarkEntry>,
    /// Per-node problems; the plan is still usable for everything listed
    /// in `studies`.
    pub failures: Vec<PlanFailure>,
}

/// Build the DICOM plan for a built scene.
///
/// Per-node failures (unresolvable segmentation parents, missing pre-op
/// folder) are collected, logged and skipped; remaining nodes are planned.
pub fn build_dicom_plan(built: &mut BuiltScene, policy: &IdPolicy) -> DicomPlan {
    let subject = built.tree.node(built.tree.root()).name().to_string();
    let patient_id = policy.patient_id(&subject);

    let assignments = plan_series_numbers(&mut built.tree);

    let mut studies: IndexMap<String, Vec<DicomSeriesEntry>> = IndexMap::new();
    let mut landmarks = Vec::new();
    let mut failures = Vec::new();

    for (study_name, series) in assignments {
        for (id, series_number) in series {
            let class = classify_node(&built.tree, id);

            let reference_series_uid = match class {
                NodeClass::Segmentation => {
                    match segmentation_reference(built, id) {
                        Ok(uid) => Some(uid),
                        Err(reason) => {
                            warn!(
                                node = built.tree.node(id).name(),
                                %reason,
                                "skipping segmentation"
                            );
                            failures.push(PlanFailure {
                                node: built.tree.node(id).name().to_string(),
                                reason,
                            });
                            continue;
                        }
                    }
                }
                _ => None,
            };

            let node = built.tree.node(id);
            // both UIDs were memoised by plan_series_numbers
            let Some(study_uid) = node.study_uid() else {
                continue;
            };
            let Some(series_uid) = node.series_uid() else {
                continue;
            };

            let tags = DicomTagSet {
                patient_id: patient_id.clone(),
                patient_name: patient_id.clone(),
                study_description: study_name.clone(),
                study_instance_uid: study_uid.to_string(),
                series_instance_uid: series_uid.to_string(),
                frame_of_reference_uid: frame_of_reference_uid(study_uid, series_number),
                study_id: study_uid.to_string(),
                modality: modality(class, &study_name, node.name()),
                series_description: node.name().to_string(),
                series_number,
            };

            studies.entry(study_name.clone()).or_default().push(DicomSeriesEntry {
                name: node.name().to_string(),
                class,
                content_ref: node.external_ref().to_string(),
                tags,
                reference_series_uid,
            });
        }
    }

    for id in built.tree.bfs(built.tree.root()) {
        if classify_node(&built.tree, id) == NodeClass::Landmark {
            let node = built.tree.node(id);
            landmarks.push(LandmarkEntry {
                name: node.name().to_string(),
                content_ref: node.external_ref().to_string(),
                output_path: format!("{patient_id}/{}", crate::config::LANDMARKS_FILE_NAME),
            });
        }
    }

    DicomPlan {
        subject,
        patient_id,
        studies,
        landmarks,
        failures,
    }
}

/// Resolve the reference volume of a segmentation and return its memoised
/// series UID, or a failure reason.
fn segmentation_reference(built: &BuiltScene, id: NodeId) -> Result<String, String> {
    let name = built.tree.node(id).name();

    let Some(pre_op) = built.pre_op_folder else {
        return Err("no pre-operative imaging folder in scene".to_string());
    };

    let Some(parent) = resolve_segmentation_parent(&built.tree, name, pre_op) else {
        return Err("pre-operative imaging folder is empty".to_string());
    };

    built
        .tree
        .node(parent)
        .series_uid()
        .map(String::from)
        .ok_or_else(|| {
            format!(
                "reference volume '{}' has no series assigned",
                built.tree.node(parent).name()
            )
        })
}
