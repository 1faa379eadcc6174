//! Series numbering and semantic parent resolution.
//!
//! One BFS pass assigns 1-based series numbers per study folder, strictly in
//! visitation order; no re-sorting is ever applied, because the external
//! writers expect "first/second/third scan in this series" to mean insertion
//! order. Study and series UIDs are memoised on the nodes so a later
//! segmentation pass can reference its volume's series without recomputing.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::classify::{classify_node, NodeClass};
use crate::config::name_contains;
use crate::ids::{series_instance_uid, study_instance_uid};
use crate::tree::{HierarchyTree, NodeId};

/// A per-node planning problem, reported and skipped.
///
/// Planning never aborts on one bad node; failures are collected here and
/// surfaced to the caller alongside the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanFailure {
    /// Display name of the node that could not be planned.
    pub node: String,
    /// Human-readable reason.
    pub reason: String,
}

/// Assign series numbers to every exportable leaf, per study folder.
///
/// Volume and segmentation leaves get a counter starting at 1 within their
/// parent folder; transforms and landmarks are excluded. The returned map
/// preserves the order in which study folders were first encountered, and
/// each entry's list is in BFS order.
///
/// Study and series UIDs are memoised on the visited nodes as a side effect;
/// repeated passes over the same tree reuse the memoised values.
pub fn plan_series_numbers(tree: &mut HierarchyTree) -> IndexMap<String, Vec<(NodeId, u32)>> {
    let subject_name = tree.node(tree.root()).name().to_string();
    let mut counters: IndexMap<String, u32> = IndexMap::new();
    let mut assignments: IndexMap<String, Vec<(NodeId, u32)>> = IndexMap::new();

    for id in tree.bfs(tree.root()) {
        let class = classify_node(tree, id);
        if !matches!(class, NodeClass::Volume | NodeClass::Segmentation) {
            continue;
        }

        let Some(parent) = tree.node(id).parent() else {
            continue;
        };
        let study_name = tree.node(parent).name().to_string();

        let counter = counters.entry(study_name.clone()).or_insert(0);
        *counter += 1;
        let series_number = *counter;

        let study_uid = match tree.node(parent).study_uid() {
            Some(uid) => uid.to_string(),
            None => {
                let uid = study_instance_uid(&study_name, &subject_name);
                tree.set_study_uid(parent, uid.clone());
                uid
            }
        };
        if tree.node(id).study_uid().is_none() {
            tree.set_study_uid(id, study_uid.clone());
        }
        if tree.node(id).series_uid().is_none() {
            tree.set_series_uid(id, series_instance_uid(&study_uid, series_number));
        }

        debug!(
            node = tree.node(id).name(),
            study = %study_name,
            series_number,
            "assigned series number"
        );

        assignments
            .entry(study_name)
            .or_default()
            .push((id, series_number));
    }

    assignments
}

/// Find the reference volume of a segmentation.
///
/// Segmentations are not children of their reference volume in the tree;
/// the anatomical parent lives in the pre-operative imaging folder, where
/// the lesions were contoured. Preference chain: a pre-op volume whose name
/// shares the segmentation's "t2" marker, else a "t1" volume, else the
/// first pre-op child. `None` only when the pre-op folder is empty — the
/// caller must then skip the segmentation and report, never abort.
#[must_use]
pub fn resolve_segmentation_parent(
    tree: &HierarchyTree,
    segmentation_name: &str,
    pre_op_folder: NodeId,
) -> Option<NodeId> {
    let children: Vec<NodeId> = tree.node(pre_op_folder).children().collect();

    if name_contains(segmentation_name, "t2") {
        if let Some(id) = children
            .iter()
            .find(|id| name_contains(tree.node(**id).name(), "t2"))
        {
            return Some(*id);
        }
    }

    if let Some(id) = children
        .iter()
        .find(|id| name_contains(tree.node(**id).name(), "t1"))
    {
        return Some(*id);
    }

    children.first().copied()
}
