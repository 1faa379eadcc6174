//! Node classification by folder-name convention.
//!
//! There is no typed discriminator in the scene source; what a node *is*
//! follows from case-insensitive substring markers in its name, its parent's
//! name, and its content reference. The rules live in one table so the
//! heuristic can be audited in one place (and swapped for a stricter typed
//! scheme later). Classification is only as reliable as the naming
//! discipline of the scene's folder structure.

use serde::Serialize;

use crate::config::{
    name_contains, ANNOTATION_MARKER, LANDMARK_MARKER, LANDMARK_REF_MARKER,
    SEGMENTATION_REF_MARKER, TRANSFORM_MARKER,
};
use crate::tree::{HierarchyTree, NodeId};

/// Export category of a hierarchy node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeClass {
    /// Exportable image volume (the default for unmatched leaves).
    Volume,
    /// Lesion or structure segmentation.
    Segmentation,
    /// Fiducial landmark set.
    Landmark,
    /// Spatial transform; never exported.
    Transform,
    /// Grouping node with children; gives its name to the study.
    Folder,
}

impl NodeClass {
    /// Stable string form for manifests and statistics keys.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Volume => "volume",
            Self::Segmentation => "segmentation",
            Self::Landmark => "landmark",
            Self::Transform => "transform",
            Self::Folder => "folder",
        }
    }
}

/// Which string of a node a rule inspects.
#[derive(Debug, Clone, Copy)]
enum Subject {
    Name,
    ParentName,
    ExternalRef,
}

/// The classification table. First match wins; order encodes precedence
/// (landmark markers must fire before the annotation-folder rule, which
/// otherwise claims everything in an annotations folder as a segmentation).
const RULES: &[(Subject, &str, NodeClass)] = &[
    (Subject::ExternalRef, SEGMENTATION_REF_MARKER, NodeClass::Segmentation),
    (Subject::Name, SEGMENTATION_REF_MARKER, NodeClass::Segmentation),
    (Subject::ParentName, SEGMENTATION_REF_MARKER, NodeClass::Segmentation),
    (Subject::Name, TRANSFORM_MARKER, NodeClass::Transform),
    (Subject::ExternalRef, LANDMARK_REF_MARKER, NodeClass::Landmark),
    (Subject::Name, LANDMARK_MARKER, NodeClass::Landmark),
    (Subject::ParentName, LANDMARK_MARKER, NodeClass::Landmark),
    (Subject::ParentName, ANNOTATION_MARKER, NodeClass::Segmentation),
];

/// Classify a node from its raw strings.
///
/// Non-leaf nodes are always [`NodeClass::Folder`]. A leaf that matches no
/// rule is a [`NodeClass::Volume`]: ambiguity resolves to the most common
/// category by design, it is not silently dropped.
#[must_use]
pub fn classify(name: &str, parent_name: &str, external_ref: &str, is_leaf: bool) -> NodeClass {
    if !is_leaf {
        return NodeClass::Folder;
    }

    for (subject, marker, class) in RULES {
        let haystack = match subject {
            Subject::Name => name,
            Subject::ParentName => parent_name,
            Subject::ExternalRef => external_ref,
        };
        if name_contains(haystack, marker) {
            return *class;
        }
    }

    NodeClass::Volume
}

/// Classify a node in place in a tree.
#[must_use]
pub fn classify_node(tree: &HierarchyTree, id: NodeId) -> NodeClass {
    let node = tree.node(id);
    let parent_name = node
        .parent()
        .map(|p| tree.node(p).name())
        .unwrap_or_default();
    classify(node.name(), parent_name, node.external_ref(), node.is_leaf())
}

/// DICOM modality assigned to an exportable leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Modality {
    /// Magnetic resonance.
    #[serde(rename = "MR")]
    Mr,
    /// Segmentation object.
    #[serde(rename = "SEG")]
    Seg,
}

impl Modality {
    /// DICOM tag value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mr => "MR",
            Self::Seg => "SEG",
        }
    }
}

/// Modality heuristic over the study folder name and the series name.
///
/// Intra-op ultrasound is deliberately tagged MR: tagged US, common viewers
/// load the series as loose slices instead of one volume.
#[must_use]
pub fn modality(class: NodeClass, parent_name: &str, name: &str) -> Option<Modality> {
    if class == NodeClass::Segmentation {
        return Some(Modality::Seg);
    }

    let parent = parent_name.to_lowercase();
    let name = name.to_lowercase();

    if parent.contains("intra") && parent.contains("us") && name.contains("us") {
        Some(Modality::Mr)
    } else if parent.contains("intra") && parent.contains("mr") && name.contains('t') {
        Some(Modality::Mr)
    } else if parent.contains("pre") && parent.contains("imag") && name.contains('t') {
        Some(Modality::Mr)
    } else if parent.contains("segment") {
        Some(Modality::Seg)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_non_leaf_is_folder() {
        assert_eq!(classify("Pre-op MR", "case01", "", false), NodeClass::Folder);
        // even a transform-named group stays a folder
        assert_eq!(classify("transforms", "case01", "", false), NodeClass::Folder);
    }

    #[test]
    fn test_segmentation_by_content_ref() {
        assert_eq!(
            classify("tumor_t2", "Annotations", "vtkMRMLSegmentationNode1", true),
            NodeClass::Segmentation
        );
    }

    #[test]
    fn test_segmentation_by_annotation_parent() {
        assert_eq!(
            classify("tumor", "Annotations", "", true),
            NodeClass::Segmentation
        );
    }

    #[test]
    fn test_transform_excluded() {
        assert_eq!(
            classify("Affine Transform", "case01", "", true),
            NodeClass::Transform
        );
    }

    #[test]
    fn test_landmark_by_parent_folder() {
        assert_eq!(
            classify("points", "Landmarks", "", true),
            NodeClass::Landmark
        );
    }

    #[test]
    fn test_landmark_by_markups_ref() {
        assert_eq!(
            classify("resection cavity", "Annotations", "vtkMRMLMarkupsFiducialNode2", true),
            NodeClass::Landmark
        );
    }

    #[test]
    fn test_landmark_wins_over_annotation_parent() {
        // a landmark stored in the annotations folder must not be claimed
        // as a segmentation
        assert_eq!(
            classify("landmarks", "Annotations", "", true),
            NodeClass::Landmark
        );
    }

    #[test]
    fn test_ambiguous_leaf_defaults_to_volume() {
        assert_eq!(classify("Ax T2", "Pre-op MR", "", true), NodeClass::Volume);
        assert_eq!(classify("???", "???", "", true), NodeClass::Volume);
    }

    #[test]
    fn test_case_insensitive_matching() {
        assert_eq!(
            classify("My TRANSFORM node", "case01", "", true),
            NodeClass::Transform
        );
        assert_eq!(
            classify("seg", "ANNOTATIONS", "", true),
            NodeClass::Segmentation
        );
    }

    #[test]
    fn test_modality_intra_op_us_maps_to_mr() {
        assert_eq!(
            modality(NodeClass::Volume, "Intra-op US", "US vol 1"),
            Some(Modality::Mr)
        );
    }

    #[test]
    fn test_modality_intra_op_mr() {
        assert_eq!(
            modality(NodeClass::Volume, "Intra-op MR", "T2 post"),
            Some(Modality::Mr)
        );
    }

    #[test]
    fn test_modality_pre_op_imaging() {
        assert_eq!(
            modality(NodeClass::Volume, "Pre-op imaging", "Ax T1"),
            Some(Modality::Mr)
        );
    }

    #[test]
    fn test_modality_segmentation_always_seg() {
        assert_eq!(
            modality(NodeClass::Segmentation, "Annotations", "tumor_t2"),
            Some(Modality::Seg)
        );
    }

    #[test]
    fn test_modality_unknown_is_none() {
        assert_eq!(modality(NodeClass::Volume, "Misc", "thing"), None);
    }
}
