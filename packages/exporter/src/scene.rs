//! Scene ingestion: from an external scene store to a [`HierarchyTree`].
//!
//! The core never talks to a live scene graph. It depends on the minimal
//! enumeration-and-lookup capability below, injected as an explicit
//! parameter so tests (and hosts) can substitute their own store. A
//! serde-backed [`SceneDescription`] is the concrete store used by the CLI:
//! hosts dump their subject hierarchy to JSON and planning runs offline.

use std::collections::{HashSet, VecDeque};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{clean_display_name, is_pre_op_name, name_contains, SEGMENTATION_REF_MARKER};
use crate::error::{ExportError, Result};
use crate::tree::{HierarchyTree, NodeId};

/// Minimal read surface a scene store must expose.
///
/// `structural_id` values are the store's own item identifiers; they key the
/// visited set during construction and must be stable for one pass.
pub trait SceneSource {
    /// Items directly under the scene root, in display order.
    fn top_level_items(&self) -> Vec<String>;

    /// Children of an item, in display order.
    fn children_of(&self, structural_id: &str) -> Vec<String>;

    /// Display name of an item.
    fn name_of(&self, structural_id: &str) -> Option<String>;

    /// Content reference of an item; empty for pure grouping items.
    fn content_ref_of(&self, structural_id: &str) -> String;

    /// Label of the scene's backing file (stem without extension), if any.
    fn source_label(&self) -> Option<String> {
        None
    }
}

/// One item of a serialised scene dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneItem {
    /// Structural identifier, unique within the scene.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Content reference of the backing object, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_ref: Option<String>,

    /// Structural id of the parent item; top-level items omit it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

/// A whole scene as a flat item list, the JSON interchange format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneDescription {
    /// Stem of the scene bundle file this dump came from, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_label: Option<String>,

    /// Items in display order; child items must list their parent.
    pub items: Vec<SceneItem>,
}

impl SceneDescription {
    /// Read a scene description from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let scene = serde_json::from_reader(BufReader::new(file))?;
        Ok(scene)
    }

    /// Check referential consistency: every named parent must exist.
    pub fn validate(&self) -> Result<()> {
        let ids: HashSet<&str> = self.items.iter().map(|i| i.id.as_str()).collect();
        for item in &self.items {
            if let Some(parent) = &item.parent {
                if !ids.contains(parent.as_str()) {
                    return Err(ExportError::DanglingSceneItem {
                        item: item.id.clone(),
                        parent: parent.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn item(&self, structural_id: &str) -> Option<&SceneItem> {
        self.items.iter().find(|i| i.id == structural_id)
    }
}

impl SceneSource for SceneDescription {
    fn top_level_items(&self) -> Vec<String> {
        self.items
            .iter()
            .filter(|i| i.parent.is_none())
            .map(|i| i.id.clone())
            .collect()
    }

    fn children_of(&self, structural_id: &str) -> Vec<String> {
        self.items
            .iter()
            .filter(|i| i.parent.as_deref() == Some(structural_id))
            .map(|i| i.id.clone())
            .collect()
    }

    fn name_of(&self, structural_id: &str) -> Option<String> {
        self.item(structural_id).map(|i| i.name.clone())
    }

    fn content_ref_of(&self, structural_id: &str) -> String {
        self.item(structural_id)
            .and_then(|i| i.content_ref.clone())
            .unwrap_or_default()
    }

    fn source_label(&self) -> Option<String> {
        self.source_label.clone()
    }
}

/// Result of one scene-construction pass.
#[derive(Debug)]
pub struct BuiltScene {
    /// The subject hierarchy, rooted at the subject node.
    pub tree: HierarchyTree,

    /// The pre-operative imaging folder found during the walk, if any.
    pub pre_op_folder: Option<NodeId>,

    /// Source label carried over from the store.
    pub source_label: Option<String>,
}

/// Build the hierarchy tree for the scene's subject, breadth-first.
///
/// The first top-level item is the subject (a scene with none is a fatal
/// [`ExportError::NoSubjectNode`]). Descent stops at segmentation-backed
/// items: their segments belong to the content object, not to the folder
/// hierarchy. Display names are cleaned of load artefact suffixes.
pub fn build_hierarchy(source: &impl SceneSource) -> Result<BuiltScene> {
    let top = source.top_level_items();
    let Some(subject_id) = top.first() else {
        return Err(ExportError::NoSubjectNode);
    };

    let subject_name = source
        .name_of(subject_id)
        .map(|n| clean_display_name(&n))
        .ok_or(ExportError::NoSubjectNode)?;

    let mut tree = HierarchyTree::new(
        subject_name,
        subject_id.clone(),
        source.content_ref_of(subject_id),
    );
    let mut pre_op_folder = None;

    let mut visited: HashSet<String> = HashSet::from([subject_id.clone()]);
    let mut queue: VecDeque<(String, NodeId)> = VecDeque::from([(subject_id.clone(), tree.root())]);

    while let Some((structural_id, node_id)) = queue.pop_front() {
        // segments of a segmentation are not hierarchy nodes
        if name_contains(tree.node(node_id).external_ref(), SEGMENTATION_REF_MARKER) {
            continue;
        }

        for child_id in source.children_of(&structural_id) {
            if !visited.insert(child_id.clone()) {
                warn!(item = %child_id, "scene item reachable twice, skipping");
                continue;
            }

            let Some(raw_name) = source.name_of(&child_id) else {
                warn!(item = %child_id, "scene item without a name, skipping");
                continue;
            };
            let name = clean_display_name(&raw_name);

            let child =
                tree.add_child(node_id, name.clone(), child_id.clone(), source.content_ref_of(&child_id))?;

            if pre_op_folder.is_none() && is_pre_op_name(&name) {
                debug!(folder = %name, "detected pre-operative imaging folder");
                pre_op_folder = Some(child);
            }

            queue.push_back((child_id, child));
        }
    }

    debug!(nodes = tree.len(), "built hierarchy tree");

    Ok(BuiltScene {
        tree,
        pre_op_folder,
        source_label: source.source_label(),
    })
}
