//! Hierarchy tree mirroring the clinical folder convention of a scene.
//!
//! The tree is rebuilt from the scene source at the start of every export or
//! statistics pass and discarded afterwards; there is no incremental update.
//! Nodes live in an arena ([`HierarchyTree`] owns a `Vec` of nodes addressed
//! by [`NodeId`]), which gives us parent back-references without reference
//! counting. Children are kept in an insertion-ordered map because series
//! numbering is derived from traversal order, not from any node attribute.

use std::collections::{HashSet, VecDeque};

use indexmap::IndexMap;

use crate::error::{ExportError, Result};

/// Index handle into a [`HierarchyTree`] arena.
///
/// Ids are only minted by the tree that owns the node and are never reused
/// within one tree's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A named node with ordered children and two external identifiers.
///
/// `structural_id` keys the node in the external store's grouping structure;
/// `external_ref` points at the content object (volume, segmentation,
/// markup) and is empty for pure folder nodes.
#[derive(Debug, Clone)]
pub struct HierarchyNode {
    name: String,
    structural_id: String,
    external_ref: String,
    parent: Option<NodeId>,
    children: IndexMap<String, NodeId>,
    study_uid: Option<String>,
    series_uid: Option<String>,
}

impl HierarchyNode {
    fn new(
        name: impl Into<String>,
        structural_id: impl Into<String>,
        external_ref: impl Into<String>,
        parent: Option<NodeId>,
    ) -> Self {
        Self {
            name: name.into(),
            structural_id: structural_id.into(),
            external_ref: external_ref.into(),
            parent,
            children: IndexMap::new(),
            study_uid: None,
            series_uid: None,
        }
    }

    /// Display name, the map key among siblings.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier of this node in the external store's structure.
    #[must_use]
    pub fn structural_id(&self) -> &str {
        &self.structural_id
    }

    /// Content reference in the external store; empty for folder nodes.
    #[must_use]
    pub fn external_ref(&self) -> &str {
        &self.external_ref
    }

    /// True if this node has a backing content object.
    #[must_use]
    pub fn has_content(&self) -> bool {
        !self.external_ref.is_empty()
    }

    /// Parent handle; `None` only for the root.
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child handles in insertion order.
    pub fn children(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children.values().copied()
    }

    /// A node is an exportable leaf iff it has no children.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Study UID memoised during planning, if assigned.
    #[must_use]
    pub fn study_uid(&self) -> Option<&str> {
        self.study_uid.as_deref()
    }

    /// Series UID memoised during planning, if assigned.
    #[must_use]
    pub fn series_uid(&self) -> Option<&str> {
        self.series_uid.as_deref()
    }
}

/// Arena-backed tree with breadth-first traversal and id lookup.
#[derive(Debug, Clone)]
pub struct HierarchyTree {
    nodes: Vec<HierarchyNode>,
    root: NodeId,
}

impl HierarchyTree {
    /// Create a tree with a singleton root node.
    #[must_use]
    pub fn new(
        root_name: impl Into<String>,
        structural_id: impl Into<String>,
        external_ref: impl Into<String>,
    ) -> Self {
        let root = HierarchyNode::new(root_name, structural_id, external_ref, None);
        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    /// Handle of the root node.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Borrow a node by handle.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &HierarchyNode {
        &self.nodes[id.0]
    }

    /// Number of nodes attached to the tree (root included).
    #[must_use]
    pub fn len(&self) -> usize {
        self.bfs(self.root).len() + 1
    }

    /// True if only the root exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes[self.root.0].children.is_empty()
    }

    /// Attach a new child under `parent` and return its handle.
    ///
    /// Sibling names must be unique: a second child with the same name is
    /// rejected with [`ExportError::DuplicateChildName`] and the tree is left
    /// unchanged. The source of truth being rebuilt here cannot produce
    /// duplicates on purpose, so a collision means malformed input.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        structural_id: impl Into<String>,
        external_ref: impl Into<String>,
    ) -> Result<NodeId> {
        let name = name.into();
        if self.nodes[parent.0].children.contains_key(&name) {
            return Err(ExportError::DuplicateChildName {
                parent: self.nodes[parent.0].name.clone(),
                name,
            });
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(HierarchyNode::new(
            name.clone(),
            structural_id,
            external_ref,
            Some(parent),
        ));
        self.nodes[parent.0].children.insert(name, id);
        Ok(id)
    }

    /// Detach the child named `name` (and its whole subtree) from `parent`.
    pub fn remove_child(&mut self, parent: NodeId, name: &str) -> Result<NodeId> {
        let id = self.nodes[parent.0].children.shift_remove(name).ok_or_else(|| {
            ExportError::UnknownChild {
                parent: self.nodes[parent.0].name.clone(),
                name: name.to_string(),
            }
        })?;
        self.nodes[id.0].parent = None;
        Ok(id)
    }

    /// Move `node` under `new_parent`, atomically.
    ///
    /// All checks (node is not the root, no sibling name collision, the new
    /// parent is not inside the moved subtree) happen before any mutation, so
    /// a failed reparent never leaves the tree partially relinked.
    pub fn reparent(&mut self, node: NodeId, new_parent: NodeId) -> Result<()> {
        let name = self.nodes[node.0].name.clone();

        let Some(old_parent) = self.nodes[node.0].parent else {
            return Err(ExportError::ReparentCycle { name });
        };
        if node == new_parent || self.is_descendant_of(new_parent, node) {
            return Err(ExportError::ReparentCycle { name });
        }
        if old_parent != new_parent && self.nodes[new_parent.0].children.contains_key(&name) {
            return Err(ExportError::DuplicateChildName {
                parent: self.nodes[new_parent.0].name.clone(),
                name,
            });
        }

        self.nodes[old_parent.0].children.shift_remove(&name);
        self.nodes[new_parent.0].children.insert(name, node);
        self.nodes[node.0].parent = Some(new_parent);
        Ok(())
    }

    /// True if `node` lies in the subtree rooted at `ancestor`.
    fn is_descendant_of(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = self.nodes[node.0].parent;
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.nodes[p.0].parent;
        }
        false
    }

    /// Breadth-first traversal starting below `from` (the start node itself
    /// is not part of the sequence).
    ///
    /// Children are visited in insertion order; the visited set is keyed on
    /// `structural_id`, so a malformed scene that repeats a structural id
    /// yields each id at most once.
    #[must_use]
    pub fn bfs(&self, from: NodeId) -> Vec<NodeId> {
        let mut visited: HashSet<&str> = HashSet::new();
        visited.insert(&self.nodes[from.0].structural_id);

        let mut order = Vec::new();
        let mut queue = VecDeque::from([from]);

        while let Some(id) = queue.pop_front() {
            for child in self.nodes[id.0].children.values() {
                if visited.insert(&self.nodes[child.0].structural_id) {
                    order.push(*child);
                    queue.push_back(*child);
                }
            }
        }

        order
    }

    /// First node in BFS order whose `external_ref` equals `external_ref`.
    ///
    /// Malformed scenes may hold several nodes with the same content
    /// reference; callers get the first match, not a guaranteed-unique one.
    #[must_use]
    pub fn find_by_ref(&self, external_ref: &str) -> Option<NodeId> {
        if self.nodes[self.root.0].external_ref == external_ref {
            return Some(self.root);
        }
        self.bfs(self.root)
            .into_iter()
            .find(|id| self.nodes[id.0].external_ref == external_ref)
    }

    /// Look up a direct child of `parent` by name.
    #[must_use]
    pub fn child_by_name(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.nodes[parent.0].children.get(name).copied()
    }

    /// Memoise the study UID on a node (planner use).
    pub fn set_study_uid(&mut self, id: NodeId, uid: impl Into<String>) {
        self.nodes[id.0].study_uid = Some(uid.into());
    }

    /// Memoise the series UID on a node (planner use).
    pub fn set_series_uid(&mut self, id: NodeId, uid: impl Into<String>) {
        self.nodes[id.0].series_uid = Some(uid.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_tree() -> (HierarchyTree, Vec<NodeId>) {
        let mut tree = HierarchyTree::new("case01", "sh1", "");
        let root = tree.root();
        let pre_op = tree.add_child(root, "Pre-op MR", "sh2", "").unwrap();
        let t1 = tree.add_child(pre_op, "T1", "sh3", "vtkMRMLScalarVolumeNode1").unwrap();
        let t2 = tree.add_child(pre_op, "T2", "sh4", "vtkMRMLScalarVolumeNode2").unwrap();
        let ann = tree.add_child(root, "Annotations", "sh5", "").unwrap();
        let seg = tree
            .add_child(ann, "tumor_t2", "sh6", "vtkMRMLSegmentationNode1")
            .unwrap();
        (tree, vec![pre_op, t1, t2, ann, seg])
    }

    #[test]
    fn test_bfs_order_matches_insertion() {
        let (tree, ids) = sample_tree();
        let order = tree.bfs(tree.root());
        // level 1 in insertion order, then level 2 in insertion order
        assert_eq!(order, vec![ids[0], ids[3], ids[1], ids[2], ids[4]]);
    }

    #[test]
    fn test_bfs_completeness() {
        let (tree, ids) = sample_tree();
        let order = tree.bfs(tree.root());
        assert_eq!(order.len(), ids.len());
        let unique: HashSet<_> = order.iter().collect();
        assert_eq!(unique.len(), order.len());
    }

    #[test]
    fn test_bfs_skips_repeated_structural_id() {
        let mut tree = HierarchyTree::new("root", "sh1", "");
        let a = tree.add_child(tree.root(), "a", "sh2", "").unwrap();
        tree.add_child(a, "inner", "dup", "").unwrap();
        let b = tree.add_child(tree.root(), "b", "sh3", "").unwrap();
        // same structural id at a different level
        tree.add_child(b, "other", "dup", "").unwrap();

        let order = tree.bfs(tree.root());
        let dups = order
            .iter()
            .filter(|id| tree.node(**id).structural_id() == "dup")
            .count();
        assert_eq!(dups, 1);
    }

    #[test]
    fn test_parent_link_integrity() {
        let (tree, _) = sample_tree();
        for id in tree.bfs(tree.root()) {
            let node = tree.node(id);
            let parent = node.parent().expect("non-root node has a parent");
            assert_eq!(tree.child_by_name(parent, node.name()), Some(id));
        }
    }

    #[test]
    fn test_duplicate_child_rejected_without_mutation() {
        let (mut tree, ids) = sample_tree();
        let before = tree.bfs(tree.root());
        let err = tree.add_child(ids[0], "T1", "sh99", "").unwrap_err();
        assert!(matches!(err, ExportError::DuplicateChildName { .. }));
        assert_eq!(tree.bfs(tree.root()), before);
    }

    #[test]
    fn test_find_by_ref() {
        let (tree, ids) = sample_tree();
        assert_eq!(tree.find_by_ref("vtkMRMLScalarVolumeNode2"), Some(ids[2]));
        assert_eq!(tree.find_by_ref("missing"), None);
    }

    #[test]
    fn test_find_by_ref_first_match_in_bfs_order() {
        let mut tree = HierarchyTree::new("root", "sh1", "");
        let a = tree.add_child(tree.root(), "a", "sh2", "").unwrap();
        let deep = tree.add_child(a, "deep", "sh3", "sharedref").unwrap();
        let shallow = tree.add_child(tree.root(), "b", "sh4", "sharedref").unwrap();

        // the shallow node comes first in BFS order
        assert_eq!(tree.find_by_ref("sharedref"), Some(shallow));
        assert_ne!(Some(deep), tree.find_by_ref("sharedref"));
    }

    #[test]
    fn test_remove_child_detaches_subtree() {
        let (mut tree, ids) = sample_tree();
        tree.remove_child(tree.root(), "Pre-op MR").unwrap();
        let order = tree.bfs(tree.root());
        assert!(!order.contains(&ids[0]));
        assert!(!order.contains(&ids[1]));
        assert_eq!(order.len(), 2);
    }

    #[test]
    fn test_remove_unknown_child() {
        let (mut tree, _) = sample_tree();
        let err = tree.remove_child(tree.root(), "nope").unwrap_err();
        assert!(matches!(err, ExportError::UnknownChild { .. }));
    }

    #[test]
    fn test_reparent_moves_subtree() {
        let (mut tree, ids) = sample_tree();
        // move the segmentation under the pre-op folder
        tree.reparent(ids[4], ids[0]).unwrap();
        assert_eq!(tree.node(ids[4]).parent(), Some(ids[0]));
        assert_eq!(tree.child_by_name(ids[0], "tumor_t2"), Some(ids[4]));
        assert_eq!(tree.child_by_name(ids[3], "tumor_t2"), None);
    }

    #[test]
    fn test_reparent_refuses_cycle() {
        let (mut tree, ids) = sample_tree();
        let err = tree.reparent(ids[0], ids[1]).unwrap_err();
        assert!(matches!(err, ExportError::ReparentCycle { .. }));
        // nothing moved
        assert_eq!(tree.node(ids[0]).parent(), Some(tree.root()));
        assert_eq!(tree.node(ids[1]).parent(), Some(ids[0]));
    }

    #[test]
    fn test_reparent_refuses_name_collision() {
        let (mut tree, ids) = sample_tree();
        tree.add_child(ids[3], "T1", "sh7", "").unwrap();
        // pre-op already has a "T1"
        let moved = tree.child_by_name(ids[3], "T1").unwrap();
        let err = tree.reparent(moved, ids[0]).unwrap_err();
        assert!(matches!(err, ExportError::DuplicateChildName { .. }));
        assert_eq!(tree.node(moved).parent(), Some(ids[3]));
    }

    #[test]
    fn test_root_cannot_be_reparented() {
        let (mut tree, ids) = sample_tree();
        assert!(tree.reparent(tree.root(), ids[0]).is_err());
    }

    #[test]
    fn test_leaf_predicate() {
        let (tree, ids) = sample_tree();
        assert!(!tree.node(ids[0]).is_leaf());
        assert!(tree.node(ids[1]).is_leaf());
        assert!(tree.node(ids[4]).is_leaf());
    }

    #[test]
    fn test_series_uid_memoisation() {
        let (mut tree, ids) = sample_tree();
        assert!(tree.node(ids[1]).series_uid().is_none());
        tree.set_series_uid(ids[1], "1234561");
        assert_eq!(tree.node(ids[1]).series_uid(), Some("1234561"));
    }
}
