//! Error types for the exporter.
//!
//! Fatal errors abort a whole planning pass (a scene without a subject node,
//! malformed tree mutations, I/O). Per-node export problems are *not*
//! represented here: the planner collects those as [`crate::planner::PlanFailure`]
//! records and keeps going, so one bad node never sinks the batch.

use thiserror::Error;

/// Main error type for the exporter library.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The scene has no subject node under the scene root.
    #[error("No subject node found in scene. The scene root must have at least one child")]
    NoSubjectNode,

    /// Two siblings with the same name.
    #[error("Duplicate child name '{name}' under '{parent}'")]
    DuplicateChildName { parent: String, name: String },

    /// A named child was expected but not present.
    #[error("No child named '{name}' under '{parent}'")]
    UnknownChild { parent: String, name: String },

    /// Re-parenting a node under its own descendant.
    #[error("Cannot reparent '{name}' under its own subtree")]
    ReparentCycle { name: String },

    /// Scene description references an unknown item.
    #[error("Scene item '{item}' references unknown parent '{parent}'")]
    DanglingSceneItem { item: String, parent: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for exporter operations.
pub type Result<T> = std::result::Result<T, ExportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_child_display() {
        let err = ExportError::DuplicateChildName {
            parent: "Pre-op MR".to_string(),
            name: "T1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Duplicate child name 'T1' under 'Pre-op MR'"
        );
    }

    #[test]
    fn test_no_subject_display() {
        let err = ExportError::NoSubjectNode;
        assert!(err.to_string().contains("subject node"));
    }

    #[test]
    fn test_dangling_item_display() {
        let err = ExportError::DanglingSceneItem {
            item: "shItem9".to_string(),
            parent: "shItem99".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Scene item 'shItem9' references unknown parent 'shItem99'"
        );
    }
}
