//! Scenetree Exporter - Plan DICOM and NIfTI exports of clinical scene
//! hierarchies with deterministic identifiers.
//!
//! This crate turns a host application's subject hierarchy (dumped to a
//! flat JSON scene description) into export plans: DICOM tag sets with
//! stable, hash-derived identifiers, or a NIfTI directory layout. It never
//! touches pixel data; an external writer consumes the plans.
//!
//! # Example
//!
//! ```
//! use scenetree_exporter::ids::{hash_id, IdPolicy};
//!
//! // The same subject always hashes to the same patient id
//! assert_eq!(hash_id("case01"), "592885353");
//! assert_eq!(IdPolicy::Deidentify.patient_id("case01"), "592885353");
//! ```
//!
//! # Architecture
//!
//! The exporter is organized into several modules:
//!
//! - [`config`]: Folder-name markers, constants and validation
//! - [`error`]: Error types and Result alias
//! - [`tree`]: Arena-backed hierarchy tree with BFS traversal
//! - [`scene`]: Scene ingestion behind the [`scene::SceneSource`] trait
//! - [`classify`]: Node classification and modality heuristics
//! - [`ids`]: Deterministic identifier synthesis
//! - [`planner`]: Series numbering and semantic parent resolution
//! - [`dicom`]: DICOM plan emitter
//! - [`nifti`]: NIfTI layout planner
//! - [`manifest`]: Atomic JSON manifest writer
//! - [`cli`]: Command-line interface

pub mod classify;
pub mod cli;
pub mod config;
pub mod dicom;
pub mod error;
pub mod ids;
pub mod manifest;
pub mod nifti;
pub mod planner;
pub mod scene;
pub mod tree;

// Re-export main functions
pub use dicom::build_dicom_plan;
pub use nifti::build_nifti_plan;
pub use scene::build_hierarchy;

// Re-export commonly used items
pub use classify::{Modality, NodeClass};
pub use error::{ExportError, Result};
pub use ids::IdPolicy;
pub use scene::{BuiltScene, SceneDescription, SceneItem, SceneSource};
pub use tree::{HierarchyTree, NodeId};
