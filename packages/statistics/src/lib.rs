//! Scenetree Statistics - Content statistics over batches of scene
//! descriptions.
//!
//! Scans a directory tree for scene description JSON files, builds each
//! scene's hierarchy with `scenetree-exporter`, and summarises what every
//! study folder contains. Unreadable scenes are reported, never fatal.
//!
//! # Architecture
//!
//! - [`error`]: Error types and Result alias
//! - [`stats`]: Scene scanning, counting and summary output
//! - [`cli`]: Command-line interface

pub mod cli;
pub mod error;
pub mod stats;

// Re-export main functions
pub use stats::{collect_batch, collect_scene_statistics, scan_scene_files, save_summary};

// Re-export commonly used items
pub use error::{Result, StatsError};
pub use stats::{BatchSummary, SceneStatistics, ScanFailure};
