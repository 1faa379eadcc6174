//! Per-scene and batch content statistics.
//!
//! A statistics pass answers "what does this archive contain": how many
//! volumes, segmentations and landmark sets each study folder of each
//! subject holds. One unreadable scene never aborts the batch; it is
//! recorded as a failure and the scan continues.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

use scenetree_exporter::classify::classify_node;
use scenetree_exporter::scene::{build_hierarchy, SceneDescription};
use scenetree_exporter::{BuiltScene, NodeClass};

use crate::error::{Result, StatsError};

/// Content counts of one scene, grouped by study folder.
#[derive(Debug, Clone, Serialize)]
pub struct SceneStatistics {
    /// Subject node display name.
    pub subject: String,
    /// Scene file the statistics came from.
    pub scene_file: PathBuf,
    /// Total hierarchy nodes, subject included.
    pub total_nodes: usize,
    /// Leaf counts per study folder, in encounter order.
    pub studies: IndexMap<String, IndexMap<NodeClass, usize>>,
}

/// One scene that could not be read or built.
#[derive(Debug, Clone, Serialize)]
pub struct ScanFailure {
    pub scene_file: PathBuf,
    pub reason: String,
}

/// Statistics over a whole batch of scene files.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub generated: DateTime<Utc>,
    pub scanned_root: PathBuf,
    pub scenes: Vec<SceneStatistics>,
    /// Leaf counts summed over all scenes.
    pub totals: IndexMap<NodeClass, usize>,
    pub failures: Vec<ScanFailure>,
}

/// Count the leaves of a built scene per study folder.
#[must_use]
pub fn collect_scene_statistics(built: &BuiltScene, scene_file: &Path) -> SceneStatistics {
    let tree = &built.tree;
    let mut studies: IndexMap<String, IndexMap<NodeClass, usize>> = IndexMap::new();

    for id in tree.bfs(tree.root()) {
        let class = classify_node(tree, id);
        if class == NodeClass::Folder {
            continue;
        }
        let Some(parent) = tree.node(id).parent() else {
            continue;
        };
        let study = tree.node(parent).name().to_string();
        *studies.entry(study).or_default().entry(class).or_insert(0) += 1;
    }

    SceneStatistics {
        subject: tree.node(tree.root()).name().to_string(),
        scene_file: scene_file.to_path_buf(),
        total_nodes: tree.len(),
        studies,
    }
}

/// Find scene description files (`*.json`) under a root, recursively.
///
/// Hidden directories are skipped; files are returned in path order so the
/// summary is stable across runs.
#[must_use]
pub fn scan_scene_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| {
            // the root itself may be dot-prefixed; only prune below it
            e.depth() == 0
                || !e
                    .file_name()
                    .to_str()
                    .is_some_and(|n| n.starts_with('.') && n.len() > 1)
        })
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    files
}

/// Collect statistics over every scene file under `root`.
///
/// A root without any scene file is a [`StatsError::NoScenes`]; individual
/// unreadable scenes are reported in the summary's `failures` list.
pub fn collect_batch(root: &Path) -> Result<BatchSummary> {
    let files = scan_scene_files(root);
    if files.is_empty() {
        return Err(StatsError::NoScenes(root.display().to_string()));
    }

    let mut scenes = Vec::new();
    let mut failures = Vec::new();

    for file in files {
        match load_and_collect(&file) {
            Ok(stats) => {
                debug!(scene = %file.display(), subject = %stats.subject, "collected statistics");
                scenes.push(stats);
            }
            Err(e) => {
                warn!(scene = %file.display(), error = %e, "skipping unreadable scene");
                failures.push(ScanFailure {
                    scene_file: file,
                    reason: e.to_string(),
                });
            }
        }
    }

    let mut totals: IndexMap<NodeClass, usize> = IndexMap::new();
    for scene in &scenes {
        for counts in scene.studies.values() {
            for (class, count) in counts {
                *totals.entry(*class).or_insert(0) += count;
            }
        }
    }

    Ok(BatchSummary {
        generated: Utc::now(),
        scanned_root: root.to_path_buf(),
        scenes,
        totals,
        failures,
    })
}

fn load_and_collect(file: &Path) -> Result<SceneStatistics> {
    let scene = SceneDescription::from_file(file)?;
    scene.validate()?;
    let built = build_hierarchy(&scene)?;
    Ok(collect_scene_statistics(&built, file))
}

/// Save a batch summary as JSON, atomically.
///
/// # Returns
/// Path to the saved file
pub fn save_summary(summary: &BatchSummary, output_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)?;

    let output_file = output_dir.join("scene_statistics.json");
    let temp_file = output_dir.join(".scene_statistics.json.tmp");

    let content = serde_json::to_string_pretty(summary)?;

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

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use scenetree_exporter::scene::SceneItem;

    fn item(id: &str, name: &str, parent: Option<&str>, content_ref: Option<&str>) -> SceneItem {
        SceneItem {
            id: id.to_string(),
            name: name.to_string(),
            content_ref: content_ref.map(String::from),
            parent: parent.map(String::from),
        }
    }

    fn sample_scene() -> SceneDescription {
        SceneDescription {
            source_label: None,
            items: vec![
                item("1", "case01", None, None),
                item("2", "Pre-op MR", Some("1"), None),
                item("3", "T1", Some("2"), Some("vtkMRMLScalarVolumeNode1")),
                item("4", "T2", Some("2"), Some("vtkMRMLScalarVolumeNode2")),
                item("5", "Annotations", Some("1"), None),
                item("6", "tumor_t2", Some("5"), Some("vtkMRMLSegmentationNode1")),
                item("7", "Landmarks", Some("1"), None),
                item("8", "points", Some("7"), Some("vtkMRMLMarkupsFiducialNode1")),
            ],
        }
    }

    fn write_scene(dir: &Path, name: &str, scene: &SceneDescription) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, serde_json::to_string(scene).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_scene_statistics_counts() {
        let built = build_hierarchy(&sample_scene()).unwrap();
        let stats = collect_scene_statistics(&built, Path::new("scene.json"));

        assert_eq!(stats.subject, "case01");
        assert_eq!(stats.total_nodes, 8);
        assert_eq!(stats.studies["Pre-op MR"][&NodeClass::Volume], 2);
        assert_eq!(stats.studies["Annotations"][&NodeClass::Segmentation], 1);
        assert_eq!(stats.studies["Landmarks"][&NodeClass::Landmark], 1);
    }

    #[test]
    fn test_scan_finds_nested_scene_files() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("batch/case01");
        fs::create_dir_all(&nested).unwrap();
        write_scene(&nested, "scene.json", &sample_scene());
        fs::write(dir.path().join("notes.txt"), "not a scene").unwrap();

        let files = scan_scene_files(dir.path());
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("batch/case01/scene.json"));
    }

    #[test]
    fn test_batch_skips_broken_scene() {
        let dir = tempfile::tempdir().unwrap();
        write_scene(dir.path(), "good.json", &sample_scene());
        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();

        let summary = collect_batch(dir.path()).unwrap();
        assert_eq!(summary.scenes.len(), 1);
        assert_eq!(summary.failures.len(), 1);
        assert!(summary.failures[0].scene_file.ends_with("broken.json"));
        assert_eq!(summary.totals[&NodeClass::Volume], 2);
    }

    #[test]
    fn test_batch_empty_root_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            collect_batch(dir.path()),
            Err(StatsError::NoScenes(_))
        ));
    }

    #[test]
    fn test_save_summary() {
        let dir = tempfile::tempdir().unwrap();
        write_scene(dir.path(), "scene.json", &sample_scene());
        let summary = collect_batch(dir.path()).unwrap();

        let out = tempfile::tempdir().unwrap();
        let path = save_summary(&summary, out.path()).unwrap();
        assert!(path.exists());

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["scenes"][0]["subject"], "case01");
        assert_eq!(value["totals"]["volume"], 2);
        assert_eq!(value["totals"]["segmentation"], 1);
    }
}
