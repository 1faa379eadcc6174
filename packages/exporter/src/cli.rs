//! Command-line interface for the exporter.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::validate_output_dir;
use crate::dicom::build_dicom_plan;
use crate::error::Result;
use crate::ids::IdPolicy;
use crate::manifest::{save_dicom_manifest, save_nifti_manifest};
use crate::nifti::build_nifti_plan;
use crate::scene::{build_hierarchy, SceneDescription};

/// Scenetree Exporter - Plan DICOM/NIfTI exports of clinical scene hierarchies.
#[derive(Parser)]
#[command(name = "scenetree-exporter")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Plan a DICOM export from a scene description file.
    PlanDicom {
        /// Scene description JSON file
        scene: PathBuf,

        /// Output directory for the manifest (default: current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep the scene's own label as the patient id instead of hashing
        #[arg(long)]
        keep_source_id: bool,
    },

    /// Plan a NIfTI export and create its directory layout.
    PlanNifti {
        /// Scene description JSON file
        scene: PathBuf,

        /// Output directory for manifest and layout (default: current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep the scene's own label as the patient id instead of hashing
        #[arg(long)]
        keep_source_id: bool,
    },
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::PlanDicom {
            scene,
            output,
            keep_source_id,
        } => plan_dicom_command(&scene, output.as_deref(), keep_source_id),
        Commands::PlanNifti {
            scene,
            output,
            keep_source_id,
        } => plan_nifti_command(&scene, output.as_deref(), keep_source_id),
    }
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Load a scene file, validate it, and build the hierarchy.
fn load_scene(scene_file: &Path, keep_source_id: bool) -> Result<(crate::scene::BuiltScene, IdPolicy)> {
    let scene = SceneDescription::from_file(scene_file)?;
    scene.validate()?;

    let built = build_hierarchy(&scene)?;

    let policy = if keep_source_id {
        IdPolicy::Passthrough {
            source_label: built.source_label.clone().unwrap_or_default(),
        }
    } else {
        IdPolicy::Deidentify
    };

    Ok((built, policy))
}

/// Execute the plan-dicom command.
fn plan_dicom_command(scene_file: &Path, output: Option<&Path>, keep_source_id: bool) -> Result<()> {
    let output_dir = output.unwrap_or(Path::new("."));
    validate_output_dir(output_dir)?;

    println!(
        "{} {}",
        style("Planning DICOM export for").bold(),
        style(scene_file.display()).cyan()
    );
    println!();

    let pb = spinner();
    pb.set_message("Reading scene description...");

    let (mut built, policy) = match load_scene(scene_file, keep_source_id) {
        Ok(v) => v,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e);
        }
    };

    pb.set_message("Assigning series and identifiers...");
    let plan = build_dicom_plan(&mut built, &policy);

    pb.set_message("Saving manifest...");
    let manifest_path = match save_dicom_manifest(&plan, output_dir) {
        Ok(path) => path,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e);
        }
    };

    pb.finish_and_clear();

    println!("  Subject: {}", style(&plan.subject).green());
    println!("  Patient ID: {}", style(&plan.patient_id).green());
    println!("  Studies: {}", plan.studies.len());
    let series: usize = plan.studies.values().map(Vec::len).sum();
    println!("  Series: {series}");
    if !plan.failures.is_empty() {
        println!(
            "  Skipped: {}",
            style(plan.failures.len()).yellow().bold()
        );
        for failure in &plan.failures {
            println!("    {}: {}", style(&failure.node).yellow(), failure.reason);
        }
    }

    println!();
    println!(
        "{} {}",
        style("Saved to:").green().bold(),
        manifest_path.display()
    );

    Ok(())
}

/// Execute the plan-nifti command.
fn plan_nifti_command(scene_file: &Path, output: Option<&Path>, keep_source_id: bool) -> Result<()> {
    let output_dir = output.unwrap_or(Path::new("."));
    validate_output_dir(output_dir)?;

    println!(
        "{} {}",
        style("Planning NIfTI export for").bold(),
        style(scene_file.display()).cyan()
    );
    println!();

    let pb = spinner();
    pb.set_message("Reading scene description...");

    let (built, policy) = match load_scene(scene_file, keep_source_id) {
        Ok(v) => v,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e);
        }
    };

    pb.set_message("Laying out output folders...");
    let plan = build_nifti_plan(&built, &policy);

    let result = plan
        .create_output_layout(output_dir)
        .and_then(|()| save_nifti_manifest(&plan, output_dir));
    let manifest_path = match result {
        Ok(path) => path,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e);
        }
    };

    pb.finish_and_clear();

    println!("  Subject: {}", style(&plan.subject).green());
    println!("  Patient ID: {}", style(&plan.patient_id).green());
    println!("  Files: {}", plan.entries.len());
    if plan.landmarks_path.is_some() {
        println!("  Landmark sets: {}", plan.landmark_refs.len());
    }

    println!();
    println!(
        "{} {}",
        style("Saved to:").green().bold(),
        manifest_path.display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_plan_dicom() {
        let cli = Cli::parse_from(["scenetree-exporter", "plan-dicom", "scene.json"]);

        let Commands::PlanDicom {
            scene,
            output,
            keep_source_id,
        } = cli.command
        else {
            panic!("expected plan-dicom");
        };
        assert_eq!(scene, PathBuf::from("scene.json"));
        assert!(output.is_none());
        assert!(!keep_source_id);
    }

    #[test]
    fn test_cli_parse_plan_nifti_with_options() {
        let cli = Cli::parse_from([
            "scenetree-exporter",
            "plan-nifti",
            "scene.json",
            "--output",
            "/tmp/out",
            "--keep-source-id",
        ]);

        let Commands::PlanNifti {
            scene,
            output,
            keep_source_id,
        } = cli.command
        else {
            panic!("expected plan-nifti");
        };
        assert_eq!(scene, PathBuf::from("scene.json"));
        assert_eq!(output, Some(PathBuf::from("/tmp/out")));
        assert!(keep_source_id);
    }
}
