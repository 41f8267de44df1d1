//! Chest radiograph triage example.
//!
//! Loads ONNX classifiers from a manifest, analyzes each image and prints the
//! response JSON.
//!
//! # Usage
//!
//! ```bash
//! cargo run --features onnx --example triage -- \
//!     --manifest models/manifest.json \
//!     --config triage.json \
//!     chest1.png chest2.dcm
//! ```
//!
//! A manifest lists one entry per model:
//!
//! ```json
//! {
//!   "models": [
//!     {
//!       "descriptor": {
//!         "disease_key": "pneumonia",
//!         "class_labels": ["normal", "pneumonia"],
//!         "reported_accuracy": 0.942,
//!         "output": "sigmoid"
//!       },
//!       "model_path": "pneumonia.onnx"
//!     }
//!   ]
//! }
//! ```

use chest_triage::core::{PipelineConfig, init_tracing, load_registry_from_manifest};
use chest_triage::pipeline::TriagePipeline;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Command-line arguments for the triage example.
#[derive(Parser)]
#[command(name = "triage")]
#[command(about = "Chest radiograph triage with a set of ONNX classifiers")]
struct Args {
    /// Image files to analyze.
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Path to the model manifest.
    #[arg(long)]
    manifest: PathBuf,

    /// Optional pipeline configuration file (JSON).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print compact instead of pretty JSON.
    #[arg(long)]
    compact: bool,

    /// Print pipeline statistics at the end.
    #[arg(long)]
    stats: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };

    let registry = load_registry_from_manifest(&args.manifest, &config.inference.onnx_threading)?;
    info!(models = registry.len(), "loaded model manifest");

    let pipeline = TriagePipeline::builder()
        .registry(registry)
        .config(config)
        .build()?;

    let existing: Vec<&Path> = args
        .images
        .iter()
        .map(PathBuf::as_path)
        .filter(|path| {
            let exists = path.exists();
            if !exists {
                error!("Image file not found: {}", path.display());
            }
            exists
        })
        .collect();
    if existing.is_empty() {
        error!("No valid image files found");
        return Err("No valid image files found".into());
    }

    for path in existing {
        match pipeline.analyze_file(path) {
            Ok(record) => {
                let json = record.to_response_json()?;
                let rendered = if args.compact {
                    serde_json::to_string(&json)?
                } else {
                    serde_json::to_string_pretty(&json)?
                };
                println!("{rendered}");
            }
            Err(e) => error!("{}: {}", path.display(), e),
        }
    }

    if args.stats {
        println!("{}", pipeline.stats());
    }
    Ok(())
}
