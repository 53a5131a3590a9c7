//! Apply a scripted batch of edits and save the result.

use std::path::PathBuf;

use corpusedit_common::config::AppConfig;
use corpusedit_dataset::{EditOp, Exporter};

pub fn run(config: &AppConfig, script: PathBuf, files: &[String]) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(&script)
        .map_err(|e| anyhow::anyhow!("Failed to read script {}: {e}", script.display()))?;
    let ops: Vec<EditOp> = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Invalid edit script {}: {e}", script.display()))?;

    let mut dataset = super::load(config, files)?;
    println!("Applying {} edits to {} samples", ops.len(), dataset.len());

    for (n, op) in ops.iter().enumerate() {
        let outcome = dataset
            .apply(op)
            .map_err(|e| anyhow::anyhow!("Edit {} ({op:?}) failed: {e}", n + 1))?;
        println!("  {outcome}");
    }

    let exporter = Exporter::new(config.output_dir(), config.corpus.output_suffix.clone())
        .with_batch_size(config.corpus.read_batch_size);
    match exporter.save(&dataset)? {
        Some(report) => println!("\n{}", report.summary()),
        None => println!("\nNo changes to save."),
    }
    Ok(())
}
