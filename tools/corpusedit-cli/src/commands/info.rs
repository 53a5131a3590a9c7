//! Summarize loaded shards.

use corpusedit_common::config::AppConfig;
use corpusedit_dataset::partition;

pub fn run(config: &AppConfig, files: &[String]) -> anyhow::Result<()> {
    let dataset = super::load(config, files)?;

    println!("Corpus: {}", config.input_dir().display());
    println!("  Samples: {}", dataset.len());
    println!("  Shards: {}", dataset.shards().len());
    println!();

    let parts = partition(&dataset);
    for shard in dataset.shards() {
        let rows = parts
            .iter()
            .find(|p| p.shard == shard.name())
            .map_or(0, |p| p.rows.len());
        let columns: Vec<&str> = shard.passthrough_columns().collect();
        println!("  {}: {} rows", shard.name(), rows);
        println!("    Metadata columns: {}", columns.join(", "));
    }

    Ok(())
}
