//! List the source shards.

use corpusedit_common::config::AppConfig;
use corpusedit_corpus_model::discover_shards;

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    let dir = config.input_dir();
    let shards = discover_shards(&dir)?;

    if shards.is_empty() {
        println!("No parquet files in {}", dir.display());
        return Ok(());
    }

    println!("{} files in {}:", shards.len(), dir.display());
    for shard in &shards {
        println!("  {}", shard.display_label());
    }
    Ok(())
}
