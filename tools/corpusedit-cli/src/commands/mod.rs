pub mod apply;
pub mod edit;
pub mod files;
pub mod info;
pub mod show;

use corpusedit_common::config::AppConfig;
use corpusedit_dataset::{Dataset, Loader};

/// Load `files` (or every shard) from the configured input directory.
pub(crate) fn load(config: &AppConfig, files: &[String]) -> anyhow::Result<Dataset> {
    Loader::from_config(config)
        .load(files)
        .map_err(|e| anyhow::anyhow!("Failed to load corpus: {e}"))
}
