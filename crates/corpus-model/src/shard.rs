//! Source shard discovery.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use corpusedit_common::error::CorpusResult;

const SHARD_EXTENSION: &str = "parquet";

/// A source Parquet file available for loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardInfo {
    /// File name, used as the shard's identity.
    pub name: String,

    /// Full path on disk.
    pub path: PathBuf,

    /// File size in bytes.
    pub size_bytes: u64,
}

impl ShardInfo {
    /// Size in mebibytes.
    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0)
    }

    /// Label shown when choosing shards, e.g. `shard-01.parquet (12.3 MB)`.
    pub fn display_label(&self) -> String {
        format!("{} ({:.1} MB)", self.name, self.size_mb())
    }
}

/// List the Parquet shards directly under `dir`, sorted by name.
///
/// A missing directory yields an empty list.
pub fn discover_shards(dir: &Path) -> CorpusResult<Vec<ShardInfo>> {
    if !dir.is_dir() {
        tracing::debug!(dir = %dir.display(), "Shard directory does not exist");
        return Ok(vec![]);
    }

    let mut shards = vec![];
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(SHARD_EXTENSION) {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };
        shards.push(ShardInfo {
            name,
            size_bytes: entry.metadata()?.len(),
            path,
        });
    }

    shards.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(shards)
}

/// Output file name for the edited copy of `shard_name`.
///
/// `shard-01.parquet` with suffix `_edited` becomes `shard-01_edited.parquet`.
pub fn edited_file_name(shard_name: &str, suffix: &str) -> String {
    let stem = shard_name
        .strip_suffix(".parquet")
        .unwrap_or(shard_name);
    format!("{stem}{suffix}.{SHARD_EXTENSION}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovery_is_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.parquet"), vec![0u8; 2048]).unwrap();
        std::fs::write(dir.path().join("a.parquet"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("nested.parquet")).unwrap();

        let shards = discover_shards(dir.path()).unwrap();
        let names: Vec<&str> = shards.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a.parquet", "b.parquet"]);
        assert_eq!(shards[1].size_bytes, 2048);
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let shards = discover_shards(&dir.path().join("absent")).unwrap();
        assert!(shards.is_empty());
    }

    #[test]
    fn test_display_label() {
        let shard = ShardInfo {
            name: "s.parquet".to_string(),
            path: PathBuf::from("s.parquet"),
            size_bytes: 3 * 1024 * 1024 + 300 * 1024,
        };
        assert_eq!(shard.display_label(), "s.parquet (3.3 MB)");
    }

    #[test]
    fn test_edited_file_name() {
        assert_eq!(edited_file_name("s-01.parquet", "_edited"), "s-01_edited.parquet");
        assert_eq!(edited_file_name("raw", "_v2"), "raw_v2.parquet");
    }
}
