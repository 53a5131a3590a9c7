//! Writing the edited table back out, one file per source shard.

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use serde::Serialize;

use corpusedit_common::error::{CorpusError, CorpusResult};
use corpusedit_corpus_model::{edited_file_name, Sample};

use crate::editor::Dataset;
use crate::loader::DEFAULT_BATCH_SIZE;

/// Files listed by [`SaveReport::summary`] before the rest are elided.
const SUMMARY_FILE_LIMIT: usize = 10;

/// Rows of the table that came from one shard, in table order.
#[derive(Debug, Clone)]
pub struct Partition<'a> {
    pub shard: &'a str,
    pub rows: Vec<&'a Sample>,
}

/// Group the table by source shard in order of first appearance.
pub fn partition(dataset: &Dataset) -> Vec<Partition<'_>> {
    let mut partitions: Vec<Partition<'_>> = vec![];
    for sample in dataset.samples() {
        match partitions.iter().position(|p| p.shard == sample.source) {
            Some(i) => partitions[i].rows.push(sample),
            None => partitions.push(Partition {
                shard: &sample.source,
                rows: vec![sample],
            }),
        }
    }
    partitions
}

/// One written output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedShard {
    /// Source shard the rows came from.
    pub shard: String,
    pub path: PathBuf,
    pub rows: usize,
}

impl SavedShard {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// What a save wrote.
#[derive(Debug, Clone, Serialize)]
pub struct SaveReport {
    pub saved_at: DateTime<Utc>,
    pub output_dir: PathBuf,
    pub modified_samples: usize,
    pub deleted_samples: usize,
    pub total_rows: usize,
    pub files: Vec<SavedShard>,
}

impl SaveReport {
    /// Human-readable summary for the operator.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Saved {} modified samples ({} deleted) to {} files:",
            self.modified_samples,
            self.deleted_samples,
            self.files.len()
        );
        for file in self.files.iter().take(SUMMARY_FILE_LIMIT) {
            out.push_str(&format!("\n  - {} ({} rows)", file.file_name(), file.rows));
        }
        if self.files.len() > SUMMARY_FILE_LIMIT {
            out.push_str(&format!(
                "\n  ... and {} more",
                self.files.len() - SUMMARY_FILE_LIMIT
            ));
        }
        out.push_str(&format!("\n\nDirectory: {}", self.output_dir.display()));
        out
    }
}

/// Save `dataset` under `output_dir`, naming files `<stem><suffix>.parquet`.
pub fn save(dataset: &Dataset, output_dir: &Path, suffix: &str) -> CorpusResult<Option<SaveReport>> {
    Exporter::new(output_dir, suffix).save(dataset)
}

/// Writes edited shards under one output directory.
#[derive(Debug, Clone)]
pub struct Exporter {
    output_dir: PathBuf,
    suffix: String,
    batch_size: usize,
}

impl Exporter {
    pub fn new(output_dir: impl Into<PathBuf>, suffix: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            suffix: suffix.into(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Rows encoded per record batch; each batch is written before the next is built.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write every partition of `dataset`, or nothing when it is unchanged.
    pub fn save(&self, dataset: &Dataset) -> CorpusResult<Option<SaveReport>> {
        if !dataset.has_changes() {
            tracing::info!("No changes to save");
            return Ok(None);
        }

        let files = self.write_partitions(dataset)?;
        let report = SaveReport {
            saved_at: Utc::now(),
            output_dir: self.output_dir.clone(),
            modified_samples: dataset.modified_count(),
            deleted_samples: dataset.deleted_count(),
            total_rows: dataset.len(),
            files,
        };
        tracing::info!(
            dir = %report.output_dir.display(),
            files = report.files.len(),
            modified = report.modified_samples,
            deleted = report.deleted_samples,
            "Saved edited corpus"
        );
        Ok(Some(report))
    }

    /// Write one file per partition regardless of pending changes.
    pub fn write_partitions(&self, dataset: &Dataset) -> CorpusResult<Vec<SavedShard>> {
        std::fs::create_dir_all(&self.output_dir)?;

        let mut saved = vec![];
        for part in partition(dataset) {
            let path = self
                .output_dir
                .join(edited_file_name(part.shard, &self.suffix));
            self.write_partition(dataset, &part, &path)?;
            tracing::debug!(
                shard = part.shard,
                rows = part.rows.len(),
                path = %path.display(),
                "Wrote shard"
            );
            saved.push(SavedShard {
                shard: part.shard.to_string(),
                path,
                rows: part.rows.len(),
            });
        }
        Ok(saved)
    }

    fn write_partition(&self, dataset: &Dataset, part: &Partition<'_>, path: &Path) -> CorpusResult<()> {
        let shard = dataset.shard(part.shard).ok_or_else(|| {
            CorpusError::export(format!("No schema recorded for shard {}", part.shard))
        })?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let file = File::create(path)?;
        let mut writer = ArrowWriter::try_new(file, shard.schema().clone(), Some(props))
            .map_err(|e| CorpusError::export(format!("Failed to create {}: {e}", path.display())))?;
        for rows in part.rows.chunks(self.batch_size) {
            let batch = shard.encode(rows)?;
            writer
                .write(&batch)
                .map_err(|e| CorpusError::export(format!("Failed to write {}: {e}", path.display())))?;
        }
        writer
            .close()
            .map_err(|e| CorpusError::export(format!("Failed to finish {}: {e}", path.display())))?;
        Ok(())
    }
}
