//! Reading Parquet shards into one [`Dataset`].

use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use corpusedit_common::config::AppConfig;
use corpusedit_common::error::{CorpusError, CorpusResult};
use corpusedit_corpus_model::{discover_shards, Sample};

use crate::editor::Dataset;
use crate::schema::ShardSchema;

pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const DEFAULT_PROGRESS_EVERY: usize = 10;

/// Where a load currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    Reading,
    ShardComplete,
    Complete,
}

/// Progress event emitted while loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadProgress {
    pub shard: String,
    /// Rows read from the current shard so far.
    pub rows_loaded: usize,
    /// Rows declared in the current shard's footer.
    pub total_rows: usize,
    /// One-based position of the current shard.
    pub shard_index: usize,
    pub shard_count: usize,
    pub stage: LoadStage,
}

/// Progress callback type.
pub type ProgressCallback = Box<dyn Fn(LoadProgress)>;

/// Loads a selection of shards from one directory.
pub struct Loader {
    input_dir: PathBuf,
    batch_size: usize,
    progress_every: usize,
    progress: Option<ProgressCallback>,
}

impl Loader {
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            progress_every: DEFAULT_PROGRESS_EVERY,
            progress: None,
        }
    }

    /// Loader over the configured input directory with configured batching.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.input_dir())
            .with_batch_size(config.corpus.read_batch_size)
            .with_progress_every(config.corpus.progress_every_batches)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_progress_every(mut self, batches: usize) -> Self {
        self.progress_every = batches.max(1);
        self
    }

    pub fn with_progress(mut self, callback: impl Fn(LoadProgress) + 'static) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    /// Paths of the shards `selection` names, or every shard when it is empty.
    ///
    /// Repeated names are loaded once.
    pub fn resolve(&self, selection: &[String]) -> CorpusResult<Vec<(String, PathBuf)>> {
        let resolved: Vec<(String, PathBuf)> = if selection.is_empty() {
            discover_shards(&self.input_dir)?
                .into_iter()
                .map(|shard| (shard.name, shard.path))
                .collect()
        } else {
            let mut seen = HashSet::new();
            let mut resolved = vec![];
            for name in selection {
                if !seen.insert(name.as_str()) {
                    continue;
                }
                let path = self.input_dir.join(name);
                if !path.is_file() {
                    return Err(CorpusError::FileNotFound { path });
                }
                resolved.push((name.clone(), path));
            }
            resolved
        };

        if resolved.is_empty() {
            return Err(CorpusError::NoShards {
                dir: self.input_dir.clone(),
            });
        }
        Ok(resolved)
    }

    /// Load the selected shards into one table.
    pub fn load(&self, selection: &[String]) -> CorpusResult<Dataset> {
        let shards = self.resolve(selection)?;
        let shard_count = shards.len();
        tracing::info!(
            dir = %self.input_dir.display(),
            shards = shard_count,
            batch_size = self.batch_size,
            "Loading corpus"
        );

        let mut schemas = Vec::with_capacity(shard_count);
        let mut samples: Vec<Sample> = vec![];
        for (position, (name, path)) in shards.iter().enumerate() {
            let schema = self.load_shard(name, path, position + 1, shard_count, &mut samples)?;
            schemas.push(schema);
        }

        self.emit(LoadProgress {
            shard: String::new(),
            rows_loaded: samples.len(),
            total_rows: samples.len(),
            shard_index: shard_count,
            shard_count,
            stage: LoadStage::Complete,
        });
        tracing::info!(rows = samples.len(), shards = shard_count, "Corpus loaded");

        Dataset::new(schemas, samples)
    }

    fn load_shard(
        &self,
        name: &str,
        path: &Path,
        shard_index: usize,
        shard_count: usize,
        samples: &mut Vec<Sample>,
    ) -> CorpusResult<ShardSchema> {
        let file = File::open(path)?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)
            .map_err(|e| CorpusError::load(format!("Failed to open {name}: {e}")))?;
        let total_rows = usize::try_from(builder.metadata().file_metadata().num_rows()).unwrap_or(0);
        let schema = ShardSchema::new(name, builder.schema().clone())?;
        let reader = builder
            .with_batch_size(self.batch_size)
            .build()
            .map_err(|e| CorpusError::load(format!("Failed to read {name}: {e}")))?;

        tracing::debug!(shard = name, total_rows, "Reading shard");

        let mut rows_loaded = 0;
        for (batch_number, batch) in reader.enumerate() {
            let batch =
                batch.map_err(|e| CorpusError::load(format!("Failed to read {name}: {e}")))?;
            let decoded = schema.decode(&batch, samples.len() as u64)?;
            rows_loaded += decoded.len();
            samples.extend(decoded);

            if (batch_number + 1) % self.progress_every == 0 {
                tracing::info!(shard = name, rows_loaded, total_rows, "Loading shard");
                self.emit(LoadProgress {
                    shard: name.to_string(),
                    rows_loaded,
                    total_rows,
                    shard_index,
                    shard_count,
                    stage: LoadStage::Reading,
                });
            }
        }

        tracing::info!(
            shard = name,
            rows = rows_loaded,
            shard_index,
            shard_count,
            "Shard loaded"
        );
        self.emit(LoadProgress {
            shard: name.to_string(),
            rows_loaded,
            total_rows,
            shard_index,
            shard_count,
            stage: LoadStage::ShardComplete,
        });
        Ok(schema)
    }

    fn emit(&self, progress: LoadProgress) {
        if let Some(callback) = &self.progress {
            callback(progress);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::write_shard;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_empty_selection_loads_every_shard_in_order() {
        let dir = tempfile::tempdir().unwrap();
        write_shard(&dir.path().join("b.parquet"), &["b0", "b1"]);
        write_shard(&dir.path().join("a.parquet"), &["a0"]);

        let ds = Loader::new(dir.path()).load(&[]).unwrap();
        let texts: Vec<&str> = ds.samples().iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["a0", "b0", "b1"]);
        assert_eq!(ds.samples()[2].source, "b.parquet");
        assert_eq!(ds.shards().len(), 2);
        assert!(!ds.has_changes());
    }

    #[test]
    fn test_row_ids_are_dense_across_shards() {
        let dir = tempfile::tempdir().unwrap();
        write_shard(&dir.path().join("a.parquet"), &["x", "y"]);
        write_shard(&dir.path().join("b.parquet"), &["z"]);

        let ds = Loader::new(dir.path()).with_batch_size(1).load(&[]).unwrap();
        let ids: Vec<u64> = ds.samples().iter().map(|s| s.row_id.0).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_selection_keeps_order_and_drops_repeats() {
        let dir = tempfile::tempdir().unwrap();
        write_shard(&dir.path().join("a.parquet"), &["a0"]);
        write_shard(&dir.path().join("b.parquet"), &["b0"]);

        let selection = vec![
            "b.parquet".to_string(),
            "a.parquet".to_string(),
            "b.parquet".to_string(),
        ];
        let ds = Loader::new(dir.path()).load(&selection).unwrap();
        let texts: Vec<&str> = ds.samples().iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["b0", "a0"]);
    }

    #[test]
    fn test_missing_file_and_empty_dir_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Loader::new(dir.path()).load(&[]),
            Err(CorpusError::NoShards { .. })
        ));
        assert!(matches!(
            Loader::new(dir.path()).load(&["gone.parquet".to_string()]),
            Err(CorpusError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_progress_reports_batches_and_completion() {
        let dir = tempfile::tempdir().unwrap();
        let texts: Vec<String> = (0..5).map(|i| format!("t{i}")).collect();
        let texts: Vec<&str> = texts.iter().map(String::as_str).collect();
        write_shard(&dir.path().join("a.parquet"), &texts);

        let events = Rc::new(RefCell::new(vec![]));
        let sink = events.clone();
        Loader::new(dir.path())
            .with_batch_size(1)
            .with_progress_every(2)
            .with_progress(move |p| sink.borrow_mut().push(p))
            .load(&[])
            .unwrap();

        let events = events.borrow();
        let stages: Vec<LoadStage> = events.iter().map(|p| p.stage).collect();
        assert_eq!(
            stages,
            vec![
                LoadStage::Reading,
                LoadStage::Reading,
                LoadStage::ShardComplete,
                LoadStage::Complete
            ]
        );
        assert_eq!(events[1].rows_loaded, 4);
        assert_eq!(events[2].rows_loaded, 5);
        assert_eq!(events[2].total_rows, 5);
    }
}
