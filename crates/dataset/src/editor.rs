//! In-memory corpus editing.
//!
//! [`Dataset`] owns the unified sample table plus three pieces of
//! bookkeeping that every mutation keeps consistent:
//! - the originals map, keyed by [`RowId`], holding each row's pristine
//!   audio and text;
//! - the modified set, also keyed by [`RowId`], so inserting or removing
//!   rows never shifts it;
//! - the deleted set, recording source rows removed since load. Rows
//!   created by a split never reach it, as no shard holds them.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use corpusedit_audio::wav;
use corpusedit_common::error::{CorpusError, CorpusResult};
use corpusedit_corpus_model::{
    columns, next_split_name, AudioBlob, MetaValue, Original, RowId, Sample, SampleView,
};

use crate::schema::ShardSchema;

/// A single scripted edit, addressed by table position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EditOp {
    SetText { index: usize, text: String },
    Trim { index: usize, start_ms: f64, end_ms: f64 },
    ResetAudio { index: usize },
    ResetText { index: usize },
    Delete { index: usize },
}

/// What a trim did to the table.
#[derive(Debug, Clone, PartialEq)]
pub struct TrimOutcome {
    /// Position of the trimmed row.
    pub index: usize,
    pub kept_ms: f64,
    /// Position and identity of the inserted remainder row.
    pub remainder: Option<(usize, RowId)>,
    pub remainder_ms: f64,
}

/// Result of [`Dataset::apply`].
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    TextUpdated { index: usize },
    Trimmed(TrimOutcome),
    AudioReset { index: usize },
    TextReset { index: usize },
    Deleted {
        /// Position the row held before removal.
        index: usize,
        removed: RowId,
        next_index: usize,
    },
}

impl EditOutcome {
    /// Position the operator should look at after this edit.
    pub fn focus(&self) -> usize {
        match self {
            Self::TextUpdated { index }
            | Self::AudioReset { index }
            | Self::TextReset { index } => *index,
            Self::Trimmed(trim) => trim.index,
            Self::Deleted { next_index, .. } => *next_index,
        }
    }
}

impl fmt::Display for EditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TextUpdated { index } => write!(f, "Updated text of sample {}", index + 1),
            Self::Trimmed(trim) => {
                write!(
                    f,
                    "Trimmed sample {} to {:.2}s",
                    trim.index + 1,
                    trim.kept_ms / 1000.0
                )?;
                if let Some((index, _)) = trim.remainder {
                    write!(
                        f,
                        "; remaining {:.2}s saved as sample {}",
                        trim.remainder_ms / 1000.0,
                        index + 1
                    )?;
                }
                Ok(())
            }
            Self::AudioReset { index } => write!(f, "Restored original audio of sample {}", index + 1),
            Self::TextReset { index } => write!(f, "Restored original text of sample {}", index + 1),
            Self::Deleted { index, .. } => write!(f, "Deleted sample {}", index + 1),
        }
    }
}

/// The editable corpus table.
#[derive(Debug, Clone)]
pub struct Dataset {
    shards: Vec<ShardSchema>,
    samples: Vec<Sample>,
    originals: HashMap<RowId, Original>,
    modified: BTreeSet<RowId>,
    deleted: BTreeSet<RowId>,
    next_row_id: u64,
}

impl Dataset {
    /// Build a dataset from loaded samples, snapshotting their originals.
    pub fn new(shards: Vec<ShardSchema>, samples: Vec<Sample>) -> CorpusResult<Self> {
        let mut seen = HashSet::with_capacity(samples.len());
        for sample in &samples {
            if !seen.insert(sample.row_id) {
                return Err(CorpusError::load(format!(
                    "Duplicate row id {} in loaded samples",
                    sample.row_id
                )));
            }
        }

        let originals = samples
            .iter()
            .map(|s| (s.row_id, s.snapshot()))
            .collect();
        let next_row_id = samples.iter().map(|s| s.row_id.0 + 1).max().unwrap_or(0);

        Ok(Self {
            shards,
            samples,
            originals,
            modified: BTreeSet::new(),
            deleted: BTreeSet::new(),
            next_row_id,
        })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Schemas of the loaded shards, in load order.
    pub fn shards(&self) -> &[ShardSchema] {
        &self.shards
    }

    pub fn shard(&self, name: &str) -> Option<&ShardSchema> {
        self.shards.iter().find(|s| s.name() == name)
    }

    pub fn sample(&self, index: usize) -> CorpusResult<&Sample> {
        self.samples.get(index).ok_or(CorpusError::IndexOutOfRange {
            index,
            len: self.samples.len(),
        })
    }

    /// Position of the row with identity `row_id`.
    pub fn position(&self, row_id: RowId) -> Option<usize> {
        self.samples.iter().position(|s| s.row_id == row_id)
    }

    /// Move `delta` rows from `current`, staying inside the table.
    pub fn clamp_index(&self, current: usize, delta: isize) -> usize {
        let last = self.samples.len().saturating_sub(1);
        current.saturating_add_signed(delta).min(last)
    }

    /// Pristine audio and text of the row at `index`.
    pub fn original(&self, index: usize) -> CorpusResult<&Original> {
        let row_id = self.sample(index)?.row_id;
        self.original_of(row_id)
    }

    /// Pristine audio and text of the row with identity `row_id`.
    pub fn original_of(&self, row_id: RowId) -> CorpusResult<&Original> {
        self.originals
            .get(&row_id)
            .ok_or_else(|| CorpusError::load(format!("No original recorded for row {row_id}")))
    }

    pub fn is_modified(&self, index: usize) -> bool {
        self.samples
            .get(index)
            .is_some_and(|s| self.modified.contains(&s.row_id))
    }

    pub fn modified_count(&self) -> usize {
        self.modified.len()
    }

    pub fn deleted_count(&self) -> usize {
        self.deleted.len()
    }

    /// Whether anything differs from the loaded corpus.
    pub fn has_changes(&self) -> bool {
        !self.modified.is_empty() || !self.deleted.is_empty()
    }

    /// Summary of the row at `index` for display.
    pub fn sample_view(&self, index: usize) -> CorpusResult<SampleView> {
        let sample = self.sample(index)?;
        let info = wav::read_info(&sample.audio.bytes)?;
        Ok(SampleView::new(
            sample,
            index,
            self.samples.len(),
            info.duration_secs(),
            self.is_modified(index),
        ))
    }

    /// Replace the transcript of the row at `index`.
    pub fn update_text(&mut self, index: usize, text: impl Into<String>) -> CorpusResult<()> {
        self.check_index(index)?;
        let sample = &mut self.samples[index];
        sample.text = text.into();
        self.modified.insert(sample.row_id);
        tracing::debug!(index, row_id = sample.row_id.0, "Updated text");
        Ok(())
    }

    /// Keep `[start_ms, end_ms)` of the row at `index`.
    ///
    /// Audio after `end_ms` becomes a new row inserted right after it,
    /// carrying the same metadata, a fresh identity, and the parent's
    /// originals. Audio before `start_ms` is dropped.
    pub fn trim(&mut self, index: usize, start_ms: f64, end_ms: f64) -> CorpusResult<TrimOutcome> {
        self.check_index(index)?;
        if !start_ms.is_finite() || !end_ms.is_finite() || start_ms < 0.0 || start_ms >= end_ms {
            return Err(CorpusError::InvalidTrimRange { start_ms, end_ms });
        }

        let split = wav::split_at_ms(&self.samples[index].audio.bytes, start_ms, end_ms)?;

        let parent = &mut self.samples[index];
        parent.audio = AudioBlob::new(split.kept);
        let parent_id = parent.row_id;
        self.modified.insert(parent_id);

        let mut outcome = TrimOutcome {
            index,
            kept_ms: split.kept_ms,
            remainder: None,
            remainder_ms: split.remainder_ms,
        };

        if let Some(remainder) = split.remainder {
            let row_id = self.allocate_row_id();
            let mut child = self.samples[index].clone();
            child.row_id = row_id;
            child.audio = AudioBlob::new(remainder);
            child.split_from = Some(parent_id);

            if let Some(filename) = child.filename() {
                let name = next_split_name(
                    filename,
                    self.samples.iter().filter_map(Sample::filename),
                );
                child
                    .metadata
                    .insert(columns::FILENAME.to_string(), MetaValue::Str(name));
            }

            let original = self.original_of(parent_id)?.clone();
            self.originals.insert(row_id, original);
            self.modified.insert(row_id);
            self.samples.insert(index + 1, child);
            outcome.remainder = Some((index + 1, row_id));
        }

        tracing::info!(
            index,
            row_id = parent_id.0,
            start_ms,
            end_ms,
            kept_ms = outcome.kept_ms,
            remainder_ms = outcome.remainder_ms,
            split = outcome.remainder.is_some(),
            "Trimmed sample"
        );
        Ok(outcome)
    }

    /// Restore the original audio of the row at `index`.
    pub fn reset_audio(&mut self, index: usize) -> CorpusResult<()> {
        self.check_index(index)?;
        let row_id = self.samples[index].row_id;
        let audio = self.original_of(row_id)?.audio.clone();
        self.samples[index].audio = audio;
        self.refresh_modified(index);
        tracing::debug!(index, row_id = row_id.0, "Reset audio");
        Ok(())
    }

    /// Restore the original text of the row at `index`.
    pub fn reset_text(&mut self, index: usize) -> CorpusResult<()> {
        self.check_index(index)?;
        let row_id = self.samples[index].row_id;
        let text = self.original_of(row_id)?.text.clone();
        self.samples[index].text = text;
        self.refresh_modified(index);
        tracing::debug!(index, row_id = row_id.0, "Reset text");
        Ok(())
    }

    /// Remove the row at `index` and return the position to show next.
    pub fn delete(&mut self, index: usize) -> CorpusResult<usize> {
        self.check_index(index)?;
        if self.samples.len() <= 1 {
            return Err(CorpusError::LastSample);
        }

        let removed = self.samples.remove(index);
        self.modified.remove(&removed.row_id);
        self.originals.remove(&removed.row_id);
        if removed.split_from.is_none() {
            self.deleted.insert(removed.row_id);
        }

        let next_index = index.min(self.samples.len() - 1);
        tracing::info!(
            index,
            row_id = removed.row_id.0,
            remaining = self.samples.len(),
            "Deleted sample"
        );
        Ok(next_index)
    }

    /// Apply one scripted edit.
    pub fn apply(&mut self, op: &EditOp) -> CorpusResult<EditOutcome> {
        match op {
            EditOp::SetText { index, text } => {
                self.update_text(*index, text.clone())?;
                Ok(EditOutcome::TextUpdated { index: *index })
            }
            EditOp::Trim {
                index,
                start_ms,
                end_ms,
            } => self
                .trim(*index, *start_ms, *end_ms)
                .map(EditOutcome::Trimmed),
            EditOp::ResetAudio { index } => {
                self.reset_audio(*index)?;
                Ok(EditOutcome::AudioReset { index: *index })
            }
            EditOp::ResetText { index } => {
                self.reset_text(*index)?;
                Ok(EditOutcome::TextReset { index: *index })
            }
            EditOp::Delete { index } => {
                let removed = self.sample(*index)?.row_id;
                let next_index = self.delete(*index)?;
                Ok(EditOutcome::Deleted {
                    index: *index,
                    removed,
                    next_index,
                })
            }
        }
    }

    fn check_index(&self, index: usize) -> CorpusResult<()> {
        self.sample(index).map(|_| ())
    }

    fn allocate_row_id(&mut self) -> RowId {
        let id = RowId(self.next_row_id);
        self.next_row_id += 1;
        id
    }

    /// Re-derive the modified mark of the row at `index` from its content.
    ///
    /// Split rows stay modified since they do not exist in the source shard.
    fn refresh_modified(&mut self, index: usize) {
        let sample = &self.samples[index];
        let pristine = sample.split_from.is_none()
            && self
                .originals
                .get(&sample.row_id)
                .is_some_and(|o| o.matches(sample));
        if pristine {
            self.modified.remove(&sample.row_id);
        } else {
            self.modified.insert(sample.row_id);
        }
    }
}
