//! Samples and their identity.
//!
//! A sample is one row of the unified corpus table. Its position in the
//! table changes as rows are split or deleted; its [`RowId`] never does.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Well-known column names of the speech corpus.
pub mod columns {
    pub const AUDIO: &str = "audio";
    pub const TEXT: &str = "text";
    pub const REGION: &str = "region";
    pub const PROVINCE_CODE: &str = "province_code";
    pub const PROVINCE_NAME: &str = "province_name";
    pub const FILENAME: &str = "filename";
    pub const SPEAKER_ID: &str = "speakerID";
    pub const GENDER: &str = "gender";

    /// Child fields of the `audio` struct column.
    pub const AUDIO_BYTES: &str = "bytes";
    pub const AUDIO_PATH: &str = "path";
}

/// Stable identity of a sample within one editing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(pub u64);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Encoded audio of a sample.
///
/// Clones share the byte buffer, so snapshots and split copies cost nothing
/// until the audio is replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioBlob {
    /// WAV file bytes.
    pub bytes: Arc<[u8]>,

    /// Source path recorded next to the bytes, if the shard carries one.
    pub path: Option<String>,
}

impl AudioBlob {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
            path: None,
        }
    }

    /// Whether `other` holds the very same buffer.
    pub fn shares_bytes(&self, other: &AudioBlob) -> bool {
        Arc::ptr_eq(&self.bytes, &other.bytes)
    }
}

impl Default for AudioBlob {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// A passthrough column value.
///
/// Columns other than `audio` and `text` are not edited, only carried from
/// the source shard to its edited copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl MetaValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(v) => f.write_str(v),
        }
    }
}

/// One row of the corpus table.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Stable identity.
    pub row_id: RowId,

    /// File name of the shard this row was loaded from.
    pub source: String,

    /// Current audio.
    pub audio: AudioBlob,

    /// Current transcript.
    pub text: String,

    /// Passthrough columns keyed by column name.
    pub metadata: BTreeMap<String, MetaValue>,

    /// Row this one was split off from, if any.
    pub split_from: Option<RowId>,
}

impl Sample {
    /// Look up a passthrough column.
    pub fn meta(&self, column: &str) -> Option<&MetaValue> {
        self.metadata.get(column)
    }

    /// Passthrough column rendered as text, empty when absent or null.
    pub fn meta_string(&self, column: &str) -> String {
        self.meta(column).map(ToString::to_string).unwrap_or_default()
    }

    /// The sample's `filename` column, when it holds a string.
    pub fn filename(&self) -> Option<&str> {
        self.meta(columns::FILENAME).and_then(MetaValue::as_str)
    }

    /// Speaker gender, `None` when the shard has no `gender` column.
    pub fn gender(&self) -> Option<Gender> {
        self.meta(columns::GENDER).map(Gender::from_meta)
    }

    /// Snapshot of the current audio and text.
    pub fn snapshot(&self) -> Original {
        Original {
            audio: self.audio.clone(),
            text: self.text.clone(),
        }
    }
}

/// Pristine audio and text of a row as loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Original {
    pub audio: AudioBlob,
    pub text: String,
}

impl Original {
    /// Whether `sample` still carries exactly this content.
    pub fn matches(&self, sample: &Sample) -> bool {
        self.audio.bytes == sample.audio.bytes && self.text == sample.text
    }
}

/// Speaker gender as encoded by the corpus: `1` is male, anything else female.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn from_meta(value: &MetaValue) -> Self {
        match value {
            MetaValue::Int(1) | MetaValue::Bool(true) => Self::Male,
            MetaValue::Float(v) if *v == 1.0 => Self::Male,
            _ => Self::Female,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }
}

/// Read-only summary of one sample, as shown to the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleView {
    /// Zero-based position in the table.
    pub index: usize,
    /// Number of rows in the table.
    pub total: usize,
    pub row_id: RowId,
    pub region: String,
    pub province_code: String,
    pub province_name: String,
    pub filename: String,
    pub speaker_id: String,
    pub gender: Option<Gender>,
    pub text: String,
    pub duration_secs: f64,
    pub source: String,
    pub modified: bool,
}

impl SampleView {
    /// Build the view for `sample` at `index` of `total`.
    pub fn new(
        sample: &Sample,
        index: usize,
        total: usize,
        duration_secs: f64,
        modified: bool,
    ) -> Self {
        Self {
            index,
            total,
            row_id: sample.row_id,
            region: sample.meta_string(columns::REGION),
            province_code: sample.meta_string(columns::PROVINCE_CODE),
            province_name: sample.meta_string(columns::PROVINCE_NAME),
            filename: sample.meta_string(columns::FILENAME),
            speaker_id: sample.meta_string(columns::SPEAKER_ID),
            gender: sample.gender(),
            text: sample.text.clone(),
            duration_secs,
            source: sample.source.clone(),
            modified,
        }
    }
}
