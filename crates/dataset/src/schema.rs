//! Column mapping between shard record batches and samples.
//!
//! A shard's Arrow schema is kept for the whole session so its edited copy
//! is written with the same columns, in the same order, with the same types.
//! Passthrough columns are normalized to a small set of value kinds on read
//! and cast back to the shard's declared type on write.

use std::collections::BTreeMap;
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, AsArray, BooleanArray, Float64Array, Int64Array, LargeBinaryArray,
    LargeStringArray, StringArray, StructArray,
};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Fields, Float64Type, Int64Type, SchemaRef};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;

use corpusedit_common::error::{CorpusError, CorpusResult};
use corpusedit_corpus_model::{columns, AudioBlob, MetaValue, RowId, Sample};

/// Value kind a passthrough column is normalized to while in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Int,
    Float,
    Str,
    Bool,
}

impl ColumnKind {
    /// Kind for an Arrow type, `None` when the type is not carried.
    pub fn of(data_type: &DataType) -> Option<Self> {
        match data_type {
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64 => Some(Self::Int),
            DataType::Float16 | DataType::Float32 | DataType::Float64 => Some(Self::Float),
            DataType::Utf8 | DataType::LargeUtf8 | DataType::Null => Some(Self::Str),
            DataType::Dictionary(_, value) => Self::of(value).filter(|kind| *kind == Self::Str),
            DataType::Boolean => Some(Self::Bool),
            _ => None,
        }
    }

    fn canonical_type(self) -> DataType {
        match self {
            Self::Int => DataType::Int64,
            Self::Float => DataType::Float64,
            Self::Str => DataType::Utf8,
            Self::Bool => DataType::Boolean,
        }
    }
}

/// How a shard stores its audio column.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioLayout {
    /// Plain binary column of WAV bytes.
    Binary,
    /// Struct of `bytes` and an optional `path`.
    Struct { fields: Fields },
}

/// Schema of one source shard.
#[derive(Debug, Clone)]
pub struct ShardSchema {
    name: String,
    schema: SchemaRef,
    audio: AudioLayout,
    passthrough: Vec<(String, ColumnKind)>,
}

impl ShardSchema {
    /// Check that `schema` can be edited and record how to map it.
    pub fn new(name: impl Into<String>, schema: SchemaRef) -> CorpusResult<Self> {
        let name = name.into();
        let unsupported = |column: &str, data_type: &DataType| CorpusError::UnsupportedColumn {
            shard: name.clone(),
            column: column.to_string(),
            data_type: data_type.to_string(),
        };
        let missing = |column: &str| CorpusError::MissingColumn {
            shard: name.clone(),
            column: column.to_string(),
        };

        let audio_field = schema
            .field_with_name(columns::AUDIO)
            .map_err(|_| missing(columns::AUDIO))?;
        let audio = match audio_field.data_type() {
            DataType::Binary | DataType::LargeBinary => AudioLayout::Binary,
            DataType::Struct(fields) => {
                if fields.find(columns::AUDIO_BYTES).is_none() {
                    return Err(missing("audio.bytes"));
                }
                for child in fields.iter() {
                    let supported = match child.name().as_str() {
                        columns::AUDIO_BYTES => matches!(
                            child.data_type(),
                            DataType::Binary | DataType::LargeBinary
                        ),
                        columns::AUDIO_PATH => matches!(
                            child.data_type(),
                            DataType::Utf8 | DataType::LargeUtf8 | DataType::Null
                        ),
                        _ => false,
                    };
                    if !supported {
                        return Err(unsupported(
                            &format!("audio.{}", child.name()),
                            child.data_type(),
                        ));
                    }
                }
                AudioLayout::Struct {
                    fields: fields.clone(),
                }
            }
            other => return Err(unsupported(columns::AUDIO, other)),
        };

        let text_field = schema
            .field_with_name(columns::TEXT)
            .map_err(|_| missing(columns::TEXT))?;
        if ColumnKind::of(text_field.data_type()) != Some(ColumnKind::Str) {
            return Err(unsupported(columns::TEXT, text_field.data_type()));
        }

        let mut passthrough = vec![];
        for field in schema.fields().iter() {
            let column = field.name().as_str();
            if column == columns::AUDIO || column == columns::TEXT {
                continue;
            }
            let kind = ColumnKind::of(field.data_type())
                .ok_or_else(|| unsupported(column, field.data_type()))?;
            passthrough.push((column.to_string(), kind));
        }

        Ok(Self {
            name,
            schema,
            audio,
            passthrough,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn audio_layout(&self) -> &AudioLayout {
        &self.audio
    }

    /// Columns carried through unchanged.
    pub fn passthrough_columns(&self) -> impl Iterator<Item = &str> {
        self.passthrough.iter().map(|(name, _)| name.as_str())
    }

    /// Turn a record batch of this shard into samples numbered from `first_id`.
    pub fn decode(&self, batch: &RecordBatch, first_id: u64) -> CorpusResult<Vec<Sample>> {
        let rows = batch.num_rows();
        let audio = self.decode_audio(self.column(batch, columns::AUDIO)?)?;
        let text = self.decode_text(self.column(batch, columns::TEXT)?)?;

        let mut meta_columns = Vec::with_capacity(self.passthrough.len());
        for (column, kind) in &self.passthrough {
            let values = decode_meta(self.column(batch, column)?, *kind)
                .map_err(|e| self.arrow_error(column, e))?;
            meta_columns.push((column.as_str(), values));
        }

        let mut samples = Vec::with_capacity(rows);
        for (row, (audio, text)) in audio.into_iter().zip(text).enumerate() {
            let metadata: BTreeMap<String, MetaValue> = meta_columns
                .iter()
                .map(|(column, values)| (column.to_string(), values[row].clone()))
                .collect();
            samples.push(Sample {
                row_id: RowId(first_id + row as u64),
                source: self.name.clone(),
                audio,
                text,
                metadata,
                split_from: None,
            });
        }
        Ok(samples)
    }

    /// Build a record batch with this shard's schema from `rows`.
    pub fn encode(&self, rows: &[&Sample]) -> CorpusResult<RecordBatch> {
        let mut arrays = Vec::with_capacity(self.schema.fields().len());
        for field in self.schema.fields().iter() {
            let column = field.name().as_str();
            let array: ArrayRef = match column {
                columns::AUDIO => self.encode_audio(rows)?,
                columns::TEXT => Arc::new(LargeStringArray::from_iter_values(
                    rows.iter().map(|r| r.text.as_str()),
                )),
                _ => {
                    let kind = self
                        .passthrough
                        .iter()
                        .find(|(name, _)| name == column)
                        .map(|(_, kind)| *kind)
                        .ok_or_else(|| {
                            CorpusError::export(format!(
                                "Shard {} has no mapping for column '{column}'",
                                self.name
                            ))
                        })?;
                    encode_meta(kind, rows.iter().map(|r| r.meta(column)))
                }
            };
            let array = cast(&array, field.data_type()).map_err(|e| self.export_error(column, e))?;
            arrays.push(array);
        }

        RecordBatch::try_new(self.schema.clone(), arrays)
            .map_err(|e| CorpusError::export(format!("Shard {}: {e}", self.name)))
    }

    fn column<'a>(&self, batch: &'a RecordBatch, column: &str) -> CorpusResult<&'a ArrayRef> {
        batch
            .column_by_name(column)
            .ok_or_else(|| CorpusError::MissingColumn {
                shard: self.name.clone(),
                column: column.to_string(),
            })
    }

    fn decode_audio(&self, array: &ArrayRef) -> CorpusResult<Vec<AudioBlob>> {
        match &self.audio {
            AudioLayout::Binary => {
                let bytes = binary_values(array).map_err(|e| self.arrow_error(columns::AUDIO, e))?;
                Ok(bytes
                    .into_iter()
                    .map(|b| b.map(AudioBlob::new).unwrap_or_default())
                    .collect())
            }
            AudioLayout::Struct { .. } => {
                let audio = array.as_struct();
                let bytes = audio
                    .column_by_name(columns::AUDIO_BYTES)
                    .ok_or_else(|| CorpusError::MissingColumn {
                        shard: self.name.clone(),
                        column: "audio.bytes".to_string(),
                    })?;
                let bytes =
                    binary_values(bytes).map_err(|e| self.arrow_error(columns::AUDIO, e))?;
                let paths = match audio.column_by_name(columns::AUDIO_PATH) {
                    Some(paths) => {
                        string_values(paths).map_err(|e| self.arrow_error(columns::AUDIO, e))?
                    }
                    None => vec![None; audio.len()],
                };

                Ok(bytes
                    .into_iter()
                    .zip(paths)
                    .enumerate()
                    .map(|(row, (bytes, path))| {
                        if audio.is_null(row) {
                            return AudioBlob::default();
                        }
                        let mut blob = bytes.map(AudioBlob::new).unwrap_or_default();
                        blob.path = path;
                        blob
                    })
                    .collect())
            }
        }
    }

    fn decode_text(&self, array: &ArrayRef) -> CorpusResult<Vec<String>> {
        let values = string_values(array).map_err(|e| self.arrow_error(columns::TEXT, e))?;
        Ok(values.into_iter().map(Option::unwrap_or_default).collect())
    }

    fn encode_audio(&self, rows: &[&Sample]) -> CorpusResult<ArrayRef> {
        let bytes: ArrayRef = Arc::new(LargeBinaryArray::from_iter_values(
            rows.iter().map(|r| &r.audio.bytes[..]),
        ));

        let AudioLayout::Struct { fields } = &self.audio else {
            return Ok(bytes);
        };

        let mut children = Vec::with_capacity(fields.len());
        for child in fields.iter() {
            let array: ArrayRef = match child.name().as_str() {
                columns::AUDIO_BYTES => bytes.clone(),
                columns::AUDIO_PATH if child.is_nullable() => Arc::new(StringArray::from_iter(
                    rows.iter().map(|r| r.audio.path.as_deref()),
                )),
                columns::AUDIO_PATH => Arc::new(StringArray::from_iter_values(
                    rows.iter().map(|r| r.audio.path.as_deref().unwrap_or_default()),
                )),
                other => {
                    return Err(CorpusError::export(format!(
                        "Shard {} has unexpected audio field '{other}'",
                        self.name
                    )))
                }
            };
            children.push(
                cast(&array, child.data_type())
                    .map_err(|e| self.export_error(columns::AUDIO, e))?,
            );
        }

        let audio = StructArray::try_new(fields.clone(), children, None)
            .map_err(|e| self.export_error(columns::AUDIO, e))?;
        Ok(Arc::new(audio))
    }

    fn arrow_error(&self, column: &str, e: ArrowError) -> CorpusError {
        CorpusError::load(format!("Shard {} column '{column}': {e}", self.name))
    }

    fn export_error(&self, column: &str, e: ArrowError) -> CorpusError {
        CorpusError::export(format!("Shard {} column '{column}': {e}", self.name))
    }
}

// Large offsets so a batch may hold more than 2 GiB.
fn binary_values(array: &ArrayRef) -> Result<Vec<Option<Arc<[u8]>>>, ArrowError> {
    let array = cast(array, &DataType::LargeBinary)?;
    Ok(array
        .as_binary::<i64>()
        .iter()
        .map(|v| v.map(Arc::from))
        .collect())
}

fn string_values(array: &ArrayRef) -> Result<Vec<Option<String>>, ArrowError> {
    let array = cast(array, &DataType::LargeUtf8)?;
    Ok(array
        .as_string::<i64>()
        .iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

fn decode_meta(array: &ArrayRef, kind: ColumnKind) -> Result<Vec<MetaValue>, ArrowError> {
    let array = cast(array, &kind.canonical_type())?;
    let values = match kind {
        ColumnKind::Int => array
            .as_primitive::<Int64Type>()
            .iter()
            .map(|v| v.map_or(MetaValue::Null, MetaValue::Int))
            .collect(),
        ColumnKind::Float => array
            .as_primitive::<Float64Type>()
            .iter()
            .map(|v| v.map_or(MetaValue::Null, MetaValue::Float))
            .collect(),
        ColumnKind::Str => array
            .as_string::<i32>()
            .iter()
            .map(|v| v.map_or(MetaValue::Null, |s| MetaValue::Str(s.to_string())))
            .collect(),
        ColumnKind::Bool => array
            .as_boolean()
            .iter()
            .map(|v| v.map_or(MetaValue::Null, MetaValue::Bool))
            .collect(),
    };
    Ok(values)
}

fn encode_meta<'a>(
    kind: ColumnKind,
    values: impl Iterator<Item = Option<&'a MetaValue>>,
) -> ArrayRef {
    let values = values.map(|v| v.unwrap_or(&MetaValue::Null));
    match kind {
        ColumnKind::Int => Arc::new(Int64Array::from_iter(values.map(|v| match v {
            MetaValue::Int(i) => Some(*i),
            MetaValue::Bool(b) => Some(i64::from(*b)),
            MetaValue::Float(f) => Some(*f as i64),
            MetaValue::Str(s) => s.trim().parse().ok(),
            MetaValue::Null => None,
        }))),
        ColumnKind::Float => Arc::new(Float64Array::from_iter(values.map(|v| match v {
            MetaValue::Float(f) => Some(*f),
            MetaValue::Int(i) => Some(*i as f64),
            MetaValue::Str(s) => s.trim().parse().ok(),
            MetaValue::Bool(_) | MetaValue::Null => None,
        }))),
        ColumnKind::Str => Arc::new(StringArray::from_iter(
            values.map(|v| (!v.is_null()).then(|| v.to_string())),
        )),
        ColumnKind::Bool => Arc::new(BooleanArray::from_iter(values.map(|v| match v {
            MetaValue::Bool(b) => Some(*b),
            MetaValue::Int(i) => Some(*i != 0),
            _ => None,
        }))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::BinaryArray;
    use arrow::datatypes::{Field, Schema};

    fn audio_struct() -> DataType {
        DataType::Struct(Fields::from(vec![
            Field::new("bytes", DataType::Binary, true),
            Field::new("path", DataType::Utf8, true),
        ]))
    }

    fn vimd_schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("region", DataType::Utf8, true),
            Field::new("province_code", DataType::Int32, true),
            Field::new("audio", audio_struct(), true),
            Field::new("text", DataType::LargeUtf8, true),
            Field::new("gender", DataType::Int64, true),
        ]))
    }

    fn vimd_batch() -> RecordBatch {
        let audio_fields = match audio_struct() {
            DataType::Struct(fields) => fields,
            _ => unreachable!(),
        };
        let audio = StructArray::try_new(
            audio_fields,
            vec![
                Arc::new(BinaryArray::from_iter_values([b"RIFF-a".as_slice(), b"RIFF-b".as_slice()])),
                Arc::new(StringArray::from(vec![Some("a.wav"), None])),
            ],
            None,
        )
        .unwrap();
        RecordBatch::try_new(
            vimd_schema(),
            vec![
                Arc::new(StringArray::from(vec![Some("North"), None])),
                Arc::new(arrow::array::Int32Array::from(vec![1, 79])),
                Arc::new(audio),
                Arc::new(arrow::array::LargeStringArray::from(vec![Some("một"), None])),
                Arc::new(Int64Array::from(vec![1, 0])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_schema_requires_audio_and_text() {
        let schema = Arc::new(Schema::new(vec![Field::new("text", DataType::Utf8, true)]));
        let err = ShardSchema::new("s.parquet", schema).unwrap_err();
        assert!(matches!(err, CorpusError::MissingColumn { column, .. } if column == "audio"));
    }

    #[test]
    fn test_nested_passthrough_is_rejected() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("audio", DataType::Binary, false),
            Field::new("text", DataType::Utf8, false),
            Field::new(
                "tags",
                DataType::List(Arc::new(Field::new("item", DataType::Utf8, true))),
                true,
            ),
        ]));
        let err = ShardSchema::new("s.parquet", schema).unwrap_err();
        assert!(matches!(err, CorpusError::UnsupportedColumn { column, .. } if column == "tags"));
    }

    #[test]
    fn test_decode_normalizes_columns() {
        let shard = ShardSchema::new("s.parquet", vimd_schema()).unwrap();
        let samples = shard.decode(&vimd_batch(), 10).unwrap();

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].row_id, RowId(10));
        assert_eq!(samples[1].row_id, RowId(11));
        assert_eq!(&samples[0].audio.bytes[..], b"RIFF-a");
        assert_eq!(samples[0].audio.path.as_deref(), Some("a.wav"));
        assert_eq!(samples[1].text, "");
        assert_eq!(samples[1].meta("province_code"), Some(&MetaValue::Int(79)));
        assert_eq!(samples[1].meta("region"), Some(&MetaValue::Null));
        assert_eq!(samples[0].source, "s.parquet");
    }

    #[test]
    fn test_encode_restores_declared_types() {
        let shard = ShardSchema::new("s.parquet", vimd_schema()).unwrap();
        let mut samples = shard.decode(&vimd_batch(), 0).unwrap();
        samples[1].text = "hai".to_string();

        let rows: Vec<&Sample> = samples.iter().collect();
        let batch = shard.encode(&rows).unwrap();

        assert_eq!(batch.schema(), vimd_schema());
        assert_eq!(batch.num_rows(), 2);
        let text = batch.column(3).as_string::<i64>();
        assert_eq!(text.value(1), "hai");
        let codes = batch.column(1).as_primitive::<arrow::datatypes::Int32Type>();
        assert_eq!(codes.value(1), 79);
        let audio = batch.column(2).as_struct();
        assert!(audio.column(1).is_null(1));
    }

    #[test]
    fn test_plain_binary_audio_round_trips() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("audio", DataType::LargeBinary, false),
            Field::new("text", DataType::Utf8, false),
        ]));
        let shard = ShardSchema::new("b.parquet", schema.clone()).unwrap();
        assert_eq!(shard.audio_layout(), &AudioLayout::Binary);

        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(arrow::array::LargeBinaryArray::from_iter_values([b"wav".as_slice()])),
                Arc::new(StringArray::from(vec!["x"])),
            ],
        )
        .unwrap();
        let samples = shard.decode(&batch, 0).unwrap();
        let rows: Vec<&Sample> = samples.iter().collect();
        let encoded = shard.encode(&rows).unwrap();
        assert_eq!(encoded.schema(), schema);
        assert_eq!(encoded.column(0).as_binary::<i64>().value(0), b"wav");
    }
}
