//! Fixture shards shaped like the production speech corpus.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    ArrayRef, BinaryArray, DictionaryArray, Int32Array, Int64Array, LargeStringArray, StringArray,
    StructArray,
};
use arrow::datatypes::{DataType, Field, Fields, Int32Type, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use corpusedit_audio::{SampleFormat, Samples, WavClip, WavSpec};

/// Mono 16-bit WAV at 1 kHz, so one frame is one millisecond.
pub fn wav_ms(ms: u32) -> Vec<u8> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: 1000,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    WavClip::from_samples(spec, Samples::Int(vec![7; ms as usize]))
        .unwrap()
        .encode()
        .unwrap()
}

pub fn audio_fields() -> Fields {
    Fields::from(vec![
        Field::new("bytes", DataType::Binary, true),
        Field::new("path", DataType::Utf8, true),
    ])
}

pub fn corpus_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("region", DataType::Utf8, true),
        Field::new("province_code", DataType::Int32, true),
        Field::new(
            "province_name",
            DataType::Dictionary(Box::new(DataType::Int32), Box::new(DataType::Utf8)),
            true,
        ),
        Field::new("filename", DataType::Utf8, true),
        Field::new("audio", DataType::Struct(audio_fields()), true),
        Field::new("text", DataType::LargeUtf8, true),
        Field::new("speakerID", DataType::Utf8, true),
        Field::new("gender", DataType::Int64, true),
    ]))
}

/// One fixture row: filename, transcript, and clip length.
pub struct Row<'a> {
    pub filename: &'a str,
    pub text: &'a str,
    pub ms: u32,
}

/// Write a shard whose rows all come from province 79.
pub fn write_corpus_shard(path: &Path, rows: &[Row<'_>]) {
    let n = rows.len();
    let audio = StructArray::try_new(
        audio_fields(),
        vec![
            Arc::new(BinaryArray::from_iter_values(rows.iter().map(|r| wav_ms(r.ms)))),
            Arc::new(StringArray::from_iter_values(
                rows.iter().map(|r| format!("raw/{}", r.filename)),
            )),
        ],
        None,
    )
    .unwrap();
    let province_name: DictionaryArray<Int32Type> =
        std::iter::repeat("Hồ Chí Minh").take(n).collect();

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(std::iter::repeat("South").take(n))),
        Arc::new(Int32Array::from(vec![79; n])),
        Arc::new(province_name),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.filename))),
        Arc::new(audio),
        Arc::new(LargeStringArray::from_iter_values(rows.iter().map(|r| r.text))),
        Arc::new(StringArray::from_iter_values(std::iter::repeat("spk01").take(n))),
        Arc::new(Int64Array::from(vec![1; n])),
    ];
    let batch = RecordBatch::try_new(corpus_schema(), columns).unwrap();

    let mut writer = ArrowWriter::try_new(File::create(path).unwrap(), corpus_schema(), None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
}

/// Read every row of a written shard back as one batch.
pub fn read_shard(path: &Path) -> RecordBatch {
    let reader = parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder::try_new(
        File::open(path).unwrap(),
    )
    .unwrap()
    .build()
    .unwrap();
    let batches: Vec<RecordBatch> = reader.map(Result::unwrap).collect();
    let schema = batches[0].schema();
    arrow::compute::concat_batches(&schema, &batches).unwrap()
}
