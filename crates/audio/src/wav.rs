//! WAV clips held in memory.

use std::io::Cursor;

use hound::{WavReader, WavWriter};

pub use hound::{SampleFormat, WavSpec};

use corpusedit_common::error::{CorpusError, CorpusResult};

/// Format and length of an encoded clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    /// Samples per channel.
    pub frames: u64,
}

impl WavInfo {
    pub fn duration_ms(&self) -> f64 {
        frames_to_ms(self.frames, self.sample_rate)
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_ms() / 1000.0
    }
}

/// Read the header of an encoded WAV without decoding its samples.
pub fn read_info(bytes: &[u8]) -> CorpusResult<WavInfo> {
    let reader = WavReader::new(Cursor::new(bytes))
        .map_err(|e| CorpusError::audio(format!("Failed to read WAV header: {e}")))?;
    let spec = reader.spec();
    Ok(WavInfo {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        bits_per_sample: spec.bits_per_sample,
        frames: reader.duration() as u64,
    })
}

/// Interleaved sample storage.
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    Int(Vec<i32>),
    Float(Vec<f32>),
}

impl Samples {
    fn len(&self) -> usize {
        match self {
            Self::Int(s) => s.len(),
            Self::Float(s) => s.len(),
        }
    }

    fn slice(&self, start: usize, end: usize) -> Self {
        match self {
            Self::Int(s) => Self::Int(s[start..end].to_vec()),
            Self::Float(s) => Self::Float(s[start..end].to_vec()),
        }
    }
}

/// A decoded clip.
#[derive(Debug, Clone, PartialEq)]
pub struct WavClip {
    spec: WavSpec,
    samples: Samples,
}

impl WavClip {
    /// Build a clip from interleaved samples.
    pub fn from_samples(spec: WavSpec, samples: Samples) -> CorpusResult<Self> {
        let format_matches = matches!(
            (&samples, spec.sample_format),
            (Samples::Int(_), SampleFormat::Int) | (Samples::Float(_), SampleFormat::Float)
        );
        if !format_matches {
            return Err(CorpusError::audio(
                "Sample storage does not match the WAV sample format",
            ));
        }
        if spec.channels == 0 || samples.len() % spec.channels as usize != 0 {
            return Err(CorpusError::audio(format!(
                "{} samples cannot be split into {} channels",
                samples.len(),
                spec.channels
            )));
        }
        Ok(Self { spec, samples })
    }

    /// Decode WAV bytes.
    pub fn decode(bytes: &[u8]) -> CorpusResult<Self> {
        let reader = WavReader::new(Cursor::new(bytes))
            .map_err(|e| CorpusError::audio(format!("Failed to read WAV header: {e}")))?;
        let spec = reader.spec();

        let samples = match spec.sample_format {
            SampleFormat::Int => Samples::Int(
                reader
                    .into_samples::<i32>()
                    .collect::<Result<_, _>>()
                    .map_err(|e| CorpusError::audio(format!("Failed to decode samples: {e}")))?,
            ),
            SampleFormat::Float => Samples::Float(
                reader
                    .into_samples::<f32>()
                    .collect::<Result<_, _>>()
                    .map_err(|e| CorpusError::audio(format!("Failed to decode samples: {e}")))?,
            ),
        };

        Self::from_samples(spec, samples)
    }

    /// Encode back to WAV bytes with the clip's original format.
    pub fn encode(&self) -> CorpusResult<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, self.spec)
                .map_err(|e| CorpusError::audio(format!("Failed to start WAV writer: {e}")))?;
            let written = match &self.samples {
                Samples::Int(s) => s.iter().try_for_each(|v| writer.write_sample(*v)),
                Samples::Float(s) => s.iter().try_for_each(|v| writer.write_sample(*v)),
            };
            written.map_err(|e| CorpusError::audio(format!("Failed to write samples: {e}")))?;
            writer
                .finalize()
                .map_err(|e| CorpusError::audio(format!("Failed to finalize WAV: {e}")))?;
        }
        Ok(cursor.into_inner())
    }

    pub fn spec(&self) -> WavSpec {
        self.spec
    }

    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    /// Samples per channel.
    pub fn frames(&self) -> u64 {
        (self.samples.len() / self.spec.channels as usize) as u64
    }

    pub fn duration_ms(&self) -> f64 {
        frames_to_ms(self.frames(), self.spec.sample_rate)
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    /// Frame at millisecond position `ms`, clamped into the clip.
    pub fn frame_at_ms(&self, ms: f64) -> u64 {
        if ms.is_nan() || ms <= 0.0 {
            return 0;
        }
        let frame = (ms * self.spec.sample_rate as f64 / 1000.0).floor();
        (frame as u64).min(self.frames())
    }

    /// Frames `[start, end)`, clamped; inverted ranges are empty.
    pub fn slice_frames(&self, start: u64, end: u64) -> Self {
        let frames = self.frames();
        let start = start.min(frames);
        let end = end.clamp(start, frames);
        let channels = self.spec.channels as usize;
        Self {
            spec: self.spec,
            samples: self
                .samples
                .slice(start as usize * channels, end as usize * channels),
        }
    }

    /// Milliseconds `[start_ms, end_ms)`, clamped; inverted ranges are empty.
    pub fn slice_ms(&self, start_ms: f64, end_ms: f64) -> Self {
        self.slice_frames(self.frame_at_ms(start_ms), self.frame_at_ms(end_ms))
    }
}

/// Result of splitting a clip at a kept range.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitClip {
    /// Encoded `[start, end)` range.
    pub kept: Vec<u8>,
    pub kept_ms: f64,

    /// Encoded `[end, duration)` range, absent when nothing follows `end`.
    pub remainder: Option<Vec<u8>>,
    pub remainder_ms: f64,
}

/// Keep `[start_ms, end_ms)` of `bytes` and return what follows `end_ms`.
///
/// Audio before `start_ms` is dropped.
pub fn split_at_ms(bytes: &[u8], start_ms: f64, end_ms: f64) -> CorpusResult<SplitClip> {
    let clip = WavClip::decode(bytes)?;
    let kept = clip.slice_ms(start_ms, end_ms);
    let remainder = clip.slice_frames(clip.frame_at_ms(end_ms), clip.frames());

    tracing::debug!(
        start_ms,
        end_ms,
        total_ms = clip.duration_ms(),
        kept_frames = kept.frames(),
        remainder_frames = remainder.frames(),
        "Splitting clip"
    );

    Ok(SplitClip {
        kept: kept.encode()?,
        kept_ms: kept.duration_ms(),
        remainder_ms: remainder.duration_ms(),
        remainder: if remainder.is_empty() {
            None
        } else {
            Some(remainder.encode()?)
        },
    })
}

fn frames_to_ms(frames: u64, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    frames as f64 * 1000.0 / sample_rate as f64
}
