//! Line-oriented editing session.
//!
//! Each input line is parsed with clap and run against the loaded dataset.
//! Sample numbers typed by the operator are 1-based.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use corpusedit_common::error::{CorpusError, CorpusResult};
use corpusedit_dataset::{Dataset, EditOp, EditOutcome, Exporter};

use crate::commands::show::render;

/// What the session loop should do after a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Continue(String),
    Quit(String),
}

#[derive(Parser)]
#[command(no_binary_name = true, name = "session", disable_version_flag = true)]
struct SessionLine {
    #[command(subcommand)]
    command: SessionCommand,
}

#[derive(Subcommand)]
enum SessionCommand {
    /// Show the current sample
    Show,

    /// Move to the next sample
    #[command(alias = "n")]
    Next,

    /// Move to the previous sample
    #[command(alias = "p")]
    Prev,

    /// Jump to sample N (1-based)
    Goto { number: usize },

    /// Replace the transcript of the current sample
    #[command(arg_required_else_help = true)]
    Text {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        words: Vec<String>,
    },

    /// Restore the original transcript
    ResetText,

    /// Keep [START, END) milliseconds; audio after END becomes a new sample
    Trim {
        #[arg(allow_negative_numbers = true)]
        start_ms: f64,
        #[arg(allow_negative_numbers = true)]
        end_ms: f64,
    },

    /// Restore the original audio
    ResetAudio,

    /// Delete the current sample
    Delete,

    /// Write the current sample's WAV to PATH
    Dump {
        path: PathBuf,

        /// Write the audio as loaded instead of as edited
        #[arg(long)]
        original: bool,
    },

    /// Save edited shards to the output directory
    Save,

    /// Leave the session
    #[command(alias = "exit", alias = "q")]
    Quit,
}

/// An editing session over one loaded dataset.
pub struct Session {
    dataset: Dataset,
    current: usize,
    exporter: Exporter,
    unsaved: bool,
    quit_warned: bool,
}

impl Session {
    pub fn new(dataset: Dataset, exporter: Exporter) -> Self {
        Self {
            dataset,
            current: 0,
            exporter,
            unsaved: false,
            quit_warned: false,
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    /// Prompt text, e.g. `3/120*` when there are unsaved edits.
    pub fn prompt(&self) -> String {
        let marker = if self.unsaved { "*" } else { "" };
        format!("{}/{}{marker}", self.current + 1, self.dataset.len())
    }

    pub fn render_current(&self) -> CorpusResult<String> {
        Ok(render(&self.dataset.sample_view(self.current)?))
    }

    /// Run one input line.
    pub fn execute(&mut self, line: &str) -> CorpusResult<Reply> {
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.is_empty() {
            return Ok(Reply::Continue(String::new()));
        }
        let command = match SessionLine::try_parse_from(words) {
            Ok(parsed) => parsed.command,
            Err(e) => return Ok(Reply::Continue(e.render().to_string().trim_end().to_string())),
        };

        let message = match command {
            SessionCommand::Show => self.render_current()?,
            SessionCommand::Next => {
                self.current = self.dataset.clamp_index(self.current, 1);
                self.render_current()?
            }
            SessionCommand::Prev => {
                self.current = self.dataset.clamp_index(self.current, -1);
                self.render_current()?
            }
            SessionCommand::Goto { number: 0 } => {
                format!("Sample numbers start at 1 (1-{}).", self.dataset.len())
            }
            SessionCommand::Goto { number } => {
                let index = number - 1;
                if index >= self.dataset.len() {
                    return Err(CorpusError::IndexOutOfRange {
                        index,
                        len: self.dataset.len(),
                    });
                }
                self.current = index;
                self.render_current()?
            }
            SessionCommand::Text { words } => self.edit(EditOp::SetText {
                index: self.current,
                text: words.join(" "),
            })?,
            SessionCommand::ResetText => self.edit(EditOp::ResetText {
                index: self.current,
            })?,
            SessionCommand::Trim { start_ms, end_ms } => self.edit(EditOp::Trim {
                index: self.current,
                start_ms,
                end_ms,
            })?,
            SessionCommand::ResetAudio => self.edit(EditOp::ResetAudio {
                index: self.current,
            })?,
            SessionCommand::Delete => {
                let message = self.edit(EditOp::Delete {
                    index: self.current,
                })?;
                format!("{message}. {} samples left.", self.dataset.len())
            }
            SessionCommand::Dump { path, original } => {
                let audio = if original {
                    &self.dataset.original(self.current)?.audio
                } else {
                    &self.dataset.sample(self.current)?.audio
                };
                std::fs::write(&path, &audio.bytes)?;
                format!("Wrote {} bytes to {}", audio.bytes.len(), path.display())
            }
            SessionCommand::Save => match self.exporter.save(&self.dataset)? {
                Some(report) => {
                    self.unsaved = false;
                    report.summary()
                }
                None => "No changes to save.".to_string(),
            },
            SessionCommand::Quit => {
                if self.unsaved && !self.quit_warned {
                    self.quit_warned = true;
                    return Ok(Reply::Continue(
                        "Unsaved changes. Run 'save', or 'quit' again to discard them.".to_string(),
                    ));
                }
                return Ok(Reply::Quit("Bye.".to_string()));
            }
        };
        Ok(Reply::Continue(message))
    }

    fn edit(&mut self, op: EditOp) -> CorpusResult<String> {
        let outcome = self.dataset.apply(&op)?;
        self.current = outcome.focus();
        self.unsaved = true;
        self.quit_warned = false;
        if let EditOutcome::Trimmed(trim) = &outcome {
            tracing::debug!(index = trim.index, remainder = ?trim.remainder, "Trim applied");
        }
        Ok(outcome.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corpusedit_audio::{read_info, SampleFormat, Samples, WavClip, WavSpec};
    use corpusedit_corpus_model::{columns, AudioBlob, MetaValue, RowId, Sample};
    use std::collections::BTreeMap;

    fn wav(ms: u32) -> Vec<u8> {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 1000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        WavClip::from_samples(spec, Samples::Int(vec![0; ms as usize]))
            .unwrap()
            .encode()
            .unwrap()
    }

    fn session(rows: u64) -> Session {
        let samples = (0..rows)
            .map(|i| {
                let mut metadata = BTreeMap::new();
                metadata.insert(
                    columns::FILENAME.to_string(),
                    MetaValue::Str(format!("f{i}.wav")),
                );
                Sample {
                    row_id: RowId(i),
                    source: "s.parquet".to_string(),
                    audio: AudioBlob::new(wav(1000)),
                    text: format!("line {i}"),
                    metadata,
                    split_from: None,
                }
            })
            .collect();
        let dataset = Dataset::new(vec![], samples).unwrap();
        Session::new(dataset, Exporter::new("unused-output", "_edited"))
    }

    fn message(reply: Reply) -> String {
        match reply {
            Reply::Continue(m) | Reply::Quit(m) => m,
        }
    }

    #[test]
    fn test_navigation_clamps() {
        let mut s = session(3);
        s.execute("prev").unwrap();
        assert_eq!(s.current(), 0);
        s.execute("next").unwrap();
        s.execute("n").unwrap();
        s.execute("next").unwrap();
        assert_eq!(s.current(), 2);
        let shown = message(s.execute("goto 2").unwrap());
        assert!(shown.starts_with("Sample 2/3"));
        assert_eq!(s.prompt(), "2/3");
    }

    #[test]
    fn test_goto_out_of_range_is_user_error() {
        let mut s = session(3);
        s.execute("goto 2").unwrap();
        let err = s.execute("goto 4").unwrap_err();
        assert!(err.is_user_error());
        assert!(matches!(err, CorpusError::IndexOutOfRange { index: 3, len: 3 }));
        assert_eq!(s.current(), 1);
    }

    #[test]
    fn test_goto_zero_explains_numbering() {
        let mut s = session(3);
        s.execute("goto 3").unwrap();
        let reply = message(s.execute("goto 0").unwrap());
        assert_eq!(reply, "Sample numbers start at 1 (1-3).");
        assert_eq!(s.current(), 2);
    }

    #[test]
    fn test_text_joins_words_and_marks_unsaved() {
        let mut s = session(2);
        s.execute("goto 2").unwrap();
        let reply = message(s.execute("text xin  chào - bạn").unwrap());
        assert_eq!(reply, "Updated text of sample 2");
        assert_eq!(s.dataset().sample(1).unwrap().text, "xin chào - bạn");
        assert!(s.has_unsaved_changes());
        assert_eq!(s.prompt(), "2/2*");
    }

    #[test]
    fn test_trim_reports_split() {
        let mut s = session(1);
        let reply = message(s.execute("trim 0 400").unwrap());
        assert_eq!(reply, "Trimmed sample 1 to 0.40s; remaining 0.60s saved as sample 2");
        assert_eq!(s.dataset().len(), 2);
        assert!(s.execute("trim 500 100").unwrap_err().is_user_error());
        assert!(s.execute("trim -5 100").unwrap_err().is_user_error());
    }

    #[test]
    fn test_delete_moves_to_neighbour() {
        let mut s = session(3);
        s.execute("goto 3").unwrap();
        let reply = message(s.execute("delete").unwrap());
        assert_eq!(reply, "Deleted sample 3. 2 samples left.");
        assert_eq!(s.current(), 1);
        s.execute("delete").unwrap();
        assert!(matches!(
            s.execute("delete"),
            Err(CorpusError::LastSample)
        ));
    }

    #[test]
    fn test_quit_warns_once_about_unsaved_changes() {
        let mut s = session(1);
        assert!(matches!(s.execute("quit").unwrap(), Reply::Quit(_)));

        s.execute("text edited").unwrap();
        assert!(matches!(s.execute("quit").unwrap(), Reply::Continue(_)));
        assert!(matches!(s.execute("exit").unwrap(), Reply::Quit(_)));
    }

    #[test]
    fn test_save_without_changes() {
        let mut s = session(1);
        let reply = message(s.execute("save").unwrap());
        assert_eq!(reply, "No changes to save.");
    }

    #[test]
    fn test_dump_writes_current_or_original_audio() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(1);
        s.execute("trim 0 250").unwrap();

        let edited = dir.path().join("edited.wav");
        let original = dir.path().join("original.wav");
        s.execute(&format!("dump {}", edited.display())).unwrap();
        s.execute(&format!("dump {} --original", original.display()))
            .unwrap();

        let edited = read_info(&std::fs::read(edited).unwrap()).unwrap();
        let original = read_info(&std::fs::read(original).unwrap()).unwrap();
        assert!((edited.duration_ms() - 250.0).abs() < 1e-9);
        assert!((original.duration_ms() - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_commands_and_blank_lines_continue() {
        let mut s = session(1);
        assert_eq!(s.execute("   ").unwrap(), Reply::Continue(String::new()));
        let reply = message(s.execute("frobnicate").unwrap());
        assert!(reply.contains("frobnicate"));
        let help = message(s.execute("help").unwrap());
        assert!(help.contains("reset-audio"));
    }
}
