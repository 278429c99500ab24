use crate::error::Result;
use crate::results::OutputRecord;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tokio::sync::mpsc;

/// Serialization of the record stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Comma-separated with an `actor,title` header
    #[default]
    Csv,
    /// A single JSON array
    Json,
    /// One JSON object per line
    #[value(name = "jsonl")]
    #[serde(rename = "jsonl")]
    JsonLines,
}

impl OutputFormat {
    /// Infer the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            "jsonl" | "jl" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

enum Inner {
    Csv(csv::Writer<Box<dyn Write + Send>>),
    Json {
        out: Box<dyn Write + Send>,
        first: bool,
    },
    JsonLines(Box<dyn Write + Send>),
}

/// Writes output records to a file or stream
pub struct RecordSink {
    inner: Inner,
}

impl RecordSink {
    /// Create a sink writing `format` to `out`
    pub fn new(out: Box<dyn Write + Send>, format: OutputFormat) -> Self {
        let inner = match format {
            OutputFormat::Csv => Inner::Csv(csv::Writer::from_writer(out)),
            OutputFormat::Json => Inner::Json { out, first: true },
            OutputFormat::JsonLines => Inner::JsonLines(out),
        };
        Self { inner }
    }

    /// Create (or truncate) `path` and write records to it
    pub fn create(path: &Path, format: OutputFormat) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(Box::new(BufWriter::new(file)), format))
    }

    /// Write records to standard output
    pub fn stdout(format: OutputFormat) -> Self {
        Self::new(Box::new(BufWriter::new(io::stdout())), format)
    }

    /// Write one record
    pub fn write(&mut self, record: &OutputRecord) -> Result<()> {
        match &mut self.inner {
            Inner::Csv(writer) => writer.serialize(record)?,
            Inner::Json { out, first } => {
                out.write_all(if *first { b"[\n" } else { b",\n" })?;
                *first = false;
                serde_json::to_writer(&mut *out, record)?;
            }
            Inner::JsonLines(out) => {
                serde_json::to_writer(&mut *out, record)?;
                out.write_all(b"\n")?;
            }
        }
        Ok(())
    }

    /// Terminate the document and flush
    pub fn finish(mut self) -> Result<()> {
        match &mut self.inner {
            Inner::Csv(writer) => writer.flush()?,
            Inner::Json { out, first } => {
                out.write_all(if *first { b"[]\n" } else { b"\n]\n" })?;
                out.flush()?;
            }
            Inner::JsonLines(out) => out.flush()?,
        }
        Ok(())
    }
}

/// Write every record from `records` into `sink`, returning how many were written
pub async fn drain(records: &mut mpsc::Receiver<OutputRecord>, sink: &mut RecordSink) -> Result<usize> {
    let mut written = 0;
    while let Some(record) = records.recv().await {
        sink.write(&record)?;
        written += 1;
    }
    Ok(written)
}
