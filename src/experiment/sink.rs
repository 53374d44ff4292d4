//! Report destinations.
//!
//! The experiment report is plain text made of CSV-like fragments. The
//! driver only needs somewhere to append them; [`FileSink`] is the usual
//! choice, [`MemorySink`] keeps everything in memory.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{trace, warn};

/// An append-only text destination.
pub trait ReportSink {
    fn write_str(&mut self, text: &str) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Appends to a file held open for the sink's lifetime.
///
/// The handle is flushed and closed when the sink is dropped, whichever
/// way the run ended.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl FileSink {
    /// Opens `path` in append mode, creating missing parent directories.
    pub fn open_append(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSink for FileSink {
    fn write_str(&mut self, text: &str) -> io::Result<()> {
        self.writer.write_all(text.as_bytes())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Collects the report in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    buffer: String,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> &str {
        &self.buffer
    }

    pub fn into_string(self) -> String {
        self.buffer
    }
}

impl ReportSink for MemorySink {
    fn write_str(&mut self, text: &str) -> io::Result<()> {
        self.buffer.push_str(text);
        Ok(())
    }
}

/// Discards everything. Stands in when the report file cannot be opened.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ReportSink for NullSink {
    fn write_str(&mut self, _text: &str) -> io::Result<()> {
        Ok(())
    }
}

/// Best-effort writer over a sink: failures are logged, never raised.
pub(crate) struct Reporter<'a> {
    sink: &'a mut dyn ReportSink,
    failures: usize,
}

impl<'a> Reporter<'a> {
    pub(crate) fn new(sink: &'a mut dyn ReportSink) -> Self {
        Self { sink, failures: 0 }
    }

    pub(crate) fn emit(&mut self, text: &str) {
        trace!(target: "u_simlab::report", "{}", text);
        if let Err(err) = self.sink.write_str(text) {
            self.failures += 1;
            warn!(error = %err, "could not write to report sink");
        }
    }

    /// Flushes the sink and returns the number of failed writes.
    pub(crate) fn finish(mut self) -> usize {
        if let Err(err) = self.sink.flush() {
            self.failures += 1;
            warn!(error = %err, "could not flush report sink");
        }
        self.failures
    }
}
