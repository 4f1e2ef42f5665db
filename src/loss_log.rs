//! Sinks for the per-epoch validation loss trace.
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Receives one validation loss for the initial state and one per epoch.
pub trait LossSink {
    fn record(&mut self, loss: f64) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Discards every value.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLossLog;

impl LossSink for NullLossLog {
    fn record(&mut self, _loss: f64) -> io::Result<()> {
        Ok(())
    }
}

/// Keeps values in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryLossLog {
    pub values: Vec<f64>,
}

impl LossSink for MemoryLossLog {
    fn record(&mut self, loss: f64) -> io::Result<()> {
        self.values.push(loss);
        Ok(())
    }
}

/// Text file with one loss per line. The file is truncated on creation.
#[derive(Debug)]
pub struct FileLossLog {
    path: PathBuf,
    out: BufWriter<File>,
}

impl FileLossLog {
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let out = BufWriter::new(File::create(&path)?);
        Ok(Self { path, out })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LossSink for FileLossLog {
    fn record(&mut self, loss: f64) -> io::Result<()> {
        writeln!(self.out, "{loss}")
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Wraps a sink so that the first write error is logged and every later
/// write is skipped. Training never fails because of the trace.
pub(crate) struct BestEffort<'a> {
    sink: &'a mut dyn LossSink,
    failed: bool,
}

impl<'a> BestEffort<'a> {
    pub(crate) fn new(sink: &'a mut dyn LossSink) -> Self {
        Self { sink, failed: false }
    }

    pub(crate) fn record(&mut self, loss: f64) {
        if self.failed {
            return;
        }
        if let Err(e) = self.sink.record(loss) {
            log::warn!("loss log write failed, disabling it for this run: {e}");
            self.failed = true;
        }
    }

    pub(crate) fn finish(mut self) {
        if self.failed {
            return;
        }
        if let Err(e) = self.sink.flush() {
            log::warn!("loss log flush failed: {e}");
        }
    }
}
