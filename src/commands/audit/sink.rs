use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::error;

struct Destination {
    label: String,
    writer: Box<dyn Write>,
}

/// Fans each report line out to every configured destination. Lines are
/// flushed as they are written; a failing destination loses the line but
/// never stops the audit.
#[derive(Default)]
pub struct ResultSink {
    destinations: Vec<Destination>,
    report_path: Option<PathBuf>,
}

impl ResultSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stdout(self) -> Self {
        self.with_writer("stdout", io::stdout())
    }

    pub fn with_file(mut self, path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("failed to create results file: {}", path.display()))?;
        self.report_path = Some(path.to_path_buf());
        Ok(self.with_writer("file", file))
    }

    pub fn with_writer(mut self, label: impl Into<String>, writer: impl Write + 'static) -> Self {
        self.destinations.push(Destination {
            label: label.into(),
            writer: Box::new(writer),
        });
        self
    }

    pub fn is_silent(&self) -> bool {
        self.destinations.is_empty()
    }

    pub fn report_path(&self) -> Option<&Path> {
        self.report_path.as_deref()
    }

    pub fn write(&mut self, line: &str) {
        for destination in &mut self.destinations {
            let written = destination
                .writer
                .write_all(line.as_bytes())
                .and_then(|()| destination.writer.flush());
            if let Err(err) = written {
                error!(
                    destination = %destination.label,
                    error = %err,
                    "error while writing result"
                );
            }
        }
    }
}
