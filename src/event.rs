use std::path::PathBuf;

/// Totals reported once a batch is done.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub generated: usize,
    pub skipped: usize,
    /// Drawings that produced no cursor.
    pub failed: usize,
    /// Extra files that could not be copied into the output directory.
    pub copy_failures: usize,
    pub warnings: usize,
}

impl BatchSummary {
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.copy_failures == 0
    }
}

/// Progress messages sent from the generator worker.
#[derive(Clone, Debug)]
pub enum GenMsg {
    Started(usize),
    Skipped(PathBuf),
    Warning { path: PathBuf, message: String },
    Generated { path: PathBuf, output: PathBuf },
    Failed { path: PathBuf, error: String },
    ExtraFileCopied(PathBuf),
    Finished(BatchSummary),
}
