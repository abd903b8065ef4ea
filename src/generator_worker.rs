// Batch generation of every drawing in a directory on a worker pool

use anyhow::{Context, Result};
use crossbeam_channel::Sender;
use log::debug;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use walkdir::WalkDir;

use crate::config::Config;
use crate::event::{BatchSummary, GenMsg};
use crate::pipeline::drawing::{DrawingInfo, DrawingSource};
use crate::pipeline::fs_ops::{copy_into, ensure_dir, is_stale};
use crate::pipeline::png_writer::export_images;
use crate::pipeline::rasterizer::Rasterizer;
use crate::pipeline::wincur::CursorFormat;
use crate::pipeline::{Diagnostics, generate};

enum Outcome {
    Generated { warnings: usize },
    Skipped,
    Failed { warnings: usize },
}

pub struct GeneratorWorker {
    tx: Sender<GenMsg>,
}

impl GeneratorWorker {
    pub fn new(tx: Sender<GenMsg>) -> Self {
        Self { tx }
    }

    /// Runs the batch on a background thread. The last message sent is
    /// always `Finished`, or `Failed` when the batch could not start.
    pub fn start<R>(&self, config: Config, rasterizer: R) -> JoinHandle<()>
    where
        R: Rasterizer + Send + 'static,
    {
        let tx = self.tx.clone();

        thread::spawn(move || {
            if let Err(e) = Self::run(&config, &rasterizer, &tx) {
                let _ = tx.send(GenMsg::Failed {
                    path: config.input_dir.clone(),
                    error: format!("{:#}", e),
                });
            }
        })
    }

    pub fn run<R: Rasterizer>(
        config: &Config,
        rasterizer: &R,
        tx: &Sender<GenMsg>,
    ) -> Result<BatchSummary> {
        let drawings = scan_drawings(&config.input_dir)?;
        ensure_dir(&config.output_dir).with_context(|| {
            format!("Failed to create output directory {}", config.output_dir.display())
        })?;
        let _ = tx.send(GenMsg::Started(drawings.len()));

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.thread_count)
            .build()
            .context("Failed to build worker pool")?;

        let outcomes: Vec<Outcome> = pool.install(|| {
            drawings
                .par_iter()
                .map(|path| process_drawing(path, config, rasterizer, tx))
                .collect()
        });

        let mut summary = BatchSummary::default();
        for outcome in outcomes {
            match outcome {
                Outcome::Generated { warnings } => {
                    summary.generated += 1;
                    summary.warnings += warnings;
                }
                Outcome::Skipped => summary.skipped += 1,
                Outcome::Failed { warnings } => {
                    summary.failed += 1;
                    summary.warnings += warnings;
                }
            }
        }

        for file in &config.extra_files {
            match copy_into(file, &config.output_dir) {
                Ok(_) => {
                    let _ = tx.send(GenMsg::ExtraFileCopied(file.clone()));
                }
                Err(e) => {
                    summary.copy_failures += 1;
                    let _ = tx.send(GenMsg::Failed {
                        path: file.clone(),
                        error: format!("Failed to copy into {}: {}", config.output_dir.display(), e),
                    });
                }
            }
        }

        let _ = tx.send(GenMsg::Finished(summary.clone()));
        Ok(summary)
    }
}

/// `.svg` files directly inside `dir`, sorted by name.
pub fn scan_drawings(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut drawings = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry =
            entry.with_context(|| format!("Failed to read input directory {}", dir.display()))?;
        if entry.file_type().is_file() && DrawingSource::is_drawing(entry.path()) {
            drawings.push(entry.into_path());
        }
    }
    Ok(drawings)
}

/// Output path the drawing will produce. Unreadable drawings are assumed
/// static; generation reports the actual problem.
fn planned_output(source: &DrawingSource, output_dir: &Path) -> PathBuf {
    let kind = match DrawingInfo::read(&source.text) {
        Ok(info) if info.ani_config.is_some() => CursorFormat::Ani,
        _ => CursorFormat::Cur,
    };
    output_dir.join(format!("{}.{}", source.name, kind.extension()))
}

fn process_drawing<R: Rasterizer>(
    path: &Path,
    config: &Config,
    rasterizer: &R,
    tx: &Sender<GenMsg>,
) -> Outcome {
    let fail = |error: String, warnings: usize| {
        let _ = tx.send(GenMsg::Failed {
            path: path.to_path_buf(),
            error,
        });
        Outcome::Failed { warnings }
    };

    let source = match DrawingSource::load(path) {
        Ok(source) => source,
        Err(e) => return fail(format!("{:#}", e), 0),
    };

    if !config.force {
        let output = planned_output(&source, &config.output_dir);
        match is_stale(path, &output) {
            Ok(false) => {
                debug!("{} is up to date", output.display());
                let _ = tx.send(GenMsg::Skipped(path.to_path_buf()));
                return Outcome::Skipped;
            }
            Ok(true) => {}
            Err(e) => return fail(format!("Failed to check {}: {}", output.display(), e), 0),
        }
    }

    debug!("generating {}", path.display());
    let mut diags = Diagnostics::new();
    let result = generate(&source, rasterizer, &config.resolutions, &mut diags);

    let mut warnings = 0;
    for message in diags.warnings() {
        warnings += 1;
        let _ = tx.send(GenMsg::Warning {
            path: path.to_path_buf(),
            message: message.to_string(),
        });
    }

    let cursor = match result {
        Ok(cursor) => cursor,
        Err(e) => return fail(e.to_string(), warnings),
    };

    let output = config.output_dir.join(cursor.file_name());
    let written = fs::write(&output, &cursor.bytes)
        .with_context(|| format!("Failed to write {}", output.display()))
        .and_then(|_| match &config.png_dir {
            Some(png_dir) => export_images(&cursor, png_dir).map(|files| {
                debug!("exported {} image(s) for {}", files.len(), cursor.name);
            }),
            None => Ok(()),
        });

    match written {
        Ok(()) => {
            let _ = tx.send(GenMsg::Generated {
                path: path.to_path_buf(),
                output,
            });
            Outcome::Generated { warnings }
        }
        Err(e) => fail(format!("{:#}", e), warnings),
    }
}
