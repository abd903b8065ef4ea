use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use crossbeam_channel::unbounded;
use log::{error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

use svg2wincur::config::{Config, RendererKind};
use svg2wincur::event::{BatchSummary, GenMsg};
use svg2wincur::generator_worker::GeneratorWorker;
use svg2wincur::pipeline::rasterizer::{InkscapeRasterizer, ResvgRasterizer, Retrying};
use svg2wincur::pipeline::wincur::describe;

const DEFAULT_CONFIG_FILE: &str = "svg2wincur.toml";

#[derive(Parser)]
#[command(name = "svg2wincur")]
#[command(version)]
#[command(about = "Generate Windows .cur and .ani cursors from SVG drawings", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Generate cursors for every drawing in the input directory (default)
    Generate(GenerateArgs),
    /// Print the structure of a .cur or .ani file
    Inspect {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Write a configuration file with the default settings
    InitConfig {
        #[arg(value_name = "FILE", default_value = DEFAULT_CONFIG_FILE)]
        file: PathBuf,
    },
}

#[derive(Args, Default)]
struct GenerateArgs {
    /// Configuration file (defaults to ./svg2wincur.toml when present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory containing the .svg drawings
    #[arg(short, long, value_name = "DIR")]
    input: Option<PathBuf>,

    /// Directory receiving the .cur and .ani files
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Also keep every rendered image as PNG under this directory
    #[arg(long, value_name = "DIR")]
    png_dir: Option<PathBuf>,

    /// Output resolution; repeat for several
    #[arg(short, long = "resolution", value_name = "R")]
    resolutions: Vec<u32>,

    /// Worker threads (0 = one per core)
    #[arg(short = 'j', long, value_name = "N")]
    threads: Option<usize>,

    /// Retries after a transient renderer crash
    #[arg(long, value_name = "N")]
    retries: Option<u32>,

    #[arg(long, value_enum)]
    renderer: Option<RendererKind>,

    /// Regenerate cursors even when they are newer than their drawing
    #[arg(short, long, default_value_t = false)]
    force: bool,
}

impl GenerateArgs {
    fn resolve_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load_from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Config::load_from_file(DEFAULT_CONFIG_FILE)
                    .with_context(|| format!("Failed to load config {}", DEFAULT_CONFIG_FILE))?
            }
            None => Config::default(),
        };

        if let Some(input) = self.input {
            config.input_dir = input;
        }
        if let Some(output) = self.output {
            config.output_dir = output;
        }
        if self.png_dir.is_some() {
            config.png_dir = self.png_dir;
        }
        if !self.resolutions.is_empty() {
            config.resolutions = self.resolutions;
        }
        if let Some(threads) = self.threads {
            config.thread_count = threads;
        }
        if let Some(retries) = self.retries {
            config.render_retries = retries;
        }
        if let Some(renderer) = self.renderer {
            config.renderer = renderer;
        }
        config.force |= self.force;

        Ok(config)
    }
}

fn main() {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let cli = Cli::parse();
    let result = match cli.command.unwrap_or(Command::Generate(GenerateArgs::default())) {
        Command::Generate(args) => run_generate(args),
        Command::Inspect { file } => run_inspect(&file),
        Command::InitConfig { file } => run_init_config(&file),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run_generate(args: GenerateArgs) -> Result<()> {
    let config = args.resolve_config()?;
    info!(
        "Generating cursors from {} into {} at {:?}",
        config.input_dir.display(),
        config.output_dir.display(),
        config.resolutions
    );

    let (tx, rx) = unbounded();
    let worker = GeneratorWorker::new(tx);
    let retries = config.render_retries;
    let renderer = config.renderer;
    let handle = match renderer {
        RendererKind::Resvg => worker.start(config, Retrying::new(ResvgRasterizer::new(), retries)),
        RendererKind::Inkscape => {
            let inkscape = InkscapeRasterizer::new(config.inkscape_path.clone());
            worker.start(config, Retrying::new(inkscape, retries))
        }
    };
    drop(worker);

    let mut summary: Option<BatchSummary> = None;
    for msg in rx.iter() {
        match msg {
            GenMsg::Started(0) => warn!("No drawings found"),
            GenMsg::Started(total) => info!("Found {} drawing(s)", total),
            GenMsg::Skipped(path) => info!("{}: up to date", path.display()),
            GenMsg::Warning { path, message } => warn!("{}: {}", path.display(), message),
            GenMsg::Generated { path, output } => {
                info!("{}: wrote {}", path.display(), output.display())
            }
            GenMsg::Failed { path, error } => error!("{}: {}", path.display(), error),
            GenMsg::ExtraFileCopied(path) => info!("Copied {}", path.display()),
            GenMsg::Finished(s) => summary = Some(s),
        }
    }

    if handle.join().is_err() {
        bail!("Generator thread panicked");
    }

    let Some(summary) = summary else {
        bail!("Generation did not complete");
    };
    info!(
        "Done: {} generated, {} up to date, {} failed, {} copy failure(s), {} warning(s)",
        summary.generated,
        summary.skipped,
        summary.failed,
        summary.copy_failures,
        summary.warnings
    );
    match (summary.failed, summary.copy_failures) {
        (0, 0) => Ok(()),
        (failed, 0) => bail!("{} drawing(s) failed", failed),
        (0, copies) => bail!("{} extra file(s) could not be copied", copies),
        (failed, copies) => bail!(
            "{} drawing(s) failed, {} extra file(s) could not be copied",
            failed,
            copies
        ),
    }
}

fn run_inspect(file: &Path) -> Result<()> {
    let data = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let text = describe(&data).with_context(|| format!("Failed to inspect {}", file.display()))?;
    print!("{}", text);
    Ok(())
}

fn run_init_config(file: &Path) -> Result<()> {
    if file.exists() {
        bail!("{} already exists", file.display());
    }
    Config::default()
        .save_to_file(file)
        .with_context(|| format!("Failed to write {}", file.display()))?;
    info!("Wrote {}", file.display());
    Ok(())
}
