use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    /// In-process rendering with resvg
    #[default]
    Resvg,
    /// An external Inkscape executable
    Inkscape,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Where intermediate PNG renders are kept, if anywhere.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub png_dir: Option<PathBuf>,
    pub resolutions: Vec<u32>,
    /// Worker threads; 0 lets rayon decide.
    pub thread_count: usize,
    pub render_retries: u32,
    pub force: bool,
    /// Copied verbatim into the output directory after a batch.
    pub extra_files: Vec<PathBuf>,
    pub renderer: RendererKind,
    pub inkscape_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("svgs"),
            output_dir: PathBuf::from("cursors"),
            png_dir: None,
            resolutions: vec![32, 48, 64],
            thread_count: 5,
            render_retries: 2,
            force: false,
            extra_files: Vec::new(),
            renderer: RendererKind::default(),
            inkscape_path: PathBuf::from("inkscape"),
        }
    }
}

impl Config {
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let content = self
            .to_toml_string()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        fs::write(path, content)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
