// Library exports for svg2wincur

pub mod config;
pub mod event;
pub mod generator_worker;
pub mod pipeline;

pub use pipeline::{generate, wincur};
