//! Command-line argument definitions for the Maquette CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Arguments control input/output paths, the diagram to
//! generate, configuration file selection, and logging verbosity.

use clap::Parser;

/// Command-line arguments for the Maquette modeling tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input model file (.json, .yaml, or .xmi)
    #[arg(help = "Path to the input model file")]
    pub input: String,

    /// Path to the output DOT file
    #[arg(short, long, default_value = "out.dot")]
    pub output: String,

    /// Diagram to generate (component, deployment, logical)
    #[arg(short, long, default_value = "logical")]
    pub diagram: String,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}
