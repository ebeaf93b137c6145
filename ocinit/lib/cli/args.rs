use std::path::PathBuf;

use clap::Parser;
use tracing::Level;

use super::styles;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// ocinit CLI - Convert an OCI image layout into a newc CPIO initramfs archive
#[derive(Debug, Parser)]
#[command(name = "ocinit", author, about, version, styles=styles::styles())]
pub struct OcinitArgs {
    /// The OCI layout directory to convert
    pub layout_dir: PathBuf,

    /// Write the archive to this file instead of standard output
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl OcinitArgs {
    /// Initialize the logging system with INFO or DEBUG level based on the
    /// verbose flag. Diagnostics go to stderr, stdout carries the archive
    /// bytes.
    pub fn init_logging(&self) {
        let level = if self.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        };

        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .init();
    }
}
