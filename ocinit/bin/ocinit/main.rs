use std::{
    fs::File,
    io::{self, BufWriter, Write},
};

use clap::Parser;
use ocinit::{cli::OcinitArgs, convert::convert, OcinitResult};

//--------------------------------------------------------------------------------------------------
// Functions: main
//--------------------------------------------------------------------------------------------------

fn main() -> OcinitResult<()> {
    // Parse command line arguments
    let args = OcinitArgs::parse();
    args.init_logging();

    let summary = match &args.output {
        Some(path) => {
            let mut out = BufWriter::new(File::create(path)?);
            let summary = convert(&args.layout_dir, &mut out)?;
            out.flush()?;
            summary
        }
        None => {
            let stdout = io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            let summary = convert(&args.layout_dir, &mut out)?;
            out.flush()?;
            summary
        }
    };

    tracing::info!(
        entries = summary.get_entries(),
        bytes = summary.get_bytes(),
        "archive complete"
    );

    Ok(())
}
