//! CLI entry point for blinded CiliaQ ROI curation

use cilia_curate::io::cli::{Cli, CurationProcessor};
use cilia_curate::io::logging::init_tracing;
use clap::Parser;

fn main() -> cilia_curate::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose)?;
    let processor = CurationProcessor::new(cli);
    processor.process()
}
