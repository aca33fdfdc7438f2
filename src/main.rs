use anyhow::Result;
use clap::Parser;
use crawlstats::{pipeline, utils, Args};
use tracing::error;

fn main() -> Result<()> {
    let args = Args::parse();
    utils::setup_logging(args.verbose);
    utils::validate_args(&args)?;

    match pipeline::run(&args) {
        Ok(_) => Ok(()),
        Err(e) => {
            error!(action = "fail", component = "main", error = %format!("{:#}", e), "Stats extraction failed");
            std::process::exit(1);
        }
    }
}
