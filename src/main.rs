use anyhow::Result;
use clap::Parser;
use microsim_lib::cli::{self, Args};
use microsim_lib::metrics::init_logging;

fn main() -> Result<()> {
    init_logging();
    cli::execute(Args::parse())
}
