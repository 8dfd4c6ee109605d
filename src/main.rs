mod actions;
mod cli;
mod config;
mod solver;
mod source;
mod types;
mod utils;

use anyhow::Result;
use clap::Parser;
use config::{Config, Opts};

/// Exit codes:
/// 1 => something went wrong, see the error chain
fn main() {
    if let Err(err) = try_main() {
        error!("{}", err.to_string());
        err.chain().skip(1).for_each(|cause| {
            due_to!("{}", cause);
        });
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let opts: Opts = Opts::parse();
    cli::set_verbose(opts.verbose);

    let config = Config::from_file(&opts.config)?;
    debug!("Loaded {} repositories from {}", config.repo.len(), opts.config.display());
    actions::fulfill_command(&config, &opts)
}
