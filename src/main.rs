use std::process::ExitCode;

use anyhow::{Context, Result};

use crate::clap::Config;

mod clap;
mod logger;
mod tile;

fn main() -> ExitCode {
    let matches = clap::get_matches();
    logger::init(logger::level_for(clap::verbosity(&matches)));

    match run(&matches) {
        Ok(config) => {
            println!("Image saved to {}", config.output.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(matches: &::clap::ArgMatches) -> Result<Config> {
    let config = Config::from_matches(matches)?;
    tile::tile(&config).with_context(|| {
        format!(
            "Failed to tile {} into {}",
            config.input.display(),
            config.output.display()
        )
    })?;
    Ok(config)
}
