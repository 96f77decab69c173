use std::path::PathBuf;

use clap::{arg, value_parser, ArgAction, ArgMatches, Command};

use crate::tile::TileError;

pub const DEFAULT_COLUMNS: &str = "6";
pub const DEFAULT_OUTPUT: &str = "./output.png";

/// Resolved run configuration. Created once at startup and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Config {
    pub input: PathBuf,
    pub columns: u32,
    pub output: PathBuf,
}

pub fn command() -> Command {
    Command::new("imgtile")
        .version("0.1.0")
        .author("imgtile contributors")
        .about("Merge equally-sized images from a folder into one grid image.")
        .arg(arg!(-i --input [INPUT] "Input folder with images"))
        .arg(
            arg!(-c --columns [COLUMNS] "Number of images per row")
                .value_parser(value_parser!(i64))
                .allow_negative_numbers(true)
                .default_value(DEFAULT_COLUMNS),
        )
        .arg(
            arg!(-o --output [OUTPUT] "Output image file path; .png writes PNG, anything else JPEG")
                .default_value(DEFAULT_OUTPUT),
        )
        .arg(
            arg!(-v --verbose "Increase log verbosity (-v debug, -vv trace)")
                .action(ArgAction::Count),
        )
}

pub fn get_matches() -> ArgMatches {
    command().get_matches()
}

impl Config {
    pub(crate) fn from_matches(matches: &ArgMatches) -> Result<Self, TileError> {
        let input = matches
            .get_one::<String>("input")
            .map(String::as_str)
            .unwrap_or_default();
        let columns = matches.get_one::<i64>("columns").copied();
        let output = matches
            .get_one::<String>("output")
            .map(String::as_str)
            .unwrap_or_default();

        let columns = columns
            .and_then(|c| u32::try_from(c).ok())
            .filter(|&c| c > 0);
        match columns {
            Some(columns) if !input.is_empty() && !output.is_empty() => Ok(Config {
                input: PathBuf::from(input),
                columns,
                output: PathBuf::from(output),
            }),
            _ => Err(TileError::Usage),
        }
    }
}

pub fn verbosity(matches: &ArgMatches) -> u8 {
    matches.get_count("verbose")
}
