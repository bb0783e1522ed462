use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// CLI arguments for clima
#[derive(Debug, Parser)]
#[command(
    name = "clima",
    version,
    about = "Current weather and five-day outlook for Brazilian municipalities"
)]
pub struct CliArgs {
    /// Path to a config file (default: <config dir>/clima/config.toml)
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Print the session snapshot as JSON instead of a summary
    #[arg(long = "json", global = true)]
    pub json: bool,

    /// Without a command, shows weather for the default location (São Paulo)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Weather for a city typed by name
    City {
        /// City name, e.g. "Belo Horizonte"
        name: String,

        /// Ask the weather provider directly, skipping municipality verification
        #[arg(long = "raw")]
        raw: bool,
    },

    /// Weather at coordinates inside Brazil
    Coords {
        /// Latitude; comma decimals are accepted (e.g. -23,55)
        #[arg(allow_hyphen_values = true)]
        lat: String,

        /// Longitude; comma decimals are accepted (e.g. -46,63)
        #[arg(allow_hyphen_values = true)]
        lon: String,

        /// Label to show instead of looking the place up
        #[arg(short = 'l', long = "label")]
        label: Option<String>,
    },

    /// List municipality suggestions for a partial name
    Suggest {
        /// Partial name (at least two characters)
        query: String,
    },
}
