use std::path::PathBuf;

use clap::ArgAction;
use clap::Parser;
use clap::Subcommand;

#[derive(Parser, Debug)]
#[command(version, about = "Encode, validate and resolve shareable trip itineraries")]
pub struct Cli {
    /// Config file to use instead of ~/.config/tripkit/config.toml.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase log output (-v info, -vv debug).
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compress a JSON document into a URL-safe token.
    Encode {
        /// JSON file, or `-` / nothing for stdin.
        input: Option<PathBuf>,
    },

    /// Expand a token back into JSON.
    Decode {
        token: String,

        /// Print the decoded JSON as-is, without validating or normalizing.
        #[arg(long, default_value_t = false)]
        raw: bool,
    },

    /// Check that a document has the minimal trip shape.
    Validate {
        input: Option<PathBuf>,
    },

    /// Validate, then fill derived locations, badges and defaults.
    Normalize {
        input: Option<PathBuf>,
    },

    /// Load the trip a page address refers to, as the app would on start.
    Resolve {
        /// Full page address, e.g. `https://host/app/#t=my-trip`.
        address: String,

        /// Print only a summary, not the document.
        #[arg(long, default_value_t = false)]
        summary: bool,
    },

    /// Build a shareable link for a document.
    Link {
        input: Option<PathBuf>,

        /// Link to this external source instead of embedding the document.
        #[arg(long, value_name = "URL")]
        source: Option<String>,

        /// Open the link read-only.
        #[arg(long, default_value_t = false)]
        view: bool,

        /// Page address to link to (defaults to share.app_url).
        #[arg(long, value_name = "URL")]
        base: Option<String>,
    },

    /// Save a document as a new cloud trip and print its link.
    Publish {
        input: Option<PathBuf>,

        /// Print the read-only share link instead of the slug link.
        #[arg(long, default_value_t = false)]
        view: bool,
    },
}

impl Cli {
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}
