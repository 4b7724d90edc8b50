use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::logging::LogDestination;

#[derive(Debug, Parser)]
#[command(name = "readbatch")]
#[command(about = "Start remote reading tasks for a list of accounts and follow their progress")]
pub struct Args {
    /// File with one `login:password` per line
    #[arg(short, long)]
    pub accounts: PathBuf,

    /// RON config file; defaults are used when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Base URL of the book task service
    #[arg(long)]
    pub api_url: Option<String>,

    /// How books are chosen
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Search term, implies `--mode search`
    #[arg(long, conflicts_with = "slug")]
    pub term: Option<String>,

    /// Book slug, implies `--mode slug`
    #[arg(long)]
    pub slug: Option<String>,

    /// Directory for the result report
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LogDestination::File)]
    pub log: LogDestination,

    /// Log at debug level
    #[arg(long)]
    pub verbose: bool,

    /// Write passwords in clear text into the result report
    #[arg(long)]
    pub include_passwords: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Recommended,
    Indicated,
    Search,
    Slug,
}
