use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "inplace",
    about = "Write, inspect and verify relocatable inplace buffers",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Write a sample buffer holding an array of integers
    Demo(DemoArgs),
    /// Print the root header and directory of a buffer file
    Inspect(InspectArgs),
    /// Fail unless a buffer file passes every check
    Verify(VerifyArgs),
}

#[derive(Args)]
pub struct DemoArgs {
    pub path: PathBuf,
    /// Number of integers to store
    #[arg(short = 'n', long, default_value = "100")]
    pub count: usize,
    /// Value every integer is set to
    #[arg(long, default_value = "42", allow_hyphen_values = true)]
    pub fill: i32,
    /// Arena configuration file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Provenance string recorded in the header, e.g. a commit hash
    #[arg(long)]
    pub provenance: Option<String>,
}

#[derive(Args)]
pub struct InspectArgs {
    pub path: PathBuf,
}

#[derive(Args)]
pub struct VerifyArgs {
    pub path: PathBuf,
}
