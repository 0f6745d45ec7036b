use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Build metadata extraction for CI pipelines
#[derive(Parser, Debug)]
#[command(
    name = "buildmeta",
    about = "Extract build metadata and CI version matrices from project manifests",
    version,
    long_about = "buildmeta inspects a project directory, picks the matching ecosystem \
                  extractor (Terraform, Scala, Elixir, Swift, C/C++, PHP) and prints the \
                  project's name, version and ecosystem-specific metadata as JSON."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - only log errors"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Extract metadata from a project directory",
        long_about = "Resolves the extractor for a directory and prints its metadata.\n\n\
                      Examples:\n  \
                      buildmeta extract\n  \
                      buildmeta extract infra/ --extractor terraform\n  \
                      buildmeta extract --format human"
    )]
    Extract(ExtractArgs),

    #[command(
        about = "Show which extractor handles a directory",
        long_about = "Prints the extractor that would be used for a directory.\n\n\
                      Examples:\n  \
                      buildmeta detect\n  \
                      buildmeta detect /path/to/repo --all"
    )]
    Detect(DetectArgs),

    #[command(about = "List registered extractors in resolution order")]
    List,

    #[command(
        about = "Print the CI version matrix for a constraint",
        long_about = "Computes the version matrix an ecosystem extractor would emit.\n\n\
                      Examples:\n  \
                      buildmeta matrix terraform '>= 1.6'\n  \
                      buildmeta matrix php '^8.2'"
    )]
    Matrix(MatrixArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct ExtractArgs {
    #[arg(value_name = "PATH", help = "Project directory (defaults to current directory)")]
    pub path: Option<PathBuf>,

    #[arg(
        short = 'e',
        long,
        value_name = "NAME",
        help = "Use this extractor instead of detecting one"
    )]
    pub extractor: Option<String>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "json",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(long, help = "Print JSON on a single line")]
    pub compact: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct DetectArgs {
    #[arg(value_name = "PATH", help = "Project directory (defaults to current directory)")]
    pub path: Option<PathBuf>,

    #[arg(long, help = "Print every matching extractor in resolution order")]
    pub all: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct MatrixArgs {
    #[arg(value_enum, help = "Ecosystem whose release lines to use")]
    pub ecosystem: Ecosystem,

    #[arg(
        value_name = "CONSTRAINT",
        default_value = "",
        help = "Declared version constraint, e.g. '>= 1.6' or '^8.1'"
    )]
    pub constraint: String,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ecosystem {
    Terraform,
    Php,
    Swift,
    Elixir,
    Scala,
}
