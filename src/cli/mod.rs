pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{CliArgs, Commands, DetectArgs, Ecosystem, ExtractArgs, MatrixArgs};
pub use output::{ExtractionReport, OutputFormat, OutputFormatter};
