use buildmeta::cli::commands::{CliArgs, Commands};
use buildmeta::cli::handlers::{
    handle_detect, handle_extract, handle_list, handle_matrix, EXIT_FAILURE,
};
use buildmeta::util::logging::{init_logging, parse_level};
use buildmeta::{BuildmetaConfig, VERSION};

use clap::Parser;
use tracing::{debug, error};

fn main() {
    let args = CliArgs::parse();
    let config = BuildmetaConfig::default();
    init_logging_from_args(&args, &config);

    debug!("buildmeta v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    if let Err(e) = config.validate() {
        error!("{}", e);
        std::process::exit(EXIT_FAILURE);
    }

    let exit_code = match &args.command {
        Commands::Extract(extract_args) => handle_extract(extract_args, &config),
        Commands::Detect(detect_args) => handle_detect(detect_args, &config),
        Commands::List => handle_list(&config),
        Commands::Matrix(matrix_args) => handle_matrix(matrix_args),
    };

    std::process::exit(exit_code);
}

/// Command-line flags override `BUILDMETA_LOG_LEVEL`
fn init_logging_from_args(args: &CliArgs, config: &BuildmetaConfig) {
    let mut logging = config.logging();

    if let Some(level_str) = &args.log_level {
        logging.level = parse_level(level_str);
    } else if args.verbose {
        logging.level = tracing::Level::DEBUG;
    } else if args.quiet {
        logging.level = tracing::Level::ERROR;
    }

    init_logging(logging);
}
