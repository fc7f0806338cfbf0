use buildmend::cli::commands::{CliArgs, Commands};
use buildmend::cli::handlers::{handle_detect, handle_fix, handle_probe};
use buildmend::util::logging;
use buildmend::VERSION;

use clap::Parser;
use std::env;
use tracing::debug;

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("buildmend v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Detect(detect_args) => handle_detect(detect_args),
        Commands::Probe(probe_args) => handle_probe(probe_args),
        Commands::Fix(fix_args) => handle_fix(fix_args).await,
    };

    std::process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs) {
    let level = if let Some(level_str) = &args.log_level {
        logging::parse_level(level_str)
    } else if args.verbose {
        tracing::Level::DEBUG
    } else if args.quiet {
        tracing::Level::ERROR
    } else {
        let level_str = env::var("BUILDMEND_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        logging::parse_level(&level_str)
    };
    logging::init_logging(level);
}
