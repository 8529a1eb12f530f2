//! Command-line entry point.
//!
//! ```bash
//! openapi-from-manifest [OPTIONS] <MANIFEST_PATH>
//! ```
//!
//! Generate YAML from every manifest under a directory:
//! ```bash
//! openapi-from-manifest ./storage/api-manifests -o openapi.yaml
//! ```
//!
//! Generate JSON with classes expanded inline:
//! ```bash
//! openapi-from-manifest manifest.yaml -f json --inline-objects -o openapi.json
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use openapi_from_manifest::cli;

fn main() -> Result<()> {
    // Parse first: the verbose flag decides the log level.
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("openapi-from-manifest starting...");

    let args = cli::parse_args_from_parsed(args)?;
    cli::run(args)?;

    info!("OpenAPI document generation completed successfully");

    Ok(())
}
