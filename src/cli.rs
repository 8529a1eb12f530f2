use crate::context::DescribeContext;
use crate::manifest::Manifest;
use crate::openapi_builder::{GeneratedDocument, OpenApiBuilder};
use crate::parser::{ManifestParser, ParsedManifest};
use crate::scanner::FileScanner;
use crate::serializer::{serialize_json, serialize_yaml, write_to_file};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

/// Generate OpenAPI documents from an application manifest
#[derive(Parser, Debug)]
#[command(name = "openapi-from-manifest")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Manifest file, or directory scanned for .yaml/.yml/.json manifests
    #[arg(value_name = "MANIFEST_PATH")]
    pub manifest_path: PathBuf,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// Expand classes inline instead of collecting them under components.x-objects
    #[arg(long = "inline-objects")]
    pub inline_objects: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

/// Parse command line arguments
pub fn parse_args() -> Result<CliArgs> {
    let args = CliArgs::parse();
    parse_args_from_parsed(args)
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.manifest_path.exists() {
        anyhow::bail!("Manifest path does not exist: {}", args.manifest_path.display());
    }

    info!("Manifest path: {}", args.manifest_path.display());
    info!("Output format: {:?}", args.output_format);
    match &args.output_path {
        Some(output) => info!("Output file: {}", output.display()),
        None => info!("Output: stdout"),
    }
    if args.inline_objects {
        info!("Objects: inline");
    }

    Ok(args)
}

/// Scan `path` and combine every manifest that parses.
///
/// Manifests that fail to parse are skipped with a warning; the load fails
/// only when nothing usable is left.
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    info!("Scanning for manifests...");
    let scan_result = FileScanner::new(path.to_path_buf()).scan()?;
    info!("Found {} manifest files", scan_result.manifest_files.len());

    if scan_result.manifest_files.is_empty() {
        anyhow::bail!("No manifest files found under {}", path.display());
    }

    info!("Parsing manifests...");
    let parsed: Vec<ParsedManifest> = ManifestParser::parse_files(&scan_result.manifest_files)
        .into_iter()
        .filter_map(|result| match result {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                debug!("Skipping manifest due to parse error: {:#}", e);
                None
            }
        })
        .collect();

    if parsed.is_empty() {
        anyhow::bail!("No manifest could be parsed successfully");
    }
    info!("Successfully parsed {} manifests", parsed.len());

    Ok(Manifest::combine(parsed.into_iter().map(|parsed| parsed.manifest).collect()))
}

/// Build the document for a combined manifest.
///
/// `inline_objects` turns off reference collection whatever the manifest
/// configures.
pub fn generate(manifest: &Manifest, inline_objects: bool) -> Result<GeneratedDocument> {
    let mut config = manifest.config.clone();
    if inline_objects {
        config.collect_references = false;
    }

    info!("Loading {} classes...", manifest.classes.len());
    let registry = manifest.registry();
    let mut ctx = DescribeContext::new(&registry, &config).context("Invalid generator configuration")?;

    info!("Building OpenAPI document from {} routes...", manifest.routes.len());
    let mut builder = OpenApiBuilder::new(&registry, config.clone()).with_info(manifest.info.clone());
    for route in &manifest.routes {
        builder
            .add_route(route, &mut ctx)
            .with_context(|| format!("Failed to document {} {}", route.method, route.uri))?;
    }

    let generated = builder.build(&mut ctx).context("Failed to build OpenAPI document")?;
    info!(
        "OpenAPI document built: {} paths, {} collected objects",
        generated.document.paths.len(),
        ctx.references.len()
    );
    Ok(generated)
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    info!("Starting OpenAPI document generation...");

    let manifest = load_manifest(&args.manifest_path)?;
    if manifest.routes.is_empty() {
        warn!("No routes found in the manifests");
    }

    let generated = generate(&manifest, args.inline_objects)?;

    info!("Serializing to {:?} format...", args.output_format);
    let content = match args.output_format {
        OutputFormat::Yaml => serialize_yaml(&generated.document)?,
        OutputFormat::Json => serialize_json(&generated.document)?,
    };

    if let Some(output_path) = &args.output_path {
        info!("Writing output to: {}", output_path.display());
        write_to_file(&content, output_path)?;
        info!("Successfully wrote OpenAPI document to {}", output_path.display());
    } else {
        println!("{}", content);
    }

    info!("Generation complete!");
    info!("Summary:");
    info!("  - Classes: {}", manifest.classes.len());
    info!("  - Routes: {}", manifest.routes.len());
    info!("  - Paths documented: {}", generated.document.paths.len());
    info!("  - Problems: {}", generated.problems.len());
    for problem in &generated.problems {
        info!("    * {}", problem);
    }

    Ok(())
}
