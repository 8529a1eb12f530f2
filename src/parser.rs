use crate::manifest::Manifest;
use anyhow::{Context, Result};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Reader for application manifest files.
///
/// YAML is a superset of JSON, so `.json` manifests go through the same
/// `serde_yaml` deserializer as `.yaml`/`.yml` ones.
///
/// # Example
///
/// ```no_run
/// use openapi_from_manifest::parser::ManifestParser;
/// use std::path::Path;
///
/// let parsed = ManifestParser::parse_file(Path::new("manifest.yaml")).unwrap();
/// println!("Parsed {} routes", parsed.manifest.routes.len());
/// ```
pub struct ManifestParser;

/// A successfully parsed manifest together with the file it came from.
#[derive(Debug)]
pub struct ParsedManifest {
    /// Path to the manifest file
    pub path: PathBuf,
    /// The deserialized manifest
    pub manifest: Manifest,
}

impl ManifestParser {
    /// Parses a single manifest file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not describe a
    /// manifest.
    pub fn parse_file(path: &Path) -> Result<ParsedManifest> {
        debug!("Parsing manifest: {}", path.display());

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;

        let manifest = Self::parse_str(&content)
            .with_context(|| format!("Failed to parse manifest: {}", path.display()))?;

        debug!(
            "Parsed {}: {} classes, {} routes",
            path.display(),
            manifest.classes.len(),
            manifest.routes.len()
        );

        Ok(ParsedManifest {
            path: path.to_path_buf(),
            manifest,
        })
    }

    /// Parses manifest text. An empty document yields an empty manifest.
    pub fn parse_str(content: &str) -> Result<Manifest> {
        if content.trim().is_empty() {
            return Ok(Manifest::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Parses multiple manifests, continuing past failures.
    ///
    /// Returns one result per input path, in input order. Failures are
    /// logged as warnings.
    pub fn parse_files(paths: &[PathBuf]) -> Vec<Result<ParsedManifest>> {
        debug!("Parsing {} manifests", paths.len());

        let results: Vec<Result<ParsedManifest>> = paths
            .iter()
            .map(|path| {
                Self::parse_file(path).map_err(|e| {
                    warn!("Failed to parse {}: {:#}", path.display(), e);
                    e
                })
            })
            .collect();

        let success_count = results.iter().filter(|r| r.is_ok()).count();
        debug!(
            "Parsing complete: {} succeeded, {} failed",
            success_count,
            results.len() - success_count
        );

        results
    }
}
