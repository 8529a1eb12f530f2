//! OpenAPI documents from an application's route table, class metadata and
//! validation rules.
//!
//! The host framework exports what its router, reflection and annotation
//! reader know into one or more manifests. This crate turns them into an
//! OpenAPI document: classes become schemas (collected once under
//! `components.x-objects` and referenced afterwards), validation rules
//! become request schemas with synthesized examples and constraints.
//!
//! # Architecture
//!
//! Describing values:
//!
//! 1. [`type_normalizer`] - canonical type tokens and their OpenAPI types
//! 2. [`example`] - deterministic examples by field name, rule or type
//! 3. [`describer`] - schema of a concrete value
//! 4. [`reference_cache`] - expand each class once per modifier set
//! 5. [`merge`] - deep merge of schema fragments
//! 6. [`variable`] - the schema builder tying the above together
//! 7. [`rules`] - request schemas from validation rules
//!
//! Host side:
//!
//! 1. [`scanner`] / [`parser`] / [`manifest`] - load and combine manifests
//! 2. [`reflection`] / [`annotation`] / [`doc_parser`] - class metadata providers
//! 3. [`openapi_builder`] - routes to operations, problems list
//! 4. [`serializer`] - YAML or JSON output
//!
//! # Example Usage
//!
//! ```no_run
//! use openapi_from_manifest::{
//!     context::DescribeContext, openapi_builder::OpenApiBuilder, parser::ManifestParser,
//!     serializer::serialize_yaml,
//! };
//! use std::path::Path;
//!
//! let manifest = ManifestParser::parse_file(Path::new("manifest.yaml")).unwrap().manifest;
//! let registry = manifest.registry();
//! let mut ctx = DescribeContext::new(&registry, &manifest.config).unwrap();
//!
//! let mut builder = OpenApiBuilder::new(&registry, manifest.config.clone()).with_info(manifest.info.clone());
//! for route in &manifest.routes {
//!     builder.add_route(route, &mut ctx).unwrap();
//! }
//! let generated = builder.build(&mut ctx).unwrap();
//! for problem in &generated.problems {
//!     eprintln!("{}", problem);
//! }
//! println!("{}", serialize_yaml(&generated.document).unwrap());
//! ```
//!
//! For command-line usage, see the [`cli`] module.

pub mod annotation;
pub mod cli;
pub mod config;
pub mod context;
pub mod describer;
pub mod doc_parser;
pub mod error;
pub mod example;
pub mod manifest;
pub mod merge;
pub mod openapi_builder;
pub mod parser;
pub mod reference_cache;
pub mod reflection;
pub mod route;
pub mod rule_token;
pub mod rules;
pub mod scanner;
pub mod serializer;
pub mod type_normalizer;
pub mod variable;
