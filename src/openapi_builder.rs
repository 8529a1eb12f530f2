use crate::annotation::{
    Annotation, AnnotationKind, ParameterAnnotation, ParameterLocation, RequestBodyAnnotation, ResponseAnnotation,
    TagAnnotation,
};
use crate::config::GeneratorConfig;
use crate::context::DescribeContext;
use crate::doc_parser::{doc_summary, doc_tags, DocTag};
use crate::error::{Error, Result};
use crate::manifest::Info;
use crate::merge::merge_into;
use crate::reference_cache::ReferenceKey;
use crate::reflection::{AnnotationProvider, ClassRegistry, ReflectionProvider};
use crate::route::RouteInfo;
use crate::rules::{expand_rules, synthesize, to_schema};
use crate::variable::{is_degenerate, Variable};
use indexmap::IndexMap;
use log::{debug, warn};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt;

const REQUEST_BODIES_PREFIX: &str = "#/components/requestBodies/";

/// OpenAPI document builder
///
/// Routes are added one at a time; every operation is folded into the
/// `paths` tree with the merge engine. Anything that keeps a route from
/// being fully documented is recorded as a [`Problem`] instead of failing
/// the run.
pub struct OpenApiBuilder<'a> {
    /// Class metadata used to resolve actions and request classes
    registry: &'a ClassRegistry,
    /// OpenAPI info section
    info: Info,
    /// Generator options
    config: GeneratorConfig,
    /// Paths collection (URL path -> method -> operation)
    paths: Value,
    /// Request bodies synthesized from validation rules
    request_bodies: Map<String, Value>,
    /// Tags seen on operations, first description wins
    tags: IndexMap<String, Option<String>>,
    /// Diagnostics collected while adding routes
    problems: Vec<Problem>,
}

/// What kept a route from being fully documented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProblemKind {
    MissingTag,
    MissingParameterDescription,
    MissingResponse,
    RuleReadFailure,
    DegenerateSchema,
    UnresolvedAction,
}

impl ProblemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemKind::MissingTag => "missing tag",
            ProblemKind::MissingParameterDescription => "missing parameter description",
            ProblemKind::MissingResponse => "missing response",
            ProblemKind::RuleReadFailure => "rule read failure",
            ProblemKind::DegenerateSchema => "degenerate schema",
            ProblemKind::UnresolvedAction => "unresolved action",
        }
    }
}

/// A diagnostic collected during document assembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub kind: ProblemKind,
    /// `METHOD /path` of the affected route
    pub route: String,
    pub detail: String,
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {} ({})", self.route, self.kind.as_str(), self.detail)
    }
}

/// OpenAPI Operation object
#[derive(Debug, Clone, Serialize)]
pub struct Operation {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "operationId", skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    /// Inline request body or a `$ref` into `components.requestBodies`
    #[serde(rename = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<Value>,
    pub responses: IndexMap<String, Response>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, Serialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub schema: Value,
}

/// OpenAPI RequestBody object
#[derive(Debug, Clone, Serialize)]
pub struct RequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    pub content: IndexMap<String, MediaType>,
}

/// OpenAPI MediaType object
#[derive(Debug, Clone, Serialize)]
pub struct MediaType {
    pub schema: Value,
}

/// OpenAPI Response object
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<IndexMap<String, MediaType>>,
}

/// OpenAPI Tag object
#[derive(Debug, Clone, Serialize)]
pub struct Tag {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Complete OpenAPI document
#[derive(Debug, Clone, Serialize)]
pub struct OpenApiDocument {
    pub openapi: String,
    pub info: Info,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    pub paths: Map<String, Value>,
    /// `schemas`, `requestBodies` and `x-objects`, each only when non-empty
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub components: Map<String, Value>,
}

/// The document plus everything worth reporting about it
#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    pub document: OpenApiDocument,
    pub problems: Vec<Problem>,
}

/// Method-level metadata of one route's action
struct ActionMetadata {
    annotations: Vec<Annotation>,
    doc_params: Vec<DocTag>,
}

impl<'a> OpenApiBuilder<'a> {
    /// Create a new OpenApiBuilder over the given class metadata
    pub fn new(registry: &'a ClassRegistry, config: GeneratorConfig) -> Self {
        debug!("Initializing OpenApiBuilder");
        Self {
            registry,
            info: Info::default(),
            config,
            paths: Value::Object(Map::new()),
            request_bodies: Map::new(),
            tags: IndexMap::new(),
            problems: Vec::new(),
        }
    }

    /// Set custom info for the API
    pub fn with_info(mut self, info: Info) -> Self {
        self.info = info;
        self
    }

    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    fn problem(&mut self, kind: ProblemKind, route: &RouteInfo, detail: String) {
        let problem = Problem {
            kind,
            route: format!("{} {}", route.method, route.openapi_path()),
            detail,
        };
        warn!("{}", problem);
        self.problems.push(problem);
    }

    /// Add a route to the document.
    ///
    /// Routes whose action cannot be resolved are skipped and recorded as
    /// problems. Errors are reserved for configuration failures met while
    /// describing classes.
    pub fn add_route(&mut self, route: &RouteInfo, ctx: &mut DescribeContext) -> Result<()> {
        let path = route.openapi_path();
        debug!("Adding route: {} {}", route.method, path);

        let Some((class, _)) = route.controller() else {
            self.problem(
                ProblemKind::UnresolvedAction,
                route,
                format!("action `{}` is not of the form Class@method", route.action),
            );
            return Ok(());
        };
        let registry = self.registry;
        let Some(method) = registry.method(&route.action) else {
            self.problem(
                ProblemKind::UnresolvedAction,
                route,
                format!("`{}` is not in the class metadata", route.action),
            );
            return Ok(());
        };
        let doc = method.doc.as_deref().unwrap_or_default();
        let metadata = ActionMetadata {
            annotations: registry.method_annotations(&route.action, None),
            doc_params: doc_tags(doc, "param"),
        };

        let tags = self.operation_tags(route, class, &metadata.annotations);
        let summary = metadata
            .annotations
            .iter()
            .find_map(|annotation| match annotation {
                Annotation::Summary { text } => Some(text.clone()),
                _ => None,
            })
            .or_else(|| Some(doc_summary(doc)).filter(|summary| !summary.is_empty()));
        let description = metadata.annotations.iter().find_map(|annotation| match annotation {
            Annotation::Description { text } => Some(text.clone()),
            _ => None,
        });
        let deprecated = metadata
            .annotations
            .iter()
            .any(|annotation| annotation.kind() == AnnotationKind::Deprecated);

        let mut parameters = self.path_parameters(route, &metadata, ctx)?;
        parameters.extend(self.annotated_parameters(route, &metadata.annotations, ctx)?);

        let mut request_body = None;
        if let Some(annotation) = metadata.annotations.iter().find_map(|annotation| match annotation {
            Annotation::RequestBody(body) => Some(body),
            _ => None,
        }) {
            request_body = self.annotated_request_body(route, annotation, ctx)?;
        } else if let Some(request_class) = &method.request {
            match self.rules_schema(route, request_class, ctx) {
                Some(schema) if route.method.uses_query_input() => {
                    parameters.extend(query_parameters(&schema));
                }
                Some(schema) => {
                    request_body = Some(self.register_request_body(request_class, schema)?);
                }
                None => {}
            }
        }

        let responses = self.responses(route, &metadata.annotations, ctx)?;

        let operation = Operation {
            tags,
            summary,
            description,
            operation_id: route.name.clone(),
            parameters,
            request_body,
            responses,
            deprecated,
        };

        let mut fragment = Map::new();
        let mut item = Map::new();
        item.insert(route.method.as_openapi_key().to_string(), serde_json::to_value(&operation)?);
        fragment.insert(path, Value::Object(item));
        merge_into(&mut self.paths, Value::Object(fragment));
        Ok(())
    }

    /// Method tags, falling back to class tags.
    fn operation_tags(&mut self, route: &RouteInfo, class: &str, annotations: &[Annotation]) -> Vec<String> {
        let mut found: Vec<TagAnnotation> = annotations
            .iter()
            .filter_map(|annotation| match annotation {
                Annotation::Tag(tag) => Some(tag.clone()),
                _ => None,
            })
            .collect();
        if found.is_empty() {
            found = self
                .registry
                .class_annotations(class, Some(AnnotationKind::Tag))
                .into_iter()
                .filter_map(|annotation| match annotation {
                    Annotation::Tag(tag) => Some(tag),
                    _ => None,
                })
                .collect();
        }
        if found.is_empty() {
            self.problem(ProblemKind::MissingTag, route, format!("no tag on `{}`", route.action));
            return Vec::new();
        }

        let mut names = Vec::new();
        for tag in found {
            let description = self.tags.entry(tag.name.clone()).or_insert(None);
            if description.is_none() {
                *description = tag.description;
            }
            if !names.contains(&tag.name) {
                names.push(tag.name);
            }
        }
        names
    }

    /// One parameter per `{name}` URI segment.
    fn path_parameters(
        &mut self,
        route: &RouteInfo,
        metadata: &ActionMetadata,
        ctx: &mut DescribeContext,
    ) -> Result<Vec<Parameter>> {
        let mut parameters = Vec::new();
        for segment in route.path_parameters() {
            let annotation = metadata.annotations.iter().find_map(|annotation| match annotation {
                Annotation::Parameter(parameter)
                    if parameter.location == ParameterLocation::Path && parameter.name == segment.name =>
                {
                    Some(parameter)
                }
                _ => None,
            });
            let doc_param = metadata.doc_params.iter().find(|tag| tag.name == segment.name);

            let type_name = annotation
                .and_then(|parameter| parameter.type_name.clone())
                .or_else(|| doc_param.and_then(|tag| tag.type_name.clone()))
                .unwrap_or_else(|| "string".to_string());
            let mut description = annotation
                .and_then(|parameter| parameter.description.clone())
                .or_else(|| doc_param.and_then(|tag| tag.description.clone()));
            if description.is_none() {
                self.problem(
                    ProblemKind::MissingParameterDescription,
                    route,
                    format!("path parameter `{}`", segment.name),
                );
            }
            // Path parameters are always required in OpenAPI; optional
            // router segments are only noted in the description.
            if !segment.required {
                description = Some(match description {
                    Some(text) => format!("{} (optional segment)", text),
                    None => "Optional path segment".to_string(),
                });
            }

            let mut variable = Variable::named(&segment.name).type_name(&type_name);
            if let Some(example) = annotation.and_then(|parameter| parameter.example.clone()) {
                variable = variable.example(example);
            }
            parameters.push(Parameter {
                name: segment.name,
                location: ParameterLocation::Path.as_str().to_string(),
                required: true,
                description,
                schema: parameter_schema(variable.describe(ctx)?),
            });
        }
        Ok(parameters)
    }

    /// Query and header parameters declared by annotations.
    fn annotated_parameters(
        &mut self,
        route: &RouteInfo,
        annotations: &[Annotation],
        ctx: &mut DescribeContext,
    ) -> Result<Vec<Parameter>> {
        let declared: Vec<&ParameterAnnotation> = annotations
            .iter()
            .filter_map(|annotation| match annotation {
                Annotation::Parameter(parameter) if parameter.location != ParameterLocation::Path => Some(parameter),
                _ => None,
            })
            .collect();

        let mut parameters = Vec::new();
        for parameter in declared {
            if parameter.description.is_none() {
                self.problem(
                    ProblemKind::MissingParameterDescription,
                    route,
                    format!("{} parameter `{}`", parameter.location.as_str(), parameter.name),
                );
            }
            let mut variable = Variable::named(&parameter.name);
            if let Some(type_name) = &parameter.type_name {
                variable = variable.type_name(type_name);
            }
            if let Some(example) = &parameter.example {
                variable = variable.example(example.clone());
            }
            parameters.push(Parameter {
                name: parameter.name.clone(),
                location: parameter.location.as_str().to_string(),
                required: parameter.required.unwrap_or(false),
                description: parameter.description.clone(),
                schema: parameter_schema(variable.describe(ctx)?),
            });
        }
        Ok(parameters)
    }

    fn annotated_request_body(
        &mut self,
        route: &RouteInfo,
        annotation: &RequestBodyAnnotation,
        ctx: &mut DescribeContext,
    ) -> Result<Option<Value>> {
        let mut variable = Variable::new();
        if let Some(type_name) = &annotation.type_name {
            variable = variable.type_name(type_name);
        }
        if let Some(example) = &annotation.example {
            variable = variable.example(example.clone());
        }
        let schema = variable.describe(ctx)?;
        if is_degenerate(&schema) {
            self.problem(
                ProblemKind::DegenerateSchema,
                route,
                "request body has neither a type nor an example".to_string(),
            );
            return Ok(None);
        }

        let content_type = annotation
            .content_type
            .clone()
            .unwrap_or_else(|| self.config.content_type.clone());
        let body = RequestBody {
            description: annotation.description.clone(),
            required: true,
            content: IndexMap::from([(content_type, MediaType { schema })]),
        };
        Ok(Some(serde_json::to_value(&body)?))
    }

    /// Schema synthesized from the validation rules of a request class.
    ///
    /// `None` when the class has no rules or reading them failed; the latter
    /// is recorded as a problem.
    fn rules_schema(&mut self, route: &RouteInfo, request_class: &str, ctx: &mut DescribeContext) -> Option<Value> {
        let raw = match self.registry.rules(request_class) {
            Ok(raw) => raw,
            Err(message) => {
                self.problem(
                    ProblemKind::RuleReadFailure,
                    route,
                    format!("rules of `{}`: {}", request_class, message),
                );
                return None;
            }
        };
        if raw.is_empty() {
            debug!("No rules on {}", request_class);
            return None;
        }
        let tree = expand_rules(&raw);
        let synthesis = synthesize(ctx, &tree, &raw);
        Some(to_schema(&synthesis, &self.registry.labels(request_class)))
    }

    fn register_request_body(&mut self, request_class: &str, schema: Value) -> Result<Value> {
        let name = ReferenceKey::new(request_class, &[], &[], &[]).name;
        let body = RequestBody {
            description: None,
            required: true,
            content: IndexMap::from([(self.config.content_type.clone(), MediaType { schema })]),
        };
        self.request_bodies.insert(name.clone(), serde_json::to_value(&body)?);
        Ok(json!({ "$ref": format!("{}{}", REQUEST_BODIES_PREFIX, name) }))
    }

    fn responses(
        &mut self,
        route: &RouteInfo,
        annotations: &[Annotation],
        ctx: &mut DescribeContext,
    ) -> Result<IndexMap<String, Response>> {
        let documented: Vec<&ResponseAnnotation> = annotations
            .iter()
            .filter_map(|annotation| match annotation {
                Annotation::Response(response) => Some(response),
                _ => None,
            })
            .collect();

        let mut responses = IndexMap::new();
        if documented.is_empty() {
            self.problem(
                ProblemKind::MissingResponse,
                route,
                format!("no response documented on `{}`", route.action),
            );
            responses.insert(
                "200".to_string(),
                Response {
                    description: "Successful response".to_string(),
                    content: None,
                },
            );
            return Ok(responses);
        }

        for response in documented {
            let description = response
                .description
                .clone()
                .unwrap_or_else(|| default_response_description(response.status).to_string());
            let mut content = None;
            if response.type_name.is_some() || response.example.is_some() {
                let schema = Variable::from_response(response).describe(ctx)?;
                if is_degenerate(&schema) {
                    self.problem(
                        ProblemKind::DegenerateSchema,
                        route,
                        format!("response {} could not be described", response.status),
                    );
                } else {
                    let content_type = response
                        .content_type
                        .clone()
                        .unwrap_or_else(|| self.config.content_type.clone());
                    content = Some(IndexMap::from([(content_type, MediaType { schema })]));
                }
            }
            if responses.contains_key(&response.status.to_string()) {
                debug!("Response {} documented twice, keeping the last one", response.status);
            }
            responses.insert(response.status.to_string(), Response { description, content });
        }
        Ok(responses)
    }

    /// Build the final OpenAPI document.
    ///
    /// Fails with [`Error::NotFound`] when a configured definition names an
    /// unknown class.
    pub fn build(self, ctx: &mut DescribeContext) -> Result<GeneratedDocument> {
        debug!("Building final OpenAPI document");

        let mut schemas = Map::new();
        for class in &self.config.definitions {
            if !ctx.classes.class_exists(class) {
                return Err(Error::NotFound(class.clone()));
            }
            let node = Variable::new().type_name(class).describe(ctx)?;
            let body = match node.get("$ref").and_then(Value::as_str) {
                Some(reference) => ctx.references.body(reference).cloned().unwrap_or(node),
                None => node,
            };
            schemas.insert(ReferenceKey::new(class, &[], &[], &[]).name, body);
        }

        let mut components = Map::new();
        if !schemas.is_empty() {
            components.insert("schemas".to_string(), Value::Object(schemas));
        }
        if !self.request_bodies.is_empty() {
            components.insert("requestBodies".to_string(), Value::Object(self.request_bodies));
        }
        let objects: Map<String, Value> = ctx
            .references
            .collected()
            .iter()
            .map(|(name, body)| (name.clone(), body.clone()))
            .collect();
        if !objects.is_empty() {
            components.insert("x-objects".to_string(), Value::Object(objects));
        }

        let paths = match self.paths {
            Value::Object(paths) => paths,
            _ => Map::new(),
        };
        let tags = self
            .tags
            .into_iter()
            .map(|(name, description)| Tag { name, description })
            .collect();

        Ok(GeneratedDocument {
            document: OpenApiDocument {
                openapi: self.config.openapi.clone(),
                info: self.info,
                tags,
                paths,
                components,
            },
            problems: self.problems,
        })
    }
}

/// Parameter schemas never reach the document as `{type: null}`.
fn parameter_schema(schema: Value) -> Value {
    if is_degenerate(&schema) {
        json!({ "type": "string" })
    } else {
        schema
    }
}

/// Top-level properties of a synthesized rules schema as query parameters.
fn query_parameters(schema: &Value) -> Vec<Parameter> {
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Vec::new();
    };
    properties
        .iter()
        .map(|(name, property)| {
            let description = property
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string);
            let mut property = property.clone();
            if let Value::Object(node) = &mut property {
                node.retain(|key, _| key != "description");
            }
            Parameter {
                name: name.clone(),
                location: ParameterLocation::Query.as_str().to_string(),
                required: required.contains(&name.as_str()),
                description,
                schema: property,
            }
        })
        .collect()
}

fn default_response_description(status: u16) -> &'static str {
    match status {
        200 => "Successful response",
        201 => "Created",
        202 => "Accepted",
        204 => "No content",
        400 => "Bad request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not found",
        422 => "Unprocessable entity",
        _ => "Response",
    }
}
