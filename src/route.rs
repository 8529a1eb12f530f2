//! Route table entries exported by the host framework's router.

use crate::reflection::split_method_ref;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single route of the application.
///
/// The action names the controller method handling the route, as
/// `Class@method`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteInfo {
    /// HTTP method for this route
    pub method: HttpMethod,
    /// URI pattern with `{name}` placeholders (a trailing `?` marks an
    /// optional segment)
    pub uri: String,
    /// Controller action, `Class@method`
    pub action: String,
    /// Route name, if the router assigned one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// HTTP methods a documented route can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[serde(alias = "get")]
    Get,
    #[serde(alias = "post")]
    Post,
    #[serde(alias = "put")]
    Put,
    #[serde(alias = "delete")]
    Delete,
    #[serde(alias = "patch")]
    Patch,
    #[serde(alias = "options")]
    Options,
    #[serde(alias = "head")]
    Head,
}

impl HttpMethod {
    /// Lower-case name used as operation key in OpenAPI paths
    pub fn as_openapi_key(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Delete => "delete",
            HttpMethod::Patch => "patch",
            HttpMethod::Options => "options",
            HttpMethod::Head => "head",
        }
    }

    /// Methods whose input travels in the query string rather than a body.
    pub fn uses_query_input(&self) -> bool {
        matches!(self, HttpMethod::Get | HttpMethod::Delete | HttpMethod::Head)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_openapi_key().to_uppercase())
    }
}

/// A path parameter found in a route URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathParameter {
    pub name: String,
    pub required: bool,
}

impl RouteInfo {
    pub fn new(method: HttpMethod, uri: &str, action: &str) -> Self {
        Self {
            method,
            uri: uri.to_string(),
            action: action.to_string(),
            name: None,
        }
    }

    /// Controller class and method of the action.
    pub fn controller(&self) -> Option<(&str, &str)> {
        split_method_ref(&self.action)
    }

    /// OpenAPI path: leading `/` added, optional markers removed.
    pub fn openapi_path(&self) -> String {
        let uri = self.uri.trim_matches('/').replace("?}", "}");
        format!("/{}", uri)
    }

    /// `{name}` segments of the URI, in order.
    pub fn path_parameters(&self) -> Vec<PathParameter> {
        let mut parameters = Vec::new();
        let mut rest = self.uri.as_str();
        while let Some(start) = rest.find('{') {
            let Some(len) = rest[start..].find('}') else {
                break;
            };
            let raw = &rest[start + 1..start + len];
            let (name, required) = match raw.strip_suffix('?') {
                Some(name) => (name, false),
                None => (raw, true),
            };
            if !name.is_empty() {
                parameters.push(PathParameter {
                    name: name.to_string(),
                    required,
                });
            }
            rest = &rest[start + len + 1..];
        }
        parameters
    }
}
