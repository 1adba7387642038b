//! Normalized API model.
//!
//! The resolver produces `Endpoint`s. Rules, the test-case builder and the
//! executor consume them read-only. Nothing in here holds an unresolved
//! `$ref`.

pub mod schema;

use serde::{Deserialize, Serialize};

pub use schema::{Exclusivity, Property, Schema, SchemaType};

/// One operation (method + path template) of the documented API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Deterministic identity derived from method and path.
    pub id: String,
    pub method: HttpMethod,
    /// Path template, e.g. `/users/{id}`.
    pub path: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Declared parameters, body properties flattened last.
    pub parameters: Vec<Parameter>,
    pub request_body: Option<RequestBody>,
    #[serde(default)]
    pub responses: Vec<ResponseCode>,
    /// Names of security schemes required by the operation.
    #[serde(default)]
    pub security: Vec<String>,
}

impl Endpoint {
    /// `METHOD` + path with `/` mapped to `_` and path-parameter braces removed.
    ///
    /// `GET /users/{id}` becomes `GET__users_id`.
    pub fn identity(method: HttpMethod, path: &str) -> String {
        let flattened: String = path
            .chars()
            .filter(|c| *c != '{' && *c != '}')
            .map(|c| if c == '/' { '_' } else { c })
            .collect();
        format!("{}_{}", method.as_str(), flattened)
    }
}

/// HTTP verbs the prober understands. Other verbs in a document are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn from_str_lenient(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "get" => Some(Self::Get),
            "post" => Some(Self::Post),
            "put" => Some(Self::Put),
            "patch" => Some(Self::Patch),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single input of an endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub schema: Schema,
    #[serde(default)]
    pub description: String,
}

/// Where a parameter travels in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
    Body,
}

impl ParameterLocation {
    pub fn from_str_lenient(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "path" => Some(Self::Path),
            "query" => Some(Self::Query),
            "header" => Some(Self::Header),
            "cookie" => Some(Self::Cookie),
            "body" | "formdata" => Some(Self::Body),
            _ => None,
        }
    }
}

impl std::fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path => write!(f, "path"),
            Self::Query => write!(f, "query"),
            Self::Header => write!(f, "header"),
            Self::Cookie => write!(f, "cookie"),
            Self::Body => write!(f, "body"),
        }
    }
}

/// JSON request body declared by an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    pub media_type: String,
    pub schema: Schema,
}

/// A declared response (status code or `default`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseCode {
    pub code: String,
    #[serde(default)]
    pub description: String,
}
