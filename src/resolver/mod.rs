//! Endpoint extraction with full `$ref` resolution.
//!
//! Walks every `paths` entry and supported verb, resolving parameters
//! (operation-level, path-level and `$ref`'d ones), flattening JSON request
//! bodies into body parameters, and collecting response codes. Any
//! resolution error aborts the whole walk; there is no partial endpoint list.

pub mod reference;
pub mod schema;

use std::collections::HashSet;

use serde_json::Value;
use tracing::{debug, info};

use crate::document::ApiDocument;
use crate::error::{ProbeError, Result};
use crate::model::{
    Endpoint, HttpMethod, Parameter, ParameterLocation, RequestBody, ResponseCode, Schema,
};
use reference::{follow, RefChain};
use schema::{resolve_schema, string_list};

/// Resolve a document into its ordered list of endpoints.
pub fn resolve(document: &ApiDocument) -> Result<Vec<Endpoint>> {
    SchemaResolver::new(document).resolve()
}

/// Turns an `ApiDocument` into normalized `Endpoint`s.
pub struct SchemaResolver<'a> {
    root: &'a Value,
    legacy: bool,
}

impl<'a> SchemaResolver<'a> {
    pub fn new(document: &'a ApiDocument) -> Self {
        Self {
            root: &document.raw,
            legacy: document.version.is_legacy(),
        }
    }

    pub fn resolve(&self) -> Result<Vec<Endpoint>> {
        let Some(paths) = self.root.get("paths").and_then(Value::as_object) else {
            info!("document declares no paths");
            return Ok(Vec::new());
        };

        let mut endpoints = Vec::new();
        let mut seen_ids = HashSet::new();

        for (path, item) in paths {
            let Some(operations) = item.as_object() else {
                continue;
            };
            let shared_params = item.get("parameters");

            for (verb, operation) in operations {
                let Some(method) = HttpMethod::from_str_lenient(verb) else {
                    continue;
                };
                let mut endpoint = self.resolve_operation(path, method, operation, shared_params)?;
                endpoint.id = unique_id(endpoint.id, &mut seen_ids);
                debug!(
                    endpoint = %endpoint.id,
                    parameters = endpoint.parameters.len(),
                    "endpoint resolved"
                );
                endpoints.push(endpoint);
            }
        }

        info!(endpoints = endpoints.len(), "document resolved");
        Ok(endpoints)
    }

    fn resolve_operation(
        &self,
        path: &str,
        method: HttpMethod,
        operation: &Value,
        shared_params: Option<&Value>,
    ) -> Result<Endpoint> {
        let mut parameters = self.resolve_parameters(operation, shared_params)?;

        let request_body = match operation.get("requestBody") {
            Some(body) => self.resolve_request_body(body)?,
            None => None,
        };
        if let Some(body) = &request_body {
            parameters.extend(flatten_body(&body.schema));
        }

        Ok(Endpoint {
            id: Endpoint::identity(method, path),
            method,
            path: path.to_string(),
            summary: text(operation, "summary"),
            description: text(operation, "description"),
            tags: string_list(operation.get("tags")),
            parameters,
            request_body,
            responses: self.resolve_responses(operation)?,
            security: self.security_names(operation),
        })
    }

    /// Operation parameters first, then path-level ones the operation does
    /// not override (same name and location).
    fn resolve_parameters(
        &self,
        operation: &Value,
        shared_params: Option<&Value>,
    ) -> Result<Vec<Parameter>> {
        let own = self.resolve_parameter_list(operation.get("parameters"))?;
        let inherited = self.resolve_parameter_list(shared_params)?;

        let mut parameters = own;
        for param in inherited {
            let overridden = parameters
                .iter()
                .any(|p| p.name == param.name && p.location == param.location);
            if !overridden {
                parameters.push(param);
            }
        }
        Ok(parameters)
    }

    fn resolve_parameter_list(&self, list: Option<&Value>) -> Result<Vec<Parameter>> {
        let Some(items) = list.and_then(Value::as_array) else {
            return Ok(Vec::new());
        };

        let mut parameters = Vec::new();
        for item in items {
            let mut chain = RefChain::new();
            let param = follow(self.root, item, &mut chain)?;
            let name = param
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| ProbeError::Document("parameter without a name".into()))?;
            let location = param
                .get("in")
                .and_then(Value::as_str)
                .and_then(ParameterLocation::from_str_lenient);
            let Some(location) = location else {
                debug!(parameter = name, "skipping parameter with unsupported location");
                continue;
            };

            // Swagger 2.0 body parameter: flatten its schema like a request body.
            if self.legacy && param.get("in").and_then(Value::as_str) == Some("body") {
                if let Some(raw) = param.get("schema") {
                    let body = resolve_schema(self.root, raw, &mut chain)?;
                    parameters.extend(flatten_body(&body));
                }
                continue;
            }

            // OpenAPI 3 nests the schema; Swagger 2.0 puts constraints on the parameter.
            let schema = match param.get("schema") {
                Some(raw) => resolve_schema(self.root, raw, &mut chain)?,
                None => resolve_schema(self.root, param, &mut chain)?,
            };

            parameters.push(Parameter {
                name: name.to_string(),
                location,
                required: param
                    .get("required")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
                schema,
                description: text(param, "description"),
            });
        }
        Ok(parameters)
    }

    /// The first JSON media type of a request body.
    fn resolve_request_body(&self, body: &Value) -> Result<Option<RequestBody>> {
        let mut chain = RefChain::new();
        let body = follow(self.root, body, &mut chain)?;
        let Some(content) = body.get("content").and_then(Value::as_object) else {
            return Ok(None);
        };

        for (media_type, details) in content {
            if !media_type.contains("json") {
                continue;
            }
            let schema = match details.get("schema") {
                Some(raw) => resolve_schema(self.root, raw, &mut chain)?,
                None => Schema::default(),
            };
            return Ok(Some(RequestBody {
                media_type: media_type.clone(),
                schema,
            }));
        }
        Ok(None)
    }

    fn resolve_responses(&self, operation: &Value) -> Result<Vec<ResponseCode>> {
        let Some(responses) = operation.get("responses").and_then(Value::as_object) else {
            return Ok(Vec::new());
        };
        let mut codes = Vec::new();
        for (code, details) in responses {
            let details = follow(self.root, details, &mut RefChain::new())?;
            codes.push(ResponseCode {
                code: code.clone(),
                description: text(details, "description"),
            });
        }
        Ok(codes)
    }

    /// Scheme names from the operation's `security`, else the document's.
    fn security_names(&self, operation: &Value) -> Vec<String> {
        let requirements = operation
            .get("security")
            .or_else(|| self.root.get("security"))
            .and_then(Value::as_array);
        let mut names: Vec<String> = Vec::new();
        for requirement in requirements.into_iter().flatten() {
            if let Some(obj) = requirement.as_object() {
                for name in obj.keys() {
                    if !names.contains(name) {
                        names.push(name.clone());
                    }
                }
            }
        }
        names
    }
}

/// One body parameter per top-level property of an object schema.
fn flatten_body(schema: &Schema) -> Vec<Parameter> {
    schema
        .properties
        .iter()
        .map(|prop| Parameter {
            name: prop.name.clone(),
            location: ParameterLocation::Body,
            required: schema.requires(&prop.name),
            schema: prop.schema.clone(),
            description: prop.schema.description.clone().unwrap_or_default(),
        })
        .collect()
}

/// Identities must not collide within one document; later duplicates get a
/// numeric suffix in document order.
fn unique_id(id: String, seen: &mut HashSet<String>) -> String {
    if seen.insert(id.clone()) {
        return id;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{id}_{n}");
        if seen.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

fn text(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}
