//! OpenAPI / Swagger document loading.
//!
//! A document is kept as a raw JSON tree; the resolver walks it to produce
//! endpoints. YAML input is converted to the same JSON tree on load.

pub mod fetch;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{ProbeError, Result};

pub use fetch::fetch_document;

/// A parsed API description document.
#[derive(Debug, Clone)]
pub struct ApiDocument {
    pub raw: Value,
    pub version: DocumentVersion,
    /// SHA-256 of the source text, hex encoded. Recorded on the project to
    /// tell whether a re-import brought a different document.
    pub fingerprint: String,
}

fn digest(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

impl ApiDocument {
    /// Parse a JSON or YAML document.
    pub fn parse_str(content: &str) -> Result<Self> {
        let raw: Value = match serde_json::from_str(content) {
            Ok(value) => value,
            Err(_) => serde_yaml::from_str(content)?,
        };
        Self::with_fingerprint(raw, digest(content))
    }

    /// Wrap an already-deserialized document tree. The fingerprint is taken
    /// over its compact JSON form.
    pub fn from_value(raw: Value) -> Result<Self> {
        let fingerprint = digest(&raw.to_string());
        Self::with_fingerprint(raw, fingerprint)
    }

    fn with_fingerprint(raw: Value, fingerprint: String) -> Result<Self> {
        if !raw.is_object() {
            return Err(ProbeError::Document(
                "document root must be a mapping".into(),
            ));
        }
        let version = DocumentVersion::detect(&raw);
        Ok(Self {
            raw,
            version,
            fingerprint,
        })
    }

    /// Base URL for requests against the described API.
    ///
    /// Prefers the first entry of `servers`, then `scheme://host + basePath`,
    /// otherwise an empty string (the caller must supply one).
    pub fn base_url(&self) -> String {
        if let Some(url) = self
            .raw
            .get("servers")
            .and_then(Value::as_array)
            .and_then(|servers| servers.first())
            .and_then(|server| server.get("url"))
            .and_then(Value::as_str)
        {
            return url.to_string();
        }

        if let Some(host) = self.raw.get("host").and_then(Value::as_str) {
            let scheme = self
                .raw
                .get("schemes")
                .and_then(Value::as_array)
                .and_then(|schemes| schemes.first())
                .and_then(Value::as_str)
                .unwrap_or("https");
            let base_path = self
                .raw
                .get("basePath")
                .and_then(Value::as_str)
                .unwrap_or("");
            return format!("{scheme}://{host}{base_path}");
        }

        String::new()
    }

    pub fn info(&self) -> DocumentInfo {
        let info = self.raw.get("info");
        let text = |key: &str| {
            info.and_then(|i| i.get(key))
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string()
        };
        DocumentInfo {
            title: text("title"),
            description: text("description"),
            version: text("version"),
        }
    }
}

/// The `info` block of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub title: String,
    pub description: String,
    pub version: String,
}

/// Which schema dialect a document is written in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentVersion {
    OpenApi(semver::Version),
    Swagger(String),
    Unknown,
}

impl DocumentVersion {
    pub fn detect(raw: &Value) -> Self {
        if let Some(v) = raw.get("openapi") {
            return match parse_lenient(&scalar_text(v)) {
                Some(version) => Self::OpenApi(version),
                None => Self::Unknown,
            };
        }
        if let Some(v) = raw.get("swagger") {
            return Self::Swagger(scalar_text(v));
        }
        Self::Unknown
    }

    /// Swagger 2.0 documents declare bodies as `in: body` parameters.
    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::Swagger(_))
    }

    /// Human-readable label, e.g. "OpenAPI 3.0.1" or "Swagger 2.0".
    pub fn label(&self) -> String {
        match self {
            Self::OpenApi(v) => format!("OpenAPI {v}"),
            Self::Swagger(v) => format!("Swagger {v}"),
            Self::Unknown => "Unknown".into(),
        }
    }
}

// Unquoted YAML versions (`swagger: 2.0`) arrive as numbers.
fn scalar_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Accept `3.0` as well as `3.0.3`.
fn parse_lenient(v: &str) -> Option<semver::Version> {
    let v = v.trim();
    semver::Version::parse(v)
        .ok()
        .or_else(|| semver::Version::parse(&format!("{v}.0")).ok())
}
