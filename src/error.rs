use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProbeError>;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Failed to fetch document from {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Invalid document: {0}")]
    Document(String),

    #[error("Schema reference cycle: {}", chain.join(" -> "))]
    SchemaCycle { chain: Vec<String> },

    #[error("Unresolved reference: {0}")]
    UnresolvedReference(String),

    #[error("A run is already in progress")]
    RunInProgress,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ProbeError {
    pub fn exit_code(&self) -> i32 {
        2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_message_shows_chain() {
        let err = ProbeError::SchemaCycle {
            chain: vec![
                "#/components/schemas/A".into(),
                "#/components/schemas/B".into(),
                "#/components/schemas/A".into(),
            ],
        };
        assert_eq!(
            err.to_string(),
            "Schema reference cycle: #/components/schemas/A -> #/components/schemas/B -> #/components/schemas/A"
        );
    }
}
