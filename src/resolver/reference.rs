use serde_json::Value;

use crate::error::{ProbeError, Result};

/// The chain of `$ref` targets currently being expanded.
///
/// Entries are pushed when a reference is entered and popped when its
/// expansion finishes, so sibling uses of the same target are fine while a
/// target that re-enters itself is a cycle.
#[derive(Debug, Default)]
pub struct RefChain {
    stack: Vec<String>,
}

impl RefChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter `reference`, failing if it is already on the chain.
    pub fn enter(&mut self, reference: &str) -> Result<()> {
        if self.stack.iter().any(|r| r == reference) {
            let mut chain = self.stack.clone();
            chain.push(reference.to_string());
            return Err(ProbeError::SchemaCycle { chain });
        }
        self.stack.push(reference.to_string());
        Ok(())
    }

    pub fn leave(&mut self) {
        self.stack.pop();
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

/// The `$ref` string of an object, if it has one.
pub fn ref_of(value: &Value) -> Option<&str> {
    value.get("$ref").and_then(Value::as_str)
}

/// Look up an internal reference (`#/a/b/c`) in the document.
pub fn lookup<'a>(root: &'a Value, reference: &str) -> Result<&'a Value> {
    let pointer = reference
        .strip_prefix('#')
        .ok_or_else(|| ProbeError::UnresolvedReference(format!("{reference} (external)")))?;
    root.pointer(pointer)
        .ok_or_else(|| ProbeError::UnresolvedReference(reference.to_string()))
}

/// Follow a `$ref` chain on a non-schema object (parameter, request body,
/// response) until reaching an object without `$ref`.
pub fn follow<'a>(root: &'a Value, value: &'a Value, chain: &mut RefChain) -> Result<&'a Value> {
    let mut current = value;
    let start = chain.depth();
    let result = loop {
        let Some(reference) = ref_of(current) else {
            break Ok(current);
        };
        if let Err(e) = chain.enter(reference) {
            break Err(e);
        }
        match lookup(root, reference) {
            Ok(target) => current = target,
            Err(e) => break Err(e),
        }
    };
    while chain.depth() > start {
        chain.leave();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_handles_escaped_pointer_tokens() {
        let root = json!({"paths": {"/users": {"get": {"summary": "list"}}}});
        let found = lookup(&root, "#/paths/~1users/get").unwrap();
        assert_eq!(found["summary"], "list");
    }

    #[test]
    fn external_references_are_unresolved() {
        let root = json!({});
        let err = lookup(&root, "other.yaml#/Pet").unwrap_err();
        assert!(matches!(err, ProbeError::UnresolvedReference(_)));
    }

    #[test]
    fn follow_walks_chained_references() {
        let root = json!({
            "components": {
                "parameters": {
                    "Alias": {"$ref": "#/components/parameters/Id"},
                    "Id": {"name": "id", "in": "path"}
                }
            }
        });
        let mut chain = RefChain::new();
        let start = json!({"$ref": "#/components/parameters/Alias"});
        let resolved = follow(&root, &start, &mut chain).unwrap();
        assert_eq!(resolved["name"], "id");
        assert_eq!(chain.depth(), 0);
    }

    #[test]
    fn follow_detects_self_loop() {
        let root = json!({"components": {"parameters": {
            "A": {"$ref": "#/components/parameters/B"},
            "B": {"$ref": "#/components/parameters/A"}
        }}});
        let mut chain = RefChain::new();
        let start = json!({"$ref": "#/components/parameters/A"});
        let err = follow(&root, &start, &mut chain).unwrap_err();
        assert!(matches!(err, ProbeError::SchemaCycle { .. }));
        assert_eq!(chain.depth(), 0);
    }
}
