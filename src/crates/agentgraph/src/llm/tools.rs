//! Tool definitions consumed by function-calling models.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Definition of a tool an LLM may call: name, description, and a JSON
/// Schema for its arguments. The adapter layer translates this into each
/// provider's tool-calling wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for the arguments object.
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: serde_json::json!({"type": "object", "properties": {}}),
        }
    }

    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = parameters;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_definition_defaults_to_empty_object_schema() {
        let def = ToolDefinition::new("back", "Press the platform back control");
        assert_eq!(def.parameters["type"], "object");

        let def = def.with_parameters(json!({
            "type": "object",
            "properties": {"agent_thought": {"type": "string"}},
            "required": ["agent_thought"]
        }));
        assert_eq!(def.parameters["required"][0], "agent_thought");
    }
}
