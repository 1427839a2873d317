//! Tool contracts shared between the registry, the loop and the model client.
//!
//! Descriptors are built once at startup and shared read-only; the model sees
//! exactly what the registry validates against.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Arguments attached to a tool call, as produced by the model.
pub type ToolArgs = Map<String, Value>;

/// Value type of a single tool parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    String,
    Array(Box<ParamType>),
}

impl ParamType {
    /// Lower-case JSON Schema type name.
    pub fn json_type(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Array(_) => "array",
        }
    }

    fn json_schema(&self, description: Option<&str>) -> Value {
        let mut schema = Map::new();
        schema.insert("type".to_string(), json!(self.json_type()));
        if let ParamType::Array(items) = self {
            schema.insert("items".to_string(), items.json_schema(None));
        }
        if let Some(description) = description {
            schema.insert("description".to_string(), json!(description));
        }
        Value::Object(schema)
    }
}

/// One declared parameter of a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    pub ty: ParamType,
    pub required: bool,
    pub description: String,
}

impl ParamSpec {
    pub fn required(name: &str, ty: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            ty,
            required: true,
            description: description.to_string(),
        }
    }

    pub fn optional(name: &str, ty: ParamType, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, ty, description)
        }
    }
}

/// Name, description and ordered parameter list of a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
}

impl ToolDescriptor {
    pub fn new(name: &str, description: &str, params: Vec<ParamSpec>) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            params,
        }
    }

    /// Names of the parameters that must be present, in declaration order.
    pub fn required_params(&self) -> Vec<&str> {
        self.params
            .iter()
            .filter(|param| param.required)
            .map(|param| param.name.as_str())
            .collect()
    }

    /// JSON Schema (object) describing the accepted arguments.
    ///
    /// Unknown arguments are rejected so a misspelled parameter surfaces as an
    /// error instead of being silently dropped.
    pub fn parameters_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.params {
            properties.insert(
                param.name.clone(),
                param.ty.json_schema(Some(&param.description)),
            );
        }
        json!({
            "type": "object",
            "properties": Value::Object(properties),
            "required": self.required_params(),
            "additionalProperties": false,
        })
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub args: ToolArgs,
}

impl ToolCall {
    pub fn new(name: &str, args: Value) -> Self {
        let args = match args {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            name: name.to_string(),
            args,
        }
    }
}

/// Token counters reported alongside a model response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub response_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ToolDescriptor {
        ToolDescriptor::new(
            "run_script",
            "Run a script",
            vec![
                ParamSpec::required("file_path", ParamType::String, "Script path"),
                ParamSpec::optional(
                    "args",
                    ParamType::Array(Box::new(ParamType::String)),
                    "Arguments",
                ),
            ],
        )
    }

    #[test]
    fn parameters_schema_lists_required_and_items() {
        let schema = sample().parameters_schema();
        assert_eq!(schema["required"], json!(["file_path"]));
        assert_eq!(schema["properties"]["args"]["type"], json!("array"));
        assert_eq!(schema["properties"]["args"]["items"]["type"], json!("string"));
        assert_eq!(schema["additionalProperties"], json!(false));
    }

    #[test]
    fn tool_call_from_non_object_has_no_args() {
        let call = ToolCall::new("list_directory", Value::Null);
        assert!(call.args.is_empty());
    }
}
