use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A function the model may call.
///
/// Serialized in the OpenAI `{"type": "function", "function": {...}}` shape;
/// the Anthropic client reads the flat fields directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireTool", from = "WireTool")]
pub struct Tool {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments object
    pub parameters: Value,
}

impl Tool {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of the schema's required properties
    pub fn required_args(&self) -> Vec<&str> {
        self.parameters
            .get("required")
            .and_then(Value::as_array)
            .map(|fields| fields.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

#[derive(Serialize, Deserialize)]
struct WireTool {
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: WireFunction,
}

#[derive(Serialize, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    description: String,
    #[serde(default)]
    parameters: Value,
}

fn function_kind() -> String {
    "function".to_string()
}

impl From<Tool> for WireTool {
    fn from(tool: Tool) -> Self {
        Self {
            kind: function_kind(),
            function: WireFunction {
                name: tool.name,
                description: tool.description,
                parameters: tool.parameters,
            },
        }
    }
}

impl From<WireTool> for Tool {
    fn from(wire: WireTool) -> Self {
        Self::new(wire.function.name, wire.function.description, wire.function.parameters)
    }
}

/// A call the assistant asked for. `arguments` is the raw JSON text the
/// model produced, which may be partial or malformed until validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireToolCall", from = "WireToolCall")]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: &Value) -> Self {
        Self::from_raw(id, name, arguments.to_string())
    }

    /// Build from already-encoded argument text (as streamed by a provider)
    pub fn from_raw(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parse_arguments<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(self.raw_arguments())
    }

    /// Arguments as a JSON value; a blank argument string reads as `{}`
    pub fn arguments_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(self.raw_arguments())
    }

    fn raw_arguments(&self) -> &str {
        match self.arguments.trim() {
            "" => "{}",
            raw => raw,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: WireCall,
}

#[derive(Serialize, Deserialize)]
struct WireCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

impl From<ToolCall> for WireToolCall {
    fn from(call: ToolCall) -> Self {
        Self {
            id: call.id,
            kind: function_kind(),
            function: WireCall {
                name: call.name,
                arguments: call.arguments,
            },
        }
    }
}

impl From<WireToolCall> for ToolCall {
    fn from(wire: WireToolCall) -> Self {
        Self::from_raw(wire.id, wire.function.name, wire.function.arguments)
    }
}

/// How strongly the model is pushed towards tools on one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolChoice {
    Auto,
    /// Tools are offered but must not be called
    None,
    /// At least one call, any tool
    Required,
    /// Exactly this tool
    Tool(String),
}

impl ToolChoice {
    pub fn auto() -> Self {
        Self::Auto
    }

    pub fn none() -> Self {
        Self::None
    }

    pub fn required() -> Self {
        Self::Required
    }

    pub fn force(tool_name: impl Into<String>) -> Self {
        Self::Tool(tool_name.into())
    }

    /// Value of OpenAI's `tool_choice` field
    pub fn to_openai(&self) -> Value {
        match self {
            Self::Auto => Value::from("auto"),
            Self::None => Value::from("none"),
            Self::Required => Value::from("required"),
            Self::Tool(name) => serde_json::json!({ "type": "function", "function": { "name": name } }),
        }
    }
}

impl Serialize for ToolChoice {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_openai().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_call_wire_shape_round_trips_through_history() {
        let call = ToolCall::new("call_9", "AskUserInput", &json!({ "question": "Budget?" }));
        let wire = serde_json::to_value(&call).unwrap();

        assert_eq!(wire["type"], "function");
        assert_eq!(wire["function"]["name"], "AskUserInput");
        assert_eq!(serde_json::from_value::<ToolCall>(wire).unwrap(), call);
    }

    #[test]
    fn test_required_args() {
        let tool = Tool::new(
            "ScrapeWebsite",
            "Scrape a site",
            json!({ "type": "object", "required": ["url"] }),
        );
        assert_eq!(tool.required_args(), vec!["url"]);
        assert!(Tool::new("Noop", "", json!({})).required_args().is_empty());
    }
}
