//! Aggregated tool catalog
//!
//! Tools from every connected server live in one flat namespace under
//! qualified names (`server_tool`). The catalog is rebuilt wholesale on each
//! successful initialization and read everywhere else.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use super::transport::DiscoveredTool;

/// Join a server name and a local tool name into a qualified name.
pub fn qualify(server: &str, tool: &str) -> String {
    format!("{}_{}", server, tool)
}

/// Recover `(server, local_tool)` from a qualified name.
///
/// Splits on the first underscore only, so local tool names may themselves
/// contain underscores. Returns `None` when there is no underscore at all.
pub fn split_qualified(qualified: &str) -> Option<(&str, &str)> {
    qualified.split_once('_')
}

/// Parameter schema advertised to the LLM: the `type`/`properties`/`required`
/// triple of the tool's input schema, with every other field dropped.
#[derive(Debug, Clone, Serialize)]
pub struct ToolParameters {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub properties: Value,
    pub required: Vec<String>,
}

impl Default for ToolParameters {
    fn default() -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: Value::Object(serde_json::Map::new()),
            required: Vec::new(),
        }
    }
}

impl ToolParameters {
    pub fn from_schema(schema: Option<&Value>) -> Self {
        let Some(Value::Object(obj)) = schema else {
            return Self::default();
        };

        Self {
            schema_type: obj
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("object")
                .to_string(),
            properties: obj
                .get("properties")
                .cloned()
                .unwrap_or_else(|| Value::Object(serde_json::Map::new())),
            required: obj
                .get("required")
                .and_then(Value::as_array)
                .map(|arr| {
                    arr.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

/// One catalog entry, ready to advertise.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub qualified_name: String,
    pub description: String,
    pub parameters: ToolParameters,
}

/// Function-calling wire format: `{"type": "function", "function": {...}}`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: FunctionSpec,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionSpec {
    pub name: String,
    pub description: String,
    pub parameters: ToolParameters,
}

impl ToolDescriptor {
    pub fn to_spec(&self) -> ToolSpec {
        ToolSpec {
            kind: "function",
            function: FunctionSpec {
                name: self.qualified_name.clone(),
                description: self.description.clone(),
                parameters: self.parameters.clone(),
            },
        }
    }
}

/// The aggregate mapping of qualified tool names to descriptors, plus the
/// reverse index back to the owning server.
#[derive(Debug, Default)]
pub struct ToolCatalog {
    tools: Vec<ToolDescriptor>,
    owners: HashMap<String, String>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a discovered tool under its qualified name.
    pub fn insert(&mut self, server: &str, tool: &DiscoveredTool) {
        let qualified_name = qualify(server, &tool.name);
        self.owners.insert(qualified_name.clone(), server.to_string());
        self.tools.push(ToolDescriptor {
            qualified_name,
            description: tool.description.clone().unwrap_or_default(),
            parameters: ToolParameters::from_schema(tool.input_schema.as_ref()),
        });
    }

    /// Wire-ready snapshot of every tool.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(ToolDescriptor::to_spec).collect()
    }

    /// The server a qualified name belongs to.
    pub fn owner_of(&self, qualified: &str) -> Option<&str> {
        self.owners.get(qualified).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.tools.iter().map(|t| t.qualified_name.as_str())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
