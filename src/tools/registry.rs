//! Tool registry and dispatcher.
//!
//! Tools are registered once at startup with a descriptor (name, description,
//! JSON Schema of the parameters) and a handler. The handler built by
//! [`ToolBuilder`] parses and validates arguments before the tool body runs,
//! and runs the body under [`with_error_envelope`].

use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

use super::context::ToolContext;
use super::envelope::{with_error_envelope, ToolOutput};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("Tool '{0}' is already registered")]
    DuplicateTool(String),

    #[error("Unknown tool '{0}'")]
    UnknownTool(String),

    #[error("Invalid arguments for tool '{tool}': {reason}")]
    InvalidArgument { tool: String, reason: String },
}

/// Argument checks that a JSON Schema type alone cannot express.
pub trait Validate {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

pub type ToolFuture = Pin<Box<dyn Future<Output = Result<ToolOutput, ToolError>> + Send>>;

pub type ToolHandler = Arc<dyn Fn(ToolContext, Map<String, Value>) -> ToolFuture + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Map<String, Value>,
}

pub struct RegisteredTool {
    pub descriptor: ToolDescriptor,
    pub handler: ToolHandler,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvocationRequest {
    pub tool_name: String,
    pub arguments: Map<String, Value>,
}

impl InvocationRequest {
    pub fn new(tool_name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
        }
    }
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: RegisteredTool) -> Result<(), ToolError> {
        let name = tool.descriptor.name.clone();
        if self.index.contains_key(&name) {
            return Err(ToolError::DuplicateTool(name));
        }
        tracing::debug!(tool = %name, "Registered tool");
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter().map(|tool| &tool.descriptor)
    }

    pub fn descriptor(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&i| &self.tools[i].descriptor)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub async fn invoke(
        &self,
        ctx: &ToolContext,
        request: InvocationRequest,
    ) -> Result<ToolOutput, ToolError> {
        let Some(&i) = self.index.get(&request.tool_name) else {
            tracing::warn!(tool = %request.tool_name, "Call for unknown tool");
            return Err(ToolError::UnknownTool(request.tool_name));
        };

        let handler = Arc::clone(&self.tools[i].handler);
        handler(ctx.clone(), request.arguments).await
    }
}

pub struct ToolBuilder {
    name: String,
    description: String,
}

impl ToolBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
        }
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Finishes the tool. `P` supplies both the advertised schema and the
    /// argument parsing; `body` only ever sees validated parameters.
    pub fn build<P, F, Fut>(self, body: F) -> RegisteredTool
    where
        P: DeserializeOwned + JsonSchema + Validate + Send + 'static,
        F: Fn(ToolContext, P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        let descriptor = ToolDescriptor {
            name: self.name.clone(),
            description: self.description,
            input_schema: input_schema_for::<P>(),
        };

        let name: Arc<str> = Arc::from(self.name);
        let body = Arc::new(body);
        let handler: ToolHandler = Arc::new(
            move |ctx: ToolContext, arguments: Map<String, Value>| -> ToolFuture {
                let name = Arc::clone(&name);
                let body = Arc::clone(&body);
                Box::pin(async move {
                    let params = parse_arguments::<P>(&name, arguments)?;
                    Ok(with_error_envelope(&name, body(ctx, params)).await)
                })
            },
        );

        RegisteredTool {
            descriptor,
            handler,
        }
    }
}

fn parse_arguments<P>(tool: &str, arguments: Map<String, Value>) -> Result<P, ToolError>
where
    P: DeserializeOwned + Validate,
{
    let invalid = |reason: String| ToolError::InvalidArgument {
        tool: tool.to_string(),
        reason,
    };

    let params: P = serde_json::from_value(Value::Object(arguments))
        .map_err(|e| invalid(e.to_string()))?;
    params.validate().map_err(invalid)?;
    Ok(params)
}

/// JSON Schema (draft 7) of a parameter struct, as an object map.
pub fn input_schema_for<P: JsonSchema>() -> Map<String, Value> {
    let generator = SchemaSettings::draft07()
        .with(|s| {
            s.option_nullable = true;
            s.option_add_null_type = false;
        })
        .into_generator();
    let schema = generator.into_root_schema_for::<P>();

    match serde_json::to_value(schema) {
        Ok(Value::Object(mut object)) => {
            object.remove("$schema");
            object
        }
        _ => Map::new(),
    }
}
