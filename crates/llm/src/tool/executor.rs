use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use super::{DefaultResolver, ParamDescriptor, ToolArguments, ToolContext, ToolRegistry, ToolResolver};
use crate::messages::unified::{JsonObject, UnifiedContent, UnifiedToolResult, UnifiedToolUse};

/// Outcome of one tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub tool_use_id: String,
    pub tool_name: String,
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(tool_use: &UnifiedToolUse, content: impl Into<String>) -> Self {
        Self {
            tool_use_id: tool_use.id.clone(),
            tool_name: tool_use.name.clone(),
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(tool_use: &UnifiedToolUse, message: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::success(tool_use, message)
        }
    }

    /// The result as a `tool_result` content block.
    pub fn to_content(&self) -> UnifiedContent {
        UnifiedContent::ToolResult(UnifiedToolResult {
            tool_use_id: self.tool_use_id.clone(),
            tool_name: Some(self.tool_name.clone()),
            content: self.content.clone(),
            is_error: Some(self.is_error),
        })
    }
}

/// Runs tool calls against a [`ToolRegistry`].
#[derive(Clone)]
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    resolver: Arc<dyn ToolResolver>,
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            resolver: Arc::new(DefaultResolver),
        }
    }

    /// Replaces the resolver picking handlers for each context.
    pub fn with_resolver(mut self, resolver: impl ToolResolver + 'static) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    /// Executes one call. Failures become error results and never propagate.
    pub async fn execute(&self, tool_use: &UnifiedToolUse, ctx: &ToolContext) -> ToolResult {
        let Some(tool) = self.registry.get(&tool_use.name) else {
            log::debug!("Model requested unknown tool '{}'", tool_use.name);
            return ToolResult::error(tool_use, format!("Tool {} not found", tool_use.name));
        };

        let Some(handler) = self.resolver.resolve(tool, ctx) else {
            log::warn!("No handler resolved for tool '{}'", tool_use.name);
            return ToolResult::error(tool_use, format!("Tool {} has no handler", tool_use.name));
        };

        let args = match bind_arguments(tool.params(), tool_use.input.as_ref()) {
            Ok(args) => args,
            Err(message) => return ToolResult::error(tool_use, message),
        };

        match handler.call(args, ctx).await {
            Ok(output) => ToolResult::success(tool_use, output.render()),
            Err(error) => {
                log::debug!("Tool '{}' failed: {error:#}", tool_use.name);
                ToolResult::error(tool_use, error.to_string())
            }
        }
    }

    /// Executes all calls concurrently. Results are in the order of `tool_uses`.
    pub async fn execute_all(&self, tool_uses: &[UnifiedToolUse], ctx: &ToolContext) -> Vec<ToolResult> {
        let futures = tool_uses.iter().map(|tool_use| self.execute(tool_use, ctx));
        futures::future::join_all(futures).await
    }
}

/// Binds the model's input to the declared parameters.
fn bind_arguments(params: &[ParamDescriptor], input: Option<&JsonObject>) -> Result<ToolArguments, String> {
    let mut args = ToolArguments::default();

    for param in params {
        let value = input.and_then(|input| input.get(&param.name)).filter(|value| !value.is_null());

        let Some(value) = value else {
            if param.required {
                return Err(format!("Required parameter '{}' is missing", param.name));
            }

            args.insert(param.name.clone(), Value::Null);
            continue;
        };

        let value = match param.schema_type() {
            Some(expected) => coerce(value, expected)
                .ok_or_else(|| format!("Invalid value for parameter '{}': expected {expected}", param.name))?,
            None => value.clone(),
        };

        args.insert(param.name.clone(), value);
    }

    Ok(args)
}

/// Checks `value` against a JSON schema type name. Numeric strings are accepted for numbers.
fn coerce(value: &Value, expected: &str) -> Option<Value> {
    match (expected, value) {
        ("string", Value::String(_))
        | ("boolean", Value::Bool(_))
        | ("object", Value::Object(_))
        | ("array", Value::Array(_))
        | ("number", Value::Number(_)) => Some(value.clone()),
        ("integer", Value::Number(number)) => integer(number).map(Value::Number),
        ("number", Value::String(text)) => {
            let text = text.trim();

            match text.parse::<i64>() {
                Ok(integer) => Some(Value::from(integer)),
                Err(_) => text.parse::<f64>().ok().and_then(Number::from_f64).map(Value::Number),
            }
        }
        ("integer", Value::String(text)) => text.trim().parse::<i64>().ok().map(Value::from),
        ("string" | "boolean" | "object" | "array" | "number" | "integer", _) => None,
        _ => Some(value.clone()),
    }
}

fn integer(number: &Number) -> Option<Number> {
    if number.is_i64() || number.is_u64() {
        return Some(number.clone());
    }

    number
        .as_f64()
        .filter(|float| float.fract() == 0.0 && float.abs() < i64::MAX as f64)
        .map(|float| Number::from(float as i64))
}
