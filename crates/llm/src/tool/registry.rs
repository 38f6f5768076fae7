use std::{fmt, future::Future, sync::Arc};

use indexmap::IndexMap;
use serde_json::{Value, json};

use super::{AsyncHandler, SyncHandler, ToolArguments, ToolContext, ToolHandler};
use crate::messages::unified::{JsonObject, UnifiedTool, UnifiedToolParameters};

/// One declared parameter of a tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDescriptor {
    pub name: String,
    pub description: Option<String>,
    /// JSON schema of the value, e.g. `{"type": "number"}`.
    pub schema: Value,
    pub required: bool,
}

impl ParamDescriptor {
    pub fn required(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            description: None,
            schema,
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, schema: Value) -> Self {
        Self {
            required: false,
            ..Self::required(name, schema)
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The `type` keyword of the schema, if it is a single type name.
    pub fn schema_type(&self) -> Option<&str> {
        self.schema.get("type").and_then(Value::as_str)
    }

    /// Schema advertised to the model: the declared schema with the description merged in.
    fn catalog_schema(&self) -> Value {
        let mut schema = match &self.schema {
            Value::Object(schema) => schema.clone(),
            _ => JsonObject::new(),
        };

        if let Some(description) = &self.description {
            schema.insert("description".to_string(), json!(description));
        }

        Value::Object(schema)
    }
}

/// A declared tool: name, description, ordered parameters and optionally its handler.
#[derive(Clone)]
pub struct ToolDefinition {
    name: String,
    description: String,
    params: Vec<ParamDescriptor>,
    handler: Option<Arc<dyn ToolHandler>>,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
            handler: None,
        }
    }

    pub fn param(mut self, param: ParamDescriptor) -> Self {
        self.params.push(param);
        self
    }

    pub fn handler(mut self, handler: impl ToolHandler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn sync_handler<F, O>(self, function: F) -> Self
    where
        F: Fn(ToolArguments, &ToolContext) -> anyhow::Result<O> + Send + Sync + 'static,
        O: Into<super::ToolOutput> + 'static,
    {
        self.handler(SyncHandler::new(function))
    }

    pub fn async_handler<F, Fut, O>(self, function: F) -> Self
    where
        F: Fn(ToolArguments, ToolContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<O>> + Send + 'static,
        O: Into<super::ToolOutput> + 'static,
    {
        self.handler(AsyncHandler::new(function))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn params(&self) -> &[ParamDescriptor] {
        &self.params
    }

    /// The handler given at registration, if any.
    pub fn registered_handler(&self) -> Option<&Arc<dyn ToolHandler>> {
        self.handler.as_ref()
    }

    /// The catalog entry sent to the model.
    pub fn to_unified(&self) -> UnifiedTool {
        let properties = self
            .params
            .iter()
            .map(|param| (param.name.clone(), param.catalog_schema()))
            .collect();

        let required = self
            .params
            .iter()
            .filter(|param| param.required)
            .map(|param| param.name.clone())
            .collect::<Vec<_>>();

        UnifiedTool {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: UnifiedToolParameters {
                schema_type: "object".to_string(),
                properties,
                required: (!required.is_empty()).then_some(required),
            },
        }
    }
}

impl fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("has_handler", &self.handler.is_some())
            .finish_non_exhaustive()
    }
}

/// Finds the handler serving a tool within a context.
pub trait ToolResolver: Send + Sync {
    fn resolve(&self, tool: &ToolDefinition, ctx: &ToolContext) -> Option<Arc<dyn ToolHandler>>;
}

/// Serves every tool with the handler it was registered with.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultResolver;

impl ToolResolver for DefaultResolver {
    fn resolve(&self, tool: &ToolDefinition, _: &ToolContext) -> Option<Arc<dyn ToolHandler>> {
        tool.registered_handler().cloned()
    }
}

/// The table of known tools, keyed by name in registration order.
#[derive(Debug, Default, Clone)]
pub struct ToolRegistry {
    tools: IndexMap<String, ToolDefinition>,
}

impl ToolRegistry {
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    /// Tool catalog in registration order, ready for [`crate::UnifiedRequest::tools`].
    pub fn catalog(&self) -> Vec<UnifiedTool> {
        self.tools.values().map(ToolDefinition::to_unified).collect()
    }
}

#[derive(Debug, Default)]
pub struct ToolRegistryBuilder {
    tools: IndexMap<String, ToolDefinition>,
}

impl ToolRegistryBuilder {
    /// Adds a tool. A tool with the same name replaces the earlier one in place.
    pub fn tool(mut self, tool: ToolDefinition) -> Self {
        if let Some(previous) = self.tools.insert(tool.name.clone(), tool) {
            log::warn!("Tool '{}' registered twice, keeping the last definition", previous.name);
        }

        self
    }

    pub fn build(self) -> ToolRegistry {
        log::debug!("Tool registry built with {} tool(s)", self.tools.len());

        ToolRegistry { tools: self.tools }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn registry() -> ToolRegistry {
        ToolRegistry::builder()
            .tool(
                ToolDefinition::new("get_weather", "Current weather for a city")
                    .param(ParamDescriptor::required("city", json!({"type": "string"})).description("City name"))
                    .param(ParamDescriptor::optional(
                        "unit",
                        json!({"type": "string", "enum": ["celsius", "fahrenheit"]}),
                    ))
                    .sync_handler(|_, _| Ok("sunny")),
            )
            .tool(ToolDefinition::new("ping", "Health check"))
            .build()
    }

    #[test]
    fn catalog_is_built_from_descriptors() {
        insta::assert_json_snapshot!(registry().catalog(), @r#"
        [
          {
            "name": "get_weather",
            "description": "Current weather for a city",
            "parameters": {
              "type": "object",
              "properties": {
                "city": {
                  "description": "City name",
                  "type": "string"
                },
                "unit": {
                  "enum": [
                    "celsius",
                    "fahrenheit"
                  ],
                  "type": "string"
                }
              },
              "required": [
                "city"
              ]
            }
          },
          {
            "name": "ping",
            "description": "Health check",
            "parameters": {
              "type": "object",
              "properties": {}
            }
          }
        ]
        "#);
    }

    #[test]
    fn later_registration_wins() {
        let registry = ToolRegistry::builder()
            .tool(ToolDefinition::new("echo", "first"))
            .tool(ToolDefinition::new("other", "other"))
            .tool(ToolDefinition::new("echo", "second"))
            .build();

        assert_eq!(registry.names().collect::<Vec<_>>(), ["echo", "other"]);
        assert_eq!(registry.get("echo").unwrap().description(), "second");
    }

    #[test]
    fn default_resolver_uses_registered_handler() {
        let registry = registry();
        let ctx = ToolContext::new();

        assert!(DefaultResolver.resolve(registry.get("get_weather").unwrap(), &ctx).is_some());
        assert!(DefaultResolver.resolve(registry.get("ping").unwrap(), &ctx).is_none());
    }
}
