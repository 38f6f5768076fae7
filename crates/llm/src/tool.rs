//! Tool registration, execution and the tool-call loop.
//!
//! Tools are declared up front in a [`ToolRegistry`]. Each declaration carries ordered
//! parameter descriptors which drive both the catalog sent to the model and the binding
//! of the model's arguments before a handler runs. [`ToolExecutor`] never fails a call:
//! every problem ends up in an error [`ToolResult`] the model can read.

mod executor;
mod registry;
pub(crate) mod tool_loop;

use std::{future::Future, marker::PhantomData};

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

pub use self::{
    executor::{ToolExecutor, ToolResult},
    registry::{DefaultResolver, ParamDescriptor, ToolDefinition, ToolRegistry, ToolRegistryBuilder, ToolResolver},
    tool_loop::{Refresh, ToolLoop},
};

/// Scope in which tools are resolved and executed.
///
/// Passed explicitly to every execution entry point. Resolvers may use the scope to
/// hand out per-session handler instances.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolContext {
    scope: Option<String>,
}

impl ToolContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A context bound to the given scope, such as a session id.
    pub fn scoped(scope: impl Into<String>) -> Self {
        Self {
            scope: Some(scope.into()),
        }
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }
}

/// Arguments bound to a tool's parameter descriptors, in descriptor order.
///
/// Absent optional parameters are present with a `null` value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArguments {
    values: IndexMap<String, Value>,
}

impl ToolArguments {
    pub(crate) fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// The raw value of a parameter.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name).filter(|value| !value.is_null())
    }

    /// Deserializes a parameter into `T`.
    pub fn parse<T: DeserializeOwned>(&self, name: &str) -> anyhow::Result<T> {
        let value = self.values.get(name).cloned().unwrap_or(Value::Null);

        serde_json::from_value(value).map_err(|e| anyhow::anyhow!("Parameter '{name}': {e}"))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }
}

/// What a tool hands back to the model.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// Sent as is.
    Text(String),
    /// Sent as compact JSON with sorted keys. A JSON string is sent without quotes.
    Json(Value),
}

impl ToolOutput {
    /// Serializes any value into a JSON output.
    pub fn json<T: Serialize>(value: T) -> anyhow::Result<Self> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }

    /// The text sent back to the model.
    pub fn render(&self) -> String {
        match self {
            ToolOutput::Text(text) => text.clone(),
            ToolOutput::Json(Value::String(text)) => text.clone(),
            ToolOutput::Json(value) => value.to_string(),
        }
    }
}

impl From<String> for ToolOutput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for ToolOutput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Value> for ToolOutput {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

/// The code behind a tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, args: ToolArguments, ctx: &ToolContext) -> anyhow::Result<ToolOutput>;
}

/// Handler backed by a synchronous closure, see [`ToolDefinition::sync_handler`].
pub struct SyncHandler<F> {
    function: F,
}

impl<F, O> SyncHandler<F>
where
    F: Fn(ToolArguments, &ToolContext) -> anyhow::Result<O> + Send + Sync,
{
    pub fn new(function: F) -> Self {
        Self { function }
    }
}

#[async_trait]
impl<F, O> ToolHandler for SyncHandler<F>
where
    F: Fn(ToolArguments, &ToolContext) -> anyhow::Result<O> + Send + Sync,
    O: Into<ToolOutput>,
{
    async fn call(&self, args: ToolArguments, ctx: &ToolContext) -> anyhow::Result<ToolOutput> {
        (self.function)(args, ctx).map(Into::into)
    }
}

/// Handler backed by an async closure, see [`ToolDefinition::async_handler`].
///
/// The closure receives its own copy of the context so the returned future can be `'static`.
pub struct AsyncHandler<F, Fut> {
    function: F,
    _future: PhantomData<fn() -> Fut>,
}

impl<F, Fut, O> AsyncHandler<F, Fut>
where
    F: Fn(ToolArguments, ToolContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<O>> + Send + 'static,
{
    pub fn new(function: F) -> Self {
        Self {
            function,
            _future: PhantomData,
        }
    }
}

#[async_trait]
impl<F, Fut, O> ToolHandler for AsyncHandler<F, Fut>
where
    F: Fn(ToolArguments, ToolContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<O>> + Send + 'static,
    O: Into<ToolOutput>,
{
    async fn call(&self, args: ToolArguments, ctx: &ToolContext) -> anyhow::Result<ToolOutput> {
        (self.function)(args, ctx.clone()).await.map(Into::into)
    }
}
