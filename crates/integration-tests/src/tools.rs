//! Tools shared by the end-to-end tests.

use llm::{ParamDescriptor, ToolDefinition, ToolExecutor, ToolRegistry};
use serde_json::json;

/// Basic arithmetic over two operands.
pub fn calculator() -> ToolDefinition {
    ToolDefinition::new(
        "calculator",
        "Performs basic mathematical calculations including addition, subtraction, multiplication and division",
    )
    .param(
        ParamDescriptor::required(
            "operation",
            json!({"type": "string", "enum": ["add", "subtract", "multiply", "divide"]}),
        )
        .description("Mathematical operation to perform"),
    )
    .param(ParamDescriptor::required("x", json!({"type": "number"})).description("First operand"))
    .param(ParamDescriptor::required("y", json!({"type": "number"})).description("Second operand"))
    .sync_handler(|args, _| {
        let operation: String = args.parse("operation")?;
        let x: f64 = args.parse("x")?;
        let y: f64 = args.parse("y")?;

        let result = match operation.as_str() {
            "add" => x + y,
            "subtract" => x - y,
            "multiply" => x * y,
            "divide" if y == 0.0 => anyhow::bail!("Division by zero"),
            "divide" => x / y,
            other => anyhow::bail!("Unknown operation: {other}"),
        };

        Ok(json!(result))
    })
}

/// Adds two integers, with an async handler.
pub fn adder() -> ToolDefinition {
    ToolDefinition::new("adder", "Adds two integers")
        .param(ParamDescriptor::required("a", json!({"type": "integer"})))
        .param(ParamDescriptor::required("b", json!({"type": "integer"})))
        .async_handler(|args, _| async move {
            let a: i64 = args.parse("a")?;
            let b: i64 = args.parse("b")?;

            Ok::<_, anyhow::Error>((a + b).to_string())
        })
}

/// Always fails.
pub fn failing() -> ToolDefinition {
    ToolDefinition::new("failing_tool", "A tool that always fails")
        .sync_handler(|_, _| -> anyhow::Result<String> { anyhow::bail!("This tool always fails") })
}

pub fn executor() -> ToolExecutor {
    let registry = ToolRegistry::builder()
        .tool(calculator())
        .tool(adder())
        .tool(failing())
        .build();

    ToolExecutor::new(registry)
}
