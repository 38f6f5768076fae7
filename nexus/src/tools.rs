//! Tools offered to the model with `--tools`.

use jiff::{Zoned, tz::TimeZone};
use llm::{ParamDescriptor, ToolDefinition, ToolExecutor, ToolRegistry};
use serde_json::json;

pub fn executor() -> ToolExecutor {
    let registry = ToolRegistry::builder().tool(calculator()).tool(current_time()).build();

    ToolExecutor::new(registry)
}

fn calculator() -> ToolDefinition {
    ToolDefinition::new("calculator", "Applies an arithmetic operation to two numbers")
        .param(
            ParamDescriptor::required(
                "operation",
                json!({"type": "string", "enum": ["add", "subtract", "multiply", "divide"]}),
            )
            .description("Operation to apply"),
        )
        .param(ParamDescriptor::required("a", json!({"type": "number"})).description("Left operand"))
        .param(ParamDescriptor::required("b", json!({"type": "number"})).description("Right operand"))
        .sync_handler(|args, _| {
            let operation: String = args.parse("operation")?;
            let a: f64 = args.parse("a")?;
            let b: f64 = args.parse("b")?;

            let result = match operation.as_str() {
                "add" => a + b,
                "subtract" => a - b,
                "multiply" => a * b,
                "divide" if b == 0.0 => anyhow::bail!("Cannot divide by zero"),
                "divide" => a / b,
                other => anyhow::bail!("Unknown operation '{other}'"),
            };

            Ok(json!(result))
        })
}

fn current_time() -> ToolDefinition {
    ToolDefinition::new("current_time", "Returns the current date and time")
        .param(
            ParamDescriptor::optional("timezone", json!({"type": "string"}))
                .description("IANA time zone name, e.g. Europe/Helsinki. Defaults to UTC"),
        )
        .sync_handler(|args, _| {
            let time_zone = match args.get("timezone").and_then(|value| value.as_str()) {
                Some(name) => TimeZone::get(name)?,
                None => TimeZone::UTC,
            };

            let now = Zoned::now().with_time_zone(time_zone);

            Ok(now.strftime("%Y-%m-%dT%H:%M:%S%:z (%A)").to_string())
        })
}
