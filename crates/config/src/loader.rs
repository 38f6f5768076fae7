use std::{fmt::Write, path::Path, sync::LazyLock};

use regex::{Captures, Regex};
use serde::Deserialize;
use toml::Value;

use crate::{Config, error::Error};

static ENV_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([^}]*?)\s*\}\}").expect("placeholder pattern must compile"));

pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path.as_ref())?;
    log::debug!("Loaded configuration from {}", path.as_ref().display());

    parse(&content)
}

pub fn parse(content: &str) -> crate::Result<Config> {
    let mut raw_config: Value = toml::from_str(content)?;

    expand_dynamic_strings(&mut Vec::new(), &mut raw_config)?;

    let config = Config::deserialize(raw_config)?;
    validate_default_provider(&config)?;

    if !config.llm.has_providers() {
        log::warn!("No LLM providers configured");
    }

    Ok(config)
}

pub(crate) fn validate_default_provider(config: &Config) -> crate::Result<()> {
    let Some(name) = config.llm.default_provider.as_deref() else {
        return Ok(());
    };

    if config.llm.providers.contains_key(name) {
        return Ok(());
    }

    let configured = config
        .llm
        .providers
        .keys()
        .map(|name| format!("'{name}'"))
        .collect::<Vec<_>>()
        .join(", ");

    Err(Error::Validation(format!(
        "default_provider '{name}' does not name a configured provider (configured: [{configured}])"
    )))
}

fn expand_dynamic_strings<'a>(path: &mut Vec<Result<&'a str, usize>>, value: &'a mut Value) -> crate::Result<()> {
    match value {
        Value::String(s) => match expand_env_placeholders(s) {
            Ok(Some(out)) => *s = out,
            Ok(None) => (),
            Err(reason) => {
                return Err(Error::EnvVarSubstitution {
                    path: display_path(path),
                    reason,
                });
            }
        },
        Value::Array(values) => {
            for (i, value) in values.iter_mut().enumerate() {
                path.push(Err(i));
                expand_dynamic_strings(path, value)?;
                path.pop();
            }
        }
        Value::Table(map) => {
            for (key, value) in map {
                path.push(Ok(key.as_str()));
                expand_dynamic_strings(path, value)?;
                path.pop();
            }
        }
        Value::Integer(_) | Value::Float(_) | Value::Boolean(_) | Value::Datetime(_) => (),
    }

    Ok(())
}

/// Replaces every `{{ env.NAME }}` in `input`. `None` when the string has no placeholder.
fn expand_env_placeholders(input: &str) -> Result<Option<String>, String> {
    if !ENV_PLACEHOLDER.is_match(input) {
        return Ok(None);
    }

    let mut failure = None;

    let output = ENV_PLACEHOLDER.replace_all(input, |captures: &Captures<'_>| {
        let expression = &captures[1];

        let Some(name) = expression.strip_prefix("env.").filter(|name| !name.is_empty()) else {
            failure.get_or_insert_with(|| format!("unsupported expression '{expression}', expected 'env.NAME'"));
            return String::new();
        };

        match std::env::var(name) {
            Ok(value) => value,
            Err(_) => {
                failure.get_or_insert_with(|| format!("environment variable not found: `{name}`"));
                String::new()
            }
        }
    });

    match failure {
        Some(reason) => Err(reason),
        None => Ok(Some(output.into_owned())),
    }
}

fn display_path(path: &[Result<&str, usize>]) -> String {
    let mut p = String::new();

    for segment in path {
        match segment {
            Ok(s) => {
                p.push_str(s);
                p.push('.');
            }
            Err(i) => {
                if p.ends_with('.') {
                    p.pop();
                }

                let _ = write!(p, "[{i}].");
            }
        }
    }

    if p.ends_with('.') {
        p.pop();
    }

    p
}
