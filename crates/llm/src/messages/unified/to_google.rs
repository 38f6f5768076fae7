//! Conversions from unified types to Google Gemini protocol types.

use serde_json::{Value, json};

use crate::{
    error::LlmError,
    messages::{google, unified},
};

impl TryFrom<&unified::UnifiedRequest> for google::GoogleGenerateRequest {
    type Error = LlmError;

    fn try_from(req: &unified::UnifiedRequest) -> Result<Self, Self::Error> {
        let contents = req
            .messages
            .iter()
            .filter(|message| message.role != unified::UnifiedRole::System)
            .map(google::GoogleContent::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let generation_config = google::GoogleGenerationConfig {
            max_output_tokens: req.max_tokens,
            temperature: req.temperature,
            top_p: req.top_p,
            top_k: req.top_k,
            stop_sequences: req.stop_sequences.clone(),
        };

        let system_prompts = req.system_prompts();

        let system_instruction = (!system_prompts.is_empty()).then(|| google::GoogleContent {
            role: None,
            parts: system_prompts.into_iter().map(google::GooglePart::text).collect(),
        });

        let tools = req.tools.as_ref().map(|tools| {
            vec![google::GoogleTool {
                function_declarations: tools.iter().map(google::GoogleFunctionDeclaration::from).collect(),
            }]
        });

        Ok(Self {
            contents,
            generation_config: (!generation_config.is_empty()).then_some(generation_config),
            tools,
            system_instruction,
        })
    }
}

impl From<unified::UnifiedRole> for google::GoogleRole {
    fn from(role: unified::UnifiedRole) -> Self {
        match role {
            unified::UnifiedRole::Assistant => google::GoogleRole::Model,
            unified::UnifiedRole::Tool => google::GoogleRole::Function,
            unified::UnifiedRole::User | unified::UnifiedRole::System => google::GoogleRole::User,
        }
    }
}

impl TryFrom<&unified::UnifiedMessage> for google::GoogleContent {
    type Error = LlmError;

    fn try_from(msg: &unified::UnifiedMessage) -> Result<Self, Self::Error> {
        let parts = match &msg.content {
            unified::UnifiedContentContainer::Text(text) => vec![google::GooglePart::text(text.clone())],
            unified::UnifiedContentContainer::Blocks(blocks) => blocks
                .iter()
                .map(google::GooglePart::try_from)
                .collect::<Result<Vec<_>, _>>()?,
        };

        Ok(Self {
            role: Some(msg.role.into()),
            parts,
        })
    }
}

impl TryFrom<&unified::UnifiedContent> for google::GooglePart {
    type Error = LlmError;

    fn try_from(block: &unified::UnifiedContent) -> Result<Self, Self::Error> {
        match block {
            unified::UnifiedContent::Text { text } => Ok(google::GooglePart::text(text.clone())),
            unified::UnifiedContent::ToolUse(tool_use) => Ok(google::GooglePart::function_call(
                tool_use.name.clone(),
                Value::Object(tool_use.input.clone().unwrap_or_default()),
            )),
            unified::UnifiedContent::ToolResult(result) => Ok(google::GooglePart::function_response(
                result.tool_name.clone().unwrap_or_default(),
                json!({ "content": result.content }),
            )),
            unified::UnifiedContent::Thinking { .. } | unified::UnifiedContent::Image { .. } => {
                Err(LlmError::UnsupportedContentType(block.kind().to_string()))
            }
        }
    }
}

impl From<&unified::UnifiedTool> for google::GoogleFunctionDeclaration {
    fn from(tool: &unified::UnifiedTool) -> Self {
        Self {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: strip_unsupported_schema_fields(tool.parameters.to_value()),
        }
    }
}

/// Recursively removes JSON Schema fields Gemini rejects.
///
/// Gemini accepts neither `additionalProperties`, `$schema` nor `default`, and only
/// the `enum` and `date-time` formats on strings.
pub(crate) fn strip_unsupported_schema_fields(mut schema: Value) -> Value {
    let Some(object) = schema.as_object_mut() else {
        return schema;
    };

    object.remove("additionalProperties");
    object.remove("$schema");
    object.remove("default");

    let is_string = object.get("type").and_then(Value::as_str) == Some("string");
    let format_supported = matches!(
        object.get("format").and_then(Value::as_str),
        None | Some("enum") | Some("date-time")
    );

    if is_string && !format_supported {
        object.remove("format");
    }

    if let Some(Value::Object(properties)) = object.get_mut("properties") {
        for property in properties.values_mut() {
            *property = strip_unsupported_schema_fields(property.take());
        }
    }

    if let Some(items) = object.get_mut("items") {
        *items = strip_unsupported_schema_fields(items.take());
    }

    schema
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::strip_unsupported_schema_fields;
    use crate::messages::{
        google::GoogleGenerateRequest,
        unified::{
            UnifiedContent, UnifiedMessage, UnifiedRequest, UnifiedRole, UnifiedTool, UnifiedToolParameters,
            UnifiedToolResult, UnifiedToolUse,
        },
    };

    fn request(messages: Vec<UnifiedMessage>) -> UnifiedRequest {
        UnifiedRequest {
            model: "gemini-1.5-pro".to_string(),
            messages,
            ..Default::default()
        }
    }

    #[test]
    fn roles_parts_and_config() {
        let mut req = request(vec![
            UnifiedMessage::user("Add 2 and 3"),
            UnifiedMessage::blocks(
                UnifiedRole::Assistant,
                vec![UnifiedContent::ToolUse(UnifiedToolUse {
                    id: "google_fc_0".to_string(),
                    name: "add".to_string(),
                    input: json!({"a": 2, "b": 3}).as_object().cloned(),
                })],
            ),
            UnifiedMessage::blocks(
                UnifiedRole::Tool,
                vec![UnifiedContent::ToolResult(UnifiedToolResult {
                    tool_use_id: "google_fc_0".to_string(),
                    tool_name: Some("add".to_string()),
                    content: "5".to_string(),
                    is_error: None,
                })],
            ),
        ]);
        req.system = Some("Use tools.".to_string());
        req.max_tokens = Some(100);
        req.top_k = Some(40);

        let google = GoogleGenerateRequest::try_from(&req).unwrap();

        insta::assert_json_snapshot!(google, @r#"
        {
          "contents": [
            {
              "role": "user",
              "parts": [
                {
                  "text": "Add 2 and 3"
                }
              ]
            },
            {
              "role": "model",
              "parts": [
                {
                  "functionCall": {
                    "name": "add",
                    "args": {
                      "a": 2,
                      "b": 3
                    }
                  },
                  "thoughtSignature": ""
                }
              ]
            },
            {
              "role": "function",
              "parts": [
                {
                  "functionResponse": {
                    "name": "add",
                    "response": {
                      "content": "5"
                    }
                  }
                }
              ]
            }
          ],
          "generationConfig": {
            "maxOutputTokens": 100,
            "topK": 40
          },
          "systemInstruction": {
            "parts": [
              {
                "text": "Use tools."
              }
            ]
          }
        }
        "#);
    }

    #[test]
    fn system_messages_become_system_instruction() {
        let mut req = request(vec![
            UnifiedMessage::system("Always answer in French."),
            UnifiedMessage::user("hi"),
        ]);

        let google = GoogleGenerateRequest::try_from(&req).unwrap();

        insta::assert_json_snapshot!(google, @r#"
        {
          "contents": [
            {
              "role": "user",
              "parts": [
                {
                  "text": "hi"
                }
              ]
            }
          ],
          "systemInstruction": {
            "parts": [
              {
                "text": "Always answer in French."
              }
            ]
          }
        }
        "#);

        req.system = Some("Be brief.".to_string());

        let parts = GoogleGenerateRequest::try_from(&req)
            .unwrap()
            .system_instruction
            .map(|instruction| instruction.parts)
            .unwrap_or_default();

        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].text.as_deref(), Some("Be brief."));
        assert_eq!(parts[1].text.as_deref(), Some("Always answer in French."));
    }

    #[test]
    fn generation_config_omitted_when_empty() {
        let google = GoogleGenerateRequest::try_from(&request(vec![UnifiedMessage::user("Hi")])).unwrap();
        assert!(google.generation_config.is_none());
    }

    #[test]
    fn thinking_is_rejected() {
        let req = request(vec![UnifiedMessage::blocks(
            UnifiedRole::Assistant,
            vec![UnifiedContent::Thinking {
                thinking: "hmm".to_string(),
                signature: "sig".to_string(),
            }],
        )]);

        let error = GoogleGenerateRequest::try_from(&req).unwrap_err();
        assert_eq!(error.to_string(), "Unsupported content type: thinking");
    }

    #[test]
    fn tool_schema_is_cleaned() {
        let mut req = request(vec![UnifiedMessage::user("When?")]);
        req.tools = Some(vec![UnifiedTool {
            name: "schedule".to_string(),
            description: "Schedules an event".to_string(),
            parameters: UnifiedToolParameters {
                properties: json!({
                    "at": {"type": "string", "format": "date-time"},
                    "email": {"type": "string", "format": "email", "default": "a@b.c"},
                    "tags": {
                        "type": "array",
                        "items": {"type": "object", "additionalProperties": false, "properties": {}}
                    }
                })
                .as_object()
                .cloned()
                .unwrap(),
                ..Default::default()
            },
        }]);

        let google = GoogleGenerateRequest::try_from(&req).unwrap();

        insta::assert_json_snapshot!(google.tools, @r#"
        [
          {
            "functionDeclarations": [
              {
                "name": "schedule",
                "description": "Schedules an event",
                "parameters": {
                  "properties": {
                    "at": {
                      "format": "date-time",
                      "type": "string"
                    },
                    "email": {
                      "type": "string"
                    },
                    "tags": {
                      "items": {
                        "properties": {},
                        "type": "object"
                      },
                      "type": "array"
                    }
                  },
                  "type": "object"
                }
              }
            ]
          }
        ]
        "#);
    }

    #[test]
    fn strip_leaves_non_objects_alone() {
        assert_eq!(strip_unsupported_schema_fields(json!(true)), json!(true));
        assert_eq!(
            strip_unsupported_schema_fields(json!({"$schema": "x", "type": "object"})),
            json!({"type": "object"})
        );
    }
}
