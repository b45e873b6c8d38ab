//! Model access: the orchestrator's chat backend seam and the single-shot
//! completion helper capabilities use for their downstream calls.

use crate::capability::CapabilityDescriptor;
use crate::error::{LaerError, Result};
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, ChatCompletionTool, ChatCompletionToolType,
    CreateChatCompletionRequestArgs, FunctionObject,
};
use async_trait::async_trait;
use tracing::debug;

/// One capability invocation requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationRequest {
    /// Provider-assigned call id, echoed back with the folded result.
    pub id: String,
    pub capability: String,
    /// Raw JSON argument string as produced by the model.
    pub arguments: String,
}

/// What the model produced for one orchestrator step: optional text and zero
/// or more invocation requests.
#[derive(Debug, Clone, Default)]
pub struct ModelReply {
    pub text: Option<String>,
    pub invocations: Vec<InvocationRequest>,
}

/// The inference call behind the orchestrator loop.
///
/// Production uses [`OpenAIChatBackend`]; tests script replies to drive the
/// loop deterministically.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn reply(
        &self,
        messages: &[ChatCompletionRequestMessage],
        capabilities: &[CapabilityDescriptor],
    ) -> Result<ModelReply>;
}

/// OpenAI chat-completions backend.
pub struct OpenAIChatBackend {
    client: async_openai::Client<OpenAIConfig>,
    model: String,
}

impl OpenAIChatBackend {
    pub fn new(client: async_openai::Client<OpenAIConfig>, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }
}

/// Convert capability descriptors to OpenAI tool definitions.
fn tool_definitions(capabilities: &[CapabilityDescriptor]) -> Vec<ChatCompletionTool> {
    capabilities
        .iter()
        .map(|d| ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: d.name.clone(),
                description: Some(d.description.clone()),
                parameters: Some(d.input_schema.clone()),
                strict: None,
            },
        })
        .collect()
}

#[async_trait]
impl ChatBackend for OpenAIChatBackend {
    async fn reply(
        &self,
        messages: &[ChatCompletionRequestMessage],
        capabilities: &[CapabilityDescriptor],
    ) -> Result<ModelReply> {
        let mut builder = CreateChatCompletionRequestArgs::default();
        builder.model(&self.model).messages(messages.to_vec());
        if !capabilities.is_empty() {
            builder.tools(tool_definitions(capabilities));
        }
        let request = builder
            .build()
            .map_err(|e| LaerError::Orchestrator(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| LaerError::OpenAI(format!("Chat API error: {}", e)))?;

        let choice = response
            .choices
            .first()
            .ok_or_else(|| LaerError::Orchestrator("No response from model".to_string()))?;

        let invocations = choice
            .message
            .tool_calls
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|call| InvocationRequest {
                id: call.id.clone(),
                capability: call.function.name.clone(),
                arguments: call.function.arguments.clone(),
            })
            .collect();

        Ok(ModelReply {
            text: choice.message.content.clone(),
            invocations,
        })
    }
}

/// Run a single system+user completion and return the text.
///
/// This is the downstream call shared by the direct capabilities and the
/// artifact generators; it never carries tools, so a capability cannot
/// re-enter the dispatch loop.
pub async fn complete_text(
    client: &async_openai::Client<OpenAIConfig>,
    model: &str,
    system: &str,
    user: &str,
) -> Result<String> {
    debug!("Downstream completion with model {}", model);

    let messages: Vec<ChatCompletionRequestMessage> = vec![
        ChatCompletionRequestSystemMessageArgs::default()
            .content(system.to_string())
            .build()
            .map_err(|e| LaerError::Capability(e.to_string()))?
            .into(),
        ChatCompletionRequestUserMessageArgs::default()
            .content(user.to_string())
            .build()
            .map_err(|e| LaerError::Capability(e.to_string()))?
            .into(),
    ];

    let request = CreateChatCompletionRequestArgs::default()
        .model(model)
        .messages(messages)
        .build()
        .map_err(|e| LaerError::Capability(e.to_string()))?;

    let response = client
        .chat()
        .create(request)
        .await
        .map_err(|e| LaerError::OpenAI(format!("Completion failed: {}", e)))?;

    response
        .choices
        .first()
        .and_then(|c| c.message.content.clone())
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| LaerError::Capability("Empty response from model".to_string()))
}

/// Strip Markdown code fences a model sometimes wraps around JSON output.
pub fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop an optional language tag on the fence line
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    inner.trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityKind;
    use serde_json::json;

    #[test]
    fn test_extract_json_passthrough() {
        assert_eq!(extract_json(r#"{"a":1}"#), r#"{"a":1}"#);
        assert_eq!(extract_json("  {\"a\":1}  "), r#"{"a":1}"#);
    }

    #[test]
    fn test_extract_json_strips_fences() {
        let fenced = "```json\n{\"a\": 1}\n```";
        assert_eq!(extract_json(fenced), "{\"a\": 1}");

        let bare_fence = "```\n{\"a\": 1}\n```";
        assert_eq!(extract_json(bare_fence), "{\"a\": 1}");
    }

    #[test]
    fn test_tool_definitions_carry_descriptor_fields() {
        let descriptors = vec![CapabilityDescriptor {
            name: "get_weather".to_string(),
            description: "Look up the weather".to_string(),
            input_schema: json!({ "type": "object", "properties": {} }),
            kind: CapabilityKind::Direct,
        }];

        let tools = tool_definitions(&descriptors);
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].function.name, "get_weather");
        assert_eq!(
            tools[0].function.description.as_deref(),
            Some("Look up the weather")
        );
    }
}
