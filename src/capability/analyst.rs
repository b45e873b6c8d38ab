//! Analyst capability: review study notes or results and report on them.

use super::{Capability, CapabilityDescriptor, CapabilityKind, InvocationOutcome, TurnContext};
use crate::config::{Prompts, Settings};
use crate::model::complete_text;
use crate::openai::create_client;
use async_openai::config::OpenAIConfig;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::info;

pub const NAME: &str = "analyze_progress";

/// Direct capability that analyzes learner-provided material.
pub struct AnalystCapability {
    client: async_openai::Client<OpenAIConfig>,
    model: String,
    prompts: Prompts,
}

impl AnalystCapability {
    pub fn new(settings: &Settings, prompts: Prompts) -> Self {
        let model = settings
            .capabilities
            .model_for(&settings.capabilities.analyst_model, &settings.chat.model);
        Self {
            client: create_client(settings.chat.request_timeout_secs),
            model: model.to_string(),
            prompts,
        }
    }
}

#[async_trait]
impl Capability for AnalystCapability {
    fn descriptor(&self) -> CapabilityDescriptor {
        CapabilityDescriptor {
            name: NAME.to_string(),
            description: "Analyze the user's study notes, quiz results or \
                self-assessment and report strengths, gaps and next steps. \
                Use this when the user shares material and asks how they are doing."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "notes": {
                        "type": "string",
                        "description": "The notes, results or material to analyze"
                    },
                    "question": {
                        "type": "string",
                        "description": "What the user wants to know about the material"
                    }
                },
                "required": ["notes"]
            }),
            kind: CapabilityKind::Direct,
        }
    }

    async fn execute(&self, args: Value, _ctx: &TurnContext) -> InvocationOutcome {
        let notes = args["notes"].as_str().unwrap_or_default().to_string();
        let question = args["question"]
            .as_str()
            .unwrap_or("How is this learner doing, and what should they work on next?")
            .to_string();

        info!("Analyzing {} characters of study material", notes.len());

        let mut vars = HashMap::new();
        vars.insert("notes".to_string(), notes);
        vars.insert("question".to_string(), question);

        let user_prompt = self
            .prompts
            .render_with_custom(&self.prompts.analyst.user, &vars);

        match complete_text(
            &self.client,
            &self.model,
            &self.prompts.analyst.system,
            &user_prompt,
        )
        .await
        {
            Ok(analysis) => InvocationOutcome::success(NAME, analysis),
            Err(e) => {
                InvocationOutcome::failure(NAME, format!("could not analyze the material: {}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::schema;

    #[test]
    fn test_descriptor_requires_notes() {
        let settings = Settings::default();
        let capability = AnalystCapability::new(&settings, Prompts::default());
        let descriptor = capability.descriptor();

        let err =
            schema::validate(&descriptor.input_schema, &json!({ "question": "am I ready?" }))
                .unwrap_err();
        assert_eq!(err.field, "notes");
    }
}
