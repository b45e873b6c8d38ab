//! Tutor capability: explain a topic at a chosen level.

use super::{Capability, CapabilityDescriptor, CapabilityKind, InvocationOutcome, TurnContext};
use crate::config::{Prompts, Settings};
use crate::model::complete_text;
use crate::openai::create_client;
use async_openai::config::OpenAIConfig;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::info;

pub const NAME: &str = "explain_topic";

/// Direct capability that delegates to a single tutoring completion.
pub struct TutorCapability {
    client: async_openai::Client<OpenAIConfig>,
    model: String,
    prompts: Prompts,
}

impl TutorCapability {
    pub fn new(settings: &Settings, prompts: Prompts) -> Self {
        let model = settings
            .capabilities
            .model_for(&settings.capabilities.tutor_model, &settings.chat.model);
        Self {
            client: create_client(settings.chat.request_timeout_secs),
            model: model.to_string(),
            prompts,
        }
    }
}

#[async_trait]
impl Capability for TutorCapability {
    fn descriptor(&self) -> CapabilityDescriptor {
        CapabilityDescriptor {
            name: NAME.to_string(),
            description: "Explain a topic in depth, as a tutor would. \
                Use this when the user wants to learn or understand a subject, \
                not for quick factual questions."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "topic": {
                        "type": "string",
                        "description": "The topic to explain"
                    },
                    "level": {
                        "type": "string",
                        "enum": ["intro", "intermediate", "advanced"],
                        "description": "The learner's level (default: intro)"
                    }
                },
                "required": ["topic"]
            }),
            kind: CapabilityKind::Direct,
        }
    }

    async fn execute(&self, args: Value, _ctx: &TurnContext) -> InvocationOutcome {
        let topic = args["topic"].as_str().unwrap_or_default().to_string();
        let level = args["level"].as_str().unwrap_or("intro").to_string();

        info!("Explaining '{}' at {} level", topic, level);

        let mut vars = HashMap::new();
        vars.insert("topic".to_string(), topic.clone());
        vars.insert("level".to_string(), level);

        let user_prompt = self.prompts.render_with_custom(&self.prompts.tutor.user, &vars);

        match complete_text(&self.client, &self.model, &self.prompts.tutor.system, &user_prompt)
            .await
        {
            Ok(explanation) => InvocationOutcome::success(NAME, explanation),
            Err(e) => InvocationOutcome::failure(
                NAME,
                format!("could not generate an explanation for '{}': {}", topic, e),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::schema;

    #[test]
    fn test_descriptor_schema_accepts_valid_arguments() {
        let settings = Settings::default();
        let capability = TutorCapability::new(&settings, Prompts::default());
        let descriptor = capability.descriptor();

        assert_eq!(descriptor.name, NAME);
        assert_eq!(descriptor.kind, CapabilityKind::Direct);

        let args = json!({ "topic": "borrow checker", "level": "advanced" });
        assert!(schema::validate(&descriptor.input_schema, &args).is_ok());

        let bad = json!({ "topic": "borrow checker", "level": "expert" });
        assert!(schema::validate(&descriptor.input_schema, &bad).is_err());
    }
}
