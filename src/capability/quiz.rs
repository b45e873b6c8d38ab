//! Quiz generation capability.
//!
//! Produces a multiple-choice quiz artifact: metadata events open the panel,
//! the full validated payload goes out as one snapshot delta, and `Finish`
//! fires on every exit path.

use super::{Capability, CapabilityDescriptor, CapabilityKind, InvocationOutcome, TurnContext};
use crate::artifact::{ArtifactDraft, ArtifactKind, ArtifactSession};
use crate::config::{Prompts, Settings};
use crate::error::{LaerError, Result};
use crate::model::{complete_text, extract_json};
use crate::openai::create_client;
use async_openai::config::OpenAIConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use tracing::{info, warn};

pub const NAME: &str = "generate_quiz";

const DEFAULT_QUESTION_COUNT: u64 = 5;

/// A generated quiz document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizPayload {
    pub title: String,
    pub questions: Vec<QuizQuestion>,
}

/// One multiple-choice question. Always four options; `correct_answer`
/// indexes into them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// Parse a model response into a quiz payload.
pub fn parse_payload(raw: &str) -> Result<QuizPayload> {
    let payload: QuizPayload = serde_json::from_str(extract_json(raw))
        .map_err(|e| LaerError::Capability(format!("quiz payload is not valid JSON: {}", e)))?;
    validate_payload(&payload)?;
    Ok(payload)
}

/// Check the structural constraints on a quiz document.
pub fn validate_payload(payload: &QuizPayload) -> Result<()> {
    if payload.questions.is_empty() {
        return Err(LaerError::Capability("quiz has no questions".to_string()));
    }
    for (i, question) in payload.questions.iter().enumerate() {
        if question.options.len() != 4 {
            return Err(LaerError::Capability(format!(
                "question {} has {} options, expected exactly 4",
                i + 1,
                question.options.len()
            )));
        }
        if question.correct_answer > 3 {
            return Err(LaerError::Capability(format!(
                "question {} has correct answer index {}, expected 0..=3",
                i + 1,
                question.correct_answer
            )));
        }
    }
    Ok(())
}

/// Artifact-producing capability generating multiple-choice quizzes.
pub struct QuizCapability {
    client: async_openai::Client<OpenAIConfig>,
    model: String,
    prompts: Prompts,
}

impl QuizCapability {
    pub fn new(settings: &Settings, prompts: Prompts) -> Self {
        let model = settings
            .capabilities
            .model_for(&settings.capabilities.quiz_model, &settings.chat.model);
        Self {
            client: create_client(settings.chat.request_timeout_secs),
            model: model.to_string(),
            prompts,
        }
    }

    async fn generate(
        &self,
        topic: &str,
        question_count: u64,
        source: Option<&str>,
    ) -> Result<QuizPayload> {
        let source_section = match source {
            Some(material) => format!("Base the questions on this material:\n{}", material),
            None => String::new(),
        };

        let mut vars = HashMap::new();
        vars.insert("topic".to_string(), topic.to_string());
        vars.insert("question_count".to_string(), question_count.to_string());
        vars.insert("source_section".to_string(), source_section);

        let user_prompt = self.prompts.render_with_custom(&self.prompts.quiz.user, &vars);
        let raw = complete_text(&self.client, &self.model, &self.prompts.quiz.system, &user_prompt)
            .await?;

        parse_payload(&raw)
    }
}

#[async_trait]
impl Capability for QuizCapability {
    fn descriptor(&self) -> CapabilityDescriptor {
        CapabilityDescriptor {
            name: NAME.to_string(),
            description: "Create a multiple-choice quiz on a topic and show it \
                to the user in a side panel. Use this when the user asks to be \
                quizzed, tested or drilled."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "topic": {
                        "type": "string",
                        "description": "What the quiz should cover"
                    },
                    "question_count": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 20,
                        "description": "Number of questions (default: 5)"
                    },
                    "source": {
                        "type": "string",
                        "description": "Optional material to base the questions on"
                    }
                },
                "required": ["topic"]
            }),
            kind: CapabilityKind::ArtifactProducing,
        }
    }

    async fn execute(&self, args: Value, ctx: &TurnContext) -> InvocationOutcome {
        let topic = args["topic"].as_str().unwrap_or_default().to_string();
        let question_count = args["question_count"].as_u64().unwrap_or(DEFAULT_QUESTION_COUNT);
        let source = args["source"].as_str().map(|s| s.to_string());

        info!("Generating a {}-question quiz on '{}'", question_count, topic);

        // Panel-opening metadata goes out before generation starts; the
        // session guard guarantees Finish on the failure path.
        let title = format!("Quiz: {}", topic);
        let session = ArtifactSession::open(&ctx.channel, &title, ArtifactKind::Quiz);
        let artifact_id = session.id();

        match self.generate(&topic, question_count, source.as_deref()).await {
            Ok(payload) => {
                let serialized = match serde_json::to_string(&payload) {
                    Ok(s) => s,
                    Err(e) => {
                        drop(session);
                        return InvocationOutcome::failure(
                            NAME,
                            format!("could not serialize the quiz: {}", e),
                        );
                    }
                };

                session.content(&serialized);
                session.finish();

                if let Some(store) = &ctx.store {
                    let draft = ArtifactDraft {
                        artifact_id,
                        title: payload.title.clone(),
                        kind: ArtifactKind::Quiz,
                        content: serialized,
                        owner: ctx.owner.clone(),
                    };
                    if let Err(e) = store.save(&draft).await {
                        // The displayed artifact takes precedence over the write.
                        warn!("Failed to persist quiz {}: {}", artifact_id, e);
                    }
                }

                let mut data = Map::new();
                data.insert("artifact_id".to_string(), Value::from(artifact_id.to_string()));
                data.insert(
                    "question_count".to_string(),
                    Value::from(payload.questions.len()),
                );

                InvocationOutcome::success_with(
                    NAME,
                    format!(
                        "Created the quiz \"{}\" with {} questions; it is now open next to the chat.",
                        payload.title,
                        payload.questions.len()
                    ),
                    data,
                )
            }
            Err(e) => {
                drop(session);
                InvocationOutcome::failure(NAME, format!("quiz generation failed: {}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_payload_json() -> String {
        json!({
            "title": "Ownership basics",
            "questions": [
                {
                    "question": "Who owns a value after a move?",
                    "options": ["The source", "The destination", "Both", "Neither"],
                    "correctAnswer": 1,
                    "explanation": "Moves transfer ownership."
                },
                {
                    "question": "What does Drop do?",
                    "options": ["Frees resources", "Copies values", "Borrows", "Leaks"],
                    "correctAnswer": 0
                }
            ]
        })
        .to_string()
    }

    #[test]
    fn test_parse_valid_payload() {
        let payload = parse_payload(&valid_payload_json()).unwrap();
        assert_eq!(payload.questions.len(), 2);
        for question in &payload.questions {
            assert_eq!(question.options.len(), 4);
            assert!(question.correct_answer <= 3);
        }
    }

    #[test]
    fn test_parse_fenced_payload() {
        let fenced = format!("```json\n{}\n```", valid_payload_json());
        assert!(parse_payload(&fenced).is_ok());
    }

    #[test]
    fn test_wrong_option_count_rejected() {
        let raw = json!({
            "title": "Bad quiz",
            "questions": [
                {
                    "question": "?",
                    "options": ["a", "b", "c"],
                    "correctAnswer": 0
                }
            ]
        })
        .to_string();

        let err = parse_payload(&raw).unwrap_err();
        assert!(err.to_string().contains("expected exactly 4"));
    }

    #[test]
    fn test_out_of_range_answer_rejected() {
        let raw = json!({
            "title": "Bad quiz",
            "questions": [
                {
                    "question": "?",
                    "options": ["a", "b", "c", "d"],
                    "correctAnswer": 4
                }
            ]
        })
        .to_string();

        let err = parse_payload(&raw).unwrap_err();
        assert!(err.to_string().contains("0..=3"));
    }

    #[test]
    fn test_empty_quiz_rejected() {
        let raw = json!({ "title": "Empty", "questions": [] }).to_string();
        assert!(parse_payload(&raw).is_err());
    }

    #[test]
    fn test_payload_serde_round_trip() {
        let payload = parse_payload(&valid_payload_json()).unwrap();
        let serialized = serde_json::to_string(&payload).unwrap();
        let reparsed: QuizPayload = serde_json::from_str(&serialized).unwrap();
        assert_eq!(reparsed, payload);

        // wire field names stay camelCase
        assert!(serialized.contains("correctAnswer"));
    }
}
