//! Artifact update capability.
//!
//! Loads the latest version of an existing artifact, asks the model to revise
//! its content against the same schema, replays the creation sequence under
//! the same artifact id, and appends the result as a new version.

use super::{planner, quiz, Capability, CapabilityDescriptor, CapabilityKind, InvocationOutcome, TurnContext};
use crate::artifact::{ArtifactDraft, ArtifactKind, ArtifactSession, ArtifactVersion};
use crate::config::{Prompts, Settings};
use crate::error::{LaerError, Result};
use crate::model::{complete_text, extract_json};
use crate::openai::create_client;
use async_openai::config::OpenAIConfig;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use tracing::{info, warn};
use uuid::Uuid;

pub const NAME: &str = "update_artifact";

/// Artifact-producing capability that revises an existing artifact.
pub struct UpdateCapability {
    client: async_openai::Client<OpenAIConfig>,
    model: String,
    prompts: Prompts,
}

impl UpdateCapability {
    pub fn new(settings: &Settings, prompts: Prompts) -> Self {
        let model = settings
            .capabilities
            .model_for(&settings.capabilities.update_model, &settings.chat.model);
        Self {
            client: create_client(settings.chat.request_timeout_secs),
            model: model.to_string(),
            prompts,
        }
    }

    async fn revise(&self, current: &ArtifactVersion, instruction: &str) -> Result<String> {
        let mut vars = HashMap::new();
        vars.insert("kind".to_string(), current.kind.to_string());
        vars.insert("content".to_string(), current.content.clone());
        vars.insert("instruction".to_string(), instruction.to_string());

        let user_prompt = self
            .prompts
            .render_with_custom(&self.prompts.update.user, &vars);
        let raw = complete_text(
            &self.client,
            &self.model,
            &self.prompts.update.system,
            &user_prompt,
        )
        .await?;

        let revised = extract_json(&raw).to_string();
        check_revision(&current.kind, &revised)?;
        Ok(revised)
    }
}

/// Validate a revision against the schema its kind requires.
///
/// Invalid JSON must never be placed on the channel, so this runs before any
/// content event.
fn check_revision(kind: &ArtifactKind, revised: &str) -> Result<()> {
    match kind {
        ArtifactKind::Quiz => {
            quiz::parse_payload(revised)?;
        }
        ArtifactKind::StudyPlan => {
            planner::parse_payload(revised)?;
        }
        _ => {
            serde_json::from_str::<Value>(revised).map_err(|e| {
                LaerError::Capability(format!("revised document is not valid JSON: {}", e))
            })?;
        }
    }
    Ok(())
}

#[async_trait]
impl Capability for UpdateCapability {
    fn descriptor(&self) -> CapabilityDescriptor {
        CapabilityDescriptor {
            name: NAME.to_string(),
            description: "Revise a quiz or study plan that was created earlier, \
                given its artifact id and an instruction describing the change. \
                Use this when the user wants an existing artifact modified rather \
                than a new one."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "artifact_id": {
                        "type": "string",
                        "description": "Id of the artifact to update"
                    },
                    "instruction": {
                        "type": "string",
                        "description": "The change to apply, in plain language"
                    }
                },
                "required": ["artifact_id", "instruction"]
            }),
            kind: CapabilityKind::ArtifactProducing,
        }
    }

    async fn execute(&self, args: Value, ctx: &TurnContext) -> InvocationOutcome {
        let raw_id = args["artifact_id"].as_str().unwrap_or_default();
        let instruction = args["instruction"].as_str().unwrap_or_default().to_string();

        let artifact_id = match Uuid::parse_str(raw_id) {
            Ok(id) => id,
            Err(_) => {
                let mut diagnostic = Map::new();
                diagnostic.insert("field".to_string(), Value::from("artifact_id"));
                return InvocationOutcome::failure_with(
                    NAME,
                    format!("'{}' is not a valid artifact id", raw_id),
                    diagnostic,
                );
            }
        };

        let Some(store) = ctx.store.as_ref() else {
            return InvocationOutcome::failure(
                NAME,
                "no artifact store is available, so there is nothing to update",
            );
        };

        let current = match store.get_latest(artifact_id).await {
            Ok(Some(version)) => version,
            Ok(None) => {
                return InvocationOutcome::failure(
                    NAME,
                    format!("no artifact with id {} exists", artifact_id),
                );
            }
            Err(e) => {
                return InvocationOutcome::failure(
                    NAME,
                    format!("could not load artifact {}: {}", artifact_id, e),
                );
            }
        };

        info!(
            "Updating artifact {} ({}) with instruction '{}'",
            artifact_id, current.kind, instruction
        );

        // Panel reopens under the same id before the revision is generated;
        // the session guard guarantees Finish if the revision fails. The
        // revision itself is validated before any content event, so invalid
        // JSON never reaches the channel.
        let session = ArtifactSession::resume(
            &ctx.channel,
            artifact_id,
            &current.title,
            current.kind.clone(),
        );

        let revised = match self.revise(&current, &instruction).await {
            Ok(revised) => revised,
            Err(e) => {
                drop(session);
                return InvocationOutcome::failure(
                    NAME,
                    format!("could not revise the artifact: {}", e),
                );
            }
        };

        session.content(&revised);
        session.finish();

        let draft = ArtifactDraft {
            artifact_id,
            title: current.title.clone(),
            kind: current.kind.clone(),
            content: revised,
            owner: ctx.owner.clone().or_else(|| current.owner.clone()),
        };
        if let Err(e) = store.save(&draft).await {
            warn!("Failed to persist updated artifact {}: {}", artifact_id, e);
        }

        let mut data = Map::new();
        data.insert("artifact_id".to_string(), Value::from(artifact_id.to_string()));
        data.insert("kind".to_string(), Value::from(current.kind.as_str()));

        InvocationOutcome::success_with(
            NAME,
            format!(
                "Updated \"{}\"; the revised version is now open next to the chat.",
                current.title
            ),
            data,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_revision_by_kind() {
        let quiz = json!({
            "title": "Quiz",
            "questions": [
                { "question": "?", "options": ["a", "b", "c", "d"], "correctAnswer": 0 }
            ]
        })
        .to_string();
        assert!(check_revision(&ArtifactKind::Quiz, &quiz).is_ok());

        // a study plan document is not a valid quiz revision
        let plan = json!({ "title": "Plan", "weeks": [] }).to_string();
        assert!(check_revision(&ArtifactKind::Quiz, &plan).is_err());

        // unknown kinds only need to be valid JSON
        assert!(check_revision(
            &ArtifactKind::Other("mind-map".to_string()),
            r#"{"nodes":[]}"#
        )
        .is_ok());
        assert!(check_revision(&ArtifactKind::Other("mind-map".to_string()), "not json").is_err());
    }

    #[tokio::test]
    async fn test_bad_id_no_store_and_missing_artifact_fail_cleanly() {
        use crate::artifact::{ArtifactChannel, MemoryArtifactStore};
        use std::sync::Arc;

        let capability = UpdateCapability::new(&Settings::default(), Prompts::default());

        // malformed id cites the field in the diagnostic
        let (channel, _rx) = ArtifactChannel::new();
        let ctx = TurnContext::new(channel, Some(Arc::new(MemoryArtifactStore::new())), None);
        let outcome = capability
            .execute(
                json!({ "artifact_id": "not-a-uuid", "instruction": "tweak it" }),
                &ctx,
            )
            .await;
        match outcome {
            InvocationOutcome::Failure { diagnostic, .. } => {
                assert_eq!(diagnostic.unwrap()["field"], "artifact_id");
            }
            other => panic!("expected failure, got {:?}", other),
        }

        // no store at all
        let (channel, _rx) = ArtifactChannel::new();
        let ctx = TurnContext::new(channel, None, None);
        let outcome = capability
            .execute(
                json!({
                    "artifact_id": Uuid::new_v4().to_string(),
                    "instruction": "tweak it"
                }),
                &ctx,
            )
            .await;
        assert!(!outcome.is_success());

        // unknown artifact id; no channel events may be emitted before the
        // artifact is resolved
        let (channel, mut rx) = ArtifactChannel::new();
        let ctx = TurnContext::new(channel, Some(Arc::new(MemoryArtifactStore::new())), None);
        let outcome = capability
            .execute(
                json!({
                    "artifact_id": Uuid::new_v4().to_string(),
                    "instruction": "tweak it"
                }),
                &ctx,
            )
            .await;
        assert!(!outcome.is_success());
        assert!(rx.try_recv().is_err());
    }
}
