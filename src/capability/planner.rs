//! Study plan generation capability.

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

pub const NAME: &str = "generate_study_plan";

const DEFAULT_WEEKS: u64 = 4;
const DEFAULT_HOURS_PER_WEEK: f64 = 5.0;

/// A generated week-by-week study plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyPlanPayload {
    pub title: String,
    pub weeks: Vec<PlanWeek>,
}

/// One week of the plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanWeek {
    pub title: String,
    pub goals: Vec<String>,
    pub tasks: Vec<PlanTask>,
    pub resources: Vec<String>,
}

/// A concrete task with an estimated duration and a completion flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanTask {
    pub description: String,
    pub duration: String,
    #[serde(default)]
    pub done: bool,
}

/// Parse a model response into a study plan payload.
pub fn parse_payload(raw: &str) -> Result<StudyPlanPayload> {
    let payload: StudyPlanPayload = serde_json::from_str(extract_json(raw)).map_err(|e| {
        LaerError::Capability(format!("study plan payload is not valid JSON: {}", e))
    })?;
    validate_payload(&payload)?;
    Ok(payload)
}

/// Check the structural constraints on a study plan.
pub fn validate_payload(payload: &StudyPlanPayload) -> Result<()> {
    if payload.weeks.is_empty() {
        return Err(LaerError::Capability("study plan has no weeks".to_string()));
    }
    for (i, week) in payload.weeks.iter().enumerate() {
        if week.tasks.is_empty() {
            return Err(LaerError::Capability(format!(
                "week {} has no tasks",
                i + 1
            )));
        }
    }
    Ok(())
}

/// Artifact-producing capability generating study plans.
pub struct PlannerCapability {
    client: async_openai::Client<OpenAIConfig>,
    model: String,
    prompts: Prompts,
}

impl PlannerCapability {
    pub fn new(settings: &Settings, prompts: Prompts) -> Self {
        let model = settings
            .capabilities
            .model_for(&settings.capabilities.planner_model, &settings.chat.model);
        Self {
            client: create_client(settings.chat.request_timeout_secs),
            model: model.to_string(),
            prompts,
        }
    }

    async fn generate(&self, goal: &str, weeks: u64, hours_per_week: f64) -> Result<StudyPlanPayload> {
        let mut vars = HashMap::new();
        vars.insert("goal".to_string(), goal.to_string());
        vars.insert("weeks".to_string(), weeks.to_string());
        vars.insert("hours_per_week".to_string(), hours_per_week.to_string());

        let user_prompt = self
            .prompts
            .render_with_custom(&self.prompts.planner.user, &vars);
        let raw = complete_text(
            &self.client,
            &self.model,
            &self.prompts.planner.system,
            &user_prompt,
        )
        .await?;

        parse_payload(&raw)
    }
}

#[async_trait]
impl Capability for PlannerCapability {
    fn descriptor(&self) -> CapabilityDescriptor {
        CapabilityDescriptor {
            name: NAME.to_string(),
            description: "Create a week-by-week study plan toward a learning \
                goal and show it to the user in a side panel. Use this when the \
                user wants a plan, schedule or roadmap for learning something."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "goal": {
                        "type": "string",
                        "description": "The learning goal"
                    },
                    "weeks": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 12,
                        "description": "Plan length in weeks (default: 4)"
                    },
                    "hours_per_week": {
                        "type": "number",
                        "minimum": 1,
                        "description": "Weekly time budget in hours (default: 5)"
                    }
                },
                "required": ["goal"]
            }),
            kind: CapabilityKind::ArtifactProducing,
        }
    }

    async fn execute(&self, args: Value, ctx: &TurnContext) -> InvocationOutcome {
        let goal = args["goal"].as_str().unwrap_or_default().to_string();
        let weeks = args["weeks"].as_u64().unwrap_or(DEFAULT_WEEKS);
        let hours_per_week = args["hours_per_week"]
            .as_f64()
            .unwrap_or(DEFAULT_HOURS_PER_WEEK);

        info!("Generating a {}-week study plan for '{}'", weeks, goal);

        let title = format!("Study plan: {}", goal);
        let session = ArtifactSession::open(&ctx.channel, &title, ArtifactKind::StudyPlan);
        let artifact_id = session.id();

        match self.generate(&goal, weeks, hours_per_week).await {
            Ok(payload) => {
                let serialized = match serde_json::to_string(&payload) {
                    Ok(s) => s,
                    Err(e) => {
                        drop(session);
                        return InvocationOutcome::failure(
                            NAME,
                            format!("could not serialize the plan: {}", e),
                        );
                    }
                };

                session.content(&serialized);
                session.finish();

                if let Some(store) = &ctx.store {
                    let draft = ArtifactDraft {
                        artifact_id,
                        title: payload.title.clone(),
                        kind: ArtifactKind::StudyPlan,
                        content: serialized,
                        owner: ctx.owner.clone(),
                    };
                    if let Err(e) = store.save(&draft).await {
                        warn!("Failed to persist study plan {}: {}", artifact_id, e);
                    }
                }

                let mut data = Map::new();
                data.insert("artifact_id".to_string(), Value::from(artifact_id.to_string()));
                data.insert("weeks".to_string(), Value::from(payload.weeks.len()));

                InvocationOutcome::success_with(
                    NAME,
                    format!(
                        "Created the study plan \"{}\" covering {} weeks; it is now open next to the chat.",
                        payload.title,
                        payload.weeks.len()
                    ),
                    data,
                )
            }
            Err(e) => {
                drop(session);
                InvocationOutcome::failure(NAME, format!("study plan generation failed: {}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_plan_json() -> String {
        json!({
            "title": "Learn Rust in four weeks",
            "weeks": [
                {
                    "title": "Week 1: Basics",
                    "goals": ["Understand ownership"],
                    "tasks": [
                        { "description": "Read the book ch. 1-4", "duration": "3 hours" },
                        { "description": "Do rustlings basics", "duration": "2 hours", "done": false }
                    ],
                    "resources": ["The Rust Programming Language"]
                }
            ]
        })
        .to_string()
    }

    #[test]
    fn test_parse_valid_plan() {
        let payload = parse_payload(&valid_plan_json()).unwrap();
        assert_eq!(payload.weeks.len(), 1);
        assert_eq!(payload.weeks[0].tasks.len(), 2);
        // completion flag defaults to false when the model omits it
        assert!(!payload.weeks[0].tasks[0].done);
    }

    #[test]
    fn test_plan_without_weeks_rejected() {
        let raw = json!({ "title": "Empty", "weeks": [] }).to_string();
        assert!(parse_payload(&raw).is_err());
    }

    #[test]
    fn test_week_without_tasks_rejected() {
        let raw = json!({
            "title": "Thin plan",
            "weeks": [
                { "title": "Week 1", "goals": [], "tasks": [], "resources": [] }
            ]
        })
        .to_string();

        let err = parse_payload(&raw).unwrap_err();
        assert!(err.to_string().contains("week 1 has no tasks"));
    }

    #[test]
    fn test_plan_serde_round_trip() {
        let payload = parse_payload(&valid_plan_json()).unwrap();
        let serialized = serde_json::to_string(&payload).unwrap();
        let reparsed: StudyPlanPayload = serde_json::from_str(&serialized).unwrap();
        assert_eq!(reparsed, payload);
    }
}
