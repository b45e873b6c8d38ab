//! Capability system: named functions the orchestrating model can invoke.
//!
//! A capability either returns text directly (tutor, analyst, weather) or
//! streams a side artifact over the turn's channel (quiz, study plan,
//! artifact update). Execution never propagates an unhandled fault: every
//! invocation resolves to exactly one [`InvocationOutcome`].

mod analyst;
mod planner;
mod quiz;
mod registry;
pub mod schema;
mod tutor;
mod update;
mod weather;

pub use analyst::AnalystCapability;
pub use planner::{PlanTask, PlanWeek, PlannerCapability, StudyPlanPayload};
pub use quiz::{QuizCapability, QuizPayload, QuizQuestion};
pub use registry::CapabilityRegistry;
pub use tutor::TutorCapability;
pub use update::UpdateCapability;
pub use weather::WeatherCapability;

use crate::artifact::{ArtifactChannel, ArtifactStore};
use crate::config::{Prompts, Settings};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Build the registry with the full standard capability set.
///
/// The `[capabilities] disabled` list is applied per turn as an exclusion
/// set, not here: the registry itself always holds every capability.
pub fn standard_registry(settings: &Settings, prompts: &Prompts) -> Result<CapabilityRegistry> {
    let mut registry = CapabilityRegistry::new();
    registry.register(Arc::new(WeatherCapability::new(settings)))?;
    registry.register(Arc::new(TutorCapability::new(settings, prompts.clone())))?;
    registry.register(Arc::new(AnalystCapability::new(settings, prompts.clone())))?;
    registry.register(Arc::new(QuizCapability::new(settings, prompts.clone())))?;
    registry.register(Arc::new(PlannerCapability::new(settings, prompts.clone())))?;
    registry.register(Arc::new(UpdateCapability::new(settings, prompts.clone())))?;
    Ok(registry)
}

/// Whether a capability returns text directly or produces an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CapabilityKind {
    Direct,
    ArtifactProducing,
}

/// Static description of a capability, presented to the orchestrating model.
///
/// The `description` is the sole routing signal: the model picks capabilities
/// by interpreting it, so it must be non-empty and written for routing.
#[derive(Debug, Clone, Serialize)]
pub struct CapabilityDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub kind: CapabilityKind,
}

/// The result of one capability invocation.
///
/// `data`/`diagnostic` are cheap-to-render metadata for the caller; only
/// `summary` is folded back into the model's context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum InvocationOutcome {
    Success {
        capability: String,
        summary: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Map<String, Value>>,
    },
    Failure {
        capability: String,
        summary: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        diagnostic: Option<Map<String, Value>>,
    },
}

impl InvocationOutcome {
    /// Build a success outcome.
    pub fn success(capability: &str, summary: impl Into<String>) -> Self {
        InvocationOutcome::Success {
            capability: capability.to_string(),
            summary: summary.into(),
            data: None,
        }
    }

    /// Build a success outcome with metadata.
    pub fn success_with(
        capability: &str,
        summary: impl Into<String>,
        data: Map<String, Value>,
    ) -> Self {
        InvocationOutcome::Success {
            capability: capability.to_string(),
            summary: summary.into(),
            data: Some(data),
        }
    }

    /// Build a failure outcome.
    pub fn failure(capability: &str, summary: impl Into<String>) -> Self {
        InvocationOutcome::Failure {
            capability: capability.to_string(),
            summary: summary.into(),
            diagnostic: None,
        }
    }

    /// Build a failure outcome with a diagnostic map.
    pub fn failure_with(
        capability: &str,
        summary: impl Into<String>,
        diagnostic: Map<String, Value>,
    ) -> Self {
        InvocationOutcome::Failure {
            capability: capability.to_string(),
            summary: summary.into(),
            diagnostic: Some(diagnostic),
        }
    }

    /// The capability this outcome belongs to.
    pub fn capability(&self) -> &str {
        match self {
            InvocationOutcome::Success { capability, .. } => capability,
            InvocationOutcome::Failure { capability, .. } => capability,
        }
    }

    /// The user-facing summary.
    pub fn summary(&self) -> &str {
        match self {
            InvocationOutcome::Success { summary, .. } => summary,
            InvocationOutcome::Failure { summary, .. } => summary,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, InvocationOutcome::Success { .. })
    }

    /// The text folded back into the conversation as this capability's
    /// contribution. Failures fold back as an apology the model can relay.
    pub fn fold_text(&self) -> String {
        match self {
            InvocationOutcome::Success { summary, .. } => summary.clone(),
            InvocationOutcome::Failure { summary, .. } => format!(
                "The capability could not complete this request: {}. \
                 Apologize briefly and continue helping with what you can.",
                summary
            ),
        }
    }
}

/// Per-turn context handed to every capability invocation.
///
/// Carries the turn's artifact channel and optional persistence. This is
/// deliberately not process-wide state: each turn owns its channel.
#[derive(Clone)]
pub struct TurnContext {
    pub channel: ArtifactChannel,
    pub store: Option<Arc<dyn ArtifactStore>>,
    pub owner: Option<String>,
}

impl TurnContext {
    pub fn new(
        channel: ArtifactChannel,
        store: Option<Arc<dyn ArtifactStore>>,
        owner: Option<String>,
    ) -> Self {
        Self {
            channel,
            store,
            owner,
        }
    }
}

/// A named, independently invocable capability.
///
/// Handlers may call the model once downstream but never re-enter the
/// orchestrator's dispatch loop: capabilities do not call capabilities.
#[async_trait]
pub trait Capability: Send + Sync {
    /// The capability's descriptor (name, routing description, input schema).
    fn descriptor(&self) -> CapabilityDescriptor;

    /// Execute with arguments already validated against the input schema.
    ///
    /// Must resolve to an outcome on every path; internal errors become
    /// `Failure`, never a propagated fault.
    async fn execute(&self, args: Value, ctx: &TurnContext) -> InvocationOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_serde() {
        let mut data = Map::new();
        data.insert("question_count".to_string(), Value::from(5));
        let outcome = InvocationOutcome::success_with("generate_quiz", "Created a quiz", data);

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["capability"], "generate_quiz");
        assert_eq!(json["data"]["question_count"], 5);

        let parsed: InvocationOutcome = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, outcome);
    }

    #[test]
    fn test_failure_fold_text_is_apologetic() {
        let outcome = InvocationOutcome::failure("get_weather", "the location was not found");
        assert!(outcome.fold_text().contains("Apologize"));
        assert!(outcome.fold_text().contains("the location was not found"));
        assert!(!outcome.is_success());
    }
}
