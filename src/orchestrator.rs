//! Turn orchestration: the bounded loop of model inference, capability
//! dispatch and result fold-back.
//!
//! One call to [`Orchestrator::run_turn`] drives a single conversational
//! turn. The model sees the active capability descriptors and either answers
//! directly or requests invocations; results are folded back as tool
//! messages and the loop continues until the model produces final text or
//! the step budget runs out. Budget exhaustion is a designed stop, not an
//! error. A single capability failure never aborts the turn.

use crate::artifact::{ArtifactChannel, ArtifactEvent, ArtifactStore};
use crate::capability::{schema, CapabilityRegistry, InvocationOutcome, TurnContext};
use crate::config::{Prompts, Settings};
use crate::error::{LaerError, Result};
use crate::model::{ChatBackend, InvocationRequest, ModelReply, OpenAIChatBackend};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionToolType, FunctionCall,
};
use futures::channel::mpsc::{self, UnboundedSender};
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Role of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// A transport-neutral conversation message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Per-turn options.
#[derive(Debug, Clone, Default)]
pub struct TurnOptions {
    /// Capability names disabled for this turn, merged with the configured
    /// `[capabilities] disabled` list.
    pub exclude: HashSet<String>,
    /// Owner recorded on artifacts persisted during this turn.
    pub owner: Option<String>,
}

/// One segment of the orchestrator's output stream.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TurnEvent {
    /// An opaque text segment from the model.
    Text { content: String },
    /// A capability invocation is starting.
    InvocationStarted { capability: String },
    /// A capability invocation resolved.
    InvocationFinished { outcome: InvocationOutcome },
    /// An artifact channel event raised by a capability.
    Artifact { event: ArtifactEvent },
    /// The turn is over.
    Done { steps: usize, budget_exhausted: bool },
}

/// Summary of a completed turn.
#[derive(Debug, Clone, Default)]
pub struct TurnSummary {
    /// Concatenated text segments.
    pub text: String,
    /// Capability-invocation rounds performed.
    pub steps: usize,
    /// Whether the turn was force-stopped by the step budget.
    pub budget_exhausted: bool,
    /// Every invocation outcome, in dispatch order.
    pub outcomes: Vec<InvocationOutcome>,
}

/// Sink for turn events. A consumer that goes away does not fail the turn.
pub struct TurnSink {
    tx: UnboundedSender<TurnEvent>,
}

impl TurnSink {
    pub fn new(tx: UnboundedSender<TurnEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, event: TurnEvent) {
        if self.tx.unbounded_send(event).is_err() {
            debug!("Turn event dropped: consumer closed the stream");
        }
    }
}

/// The orchestrator drives conversation turns against a chat backend.
pub struct Orchestrator {
    backend: Arc<dyn ChatBackend>,
    registry: Arc<CapabilityRegistry>,
    store: Option<Arc<dyn ArtifactStore>>,
    prompts: Prompts,
    step_budget: usize,
    disabled: HashSet<String>,
    default_owner: Option<String>,
}

impl Orchestrator {
    /// Create an orchestrator backed by the OpenAI chat API.
    pub fn new(
        settings: &Settings,
        prompts: Prompts,
        registry: Arc<CapabilityRegistry>,
        store: Option<Arc<dyn ArtifactStore>>,
    ) -> Self {
        let backend = Arc::new(OpenAIChatBackend::new(
            create_client(settings.chat.request_timeout_secs),
            &settings.chat.model,
        ));
        Self::with_backend(settings, prompts, registry, store, backend)
    }

    /// Create an orchestrator with an explicit backend (used by tests).
    pub fn with_backend(
        settings: &Settings,
        prompts: Prompts,
        registry: Arc<CapabilityRegistry>,
        store: Option<Arc<dyn ArtifactStore>>,
        backend: Arc<dyn ChatBackend>,
    ) -> Self {
        Self {
            backend,
            registry,
            store,
            prompts,
            step_budget: settings.chat.step_budget,
            disabled: settings.capabilities.disabled.iter().cloned().collect(),
            default_owner: settings.artifacts.owner.clone(),
        }
    }

    pub fn registry(&self) -> Arc<CapabilityRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn store(&self) -> Option<Arc<dyn ArtifactStore>> {
        self.store.clone()
    }

    /// Run one turn, emitting events into the sink.
    pub async fn run_turn(
        &self,
        conversation: &[ChatMessage],
        options: &TurnOptions,
        sink: &TurnSink,
    ) -> Result<TurnSummary> {
        let exclusions: HashSet<String> = self
            .disabled
            .union(&options.exclude)
            .cloned()
            .collect();
        let active = self.registry.list_active(&exclusions);

        let mut messages = self.build_messages(conversation)?;

        let (channel, mut artifact_rx) = ArtifactChannel::new();
        let ctx = TurnContext::new(
            channel,
            self.store.clone(),
            options.owner.clone().or_else(|| self.default_owner.clone()),
        );

        let mut summary = TurnSummary::default();

        loop {
            let reply = self.backend.reply(&messages, &active).await?;

            if let Some(text) = reply.text.as_deref().filter(|t| !t.trim().is_empty()) {
                sink.send(TurnEvent::Text {
                    content: text.to_string(),
                });
                if !summary.text.is_empty() {
                    summary.text.push('\n');
                }
                summary.text.push_str(text);
            }

            if reply.invocations.is_empty() {
                push_assistant_text(&mut messages, reply.text.as_deref().unwrap_or_default())?;
                sink.send(TurnEvent::Done {
                    steps: summary.steps,
                    budget_exhausted: false,
                });
                return Ok(summary);
            }

            push_assistant_invocations(&mut messages, &reply)?;

            for request in &reply.invocations {
                sink.send(TurnEvent::InvocationStarted {
                    capability: request.capability.clone(),
                });

                let outcome = self.dispatch(request, &exclusions, &ctx).await;

                // The invocation has completed (including its Finish, for
                // artifact producers): forward its channel events before the
                // result is folded back.
                while let Ok(event) = artifact_rx.try_recv() {
                    sink.send(TurnEvent::Artifact { event });
                }

                sink.send(TurnEvent::InvocationFinished {
                    outcome: outcome.clone(),
                });

                push_tool_result(&mut messages, &request.id, &outcome.fold_text())?;
                summary.outcomes.push(outcome);
            }

            summary.steps += 1;
            if summary.steps >= self.step_budget {
                // Hard cap: stop here with whatever partial answer exists.
                info!("Step budget of {} exhausted, forcing stop", self.step_budget);
                summary.budget_exhausted = true;
                sink.send(TurnEvent::Done {
                    steps: summary.steps,
                    budget_exhausted: true,
                });
                return Ok(summary);
            }
        }
    }

    /// Run one turn in a spawned task, returning the event stream.
    pub fn stream_turn(
        self: Arc<Self>,
        conversation: Vec<ChatMessage>,
        options: TurnOptions,
    ) -> impl Stream<Item = TurnEvent> {
        let (tx, rx) = mpsc::unbounded();
        tokio::spawn(async move {
            let sink = TurnSink::new(tx);
            if let Err(e) = self.run_turn(&conversation, &options, &sink).await {
                warn!("Turn failed: {}", e);
                sink.send(TurnEvent::InvocationFinished {
                    outcome: InvocationOutcome::failure("orchestrator", e.to_string()),
                });
                sink.send(TurnEvent::Done {
                    steps: 0,
                    budget_exhausted: false,
                });
            }
        });
        rx
    }

    /// Resolve, validate and execute one invocation request.
    ///
    /// Unknown names and invalid arguments become `Failure` outcomes without
    /// reaching any handler; handlers themselves never propagate faults.
    async fn dispatch(
        &self,
        request: &InvocationRequest,
        exclusions: &HashSet<String>,
        ctx: &TurnContext,
    ) -> InvocationOutcome {
        let Some(capability) = self
            .registry
            .resolve_active(&request.capability, exclusions)
        else {
            warn!("Model requested unknown capability '{}'", request.capability);
            let mut diagnostic = Map::new();
            diagnostic.insert(
                "requested".to_string(),
                Value::from(request.capability.clone()),
            );
            return InvocationOutcome::failure_with(
                &request.capability,
                format!("'{}' is not an available capability", request.capability),
                diagnostic,
            );
        };

        let args: Value = match serde_json::from_str(&request.arguments) {
            Ok(args) => args,
            Err(e) => {
                return InvocationOutcome::failure(
                    &request.capability,
                    format!("arguments were not valid JSON: {}", e),
                );
            }
        };

        let descriptor = capability.descriptor();
        if let Err(violation) = schema::validate(&descriptor.input_schema, &args) {
            let mut diagnostic = Map::new();
            diagnostic.insert("field".to_string(), Value::from(violation.field.clone()));
            return InvocationOutcome::failure_with(
                &request.capability,
                violation.to_string(),
                diagnostic,
            );
        }

        debug!("Dispatching capability '{}'", request.capability);
        capability.execute(args, ctx).await
    }

    fn build_messages(
        &self,
        conversation: &[ChatMessage],
    ) -> Result<Vec<ChatCompletionRequestMessage>> {
        let mut messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(self.prompts.chat.system.clone())
                .build()
                .map_err(|e| LaerError::Orchestrator(e.to_string()))?
                .into(),
        ];

        for message in conversation {
            let built: ChatCompletionRequestMessage = match message.role {
                ChatRole::System => ChatCompletionRequestSystemMessageArgs::default()
                    .content(message.content.clone())
                    .build()
                    .map_err(|e| LaerError::Orchestrator(e.to_string()))?
                    .into(),
                ChatRole::User => ChatCompletionRequestUserMessageArgs::default()
                    .content(message.content.clone())
                    .build()
                    .map_err(|e| LaerError::Orchestrator(e.to_string()))?
                    .into(),
                ChatRole::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                    .content(message.content.clone())
                    .build()
                    .map_err(|e| LaerError::Orchestrator(e.to_string()))?
                    .into(),
            };
            messages.push(built);
        }

        Ok(messages)
    }
}

fn push_assistant_text(
    messages: &mut Vec<ChatCompletionRequestMessage>,
    content: &str,
) -> Result<()> {
    let message = ChatCompletionRequestAssistantMessageArgs::default()
        .content(content.to_string())
        .build()
        .map_err(|e| LaerError::Orchestrator(e.to_string()))?;
    messages.push(message.into());
    Ok(())
}

fn push_assistant_invocations(
    messages: &mut Vec<ChatCompletionRequestMessage>,
    reply: &ModelReply,
) -> Result<()> {
    let tool_calls: Vec<ChatCompletionMessageToolCall> = reply
        .invocations
        .iter()
        .map(|request| ChatCompletionMessageToolCall {
            id: request.id.clone(),
            r#type: ChatCompletionToolType::Function,
            function: FunctionCall {
                name: request.capability.clone(),
                arguments: request.arguments.clone(),
            },
        })
        .collect();

    let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
    builder.tool_calls(tool_calls);
    if let Some(text) = reply.text.as_deref().filter(|t| !t.trim().is_empty()) {
        builder.content(text.to_string());
    }
    let message = builder
        .build()
        .map_err(|e| LaerError::Orchestrator(e.to_string()))?;
    messages.push(message.into());
    Ok(())
}

fn push_tool_result(
    messages: &mut Vec<ChatCompletionRequestMessage>,
    call_id: &str,
    content: &str,
) -> Result<()> {
    let message = ChatCompletionRequestToolMessageArgs::default()
        .tool_call_id(call_id)
        .content(content.to_string())
        .build()
        .map_err(|e| LaerError::Orchestrator(e.to_string()))?;
    messages.push(message.into());
    Ok(())
}
