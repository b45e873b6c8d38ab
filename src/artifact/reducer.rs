//! Client-side reducer that materializes artifact events into views.

use super::{ArtifactEvent, ArtifactKind};
use tracing::warn;
use uuid::Uuid;

/// Lifecycle phase of a materialized artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactPhase {
    /// No events observed yet.
    Empty,
    /// Creation sequence in progress; `Finish` not yet observed.
    Streaming,
    /// `Finish` observed; the artifact is complete.
    Idle,
}

/// A materialized artifact as seen by a consumer.
#[derive(Debug, Clone)]
pub struct ArtifactView {
    pub id: Option<Uuid>,
    pub title: String,
    pub kind: Option<ArtifactKind>,
    pub content: String,
    pub phase: ArtifactPhase,
}

impl ArtifactView {
    fn new() -> Self {
        Self {
            id: None,
            title: String::new(),
            kind: None,
            content: String::new(),
            phase: ArtifactPhase::Empty,
        }
    }

    /// Whether this view's kind has a dedicated renderer.
    ///
    /// Unknown kinds are still materialized; callers fall back to a generic
    /// inert rendering for them.
    pub fn has_renderer(&self) -> bool {
        matches!(
            self.kind,
            Some(ArtifactKind::Quiz) | Some(ArtifactKind::StudyPlan) | Some(ArtifactKind::Text)
        )
    }
}

/// Applies artifact events in arrival order.
///
/// Events are never reordered or coalesced. A `SetId` after a completed
/// sequence starts a new view; the finished one is kept in `completed`.
pub struct ArtifactReducer {
    current: ArtifactView,
    completed: Vec<ArtifactView>,
}

impl ArtifactReducer {
    pub fn new() -> Self {
        Self {
            current: ArtifactView::new(),
            completed: Vec::new(),
        }
    }

    /// Apply one event.
    pub fn apply(&mut self, event: ArtifactEvent) {
        match event {
            ArtifactEvent::SetId { data } => {
                if self.current.phase == ArtifactPhase::Idle {
                    self.completed.push(std::mem::replace(
                        &mut self.current,
                        ArtifactView::new(),
                    ));
                } else if self.current.id.is_some() {
                    warn!("SetId received twice within one creation sequence");
                }
                self.current.id = Some(data);
                self.current.phase = ArtifactPhase::Streaming;
            }
            ArtifactEvent::SetTitle { data } => {
                self.current.title = data;
                self.current.phase = ArtifactPhase::Streaming;
            }
            ArtifactEvent::SetKind { data } => {
                self.current.kind = Some(data);
                self.current.phase = ArtifactPhase::Streaming;
            }
            ArtifactEvent::Clear => {
                self.current.content.clear();
                self.current.phase = ArtifactPhase::Streaming;
            }
            ArtifactEvent::ContentDelta { data, .. } => {
                // Reference capabilities emit full snapshots: replace, not append.
                self.current.content = data;
                self.current.phase = ArtifactPhase::Streaming;
            }
            ArtifactEvent::Finish => {
                self.current.phase = ArtifactPhase::Idle;
            }
        }
    }

    /// The artifact currently being materialized.
    pub fn current(&self) -> &ArtifactView {
        &self.current
    }

    /// Whether a creation sequence is still in flight.
    ///
    /// Callers waiting on completion should pair this with a timeout: an
    /// unfinished artifact whose producer died is permanently stuck and must
    /// be surfaced as an error state rather than awaited forever.
    pub fn is_streaming(&self) -> bool {
        self.current.phase == ArtifactPhase::Streaming
    }

    /// All finished views, in completion order.
    ///
    /// Includes the current view when it has reached `Idle`.
    pub fn finished(&self) -> Vec<&ArtifactView> {
        let mut views: Vec<&ArtifactView> = self.completed.iter().collect();
        if self.current.phase == ArtifactPhase::Idle && self.current.id.is_some() {
            views.push(&self.current);
        }
        views
    }
}

impl Default for ArtifactReducer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creation_events(id: Uuid, kind: ArtifactKind, payload: &str) -> Vec<ArtifactEvent> {
        vec![
            ArtifactEvent::SetId { data: id },
            ArtifactEvent::SetTitle {
                data: "Title".to_string(),
            },
            ArtifactEvent::SetKind { data: kind },
            ArtifactEvent::Clear,
            ArtifactEvent::ContentDelta {
                data: payload.to_string(),
                transient: Some(true),
            },
            ArtifactEvent::Finish,
        ]
    }

    #[test]
    fn test_phases() {
        let mut reducer = ArtifactReducer::new();
        assert_eq!(reducer.current().phase, ArtifactPhase::Empty);

        let id = Uuid::new_v4();
        reducer.apply(ArtifactEvent::SetId { data: id });
        assert_eq!(reducer.current().phase, ArtifactPhase::Streaming);
        assert!(reducer.is_streaming());

        reducer.apply(ArtifactEvent::Finish);
        assert_eq!(reducer.current().phase, ArtifactPhase::Idle);
        assert!(!reducer.is_streaming());
    }

    #[test]
    fn test_delta_replaces_content() {
        let mut reducer = ArtifactReducer::new();
        reducer.apply(ArtifactEvent::SetId {
            data: Uuid::new_v4(),
        });
        reducer.apply(ArtifactEvent::ContentDelta {
            data: "first".to_string(),
            transient: None,
        });
        reducer.apply(ArtifactEvent::ContentDelta {
            data: "second".to_string(),
            transient: None,
        });

        assert_eq!(reducer.current().content, "second");
    }

    #[test]
    fn test_round_trip_payload() {
        let payload = serde_json::json!({
            "title": "Quiz",
            "questions": [
                {"question": "?", "options": ["a", "b", "c", "d"], "correctAnswer": 2}
            ]
        });
        let serialized = serde_json::to_string(&payload).unwrap();

        let mut reducer = ArtifactReducer::new();
        for event in creation_events(Uuid::new_v4(), ArtifactKind::Quiz, &serialized) {
            reducer.apply(event);
        }

        let parsed: serde_json::Value =
            serde_json::from_str(&reducer.current().content).unwrap();
        assert_eq!(parsed, payload);
    }

    #[test]
    fn test_two_sequences_tracked_separately() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        let mut reducer = ArtifactReducer::new();
        for event in creation_events(first, ArtifactKind::Quiz, "{}") {
            reducer.apply(event);
        }
        for event in creation_events(second, ArtifactKind::StudyPlan, "{}") {
            reducer.apply(event);
        }

        let finished = reducer.finished();
        assert_eq!(finished.len(), 2);
        assert_eq!(finished[0].id, Some(first));
        assert_eq!(finished[1].id, Some(second));
    }

    #[test]
    fn test_unknown_kind_has_no_renderer() {
        let mut reducer = ArtifactReducer::new();
        for event in creation_events(
            Uuid::new_v4(),
            ArtifactKind::Other("mind-map".to_string()),
            "{}",
        ) {
            reducer.apply(event);
        }

        let view = reducer.current();
        assert_eq!(view.phase, ArtifactPhase::Idle);
        assert!(!view.has_renderer());
        assert_eq!(view.content, "{}");
    }
}
