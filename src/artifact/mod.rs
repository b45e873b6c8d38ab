//! Artifact types and the event protocol used to stream them.
//!
//! An artifact is a side document produced by a capability (a quiz, a study
//! plan), distinct from the conversational text. Creation is reported over an
//! ordered event stream and materialized by a client-side reducer; finished
//! artifacts are persisted as append-only version records.

mod channel;
mod reducer;
mod store;

pub use channel::{ArtifactChannel, ArtifactSession};
pub use reducer::{ArtifactPhase, ArtifactReducer, ArtifactView};
pub use store::{
    open_store, ArtifactDraft, ArtifactStore, ArtifactVersion, MemoryArtifactStore,
    SqliteArtifactStore,
};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The kind of document an artifact holds.
///
/// Kinds arrive as plain strings on the wire; unrecognized values are kept in
/// `Other` so a newer producer never breaks an older consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ArtifactKind {
    Text,
    Code,
    Sheet,
    Flashcard,
    Quiz,
    StudyPlan,
    Other(String),
}

impl ArtifactKind {
    /// The wire representation of this kind.
    pub fn as_str(&self) -> &str {
        match self {
            ArtifactKind::Text => "text",
            ArtifactKind::Code => "code",
            ArtifactKind::Sheet => "sheet",
            ArtifactKind::Flashcard => "flashcard",
            ArtifactKind::Quiz => "quiz",
            ArtifactKind::StudyPlan => "study-plan",
            ArtifactKind::Other(s) => s,
        }
    }
}

impl From<String> for ArtifactKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "text" => ArtifactKind::Text,
            "code" => ArtifactKind::Code,
            "sheet" => ArtifactKind::Sheet,
            "flashcard" => ArtifactKind::Flashcard,
            "quiz" => ArtifactKind::Quiz,
            "study-plan" => ArtifactKind::StudyPlan,
            _ => ArtifactKind::Other(s),
        }
    }
}

impl From<ArtifactKind> for String {
    fn from(kind: ArtifactKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An event on the artifact channel.
///
/// For one artifact creation sequence, `SetId`, `SetTitle`, `SetKind` and
/// `Clear` are each emitted once, before any `ContentDelta`; `Finish` is
/// emitted exactly once as the last event, on every exit path. The reference
/// capabilities emit `ContentDelta` as a full snapshot, not a diff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ArtifactEvent {
    SetId {
        data: Uuid,
    },
    SetTitle {
        data: String,
    },
    SetKind {
        data: ArtifactKind,
    },
    Clear,
    ContentDelta {
        data: String,
        /// Hint that the consumer need not persist this delta client-side.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        transient: Option<bool>,
    },
    Finish,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip() {
        for kind in [
            ArtifactKind::Text,
            ArtifactKind::Code,
            ArtifactKind::Sheet,
            ArtifactKind::Flashcard,
            ArtifactKind::Quiz,
            ArtifactKind::StudyPlan,
        ] {
            let s = String::from(kind.clone());
            assert_eq!(ArtifactKind::from(s), kind);
        }
    }

    #[test]
    fn test_unknown_kind_preserved() {
        let kind = ArtifactKind::from("mind-map".to_string());
        assert_eq!(kind, ArtifactKind::Other("mind-map".to_string()));
        assert_eq!(kind.as_str(), "mind-map");
    }

    #[test]
    fn test_event_wire_shape() {
        let id = Uuid::new_v4();
        let event = ArtifactEvent::SetId { data: id };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "set-id");
        assert_eq!(json["data"], id.to_string());

        let event = ArtifactEvent::ContentDelta {
            data: "{}".to_string(),
            transient: Some(true),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "content-delta");
        assert_eq!(json["transient"], true);

        let json = serde_json::to_value(ArtifactEvent::Finish).unwrap();
        assert_eq!(json["type"], "finish");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_event_serde_round_trip() {
        let events = vec![
            ArtifactEvent::SetId {
                data: Uuid::new_v4(),
            },
            ArtifactEvent::SetTitle {
                data: "Quiz: Ownership".to_string(),
            },
            ArtifactEvent::SetKind {
                data: ArtifactKind::Quiz,
            },
            ArtifactEvent::Clear,
            ArtifactEvent::ContentDelta {
                data: r#"{"title":"t"}"#.to_string(),
                transient: None,
            },
            ArtifactEvent::Finish,
        ];

        for event in events {
            let json = serde_json::to_string(&event).unwrap();
            let parsed: ArtifactEvent = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, event);
        }
    }
}
