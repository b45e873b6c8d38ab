//! Artifact channel and the session guard that drives it.

use super::{ArtifactEvent, ArtifactKind};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};
use uuid::Uuid;

/// Sending half of an artifact event stream.
///
/// One channel exists per conversation turn and is shared by every capability
/// invoked in that turn; events from a single invocation keep their emission
/// order. A closed receiver does not fail the producer, the event is dropped
/// with a warning.
#[derive(Clone)]
pub struct ArtifactChannel {
    tx: UnboundedSender<ArtifactEvent>,
}

impl ArtifactChannel {
    /// Create a channel, returning the sender and the consumer's receiver.
    pub fn new() -> (Self, UnboundedReceiver<ArtifactEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Emit an event onto the channel.
    pub fn emit(&self, event: ArtifactEvent) {
        if self.tx.send(event).is_err() {
            warn!("Artifact event dropped: consumer closed the channel");
        }
    }
}

/// Scoped artifact creation sequence.
///
/// Opening a session emits `SetId`, `SetTitle`, `SetKind`, `Clear` in that
/// order. `Finish` fires exactly once on every exit path: explicitly via
/// [`ArtifactSession::finish`], or from `Drop` when the session is abandoned
/// (a failed generation, a panic unwinding through the handler). A consumer
/// waiting on completion is therefore always released.
pub struct ArtifactSession {
    channel: ArtifactChannel,
    id: Uuid,
    finished: bool,
}

impl ArtifactSession {
    /// Open a creation sequence for a brand-new artifact.
    pub fn open(channel: &ArtifactChannel, title: &str, kind: ArtifactKind) -> Self {
        Self::resume(channel, Uuid::new_v4(), title, kind)
    }

    /// Open a creation sequence for an existing artifact id (a new version).
    pub fn resume(channel: &ArtifactChannel, id: Uuid, title: &str, kind: ArtifactKind) -> Self {
        debug!("Opening artifact session {} ({})", id, kind);

        channel.emit(ArtifactEvent::SetId { data: id });
        channel.emit(ArtifactEvent::SetTitle {
            data: title.to_string(),
        });
        channel.emit(ArtifactEvent::SetKind { data: kind });
        channel.emit(ArtifactEvent::Clear);

        Self {
            channel: channel.clone(),
            id,
            finished: false,
        }
    }

    /// The artifact id this session is streaming.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Emit the full serialized payload as one snapshot delta.
    ///
    /// Marked transient: the consumer materializes it but need not persist
    /// the delta itself.
    pub fn content(&self, payload: &str) {
        self.channel.emit(ArtifactEvent::ContentDelta {
            data: payload.to_string(),
            transient: Some(true),
        });
    }

    /// Complete the sequence, emitting `Finish`.
    pub fn finish(mut self) {
        self.finished = true;
        self.channel.emit(ArtifactEvent::Finish);
    }
}

impl Drop for ArtifactSession {
    fn drop(&mut self) {
        if !self.finished {
            debug!("Artifact session {} dropped without finish", self.id);
            self.channel.emit(ArtifactEvent::Finish);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut UnboundedReceiver<ArtifactEvent>) -> Vec<ArtifactEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_creation_sequence_order() {
        let (channel, mut rx) = ArtifactChannel::new();

        let session = ArtifactSession::open(&channel, "Quiz: Rust", ArtifactKind::Quiz);
        let id = session.id();
        session.content(r#"{"title":"Quiz: Rust","questions":[]}"#);
        session.finish();

        let events = drain(&mut rx);
        assert_eq!(events.len(), 6);
        assert_eq!(events[0], ArtifactEvent::SetId { data: id });
        assert_eq!(
            events[1],
            ArtifactEvent::SetTitle {
                data: "Quiz: Rust".to_string()
            }
        );
        assert_eq!(
            events[2],
            ArtifactEvent::SetKind {
                data: ArtifactKind::Quiz
            }
        );
        assert_eq!(events[3], ArtifactEvent::Clear);
        assert!(matches!(events[4], ArtifactEvent::ContentDelta { .. }));
        assert_eq!(events[5], ArtifactEvent::Finish);
    }

    #[test]
    fn test_finish_emitted_on_drop() {
        let (channel, mut rx) = ArtifactChannel::new();

        {
            let _session = ArtifactSession::open(&channel, "Plan", ArtifactKind::StudyPlan);
            // dropped without content or an explicit finish
        }

        let events = drain(&mut rx);
        assert_eq!(events.last(), Some(&ArtifactEvent::Finish));
        let finish_count = events
            .iter()
            .filter(|e| matches!(e, ArtifactEvent::Finish))
            .count();
        assert_eq!(finish_count, 1);
    }

    #[test]
    fn test_explicit_finish_not_doubled() {
        let (channel, mut rx) = ArtifactChannel::new();

        let session = ArtifactSession::open(&channel, "Plan", ArtifactKind::StudyPlan);
        session.finish();

        let events = drain(&mut rx);
        let finish_count = events
            .iter()
            .filter(|e| matches!(e, ArtifactEvent::Finish))
            .count();
        assert_eq!(finish_count, 1);
    }

    #[test]
    fn test_resume_reuses_id() {
        let (channel, mut rx) = ArtifactChannel::new();
        let id = Uuid::new_v4();

        let session = ArtifactSession::resume(&channel, id, "Quiz v2", ArtifactKind::Quiz);
        assert_eq!(session.id(), id);
        session.finish();

        let events = drain(&mut rx);
        assert_eq!(events[0], ArtifactEvent::SetId { data: id });
    }

    #[test]
    fn test_emit_after_receiver_dropped_does_not_panic() {
        let (channel, rx) = ArtifactChannel::new();
        drop(rx);

        let session = ArtifactSession::open(&channel, "Quiz", ArtifactKind::Quiz);
        session.content("{}");
        session.finish();
    }
}
