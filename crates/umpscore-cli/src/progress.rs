//! Progress event types and broadcast channel for per-target run telemetry.
//!
//! The runner emits `ProgressEvent`s while visiting targets; they flow
//! through a `tokio::sync::broadcast` channel to any subscriber (the CLI
//! printer, the REPL). When nobody subscribes, events are dropped.

use serde::{Deserialize, Serialize};

/// A progress event emitted during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// The run this event belongs to.
    pub run_id: String,
    /// Monotonically increasing sequence number.
    pub seq: u64,
    pub event: ProgressEventKind,
}

/// The specific kind of progress event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProgressEventKind {
    /// A target visit has started.
    TargetStarted {
        index: usize,
        total: usize,
        entity: String,
    },
    /// A JSON response was drained from the page.
    ResponseCaptured { url: String },
    /// A target produced its rows.
    TargetCompleted {
        entity: String,
        captured: usize,
        kept: usize,
    },
    /// A target was abandoned.
    TargetFailed { entity: String, error: String },
    /// The run is pausing before the next target.
    Waiting { ms: u64 },
    /// No JSON records came back, so HTML tables were used instead.
    FallbackUsed { entity: String, rows: usize },
    /// A non-fatal warning occurred.
    Warning { message: String },
}

impl std::fmt::Display for ProgressEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TargetStarted {
                index,
                total,
                entity,
            } => write!(f, "[{}/{}] {entity}", index + 1, total),
            Self::ResponseCaptured { url } => write!(f, "  captured {url}"),
            Self::TargetCompleted {
                entity,
                captured,
                kept,
            } => write!(f, "  {entity}: {captured} records, {kept} kept"),
            Self::TargetFailed { entity, error } => write!(f, "  {entity} failed: {error}"),
            Self::Waiting { ms } => write!(f, "  waiting {ms}ms"),
            Self::FallbackUsed { entity, rows } => {
                write!(f, "  {entity}: no JSON data, {rows} table rows from HTML")
            }
            Self::Warning { message } => write!(f, "  warning: {message}"),
        }
    }
}

/// Sender handle for emitting progress events.
pub type ProgressSender = tokio::sync::broadcast::Sender<ProgressEvent>;

/// Receiver handle for consuming progress events.
pub type ProgressReceiver = tokio::sync::broadcast::Receiver<ProgressEvent>;

/// Create a new progress broadcast channel with a bounded buffer.
pub fn channel() -> (ProgressSender, ProgressReceiver) {
    tokio::sync::broadcast::channel(256)
}

/// Emit a progress event, ignoring send errors (no receivers listening).
pub fn emit(tx: &Option<ProgressSender>, run_id: &str, seq: &mut u64, event: ProgressEventKind) {
    if let Some(ref sender) = tx {
        *seq += 1;
        let _ = sender.send(ProgressEvent {
            run_id: run_id.to_string(),
            seq: *seq,
            event,
        });
    }
}

/// Print each event to stderr until the channel closes.
pub fn spawn_printer(mut rx: ProgressReceiver) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => eprintln!("{}", event.event),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    eprintln!("  ({n} progress events skipped)");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_event_serialization() {
        let event = ProgressEvent {
            run_id: "run-1".to_string(),
            seq: 1,
            event: ProgressEventKind::TargetStarted {
                index: 0,
                total: 2,
                entity: "Adam Beck".to_string(),
            },
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("TargetStarted"));
        assert!(json.contains("Adam Beck"));

        let parsed: ProgressEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.run_id, "run-1");
        assert_eq!(parsed.seq, 1);
    }

    #[test]
    fn test_display() {
        let started = ProgressEventKind::TargetStarted {
            index: 1,
            total: 3,
            entity: "Laz Diaz".into(),
        };
        assert_eq!(started.to_string(), "[2/3] Laz Diaz");
    }

    #[tokio::test]
    async fn test_emit_increments_seq() {
        let (tx, mut rx) = channel();
        let tx = Some(tx);
        let mut seq = 0;
        emit(&tx, "r", &mut seq, ProgressEventKind::Waiting { ms: 10 });
        emit(&tx, "r", &mut seq, ProgressEventKind::Waiting { ms: 20 });
        assert_eq!(seq, 2);
        assert_eq!(rx.recv().await.unwrap().seq, 1);
        assert_eq!(rx.recv().await.unwrap().seq, 2);
    }

    #[test]
    fn test_emit_none_sender() {
        let mut seq = 0;
        emit(
            &None,
            "test",
            &mut seq,
            ProgressEventKind::Warning {
                message: "test".to_string(),
            },
        );
        assert_eq!(seq, 0);
    }
}
