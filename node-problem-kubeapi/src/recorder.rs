use std::fmt;
use std::str::FromStr;

use kube::runtime::events;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use super::*;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EventType {
    #[default]
    Normal,
    Warning,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Warning => "Warning",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown event type {0:?}, expected Normal or Warning")]
pub struct UnknownEventType(String);

impl FromStr for EventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Normal" => Ok(Self::Normal),
            "Warning" => Ok(Self::Warning),
            other => Err(UnknownEventType(other.to_string())),
        }
    }
}

impl From<EventType> for events::EventType {
    fn from(event_type: EventType) -> Self {
        match event_type {
            EventType::Normal => Self::Normal,
            EventType::Warning => Self::Warning,
        }
    }
}

/// Event about the node, as handed to a recorder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeEvent {
    pub type_: EventType,
    pub reason: String,
    pub note: String,
}

impl NodeEvent {
    pub fn new(type_: EventType, reason: impl ToString, note: impl ToString) -> Self {
        Self {
            type_,
            reason: reason.to_string(),
            note: note.to_string(),
        }
    }

    fn into_kube(self) -> events::Event {
        events::Event {
            type_: self.type_.into(),
            action: self.reason.clone(),
            reason: self.reason,
            note: Some(self.note),
            secondary: None,
        }
    }
}

/// Accepts events and forwards them to the event sink without blocking.
///
/// Delivery failures are the recorder's concern and never reach the caller.
pub trait EventRecorder: fmt::Debug + Send + Sync {
    fn record(&self, reference: &corev1::ObjectReference, event: NodeEvent);
}

type Envelope = (corev1::ObjectReference, NodeEvent);

/// Events queued per source before new ones are dropped.
pub const MAX_QUEUED_EVENTS: usize = 1000;

/// Recorder bound to one event source, publishing from a background task.
#[derive(Debug)]
pub struct KubeEventRecorder {
    source: String,
    tx: mpsc::Sender<Envelope>,
}

impl KubeEventRecorder {
    /// Start the background broadcaster for `source` on `runtime`.
    ///
    /// Events are attributed to reporter `{controller: source, instance: host}`.
    pub fn spawn(client: kube::Client, runtime: &Handle, source: &str, host: &str) -> Self {
        let reporter = events::Reporter {
            controller: source.to_string(),
            instance: Some(host.to_string()),
        };
        let recorder = events::Recorder::new(client, reporter);
        let (tx, rx) = mpsc::channel(MAX_QUEUED_EVENTS);
        runtime.spawn(broadcast(recorder, rx, source.to_string()));
        tracing::debug!(source, host, "Started event broadcaster");
        Self::with_sender(source, tx)
    }

    fn with_sender(source: &str, tx: mpsc::Sender<Envelope>) -> Self {
        Self {
            source: source.to_string(),
            tx,
        }
    }
}

impl EventRecorder for KubeEventRecorder {
    fn record(&self, reference: &corev1::ObjectReference, event: NodeEvent) {
        match self.tx.try_send((reference.clone(), event)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full((_, event))) => {
                tracing::warn!(
                    source = %self.source,
                    reason = event.reason.as_str(),
                    "Event queue full, dropping event"
                );
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!(source = %self.source, "Event broadcaster stopped, dropping event");
            }
        }
    }
}

async fn broadcast(
    recorder: events::Recorder,
    mut rx: mpsc::Receiver<Envelope>,
    source: String,
) {
    while let Some((reference, event)) = rx.recv().await {
        let reason = event.reason.clone();
        let event = event.into_kube();
        if let Err(err) = recorder.publish(&event, &reference).await {
            tracing::warn!(source, reason, ?err, "Failed to deliver event");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use k8s::ObjectReferenceExt as _;

    use super::*;

    fn oops() -> NodeEvent {
        NodeEvent::new(EventType::Warning, "KernelOops", "oops at 0xdead")
    }

    #[test]
    fn event_type_round_trips_through_str() {
        for event_type in [EventType::Normal, EventType::Warning] {
            let parsed = event_type.to_string().parse::<EventType>().unwrap();
            assert_eq!(parsed, event_type);
        }
    }

    #[test]
    fn event_type_rejects_unknown() {
        let err = "Critical".parse::<EventType>().unwrap_err();
        assert!(err.to_string().contains("Critical"));
    }

    #[test]
    fn node_event_maps_reason_to_action() {
        let event = NodeEvent::new(EventType::Warning, "KernelOops", "oops at 0xdead").into_kube();

        assert!(matches!(event.type_, events::EventType::Warning));
        assert_eq!(event.reason, "KernelOops");
        assert_eq!(event.action, "KernelOops");
        assert_eq!(event.note.as_deref(), Some("oops at 0xdead"));
        assert!(event.secondary.is_none());
    }

    #[test]
    fn full_queue_drops_event_without_blocking() {
        let (tx, mut rx) = mpsc::channel(1);
        let recorder = KubeEventRecorder::with_sender("kernel-monitor", tx);
        let reference = corev1::ObjectReference::node("worker-1");

        recorder.record(&reference, oops());
        recorder.record(
            &reference,
            NodeEvent::new(EventType::Normal, "KernelOops", "dropped"),
        );

        let (queued_ref, queued) = rx.try_recv().unwrap();
        assert_eq!(queued_ref, reference);
        assert_eq!(queued, oops());
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Empty)
        ));
    }

    #[test]
    fn stopped_broadcaster_drops_event() {
        let (tx, rx) = mpsc::channel(MAX_QUEUED_EVENTS);
        drop(rx);
        let recorder = KubeEventRecorder::with_sender("kernel-monitor", tx);
        recorder.record(&corev1::ObjectReference::node("worker-1"), oops());
    }

    #[tokio::test]
    async fn broadcaster_posts_to_events_api() {
        let (requests_tx, mut requests) = mpsc::unbounded_channel();
        let service = tower::service_fn(move |request: http::Request<kube::client::Body>| {
            let requests_tx = requests_tx.clone();
            async move {
                let (parts, body) = request.into_parts();
                let body = body.collect_bytes().await?;
                requests_tx
                    .send((parts.method, parts.uri, body.to_vec()))
                    .unwrap();
                http::Response::builder()
                    .status(http::StatusCode::CREATED)
                    .body(kube::client::Body::from(body))
                    .map_err(kube::Error::HttpError)
            }
        });
        let client = kube::Client::new(service, "default");

        let recorder =
            KubeEventRecorder::spawn(client, &Handle::current(), "kernel-monitor", "worker-1");
        recorder.record(&corev1::ObjectReference::node("worker-1"), oops());

        let (method, uri, body) = tokio::time::timeout(Duration::from_secs(5), requests.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(method, http::Method::POST);
        assert_eq!(
            uri.path(),
            "/apis/events.k8s.io/v1/namespaces/default/events"
        );

        let event = serde_json::from_slice::<serde_json::Value>(&body).unwrap();
        assert_eq!(event["reportingController"], "kernel-monitor");
        assert_eq!(event["reportingInstance"], "worker-1");
        assert_eq!(event["type"], "Warning");
        assert_eq!(event["reason"], "KernelOops");
        assert_eq!(event["note"], "oops at 0xdead");
        assert_eq!(event["regarding"]["kind"], "Node");
        assert_eq!(event["regarding"]["name"], "worker-1");
    }
}
