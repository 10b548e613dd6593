use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use node_problem_ext as k8s;
use parking_lot::Mutex;
use serde::Serialize;

use k8s::corev1;
use k8s::NodeConditionExt as _;
use k8s::NodeExt as _;
use k8s::ObjectReferenceExt as _;

pub use clock::Clock;
pub use clock::FakeClock;
pub use clock::RealClock;
pub use identity::node_name;
pub use node_problem_kubeapi::ConfigError;
pub use node_problem_kubeapi::ConnectionConfig;
pub use node_problem_kubeapi::EventRecorder;
pub use node_problem_kubeapi::EventType;
pub use node_problem_kubeapi::KubeApi;
pub use node_problem_kubeapi::NodeApi;
pub use node_problem_kubeapi::NodeEvent;

mod clock;
mod identity;

/// Construction settings for [`NodeProblemClient`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClientOptions {
    /// Report as this name instead of the machine hostname when non-empty.
    pub hostname_override: String,
    /// Reach the API server via `KUBERNETES_SERVICE_HOST`/`KUBERNETES_SERVICE_PORT`
    /// without TLS verification instead of in-cluster discovery.
    pub insecure_connection: bool,
}

/// Reads and updates the conditions of the local node and reports events about it.
#[async_trait]
pub trait ProblemClient: Send + Sync {
    /// Conditions of the node whose type is one of `condition_types`.
    ///
    /// Results follow the order the node reports them in. Types the node does
    /// not report are skipped.
    async fn get_conditions(
        &self,
        condition_types: &[&str],
    ) -> kube::Result<Vec<corev1::NodeCondition>>;

    /// Set or update conditions of the node.
    ///
    /// Every condition's `last_heartbeat_time` is overwritten in place with the
    /// current time before the patch is sent.
    async fn set_conditions(&self, conditions: &mut [corev1::NodeCondition]) -> kube::Result<()>;

    /// Report an event about the node on behalf of `source`.
    ///
    /// Delivery happens in the background; failures are not reported back.
    fn eventf(&self, event_type: EventType, source: &str, reason: &str, message: fmt::Arguments<'_>);
}

/// Report an event through a [`ProblemClient`] with a formatted message.
///
/// ```no_run
/// # use node_problem_client::{eventf, EventType, ProblemClient};
/// # fn report(client: &impl ProblemClient, pid: u32) {
/// eventf!(client, EventType::Warning, "kernel-monitor", "OOMKilling", "Killed process {pid}");
/// # }
/// ```
#[macro_export]
macro_rules! eventf {
    ($client:expr_2021, $event_type:expr_2021, $source:expr_2021, $reason:expr_2021, $($arg:tt)+) => {{
        use $crate::ProblemClient as _;
        $client.eventf($event_type, $source, $reason, format_args!($($arg)+))
    }};
}

#[derive(Debug)]
pub struct NodeProblemClient<A = KubeApi> {
    node_name: String,
    api: A,
    clock: Arc<dyn Clock>,
    recorders: Mutex<HashMap<String, Arc<dyn EventRecorder>>>,
    node_ref: corev1::ObjectReference,
}

impl NodeProblemClient {
    /// Connect to the API server and resolve the local node identity.
    ///
    /// Must be called from within a tokio runtime. Failures here are not
    /// recoverable; callers are expected to stop the process.
    pub fn new(options: &ClientOptions) -> Result<Self, ConfigError> {
        let connection = ConnectionConfig::resolve(options.insecure_connection)?;
        let node_name = node_name(&options.hostname_override)?;
        let api = KubeApi::new(&connection)?;
        tracing::info!(node_name, ?connection, "Created node problem client");
        Ok(Self::with_api(api, node_name, Arc::new(RealClock)))
    }
}

impl<A: NodeApi> NodeProblemClient<A> {
    pub fn with_api(api: A, node_name: impl ToString, clock: Arc<dyn Clock>) -> Self {
        let node_name = node_name.to_string();
        let node_ref = corev1::ObjectReference::node(&node_name);
        let recorders = Mutex::new(HashMap::new());
        Self {
            node_name,
            api,
            clock,
            recorders,
            node_ref,
        }
    }

    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    pub fn node_ref(&self) -> &corev1::ObjectReference {
        &self.node_ref
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    fn recorder(&self, source: &str) -> Arc<dyn EventRecorder> {
        let mut recorders = self.recorders.lock();
        let recorder = recorders.entry(source.to_string()).or_insert_with(|| {
            tracing::debug!(source, node = self.node_name.as_str(), "Creating event recorder");
            self.api.event_recorder(source, &self.node_name)
        });
        Arc::clone(recorder)
    }
}

#[async_trait]
impl<A: NodeApi> ProblemClient for NodeProblemClient<A> {
    async fn get_conditions(
        &self,
        condition_types: &[&str],
    ) -> kube::Result<Vec<corev1::NodeCondition>> {
        let node = self.api.get_node(&self.node_name).await?;
        let conditions = node
            .conditions()
            .iter()
            .filter(|condition| condition_types.iter().any(|type_| condition.is_type(type_)))
            .cloned()
            .collect();
        Ok(conditions)
    }

    async fn set_conditions(&self, conditions: &mut [corev1::NodeCondition]) -> kube::Result<()> {
        let now = self.clock.now();
        for condition in &mut *conditions {
            condition.last_heartbeat_time = Some(now.clone());
        }
        let patch = generate_patch(conditions).map_err(kube::Error::SerdeError)?;
        self.api.patch_node_status(&self.node_name, patch).await
    }

    fn eventf(&self, event_type: EventType, source: &str, reason: &str, message: fmt::Arguments<'_>) {
        let recorder = self.recorder(source);
        let event = NodeEvent::new(event_type, reason, message);
        recorder.record(&self.node_ref, event);
    }
}

#[derive(Serialize)]
struct StatusPatch<'a> {
    status: ConditionsPatch<'a>,
}

#[derive(Serialize)]
struct ConditionsPatch<'a> {
    conditions: &'a [corev1::NodeCondition],
}

/// Strategic merge patch body `{"status":{"conditions":[...]}}` for `conditions`.
pub fn generate_patch(conditions: &[corev1::NodeCondition]) -> serde_json::Result<Vec<u8>> {
    let patch = StatusPatch {
        status: ConditionsPatch { conditions },
    };
    serde_json::to_vec(&patch)
}
