use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use kube::api;
use node_problem_ext as k8s;
use tokio::runtime::Handle;

use k8s::corev1;

pub use config::cluster_host;
pub use config::ConfigError;
pub use config::ConnectionConfig;
pub use config::SERVICE_HOST_ENV;
pub use config::SERVICE_PORT_ENV;
pub use recorder::EventRecorder;
pub use recorder::EventType;
pub use recorder::KubeEventRecorder;
pub use recorder::MAX_QUEUED_EVENTS;
pub use recorder::NodeEvent;
pub use recorder::UnknownEventType;

mod config;
mod recorder;

pub const STRATEGIC_MERGE_PATCH: &str = "application/strategic-merge-patch+json";

/// Node-scoped operations the problem client needs from the API server.
#[async_trait]
pub trait NodeApi: fmt::Debug + Send + Sync {
    /// Fetch the Node resource `name`.
    async fn get_node(&self, name: &str) -> kube::Result<corev1::Node>;

    /// Send `patch` verbatim as a strategic merge patch of the `status`
    /// subresource of Node `name`.
    async fn patch_node_status(&self, name: &str, patch: Vec<u8>) -> kube::Result<()>;

    /// Build a new recorder for events reported by `source` on `host`.
    fn event_recorder(&self, source: &str, host: &str) -> Arc<dyn EventRecorder>;
}

pub struct KubeApi {
    client: kube::Client,
    runtime: Handle,
}

impl KubeApi {
    /// Create a KubeApi for the given connection settings.
    ///
    /// Must be called from within a tokio runtime; the runtime is kept to
    /// drive event broadcasters.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use node_problem_kubeapi::{ConnectionConfig, KubeApi};
    /// # async fn run() -> Result<(), node_problem_kubeapi::ConfigError> {
    /// let connection = ConnectionConfig::resolve(false)?;
    /// let api = KubeApi::new(&connection)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(connection: &ConnectionConfig) -> Result<Self, ConfigError> {
        let runtime = Handle::try_current()?;
        let config = connection.kube_config()?;
        let client = kube::Client::try_from(config)?;
        tracing::debug!(?connection, "Created kubernetes client");
        Ok(Self::with_client(client, runtime))
    }

    /// Create a KubeApi backed by the provided Kubernetes client.
    pub fn with_client(client: kube::Client, runtime: Handle) -> Self {
        Self { client, runtime }
    }

    fn nodes(&self) -> api::Api<corev1::Node> {
        api::Api::all(self.client.clone())
    }
}

#[async_trait]
impl NodeApi for KubeApi {
    async fn get_node(&self, name: &str) -> kube::Result<corev1::Node> {
        tracing::debug!(name, "Fetching node");
        self.nodes().get(name).await
    }

    async fn patch_node_status(&self, name: &str, patch: Vec<u8>) -> kube::Result<()> {
        tracing::debug!(name, bytes = patch.len(), "Patching node status");
        let request = status_patch_request(name, patch)?;
        self.client
            .request::<corev1::Node>(request)
            .await
            .map(|_node| ())
    }

    fn event_recorder(&self, source: &str, host: &str) -> Arc<dyn EventRecorder> {
        let recorder = KubeEventRecorder::spawn(self.client.clone(), &self.runtime, source, host);
        Arc::new(recorder)
    }
}

impl fmt::Debug for KubeApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KubeApi")
            .field("client", &"<kube::Client>")
            .finish_non_exhaustive()
    }
}

fn status_patch_request(name: &str, patch: Vec<u8>) -> kube::Result<http::Request<Vec<u8>>> {
    let uri = format!("/api/v1/nodes/{name}/status");
    http::Request::patch(uri)
        .header(http::header::CONTENT_TYPE, STRATEGIC_MERGE_PATCH)
        .header(http::header::ACCEPT, "application/json")
        .body(patch)
        .map_err(kube::Error::HttpError)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_patch_targets_status_subresource() {
        let body = br#"{"status":{"conditions":[]}}"#.to_vec();
        let request = status_patch_request("worker-1", body.clone()).unwrap();

        assert_eq!(request.method(), http::Method::PATCH);
        assert_eq!(request.uri(), "/api/v1/nodes/worker-1/status");
        assert_eq!(
            request.headers()[http::header::CONTENT_TYPE],
            STRATEGIC_MERGE_PATCH
        );
        assert_eq!(request.body(), &body);
    }

    #[test]
    fn status_patch_body_is_sent_verbatim() {
        let body = serde_json::to_vec(&serde_json::json!({"status": {"conditions": [{"type": "Ready"}]}}))
            .unwrap();
        let request = status_patch_request("worker-1", body.clone()).unwrap();
        assert_eq!(request.into_body(), body);
    }
}
