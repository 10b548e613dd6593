pub use k8s_openapi as openapi;
pub use k8s_openapi::api::core::v1 as corev1;
pub use k8s_openapi::apimachinery::pkg::apis::meta::v1 as metav1;
pub use k8s_openapi::jiff;

pub use time::TimeExt;

use openapi::Resource as _;

mod time;

pub trait ObjectReferenceExt {
    fn node(name: impl ToString) -> Self;
}

impl ObjectReferenceExt for corev1::ObjectReference {
    /// Reference to a cluster-scoped Node.
    ///
    /// The node name doubles as the UID, so the reference can be built
    /// without fetching the Node first.
    fn node(name: impl ToString) -> Self {
        let name = name.to_string();
        Self {
            api_version: Some(corev1::Node::API_VERSION.to_string()),
            kind: Some(corev1::Node::KIND.to_string()),
            uid: Some(name.clone()),
            name: Some(name),
            namespace: None,
            ..default()
        }
    }
}

pub trait NodeConditionExt {
    fn new(type_: impl ToString, status: impl ToString) -> Self;
    fn reason(self, reason: impl ToString) -> Self;
    fn message(self, message: impl ToString) -> Self;
    fn transitioned(self, ts: impl Into<Option<metav1::Time>>) -> Self;
    fn heartbeat(self, ts: impl Into<Option<metav1::Time>>) -> Self;
    fn is_type(&self, type_: &str) -> bool;
}

impl NodeConditionExt for corev1::NodeCondition {
    fn new(type_: impl ToString, status: impl ToString) -> Self {
        Self {
            type_: type_.to_string(),
            status: status.to_string(),
            ..default()
        }
    }

    fn reason(self, reason: impl ToString) -> Self {
        Self {
            reason: Some(reason.to_string()),
            ..self
        }
    }

    fn message(self, message: impl ToString) -> Self {
        Self {
            message: Some(message.to_string()),
            ..self
        }
    }

    fn transitioned(self, ts: impl Into<Option<metav1::Time>>) -> Self {
        Self {
            last_transition_time: ts.into(),
            ..self
        }
    }

    fn heartbeat(self, ts: impl Into<Option<metav1::Time>>) -> Self {
        Self {
            last_heartbeat_time: ts.into(),
            ..self
        }
    }

    fn is_type(&self, type_: &str) -> bool {
        self.type_ == type_
    }
}

pub trait NodeExt {
    fn conditions(&self) -> &[corev1::NodeCondition];
}

impl NodeExt for corev1::Node {
    /// Conditions reported in the node status, in server order.
    fn conditions(&self) -> &[corev1::NodeCondition] {
        self.status
            .as_ref()
            .and_then(|status| status.conditions.as_deref())
            .unwrap_or_default()
    }
}

pub fn default<T: Default>() -> T {
    T::default()
}
