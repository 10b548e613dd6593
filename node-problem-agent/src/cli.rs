use clap::Args;
use clap::Parser;
use clap::Subcommand;
use node_problem_client::ClientOptions;
use node_problem_client::EventType;
use node_problem_ext as k8s;

use k8s::NodeConditionExt as _;
use k8s::corev1;
use k8s::metav1;

#[derive(Debug, Parser)]
#[command(
    name = "node-problem-agent",
    version,
    about = "Report node conditions and events to the Kubernetes API server"
)]
pub(crate) struct Cli {
    /// If non-empty, use this string as identification instead of the actual hostname
    #[arg(long, global = true, default_value = "")]
    pub(crate) hostname_override: String,

    /// Skip TLS verification and reach the API server through
    /// KUBERNETES_SERVICE_HOST and KUBERNETES_SERVICE_PORT
    #[arg(long, global = true)]
    pub(crate) insecure_connection: bool,

    #[command(subcommand)]
    pub(crate) command: Command,
}

impl Cli {
    pub(crate) fn options(&self) -> ClientOptions {
        ClientOptions {
            hostname_override: self.hostname_override.clone(),
            insecure_connection: self.insecure_connection,
        }
    }
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Print the conditions of this node with the given types as JSON
    GetConditions {
        /// Condition types, e.g. Ready or KernelDeadlock
        #[arg(required = true)]
        types: Vec<String>,
    },
    /// Set or update one condition of this node
    SetCondition(SetCondition),
    /// Report an event about this node
    Event(Event),
}

#[derive(Debug, Args)]
pub(crate) struct SetCondition {
    #[arg(long = "type")]
    pub(crate) type_: String,

    #[arg(long)]
    pub(crate) status: String,

    #[arg(long)]
    pub(crate) reason: Option<String>,

    #[arg(long)]
    pub(crate) message: Option<String>,
}

impl SetCondition {
    pub(crate) fn condition(&self, now: metav1::Time) -> corev1::NodeCondition {
        let condition =
            corev1::NodeCondition::new(&self.type_, &self.status).transitioned(now);
        let condition = match &self.reason {
            Some(reason) => condition.reason(reason),
            None => condition,
        };
        match &self.message {
            Some(message) => condition.message(message),
            None => condition,
        }
    }
}

#[derive(Debug, Args)]
pub(crate) struct Event {
    /// Normal or Warning
    #[arg(long = "type", default_value_t = EventType::Normal)]
    pub(crate) event_type: EventType,

    /// Component reporting the event, e.g. kernel-monitor
    #[arg(long)]
    pub(crate) source: String,

    #[arg(long)]
    pub(crate) reason: String,

    pub(crate) message: String,

    /// Seconds to wait for background delivery before exiting
    ///
    /// The full duration is always waited out; delivery finishing early does
    /// not shorten it, and delivery still pending when it ends is lost.
    #[arg(long, default_value_t = 2)]
    pub(crate) linger: u64,
}
