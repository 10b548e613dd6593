use std::env;
use std::io;

pub const SERVICE_HOST_ENV: &str = "KUBERNETES_SERVICE_HOST";
pub const SERVICE_PORT_ENV: &str = "KUBERNETES_SERVICE_PORT";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unable to load in-cluster configuration: {0}")]
    InCluster(#[from] kube::config::InClusterError),

    #[error(
        "unable to load in-cluster configuration, KUBERNETES_SERVICE_HOST and KUBERNETES_SERVICE_PORT must be defined"
    )]
    MissingServiceEnv,

    #[error("invalid cluster host {host:?}: {source}")]
    InvalidHost {
        host: String,
        #[source]
        source: http::uri::InvalidUri,
    },

    #[error("failed to build kubernetes client: {0}")]
    Client(#[from] kube::Error),

    #[error("kubernetes client requires a tokio runtime: {0}")]
    Runtime(#[from] tokio::runtime::TryCurrentError),

    #[error("failed to resolve hostname: {0}")]
    Hostname(#[source] io::Error),
}

/// How the client reaches the API server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionConfig {
    /// Service account and API server address discovered inside the pod.
    InCluster,
    /// Explicit API server address, TLS verification disabled.
    Insecure { host: String },
}

impl ConnectionConfig {
    pub fn resolve(insecure_connection: bool) -> Result<Self, ConfigError> {
        if insecure_connection {
            Self::insecure_from_env()
        } else {
            Ok(Self::InCluster)
        }
    }

    /// Build the insecure variant from `KUBERNETES_SERVICE_HOST` and
    /// `KUBERNETES_SERVICE_PORT`.
    pub fn insecure_from_env() -> Result<Self, ConfigError> {
        let host = env::var(SERVICE_HOST_ENV).ok();
        let port = env::var(SERVICE_PORT_ENV).ok();
        Self::insecure(host.as_deref(), port.as_deref())
    }

    pub fn insecure(host: Option<&str>, port: Option<&str>) -> Result<Self, ConfigError> {
        cluster_host(host, port).map(|host| Self::Insecure { host })
    }

    pub fn kube_config(&self) -> Result<kube::Config, ConfigError> {
        match self {
            Self::InCluster => Ok(kube::Config::incluster()?),
            Self::Insecure { host } => {
                let cluster_url = host
                    .parse::<http::Uri>()
                    .map_err(|source| ConfigError::InvalidHost {
                        host: host.clone(),
                        source,
                    })?;
                let mut config = kube::Config::new(cluster_url);
                config.accept_invalid_certs = true;
                Ok(config)
            }
        }
    }
}

/// Join service host and port into an `https://` URL.
///
/// Both parts must be present and non-empty. IPv6 literals are bracketed.
pub fn cluster_host(host: Option<&str>, port: Option<&str>) -> Result<String, ConfigError> {
    let host = host.filter(|host| !host.is_empty());
    let port = port.filter(|port| !port.is_empty());
    let (Some(host), Some(port)) = (host, port) else {
        return Err(ConfigError::MissingServiceEnv);
    };

    let url = if host.contains(':') {
        format!("https://[{host}]:{port}")
    } else {
        format!("https://{host}:{port}")
    };
    Ok(url)
}
