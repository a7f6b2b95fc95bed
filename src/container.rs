use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use tokio_stream::Stream;
use tracing::debug;

use crate::error::Result;
use crate::project::ProjectNamespace;

/// Raw log bytes as the daemon delivers them, stdout and stderr combined
pub type LogStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>>> + Send>>;

/// Containers of one project, keyed by service name
pub type ServiceContainerMap = BTreeMap<String, ContainerHandle>;

/// Snapshot of a container as listed by the daemon
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerHandle {
    pub id: String,
    pub names: Vec<String>,
    pub image: String,
    pub command: String,
    /// Machine state: "running", "exited", ...
    pub state: String,
    /// Human status: "Up 3 minutes", "Exited (0) 2 hours ago", ...
    pub status: String,
    pub ports: Vec<PortBinding>,
}

impl ContainerHandle {
    /// The name used for matching and display; `None` for an unnamed container
    pub fn name(&self) -> Option<&str> {
        self.names.first().map(String::as_str)
    }

    /// Whether the daemon reports the container as running
    pub fn is_running(&self) -> bool {
        self.state == "running"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortBinding {
    pub ip: Option<String>,
    pub public_port: Option<u16>,
    pub private_port: u16,
    pub protocol: String,
}

impl fmt::Display for PortBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.public_port {
            Some(public) => write!(
                f,
                "{}:{}->{}/{}",
                self.ip.as_deref().unwrap_or(""),
                public,
                self.private_port,
                self.protocol
            ),
            None => write!(f, "{}/{}", self.private_port, self.protocol),
        }
    }
}

/// Options for following a container's output
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Number of past lines to replay, or "all"
    pub tail: String,
    pub timestamps: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            tail: "all".to_string(),
            timestamps: false,
        }
    }
}

/// The daemon operations the orchestrator needs.
///
/// `DockerService` talks to a real daemon; tests substitute an in-memory one.
pub trait ContainerRuntime {
    /// Lists running containers, or every container when `all` is set
    fn list_containers(&self, all: bool) -> impl Future<Output = Result<Vec<ContainerHandle>>> + Send;

    /// Opens a follow-mode stream of the container's stdout and stderr
    fn log_stream(&self, id: &str, options: &LogOptions) -> LogStream;

    /// Asks the container to stop, killing it after `timeout_secs`
    fn stop_container(&self, id: &str, timeout_secs: i64) -> impl Future<Output = Result<()>> + Send;

    /// Sends `signal` (a name such as `SIGTERM`) to the container
    fn kill_container(&self, id: &str, signal: &str) -> impl Future<Output = Result<()>> + Send;

    /// Pulls `image` and waits for the pull to complete
    fn pull_image(&self, image: &str) -> impl Future<Output = Result<()>> + Send;

    /// Starts an existing, stopped container
    fn start_container(&self, id: &str) -> impl Future<Output = Result<()>> + Send;

    /// Removes the container, and its anonymous volumes when `volumes` is set
    fn remove_container(&self, id: &str, volumes: bool) -> impl Future<Output = Result<()>> + Send;
}

/// Keeps the containers whose first name carries the project prefix and keys
/// them by the remainder of that name. The first container seen for a key wins.
pub fn filter_project(
    project: &ProjectNamespace,
    containers: impl IntoIterator<Item = ContainerHandle>,
) -> ServiceContainerMap {
    let mut services = ServiceContainerMap::new();

    for container in containers {
        let Some(service) = container.name().and_then(|name| project.service_name(name)) else {
            continue;
        };
        services.entry(service.to_string()).or_insert(container);
    }

    services
}

/// Lists the daemon's containers and returns the ones belonging to `project`
pub async fn discover<R: ContainerRuntime>(
    runtime: &R,
    project: &ProjectNamespace,
    include_stopped: bool,
) -> Result<ServiceContainerMap> {
    let containers = runtime.list_containers(include_stopped).await?;
    let listed = containers.len();
    let services = filter_project(project, containers);

    debug!(
        project = project.name(),
        listed,
        matched = services.len(),
        include_stopped,
        "discovered project containers"
    );

    Ok(services)
}
