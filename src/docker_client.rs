use std::env;

use bollard::{
    container::{
        KillContainerOptions, ListContainersOptions, LogsOptions, RemoveContainerOptions,
        StartContainerOptions, StopContainerOptions,
    },
    image::CreateImageOptions,
    models::{ContainerSummary, Port},
    Docker,
};
use tokio_stream::StreamExt;
use tracing::debug;

use crate::container::{ContainerHandle, ContainerRuntime, LogOptions, LogStream, PortBinding};
use crate::error::{ComposeError, Result};

/// Docker daemon client
pub struct DockerService {
    client: Docker,
}

impl DockerService {
    /// Connects using the environment: `DOCKER_HOST` for the address, and TLS
    /// material from `DOCKER_CERT_PATH` (`cert.pem`, `key.pem`, `ca.pem`) when set.
    pub fn connect() -> Result<Self> {
        let tls = env::var_os("DOCKER_CERT_PATH").is_some_and(|path| !path.is_empty());

        let client = if tls {
            debug!("connecting to the Docker daemon over TLS");
            Docker::connect_with_ssl_defaults()
        } else {
            debug!("connecting to the Docker daemon");
            Docker::connect_with_defaults()
        }
        .map_err(ComposeError::Connection)?;

        Ok(Self { client })
    }
}

impl ContainerRuntime for DockerService {
    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerHandle>> {
        let options = ListContainersOptions::<String> {
            all,
            ..Default::default()
        };

        let containers = self.client.list_containers(Some(options)).await?;
        Ok(containers.into_iter().map(ContainerHandle::from).collect())
    }

    fn log_stream(&self, id: &str, options: &LogOptions) -> LogStream {
        let options = LogsOptions::<String> {
            follow: true,
            stdout: true,
            stderr: true,
            timestamps: options.timestamps,
            tail: options.tail.clone(),
            ..Default::default()
        };

        let stream = self.client.logs(id, Some(options)).map(|chunk| {
            chunk
                .map(|output| output.into_bytes().to_vec())
                .map_err(|e| ComposeError::LogStream(e.to_string()))
        });

        Box::pin(stream)
    }

    async fn stop_container(&self, id: &str, timeout_secs: i64) -> Result<()> {
        let options = StopContainerOptions { t: timeout_secs };
        self.client.stop_container(id, Some(options)).await?;
        Ok(())
    }

    async fn kill_container(&self, id: &str, signal: &str) -> Result<()> {
        let options = KillContainerOptions { signal };
        self.client.kill_container(id, Some(options)).await?;
        Ok(())
    }

    async fn pull_image(&self, image: &str) -> Result<()> {
        let (repository, tag) = split_image_reference(image);
        let options = CreateImageOptions {
            from_image: repository.to_string(),
            tag: tag.to_string(),
            ..Default::default()
        };

        let mut progress = Box::pin(self.client.create_image(Some(options), None, None));
        while let Some(info) = progress.next().await {
            let info = info?;
            if let Some(status) = info.status {
                debug!(image, progress = info.progress.as_deref().unwrap_or(""), "{}", status);
            }
        }
        Ok(())
    }

    async fn start_container(&self, id: &str) -> Result<()> {
        self.client
            .start_container(id, None::<StartContainerOptions<String>>)
            .await?;
        Ok(())
    }

    async fn remove_container(&self, id: &str, volumes: bool) -> Result<()> {
        let options = RemoveContainerOptions {
            v: volumes,
            ..Default::default()
        };
        self.client.remove_container(id, Some(options)).await?;
        Ok(())
    }
}

impl From<ContainerSummary> for ContainerHandle {
    fn from(summary: ContainerSummary) -> Self {
        Self {
            id: summary.id.unwrap_or_default(),
            names: summary.names.unwrap_or_default(),
            image: summary.image.unwrap_or_default(),
            command: summary.command.unwrap_or_default(),
            state: summary.state.unwrap_or_default(),
            status: summary.status.unwrap_or_default(),
            ports: summary
                .ports
                .unwrap_or_default()
                .into_iter()
                .map(PortBinding::from)
                .collect(),
        }
    }
}

impl From<Port> for PortBinding {
    fn from(port: Port) -> Self {
        Self {
            ip: port.ip,
            public_port: port.public_port,
            private_port: port.private_port,
            protocol: port.typ.map(|t| t.to_string()).unwrap_or_default(),
        }
    }
}

/// Splits `repo[:tag][@digest]` into what the pull endpoint expects. A
/// missing tag means `latest`; the registry port in `host:5000/repo` is not a tag.
pub fn split_image_reference(image: &str) -> (&str, &str) {
    if let Some((repository, digest)) = image.split_once('@') {
        return (repository, digest);
    }

    let last_segment = image.rfind('/').map_or(0, |slash| slash + 1);
    match image[last_segment..].rfind(':') {
        Some(colon) => {
            let colon = last_segment + colon;
            (&image[..colon], &image[colon + 1..])
        }
        None => (image, "latest"),
    }
}
