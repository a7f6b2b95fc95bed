pub mod cli;
pub mod commands;
pub mod config;
pub mod container;
pub mod docker_client;
pub mod error;
pub mod fan_in;
pub mod log_entry;
pub mod project;
pub mod signal;

pub use cli::{Cli, Commands};
pub use config::ComposeConfig;
pub use container::{
    discover, filter_project, ContainerHandle, ContainerRuntime, LogOptions, LogStream,
    PortBinding, ServiceContainerMap,
};
pub use docker_client::DockerService;
pub use error::{ComposeError, Result};
pub use fan_in::{FanIn, LineBuffer};
pub use log_entry::LogLine;
pub use project::ProjectNamespace;
pub use signal::Signal;
