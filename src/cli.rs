use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::DEFAULT_COMPOSE_FILE;

/// Stevedore - runs the services of a compose file against a Docker daemon
#[derive(Parser, Debug)]
#[command(name = "stevedore")]
#[command(about = "Run compose-file services against a Docker daemon and follow their logs")]
#[command(version)]
pub struct Cli {
    /// Specify an alternate compose file
    #[arg(short = 'f', long = "file", global = true, env = "COMPOSE_FILE", default_value = DEFAULT_COMPOSE_FILE)]
    pub file: PathBuf,

    /// Specify an alternate project name (default: directory name)
    #[arg(short = 'p', long = "project-name", global = true, env = "COMPOSE_PROJECT_NAME")]
    pub project_name: Option<String>,

    /// Show more output
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List containers
    Ps {
        /// Only display IDs
        #[arg(short, long)]
        quiet: bool,
    },

    /// Pulls service images
    Pull,

    /// Stop services
    Stop {
        /// Seconds to wait before killing a container
        #[arg(short, long)]
        timeout: Option<i64>,
    },

    /// Kill containers
    Kill {
        /// Signal to send (default: SIGKILL)
        signal: Option<String>,
    },

    /// View output from containers
    Logs {
        /// Produce monochrome output
        #[arg(long)]
        no_color: bool,

        /// Number of lines to show from the end of each container's logs
        #[arg(long, default_value = "all")]
        tail: String,

        /// Show timestamps
        #[arg(short, long)]
        timestamps: bool,
    },

    /// Start services
    Start,

    /// Remove stopped containers
    Rm {
        /// Remove volumes associated with containers
        #[arg(short)]
        v: bool,
    },

    /// Print the public port for a port binding
    Port {
        service: String,

        private_port: u16,

        /// tcp or udp
        #[arg(long, default_value = "tcp")]
        protocol: String,

        /// Index of the container if there are multiple instances of a service
        #[arg(long, default_value_t = 1)]
        index: u32,
    },

    /// Build or rebuild services
    Build(Passthrough),

    /// Run a one-off command
    Run(Passthrough),

    /// Set number of containers for a service
    Scale(Passthrough),

    /// Restart services
    Restart(Passthrough),

    /// Create and start containers
    Up(Passthrough),
}

/// Arguments accepted and ignored by commands that are not implemented
#[derive(clap::Args, Debug)]
pub struct Passthrough {
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl Commands {
    /// Name of a verb that has no implementation, if this is one
    pub fn unsupported(&self) -> Option<&'static str> {
        match self {
            Commands::Build(_) => Some("build"),
            Commands::Run(_) => Some("run"),
            Commands::Scale(_) => Some("scale"),
            Commands::Restart(_) => Some("restart"),
            Commands::Up(_) => Some("up"),
            _ => None,
        }
    }
}

impl Cli {
    /// Parses the process arguments, exiting with usage on error
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
