use std::env;
use std::io;

use anyhow::{Context, Result};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use stevedore::commands::{self, PortQuery};
use stevedore::{
    config, Cli, Commands, ComposeConfig, ComposeError, DockerService, LogOptions,
    ProjectNamespace,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.verbose);

    if let Some(verb) = cli.command.unsupported() {
        return Err(ComposeError::Unsupported(verb).into());
    }

    // The compose file is read before the daemon is contacted, so a bad file
    // fails fast even when Docker is down.
    let config_path = config::locate(&cli.file);
    let config = ComposeConfig::load(&config_path)?;

    let cwd = env::current_dir().context("Cannot read the working directory")?;
    let project = ProjectNamespace::resolve(cli.project_name.as_deref(), &config_path, &cwd)?;
    debug!(project = %project, file = %config_path.display(), services = config.services.len(), "loaded project");

    let docker = DockerService::connect()?;
    let mut stdout = io::stdout();

    match cli.command {
        Commands::Ps { quiet } => commands::ps(&docker, &project, quiet, &mut stdout).await?,
        Commands::Pull => commands::pull(&docker, &config, &mut stdout).await?,
        Commands::Stop { timeout } => commands::stop(&docker, &project, timeout, &mut stdout).await?,
        Commands::Kill { signal } => {
            commands::kill(&docker, &project, signal.as_deref(), &mut stdout).await?
        }
        Commands::Logs {
            no_color,
            tail,
            timestamps,
        } => {
            let options = LogOptions { tail, timestamps };
            commands::logs(&docker, &project, &options, !no_color, stdout, io::stderr()).await?
        }
        Commands::Start => commands::start(&docker, &project, &mut stdout).await?,
        Commands::Rm { v } => commands::rm(&docker, &project, v, &mut stdout).await?,
        Commands::Port {
            service,
            private_port,
            protocol,
            index,
        } => {
            let query = PortQuery {
                service,
                private_port,
                protocol,
                index,
            };
            commands::port(&docker, &project, &query, &mut stdout).await?
        }
        Commands::Build(_)
        | Commands::Run(_)
        | Commands::Scale(_)
        | Commands::Restart(_)
        | Commands::Up(_) => unreachable!("unsupported commands return early"),
    }

    Ok(())
}

/// Logs go to stderr so they never mix with command output
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}
