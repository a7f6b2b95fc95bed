//! One function per verb. Each works against any [`ContainerRuntime`] and
//! writes its user-facing output to the writer it is given.

use std::io::Write;

use tabled::builder::Builder;
use tabled::settings::object::Columns;
use tabled::settings::{Padding, Style};
use tracing::{debug, error};

use crate::container::{discover, ContainerHandle, ContainerRuntime, LogOptions};
use crate::config::ComposeConfig;
use crate::error::{ComposeError, Result};
use crate::fan_in::FanIn;
use crate::project::ProjectNamespace;
use crate::signal::Signal;

const STOP_TIMEOUT_SECS: i64 = 30;
const STATE_WIDTH: usize = 18;
const COLUMN_PADDING: usize = 3;
const HEADER: [&str; 4] = ["Name", "Command", "State", "Ports"];
const RULE: &str = "-----------------";

/// Lists the project's containers as a table, or only their ids when `quiet`
pub async fn ps<R, W>(runtime: &R, project: &ProjectNamespace, quiet: bool, out: &mut W) -> Result<()>
where
    R: ContainerRuntime,
    W: Write,
{
    let services = discover(runtime, project, true).await?;

    if quiet {
        for container in services.values() {
            writeln!(out, "{}", container.id)?;
        }
        return Ok(());
    }

    let mut rows = vec![
        HEADER.map(str::to_string),
        [RULE; 4].map(str::to_string),
    ];
    for container in services.values() {
        rows.extend(ps_rows(container));
    }
    write_table(out, &rows)?;
    Ok(())
}

/// First row describes the container, each further port gets a continuation row
fn ps_rows(container: &ContainerHandle) -> Vec<[String; 4]> {
    let name = container.name().unwrap_or_default();
    let name = name.strip_prefix('/').unwrap_or(name);
    let state: String = container.status.chars().take(STATE_WIDTH).collect();

    let mut ports = container.ports.iter().map(ToString::to_string);
    let mut rows = vec![[
        name.to_string(),
        container.command.clone(),
        state,
        ports.next().unwrap_or_default(),
    ]];
    rows.extend(ports.map(|port| [String::new(), String::new(), String::new(), port]));
    rows
}

/// Lays the rows out like a tab writer: no borders, every column but the
/// last padded to its widest cell plus a fixed gap.
fn write_table<W: Write>(out: &mut W, rows: &[[String; 4]]) -> std::io::Result<()> {
    let mut builder = Builder::default();
    for row in rows {
        builder.push_record(row.iter().cloned());
    }

    let mut table = builder.build();
    table.with(Style::empty()).with(Padding::zero());
    table.modify(Columns::new(..3), Padding::new(0, COLUMN_PADDING, 0, 0));

    for line in table.to_string().lines() {
        writeln!(out, "{}", line.trim_end())?;
    }
    Ok(())
}

/// Pulls the image of every service that declares one. The first failure aborts.
pub async fn pull<R, W>(runtime: &R, config: &ComposeConfig, out: &mut W) -> Result<()>
where
    R: ContainerRuntime,
    W: Write,
{
    for (service, image) in config.images() {
        writeln!(out, "Pulling {} ({})...", service, image)?;
        out.flush()?;
        runtime.pull_image(image).await?;
    }
    Ok(())
}

/// Stops every running container of the project, giving each `timeout_secs`
/// (30 by default) to exit before the daemon kills it
pub async fn stop<R, W>(runtime: &R, project: &ProjectNamespace, timeout_secs: Option<i64>, out: &mut W) -> Result<()>
where
    R: ContainerRuntime,
    W: Write,
{
    let timeout = timeout_secs.unwrap_or(STOP_TIMEOUT_SECS);
    let services = discover(runtime, project, false).await?;

    for container in services.values() {
        writeln!(out, "Stopping {}...", container.name().unwrap_or_default())?;
        out.flush()?;
        if let Err(e) = runtime.stop_container(&container.id, timeout).await {
            error!(container = %container.id, "failed to stop: {}", e);
        }
    }
    Ok(())
}

/// Sends `signal` (SIGKILL when absent or unknown) to every running container
pub async fn kill<R, W>(runtime: &R, project: &ProjectNamespace, signal: Option<&str>, out: &mut W) -> Result<()>
where
    R: ContainerRuntime,
    W: Write,
{
    let signal = Signal::parse_or_default(signal);
    let services = discover(runtime, project, false).await?;
    debug!(%signal, number = signal.number(), containers = services.len(), "killing project containers");

    for container in services.values() {
        writeln!(out, "Killing {}...", container.name().unwrap_or_default())?;
        out.flush()?;
        if let Err(e) = runtime.kill_container(&container.id, signal.name()).await {
            error!(container = %container.id, "failed to kill: {}", e);
        }
    }
    Ok(())
}

/// Starts the project's containers that are not running
pub async fn start<R, W>(runtime: &R, project: &ProjectNamespace, out: &mut W) -> Result<()>
where
    R: ContainerRuntime,
    W: Write,
{
    let services = discover(runtime, project, true).await?;

    for container in services.values().filter(|c| !c.is_running()) {
        writeln!(out, "Starting {}...", container.name().unwrap_or_default())?;
        out.flush()?;
        if let Err(e) = runtime.start_container(&container.id).await {
            error!(container = %container.id, "failed to start: {}", e);
        }
    }
    Ok(())
}

/// Removes the project's stopped containers
pub async fn rm<R, W>(runtime: &R, project: &ProjectNamespace, volumes: bool, out: &mut W) -> Result<()>
where
    R: ContainerRuntime,
    W: Write,
{
    let services = discover(runtime, project, true).await?;
    let stopped: Vec<_> = services.values().filter(|c| !c.is_running()).collect();

    if stopped.is_empty() {
        writeln!(out, "No stopped containers")?;
        return Ok(());
    }

    for container in stopped {
        writeln!(out, "Removing {}...", container.name().unwrap_or_default())?;
        out.flush()?;
        if let Err(e) = runtime.remove_container(&container.id, volumes).await {
            error!(container = %container.id, "failed to remove: {}", e);
        }
    }
    Ok(())
}

/// What `port` looks up
#[derive(Debug, Clone)]
pub struct PortQuery {
    /// Service name without the instance number, e.g. `web`
    pub service: String,
    /// Port inside the container
    pub private_port: u16,
    /// `tcp` or `udp`
    pub protocol: String,
    /// Instance number, 1 for the first container of the service
    pub index: u32,
}

/// Prints the public address bound to a service's private port
pub async fn port<R, W>(runtime: &R, project: &ProjectNamespace, query: &PortQuery, out: &mut W) -> Result<()>
where
    R: ContainerRuntime,
    W: Write,
{
    let services = discover(runtime, project, false).await?;
    let numbered = format!("{}_{}", query.service, query.index);

    let container = services
        .get(&numbered)
        .or_else(|| services.get(&query.service))
        .ok_or_else(|| ComposeError::ServiceNotFound(query.service.clone()))?;

    let binding = container.ports.iter().find(|p| {
        p.private_port == query.private_port
            && p.protocol.eq_ignore_ascii_case(&query.protocol)
            && p.public_port.is_some()
    });

    if let Some(binding) = binding {
        let ip = binding.ip.as_deref().unwrap_or("0.0.0.0");
        writeln!(out, "{}:{}", ip, binding.public_port.unwrap_or_default())?;
    } else {
        debug!(service = %query.service, port = query.private_port, "port is not published");
    }
    Ok(())
}

/// Follows the logs of every project container, stopped ones included,
/// until all streams end
pub async fn logs<R, O, E>(
    runtime: &R,
    project: &ProjectNamespace,
    options: &LogOptions,
    color: bool,
    out: O,
    diag: E,
) -> Result<()>
where
    R: ContainerRuntime,
    O: Write,
    E: Write,
{
    let services = discover(runtime, project, true).await?;
    FanIn::new(out, diag, color)
        .run(runtime, &services, options)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::PortBinding;

    fn render(rows: &[[String; 4]]) -> String {
        let mut out = Vec::new();
        write_table(&mut out, rows).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_ps_rows_continue_extra_ports() {
        let container = ContainerHandle {
            id: "a".to_string(),
            names: vec!["/proj_web_1".to_string()],
            command: "nginx".to_string(),
            status: "Up 12 minutes (healthy) since boot".to_string(),
            ports: vec![
                PortBinding {
                    ip: Some("0.0.0.0".to_string()),
                    public_port: Some(8080),
                    private_port: 80,
                    protocol: "tcp".to_string(),
                },
                PortBinding {
                    ip: Some("0.0.0.0".to_string()),
                    public_port: Some(8443),
                    private_port: 443,
                    protocol: "tcp".to_string(),
                },
            ],
            ..Default::default()
        };

        let rows = ps_rows(&container);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], "proj_web_1");
        assert_eq!(rows[0][2], "Up 12 minutes (hea");
        assert_eq!(rows[0][3], "0.0.0.0:8080->80/tcp");
        assert_eq!(rows[1], ["", "", "", "0.0.0.0:8443->443/tcp"].map(str::to_string));
    }

    #[test]
    fn test_table_aligns_columns() {
        let rows = [
            ["Name", "Command", "State", "Ports"].map(str::to_string),
            ["proj_db_1", "postgres", "Up", ""].map(str::to_string),
            ["", "", "", "5432/tcp"].map(str::to_string),
        ];

        let expected = [
            format!("Name{}Command{}State{}Ports", " ".repeat(8), " ".repeat(4), " ".repeat(3)),
            format!("proj_db_1{}postgres{}Up", " ".repeat(3), " ".repeat(3)),
            format!("{}5432/tcp", " ".repeat(12 + 11 + 8)),
        ];
        assert_eq!(render(&rows), expected.join("\n") + "\n");
    }
}
