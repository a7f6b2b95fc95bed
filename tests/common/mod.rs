#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use stevedore::{
    ComposeError, ContainerHandle, ContainerRuntime, LogOptions, LogStream, PortBinding, Result,
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// What a fake container's log stream yields
#[derive(Clone)]
pub enum Chunk {
    Data(&'static str),
    Fail(&'static str),
    /// Waits this many milliseconds before the next chunk
    Pause(u64),
}

/// In-memory daemon: a fixed container list, scripted log streams, and a
/// record of every mutating call.
#[derive(Default)]
pub struct FakeRuntime {
    containers: Vec<ContainerHandle>,
    logs: HashMap<String, Vec<Chunk>>,
    endless: Vec<String>,
    fail_listing: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeRuntime {
    pub fn new(containers: Vec<ContainerHandle>) -> Self {
        Self {
            containers,
            ..Default::default()
        }
    }

    pub fn with_logs(mut self, id: &str, chunks: Vec<Chunk>) -> Self {
        self.logs.insert(id.to_string(), chunks);
        self
    }

    /// The stream for `id` never closes after its scripted chunks
    pub fn endless(mut self, id: &str) -> Self {
        self.endless.push(id.to_string());
        self
    }

    pub fn failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl ContainerRuntime for FakeRuntime {
    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerHandle>> {
        if self.fail_listing {
            return Err(ComposeError::LogStream("daemon unavailable".to_string()));
        }
        Ok(self
            .containers
            .iter()
            .filter(|c| all || c.is_running())
            .cloned()
            .collect())
    }

    fn log_stream(&self, id: &str, options: &LogOptions) -> LogStream {
        self.record(format!("logs {} tail={}", id, options.tail));

        let chunks = self.logs.get(id).cloned().unwrap_or_default();
        let endless = self.endless.iter().any(|e| e == id);

        let (tx, rx) = mpsc::channel::<Result<Vec<u8>>>(1);
        tokio::spawn(async move {
            for chunk in chunks {
                let item = match chunk {
                    Chunk::Data(text) => Ok(text.as_bytes().to_vec()),
                    Chunk::Fail(message) => Err(ComposeError::LogStream(message.to_string())),
                    Chunk::Pause(millis) => {
                        tokio::time::sleep(Duration::from_millis(millis)).await;
                        continue;
                    }
                };
                if tx.send(item).await.is_err() {
                    return;
                }
            }
            // keep the stream open until the reader goes away
            if endless {
                tx.closed().await;
            }
        });

        Box::pin(ReceiverStream::new(rx))
    }

    async fn stop_container(&self, id: &str, timeout_secs: i64) -> Result<()> {
        self.record(format!("stop {} {}", id, timeout_secs));
        Ok(())
    }

    async fn kill_container(&self, id: &str, signal: &str) -> Result<()> {
        self.record(format!("kill {} {}", id, signal));
        Ok(())
    }

    async fn pull_image(&self, image: &str) -> Result<()> {
        self.record(format!("pull {}", image));
        if image.contains("missing") {
            return Err(ComposeError::LogStream(format!("no such image {}", image)));
        }
        Ok(())
    }

    async fn start_container(&self, id: &str) -> Result<()> {
        self.record(format!("start {}", id));
        Ok(())
    }

    async fn remove_container(&self, id: &str, volumes: bool) -> Result<()> {
        self.record(format!("rm {} volumes={}", id, volumes));
        Ok(())
    }
}

pub fn container(id: &str, name: &str, state: &str) -> ContainerHandle {
    ContainerHandle {
        id: id.to_string(),
        names: vec![name.to_string()],
        image: "busybox".to_string(),
        command: "sh".to_string(),
        state: state.to_string(),
        status: if state == "running" {
            "Up 2 minutes".to_string()
        } else {
            "Exited (0) 1 hour ago".to_string()
        },
        ports: Vec::new(),
    }
}

pub fn published(public: u16, private: u16) -> PortBinding {
    PortBinding {
        ip: Some("0.0.0.0".to_string()),
        public_port: Some(public),
        private_port: private,
        protocol: "tcp".to_string(),
    }
}

/// The three containers from the usual scenario: two in `proj`, one elsewhere
pub fn scenario() -> Vec<ContainerHandle> {
    vec![
        container("id-web", "/proj_web_1", "running"),
        container("id-redis", "/proj_redis_1", "running"),
        container("id-db", "/other_db_1", "running"),
    ]
}
