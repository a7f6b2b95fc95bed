//! Log fan-in: follows every container of a project at once and interleaves
//! their output into a single labeled stream.
//!
//! Each container gets its own task that reads the daemon stream and splits it
//! into lines. Lines travel over one channel to the caller's task, which is the
//! only writer, so a rendered line (color codes included) is never torn by a
//! concurrent write from another service.
//!
//! The channel is bounded: when the writer falls behind (output piped into a
//! pager, a paused terminal) the readers wait instead of queueing lines.

use std::future::{self, Future};
use std::io::Write;

use colored::Color;
use tokio::sync::mpsc::{self, Sender};
use tokio::task::JoinSet;
use tokio_stream::StreamExt;
use tracing::{debug, error};

use crate::container::{ContainerRuntime, LogOptions, LogStream, ServiceContainerMap};
use crate::error::{ComposeError, Result};
use crate::log_entry::{label_width, palette_color, LogLine};

/// Lines that may wait for the writer before the readers are paused
pub const DEFAULT_BUFFER_LINES: usize = 1024;

/// What a per-container task reports back
#[derive(Debug)]
enum LogEvent {
    Line(LogLine),
    Failed { service: String, error: ComposeError },
}

/// Accumulates raw chunks and yields complete lines.
///
/// Chunks from the daemon do not respect line boundaries; a line is emitted
/// once its `\n` arrives. A trailing `\r` is dropped and invalid UTF-8 is
/// replaced.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Appends a chunk and returns every line it completed, in order
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(end) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            lines.push(decode(&line[..end]));
        }
        lines
    }

    /// Whatever is left once the stream ends, if anything
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(decode(&rest))
    }
}

fn decode(line: &[u8]) -> String {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}

/// Multiplexes container logs onto `out`, with stream errors reported on `diag`
pub struct FanIn<O, E> {
    out: O,
    diag: E,
    color: bool,
    buffer_lines: usize,
}

impl<O: Write, E: Write> FanIn<O, E> {
    /// Creates an engine writing lines to `out` and stream errors to `diag`,
    /// with service labels colored when `color` is set
    pub fn new(out: O, diag: E, color: bool) -> Self {
        Self {
            out,
            diag,
            color,
            buffer_lines: DEFAULT_BUFFER_LINES,
        }
    }

    /// Sets how many lines may wait for the writer before the readers pause
    pub fn with_buffer(mut self, lines: usize) -> Self {
        self.buffer_lines = lines.max(1);
        self
    }

    /// Follows every container until all of their streams have ended
    pub async fn run<R: ContainerRuntime>(
        &mut self,
        runtime: &R,
        services: &ServiceContainerMap,
        options: &LogOptions,
    ) -> Result<()> {
        self.run_until(runtime, services, options, future::pending())
            .await
    }

    /// Like [`FanIn::run`], but also stops, aborting the open streams, as soon
    /// as `shutdown` completes.
    pub async fn run_until<R, F>(
        &mut self,
        runtime: &R,
        services: &ServiceContainerMap,
        options: &LogOptions,
        shutdown: F,
    ) -> Result<()>
    where
        R: ContainerRuntime,
        F: Future<Output = ()>,
    {
        if services.is_empty() {
            debug!("no containers to follow");
            return Ok(());
        }

        let width = label_width(services.keys().map(String::as_str));
        let (tx, mut rx) = mpsc::channel(self.buffer_lines);
        let mut tasks = JoinSet::new();

        for (index, (service, container)) in services.iter().enumerate() {
            let stream = runtime.log_stream(&container.id, options);
            let color = palette_color(index + 1);
            debug!(service = %service, container = %container.id, "following logs");
            tasks.spawn(scan(service.clone(), color, stream, tx.clone()));
        }
        // the channel closes once every task has dropped its sender
        drop(tx);

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(event) => self.write_event(event, width)?,
                    None => break,
                },
                _ = &mut shutdown => {
                    debug!("shutdown requested, closing log streams");
                    tasks.shutdown().await;
                    return Ok(());
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!("log task failed: {}", e);
            }
        }

        Ok(())
    }

    /// Hands back the writers, e.g. to inspect what was written
    pub fn into_inner(self) -> (O, E) {
        (self.out, self.diag)
    }

    fn write_event(&mut self, event: LogEvent, width: usize) -> Result<()> {
        match event {
            LogEvent::Line(line) => {
                self.out.write_all(line.render(width, self.color).as_bytes())?;
                self.out.flush()?;
            }
            LogEvent::Failed { service, error } => {
                writeln!(
                    self.diag,
                    "There was an error with the scanner in container {} with error: {}",
                    service, error
                )?;
            }
        }
        Ok(())
    }
}

/// Reads one container's stream to the end, forwarding each line
async fn scan(service: String, color: Color, mut stream: LogStream, tx: Sender<LogEvent>) {
    let mut buffer = LineBuffer::default();

    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => {
                for text in buffer.push(&bytes) {
                    let line = LogLine::new(&service, color, text);
                    if tx.send(LogEvent::Line(line)).await.is_err() {
                        return;
                    }
                }
            }
            Err(error) => {
                debug!(service = %service, "log stream failed: {}", error);
                let _ = tx.send(LogEvent::Failed { service, error }).await;
                return;
            }
        }
    }

    if let Some(text) = buffer.finish() {
        let _ = tx.send(LogEvent::Line(LogLine::new(&service, color, text))).await;
    }
    debug!(service = %service, "log stream closed");
}
