//! Virtual network printer
//!
//! Accepts raw TCP print streams (no handshake, no framing) and cuts them
//! into jobs. A job ends when a client closes its write side or when no
//! bytes arrived for the idle window. All connections feed one buffer.
//!
//! Connection handlers only forward bytes; a single framer task owns the
//! buffer, the state machine and the history, so state changes are
//! serialised and broadcast in order.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use shared::util::now_rfc3339;
use shared::{
    HardwareError, PrintJob, PrintJobStatus, PrinterEvent, PrinterState, parse_recipe,
};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::encoding::decode_windows_1252;
use crate::error::{PrintError, PrintResult};
use crate::history::JobHistory;

/// Capacity of the printer event channel
const EVENT_CAPACITY: usize = 64;

/// Socket read size
const READ_CHUNK: usize = 4096;

/// Listener settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrinterServerConfig {
    /// Bind host, `0.0.0.0` for all interfaces
    pub host: String,
    pub port: u16,
    /// Silence that ends a job
    pub idle_timeout: Duration,
}

impl PrinterServerConfig {
    pub const DEFAULT_PORT: u16 = 9100;
    pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_millis(800);

    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            idle_timeout: Self::DEFAULT_IDLE_TIMEOUT,
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for PrinterServerConfig {
    fn default() -> Self {
        Self::new("0.0.0.0", Self::DEFAULT_PORT)
    }
}

/// Messages from connection handlers to the framer
#[derive(Debug)]
enum Inbound {
    Connected(SocketAddr),
    Chunk(Vec<u8>),
    EndOfStream(SocketAddr),
    Fault(String),
}

/// State visible to callers, written only by the framer task
#[derive(Debug, Default)]
struct Snapshot {
    state: PrinterState,
    history: JobHistory,
}

struct Running {
    local_addr: SocketAddr,
    shutdown: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

/// TCP print-stream listener that turns streams into [`PrintJob`]s
pub struct VirtualPrinterServer {
    config: PrinterServerConfig,
    events: broadcast::Sender<PrinterEvent>,
    snapshot: Arc<Mutex<Snapshot>>,
    running: tokio::sync::Mutex<Option<Running>>,
}

impl VirtualPrinterServer {
    pub fn new(config: PrinterServerConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            config,
            events,
            snapshot: Arc::new(Mutex::new(Snapshot::default())),
            running: tokio::sync::Mutex::new(None),
        }
    }

    pub fn config(&self) -> &PrinterServerConfig {
        &self.config
    }

    /// Receive events emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<PrinterEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> PrinterState {
        self.snapshot.lock().state
    }

    /// Completed jobs, newest first
    pub fn history(&self) -> Vec<PrintJob> {
        self.snapshot.lock().history.to_vec()
    }

    pub fn job_count(&self) -> usize {
        self.snapshot.lock().history.len()
    }

    /// Bound address while running
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.as_ref().map(|r| r.local_addr)
    }

    /// Bind the listener and start accepting print streams
    ///
    /// Returns the bound address. Calling `start` again while running
    /// returns the existing address.
    #[instrument(skip(self), fields(addr = %self.config.bind_addr()))]
    pub async fn start(&self) -> PrintResult<SocketAddr> {
        let mut running = self.running.lock().await;
        if let Some(running) = running.as_ref() {
            return Ok(running.local_addr);
        }

        let bind_addr = self.config.bind_addr();
        let listener = match TcpListener::bind(&bind_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!(error = %e, "Virtual printer failed to bind");
                let mut framer = Framer::new(
                    self.config.idle_timeout,
                    self.events.clone(),
                    self.snapshot.clone(),
                );
                framer.fault(format!("cannot listen on {bind_addr}: {e}"));
                return Err(PrintError::Bind {
                    addr: bind_addr,
                    source: e,
                });
            }
        };
        let local_addr = listener.local_addr()?;

        let shutdown = CancellationToken::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let framer = Framer::new(
            self.config.idle_timeout,
            self.events.clone(),
            self.snapshot.clone(),
        );
        framer.set_state(PrinterState::Idle);

        let tasks = vec![
            tokio::spawn(framer.run(rx, shutdown.clone())),
            tokio::spawn(accept_loop(listener, tx, shutdown.clone())),
        ];

        info!(%local_addr, "Virtual printer listening");
        *running = Some(Running {
            local_addr,
            shutdown,
            tasks,
        });
        Ok(local_addr)
    }

    /// Close the listener and all open connections. Idempotent.
    pub async fn stop(&self) {
        let Some(running) = self.running.lock().await.take() else {
            return;
        };
        running.shutdown.cancel();
        for task in running.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Virtual printer task ended abnormally");
            }
        }
        info!(addr = %running.local_addr, "Virtual printer stopped");
    }
}

async fn accept_loop(
    listener: TcpListener,
    tx: mpsc::UnboundedSender<Inbound>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                debug!("Virtual printer accept loop shutting down");
                break;
            }

            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        debug!(%addr, "Print client connected");
                        tokio::spawn(handle_connection(stream, addr, tx.clone(), shutdown.clone()));
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to accept print connection");
                        let _ = tx.send(Inbound::Fault(format!("accept failed: {e}")));
                    }
                }
            }
        }
    }
}

#[instrument(skip(stream, tx, shutdown))]
async fn handle_connection(
    mut stream: TcpStream,
    addr: SocketAddr,
    tx: mpsc::UnboundedSender<Inbound>,
    shutdown: CancellationToken,
) {
    if tx.send(Inbound::Connected(addr)).is_err() {
        return;
    }

    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let read = tokio::select! {
            _ = shutdown.cancelled() => break,
            read = stream.read(&mut buf) => read,
        };

        let message = match read {
            Ok(0) => Inbound::EndOfStream(addr),
            Ok(n) => Inbound::Chunk(buf[..n].to_vec()),
            Err(e) => Inbound::Fault(format!("read from {addr} failed: {e}")),
        };
        let done = !matches!(message, Inbound::Chunk(_));
        if tx.send(message).is_err() || done {
            break;
        }
    }
    debug!("Print connection closed");
}

/// Owns the receive buffer and the printer state machine
struct Framer {
    buffer: Vec<u8>,
    deadline: Option<Instant>,
    idle_timeout: Duration,
    events: broadcast::Sender<PrinterEvent>,
    snapshot: Arc<Mutex<Snapshot>>,
}

impl Framer {
    fn new(
        idle_timeout: Duration,
        events: broadcast::Sender<PrinterEvent>,
        snapshot: Arc<Mutex<Snapshot>>,
    ) -> Self {
        Self {
            buffer: Vec::new(),
            deadline: None,
            idle_timeout,
            events,
            snapshot,
        }
    }

    async fn run(
        mut self,
        mut rx: mpsc::UnboundedReceiver<Inbound>,
        shutdown: CancellationToken,
    ) {
        loop {
            let deadline = self.deadline;
            let idle = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now));
            let message = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = idle, if deadline.is_some() => {
                    debug!(bytes = self.buffer.len(), "Print stream idle, closing job");
                    self.finish_job();
                    continue;
                }
                message = rx.recv() => message,
            };

            match message {
                Some(Inbound::Connected(_)) => {
                    // a connection that never sends anything still times out
                    self.deadline = Some(Instant::now() + self.idle_timeout);
                    self.set_state(PrinterState::Receiving);
                }
                Some(Inbound::Chunk(bytes)) => {
                    self.buffer.extend_from_slice(&bytes);
                    self.deadline = Some(Instant::now() + self.idle_timeout);
                    self.set_state(PrinterState::Receiving);
                }
                Some(Inbound::EndOfStream(addr)) => {
                    debug!(%addr, bytes = self.buffer.len(), "Print stream ended");
                    self.finish_job();
                }
                Some(Inbound::Fault(message)) => self.fault(message),
                None => break,
            }
        }

        if !self.buffer.is_empty() {
            debug!(bytes = self.buffer.len(), "Discarding partial print stream on shutdown");
        }
        self.set_state(PrinterState::Idle);
    }

    fn set_state(&self, next: PrinterState) {
        let (changed, job_count) = {
            let mut snapshot = self.snapshot.lock();
            let changed = snapshot.state != next;
            snapshot.state = next;
            (changed, snapshot.history.len())
        };
        if changed {
            debug!(state = %next, "Printer state changed");
            let _ = self.events.send(PrinterEvent::StatusChanged {
                state: next,
                job_count,
            });
        }
    }

    /// Close the current job, if any, and return to idle
    fn finish_job(&mut self) {
        self.deadline = None;
        if self.buffer.is_empty() {
            self.set_state(PrinterState::Idle);
            return;
        }

        self.set_state(PrinterState::Processing);
        let bytes = std::mem::take(&mut self.buffer);
        let text = decode_windows_1252(&bytes);
        let recipe = parse_recipe(&text);

        let job = PrintJob {
            id: Uuid::new_v4(),
            timestamp: now_rfc3339(),
            byte_size: bytes.len(),
            status: if recipe.is_some() {
                PrintJobStatus::Success
            } else {
                PrintJobStatus::Failed
            },
            preview_text: PrintJob::make_preview(&text),
            recipe_number: recipe.as_ref().map(|r| r.number.clone()),
        };
        info!(
            job_id = %job.id,
            bytes = job.byte_size,
            recipe = job.recipe_number.as_deref().unwrap_or("-"),
            "Print job completed"
        );

        self.snapshot.lock().history.push(job.clone());
        let _ = self.events.send(PrinterEvent::JobCompleted(job));
        if let Some(recipe) = recipe {
            let _ = self.events.send(PrinterEvent::RecipeDetected(recipe));
        }
        self.set_state(PrinterState::Idle);
    }

    /// Drop the partial job and report the fault
    fn fault(&mut self, message: String) {
        if !self.buffer.is_empty() {
            warn!(bytes = self.buffer.len(), "Discarding partial print stream");
        }
        self.buffer.clear();
        self.deadline = None;
        self.set_state(PrinterState::Error);
        warn!(%message, "Virtual printer fault");
        let _ = self
            .events
            .send(PrinterEvent::HardwareError(HardwareError::connection_fault(message)));
    }
}
