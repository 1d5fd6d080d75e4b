//! RS-232 scale driver
//!
//! One session per open port: a reader task framing lines on CR/LF and, in
//! SICS mode, a poller writing `SI` on a fixed period. Both are tied to the
//! session's cancel token. Concurrent `connect()` calls share one attempt.

mod codec;
pub mod decoder;
mod port;

pub use codec::{MAX_LINE_LEN, ScaleLineCodec};
pub use port::{SerialLink, SerialOpener, SerialSettings, TokioSerialOpener};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use shared::{HardwareError, ScaleConnectionState, ScaleEvent};
use tokio::io::{AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::broadcast;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;

use crate::driver::{ScaleConfig, ScaleDriver, SerialProtocol};
use crate::events::ScaleEvents;
use decoder::decode_line;

/// MT-SICS "send immediate weight" command
pub const SICS_WEIGHT_IMMEDIATE: &[u8] = b"SI\r\n";

type PendingConnect = Shared<BoxFuture<'static, bool>>;
type LinkWriter = Arc<tokio::sync::Mutex<WriteHalf<Box<dyn SerialLink>>>>;

struct Session {
    cancel: CancellationToken,
    writer: LinkWriter,
    polling: bool,
}

#[derive(Default)]
struct SerialState {
    connection: ScaleConnectionState,
    current_weight: f64,
    target_weight: f64,
    pending: Option<PendingConnect>,
    session: Option<Session>,
    epoch: u64,
}

struct SerialInner {
    settings: SerialSettings,
    protocol: SerialProtocol,
    poll_interval: Duration,
    opener: Arc<dyn SerialOpener>,
    events: ScaleEvents,
    state: Mutex<SerialState>,
}

/// Scale driver for MT-SICS and Toledo-continuous serial scales
pub struct SerialScaleDriver {
    inner: Arc<SerialInner>,
}

impl SerialScaleDriver {
    pub fn new(
        settings: SerialSettings,
        protocol: SerialProtocol,
        opener: Arc<dyn SerialOpener>,
    ) -> Self {
        Self {
            inner: Arc::new(SerialInner {
                settings,
                protocol,
                poll_interval: ScaleConfig::POLL_INTERVAL,
                opener,
                events: ScaleEvents::new(),
                state: Mutex::new(SerialState::default()),
            }),
        }
    }

    /// Override the SICS poll period (default 200 ms)
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.poll_interval = interval;
        }
        self
    }

    pub fn settings(&self) -> &SerialSettings {
        &self.inner.settings
    }

    /// Serial ports present on this machine. Empty on failure.
    pub fn list_ports(&self) -> Vec<String> {
        self.inner.opener.list_ports().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to list serial ports");
            Vec::new()
        })
    }

    /// Whether a connect attempt is in flight
    pub fn is_connecting(&self) -> bool {
        self.inner.state.lock().pending.is_some()
    }
}

impl SerialInner {
    fn set_state(&self, next: ScaleConnectionState) {
        let changed = {
            let mut st = self.state.lock();
            let changed = st.connection != next;
            st.connection = next;
            changed
        };
        if changed {
            self.events.state(next);
        }
    }

    /// Join the in-flight attempt or begin a new one
    fn connect_attempt(self: &Arc<Self>) -> Option<PendingConnect> {
        let mut st = self.state.lock();
        if st.session.is_some() {
            return None;
        }
        if let Some(pending) = &st.pending {
            tracing::debug!(port = %self.settings.port, "Joining in-flight connect");
            return Some(pending.clone());
        }

        let inner = self.clone();
        let epoch = st.epoch;
        let attempt = async move { inner.open_session(epoch).await }
            .boxed()
            .shared();
        st.pending = Some(attempt.clone());
        Some(attempt)
    }

    async fn connect(self: &Arc<Self>) -> bool {
        match self.connect_attempt() {
            Some(attempt) => attempt.await,
            None => true,
        }
    }

    #[tracing::instrument(
        skip(self),
        fields(port = %self.settings.port, baud = self.settings.baud_rate)
    )]
    async fn open_session(self: Arc<Self>, epoch: u64) -> bool {
        self.set_state(ScaleConnectionState::Connecting);
        self.close_session();

        let result = self.opener.open(&self.settings).await;

        let mut st = self.state.lock();
        if st.epoch != epoch {
            drop(st);
            // stop() ran while the port was opening; the link drops here
            tracing::debug!("Connect resolved after stop, closing port");
            return false;
        }
        st.pending = None;

        match result {
            Ok(link) => {
                st.session = Some(self.spawn_session(link));
                drop(st);
                self.set_state(ScaleConnectionState::Connected);
                tracing::info!(protocol = %self.protocol, "Serial scale connected");
                true
            }
            Err(e) => {
                drop(st);
                self.set_state(ScaleConnectionState::Disconnected);
                self.events.hardware_error(HardwareError::device_unavailable(format!(
                    "cannot open serial port {}: {e}",
                    self.settings.port
                )));
                false
            }
        }
    }

    fn spawn_session(self: &Arc<Self>, link: Box<dyn SerialLink>) -> Session {
        let (reader, writer) = tokio::io::split(link);
        let cancel = CancellationToken::new();
        tokio::spawn(self.clone().read_loop(reader, cancel.clone()));

        let mut session = Session {
            cancel,
            writer: Arc::new(tokio::sync::Mutex::new(writer)),
            polling: false,
        };
        if self.protocol == SerialProtocol::SicsPolling {
            self.spawn_poller(&mut session);
        }
        session
    }

    fn close_session(&self) {
        if let Some(session) = self.state.lock().session.take() {
            tracing::debug!("Closing previous serial session");
            session.cancel.cancel();
        }
    }

    async fn read_loop(
        self: Arc<Self>,
        reader: ReadHalf<Box<dyn SerialLink>>,
        cancel: CancellationToken,
    ) {
        let mut lines = FramedRead::new(reader, ScaleLineCodec::new());

        loop {
            let frame = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                frame = lines.next() => frame,
            };

            match frame {
                Some(Ok(bytes)) => self.handle_line(&bytes),
                Some(Err(e)) => {
                    self.on_fault(&cancel, &format!("serial read failed: {e}"));
                    break;
                }
                None => {
                    self.on_fault(&cancel, "serial port closed");
                    break;
                }
            }
        }
        tracing::debug!("Serial read loop finished");
    }

    fn handle_line(&self, bytes: &[u8]) {
        let text = String::from_utf8_lossy(bytes);
        let line = text.trim();
        if line.is_empty() {
            return;
        }

        match decode_line(line) {
            Some(reading) => {
                self.state.lock().current_weight = reading.weight_grams;
                self.events.weight(reading.weight_grams, reading.stable);
            }
            None => tracing::trace!(line, "No decoder matched serial line"),
        }
    }

    fn spawn_poller(self: &Arc<Self>, session: &mut Session) {
        if session.polling {
            return;
        }
        session.polling = true;

        let inner = self.clone();
        let cancel = session.cancel.clone();
        let writer = session.writer.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(inner.poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let result = {
                    let mut writer = writer.lock().await;
                    match writer.write_all(SICS_WEIGHT_IMMEDIATE).await {
                        Ok(()) => writer.flush().await,
                        Err(e) => Err(e),
                    }
                };
                if let Err(e) = result {
                    inner.on_fault(&cancel, &format!("serial write failed: {e}"));
                    break;
                }
            }
            tracing::debug!("SICS poller finished");
        });
    }

    /// Tear down the current session after an I/O failure
    fn on_fault(&self, cancel: &CancellationToken, message: &str) {
        {
            let mut st = self.state.lock();
            // a cancelled token means the session was closed on purpose
            if cancel.is_cancelled() {
                return;
            }
            cancel.cancel();
            st.session = None;
        }
        self.set_state(ScaleConnectionState::Disconnected);
        self.events
            .hardware_error(HardwareError::connection_fault(message));
    }
}

#[async_trait]
impl ScaleDriver for SerialScaleDriver {
    fn name(&self) -> &'static str {
        "serial"
    }

    async fn connect(&self) -> bool {
        self.inner.connect().await
    }

    async fn start(&self, target_weight: f64) {
        self.inner.state.lock().target_weight = target_weight;
        tracing::info!(
            target_weight,
            port = %self.inner.settings.port,
            protocol = %self.inner.protocol,
            "Starting serial scale"
        );

        if !self.inner.connect().await {
            return;
        }

        if self.inner.protocol == SerialProtocol::SicsPolling {
            let mut st = self.inner.state.lock();
            if let Some(session) = st.session.as_mut() {
                self.inner.spawn_poller(session);
            }
        }
    }

    async fn stop(&self) {
        {
            let mut st = self.inner.state.lock();
            st.epoch += 1;
            st.pending = None;
            if let Some(session) = st.session.take() {
                session.cancel.cancel();
            }
        }
        self.inner.set_state(ScaleConnectionState::Disconnected);
        tracing::info!(port = %self.inner.settings.port, "Serial scale stopped");
    }

    fn current_weight(&self) -> f64 {
        self.inner.state.lock().current_weight
    }

    fn target_weight(&self) -> f64 {
        self.inner.state.lock().target_weight
    }

    fn connection_state(&self) -> ScaleConnectionState {
        self.inner.state.lock().connection
    }

    fn subscribe(&self) -> broadcast::Receiver<ScaleEvent> {
        self.inner.events.subscribe()
    }
}
