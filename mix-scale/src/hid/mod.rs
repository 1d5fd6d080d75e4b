//! USB-HID scale driver
//!
//! Discovery runs against the [`HidBackend`]. When no scale is attached the
//! driver stays `Disconnected` and retries discovery on a fixed period until a
//! device shows up or `stop()` is called. Reads block, so the read loop runs on
//! the blocking pool with a short timeout and checks its cancel token between
//! reports.

mod backend;
pub mod decoder;
pub mod devices;

pub use backend::{
    HidBackend, HidDeviceInfo, HidReportReader, UnavailableBackend, default_backend,
};
#[cfg(feature = "hid")]
pub use backend::HidApiBackend;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use shared::{HardwareError, ScaleConnectionState, ScaleEvent};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

use crate::driver::{ScaleConfig, ScaleDriver};
use crate::error::ScaleError;
use crate::events::ScaleEvents;
use decoder::decode_report;
use devices::find_compatible;

/// Blocking read timeout per report
const READ_TIMEOUT_MS: i32 = 250;

/// Max input report size for weighing devices
const REPORT_BUF_LEN: usize = 64;

enum Attach {
    Attached,
    NoDevice,
    Unavailable,
    /// another discovery attempt holds the slot
    Busy,
}

#[derive(Default)]
struct HidState {
    connection: ScaleConnectionState,
    current_weight: f64,
    target_weight: f64,
    running: bool,
    brand: Option<String>,
    reader: Option<CancellationToken>,
    attaching: bool,
    hotplug: Option<CancellationToken>,
    epoch: u64,
}

struct HidInner {
    backend: Arc<dyn HidBackend>,
    events: ScaleEvents,
    hotplug_interval: Duration,
    state: Mutex<HidState>,
    /// bumped each time a discovery attempt releases the slot
    attach_done: watch::Sender<u64>,
}

/// Scale driver for USB-HID weighing devices
pub struct HidScaleDriver {
    inner: Arc<HidInner>,
}

impl HidScaleDriver {
    pub fn new(backend: Arc<dyn HidBackend>) -> Self {
        Self {
            inner: Arc::new(HidInner {
                backend,
                events: ScaleEvents::new(),
                hotplug_interval: ScaleConfig::HOTPLUG_INTERVAL,
                state: Mutex::new(HidState::default()),
                attach_done: watch::Sender::new(0),
            }),
        }
    }

    /// Override the hot-plug discovery period (default 3 s)
    pub fn with_hotplug_interval(mut self, interval: Duration) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.hotplug_interval = interval;
        }
        self
    }

    /// Brand of the attached device, if any
    pub fn brand(&self) -> Option<String> {
        self.inner.state.lock().brand.clone()
    }

    /// Whether a hot-plug discovery loop is armed
    pub fn is_watching(&self) -> bool {
        self.inner.state.lock().hotplug.is_some()
    }
}

impl HidInner {
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

    /// Discover and open a scale. Blocking; call from the blocking pool.
    ///
    /// Only one attempt runs at a time; a concurrent caller gets
    /// [`Attach::Busy`]. Hot-plug probes pass `announce = false` so a missing
    /// device does not flap the connection state every period.
    fn attach(self: &Arc<Self>, handle: &Handle, announce: bool) -> Attach {
        let epoch = {
            let mut st = self.state.lock();
            if st.reader.is_some() {
                return Attach::Attached;
            }
            if st.attaching {
                return Attach::Busy;
            }
            st.attaching = true;
            st.epoch
        };

        let outcome = self.try_attach(handle, announce, epoch);

        self.state.lock().attaching = false;
        self.attach_done.send_modify(|n| *n = n.wrapping_add(1));
        outcome
    }

    fn try_attach(self: &Arc<Self>, handle: &Handle, announce: bool, epoch: u64) -> Attach {
        if announce {
            self.set_state(ScaleConnectionState::Connecting);
        }

        let devices = match self.backend.enumerate() {
            Ok(devices) => devices,
            Err(ScaleError::BackendUnavailable(reason)) => {
                self.set_state(ScaleConnectionState::Disconnected);
                self.events.hardware_error(HardwareError::device_unavailable(format!(
                    "HID support unavailable ({reason}); use the serial scale driver instead"
                )));
                return Attach::Unavailable;
            }
            Err(e) => {
                tracing::warn!(error = %e, "HID enumeration failed");
                self.set_state(ScaleConnectionState::Disconnected);
                return Attach::NoDevice;
            }
        };

        let Some((device, brand)) = find_compatible(&devices) else {
            tracing::trace!(count = devices.len(), "No compatible HID scale attached");
            self.set_state(ScaleConnectionState::Disconnected);
            return Attach::NoDevice;
        };

        let reader = match self.backend.open(device) {
            Ok(reader) => reader,
            Err(e) => {
                self.set_state(ScaleConnectionState::Disconnected);
                if announce {
                    self.events.hardware_error(HardwareError::device_unavailable(format!(
                        "cannot open {brand} scale: {e}"
                    )));
                } else {
                    tracing::debug!(brand = %brand, error = %e, "HID scale not ready yet");
                }
                return Attach::NoDevice;
            }
        };

        let token = CancellationToken::new();
        {
            let mut st = self.state.lock();
            if st.epoch != epoch {
                tracing::debug!("HID attach finished after stop, closing device");
                drop(st);
                self.set_state(ScaleConnectionState::Disconnected);
                return Attach::NoDevice;
            }
            if st.reader.is_some() {
                tracing::debug!("HID scale already attached, closing extra handle");
                return Attach::Attached;
            }
            st.reader = Some(token.clone());
            st.brand = Some(brand.clone());
        }
        tracing::info!(
            brand = %brand,
            vendor_id = %format!("{:#06x}", device.vendor_id),
            product_id = %format!("{:#06x}", device.product_id),
            "HID scale connected"
        );
        self.set_state(ScaleConnectionState::Connected);

        let inner = self.clone();
        let loop_handle = handle.clone();
        handle.spawn_blocking(move || inner.read_loop(reader, token, loop_handle));
        Attach::Attached
    }

    fn read_loop(
        self: Arc<Self>,
        mut reader: Box<dyn HidReportReader>,
        token: CancellationToken,
        handle: Handle,
    ) {
        let mut buf = [0u8; REPORT_BUF_LEN];
        while !token.is_cancelled() {
            match reader.read_report(&mut buf, READ_TIMEOUT_MS) {
                Ok(0) => continue,
                Ok(n) => {
                    if let Some(reading) = decode_report(&buf[..n]) {
                        self.state.lock().current_weight = reading.weight_grams;
                        self.events.weight(reading.weight_grams, reading.stable);
                    }
                }
                Err(e) => {
                    self.on_fault(&token, &e.to_string(), &handle);
                    break;
                }
            }
        }
        tracing::debug!("HID read loop finished");
    }

    fn on_fault(self: &Arc<Self>, token: &CancellationToken, message: &str, handle: &Handle) {
        let running = {
            let mut st = self.state.lock();
            if token.is_cancelled() {
                return;
            }
            token.cancel();
            st.reader = None;
            st.brand = None;
            st.running
        };
        self.set_state(ScaleConnectionState::Disconnected);
        self.events.hardware_error(HardwareError::connection_fault(format!(
            "HID scale read failed: {message}"
        )));
        if running {
            self.arm_hotplug(handle);
        }
    }

    async fn connect(self: &Arc<Self>) -> bool {
        let inner = self.clone();
        let handle = Handle::current();
        let probe_handle = handle.clone();
        let outcome = tokio::task::spawn_blocking(move || inner.attach(&probe_handle, true)).await;

        match outcome {
            // an armed hot-plug loop sees the reader and exits on its own
            Ok(Attach::Attached) => true,
            Ok(Attach::NoDevice) => {
                self.arm_hotplug(&handle);
                false
            }
            Ok(Attach::Unavailable) => false,
            Ok(Attach::Busy) => self.wait_for_attach().await,
            Err(e) => {
                tracing::error!(error = %e, "HID discovery task failed");
                false
            }
        }
    }

    /// Wait for the in-flight discovery attempt and report whether it attached
    async fn wait_for_attach(&self) -> bool {
        let mut done = self.attach_done.subscribe();
        loop {
            {
                let st = self.state.lock();
                if !st.attaching {
                    return st.reader.is_some();
                }
            }
            if done.changed().await.is_err() {
                return false;
            }
        }
    }

    /// Start the discovery loop unless one is already running
    fn arm_hotplug(self: &Arc<Self>, handle: &Handle) {
        let token = {
            let mut st = self.state.lock();
            if st.hotplug.is_some() || st.reader.is_some() {
                return;
            }
            let token = CancellationToken::new();
            st.hotplug = Some(token.clone());
            token
        };
        tracing::info!(
            interval_ms = self.hotplug_interval.as_millis() as u64,
            "Watching for HID scale"
        );

        let inner = self.clone();
        handle.spawn(async move {
            let mut ticker = tokio::time::interval(inner.hotplug_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return,
                    _ = ticker.tick() => {}
                }

                let probe = inner.clone();
                let handle = Handle::current();
                match tokio::task::spawn_blocking(move || probe.attach(&handle, false)).await {
                    Ok(Attach::Attached) => {
                        tracing::info!("HID scale attached");
                        break;
                    }
                    Ok(Attach::NoDevice | Attach::Busy) => {}
                    Ok(Attach::Unavailable) => break,
                    Err(e) => {
                        tracing::error!(error = %e, "HID discovery task failed");
                        break;
                    }
                }
            }

            if !token.is_cancelled() {
                inner.state.lock().hotplug = None;
            }
        });
    }
}

#[async_trait]
impl ScaleDriver for HidScaleDriver {
    fn name(&self) -> &'static str {
        "hid"
    }

    async fn connect(&self) -> bool {
        self.inner.connect().await
    }

    async fn start(&self, target_weight: f64) {
        {
            let mut st = self.inner.state.lock();
            st.target_weight = target_weight;
            st.running = true;
        }
        tracing::info!(target_weight, "Starting HID scale");
        if !self.inner.connect().await {
            tracing::debug!("HID scale not attached yet");
        }
    }

    async fn stop(&self) {
        {
            let mut st = self.inner.state.lock();
            st.running = false;
            st.epoch += 1;
            st.brand = None;
            if let Some(token) = st.reader.take() {
                token.cancel();
            }
            if let Some(token) = st.hotplug.take() {
                token.cancel();
            }
        }
        self.inner.set_state(ScaleConnectionState::Disconnected);
        tracing::info!("HID scale stopped");
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
