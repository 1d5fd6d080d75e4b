//! Event publishing shared by every driver variant

use shared::{HardwareError, ScaleConnectionState, ScaleEvent, WeightSample};
use tokio::sync::broadcast;

/// Capacity of each driver's event channel
const EVENT_CAPACITY: usize = 256;

/// Broadcast sink for one driver instance
#[derive(Debug, Clone)]
pub(crate) struct ScaleEvents {
    tx: broadcast::Sender<ScaleEvent>,
}

impl ScaleEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ScaleEvent> {
        self.tx.subscribe()
    }

    pub fn weight(&self, weight_grams: f64, stable: bool) {
        self.emit(ScaleEvent::Weight(WeightSample::new(weight_grams, stable)));
    }

    pub fn state(&self, state: ScaleConnectionState) {
        self.emit(ScaleEvent::StateChanged(state));
    }

    pub fn hardware_error(&self, error: HardwareError) {
        tracing::warn!(kind = %error.kind, "{}", error.message);
        self.emit(ScaleEvent::HardwareError(error));
    }

    fn emit(&self, event: ScaleEvent) {
        // No subscribers is not an error
        let _ = self.tx.send(event);
    }
}
