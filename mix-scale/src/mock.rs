//! Simulated scale
//!
//! Ramps toward the target weight on a fixed tick so consumers can be
//! exercised without hardware.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use shared::util::round_tenth;
use shared::{ScaleConnectionState, ScaleEvent};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::driver::ScaleDriver;
use crate::events::ScaleEvents;

/// Ramp tick period
pub const MOCK_TICK: Duration = Duration::from_millis(200);

/// Fraction of the target added per tick
const STEP_RATIO: f64 = 0.1;

/// Smallest step in grams
const MIN_STEP: f64 = 0.5;

#[derive(Default)]
struct MockState {
    connection: ScaleConnectionState,
    current_weight: f64,
    target_weight: f64,
    ticker: Option<CancellationToken>,
}

struct MockInner {
    events: ScaleEvents,
    tick: Duration,
    state: Mutex<MockState>,
}

/// Scale driver that simulates a ramping load
pub struct MockScaleDriver {
    inner: Arc<MockInner>,
}

impl Default for MockScaleDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockScaleDriver {
    pub fn new() -> Self {
        Self::with_tick(MOCK_TICK)
    }

    pub fn with_tick(tick: Duration) -> Self {
        Self {
            inner: Arc::new(MockInner {
                events: ScaleEvents::new(),
                tick,
                state: Mutex::new(MockState::default()),
            }),
        }
    }
}

/// Next weight on the ramp and whether it settled
fn next_weight(current: f64, target: f64) -> (f64, bool) {
    let step = (target.abs() * STEP_RATIO).max(MIN_STEP);
    let next = if (target - current).abs() <= step {
        target
    } else if target > current {
        current + step
    } else {
        current - step
    };
    let next = round_tenth(next);
    (next, next == round_tenth(target))
}

impl MockInner {
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

    fn tick(&self) {
        let (weight, stable) = {
            let mut st = self.state.lock();
            let (weight, stable) = next_weight(st.current_weight, st.target_weight);
            st.current_weight = weight;
            (weight, stable)
        };
        self.events.weight(weight, stable);
    }
}

#[async_trait]
impl ScaleDriver for MockScaleDriver {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn connect(&self) -> bool {
        self.inner.set_state(ScaleConnectionState::Connected);
        true
    }

    async fn start(&self, target_weight: f64) {
        self.connect().await;

        let token = CancellationToken::new();
        let previous = {
            let mut st = self.inner.state.lock();
            st.target_weight = target_weight;
            st.ticker.replace(token.clone())
        };
        if let Some(previous) = previous {
            previous.cancel();
        }
        tracing::info!(target_weight, "Starting mock scale");

        let inner = self.inner.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(inner.tick);
            ticker.tick().await;
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => inner.tick(),
                }
            }
        });
    }

    async fn stop(&self) {
        if let Some(token) = self.inner.state.lock().ticker.take() {
            token.cancel();
        }
        self.inner.set_state(ScaleConnectionState::Disconnected);
        tracing::info!("Mock scale stopped");
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
