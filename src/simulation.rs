//! Value drift for the simulated points.
//!
//! While the simulation is running with auto-update on, every interval each
//! in-service analog input wanders by up to one unit inside its bounds and
//! each in-service binary input has a one in ten chance to toggle. A whole
//! pass runs under the store's write lock.

use std::cell::RefCell;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::object::analog::clamp_to_range;
use crate::object::store::SimulationPass;
use crate::object::{AnalogInput, PointStore};

pub const DEFAULT_INTERVAL_MS: u64 = 1000;

/// Shortest interval the driver will tick at
pub const MIN_INTERVAL_MS: u64 = 100;

/// Chance that a binary input toggles in one pass
pub const TOGGLE_PROBABILITY: f64 = 0.1;

/// Largest step an analog input takes in one pass, in either direction
pub const MAX_DRIFT: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimulationSettings {
    pub is_running: bool,
    #[serde(rename = "interval", alias = "intervalMs")]
    pub interval_ms: u64,
    pub auto_update: bool,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            is_running: false,
            interval_ms: DEFAULT_INTERVAL_MS,
            auto_update: false,
        }
    }
}

impl SimulationSettings {
    /// Values only drift when running with auto-update on
    pub fn is_active(&self) -> bool {
        self.is_running && self.auto_update
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(MIN_INTERVAL_MS))
    }

    pub fn apply(&mut self, patch: SimulationPatch) {
        if let Some(is_running) = patch.is_running {
            self.is_running = is_running;
        }
        if let Some(interval_ms) = patch.interval_ms {
            self.interval_ms = interval_ms;
        }
        if let Some(auto_update) = patch.auto_update {
            self.auto_update = auto_update;
        }
    }
}

/// Sparse update of the simulation settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationPatch {
    pub is_running: Option<bool>,
    #[serde(rename = "interval", alias = "intervalMs")]
    pub interval_ms: Option<u64>,
    pub auto_update: Option<bool>,
}

pub fn round_to_hundredths(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

/// Next present value of `input` after moving it by `delta`
pub fn drift_analog(input: &AnalogInput, delta: f32) -> f32 {
    round_to_hundredths(clamp_to_range(
        input.present_value + delta,
        input.min_value,
        input.max_value,
    ))
}

/// Run one drift pass over the store
pub fn step<R: Rng>(store: &PointStore, rng: &mut R) -> SimulationPass {
    let rng = RefCell::new(rng);
    store.apply_simulation_step(
        |input| drift_analog(input, rng.borrow_mut().gen_range(-MAX_DRIFT..=MAX_DRIFT)),
        |_| rng.borrow_mut().gen_bool(TOGGLE_PROBABILITY),
    )
}

/// Background task applying [`step`] on the configured interval
#[derive(Debug)]
pub struct SimulationDriver {
    store: Arc<PointStore>,
    settings: watch::Receiver<SimulationSettings>,
}

impl SimulationDriver {
    pub fn new(store: Arc<PointStore>, settings: watch::Receiver<SimulationSettings>) -> Self {
        Self { store, settings }
    }

    /// Drive the simulation until `shutdown` flips or the settings sender
    /// is dropped
    ///
    /// The ticker is rebuilt on every settings change, so a new interval or
    /// a stop takes effect right away.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut rng = StdRng::from_entropy();

        loop {
            let settings = *self.settings.borrow_and_update();

            if !settings.is_active() {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    changed = self.settings.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
                continue;
            }

            let period = settings.interval();
            info!("Simulation running every {:?}", period);
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = shutdown.changed() => return,
                    changed = self.settings.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        break;
                    }
                    _ = ticker.tick() => {
                        let pass = step(&self.store, &mut rng);
                        debug!(
                            "Simulation pass: {} analog updated, {} binary toggled",
                            pass.analog_updated, pass.binary_toggled
                        );
                    }
                }
            }
        }
        debug!("Simulation driver stopped");
    }
}
