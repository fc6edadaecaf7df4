//! Control surface facade.
//!
//! Everything the HTTP adapter can do goes through [`ControlApi`]: device
//! configuration, point CRUD, simulation settings and the activity log. Each
//! mutation is recorded in the log, newest first, capped at
//! [`ACTIVITY_LOG_CAPACITY`] entries.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

use crate::object::store::Result;
use crate::object::{
    AnalogInput, AnalogInputPatch, BinaryInput, BinaryInputPatch, Device, DevicePatch,
    NewAnalogInput, NewBinaryInput, PointStore,
};
use crate::simulation::{SimulationPatch, SimulationSettings};
use crate::transport::Announcer;
use crate::util::{is_valid_instance_number, RingBuffer};

pub const ACTIVITY_LOG_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogCategory {
    General,
    Device,
    Points,
    Simulation,
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogCategory::General => f.write_str("general"),
            LogCategory::Device => f.write_str("device"),
            LogCategory::Points => f.write_str("points"),
            LogCategory::Simulation => f.write_str("simulation"),
        }
    }
}

/// One activity log line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub category: LogCategory,
    pub message: String,
}

/// Points of both kinds, as listed by `GET /api/points`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsSnapshot {
    pub analog_inputs: Vec<AnalogInput>,
    pub binary_inputs: Vec<BinaryInput>,
}

/// Whole simulator state, as returned by `GET /api/device`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSnapshot {
    pub device: Device,
    pub analog_inputs: Vec<AnalogInput>,
    pub binary_inputs: Vec<BinaryInput>,
    pub simulation: SimulationSettings,
}

pub struct ControlApi {
    store: Arc<PointStore>,
    simulation: watch::Sender<SimulationSettings>,
    announcer: Option<Arc<dyn Announcer>>,
    activity: Mutex<RingBuffer<LogEntry>>,
}

impl fmt::Debug for ControlApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlApi")
            .field("store", &self.store)
            .field("simulation", &*self.simulation.borrow())
            .field("announcer", &self.announcer.is_some())
            .finish()
    }
}

impl ControlApi {
    pub fn new(store: Arc<PointStore>, simulation: watch::Sender<SimulationSettings>) -> Self {
        Self {
            store,
            simulation,
            announcer: None,
            activity: Mutex::new(RingBuffer::new(ACTIVITY_LOG_CAPACITY)),
        }
    }

    /// Announce through `announcer` whenever the device comes back online
    pub fn with_announcer(mut self, announcer: Arc<dyn Announcer>) -> Self {
        self.announcer = Some(announcer);
        self
    }

    pub fn store(&self) -> &Arc<PointStore> {
        &self.store
    }

    /// Receiver for the simulation driver
    pub fn subscribe_simulation(&self) -> watch::Receiver<SimulationSettings> {
        self.simulation.subscribe()
    }

    pub fn device(&self) -> Device {
        self.store.get_device()
    }

    pub fn snapshot(&self) -> DeviceSnapshot {
        DeviceSnapshot {
            device: self.store.get_device(),
            analog_inputs: self.store.list_analog_inputs(),
            binary_inputs: self.store.list_binary_inputs(),
            simulation: self.simulation(),
        }
    }

    pub fn update_device(&self, patch: DevicePatch) -> Device {
        let device = self.store.set_device(patch);
        if !is_valid_instance_number(device.id) {
            warn!("Device id {} is not a valid instance number", device.id);
            self.record(
                LogLevel::Warning,
                LogCategory::Device,
                format!(
                    "Device id {} is outside 0..=4194302, the device is unreachable over BACnet",
                    device.id
                ),
            );
        }
        self.record(
            LogLevel::Info,
            LogCategory::Device,
            format!("Device configuration updated: {} ({})", device.name, device.id),
        );
        device
    }

    /// Set the online flag, announcing the device when it comes online
    pub async fn set_online(&self, online: bool) -> bool {
        let came_online = self.store.set_online(online);
        let (level, state) = if online {
            (LogLevel::Success, "online")
        } else {
            (LogLevel::Warning, "offline")
        };
        self.record(level, LogCategory::Device, format!("Device is now {}", state));

        if came_online {
            if let Some(announcer) = &self.announcer {
                if let Err(err) = announcer.announce().await {
                    warn!("Announcement after going online failed: {}", err);
                    self.record(
                        LogLevel::Error,
                        LogCategory::Device,
                        format!("I-Am announcement failed: {}", err),
                    );
                }
            }
        }
        online
    }

    pub fn points(&self) -> PointsSnapshot {
        PointsSnapshot {
            analog_inputs: self.store.list_analog_inputs(),
            binary_inputs: self.store.list_binary_inputs(),
        }
    }

    pub fn add_analog_input(&self, spec: NewAnalogInput) -> Result<AnalogInput> {
        let input = self.store.add_analog_input(spec)?;
        self.record(
            LogLevel::Success,
            LogCategory::Points,
            format!("Analog input {} added as {}", input.name, input.identifier()),
        );
        Ok(input)
    }

    pub fn add_binary_input(&self, spec: NewBinaryInput) -> Result<BinaryInput> {
        let input = self.store.add_binary_input(spec)?;
        self.record(
            LogLevel::Success,
            LogCategory::Points,
            format!("Binary input {} added as {}", input.name, input.identifier()),
        );
        Ok(input)
    }

    pub fn update_analog_input(&self, id: &str, patch: AnalogInputPatch) -> Result<AnalogInput> {
        let input = self.store.update_analog_input(id, patch)?;
        self.record(
            LogLevel::Info,
            LogCategory::Points,
            format!("Analog input {} updated, present value {}", input.name, input.present_value),
        );
        Ok(input)
    }

    pub fn update_binary_input(&self, id: &str, patch: BinaryInputPatch) -> Result<BinaryInput> {
        let input = self.store.update_binary_input(id, patch)?;
        self.record(
            LogLevel::Info,
            LogCategory::Points,
            format!("Binary input {} updated, present value {}", input.name, input.present_value),
        );
        Ok(input)
    }

    pub fn delete_analog_input(&self, id: &str) -> Result<AnalogInput> {
        let input = self.store.delete_analog_input(id)?;
        self.record(
            LogLevel::Warning,
            LogCategory::Points,
            format!("Analog input {} deleted", input.name),
        );
        Ok(input)
    }

    pub fn delete_binary_input(&self, id: &str) -> Result<BinaryInput> {
        let input = self.store.delete_binary_input(id)?;
        self.record(
            LogLevel::Warning,
            LogCategory::Points,
            format!("Binary input {} deleted", input.name),
        );
        Ok(input)
    }

    pub fn simulation(&self) -> SimulationSettings {
        *self.simulation.borrow()
    }

    /// Merge a settings patch; the driver picks it up immediately
    pub fn update_simulation(&self, patch: SimulationPatch) -> SimulationSettings {
        self.simulation.send_modify(|settings| settings.apply(patch));
        let settings = self.simulation();

        let message = if settings.is_active() {
            format!("Simulation running every {} ms", settings.interval().as_millis())
        } else if settings.is_running {
            "Simulation running, auto-update off".to_string()
        } else {
            "Simulation stopped".to_string()
        };
        self.record(LogLevel::Info, LogCategory::Simulation, message);
        settings
    }

    /// Activity log, newest first
    pub fn logs(&self) -> Vec<LogEntry> {
        self.activity().newest_first()
    }

    pub fn clear_logs(&self) {
        self.activity().clear();
    }

    pub fn record(&self, level: LogLevel, category: LogCategory, message: impl Into<String>) {
        let message = message.into();
        info!("[{}] {}", category, message);
        self.activity().push(LogEntry {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            level,
            category,
            message,
        });
    }

    fn activity(&self) -> std::sync::MutexGuard<'_, RingBuffer<LogEntry>> {
        self.activity.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
