//! Analog Input records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ObjectIdentifier, ObjectType, PointId, Reliability, StatusFlags};

pub const DEFAULT_UNITS: &str = "degrees-celsius";
pub const DEFAULT_MIN_VALUE: f32 = 0.0;
pub const DEFAULT_MAX_VALUE: f32 = 100.0;
pub const DEFAULT_RESOLUTION: f32 = 0.1;

/// Analog Input object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalogInput {
    pub id: PointId,
    /// Instance number, unique among analog inputs and never reused
    pub object_id: u32,
    pub name: String,
    pub description: String,
    pub present_value: f32,
    /// Engineering unit name such as `degrees-celsius`
    pub units: String,
    pub min_value: f32,
    pub max_value: f32,
    pub resolution: f32,
    pub out_of_service: bool,
    pub reliability: Reliability,
    pub last_update: DateTime<Utc>,
}

impl AnalogInput {
    pub(crate) fn new(id: PointId, object_id: u32, spec: NewAnalogInput) -> Self {
        let min_value = spec.min_value.unwrap_or(DEFAULT_MIN_VALUE);
        let max_value = spec.max_value.unwrap_or(DEFAULT_MAX_VALUE);
        let present_value = clamp_to_range(spec.present_value.unwrap_or(0.0), min_value, max_value);

        Self {
            id,
            object_id,
            name: spec.name.unwrap_or_else(|| format!("AI_{}", object_id)),
            description: spec.description.unwrap_or_default(),
            present_value,
            units: spec.units.unwrap_or_else(|| DEFAULT_UNITS.to_string()),
            min_value,
            max_value,
            resolution: spec.resolution.unwrap_or(DEFAULT_RESOLUTION),
            out_of_service: false,
            reliability: Reliability::NoFaultDetected,
            last_update: Utc::now(),
        }
    }

    pub fn identifier(&self) -> ObjectIdentifier {
        ObjectIdentifier::new(ObjectType::AnalogInput, self.object_id)
    }

    pub fn status_flags(&self) -> StatusFlags {
        StatusFlags::from_point(self.out_of_service, self.reliability)
    }

    pub fn is_within_bounds(&self) -> bool {
        self.present_value >= self.min_value && self.present_value <= self.max_value
    }

    /// Merge the fields present in `patch` and re-stamp; the present value is
    /// stored as given
    pub(crate) fn apply(&mut self, patch: AnalogInputPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(present_value) = patch.present_value {
            self.present_value = present_value;
        }
        if let Some(units) = patch.units {
            self.units = units;
        }
        if let Some(min_value) = patch.min_value {
            self.min_value = min_value;
        }
        if let Some(max_value) = patch.max_value {
            self.max_value = max_value;
        }
        if let Some(resolution) = patch.resolution {
            self.resolution = resolution;
        }
        if let Some(out_of_service) = patch.out_of_service {
            self.out_of_service = out_of_service;
        }
        if let Some(reliability) = patch.reliability {
            self.reliability = reliability;
        }
        self.last_update = Utc::now();
    }
}

/// Clamp without panicking on inverted bounds; `min` wins when `min > max`
pub fn clamp_to_range(value: f32, min: f32, max: f32) -> f32 {
    value.min(max).max(min)
}

/// Creation request for an analog input, every field optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAnalogInput {
    /// Client supplied handle, generated when absent
    pub id: Option<PointId>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub present_value: Option<f32>,
    pub units: Option<String>,
    pub min_value: Option<f32>,
    pub max_value: Option<f32>,
    pub resolution: Option<f32>,
}

/// Sparse update of an analog input
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalogInputPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub present_value: Option<f32>,
    pub units: Option<String>,
    pub min_value: Option<f32>,
    pub max_value: Option<f32>,
    pub resolution: Option<f32>,
    pub out_of_service: Option<bool>,
    pub reliability: Option<Reliability>,
}
