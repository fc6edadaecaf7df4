//! Binary Input records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ObjectIdentifier, ObjectType, PointId, Reliability, StatusFlags};

/// Binary present value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u32)]
pub enum BinaryPV {
    #[default]
    Inactive = 0,
    Active = 1,
}

impl BinaryPV {
    /// Protocol write mapping: 1 is active, anything else inactive
    pub fn from_raw(value: u32) -> Self {
        if value == 1 {
            BinaryPV::Active
        } else {
            BinaryPV::Inactive
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            BinaryPV::Active => BinaryPV::Inactive,
            BinaryPV::Inactive => BinaryPV::Active,
        }
    }
}

impl std::fmt::Display for BinaryPV {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinaryPV::Active => f.write_str("active"),
            BinaryPV::Inactive => f.write_str("inactive"),
        }
    }
}

impl From<bool> for BinaryPV {
    fn from(value: bool) -> Self {
        if value {
            BinaryPV::Active
        } else {
            BinaryPV::Inactive
        }
    }
}

impl From<BinaryPV> for bool {
    fn from(value: BinaryPV) -> Self {
        value == BinaryPV::Active
    }
}

/// Polarity enumeration, display semantics only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u32)]
pub enum Polarity {
    #[default]
    Normal = 0,
    Reverse = 1,
}

/// Binary Input object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryInput {
    pub id: PointId,
    /// Instance number, independent of the analog sequence
    pub object_id: u32,
    pub name: String,
    pub description: String,
    pub present_value: BinaryPV,
    pub polarity: Polarity,
    pub out_of_service: bool,
    pub reliability: Reliability,
    pub last_update: DateTime<Utc>,
}

impl BinaryInput {
    pub(crate) fn new(id: PointId, object_id: u32, spec: NewBinaryInput) -> Self {
        Self {
            id,
            object_id,
            name: spec.name.unwrap_or_else(|| format!("BI_{}", object_id)),
            description: spec.description.unwrap_or_default(),
            present_value: spec.present_value.unwrap_or_default(),
            polarity: spec.polarity.unwrap_or_default(),
            out_of_service: false,
            reliability: Reliability::NoFaultDetected,
            last_update: Utc::now(),
        }
    }

    pub fn identifier(&self) -> ObjectIdentifier {
        ObjectIdentifier::new(ObjectType::BinaryInput, self.object_id)
    }

    pub fn status_flags(&self) -> StatusFlags {
        StatusFlags::from_point(self.out_of_service, self.reliability)
    }

    pub(crate) fn apply(&mut self, patch: BinaryInputPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(present_value) = patch.present_value {
            self.present_value = present_value;
        }
        if let Some(polarity) = patch.polarity {
            self.polarity = polarity;
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

/// Creation request for a binary input, every field optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBinaryInput {
    pub id: Option<PointId>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub present_value: Option<BinaryPV>,
    pub polarity: Option<Polarity>,
}

/// Sparse update of a binary input
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryInputPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub present_value: Option<BinaryPV>,
    pub polarity: Option<Polarity>,
    pub out_of_service: Option<bool>,
    pub reliability: Option<Reliability>,
}
