//! Point store.
//!
//! Authoritative in-memory registry of the device object and its analog and
//! binary inputs. All state lives behind one `RwLock`: reads run concurrently,
//! every mutation (including a whole simulation pass) is a single exclusive
//! critical section. Callers only ever receive clones.
//!
//! Instance numbers come from per-type counters that only move forward, so a
//! deleted point's instance is never handed out again.

use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use log::debug;
use thiserror::Error;
use uuid::Uuid;

use super::analog::clamp_to_range;
use super::{
    AnalogInput, AnalogInputPatch, BinaryInput, BinaryInputPatch, BinaryPV, Device, DevicePatch,
    NewAnalogInput, NewBinaryInput, ObjectIdentifier, ObjectType, PointId,
};
use crate::util::is_valid_instance_number;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Which point sequence an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointKind {
    Analog,
    Binary,
}

impl fmt::Display for PointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointKind::Analog => f.write_str("Analog input"),
            PointKind::Binary => f.write_str("Binary input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("{kind} not found")]
    NotFound { kind: PointKind, id: PointId },
    #[error("{kind} with id {id} already exists")]
    DuplicateId { kind: PointKind, id: PointId },
    #[error("object {0} does not exist")]
    UnknownInstance(ObjectIdentifier),
    #[error("object {0} is out of service")]
    OutOfService(ObjectIdentifier),
    #[error("no instance numbers left for {0}")]
    InstancesExhausted(PointKind),
}

/// Result of a present value write on an analog input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalogWrite {
    pub stored: f32,
    /// Whether the requested value was inside `[min, max]`
    pub in_range: bool,
}

/// Counts of points changed by one simulation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulationPass {
    pub analog_updated: usize,
    pub binary_toggled: usize,
}

#[derive(Debug)]
struct StoreState {
    device: Device,
    analog_inputs: Vec<AnalogInput>,
    binary_inputs: Vec<BinaryInput>,
    next_analog: u32,
    next_binary: u32,
    /// Bumped whenever an object is added or removed
    revision: u32,
}

impl StoreState {
    fn analog_mut(&mut self, instance: u32) -> Result<&mut AnalogInput> {
        self.analog_inputs
            .iter_mut()
            .find(|ai| ai.object_id == instance)
            .ok_or(StoreError::UnknownInstance(ObjectIdentifier::new(
                ObjectType::AnalogInput,
                instance,
            )))
    }

    fn binary_mut(&mut self, instance: u32) -> Result<&mut BinaryInput> {
        self.binary_inputs
            .iter_mut()
            .find(|bi| bi.object_id == instance)
            .ok_or(StoreError::UnknownInstance(ObjectIdentifier::new(
                ObjectType::BinaryInput,
                instance,
            )))
    }

    fn id_taken(&self, kind: PointKind, id: &str) -> bool {
        match kind {
            PointKind::Analog => self.analog_inputs.iter().any(|ai| ai.id == id),
            PointKind::Binary => self.binary_inputs.iter().any(|bi| bi.id == id),
        }
    }

    fn allocate_id(&self, kind: PointKind, requested: Option<PointId>) -> Result<PointId> {
        match requested {
            Some(id) if self.id_taken(kind, &id) => Err(StoreError::DuplicateId { kind, id }),
            Some(id) => Ok(id),
            None => {
                let prefix = match kind {
                    PointKind::Analog => "ai",
                    PointKind::Binary => "bi",
                };
                Ok(format!("{}_{}", prefix, Uuid::new_v4().simple()))
            }
        }
    }
}

/// Thread-safe registry of the device and its points
#[derive(Debug)]
pub struct PointStore {
    state: RwLock<StoreState>,
}

impl Default for PointStore {
    fn default() -> Self {
        Self::new(Device::default())
    }
}

impl PointStore {
    pub fn new(device: Device) -> Self {
        Self {
            state: RwLock::new(StoreState {
                device,
                analog_inputs: Vec::new(),
                binary_inputs: Vec::new(),
                next_analog: 1,
                next_binary: 1,
                revision: 1,
            }),
        }
    }

    // poisoned locks are recovered, records stay whole across a panic
    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get_device(&self) -> Device {
        self.read().device.clone()
    }

    /// Merge a sparse device update and return the new record
    pub fn set_device(&self, patch: DevicePatch) -> Device {
        let mut state = self.write();
        state.device.apply(patch);
        state.device.clone()
    }

    /// Set the online flag
    ///
    /// Returns `true` only for an offline to online transition, which is when
    /// the caller should announce the device.
    pub fn set_online(&self, online: bool) -> bool {
        let mut state = self.write();
        let was_online = state.device.is_online;
        state.device.is_online = online;
        online && !was_online
    }

    pub fn add_analog_input(&self, spec: NewAnalogInput) -> Result<AnalogInput> {
        let mut state = self.write();
        let instance = state.next_analog;
        if !is_valid_instance_number(instance) {
            return Err(StoreError::InstancesExhausted(PointKind::Analog));
        }
        let id = state.allocate_id(PointKind::Analog, spec.id.clone())?;

        let input = AnalogInput::new(id, instance, spec);
        state.next_analog += 1;
        state.revision = state.revision.wrapping_add(1);
        state.analog_inputs.push(input.clone());
        debug!("Added {} ({})", input.identifier(), input.name);
        Ok(input)
    }

    pub fn add_binary_input(&self, spec: NewBinaryInput) -> Result<BinaryInput> {
        let mut state = self.write();
        let instance = state.next_binary;
        if !is_valid_instance_number(instance) {
            return Err(StoreError::InstancesExhausted(PointKind::Binary));
        }
        let id = state.allocate_id(PointKind::Binary, spec.id.clone())?;

        let input = BinaryInput::new(id, instance, spec);
        state.next_binary += 1;
        state.revision = state.revision.wrapping_add(1);
        state.binary_inputs.push(input.clone());
        debug!("Added {} ({})", input.identifier(), input.name);
        Ok(input)
    }

    pub fn update_analog_input(&self, id: &str, patch: AnalogInputPatch) -> Result<AnalogInput> {
        let mut state = self.write();
        let input = state
            .analog_inputs
            .iter_mut()
            .find(|ai| ai.id == id)
            .ok_or_else(|| StoreError::NotFound {
                kind: PointKind::Analog,
                id: id.to_string(),
            })?;
        input.apply(patch);
        Ok(input.clone())
    }

    pub fn update_binary_input(&self, id: &str, patch: BinaryInputPatch) -> Result<BinaryInput> {
        let mut state = self.write();
        let input = state
            .binary_inputs
            .iter_mut()
            .find(|bi| bi.id == id)
            .ok_or_else(|| StoreError::NotFound {
                kind: PointKind::Binary,
                id: id.to_string(),
            })?;
        input.apply(patch);
        Ok(input.clone())
    }

    pub fn delete_analog_input(&self, id: &str) -> Result<AnalogInput> {
        let mut state = self.write();
        let index = state
            .analog_inputs
            .iter()
            .position(|ai| ai.id == id)
            .ok_or_else(|| StoreError::NotFound {
                kind: PointKind::Analog,
                id: id.to_string(),
            })?;
        state.revision = state.revision.wrapping_add(1);
        Ok(state.analog_inputs.remove(index))
    }

    pub fn delete_binary_input(&self, id: &str) -> Result<BinaryInput> {
        let mut state = self.write();
        let index = state
            .binary_inputs
            .iter()
            .position(|bi| bi.id == id)
            .ok_or_else(|| StoreError::NotFound {
                kind: PointKind::Binary,
                id: id.to_string(),
            })?;
        state.revision = state.revision.wrapping_add(1);
        Ok(state.binary_inputs.remove(index))
    }

    /// Analog inputs in insertion order
    pub fn list_analog_inputs(&self) -> Vec<AnalogInput> {
        self.read().analog_inputs.clone()
    }

    /// Binary inputs in insertion order
    pub fn list_binary_inputs(&self) -> Vec<BinaryInput> {
        self.read().binary_inputs.clone()
    }

    pub fn analog_by_instance(&self, instance: u32) -> Option<AnalogInput> {
        self.read()
            .analog_inputs
            .iter()
            .find(|ai| ai.object_id == instance)
            .cloned()
    }

    pub fn binary_by_instance(&self, instance: u32) -> Option<BinaryInput> {
        self.read()
            .binary_inputs
            .iter()
            .find(|bi| bi.object_id == instance)
            .cloned()
    }

    /// Every object of the device: the device itself, then analog inputs,
    /// then binary inputs
    pub fn object_list(&self) -> Vec<ObjectIdentifier> {
        let state = self.read();
        std::iter::once(state.device.identifier())
            .chain(state.analog_inputs.iter().map(AnalogInput::identifier))
            .chain(state.binary_inputs.iter().map(BinaryInput::identifier))
            .collect()
    }

    pub fn revision(&self) -> u32 {
        self.read().revision
    }

    /// Protocol present value write on an analog input
    ///
    /// Existence and out-of-service are checked under the same lock as the
    /// mutation. With `clamp` the value is limited to `[min, max]`, otherwise
    /// it is stored verbatim.
    pub fn write_analog_present_value(
        &self,
        instance: u32,
        value: f32,
        clamp: bool,
    ) -> Result<AnalogWrite> {
        let mut state = self.write();
        let input = state.analog_mut(instance)?;
        if input.out_of_service {
            return Err(StoreError::OutOfService(input.identifier()));
        }

        let in_range = value >= input.min_value && value <= input.max_value;
        let stored = if clamp {
            clamp_to_range(value, input.min_value, input.max_value)
        } else {
            value
        };
        input.present_value = stored;
        input.last_update = Utc::now();
        Ok(AnalogWrite { stored, in_range })
    }

    /// Protocol present value write on a binary input
    pub fn write_binary_present_value(&self, instance: u32, value: BinaryPV) -> Result<()> {
        let mut state = self.write();
        let input = state.binary_mut(instance)?;
        if input.out_of_service {
            return Err(StoreError::OutOfService(input.identifier()));
        }
        input.present_value = value;
        input.last_update = Utc::now();
        Ok(())
    }

    /// Run one simulation pass as a single critical section
    ///
    /// `analog` returns the next present value of an in-service analog input,
    /// `binary` decides whether an in-service binary input toggles.
    /// Out-of-service points are never passed to either closure.
    pub fn apply_simulation_step<A, B>(&self, mut analog: A, mut binary: B) -> SimulationPass
    where
        A: FnMut(&AnalogInput) -> f32,
        B: FnMut(&BinaryInput) -> bool,
    {
        let mut state = self.write();
        let now = Utc::now();
        let mut pass = SimulationPass::default();

        for input in state.analog_inputs.iter_mut().filter(|ai| !ai.out_of_service) {
            input.present_value = analog(input);
            input.last_update = now;
            pass.analog_updated += 1;
        }

        for input in state.binary_inputs.iter_mut().filter(|bi| !bi.out_of_service) {
            if binary(input) {
                input.present_value = input.present_value.toggled();
                input.last_update = now;
                pass.binary_toggled += 1;
            }
        }

        pass
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn temp1() -> NewAnalogInput {
        NewAnalogInput {
            name: Some("Temp1".to_string()),
            min_value: Some(0.0),
            max_value: Some(100.0),
            resolution: Some(0.1),
            ..Default::default()
        }
    }

    #[test]
    fn test_store_creation() {
        let store = PointStore::default();
        assert_eq!(store.get_device().id, 1001);
        assert!(store.list_analog_inputs().is_empty());
        assert_eq!(store.object_list(), vec![store.get_device().identifier()]);
    }

    #[test]
    fn test_add_assigns_sequential_instances() {
        let store = PointStore::default();
        let a = store.add_analog_input(temp1()).unwrap();
        let b = store.add_analog_input(NewAnalogInput::default()).unwrap();
        let c = store.add_binary_input(NewBinaryInput::default()).unwrap();

        assert_eq!((a.object_id, b.object_id), (1, 2));
        assert_eq!(c.object_id, 1);
        assert!(a.id.starts_with("ai_"));
        assert!(c.id.starts_with("bi_"));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_deleted_instance_is_not_reused() {
        let store = PointStore::default();
        let first = store.add_analog_input(NewAnalogInput::default()).unwrap();
        store.add_analog_input(NewAnalogInput::default()).unwrap();
        store.delete_analog_input(&first.id).unwrap();

        let third = store.add_analog_input(NewAnalogInput::default()).unwrap();
        assert_eq!(third.object_id, 3);
        assert!(store.analog_by_instance(1).is_none());
    }

    #[test]
    fn test_duplicate_client_id_rejected() {
        let store = PointStore::default();
        let spec = NewBinaryInput {
            id: Some("door".to_string()),
            ..Default::default()
        };
        store.add_binary_input(spec.clone()).unwrap();

        assert_eq!(
            store.add_binary_input(spec),
            Err(StoreError::DuplicateId {
                kind: PointKind::Binary,
                id: "door".to_string()
            })
        );
        assert_eq!(store.list_binary_inputs().len(), 1);
    }

    #[test]
    fn test_unknown_ids_surface_not_found() {
        let store = PointStore::default();
        let err = store
            .update_analog_input("missing", AnalogInputPatch::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "Analog input not found");
        assert!(matches!(
            store.delete_binary_input("missing"),
            Err(StoreError::NotFound { kind: PointKind::Binary, .. })
        ));
    }

    #[test]
    fn test_set_online_reports_transition() {
        let store = PointStore::default();
        assert!(!store.set_online(true));
        assert!(!store.set_online(false));
        assert!(store.set_online(true));
        assert!(store.get_device().is_online);
    }

    #[test]
    fn test_set_device_merges() {
        let store = PointStore::default();
        let device = store.set_device(DevicePatch {
            name: Some("Lab".to_string()),
            ..Default::default()
        });
        assert_eq!(device.name, "Lab");
        assert_eq!(store.get_device().description, "Virtual BACnet Device for Testing");
    }

    #[test]
    fn test_present_value_write_policies() {
        let store = PointStore::default();
        store.add_analog_input(temp1()).unwrap();

        let verbatim = store.write_analog_present_value(1, 150.0, false).unwrap();
        assert_eq!(verbatim, AnalogWrite { stored: 150.0, in_range: false });
        assert_eq!(store.analog_by_instance(1).unwrap().present_value, 150.0);

        let clamped = store.write_analog_present_value(1, 150.0, true).unwrap();
        assert_eq!(clamped.stored, 100.0);
        assert_eq!(store.analog_by_instance(1).unwrap().present_value, 100.0);
    }

    #[test]
    fn test_out_of_service_blocks_protocol_writes() {
        let store = PointStore::default();
        let bi = store.add_binary_input(NewBinaryInput::default()).unwrap();
        store
            .update_binary_input(
                &bi.id,
                BinaryInputPatch {
                    out_of_service: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();

        assert!(matches!(
            store.write_binary_present_value(1, BinaryPV::Active),
            Err(StoreError::OutOfService(_))
        ));
        assert_eq!(store.binary_by_instance(1).unwrap().present_value, BinaryPV::Inactive);
        assert!(matches!(
            store.write_binary_present_value(9, BinaryPV::Active),
            Err(StoreError::UnknownInstance(_))
        ));
    }

    #[test]
    fn test_simulation_step_skips_out_of_service() {
        let store = PointStore::default();
        store.add_analog_input(temp1()).unwrap();
        let frozen = store.add_analog_input(temp1()).unwrap();
        store.add_binary_input(NewBinaryInput::default()).unwrap();
        store
            .update_analog_input(
                &frozen.id,
                AnalogInputPatch {
                    out_of_service: Some(true),
                    present_value: Some(42.0),
                    ..Default::default()
                },
            )
            .unwrap();

        let pass = store.apply_simulation_step(|ai| ai.present_value + 1.0, |_| true);
        assert_eq!(pass, SimulationPass { analog_updated: 1, binary_toggled: 1 });

        let analog = store.list_analog_inputs();
        assert_eq!(analog[0].present_value, 1.0);
        assert_eq!(analog[1].present_value, 42.0);
        assert_eq!(store.list_binary_inputs()[0].present_value, BinaryPV::Active);
    }

    #[test]
    fn test_object_list_and_revision() {
        let store = PointStore::default();
        let start = store.revision();
        let ai = store.add_analog_input(NewAnalogInput::default()).unwrap();
        store.add_binary_input(NewBinaryInput::default()).unwrap();

        assert_eq!(
            store.object_list(),
            vec![
                ObjectIdentifier::new(ObjectType::Device, 1001),
                ObjectIdentifier::new(ObjectType::AnalogInput, 1),
                ObjectIdentifier::new(ObjectType::BinaryInput, 1),
            ]
        );

        store.delete_analog_input(&ai.id).unwrap();
        assert_eq!(store.revision(), start + 3);
    }

    proptest! {
        #[test]
        fn prop_instances_strictly_increase(ops in proptest::collection::vec(any::<bool>(), 1..40)) {
            let store = PointStore::default();
            let mut seen = Vec::new();

            for add in ops {
                let live = store.list_analog_inputs();
                if add || live.is_empty() {
                    let ai = store.add_analog_input(NewAnalogInput::default()).unwrap();
                    if let Some(&last) = seen.last() {
                        prop_assert!(ai.object_id > last);
                    }
                    prop_assert!(!seen.contains(&ai.object_id));
                    seen.push(ai.object_id);
                } else {
                    store.delete_analog_input(&live[0].id).unwrap();
                }
            }
        }
    }
}
