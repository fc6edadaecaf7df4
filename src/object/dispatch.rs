//! Property dispatch.
//!
//! Translates BACnet `(object, property)` addressing into reads and writes on
//! the [`PointStore`]. Each supported object type registers an
//! [`ObjectFunctions`] entry in a static table; the dispatcher finds the entry
//! for the requested type and delegates to it.
//!
//! Only present-value writes on analog and binary inputs are accepted. Every
//! other write is denied.

use std::sync::Arc;

use log::{debug, warn};
use thiserror::Error;

use super::device::{MAX_APDU_LENGTH_ACCEPTED, PROTOCOL_REVISION, PROTOCOL_VERSION, VENDOR_NAME};
use super::store::StoreError;
use super::{
    BinaryPV, EngineeringUnits, EventState, ObjectIdentifier, ObjectType, PointStore,
    PropertyIdentifier, Segmentation,
};
use crate::property::TaggedValue;
use crate::service::{ErrorClass, ErrorCode, ServicesSupported};
use crate::util::WILDCARD_INSTANCE;

pub type Result<T> = std::result::Result<T, DispatchError>;

/// Protocol level failures, each maps to an error class and code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("unknown object {0}")]
    UnknownObject(ObjectIdentifier),
    #[error("{object} has no property {property}")]
    UnknownProperty {
        object: ObjectIdentifier,
        property: PropertyIdentifier,
    },
    #[error("write access denied on {0}")]
    WriteAccessDenied(ObjectIdentifier),
    #[error("{0} is not an array")]
    PropertyIsNotAnArray(PropertyIdentifier),
    #[error("array index {0} is out of range")]
    InvalidArrayIndex(u32),
}

impl DispatchError {
    pub fn error_class(&self) -> ErrorClass {
        match self {
            DispatchError::UnknownObject(_) => ErrorClass::Object,
            _ => ErrorClass::Property,
        }
    }

    pub fn error_code(&self) -> ErrorCode {
        match self {
            DispatchError::UnknownObject(_) => ErrorCode::UnknownObject,
            DispatchError::UnknownProperty { .. } => ErrorCode::UnknownProperty,
            DispatchError::WriteAccessDenied(_) => ErrorCode::WriteAccessDenied,
            DispatchError::PropertyIsNotAnArray(_) => ErrorCode::PropertyIsNotAnArray,
            DispatchError::InvalidArrayIndex(_) => ErrorCode::InvalidArrayIndex,
        }
    }

    fn from_store(object: ObjectIdentifier, err: StoreError) -> Self {
        match err {
            StoreError::UnknownInstance(id) => DispatchError::UnknownObject(id),
            StoreError::OutOfService(id) => DispatchError::WriteAccessDenied(id),
            _ => DispatchError::WriteAccessDenied(object),
        }
    }
}

/// How analog present-value writes outside `[min, max]` are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePolicy {
    /// Store the requested value as is and report it as unvalidated
    #[default]
    Verbatim,
    /// Limit the value to the point's range
    Clamp,
}

/// Successful write outcome
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WriteAck {
    Accepted,
    Clamped { requested: f32, stored: f32 },
    /// Out of range value stored without clamping
    ValidationSkipped { value: f32 },
}

/// Read handler registered for one object type
#[derive(Clone)]
pub struct ObjectFunctions {
    pub object_type: ObjectType,
    /// Properties the object type exposes
    pub properties: &'static [PropertyIdentifier],
    pub read_property: fn(&PointStore, ObjectIdentifier, PropertyIdentifier) -> Result<TaggedValue>,
}

impl std::fmt::Debug for ObjectFunctions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectFunctions")
            .field("object_type", &self.object_type)
            .field("properties", &self.properties)
            .field("read_property", &"fn(&PointStore, ObjectIdentifier, PropertyIdentifier)")
            .finish()
    }
}

const DEVICE_PROPERTIES: &[PropertyIdentifier] = &[
    PropertyIdentifier::ObjectIdentifier,
    PropertyIdentifier::ObjectName,
    PropertyIdentifier::ObjectType,
    PropertyIdentifier::Description,
    PropertyIdentifier::SystemStatus,
    PropertyIdentifier::VendorName,
    PropertyIdentifier::VendorIdentifier,
    PropertyIdentifier::ModelName,
    PropertyIdentifier::FirmwareRevision,
    PropertyIdentifier::ApplicationSoftwareVersion,
    PropertyIdentifier::Location,
    PropertyIdentifier::ProtocolVersion,
    PropertyIdentifier::ProtocolRevision,
    PropertyIdentifier::ProtocolServicesSupported,
    PropertyIdentifier::MaxApduLengthAccepted,
    PropertyIdentifier::SegmentationSupported,
    PropertyIdentifier::ObjectList,
    PropertyIdentifier::DatabaseRevision,
];

const ANALOG_INPUT_PROPERTIES: &[PropertyIdentifier] = &[
    PropertyIdentifier::ObjectIdentifier,
    PropertyIdentifier::ObjectName,
    PropertyIdentifier::ObjectType,
    PropertyIdentifier::PresentValue,
    PropertyIdentifier::Description,
    PropertyIdentifier::StatusFlags,
    PropertyIdentifier::EventState,
    PropertyIdentifier::Reliability,
    PropertyIdentifier::OutOfService,
    PropertyIdentifier::Units,
    PropertyIdentifier::MinPresValue,
    PropertyIdentifier::MaxPresValue,
    PropertyIdentifier::Resolution,
];

const BINARY_INPUT_PROPERTIES: &[PropertyIdentifier] = &[
    PropertyIdentifier::ObjectIdentifier,
    PropertyIdentifier::ObjectName,
    PropertyIdentifier::ObjectType,
    PropertyIdentifier::PresentValue,
    PropertyIdentifier::Description,
    PropertyIdentifier::StatusFlags,
    PropertyIdentifier::EventState,
    PropertyIdentifier::Reliability,
    PropertyIdentifier::OutOfService,
    PropertyIdentifier::Polarity,
];

static OBJECT_TABLE: [ObjectFunctions; 3] = [
    ObjectFunctions {
        object_type: ObjectType::Device,
        properties: DEVICE_PROPERTIES,
        read_property: read_device_property,
    },
    ObjectFunctions {
        object_type: ObjectType::AnalogInput,
        properties: ANALOG_INPUT_PROPERTIES,
        read_property: read_analog_input_property,
    },
    ObjectFunctions {
        object_type: ObjectType::BinaryInput,
        properties: BINARY_INPUT_PROPERTIES,
        read_property: read_binary_input_property,
    },
];

/// Handler entry for `object_type`, `None` for types the device does not host
pub fn find_object_functions(object_type: ObjectType) -> Option<&'static ObjectFunctions> {
    OBJECT_TABLE
        .iter()
        .find(|functions| functions.object_type == object_type)
}

fn character_string(value: &str) -> TaggedValue {
    TaggedValue::CharacterString(value.to_string())
}

fn read_device_property(
    store: &PointStore,
    object: ObjectIdentifier,
    property: PropertyIdentifier,
) -> Result<TaggedValue> {
    let device = store.get_device();
    if object.instance != device.id && object.instance != WILDCARD_INSTANCE {
        return Err(DispatchError::UnknownObject(object));
    }

    let value = match property {
        PropertyIdentifier::ObjectIdentifier => TaggedValue::ObjectIdentifier(device.identifier()),
        PropertyIdentifier::ObjectName => character_string(&device.name),
        PropertyIdentifier::ObjectType => TaggedValue::Enumerated(u16::from(ObjectType::Device).into()),
        PropertyIdentifier::Description => character_string(&device.description),
        PropertyIdentifier::SystemStatus => TaggedValue::Enumerated(device.system_status() as u32),
        PropertyIdentifier::VendorName => character_string(VENDOR_NAME),
        PropertyIdentifier::VendorIdentifier => TaggedValue::Unsigned(device.vendor_id.into()),
        PropertyIdentifier::ModelName => character_string(&device.model_name),
        PropertyIdentifier::FirmwareRevision => character_string(&device.firmware_revision),
        PropertyIdentifier::ApplicationSoftwareVersion => {
            character_string(&device.application_software_version)
        }
        PropertyIdentifier::Location => character_string(&device.location),
        PropertyIdentifier::ProtocolVersion => TaggedValue::Unsigned(PROTOCOL_VERSION),
        PropertyIdentifier::ProtocolRevision => TaggedValue::Unsigned(PROTOCOL_REVISION),
        PropertyIdentifier::ProtocolServicesSupported => {
            TaggedValue::BitString(ServicesSupported::simulator().to_bits())
        }
        PropertyIdentifier::MaxApduLengthAccepted => TaggedValue::Unsigned(MAX_APDU_LENGTH_ACCEPTED),
        PropertyIdentifier::SegmentationSupported => {
            TaggedValue::Enumerated(Segmentation::NoSegmentation as u32)
        }
        PropertyIdentifier::ObjectList => TaggedValue::Array(
            store
                .object_list()
                .into_iter()
                .map(TaggedValue::ObjectIdentifier)
                .collect(),
        ),
        PropertyIdentifier::DatabaseRevision => TaggedValue::Unsigned(store.revision()),
        _ => return Err(DispatchError::UnknownProperty { object, property }),
    };
    Ok(value)
}

fn read_analog_input_property(
    store: &PointStore,
    object: ObjectIdentifier,
    property: PropertyIdentifier,
) -> Result<TaggedValue> {
    let input = store
        .analog_by_instance(object.instance)
        .ok_or(DispatchError::UnknownObject(object))?;

    let value = match property {
        PropertyIdentifier::ObjectIdentifier => TaggedValue::ObjectIdentifier(input.identifier()),
        PropertyIdentifier::ObjectName => character_string(&input.name),
        PropertyIdentifier::ObjectType => {
            TaggedValue::Enumerated(u16::from(ObjectType::AnalogInput).into())
        }
        PropertyIdentifier::PresentValue => TaggedValue::Real(input.present_value),
        PropertyIdentifier::Description => character_string(&input.description),
        PropertyIdentifier::StatusFlags => TaggedValue::BitString(input.status_flags().to_bits()),
        PropertyIdentifier::EventState => TaggedValue::Enumerated(EventState::Normal as u32),
        PropertyIdentifier::Reliability => TaggedValue::Enumerated(input.reliability as u32),
        PropertyIdentifier::OutOfService => TaggedValue::Boolean(input.out_of_service),
        PropertyIdentifier::Units => {
            TaggedValue::Enumerated(EngineeringUnits::from_name(&input.units).into())
        }
        PropertyIdentifier::MinPresValue => TaggedValue::Real(input.min_value),
        PropertyIdentifier::MaxPresValue => TaggedValue::Real(input.max_value),
        PropertyIdentifier::Resolution => TaggedValue::Real(input.resolution),
        _ => return Err(DispatchError::UnknownProperty { object, property }),
    };
    Ok(value)
}

fn read_binary_input_property(
    store: &PointStore,
    object: ObjectIdentifier,
    property: PropertyIdentifier,
) -> Result<TaggedValue> {
    let input = store
        .binary_by_instance(object.instance)
        .ok_or(DispatchError::UnknownObject(object))?;

    let value = match property {
        PropertyIdentifier::ObjectIdentifier => TaggedValue::ObjectIdentifier(input.identifier()),
        PropertyIdentifier::ObjectName => character_string(&input.name),
        PropertyIdentifier::ObjectType => {
            TaggedValue::Enumerated(u16::from(ObjectType::BinaryInput).into())
        }
        PropertyIdentifier::PresentValue => TaggedValue::Enumerated(input.present_value as u32),
        PropertyIdentifier::Description => character_string(&input.description),
        PropertyIdentifier::StatusFlags => TaggedValue::BitString(input.status_flags().to_bits()),
        PropertyIdentifier::EventState => TaggedValue::Enumerated(EventState::Normal as u32),
        PropertyIdentifier::Reliability => TaggedValue::Enumerated(input.reliability as u32),
        PropertyIdentifier::OutOfService => TaggedValue::Boolean(input.out_of_service),
        PropertyIdentifier::Polarity => TaggedValue::Enumerated(input.polarity as u32),
        _ => return Err(DispatchError::UnknownProperty { object, property }),
    };
    Ok(value)
}

/// Resolves ReadProperty and WriteProperty requests against a shared store
#[derive(Debug, Clone)]
pub struct PropertyDispatcher {
    store: Arc<PointStore>,
    policy: WritePolicy,
}

impl PropertyDispatcher {
    pub fn new(store: Arc<PointStore>) -> Self {
        Self {
            store,
            policy: WritePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: WritePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> WritePolicy {
        self.policy
    }

    pub fn store(&self) -> &Arc<PointStore> {
        &self.store
    }

    /// Read a whole property value
    pub fn resolve_read(
        &self,
        object: ObjectIdentifier,
        property: PropertyIdentifier,
    ) -> Result<TaggedValue> {
        let functions =
            find_object_functions(object.object_type).ok_or(DispatchError::UnknownObject(object))?;
        (functions.read_property)(&self.store, object, property)
    }

    /// Read a property, optionally addressing one array element
    ///
    /// Index 0 yields the array length, `1..=len` the element at that
    /// position.
    pub fn resolve_read_indexed(
        &self,
        object: ObjectIdentifier,
        property: PropertyIdentifier,
        array_index: Option<u32>,
    ) -> Result<TaggedValue> {
        let value = self.resolve_read(object, property)?;
        let Some(index) = array_index else {
            return Ok(value);
        };

        match value {
            TaggedValue::Array(items) if index == 0 => Ok(TaggedValue::Unsigned(items.len() as u32)),
            TaggedValue::Array(mut items) => {
                let position = index as usize;
                if position > items.len() {
                    return Err(DispatchError::InvalidArrayIndex(index));
                }
                Ok(items.swap_remove(position - 1))
            }
            _ => Err(DispatchError::PropertyIsNotAnArray(property)),
        }
    }

    /// Write a property value
    ///
    /// Only present-value on analog and binary inputs is writable. The target
    /// must exist and be in service.
    pub fn resolve_write(
        &self,
        object: ObjectIdentifier,
        property: PropertyIdentifier,
        value: &TaggedValue,
    ) -> Result<WriteAck> {
        if property != PropertyIdentifier::PresentValue {
            return Err(DispatchError::WriteAccessDenied(object));
        }

        match object.object_type {
            ObjectType::AnalogInput => self.write_analog(object, value),
            ObjectType::BinaryInput => self.write_binary(object, value),
            _ => Err(DispatchError::WriteAccessDenied(object)),
        }
    }

    fn write_analog(&self, object: ObjectIdentifier, value: &TaggedValue) -> Result<WriteAck> {
        // NaN, infinities and doubles beyond f32 range cannot be stored
        let requested = value
            .as_numeric()
            .map(|numeric| numeric as f32)
            .filter(|requested| requested.is_finite());
        let Some(requested) = requested else {
            return match self.store.analog_by_instance(object.instance) {
                Some(_) => Err(DispatchError::WriteAccessDenied(object)),
                None => Err(DispatchError::UnknownObject(object)),
            };
        };

        let write = self
            .store
            .write_analog_present_value(
                object.instance,
                requested,
                self.policy == WritePolicy::Clamp,
            )
            .map_err(|err| DispatchError::from_store(object, err))?;

        let ack = match (write.in_range, self.policy) {
            (true, _) => WriteAck::Accepted,
            (false, WritePolicy::Clamp) => WriteAck::Clamped {
                requested,
                stored: write.stored,
            },
            (false, WritePolicy::Verbatim) => {
                warn!("{} present value {} is outside its range", object, requested);
                WriteAck::ValidationSkipped { value: write.stored }
            }
        };
        debug!("Wrote {} present value {} ({:?})", object, write.stored, ack);
        Ok(ack)
    }

    fn write_binary(&self, object: ObjectIdentifier, value: &TaggedValue) -> Result<WriteAck> {
        let present_value = match value {
            TaggedValue::Enumerated(raw) | TaggedValue::Unsigned(raw) => BinaryPV::from_raw(*raw),
            other => BinaryPV::from(other.as_numeric() == Some(1.0)),
        };

        self.store
            .write_binary_present_value(object.instance, present_value)
            .map_err(|err| DispatchError::from_store(object, err))?;
        debug!("Wrote {} present value {:?}", object, present_value);
        Ok(WriteAck::Accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{
        AnalogInputPatch, BinaryInputPatch, DevicePatch, NewAnalogInput, NewBinaryInput,
    };

    fn setup() -> PropertyDispatcher {
        let store = Arc::new(PointStore::default());
        store
            .add_analog_input(NewAnalogInput {
                name: Some("Temp1".to_string()),
                min_value: Some(0.0),
                max_value: Some(100.0),
                resolution: Some(0.1),
                ..Default::default()
            })
            .unwrap();
        store.add_binary_input(NewBinaryInput::default()).unwrap();
        PropertyDispatcher::new(store)
    }

    fn ai(instance: u32) -> ObjectIdentifier {
        ObjectIdentifier::new(ObjectType::AnalogInput, instance)
    }

    fn bi(instance: u32) -> ObjectIdentifier {
        ObjectIdentifier::new(ObjectType::BinaryInput, instance)
    }

    fn device() -> ObjectIdentifier {
        ObjectIdentifier::new(ObjectType::Device, 1001)
    }

    #[test]
    fn test_analog_write_is_not_clamped_by_default() {
        let dispatcher = setup();
        let pv = PropertyIdentifier::PresentValue;
        assert_eq!(dispatcher.resolve_read(ai(1), pv).unwrap(), TaggedValue::Real(0.0));

        let ack = dispatcher
            .resolve_write(ai(1), pv, &TaggedValue::Real(150.0))
            .unwrap();
        assert_eq!(ack, WriteAck::ValidationSkipped { value: 150.0 });
        assert_eq!(dispatcher.resolve_read(ai(1), pv).unwrap(), TaggedValue::Real(150.0));

        let ack = dispatcher
            .resolve_write(ai(1), pv, &TaggedValue::Real(42.5))
            .unwrap();
        assert_eq!(ack, WriteAck::Accepted);
    }

    #[test]
    fn test_clamp_policy() {
        let dispatcher = setup().with_policy(WritePolicy::Clamp);
        let ack = dispatcher
            .resolve_write(ai(1), PropertyIdentifier::PresentValue, &TaggedValue::Unsigned(150))
            .unwrap();
        assert_eq!(
            ack,
            WriteAck::Clamped {
                requested: 150.0,
                stored: 100.0
            }
        );
        assert_eq!(
            dispatcher.store().analog_by_instance(1).unwrap().present_value,
            100.0
        );
    }

    #[test]
    fn test_binary_write_mapping() {
        let dispatcher = setup();
        let pv = PropertyIdentifier::PresentValue;

        dispatcher.resolve_write(bi(1), pv, &TaggedValue::Enumerated(1)).unwrap();
        assert_eq!(dispatcher.resolve_read(bi(1), pv).unwrap(), TaggedValue::Enumerated(1));
        assert_eq!(
            dispatcher.store().binary_by_instance(1).unwrap().present_value,
            BinaryPV::Active
        );

        dispatcher.resolve_write(bi(1), pv, &TaggedValue::Enumerated(0)).unwrap();
        assert_eq!(
            dispatcher.store().binary_by_instance(1).unwrap().present_value,
            BinaryPV::Inactive
        );

        dispatcher.resolve_write(bi(1), pv, &TaggedValue::Real(1.0)).unwrap();
        assert_eq!(dispatcher.resolve_read(bi(1), pv).unwrap(), TaggedValue::Enumerated(1));

        dispatcher.resolve_write(bi(1), pv, &TaggedValue::Boolean(true)).unwrap();
        assert_eq!(dispatcher.resolve_read(bi(1), pv).unwrap(), TaggedValue::Enumerated(0));
    }

    #[test]
    fn test_out_of_service_write_denied() {
        let dispatcher = setup();
        let id = dispatcher.store().list_binary_inputs()[0].id.clone();
        dispatcher
            .store()
            .update_binary_input(
                &id,
                BinaryInputPatch {
                    out_of_service: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();

        let err = dispatcher
            .resolve_write(bi(1), PropertyIdentifier::PresentValue, &TaggedValue::Enumerated(1))
            .unwrap_err();
        assert_eq!(err, DispatchError::WriteAccessDenied(bi(1)));
        assert_eq!(u16::from(err.error_code()), 40);
        assert_eq!(
            dispatcher.store().binary_by_instance(1).unwrap().present_value,
            BinaryPV::Inactive
        );
    }

    #[test]
    fn test_out_of_service_analog_write_denied() {
        let dispatcher = setup();
        let id = dispatcher.store().list_analog_inputs()[0].id.clone();
        dispatcher
            .store()
            .update_analog_input(
                &id,
                AnalogInputPatch {
                    out_of_service: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();

        let pv = PropertyIdentifier::PresentValue;
        assert_eq!(
            dispatcher.resolve_write(ai(1), pv, &TaggedValue::Real(5.0)),
            Err(DispatchError::WriteAccessDenied(ai(1)))
        );
        assert_eq!(dispatcher.resolve_read(ai(1), pv).unwrap(), TaggedValue::Real(0.0));
    }

    #[test]
    fn test_non_finite_analog_write_denied() {
        let dispatcher = setup();
        let pv = PropertyIdentifier::PresentValue;

        for value in [
            TaggedValue::Real(f32::NAN),
            TaggedValue::Real(f32::INFINITY),
            TaggedValue::Double(f64::NEG_INFINITY),
            TaggedValue::Double(1e300),
        ] {
            assert_eq!(
                dispatcher.resolve_write(ai(1), pv, &value),
                Err(DispatchError::WriteAccessDenied(ai(1)))
            );
        }
        assert_eq!(
            dispatcher.resolve_write(ai(9), pv, &TaggedValue::Real(f32::NAN)),
            Err(DispatchError::UnknownObject(ai(9)))
        );

        let stored = dispatcher.store().analog_by_instance(1).unwrap().present_value;
        assert_eq!(stored, 0.0);
        let json = serde_json::to_value(dispatcher.store().list_analog_inputs()).unwrap();
        assert_eq!(json[0]["presentValue"], 0.0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_drift_pass_does_not_interleave_with_writes() {
        let dispatcher = setup();
        let store = dispatcher.store().clone();
        let id = store.list_analog_inputs()[0].id.clone();
        store
            .update_analog_input(
                &id,
                AnalogInputPatch {
                    min_value: Some(0.0),
                    max_value: Some(1000.0),
                    ..Default::default()
                },
            )
            .unwrap();

        let drift = {
            let store = store.clone();
            tokio::task::spawn_blocking(move || {
                use rand::SeedableRng;
                let mut rng = rand::rngs::StdRng::seed_from_u64(11);
                for _ in 0..2000 {
                    let pass = crate::simulation::step(&store, &mut rng);
                    assert_eq!(pass.analog_updated, 1);
                }
            })
        };
        let writes = {
            let dispatcher = dispatcher.clone();
            tokio::task::spawn_blocking(move || {
                for n in 0..2000u32 {
                    let value = 500.0 + (n % 10) as f32;
                    let ack = dispatcher
                        .resolve_write(
                            ai(1),
                            PropertyIdentifier::PresentValue,
                            &TaggedValue::Real(value),
                        )
                        .unwrap();
                    assert_eq!(ack, WriteAck::Accepted);

                    let read = dispatcher.store().analog_by_instance(1).unwrap().present_value;
                    assert!(read.is_finite() && (0.0..=1000.0).contains(&read));
                }
            })
        };

        drift.await.unwrap();
        writes.await.unwrap();
        let input = store.analog_by_instance(1).unwrap();
        assert!(input.is_within_bounds());
    }

    #[test]
    fn test_unknown_object() {
        let dispatcher = setup();
        let err = dispatcher
            .resolve_read(ai(9), PropertyIdentifier::PresentValue)
            .unwrap_err();
        assert_eq!(err, DispatchError::UnknownObject(ai(9)));
        assert_eq!(err.error_class(), ErrorClass::Object);
        assert_eq!(u16::from(err.error_code()), 31);

        let other_device = ObjectIdentifier::new(ObjectType::Device, 5);
        assert!(matches!(
            dispatcher.resolve_read(other_device, PropertyIdentifier::ObjectName),
            Err(DispatchError::UnknownObject(_))
        ));

        let multistate = ObjectIdentifier::new(ObjectType::MultiStateInput, 1);
        assert!(matches!(
            dispatcher.resolve_read(multistate, PropertyIdentifier::PresentValue),
            Err(DispatchError::UnknownObject(_))
        ));

        assert_eq!(
            dispatcher.resolve_write(ai(9), PropertyIdentifier::PresentValue, &TaggedValue::Real(1.0)),
            Err(DispatchError::UnknownObject(ai(9)))
        );
    }

    #[test]
    fn test_unknown_property() {
        let dispatcher = setup();
        let err = dispatcher
            .resolve_read(bi(1), PropertyIdentifier::Units)
            .unwrap_err();
        assert_eq!(u16::from(err.error_code()), 32);
        assert_eq!(err.error_class(), ErrorClass::Property);
    }

    #[test]
    fn test_non_present_value_writes_denied() {
        let dispatcher = setup();
        let name = TaggedValue::CharacterString("x".to_string());
        assert_eq!(
            dispatcher.resolve_write(ai(1), PropertyIdentifier::ObjectName, &name),
            Err(DispatchError::WriteAccessDenied(ai(1)))
        );
        assert_eq!(
            dispatcher.resolve_write(device(), PropertyIdentifier::PresentValue, &name),
            Err(DispatchError::WriteAccessDenied(device()))
        );
        assert_eq!(
            dispatcher.resolve_write(ai(1), PropertyIdentifier::PresentValue, &name),
            Err(DispatchError::WriteAccessDenied(ai(1)))
        );
    }

    #[test]
    fn test_device_name_tracks_set_device() {
        let dispatcher = setup();
        dispatcher.store().set_device(DevicePatch {
            name: Some("Boiler Room".to_string()),
            ..Default::default()
        });
        assert_eq!(
            dispatcher
                .resolve_read(device(), PropertyIdentifier::ObjectName)
                .unwrap(),
            TaggedValue::CharacterString("Boiler Room".to_string())
        );
    }

    #[test]
    fn test_wildcard_device_instance() {
        let dispatcher = setup();
        let wildcard = ObjectIdentifier::new(ObjectType::Device, WILDCARD_INSTANCE);
        assert_eq!(
            dispatcher
                .resolve_read(wildcard, PropertyIdentifier::ObjectIdentifier)
                .unwrap(),
            TaggedValue::ObjectIdentifier(device())
        );
    }

    #[test]
    fn test_object_list_indexing() {
        let dispatcher = setup();
        let list = PropertyIdentifier::ObjectList;

        assert_eq!(
            dispatcher.resolve_read_indexed(device(), list, Some(0)).unwrap(),
            TaggedValue::Unsigned(3)
        );
        assert_eq!(
            dispatcher.resolve_read_indexed(device(), list, Some(2)).unwrap(),
            TaggedValue::ObjectIdentifier(ai(1))
        );
        assert_eq!(
            dispatcher.resolve_read_indexed(device(), list, Some(4)),
            Err(DispatchError::InvalidArrayIndex(4))
        );
        assert_eq!(
            dispatcher.resolve_read_indexed(ai(1), PropertyIdentifier::PresentValue, Some(1)),
            Err(DispatchError::PropertyIsNotAnArray(PropertyIdentifier::PresentValue))
        );
        assert!(matches!(
            dispatcher.resolve_read_indexed(device(), list, None).unwrap(),
            TaggedValue::Array(items) if items.len() == 3
        ));
    }

    #[test]
    fn test_status_flags_and_units() {
        let dispatcher = setup();
        let id = dispatcher.store().list_analog_inputs()[0].id.clone();
        dispatcher
            .store()
            .update_analog_input(
                &id,
                AnalogInputPatch {
                    out_of_service: Some(true),
                    units: Some("percent".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(
            dispatcher.resolve_read(ai(1), PropertyIdentifier::StatusFlags).unwrap(),
            TaggedValue::BitString(vec![false, false, false, true])
        );
        assert_eq!(
            dispatcher.resolve_read(ai(1), PropertyIdentifier::Units).unwrap(),
            TaggedValue::Enumerated(98)
        );
    }

    #[test]
    fn test_every_listed_property_is_readable() {
        let dispatcher = setup();
        for (object, object_type) in [
            (device(), ObjectType::Device),
            (ai(1), ObjectType::AnalogInput),
            (bi(1), ObjectType::BinaryInput),
        ] {
            let functions = find_object_functions(object_type).unwrap();
            for property in functions.properties {
                assert!(
                    dispatcher.resolve_read(object, *property).is_ok(),
                    "{} {}",
                    object,
                    property
                );
            }
        }
    }
}
