use crate::bacnet_enum;

bacnet_enum! {
    /// BACnet property identifiers (clause 21, BACnetPropertyIdentifier)
    PropertyIdentifier {
        AllProperties = 8 => "all",
        ApplicationSoftwareVersion = 12 => "application-software-version",
        Description = 28 => "description",
        EventState = 36 => "event-state",
        FirmwareRevision = 44 => "firmware-revision",
        Location = 58 => "location",
        MaxApduLengthAccepted = 62 => "max-apdu-length-accepted",
        MaxPresValue = 65 => "max-pres-value",
        MinPresValue = 69 => "min-pres-value",
        ModelName = 70 => "model-name",
        ObjectIdentifier = 75 => "object-identifier",
        ObjectList = 76 => "object-list",
        ObjectName = 77 => "object-name",
        ObjectType = 79 => "object-type",
        OutOfService = 81 => "out-of-service",
        Polarity = 84 => "polarity",
        PresentValue = 85 => "present-value",
        PriorityArray = 87 => "priority-array",
        ProtocolServicesSupported = 97 => "protocol-services-supported",
        ProtocolVersion = 98 => "protocol-version",
        Reliability = 103 => "reliability",
        Resolution = 106 => "resolution",
        SegmentationSupported = 107 => "segmentation-supported",
        StatusFlags = 111 => "status-flags",
        SystemStatus = 112 => "system-status",
        Units = 117 => "units",
        VendorIdentifier = 120 => "vendor-identifier",
        VendorName = 121 => "vendor-name",
        ProtocolRevision = 139 => "protocol-revision",
        DatabaseRevision = 155 => "database-revision",
        PropertyList = 371 => "property-list",
    },
    u32,
    512..=4_194_303
}
