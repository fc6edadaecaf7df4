use crate::bacnet_enum;

bacnet_enum! {
    /// BACnet object types (clause 21, BACnetObjectType)
    ///
    /// Only `Device`, `AnalogInput` and `BinaryInput` are modeled by the point
    /// store; the remaining names exist so that requests for other types can be
    /// logged by name and answered with unknown-object.
    ObjectType {
        AnalogInput = 0 => "analog-input",
        AnalogOutput = 1 => "analog-output",
        AnalogValue = 2 => "analog-value",
        BinaryInput = 3 => "binary-input",
        BinaryOutput = 4 => "binary-output",
        BinaryValue = 5 => "binary-value",
        Calendar = 6 => "calendar",
        Command = 7 => "command",
        Device = 8 => "device",
        EventEnrollment = 9 => "event-enrollment",
        File = 10 => "file",
        Group = 11 => "group",
        Loop = 12 => "loop",
        MultiStateInput = 13 => "multi-state-input",
        MultiStateOutput = 14 => "multi-state-output",
        NotificationClass = 15 => "notification-class",
        Program = 16 => "program",
        Schedule = 17 => "schedule",
        Averaging = 18 => "averaging",
        MultiStateValue = 19 => "multi-state-value",
        TrendLog = 20 => "trend-log",
        NetworkPort = 56 => "network-port",
    },
    u16,
    128..=1023
}
